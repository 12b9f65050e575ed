// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use camino::Utf8PathBuf;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ConfigurationSection;

/// Settings of one kind of email
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, JsonSchema, Serialize)]
pub struct EmailKindConfig {
    /// Path of the link, resolved against the site URL. When empty, the
    /// referrer of the request is used as the link base if there is one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    #[schemars(with = "crate::schema::UriReference")]
    pub url_path: String,

    /// Subject line, overriding the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Path to a template used for the body, overriding the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub template: Option<Utf8PathBuf>,
}

impl EmailKindConfig {
    fn is_default(&self) -> bool {
        self == &Self::default()
    }
}

/// Configuration of the emails carrying action links
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, JsonSchema, Serialize)]
pub struct MailerConfig {
    /// Invitation to create an account
    #[serde(default, skip_serializing_if = "EmailKindConfig::is_default")]
    pub invite: EmailKindConfig,

    /// Confirmation of the address given at sign up
    #[serde(default, skip_serializing_if = "EmailKindConfig::is_default")]
    pub confirmation: EmailKindConfig,

    /// Password recovery
    #[serde(default, skip_serializing_if = "EmailKindConfig::is_default")]
    pub recovery: EmailKindConfig,

    /// Confirmation of a new email address
    #[serde(default, skip_serializing_if = "EmailKindConfig::is_default")]
    pub email_change: EmailKindConfig,
}

impl MailerConfig {
    /// Returns true if the configuration is the default one
    pub(crate) fn is_default(&self) -> bool {
        self == &Self::default()
    }
}

impl ConfigurationSection for MailerConfig {
    const PATH: Option<&'static str> = Some("mailer");
}

#[cfg(test)]
mod tests {
    use figment::{
        Figment, Jail,
        providers::{Format, Yaml},
    };
    use indoc::indoc;

    use super::*;

    #[test]
    fn load_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                indoc! {r"
                    mailer:
                      recovery:
                        url_path: /reset-password
                        subject: Forgot your password?
                      invite:
                        template: templates/invite.html
                "},
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = MailerConfig::extract(&figment).map_err(|e| e.to_string())?;

            assert_eq!(config.recovery.url_path, "/reset-password");
            assert_eq!(
                config.recovery.subject.as_deref(),
                Some("Forgot your password?")
            );
            assert_eq!(
                config.invite.template.as_deref(),
                Some(camino::Utf8Path::new("templates/invite.html"))
            );
            assert!(config.confirmation.url_path.is_empty());
            assert!(config.email_change.is_default());

            Ok(())
        });
    }
}
