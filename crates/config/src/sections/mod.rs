// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod email;
mod links;
mod mailer;

pub use self::{
    email::{EmailConfig, EmailSmtpMode},
    links::LinksConfig,
    mailer::{EmailKindConfig, MailerConfig},
};
use crate::util::ConfigurationSection;

/// Application configuration root
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RootConfig {
    /// Public URL of the site, used as the base of the links sent by email
    #[schemars(with = "crate::schema::UriReference")]
    pub site_url: String,

    /// Configuration related to sending emails
    #[serde(default)]
    pub email: EmailConfig,

    /// Configuration of how the links carry their token
    #[serde(default, skip_serializing_if = "LinksConfig::is_default")]
    pub links: LinksConfig,

    /// Configuration of each kind of email
    #[serde(default, skip_serializing_if = "MailerConfig::is_default")]
    pub mailer: MailerConfig,
}

impl ConfigurationSection for RootConfig {
    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        self.email.validate(figment)?;
        self.links.validate(figment)?;
        self.mailer.validate(figment)?;

        Ok(())
    }
}

impl RootConfig {
    /// Configuration used in tests
    #[must_use]
    pub fn test() -> Self {
        Self {
            site_url: "https://app.example.com".to_owned(),
            email: EmailConfig::default(),
            links: LinksConfig::default(),
            mailer: MailerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use figment::{
        Figment, Jail,
        providers::{Env, Format, Yaml},
    };
    use indoc::indoc;

    use super::*;

    #[test]
    fn load_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                indoc! {r"
                    site_url: https://app.example.com
                    email:
                      hostname: smtp.example.com
                "},
            )?;
            jail.set_env("AUTHMAIL_LINKS__WITHOUT_FRAGMENT", "true");

            let figment = Figment::new()
                .merge(Yaml::file("config.yaml"))
                .merge(Env::prefixed("AUTHMAIL_").split("__"));
            let config = RootConfig::extract(&figment).map_err(|e| e.to_string())?;

            assert_eq!(config.site_url, "https://app.example.com");
            assert_eq!(config.email.hostname(), Some("smtp.example.com"));
            assert!(config.links.without_fragment);
            assert!(!config.links.add_url_type);
            assert!(config.mailer.is_default());

            Ok(())
        });
    }

    #[test]
    fn site_url_is_required() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "email: {}")?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            assert!(RootConfig::extract(&figment).is_err());

            Ok(())
        });
    }
}
