// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::num::NonZeroU16;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error};

use crate::ConfigurationSection;

fn default_from() -> String {
    r#""Authentication Service" <root@localhost>"#.to_owned()
}

/// Encryption mode of the SMTP connection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EmailSmtpMode {
    /// Plain text
    Plain,

    /// `StartTLS` (starts as plain text then upgrade to TLS)
    StartTls,

    /// TLS
    #[default]
    Tls,
}

/// Configuration related to sending emails
///
/// Mails are only sent if an SMTP `hostname` is set. Without it, every mail is
/// accepted and dropped.
#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
pub struct EmailConfig {
    /// Email address to use as the 'From' field
    #[serde(default = "default_from")]
    #[schemars(email)]
    pub from: String,

    /// Hostname of the SMTP server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<crate::schema::Hostname>")]
    pub hostname: Option<String>,

    /// Port of the SMTP server. Defaults to the standard port of the mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<NonZeroU16>,

    /// Connection mode to the SMTP server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<EmailSmtpMode>,

    /// Username for the SMTP authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password for the SMTP authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from: default_from(),
            hostname: None,
            port: None,
            mode: None,
            username: None,
            password: None,
        }
    }
}

impl EmailConfig {
    /// The SMTP hostname, or `None` if mail sending is disabled
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref().filter(|hostname| !hostname.is_empty())
    }

    /// The SMTP port, if one was set
    #[must_use]
    pub fn port(&self) -> Option<NonZeroU16> {
        self.port
    }

    /// The SMTP connection mode, TLS if not set
    #[must_use]
    pub fn mode(&self) -> EmailSmtpMode {
        self.mode.unwrap_or_default()
    }

    /// The SMTP username
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// The SMTP password
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl ConfigurationSection for EmailConfig {
    const PATH: Option<&'static str> = Some("email");

    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let metadata = figment.find_metadata(Self::PATH.unwrap());

        let error_on_field = |mut error: figment::error::Error, field: &'static str| {
            error.metadata = metadata.cloned();
            error.profile = Some(figment::Profile::Default);
            error.path = vec![Self::PATH.unwrap().to_owned(), field.to_owned()];
            error
        };

        let missing_field = |field: &'static str| {
            error_on_field(figment::error::Error::missing_field(field), field)
        };

        if self.hostname().is_none() {
            for (field, set) in [
                ("port", self.port.is_some()),
                ("mode", self.mode.is_some()),
                ("username", self.username.is_some()),
                ("password", self.password.is_some()),
            ] {
                if set {
                    return Err(error_on_field(
                        figment::error::Error::from(format!(
                            "Setting `{field}` requires an SMTP `hostname`"
                        )),
                        field,
                    )
                    .into());
                }
            }
        }

        match (&self.username, &self.password) {
            (Some(_), None) => return Err(missing_field("password").into()),
            (None, Some(_)) => return Err(missing_field("username").into()),
            _ => {}
        }

        Ok(())
    }
}
