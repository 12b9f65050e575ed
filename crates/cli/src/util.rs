// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::Arc;

use anyhow::Context;
use authmail_config::{EmailConfig, EmailSmtpMode, LinksConfig, MailerConfig, RootConfig};
use authmail_data_model::LinkType;
use authmail_email::{EncodingMode, LinkPaths, LinkResolver, Mailer, SmtpTransport};
use authmail_templates::{TemplateOverride, Templates};

pub fn encoding_mode_from_config(config: &LinksConfig) -> EncodingMode {
    EncodingMode {
        suppress_fragment: config.without_fragment,
        tag_url_type: config.add_url_type,
    }
}

pub fn link_paths_from_config(config: &MailerConfig) -> LinkPaths {
    LinkPaths {
        invite: config.invite.url_path.clone(),
        confirmation: config.confirmation.url_path.clone(),
        recovery: config.recovery.url_path.clone(),
        email_change: config.email_change.url_path.clone(),
    }
}

pub async fn templates_from_config(config: &MailerConfig) -> Result<Templates, anyhow::Error> {
    let overrides = [
        (LinkType::Invite, &config.invite),
        (LinkType::Confirmation, &config.confirmation),
        (LinkType::Recovery, &config.recovery),
        (LinkType::EmailChange, &config.email_change),
    ]
    .map(|(link_type, kind)| {
        (
            link_type,
            TemplateOverride {
                subject: kind.subject.clone(),
                body: kind.template.clone(),
            },
        )
    });

    Templates::load(overrides)
        .await
        .context("failed to load the email templates")
}

fn smtp_transport_from_config(
    config: &EmailConfig,
    hostname: &str,
) -> Result<SmtpTransport, anyhow::Error> {
    let from = config
        .from
        .parse()
        .context("invalid email configuration: invalid 'from' address")?;

    let credentials = match (config.username(), config.password()) {
        (Some(username), Some(password)) => Some(authmail_email::SmtpCredentials::new(
            username.to_owned(),
            password.to_owned(),
        )),
        (None, None) => None,
        _ => {
            anyhow::bail!("invalid email configuration: missing username or password");
        }
    };

    let mode = match config.mode() {
        EmailSmtpMode::Plain => authmail_email::SmtpMode::Plain,
        EmailSmtpMode::StartTls => authmail_email::SmtpMode::StartTls,
        EmailSmtpMode::Tls => authmail_email::SmtpMode::Tls,
    };

    SmtpTransport::new(mode, hostname, config.port(), credentials, from)
        .context("failed to build SMTP transport")
}

/// Build the mailer described by the configuration
///
/// Without an SMTP hostname, the mailer accepts every email and sends none.
pub fn mailer_from_config(
    config: &RootConfig,
    templates: Templates,
) -> Result<Mailer, anyhow::Error> {
    let Some(hostname) = config.email.hostname() else {
        tracing::warn!("No SMTP hostname configured, emails will be dropped");
        return Ok(Mailer::noop());
    };

    let transport = smtp_transport_from_config(&config.email, hostname)?;

    Ok(Mailer::new(
        config.site_url.clone(),
        link_paths_from_config(&config.mailer),
        LinkResolver::new(encoding_mode_from_config(&config.links)),
        templates,
        Arc::new(transport),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_without_hostname() {
        let mut config = RootConfig::test();
        let templates = templates_from_config(&config.mailer).await.unwrap();

        let mailer = mailer_from_config(&config, templates.clone()).unwrap();
        assert!(mailer.is_noop());
        mailer.test_connection().await.unwrap();

        config.email.hostname = Some(String::new());
        let mailer = mailer_from_config(&config, templates).unwrap();
        assert!(mailer.is_noop());
    }

    #[tokio::test]
    async fn smtp_with_hostname() {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut config = RootConfig::test();
        config.email.hostname = Some("smtp.example.com".to_owned());
        config.email.username = Some("user".to_owned());
        config.email.password = Some("hunter2".to_owned());
        let templates = templates_from_config(&config.mailer).await.unwrap();

        let mailer = mailer_from_config(&config, templates.clone()).unwrap();
        assert!(!mailer.is_noop());
        mailer.validate_email("alice@example.com").unwrap();
        assert!(mailer.validate_email("alice").is_err());

        config.email.from = "not an address".to_owned();
        assert!(mailer_from_config(&config, templates.clone()).is_err());

        config.email.from = "root@localhost".to_owned();
        config.email.password = None;
        assert!(mailer_from_config(&config, templates).is_err());
    }

    #[test]
    fn links_config_maps_to_encoding_mode() {
        let config = LinksConfig {
            without_fragment: true,
            add_url_type: true,
        };
        assert_eq!(
            encoding_mode_from_config(&config),
            EncodingMode {
                suppress_fragment: true,
                tag_url_type: true,
            }
        );
        assert_eq!(
            encoding_mode_from_config(&LinksConfig::default()),
            EncodingMode::default()
        );
    }
}
