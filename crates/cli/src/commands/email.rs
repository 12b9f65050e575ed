// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use anyhow::Context;
use authmail_config::{ConfigurationSection, RootConfig};
use authmail_data_model::{LinkType, Ulid, User};
use authmail_email::{LinkRequest, LinkResolver, Mailer, strip_origin};
use clap::Parser;
use figment::Figment;
use tracing::{info, info_span, warn};

use crate::util::{
    encoding_mode_from_config, link_paths_from_config, mailer_from_config, templates_from_config,
};

#[derive(Parser, Debug)]
pub(super) struct Options {
    #[command(subcommand)]
    subcommand: Subcommand,
}

#[derive(Parser, Debug)]
enum Subcommand {
    /// Print the link which would be sent for the given kind of email
    Link {
        /// Kind of email: invite, confirmation, recovery or email-change
        kind: LinkType,

        /// What goes after the fragment marker
        #[arg(long, default_value = "")]
        payload: String,

        /// URL the request came from
        #[arg(long, default_value = "")]
        referrer: String,

        /// Only print the path and what follows, without the origin
        #[arg(long)]
        path_only: bool,
    },

    /// Send one email
    Send {
        /// Kind of email: invite, confirmation, recovery or email-change
        kind: LinkType,

        /// Address of the user
        email: String,

        /// The token to put in the link
        #[arg(long)]
        token: String,

        /// The address the user switches to, for email-change mails
        #[arg(long)]
        new_email: Option<String>,

        /// URL the request came from
        #[arg(long, default_value = "")]
        referrer: String,
    },

    /// Check that an email address is acceptable
    Validate {
        /// The address to check
        address: String,
    },

    /// Check that the SMTP server is reachable
    TestConnection,
}

/// A user holding the given token for the given kind of email
fn user_for(link_type: LinkType, email: String, new_email: Option<String>, token: String) -> User {
    let mut user = User {
        id: Ulid::new(),
        email,
        created_at: chrono::Utc::now(),
        email_change: new_email,
        confirmation_token: String::new(),
        recovery_token: String::new(),
        email_change_token: String::new(),
    };

    match link_type {
        LinkType::Invite | LinkType::Confirmation => user.confirmation_token = token,
        LinkType::Recovery => user.recovery_token = token,
        LinkType::EmailChange => user.email_change_token = token,
    }

    user
}

async fn send(mailer: &Mailer, link_type: LinkType, user: &User, referrer: &str) -> anyhow::Result<()> {
    match link_type {
        LinkType::Invite => mailer.invite_mail(user, referrer).await?,
        LinkType::Confirmation => mailer.confirmation_mail(user, referrer).await?,
        LinkType::Recovery => mailer.recovery_mail(user, referrer).await?,
        LinkType::EmailChange => mailer.email_change_mail(user, referrer).await?,
    }

    Ok(())
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        use Subcommand as SC;
        let config = RootConfig::extract(figment).map_err(anyhow::Error::from_boxed)?;

        match self.subcommand {
            SC::Link {
                kind,
                payload,
                referrer,
                path_only,
            } => {
                let _span = info_span!("cli.email.link").entered();

                let resolver = LinkResolver::new(encoding_mode_from_config(&config.links));
                let paths = link_paths_from_config(&config.mailer);
                let url = resolver.resolve(&LinkRequest {
                    referrer_url: &referrer,
                    site_url: &config.site_url,
                    relative_path: paths.get(kind),
                    fragment_payload: &payload,
                    link_type: kind,
                })?;

                if path_only {
                    println!("{}", strip_origin(&url));
                } else {
                    println!("{url}");
                }
            }

            SC::Send {
                kind,
                email,
                token,
                new_email,
                referrer,
            } => {
                let _span = info_span!("cli.email.send", email.kind = %kind).entered();

                if kind == LinkType::EmailChange && new_email.is_none() {
                    anyhow::bail!("sending an email change confirmation requires --new-email");
                }

                let templates = templates_from_config(&config.mailer).await?;
                let mailer = mailer_from_config(&config, templates)?;
                if mailer.is_noop() {
                    warn!("No SMTP hostname configured, the email will not be sent");
                }

                let user = user_for(kind, email, new_email, token);
                mailer.validate_email(user.recipient(kind))?;
                send(&mailer, kind, &user, &referrer)
                    .await
                    .with_context(|| format!("failed to send the {kind} email"))?;

                info!(user.id = %user.id, "Email sent");
            }

            SC::Validate { address } => {
                let _span = info_span!("cli.email.validate").entered();

                let templates = templates_from_config(&config.mailer).await?;
                let mailer = mailer_from_config(&config, templates)?;

                if let Err(e) = mailer.validate_email(&address) {
                    warn!(error = &e as &dyn std::error::Error, "Address rejected");
                    return Ok(ExitCode::FAILURE);
                }

                info!(%address, "Address accepted");
            }

            SC::TestConnection => {
                let _span = info_span!("cli.email.test_connection").entered();

                let templates = templates_from_config(&config.mailer).await?;
                let mailer = mailer_from_config(&config, templates)?;
                mailer
                    .test_connection()
                    .await
                    .context("could not connect to the SMTP server")?;

                info!("Connection to the mail backend looks good");
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}
