// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Send emails to users

use std::sync::Arc;

use authmail_data_model::{LinkType, User};
use authmail_templates::{EmailLinkContext, TemplateError, Templates};
use lettre::{Address, message::Mailbox};
use serde_json::Value;
use thiserror::Error;

use crate::{
    links::{LinkRequest, LinkResolver},
    transport::{DeliveryBackend, TemplateData, TransportError},
    uri::MalformedUrl,
};

/// Failed to send an email
#[derive(Debug, Error)]
pub enum Error {
    /// The link could not be built
    #[error(transparent)]
    MalformedUrl(#[from] MalformedUrl),

    /// The recipient address was rejected
    #[error("invalid email address {address:?}")]
    InvalidEmail {
        /// The rejected address
        address: String,

        /// Why it was rejected
        #[source]
        source: lettre::address::AddressError,
    },

    /// The backend failed to deliver the email
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The email could not be rendered
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Path of the link sent for each kind of email, resolved against the site
/// URL
///
/// An empty path means the link points to the referrer, or to the site URL
/// if there is none.
#[derive(Debug, Clone, Default)]
pub struct LinkPaths {
    /// Path of the invitation link
    pub invite: String,
    /// Path of the signup confirmation link
    pub confirmation: String,
    /// Path of the password recovery link
    pub recovery: String,
    /// Path of the email change confirmation link
    pub email_change: String,
}

impl LinkPaths {
    /// The path of links of the given type
    #[must_use]
    pub fn get(&self, link_type: LinkType) -> &str {
        match link_type {
            LinkType::Invite => &self.invite,
            LinkType::Confirmation => &self.confirmation,
            LinkType::Recovery => &self.recovery,
            LinkType::EmailChange => &self.email_change,
        }
    }
}

const fn fragment_key(link_type: LinkType) -> &'static str {
    match link_type {
        LinkType::Invite => "invite_token",
        LinkType::Confirmation => "confirmation_token",
        LinkType::Recovery => "recovery_token",
        LinkType::EmailChange => "email_change_token",
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, Error> {
    let parsed: Address = address.parse().map_err(|source| Error::InvalidEmail {
        address: address.to_owned(),
        source,
    })?;
    Ok(Mailbox::new(None, parsed))
}

/// Helps sending mails to users
///
/// A [`Mailer`] is either live, delivering emails through a
/// [`DeliveryBackend`], or a no-op one which accepts everything and sends
/// nothing. Cloning it is cheap.
#[derive(Clone)]
pub struct Mailer {
    inner: Arc<MailerInner>,
}

enum MailerInner {
    Noop,
    Template(TemplateMailer),
}

struct TemplateMailer {
    site_url: String,
    paths: LinkPaths,
    resolver: LinkResolver,
    templates: Templates,
    backend: Arc<dyn DeliveryBackend>,
}

impl Mailer {
    /// Constructs a [`Mailer`] delivering emails through the given backend
    #[must_use]
    pub fn new(
        site_url: String,
        paths: LinkPaths,
        resolver: LinkResolver,
        templates: Templates,
        backend: Arc<dyn DeliveryBackend>,
    ) -> Self {
        let inner = MailerInner::Template(TemplateMailer {
            site_url,
            paths,
            resolver,
            templates,
            backend,
        });

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Constructs a [`Mailer`] which never sends anything
    #[must_use]
    pub fn noop() -> Self {
        Self {
            inner: Arc::new(MailerInner::Noop),
        }
    }

    /// Whether this mailer drops every email
    #[must_use]
    pub fn is_noop(&self) -> bool {
        matches!(*self.inner, MailerInner::Noop)
    }

    /// Send an email inviting the user to create an account
    ///
    /// # Errors
    ///
    /// Will return `Err` if the link could not be built, or if the email
    /// failed rendering or failed sending
    #[tracing::instrument(
        name = "email.invite.send",
        skip_all,
        fields(user.id = %user.id, email.referrer = referrer_url),
    )]
    pub async fn invite_mail(&self, user: &User, referrer_url: &str) -> Result<(), Error> {
        self.link_mail(LinkType::Invite, user, referrer_url).await
    }

    /// Send an email asking the user to confirm their address
    ///
    /// # Errors
    ///
    /// Will return `Err` if the link could not be built, or if the email
    /// failed rendering or failed sending
    #[tracing::instrument(
        name = "email.confirmation.send",
        skip_all,
        fields(user.id = %user.id, email.referrer = referrer_url),
    )]
    pub async fn confirmation_mail(&self, user: &User, referrer_url: &str) -> Result<(), Error> {
        self.link_mail(LinkType::Confirmation, user, referrer_url)
            .await
    }

    /// Send the password recovery email to a user
    ///
    /// # Errors
    ///
    /// Will return `Err` if the link could not be built, or if the email
    /// failed rendering or failed sending
    #[tracing::instrument(
        name = "email.recovery.send",
        skip_all,
        fields(user.id = %user.id, email.referrer = referrer_url),
    )]
    pub async fn recovery_mail(&self, user: &User, referrer_url: &str) -> Result<(), Error> {
        self.link_mail(LinkType::Recovery, user, referrer_url).await
    }

    /// Send the email confirming a change of address. It goes to the new
    /// address.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the link could not be built, or if the email
    /// failed rendering or failed sending
    #[tracing::instrument(
        name = "email.email_change.send",
        skip_all,
        fields(user.id = %user.id, email.referrer = referrer_url),
    )]
    pub async fn email_change_mail(&self, user: &User, referrer_url: &str) -> Result<(), Error> {
        self.link_mail(LinkType::EmailChange, user, referrer_url)
            .await
    }

    async fn link_mail(
        &self,
        link_type: LinkType,
        user: &User,
        referrer_url: &str,
    ) -> Result<(), Error> {
        match self.inner.as_ref() {
            MailerInner::Noop => {
                tracing::debug!(%link_type, "Mail sending is disabled, dropping the email");
                Ok(())
            }
            MailerInner::Template(mailer) => mailer.link_mail(link_type, user, referrer_url).await,
        }
    }

    /// Send an already rendered email to the user's address
    ///
    /// # Errors
    ///
    /// Will return `Err` if the user address is invalid or if the backend
    /// failed to deliver the email
    #[tracing::instrument(
        name = "email.send",
        skip_all,
        fields(user.id = %user.id),
    )]
    pub async fn send(
        &self,
        user: &User,
        subject: &str,
        body: &str,
        data: &TemplateData,
    ) -> Result<(), Error> {
        match self.inner.as_ref() {
            MailerInner::Noop => {
                tracing::debug!("Mail sending is disabled, dropping the email");
                Ok(())
            }
            MailerInner::Template(mailer) => mailer.deliver(&user.email, subject, body, data).await,
        }
    }

    /// Check that an email address is acceptable
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEmail`] if the address is rejected
    pub fn validate_email(&self, address: &str) -> Result<(), Error> {
        match self.inner.as_ref() {
            MailerInner::Noop => Ok(()),
            MailerInner::Template(_) => parse_mailbox(address).map(|_| ()),
        }
    }

    /// Test the connection to the mail backend
    ///
    /// # Errors
    ///
    /// Returns an error if the connection failed
    #[tracing::instrument(name = "email.test_connection", skip_all)]
    pub async fn test_connection(&self) -> Result<(), TransportError> {
        match self.inner.as_ref() {
            MailerInner::Noop => Ok(()),
            MailerInner::Template(mailer) => mailer.backend.test_connection().await,
        }
    }
}

impl TemplateMailer {
    async fn link_mail(
        &self,
        link_type: LinkType,
        user: &User,
        referrer_url: &str,
    ) -> Result<(), Error> {
        let token = user.action_token(link_type);
        let fragment = format!("{}={token}", fragment_key(link_type));

        let url = self.resolver.resolve(&LinkRequest {
            referrer_url,
            site_url: &self.site_url,
            relative_path: self.paths.get(link_type),
            fragment_payload: &fragment,
            link_type,
        })?;

        let mut data = TemplateData::new();
        data.insert("link_type".to_owned(), link_type.as_str().into());
        data.insert("site_url".to_owned(), self.site_url.clone().into());
        data.insert("confirmation_url".to_owned(), url.clone().into());
        data.insert("email".to_owned(), user.email.clone().into());
        data.insert(
            "new_email".to_owned(),
            user.email_change.clone().map_or(Value::Null, Value::from),
        );
        data.insert("token".to_owned(), token.into());

        let context = EmailLinkContext::new(link_type, user, &self.site_url, url);
        let subject = self.templates.render_email_subject(&context)?;
        let body = self.templates.render_email_body(&context)?;

        self.deliver(user.recipient(link_type), &subject, &body, &data)
            .await
    }

    async fn deliver(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        data: &TemplateData,
    ) -> Result<(), Error> {
        let to = parse_mailbox(to)?;
        self.backend.send(&to, subject, body, data).await?;
        Ok(())
    }
}
