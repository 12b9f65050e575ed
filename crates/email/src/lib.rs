// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Helps sending emails carrying action links to users, with different email
//! backends

#![deny(missing_docs)]

mod links;
mod mailer;
mod transport;
mod uri;

pub use lettre::{
    Address, message::Mailbox, transport::smtp::authentication::Credentials as SmtpCredentials,
};

pub use self::{
    links::{EncodingMode, LinkRequest, LinkResolver, strip_origin},
    mailer::{Error, LinkPaths, Mailer},
    transport::{DeliveryBackend, SmtpMode, SmtpTransport, TemplateData, TransportError},
    uri::{MalformedUrl, UriReference},
};
