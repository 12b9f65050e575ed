// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use authmail_data_model::{LinkType, User};
use serde::Serialize;

/// Context used to render the subject and body of an email carrying an
/// action link
#[derive(Debug, Clone, Serialize)]
pub struct EmailLinkContext {
    link_type: LinkType,
    site_url: String,
    confirmation_url: String,
    email: String,
    new_email: Option<String>,
    token: String,
}

impl EmailLinkContext {
    /// Constructs a context for the given user and link
    #[must_use]
    pub fn new(link_type: LinkType, user: &User, site_url: &str, confirmation_url: String) -> Self {
        Self {
            link_type,
            site_url: site_url.to_owned(),
            confirmation_url,
            email: user.email.clone(),
            new_email: user.email_change.clone(),
            token: user.action_token(link_type).to_owned(),
        }
    }

    /// The kind of email this context renders
    #[must_use]
    pub fn link_type(&self) -> LinkType {
        self.link_type
    }
}
