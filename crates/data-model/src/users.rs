// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use chrono::{DateTime, Utc};
use rand::{Rng, distributions::Alphanumeric};
use serde::Serialize;
use ulid::Ulid;

use crate::LinkType;

/// The parts of a user account the mailer reads
///
/// Tokens are single-use values issued by the account service. An empty token
/// means none was issued; the mailer still sends whatever it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Ulid,
    pub email: String,
    pub created_at: DateTime<Utc>,

    /// The address the user asked to switch to, if an email change is pending
    pub email_change: Option<String>,

    pub confirmation_token: String,
    pub recovery_token: String,
    pub email_change_token: String,
}

impl User {
    /// The single-use token carried by links of the given type.
    ///
    /// Invitations are confirmed with the confirmation token.
    #[must_use]
    pub fn action_token(&self, link_type: LinkType) -> &str {
        match link_type {
            LinkType::Invite | LinkType::Confirmation => &self.confirmation_token,
            LinkType::Recovery => &self.recovery_token,
            LinkType::EmailChange => &self.email_change_token,
        }
    }

    /// The address a mail of the given type is delivered to.
    ///
    /// Email change confirmations go to the new address when one is pending.
    #[must_use]
    pub fn recipient(&self, link_type: LinkType) -> &str {
        match (link_type, &self.email_change) {
            (LinkType::EmailChange, Some(new_email)) => new_email,
            _ => &self.email,
        }
    }
}

fn random_token(rng: &mut impl Rng) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

impl User {
    #[doc(hidden)]
    #[must_use]
    pub fn samples(now: DateTime<Utc>, rng: &mut impl Rng) -> Vec<Self> {
        vec![
            User {
                id: Ulid::from_datetime_with_source(now.into(), rng),
                email: "alice@example.com".to_owned(),
                created_at: now,
                email_change: None,
                confirmation_token: random_token(rng),
                recovery_token: random_token(rng),
                email_change_token: String::new(),
            },
            User {
                id: Ulid::from_datetime_with_source(now.into(), rng),
                email: "bob@example.com".to_owned(),
                created_at: now,
                email_change: Some("robert@example.org".to_owned()),
                confirmation_token: String::new(),
                recovery_token: String::new(),
                email_change_token: random_token(rng),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    use super::*;

    #[test]
    fn test_action_token() {
        let mut rng = ChaChaRng::seed_from_u64(42);
        let user = &User::samples(Utc::now(), &mut rng)[0];

        assert_eq!(user.action_token(LinkType::Invite), user.confirmation_token);
        assert_eq!(
            user.action_token(LinkType::Confirmation),
            user.confirmation_token
        );
        assert_eq!(user.action_token(LinkType::Recovery), user.recovery_token);
        assert_eq!(user.action_token(LinkType::EmailChange), "");
    }

    #[test]
    fn test_recipient() {
        let mut rng = ChaChaRng::seed_from_u64(42);
        let users = User::samples(Utc::now(), &mut rng);

        assert_eq!(users[0].recipient(LinkType::EmailChange), "alice@example.com");
        assert_eq!(users[1].recipient(LinkType::Recovery), "bob@example.com");
        assert_eq!(users[1].recipient(LinkType::EmailChange), "robert@example.org");
    }
}
