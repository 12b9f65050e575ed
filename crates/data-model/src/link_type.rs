// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The user action an emailed link stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    Invite,
    Confirmation,
    Recovery,
    EmailChange,
}

impl LinkType {
    pub const ALL: [Self; 4] = [
        Self::Invite,
        Self::Confirmation,
        Self::Recovery,
        Self::EmailChange,
    ];

    /// The tag used to mark links of this type, as it appears in rewritten
    /// URLs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invite => "Invite",
            Self::Confirmation => "Confirmation",
            Self::Recovery => "Recovery",
            Self::EmailChange => "EmailChange",
        }
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown link type {0:?}")]
pub struct UnknownLinkTypeError(String);

impl FromStr for LinkType {
    type Err = UnknownLinkTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "invite" => Ok(Self::Invite),
            "confirmation" | "signup" => Ok(Self::Confirmation),
            "recovery" => Ok(Self::Recovery),
            "emailchange" => Ok(Self::EmailChange),
            _ => Err(UnknownLinkTypeError(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("invite".parse::<LinkType>().unwrap(), LinkType::Invite);
        assert_eq!("signup".parse::<LinkType>().unwrap(), LinkType::Confirmation);
        assert_eq!(
            "email-change".parse::<LinkType>().unwrap(),
            LinkType::EmailChange
        );
        assert_eq!(
            "email_change".parse::<LinkType>().unwrap(),
            LinkType::EmailChange
        );
        assert!("magiclink".parse::<LinkType>().is_err());

        for link_type in LinkType::ALL {
            assert_eq!(link_type.as_str().parse::<LinkType>().unwrap(), link_type);
        }
    }
}
