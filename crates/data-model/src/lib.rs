// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![allow(clippy::module_name_repetitions)]

mod link_type;
mod users;

pub use ulid::Ulid;

pub use self::{
    link_type::{LinkType, UnknownLinkTypeError},
    users::User,
};
