// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Built-in subjects and bodies

use authmail_data_model::LinkType;

pub(crate) const fn subject(link_type: LinkType) -> &'static str {
    match link_type {
        LinkType::Invite => "You have been invited",
        LinkType::Confirmation => "Confirm Your Signup",
        LinkType::Recovery => "Reset Your Password",
        LinkType::EmailChange => "Confirm Email Change",
    }
}

pub(crate) const fn body(link_type: LinkType) -> &'static str {
    match link_type {
        LinkType::Invite => {
            r#"<h2>You have been invited</h2>

<p>You have been invited to create a user on {{ site_url }}. Follow this link to accept the invite:</p>
<p><a href="{{ confirmation_url }}">Accept the invite</a></p>
"#
        }
        LinkType::Confirmation => {
            r#"<h2>Confirm your signup</h2>

<p>Follow this link to confirm your user:</p>
<p><a href="{{ confirmation_url }}">Confirm your mail</a></p>
"#
        }
        LinkType::Recovery => {
            r#"<h2>Reset Password</h2>

<p>Follow this link to reset the password for your user:</p>
<p><a href="{{ confirmation_url }}">Reset Password</a></p>
"#
        }
        LinkType::EmailChange => {
            r#"<h2>Confirm Change of Email</h2>

<p>Follow this link to confirm the update of your email from {{ email }} to {{ new_email }}:</p>
<p><a href="{{ confirmation_url }}">Change Email</a></p>
"#
        }
    }
}
