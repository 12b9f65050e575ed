// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Build the links sent in emails

use std::sync::LazyLock;

use authmail_data_model::LinkType;
use regex::Regex;

use crate::uri::{MalformedUrl, UriReference};

static ORIGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^/]+").expect("the origin regex is valid"));

/// How the token is attached to a link
///
/// `tag_url_type` only has an effect if `suppress_fragment` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodingMode {
    /// Replace the `#` fragment marker with a `?` query marker
    pub suppress_fragment: bool,

    /// Put the link type followed by a `/` in front of the `?`
    pub tag_url_type: bool,
}

/// What a link is built from
#[derive(Debug, Clone, Copy)]
pub struct LinkRequest<'a> {
    /// The URL the request came from. Used as the base of the link when there
    /// is no `relative_path`.
    pub referrer_url: &'a str,

    /// The public URL of the site
    pub site_url: &'a str,

    /// A path resolved against the site URL
    pub relative_path: &'a str,

    /// What goes after the fragment marker, usually the token
    pub fragment_payload: &'a str,

    /// What the link is for, used to tag it if fragments are suppressed
    pub link_type: LinkType,
}

impl LinkRequest<'_> {
    fn base_url(&self) -> &str {
        if self.relative_path.is_empty() && !self.referrer_url.is_empty() {
            self.referrer_url
        } else {
            self.site_url
        }
    }
}

/// Turns [`LinkRequest`]s into URLs, following a fixed [`EncodingMode`]
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkResolver {
    mode: EncodingMode,
}

impl LinkResolver {
    /// Constructs a new [`LinkResolver`]
    #[must_use]
    pub const fn new(mode: EncodingMode) -> Self {
        Self { mode }
    }

    /// Build the URL of a link
    ///
    /// The base URL is the referrer if there is no relative path and the
    /// site URL otherwise. The relative path is resolved against it, and the
    /// fragment payload attached after a `#`. If fragments are suppressed,
    /// every `#` of the result is then rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or the relative path is not a valid
    /// URL
    pub fn resolve(&self, request: &LinkRequest<'_>) -> Result<String, MalformedUrl> {
        let mut url = UriReference::parse(request.base_url())?;

        if !request.relative_path.is_empty() {
            let path = UriReference::parse(request.relative_path)?;
            url = url.resolve(&path);
        }

        url.set_fragment(request.fragment_payload);
        let out = url.to_string();

        let out = match self.mode {
            EncodingMode {
                suppress_fragment: false,
                ..
            } => out,
            EncodingMode {
                suppress_fragment: true,
                tag_url_type: false,
            } => out.replace('#', "?"),
            EncodingMode {
                suppress_fragment: true,
                tag_url_type: true,
            } => out.replace('#', &format!("{}/?", request.link_type)),
        };

        Ok(out)
    }
}

/// Remove the `http(s)://host[:port]` prefix of a URL
///
/// Anything not starting like this is returned unchanged.
#[must_use]
pub fn strip_origin(url: &str) -> String {
    ORIGIN.replace(url, "").into_owned()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const PAYLOAD: &str = "access_token=abc&type=invite";

    fn request<'a>(
        referrer_url: &'a str,
        site_url: &'a str,
        relative_path: &'a str,
    ) -> LinkRequest<'a> {
        LinkRequest {
            referrer_url,
            site_url,
            relative_path,
            fragment_payload: PAYLOAD,
            link_type: LinkType::Invite,
        }
    }

    fn resolver(suppress_fragment: bool, tag_url_type: bool) -> LinkResolver {
        LinkResolver::new(EncodingMode {
            suppress_fragment,
            tag_url_type,
        })
    }

    #[test]
    fn test_default_mode() {
        let resolver = LinkResolver::default();
        let url = resolver
            .resolve(&request("", "https://app.example.com", ""))
            .unwrap();
        assert_eq!(url, "https://app.example.com#access_token=abc&type=invite");

        let url = resolver
            .resolve(&request("", "https://app.example.com", "/verify"))
            .unwrap();
        assert_eq!(
            url,
            "https://app.example.com/verify#access_token=abc&type=invite"
        );
    }

    #[test]
    fn test_base_precedence() {
        let resolver = LinkResolver::default();

        // The referrer wins when there is no path
        let url = resolver
            .resolve(&request(
                "https://client.example.org/welcome",
                "https://app.example.com",
                "",
            ))
            .unwrap();
        assert_eq!(
            url,
            "https://client.example.org/welcome#access_token=abc&type=invite"
        );

        // The site URL wins when there is a path
        let url = resolver
            .resolve(&request(
                "https://client.example.org/welcome",
                "https://app.example.com/app/",
                "verify",
            ))
            .unwrap();
        assert_eq!(
            url,
            "https://app.example.com/app/verify#access_token=abc&type=invite"
        );

        // An absolute path replaces the site URL entirely
        let url = resolver
            .resolve(&request(
                "",
                "https://app.example.com/app/",
                "https://other.example.net/confirm",
            ))
            .unwrap();
        assert_eq!(
            url,
            "https://other.example.net/confirm#access_token=abc&type=invite"
        );
    }

    #[test]
    fn test_existing_fragment_and_query() {
        let resolver = LinkResolver::default();

        // The base query is kept, its fragment replaced
        let url = resolver
            .resolve(&request("https://client.example.org/?lang=fr#old", "", ""))
            .unwrap();
        assert_eq!(
            url,
            "https://client.example.org/?lang=fr#access_token=abc&type=invite"
        );

        // A relative path with its own query drops the base query
        let url = resolver
            .resolve(&request("", "https://app.example.com/?a=1", "/verify?b=2"))
            .unwrap();
        assert_eq!(
            url,
            "https://app.example.com/verify?b=2#access_token=abc&type=invite"
        );
    }

    #[test]
    fn test_empty_payload() {
        let resolver = resolver(true, true);
        let url = resolver
            .resolve(&LinkRequest {
                fragment_payload: "",
                ..request("", "https://app.example.com/verify", "")
            })
            .unwrap();
        assert_eq!(url, "https://app.example.com/verify");
    }

    #[test]
    fn test_suppress_fragment() {
        let url = resolver(true, false)
            .resolve(&request("", "https://app.example.com", ""))
            .unwrap();
        assert_eq!(url, "https://app.example.com?access_token=abc&type=invite");
        assert!(!url.contains('#'));
    }

    #[test]
    fn test_tag_url_type() {
        let url = resolver(true, true)
            .resolve(&request("", "https://app.example.com", ""))
            .unwrap();
        assert_eq!(
            url,
            "https://app.example.comInvite/?access_token=abc&type=invite"
        );

        let url = resolver(true, true)
            .resolve(&LinkRequest {
                link_type: LinkType::EmailChange,
                ..request("", "https://app.example.com/", "")
            })
            .unwrap();
        assert_eq!(
            url,
            "https://app.example.com/EmailChange/?access_token=abc&type=invite"
        );

        // Tagging alone does nothing
        let url = resolver(false, true)
            .resolve(&request("", "https://app.example.com", ""))
            .unwrap();
        assert_eq!(url, "https://app.example.com#access_token=abc&type=invite");
    }

    #[test]
    fn test_malformed() {
        let resolver = LinkResolver::default();

        let error = resolver
            .resolve(&request("", "http://exa mple.com", ""))
            .unwrap_err();
        assert_eq!(error.url(), "http://exa mple.com");

        // The referrer is only parsed when it is used
        assert_matches!(
            resolver.resolve(&request("http://[::1", "https://app.example.com", "/ok")),
            Ok(_)
        );
        assert_matches!(
            resolver.resolve(&request("http://[::1", "https://app.example.com", "")),
            Err(_)
        );

        assert_matches!(
            resolver.resolve(&request("", "https://app.example.com", "/%zz")),
            Err(_)
        );
    }

    #[test]
    fn test_strip_origin() {
        assert_eq!(strip_origin("https://example.com/a/b"), "/a/b");
        assert_eq!(strip_origin("http://example.com:8080/a?b#c"), "/a?b#c");
        assert_eq!(strip_origin("/a/b"), "/a/b");
        assert_eq!(strip_origin("ftp://example.com/a"), "ftp://example.com/a");
        assert_eq!(strip_origin("https://example.com"), "");
    }
}
