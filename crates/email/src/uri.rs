// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! URI references, as defined in RFC 3986
//!
//! Unlike [`url::Url`], a [`UriReference`] may be relative and is serialized
//! the way it was written: an empty path stays empty and the scheme and
//! authority are never normalized beyond lowercasing the scheme. Generated
//! links depend on this exact shape.
//!
//! [`url::Url`]: https://docs.rs/url/latest/url/struct.Url.html

use std::{fmt, str::FromStr, sync::LazyLock};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::Regex;
use thiserror::Error;

/// Splits a reference in its five components, from RFC 3986 appendix B
static URI_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$")
        .expect("the URI reference regex is valid")
});

/// Characters kept as-is in a path, in addition to alphanumerics
const PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@')
    .remove(b'[')
    .remove(b']')
    .remove(b'/')
    .remove(b'%');

/// Characters kept as-is in a fragment, in addition to alphanumerics
const FRAGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b'/')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'?')
    .remove(b'@')
    .remove(b'!')
    .remove(b'(')
    .remove(b')')
    .remove(b'*');

/// A string could not be parsed as a URI reference
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed URL {url:?}: {reason}")]
pub struct MalformedUrl {
    url: String,
    reason: &'static str,
}

impl MalformedUrl {
    fn new(url: &str, reason: &'static str) -> Self {
        Self {
            url: url.to_owned(),
            reason,
        }
    }

    /// The string which failed to parse
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// An absolute or relative URI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriReference {
    scheme: Option<String>,
    authority: Option<String>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn has_valid_escapes(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
            if !valid {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

fn is_valid_host_char(c: char) -> bool {
    !c.is_ascii()
        || c.is_ascii_alphanumeric()
        || matches!(
            c,
            '-' | '.'
                | '_'
                | '~'
                | '!'
                | '$'
                | '&'
                | '\''
                | '('
                | ')'
                | '*'
                | '+'
                | ','
                | ';'
                | '='
                | '%'
        )
}

fn validate_authority(url: &str, authority: &str) -> Result<(), MalformedUrl> {
    let host_port = match authority.rsplit_once('@') {
        Some((userinfo, host_port)) => {
            if userinfo.chars().any(|c| c == ' ') || !has_valid_escapes(userinfo) {
                return Err(MalformedUrl::new(url, "invalid userinfo"));
            }
            host_port
        }
        None => authority,
    };

    let (host, port) = if let Some(rest) = host_port.strip_prefix('[') {
        let Some((literal, after)) = rest.split_once(']') else {
            return Err(MalformedUrl::new(url, "missing ']' in host"));
        };
        if !literal
            .chars()
            .all(|c| c.is_ascii_hexdigit() || matches!(c, ':' | '.' | '%' | '-' | '_' | '~'))
        {
            return Err(MalformedUrl::new(url, "invalid IP literal"));
        }
        match after {
            "" => ("", None),
            _ => match after.strip_prefix(':') {
                Some(port) => ("", Some(port)),
                None => return Err(MalformedUrl::new(url, "invalid port after host")),
            },
        }
    } else {
        match host_port.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (host_port, None),
        }
    };

    if !host.chars().all(is_valid_host_char) || !has_valid_escapes(host) {
        return Err(MalformedUrl::new(url, "invalid character in host name"));
    }

    if port.is_some_and(|port| !port.bytes().all(|b| b.is_ascii_digit())) {
        return Err(MalformedUrl::new(url, "invalid port"));
    }

    Ok(())
}

impl UriReference {
    /// Parse a URI reference
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a syntactically valid URI
    /// reference
    pub fn parse(s: &str) -> Result<Self, MalformedUrl> {
        if s.chars().any(|c| c.is_ascii_control()) {
            return Err(MalformedUrl::new(s, "invalid control character"));
        }

        let Some(captures) = URI_REFERENCE.captures(s) else {
            return Err(MalformedUrl::new(s, "not a URI reference"));
        };

        let scheme = captures.get(1).map(|m| m.as_str());
        let authority = captures.get(2).map(|m| m.as_str());
        let path = captures.get(3).map_or("", |m| m.as_str());
        let query = captures.get(4).map(|m| m.as_str());
        let fragment = captures.get(5).map(|m| m.as_str());

        match scheme {
            Some(scheme) if !is_valid_scheme(scheme) => {
                return Err(MalformedUrl::new(
                    s,
                    "first path segment in URL cannot contain colon",
                ));
            }
            Some(_) => {}
            // The regex reads any colon in the first segment as the end of a
            // scheme, so an unmatched one can only be a leading colon
            None if authority.is_none() && path.starts_with(':') => {
                return Err(MalformedUrl::new(s, "missing protocol scheme"));
            }
            None => {}
        }

        if let Some(authority) = authority {
            validate_authority(s, authority)?;
        }

        if !has_valid_escapes(path) {
            return Err(MalformedUrl::new(s, "invalid escape in path"));
        }

        let fragment = match fragment {
            Some(fragment) if !has_valid_escapes(fragment) => {
                return Err(MalformedUrl::new(s, "invalid escape in fragment"));
            }
            Some(fragment) => Some(percent_decode_str(fragment).decode_utf8_lossy().into_owned()),
            None => None,
        };

        Ok(Self {
            scheme: scheme.map(str::to_ascii_lowercase),
            authority: authority.map(ToOwned::to_owned),
            path: path.to_owned(),
            query: query.map(ToOwned::to_owned),
            fragment,
        })
    }

    /// The scheme, lowercased
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// The authority, with the user info and port if any
    #[must_use]
    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// The path, as written
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query, without the leading `?`
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The decoded fragment
    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Replace the fragment. An empty fragment removes it.
    pub fn set_fragment(&mut self, fragment: &str) {
        self.fragment = (!fragment.is_empty()).then(|| fragment.to_owned());
    }

    /// Resolve a reference against this base, as described in RFC 3986
    /// section 5.2
    #[must_use]
    pub fn resolve(&self, reference: &UriReference) -> UriReference {
        let mut target = reference.clone();
        if target.scheme.is_none() {
            target.scheme.clone_from(&self.scheme);
        }

        let has_authority = reference
            .authority
            .as_deref()
            .is_some_and(|authority| !authority.is_empty());

        if reference.scheme.is_some() || has_authority {
            target.path = resolve_path(&reference.path, "");
            return target;
        }

        if reference.path.is_empty() && reference.query.is_none() {
            target.query.clone_from(&self.query);
            if reference.fragment.is_none() {
                target.fragment.clone_from(&self.fragment);
            }
        }

        target.authority.clone_from(&self.authority);
        target.path = resolve_path(&self.path, &reference.path);
        target
    }
}

impl FromStr for UriReference {
    type Err = MalformedUrl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for UriReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}:")?;
        }

        if let Some(authority) = &self.authority {
            write!(f, "//{authority}")?;
            if !authority.is_empty() && !self.path.is_empty() && !self.path.starts_with('/') {
                f.write_str("/")?;
            }
        }

        write!(f, "{}", utf8_percent_encode(&self.path, PATH))?;

        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }

        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", utf8_percent_encode(fragment, FRAGMENT))?;
        }

        Ok(())
    }
}

/// Merge a reference path into a base path and remove the dot segments
///
/// A non-empty result always starts with a `/`.
fn resolve_path(base: &str, reference: &str) -> String {
    let full = if reference.is_empty() {
        base.to_owned()
    } else if reference.starts_with('/') {
        reference.to_owned()
    } else {
        let prefix = base.rfind('/').map_or("", |i| &base[..=i]);
        format!("{prefix}{reference}")
    };

    if full.is_empty() {
        return full;
    }

    let mut out = String::from("/");
    let mut first = true;
    let mut last = "";
    for segment in full.split('/') {
        last = segment;
        match segment {
            "." => first = false,
            ".." => {
                out = match out[1..].rfind('/') {
                    Some(index) => format!("/{}", &out[1..=index]),
                    None => {
                        first = true;
                        String::from("/")
                    }
                };
            }
            _ => {
                if !first {
                    out.push('/');
                }
                out.push_str(segment);
                first = false;
            }
        }
    }

    if last == "." || last == ".." {
        out.push('/');
    }

    // The loop above writes a `/` for the leading empty segment too
    if out.as_bytes().get(1) == Some(&b'/') {
        out.remove(0);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(base: &str, reference: &str) -> String {
        let base = UriReference::parse(base).unwrap();
        let reference = UriReference::parse(reference).unwrap();
        base.resolve(&reference).to_string()
    }

    #[test]
    fn test_parse_components() {
        let uri = UriReference::parse("HTTPS://user@example.com:8443/a/b?x=1#frag%20ment").unwrap();
        assert_eq!(uri.scheme(), Some("https"));
        assert_eq!(uri.authority(), Some("user@example.com:8443"));
        assert_eq!(uri.path(), "/a/b");
        assert_eq!(uri.query(), Some("x=1"));
        assert_eq!(uri.fragment(), Some("frag ment"));

        let uri = UriReference::parse("/verify?next=/home").unwrap();
        assert_eq!(uri.scheme(), None);
        assert_eq!(uri.authority(), None);
        assert_eq!(uri.path(), "/verify");
        assert_eq!(uri.query(), Some("next=/home"));

        let uri = UriReference::parse("").unwrap();
        assert_eq!(uri, UriReference::default());
    }

    #[test]
    fn test_serialize_keeps_shape() {
        for s in [
            "https://app.example.com",
            "https://app.example.com/",
            "https://app.example.com:8080/path?q=1",
            "http://[::1]:8080/",
            "/relative/path",
            "relative",
            "file:///etc/hosts",
            "https://app.example.com?",
        ] {
            assert_eq!(UriReference::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_serialize_escapes() {
        let uri = UriReference::parse("https://example.com/a b").unwrap();
        assert_eq!(uri.to_string(), "https://example.com/a%20b");

        let mut uri = UriReference::parse("https://example.com").unwrap();
        uri.set_fragment("token=a b#c");
        assert_eq!(uri.to_string(), "https://example.com#token=a%20b%23c");

        uri.set_fragment("access_token=abc&type=invite");
        assert_eq!(
            uri.to_string(),
            "https://example.com#access_token=abc&type=invite"
        );

        uri.set_fragment("name=o'brien!(x)*");
        assert_eq!(uri.to_string(), "https://example.com#name=o%27brien!(x)*");

        uri.set_fragment("");
        assert_eq!(uri.fragment(), None);
        assert_eq!(uri.to_string(), "https://example.com");
    }

    #[test]
    fn test_parse_errors() {
        for s in [
            "http://exa mple.com",
            "http://example.com:port/",
            "http://[::1/",
            "://example.com",
            "1http://example.com",
            "https://example.com/%zz",
            "https://example.com/#%4",
            "https://example.com/\n",
            "https://example.com/\u{7f}",
        ] {
            assert!(UriReference::parse(s).is_err(), "{s:?} should not parse");
        }
    }

    #[test]
    fn test_resolve_rfc3986_examples() {
        let base = "http://a/b/c/d;p?q";

        // Normal examples from RFC 3986 section 5.4.1
        assert_eq!(resolve(base, "g"), "http://a/b/c/g");
        assert_eq!(resolve(base, "./g"), "http://a/b/c/g");
        assert_eq!(resolve(base, "g/"), "http://a/b/c/g/");
        assert_eq!(resolve(base, "/g"), "http://a/g");
        assert_eq!(resolve(base, "//g"), "http://g");
        assert_eq!(resolve(base, "?y"), "http://a/b/c/d;p?y");
        assert_eq!(resolve(base, "g?y"), "http://a/b/c/g?y");
        assert_eq!(resolve(base, "#s"), "http://a/b/c/d;p?q#s");
        assert_eq!(resolve(base, "g#s"), "http://a/b/c/g#s");
        assert_eq!(resolve(base, ";x"), "http://a/b/c/;x");
        assert_eq!(resolve(base, ""), "http://a/b/c/d;p?q");
        assert_eq!(resolve(base, "."), "http://a/b/c/");
        assert_eq!(resolve(base, "./"), "http://a/b/c/");
        assert_eq!(resolve(base, ".."), "http://a/b/");
        assert_eq!(resolve(base, "../"), "http://a/b/");
        assert_eq!(resolve(base, "../g"), "http://a/b/g");
        assert_eq!(resolve(base, "../.."), "http://a/");
        assert_eq!(resolve(base, "../../g"), "http://a/g");

        // Abnormal examples from section 5.4.2
        assert_eq!(resolve(base, "../../../g"), "http://a/g");
        assert_eq!(resolve(base, "/./g"), "http://a/g");
        assert_eq!(resolve(base, "/../g"), "http://a/g");
        assert_eq!(resolve(base, "g."), "http://a/b/c/g.");
        assert_eq!(resolve(base, "g.."), "http://a/b/c/g..");
        assert_eq!(resolve(base, "./g/."), "http://a/b/c/g/");
        assert_eq!(resolve(base, "g/../h"), "http://a/b/c/h");
    }

    #[test]
    fn test_resolve_against_empty_path() {
        assert_eq!(
            resolve("https://app.example.com", "/verify"),
            "https://app.example.com/verify"
        );
        assert_eq!(
            resolve("https://app.example.com", "verify"),
            "https://app.example.com/verify"
        );
        assert_eq!(
            resolve("https://app.example.com", "https://other.example.org/x"),
            "https://other.example.org/x"
        );
        assert_eq!(resolve("/a/b", "c"), "/a/c");
    }
}
