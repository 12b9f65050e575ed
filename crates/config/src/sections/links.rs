// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::fmt;

use schemars::JsonSchema;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, Visitor},
};

use crate::ConfigurationSection;

/// Configuration of how action links carry their token
///
/// Links normally carry their token in the URL fragment (after a `#`). Some
/// clients never see the fragment, so it can be turned into a query string
/// instead.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, JsonSchema, Serialize)]
pub struct LinksConfig {
    /// Replace the `#` before the token with a `?`. Defaults to `false`.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub without_fragment: bool,

    /// When `without_fragment` is set, put the link type (`Invite`,
    /// `Confirmation`, `Recovery` or `EmailChange`) followed by a `/` in front
    /// of the `?`. Has no effect otherwise. Defaults to `false`.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub add_url_type: bool,
}

struct FlagVisitor;

impl Visitor<'_> for FlagVisitor {
    type Value = bool;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a boolean flag")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
        Ok(v)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
        Ok(v.eq_ignore_ascii_case("true"))
    }

    fn visit_i64<E: de::Error>(self, _v: i64) -> Result<bool, E> {
        Ok(false)
    }

    fn visit_u64<E: de::Error>(self, _v: u64) -> Result<bool, E> {
        Ok(false)
    }

    fn visit_f64<E: de::Error>(self, _v: f64) -> Result<bool, E> {
        Ok(false)
    }

    fn visit_char<E: de::Error>(self, _v: char) -> Result<bool, E> {
        Ok(false)
    }

    fn visit_unit<E: de::Error>(self) -> Result<bool, E> {
        Ok(false)
    }

    fn visit_none<E: de::Error>(self) -> Result<bool, E> {
        Ok(false)
    }
}

// Only a case-insensitive `true` turns a flag on. Anything else, an empty or
// a numeric value included, leaves it off.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(FlagVisitor)
}

impl LinksConfig {
    /// Returns true if the configuration is the default one
    pub(crate) fn is_default(&self) -> bool {
        self == &Self::default()
    }
}

impl ConfigurationSection for LinksConfig {
    const PATH: Option<&'static str> = Some("links");
}

#[cfg(test)]
mod tests {
    use figment::{Figment, Jail, providers::Env};

    use super::*;
    use crate::ConfigurationSectionExt;

    #[test]
    fn load_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("AUTHMAIL_LINKS__WITHOUT_FRAGMENT", "true");
            jail.set_env("AUTHMAIL_LINKS__ADD_URL_TYPE", "true");

            let figment = Figment::new().merge(Env::prefixed("AUTHMAIL_").split("__"));
            let config = LinksConfig::extract_or_default(&figment).map_err(|e| e.to_string())?;

            assert!(config.without_fragment);
            assert!(config.add_url_type);

            Ok(())
        });
    }

    #[test]
    fn lenient_flags() {
        Jail::expect_with(|jail| {
            let figment = || Figment::new().merge(Env::prefixed("AUTHMAIL_").split("__"));

            for (value, expected) in [
                ("TRUE", true),
                ("True", true),
                ("true", true),
                ("", false),
                ("yes", false),
                ("1", false),
                ("false", false),
            ] {
                jail.set_env("AUTHMAIL_LINKS__WITHOUT_FRAGMENT", value);
                jail.set_env("AUTHMAIL_LINKS__ADD_URL_TYPE", value);

                let config =
                    LinksConfig::extract_or_default(&figment()).map_err(|e| e.to_string())?;

                assert_eq!(config.without_fragment, expected, "{value:?}");
                assert_eq!(config.add_url_type, expected, "{value:?}");
            }

            Ok(())
        });
    }

    #[test]
    fn defaults_when_missing() {
        Jail::expect_with(|_jail| {
            let config =
                LinksConfig::extract_or_default(&Figment::new()).map_err(|e| e.to_string())?;

            assert!(config.is_default());

            Ok(())
        });
    }
}
