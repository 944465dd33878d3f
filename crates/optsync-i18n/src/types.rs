//! Identifiers and language codes

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TranslationError;

/// Content item identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl Display for PostId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PostId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Short codes expanded to full locales
const LOCALE_ALIASES: &[(&str, &str)] = &[("ko", "ko_KR"), ("en", "en_US")];

/// Normalized language tag (`ko_KR`, `en_US`, ...)
///
/// Known short codes are expanded; anything else passes through trimmed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Normalize a language code
    ///
    /// # Errors
    /// Returns [`TranslationError::InvalidRequest`] for empty input
    pub fn parse(code: &str) -> Result<Self, TranslationError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(TranslationError::InvalidRequest(
                "language code is empty".to_owned(),
            ));
        }
        let locale = LOCALE_ALIASES
            .iter()
            .find(|&&(short, _)| short == code)
            .map_or(code, |&(_, locale)| locale);
        Ok(Self(locale.to_owned()))
    }

    /// Tag as text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for LanguageCode {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for LanguageCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl Display for LanguageCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
