//! Report locale value object.

use super::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A BCP-47 style language tag (`en`, `zh`, `pt-BR`, `zh-Hant`).
///
/// Only the shape is validated; unknown languages are passed to the model
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let tag = input.trim();
        let mut parts = tag.split(['-', '_']);

        let primary = parts.next().unwrap_or("");
        if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(DomainError::InvalidLocale(tag.to_string()));
        }

        for sub in parts {
            if !(2..=8).contains(&sub.len()) || !sub.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(DomainError::InvalidLocale(tag.to_string()));
            }
        }

        Ok(Self(tag.replace('_', "-")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag, lowercased.
    pub fn language(&self) -> String {
        self.0
            .split('-')
            .next()
            .unwrap_or(&self.0)
            .to_ascii_lowercase()
    }

    /// English name of the language, used in prompts.
    pub fn display_name(&self) -> &str {
        match self.language().as_str() {
            "en" => "English",
            "zh" => "Chinese",
            "ja" => "Japanese",
            "ko" => "Korean",
            "es" => "Spanish",
            "fr" => "French",
            "de" => "German",
            "pt" => "Portuguese",
            "ru" => "Russian",
            "it" => "Italian",
            _ => self.as_str(),
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self("en".to_string())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Locale {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Locale> for String {
    fn from(value: Locale) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_tags() {
        assert_eq!(Locale::parse("en").unwrap().as_str(), "en");
        assert_eq!(Locale::parse("pt_BR").unwrap().as_str(), "pt-BR");
        assert_eq!(Locale::parse("zh-Hant").unwrap().language(), "zh");
    }

    #[test]
    fn rejects_malformed_tags() {
        assert!(Locale::parse("").is_err());
        assert!(Locale::parse("english").is_err());
        assert!(Locale::parse("e1").is_err());
        assert!(Locale::parse("en-").is_err());
        assert!(Locale::parse("en-toolongsubtag").is_err());
    }

    #[test]
    fn display_name_falls_back_to_tag() {
        assert_eq!(Locale::parse("ja").unwrap().display_name(), "Japanese");
        assert_eq!(Locale::parse("sw").unwrap().display_name(), "sw");
        assert_eq!(Locale::default().display_name(), "English");
    }
}
