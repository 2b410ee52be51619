use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const FALLBACK_LOCALE: &str = "en";

/// Display text that is either a single string or a locale -> text table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl Default for LocalizedText {
    fn default() -> Self {
        LocalizedText::Plain(String::new())
    }
}

impl From<&str> for LocalizedText {
    fn from(value: &str) -> Self {
        LocalizedText::Plain(value.to_string())
    }
}

impl LocalizedText {
    /// Resolves the text for `locale`, falling back to its base language, the
    /// config default locale, `en`, and finally any available entry.
    pub fn resolve(&self, locale: Option<&str>, default_locale: Option<&str>) -> &str {
        let table = match self {
            LocalizedText::Plain(text) => return text,
            LocalizedText::Localized(table) => table,
        };
        resolve_by_locale(table, locale, default_locale)
            .or_else(|| table.values().next().map(String::as_str))
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        match self {
            LocalizedText::Plain(text) => text.trim().is_empty(),
            LocalizedText::Localized(table) => table.values().all(|text| text.trim().is_empty()),
        }
    }
}

fn resolve_by_locale<'a>(
    table: &'a BTreeMap<String, String>,
    locale: Option<&str>,
    default_locale: Option<&str>,
) -> Option<&'a str> {
    let candidates = [locale, locale.and_then(base_language), default_locale];
    for candidate in candidates.iter().flatten() {
        if let Some(text) = table.get(*candidate) {
            return Some(text.as_str());
        }
        let lowered = candidate.to_ascii_lowercase().replace('_', "-");
        if let Some((_, text)) = table
            .iter()
            .find(|(key, _)| key.to_ascii_lowercase().replace('_', "-") == lowered)
        {
            return Some(text.as_str());
        }
    }
    table.get(FALLBACK_LOCALE).map(String::as_str)
}

fn base_language(locale: &str) -> Option<&str> {
    locale
        .split(['-', '_'])
        .next()
        .filter(|base| !base.is_empty() && *base != locale)
}
