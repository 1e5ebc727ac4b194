use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Rule used to turn a member handle or display name into words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionPolicy {
    /// First token of the login, splitting on `-`, `_` and whitespace
    #[default]
    FirstToken,
    /// Every `-` separated token of the login, ignoring anything from the first `_`
    DashSplit,
    /// Every whitespace separated token of the display name
    FullName,
}

impl ExtractionPolicy {
    /// Whether this policy reads the display name rather than the login.
    pub fn reads_display_name(self) -> bool {
        matches!(self, Self::FullName)
    }
}

pub fn extract_words(raw: &str, policy: ExtractionPolicy) -> Vec<String> {
    match policy {
        ExtractionPolicy::FirstToken => raw
            .replace(['-', '_'], " ")
            .split_whitespace()
            .next()
            .map(|first| vec![first.to_string()])
            .unwrap_or_default(),
        ExtractionPolicy::DashSplit => {
            let stem = match raw.find('_') {
                Some(idx) => &raw[..idx],
                None => raw,
            };
            stem.split('-')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect()
        }
        ExtractionPolicy::FullName => raw.split_whitespace().map(str::to_string).collect(),
    }
}
