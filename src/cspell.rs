use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{SyncError, json_kind};

pub const DEFAULT_VERSION: &str = "0.2";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_IGNORE_PATHS: [&str; 3] = [".devcontainer/**", ".vscode/**", ".github/**"];

/// A cspell configuration document. Only `ignoreWords` is typed; the other
/// keys are kept as raw JSON and written back untouched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CspellConfig {
    #[serde(default = "default_version")]
    pub version: Value,
    #[serde(default = "default_language")]
    pub language: Value,
    #[serde(default = "empty_array")]
    pub ignore_paths: Value,
    #[serde(default, deserialize_with = "lenient_words")]
    pub ignore_words: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CspellConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            language: default_language(),
            ignore_paths: DEFAULT_IGNORE_PATHS.iter().copied().map(Value::from).collect(),
            ignore_words: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl CspellConfig {
    /// Adds every candidate not already ignored. On change the word list is
    /// rewritten sorted and without duplicates; returns the added words.
    pub fn merge_words(&mut self, candidates: &BTreeSet<String>) -> BTreeSet<String> {
        let existing: BTreeSet<String> = self.ignore_words.iter().cloned().collect();
        let added = new_words(&existing, candidates);
        if !added.is_empty() {
            self.ignore_words = existing.union(&added).cloned().collect();
        }
        added
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Candidates that are not yet in `existing`.
pub fn new_words(existing: &BTreeSet<String>, candidates: &BTreeSet<String>) -> BTreeSet<String> {
    candidates
        .difference(existing)
        .filter(|word| !word.is_empty())
        .cloned()
        .collect()
}

/// Reads a cspell file. A missing file yields `Ok(None)`.
pub fn read_cspell(path: &Path) -> Result<Option<CspellConfig>, SyncError> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path).map_err(|source| SyncError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&raw).map_err(|source| SyncError::MalformedJson {
        path: path.to_path_buf(),
        source,
    })?;
    if !value.is_object() {
        return Err(SyncError::UnexpectedShape(format!(
            "{} holds {}, expected an object",
            path.display(),
            json_kind(&value)
        )));
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| SyncError::MalformedJson {
            path: path.to_path_buf(),
            source,
        })
}

/// Loads the cspell file, falling back to the default document when it is
/// missing or unreadable.
pub fn load_or_default(path: &Path) -> CspellConfig {
    match read_cspell(path) {
        Ok(Some(config)) => config,
        Ok(None) => {
            tracing::info!("{} not found. Initializing new structure.", path.display());
            CspellConfig::default()
        }
        Err(err) => {
            tracing::error!("{err}. Resetting to new structure.");
            CspellConfig::default()
        }
    }
}

fn default_version() -> Value {
    Value::from(DEFAULT_VERSION)
}

fn default_language() -> Value {
    Value::from(DEFAULT_LANGUAGE)
}

fn empty_array() -> Value {
    Value::Array(Vec::new())
}

fn lenient_words<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        tracing::warn!(
            "'ignoreWords' is {}, expected an array. Resetting to an empty list.",
            json_kind(&value)
        );
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(word) => Some(word),
            other => {
                tracing::warn!("Dropping non-string ignoreWords entry: {other}");
                None
            }
        })
        .collect())
}
