use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::error::SyncError;

/// Reads a newline-delimited word list. Blank lines and `#` comments are
/// skipped; a missing file is an empty list.
pub fn read_word_list(path: &Path) -> Result<BTreeSet<String>, SyncError> {
    if !path.exists() {
        tracing::debug!("{} not found; starting an empty word list", path.display());
        return Ok(BTreeSet::new());
    }

    let raw = fs::read_to_string(path).map_err(|source| SyncError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

pub fn render_word_list(words: &BTreeSet<String>) -> String {
    let mut out = String::new();
    for word in words {
        out.push_str(word);
        out.push('\n');
    }
    out
}
