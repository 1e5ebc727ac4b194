use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::extract::ExtractionPolicy;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_MEMBERS_FILE: &str = "members.json";
pub const DEFAULT_CSPELL_FILE: &str = "cspell.json";

/// Shape of the file new words are merged into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// cspell JSON configuration (`ignoreWords`)
    #[default]
    Cspell,
    /// Plain text, one word per line
    WordList,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: Option<String>,
    pub github_org: Option<String>,
    pub github_api_url: String,
    pub members_file: PathBuf,
    pub cspell_file: PathBuf,
    pub output_file: Option<PathBuf>,
    pub output_format: OutputFormat,
    pub policy: ExtractionPolicy,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    github_token: Option<String>,
    github_org: Option<String>,
    github_api_url: Option<String>,
    members_file: Option<PathBuf>,
    cspell_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    output_format: Option<OutputFormat>,
    policy: Option<ExtractionPolicy>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub github_org: Option<String>,
    pub github_api_url: Option<String>,
    pub members_file: Option<PathBuf>,
    pub cspell_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub output_format: Option<OutputFormat>,
    pub policy: Option<ExtractionPolicy>,
}

impl Config {
    pub fn load(config_path: Option<PathBuf>, overrides: ConfigOverrides) -> Result<Self> {
        let file_config = load_file_config(config_path.as_ref())?;

        Ok(Self::resolve(file_config, overrides, |key| env::var(key).ok()))
    }

    fn resolve(
        file_config: FileConfig,
        overrides: ConfigOverrides,
        env_var: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let non_empty = |key: &str| env_var(key).filter(|value| !value.trim().is_empty());

        let github_token = file_config
            .github_token
            .or_else(|| non_empty("GITHUB_TOKEN"));

        let github_org = overrides
            .github_org
            .or(file_config.github_org)
            .or_else(|| non_empty("GITHUB_ORG"));

        let github_api_url = overrides
            .github_api_url
            .or(file_config.github_api_url)
            .or_else(|| non_empty("GITHUB_API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let members_file = overrides
            .members_file
            .or(file_config.members_file)
            .or_else(|| non_empty("MEMBERS_FILE").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MEMBERS_FILE));

        let cspell_file = overrides
            .cspell_file
            .or(file_config.cspell_file)
            .or_else(|| non_empty("CSPELL_FILE").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CSPELL_FILE));

        let output_file = overrides
            .output_file
            .or(file_config.output_file)
            .or_else(|| non_empty("CSPELL_OUTPUT_FILE").map(PathBuf::from));

        let output_format = overrides
            .output_format
            .or(file_config.output_format)
            .unwrap_or_default();

        let policy = overrides
            .policy
            .or(file_config.policy)
            .or_else(|| {
                non_empty("CSPELL_SYNC_POLICY").and_then(|value| {
                    ExtractionPolicy::from_str(value.trim(), true)
                        .inspect_err(|_| {
                            tracing::warn!("Ignoring unknown CSPELL_SYNC_POLICY '{}'", value)
                        })
                        .ok()
                })
            })
            .unwrap_or_default();

        Self {
            github_token,
            github_org,
            github_api_url,
            members_file,
            cspell_file,
            output_file,
            output_format,
            policy,
        }
    }

    /// Config rooted in `dir` with no environment or config file consulted.
    #[cfg(test)]
    pub(crate) fn isolated(dir: &Path) -> Self {
        let overrides = ConfigOverrides {
            members_file: Some(dir.join(DEFAULT_MEMBERS_FILE)),
            cspell_file: Some(dir.join(DEFAULT_CSPELL_FILE)),
            ..ConfigOverrides::default()
        };
        Self::resolve(FileConfig::default(), overrides, |_| None)
    }
}

fn load_file_config(path: Option<&PathBuf>) -> Result<FileConfig> {
    if let Some(path) = path {
        if path.exists() {
            return read_config_from_path(path);
        }
        anyhow::bail!("config path {:?} does not exist", path);
    }

    if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            return read_config_from_path(&default_path);
        }
    }

    Ok(FileConfig::default())
}

fn read_config_from_path(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "cspell-sync", "cspell-sync")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
