use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dialoguer::Confirm;

use crate::config::{Config, OutputFormat};
use crate::cspell;
use crate::error::SyncError;
use crate::extract::{ExtractionPolicy, extract_words};
use crate::github::GithubClient;
use crate::members::{Member, load_members, save_snapshot};
use crate::persist::write_atomically;
use crate::wordlist::{read_word_list, render_word_list};

pub struct RunContext<'a> {
    pub config: &'a Config,
    pub dry_run: bool,
    pub confirm: bool,
}

/// How a sync run ended. Every failure is logged where it happens and
/// surfaces here as a non-writing outcome.
#[derive(Debug)]
pub enum SyncOutcome {
    NoMembers,
    Skipped(SyncError),
    UpToDate,
    DryRun { added: BTreeSet<String> },
    Declined,
    Written { path: PathBuf, added: BTreeSet<String> },
}

/// Where merged words end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeTarget {
    /// Read `source`, write the merged document to `output` (often the same file).
    Cspell { source: PathBuf, output: PathBuf },
    WordList { path: PathBuf },
}

impl MergeTarget {
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        match config.output_format {
            OutputFormat::Cspell => Ok(Self::Cspell {
                source: config.cspell_file.clone(),
                output: config
                    .output_file
                    .clone()
                    .unwrap_or_else(|| config.cspell_file.clone()),
            }),
            OutputFormat::WordList => config
                .output_file
                .clone()
                .map(|path| Self::WordList { path })
                .ok_or(SyncError::MissingOutputTarget),
        }
    }

    /// Computes the write needed to add `candidates`, or `None` when every
    /// candidate is already present.
    pub fn plan(&self, candidates: &BTreeSet<String>) -> Result<Option<PendingWrite>, SyncError> {
        match self {
            Self::Cspell { source, output } => {
                let mut document = cspell::load_or_default(source);
                let added = document.merge_words(candidates);
                if added.is_empty() {
                    return Ok(None);
                }
                let contents = document.to_pretty_json().map_err(|err| SyncError::Io {
                    path: output.clone(),
                    source: err.into(),
                })?;
                Ok(Some(PendingWrite {
                    path: output.clone(),
                    added,
                    contents,
                }))
            }
            Self::WordList { path } => {
                let existing = read_word_list(path)?;
                let added = cspell::new_words(&existing, candidates);
                if added.is_empty() {
                    return Ok(None);
                }
                let merged: BTreeSet<String> = existing.union(&added).cloned().collect();
                Ok(Some(PendingWrite {
                    path: path.clone(),
                    added,
                    contents: render_word_list(&merged),
                }))
            }
        }
    }
}

#[derive(Debug)]
pub struct PendingWrite {
    pub path: PathBuf,
    pub added: BTreeSet<String>,
    contents: String,
}

impl PendingWrite {
    pub fn commit(&self) -> Result<(), SyncError> {
        write_atomically(&self.path, &self.contents)
    }
}

pub fn run_local_flow(members_file: &Path, ctx: &RunContext<'_>) -> Result<SyncOutcome> {
    tracing::info!("Loading members from {}", members_file.display());

    let loaded = match load_members(members_file) {
        Ok(loaded) => loaded,
        Err(err) => {
            tracing::error!("{err}");
            tracing::info!(
                "No valid members data found in {}. Exiting.",
                members_file.display()
            );
            return Ok(SyncOutcome::NoMembers);
        }
    };

    for (idx, err) in &loaded.rejected {
        tracing::warn!("Skipping member #{}: {}", idx, err);
    }

    sync_members(&loaded.members, ctx)
}

pub async fn run_remote_flow(
    snapshot: Option<&Path>,
    ctx: &RunContext<'_>,
) -> Result<SyncOutcome> {
    let config = ctx.config;

    let client = match GithubClient::new(config.github_token.as_deref(), &config.github_api_url) {
        Ok(client) => client,
        Err(err) => {
            tracing::warn!("{err}. Skipping remote sync.");
            return Ok(SyncOutcome::Skipped(err));
        }
    };

    let Some(org) = config.github_org.as_deref() else {
        let err = SyncError::MissingOrganization;
        tracing::warn!("{err}. Skipping remote sync.");
        return Ok(SyncOutcome::Skipped(err));
    };

    tracing::info!("Fetching members of {} from {}", org, config.github_api_url);
    let mut members = match client.list_members(org).await {
        Ok(members) => members,
        Err(err) => {
            tracing::error!("{err}");
            return Ok(SyncOutcome::NoMembers);
        }
    };

    if config.policy.reads_display_name() {
        client.fill_display_names(&mut members).await;
    }

    if let Some(path) = snapshot {
        if ctx.dry_run {
            tracing::info!("Dry run: not writing member snapshot to {}", path.display());
        } else if let Err(err) = save_snapshot(path, &members) {
            tracing::warn!("Failed to save member snapshot: {err}");
        } else {
            tracing::info!("Saved {} members to {}", members.len(), path.display());
        }
    }

    sync_members(&members, ctx)
}

/// Extracts words from `members` and merges them into the configured target.
pub fn sync_members(members: &[Member], ctx: &RunContext<'_>) -> Result<SyncOutcome> {
    if members.is_empty() {
        tracing::info!("No members to process. Exiting.");
        return Ok(SyncOutcome::NoMembers);
    }

    let words = collect_words(members, ctx.config.policy);
    tracing::info!(
        "Extracted {} candidate words from {} members",
        words.len(),
        members.len()
    );

    let target = match MergeTarget::from_config(ctx.config) {
        Ok(target) => target,
        Err(err) => {
            tracing::warn!("{err}. Nothing written.");
            return Ok(SyncOutcome::Skipped(err));
        }
    };

    let pending = match target.plan(&words) {
        Ok(Some(pending)) => pending,
        Ok(None) => {
            tracing::info!("No new words to add.");
            return Ok(SyncOutcome::UpToDate);
        }
        Err(err) => {
            tracing::error!("{err}");
            return Ok(SyncOutcome::Skipped(err));
        }
    };

    if ctx.dry_run {
        print_added_words(&pending, "DRY RUN");
        return Ok(SyncOutcome::DryRun {
            added: pending.added,
        });
    }

    if ctx.confirm {
        print_added_words(&pending, "REVIEW");
        let prompt = format!(
            "Write {} new words to {}?",
            pending.added.len(),
            pending.path.display()
        );
        if !prompt_write_confirmation(&prompt)? {
            tracing::info!("Skipping write to {}", pending.path.display());
            return Ok(SyncOutcome::Declined);
        }
    }

    if let Err(err) = pending.commit() {
        tracing::error!("{err}");
        return Ok(SyncOutcome::Skipped(err));
    }

    tracing::info!(
        "Added {} new words to {}: {}",
        pending.added.len(),
        pending.path.display(),
        join_words(&pending.added)
    );

    Ok(SyncOutcome::Written {
        path: pending.path,
        added: pending.added,
    })
}

pub fn collect_words(members: &[Member], policy: ExtractionPolicy) -> BTreeSet<String> {
    let mut words = BTreeSet::new();
    for member in members {
        let extracted = member.words(policy);
        if extracted.is_empty() {
            tracing::debug!("No words extracted for '{}'", member.login);
            continue;
        }
        tracing::debug!("Extracted from '{}': {:?}", member.login, extracted);
        words.extend(extracted);
    }
    words
}

/// Prints the words each handle yields under `policy`.
pub fn print_extracted(handles: &[String], policy: ExtractionPolicy) {
    for handle in handles {
        let words = extract_words(handle, policy);
        if words.is_empty() {
            tracing::warn!("No words extracted from '{}'", handle);
            continue;
        }
        println!("{handle}: {}", words.join(" "));
    }
}

fn print_added_words(pending: &PendingWrite, label: &str) {
    println!(
        "[{}][{}] {} new words",
        label,
        pending.path.display(),
        pending.added.len()
    );
    for word in &pending.added {
        println!("  + {word}");
    }
}

fn join_words(words: &BTreeSet<String>) -> String {
    words.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn prompt_write_confirmation(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(true)
        .interact()
        .context("failed to read approval input")
}
