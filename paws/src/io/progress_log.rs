//! Per-run training logs under `<log_dir>/<experiment>/<PREFIX>_<n>/`.
//!
//! Each training session gets the next free numbered directory; its name is
//! what the orchestrator uses to name the run under `model_dir`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const PROGRESS_FILE_NAME: &str = "progress.jsonl";

/// One finished training episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub episode: u64,
    /// Environment steps taken so far in the session.
    pub steps_done: u64,
    pub episode_steps: u64,
    pub episode_return: f64,
    pub best_return: f64,
    /// Whether the perturbed parameters replaced the best ones.
    pub accepted: bool,
}

/// Allocate `<log_root>/<experiment>/<prefix>_<n>` with `n` one past the
/// highest existing index (starting at 1).
pub fn allocate_run_dir(log_root: &Path, experiment: &str, prefix: &str) -> Result<PathBuf> {
    let parent = log_root.join(experiment);
    fs::create_dir_all(&parent).with_context(|| format!("create directory {}", parent.display()))?;

    let mut highest = 0u32;
    for entry in fs::read_dir(&parent).with_context(|| format!("read {}", parent.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", parent.display()))?;
        let name = entry.file_name();
        if let Some(index) = run_index(&name.to_string_lossy(), prefix) {
            highest = highest.max(index);
        }
    }

    let dir = parent.join(format!("{prefix}_{}", highest + 1));
    fs::create_dir_all(&dir).with_context(|| format!("create directory {}", dir.display()))?;
    debug!(dir = %dir.display(), "allocated run log directory");
    Ok(dir)
}

fn run_index(name: &str, prefix: &str) -> Option<u32> {
    name.strip_prefix(prefix)?.strip_prefix('_')?.parse().ok()
}

/// Append-only JSON-lines log of episode records.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    pub fn new(run_dir: &Path) -> Self {
        Self {
            path: run_dir.join(PROGRESS_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &EpisodeRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("serialize episode record")?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append {}", self.path.display()))
    }
}

/// Read every record of a progress log, in order.
pub fn read_progress(path: &Path) -> Result<Vec<EpisodeRecord>> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("parse {} line {}", path.display(), idx + 1))
        })
        .collect()
}
