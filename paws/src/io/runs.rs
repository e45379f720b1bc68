//! Run directory and artifact resolution under `training.model_dir`.
//!
//! Layout: `<model_dir>/<run_name>/model`. Without an explicit run name the
//! most recently modified run directory is selected; ties on modification
//! time go to the lexicographically greatest directory name.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::debug;

/// Fixed file name of a persisted artifact inside a run directory.
pub const ARTIFACT_FILE_NAME: &str = "model";

/// Recoverable resolution failures. Entry points report these and stop
/// gracefully; any other error is a genuine fault.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("model directory not found at {}; run `paws train` first", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("run directory not found at {}; check evaluation.run_name", .0.display())]
    RunNotFound(PathBuf),
    #[error("no runs found in {}", .0.display())]
    NoRunsAvailable(PathBuf),
    #[error("model not found at {}; run `paws train` first", .0.display())]
    ArtifactNotFound(PathBuf),
}

/// A directory holding one training session's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub name: String,
    pub dir: PathBuf,
}

impl RunRecord {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let name = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, dir }
    }

    /// Path of the artifact, which must already be fully persisted.
    pub fn artifact_path(&self) -> Result<PathBuf> {
        let path = self.dir.join(ARTIFACT_FILE_NAME);
        if !path.is_file() {
            return Err(ResolveError::ArtifactNotFound(path).into());
        }
        Ok(path)
    }
}

/// Locate the run directory for `run_name`, or the latest run when `None`.
///
/// Resolution failures are returned as [`ResolveError`] inside the
/// `anyhow::Error`; I/O faults while scanning carry their own context.
pub fn resolve_run(root: &Path, run_name: Option<&str>) -> Result<RunRecord> {
    if !root.is_dir() {
        return Err(ResolveError::DirectoryNotFound(root.to_path_buf()).into());
    }

    if let Some(name) = run_name {
        let dir = root.join(name);
        if !dir.is_dir() {
            return Err(ResolveError::RunNotFound(dir).into());
        }
        debug!(run = %dir.display(), "using named run");
        return Ok(RunRecord::new(dir));
    }

    let latest = list_runs(root)?
        .into_iter()
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.name.cmp(&b.1.name)))
        .map(|(_, run)| run)
        .ok_or_else(|| ResolveError::NoRunsAvailable(root.to_path_buf()))?;
    debug!(run = %latest.dir.display(), "using latest run");
    Ok(latest)
}

/// Immediate sub-directories of `root` with their modification times.
fn list_runs(root: &Path) -> Result<Vec<(SystemTime, RunRecord)>> {
    let mut runs = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("read {}", root.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", root.display()))?;
        let path = entry.path();
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            // Dangling symlink.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err).with_context(|| format!("stat {}", path.display())),
        };
        if !metadata.is_dir() {
            continue;
        }
        let modified = metadata
            .modified()
            .with_context(|| format!("modification time of {}", path.display()))?;
        runs.push((modified, RunRecord::new(path)));
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::set_dir_mtime;

    fn resolve_err(err: anyhow::Error) -> ResolveError {
        err.downcast::<ResolveError>().expect("resolve error")
    }

    #[test]
    fn selects_most_recently_modified_run() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::create_dir(root.join("run_b")).expect("mkdir");
        fs::create_dir(root.join("run_a")).expect("mkdir");
        set_dir_mtime(&root.join("run_a"), 1_000).expect("mtime");
        set_dir_mtime(&root.join("run_b"), 2_000).expect("mtime");

        let run = resolve_run(root, None).expect("resolve");

        assert_eq!(run.name, "run_b");
        assert_eq!(run.dir, root.join("run_b"));
    }

    #[test]
    fn newest_wins_even_when_lexicographically_smaller() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        for name in ["a_new", "z_old"] {
            fs::create_dir(root.join(name)).expect("mkdir");
        }
        set_dir_mtime(&root.join("z_old"), 1_000).expect("mtime");
        set_dir_mtime(&root.join("a_new"), 5_000).expect("mtime");

        assert_eq!(resolve_run(root, None).expect("resolve").name, "a_new");
    }

    #[test]
    fn equal_mtimes_break_ties_by_greatest_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        for name in ["PPO_1", "PPO_3", "PPO_2"] {
            fs::create_dir(root.join(name)).expect("mkdir");
            set_dir_mtime(&root.join(name), 3_000).expect("mtime");
        }

        assert_eq!(resolve_run(root, None).expect("resolve").name, "PPO_3");
    }

    #[test]
    fn named_run_ignores_modification_times() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::create_dir(root.join("run_a")).expect("mkdir");
        fs::create_dir(root.join("run_b")).expect("mkdir");
        set_dir_mtime(&root.join("run_a"), 1_000).expect("mtime");
        set_dir_mtime(&root.join("run_b"), 2_000).expect("mtime");

        let run = resolve_run(root, Some("run_a")).expect("resolve");

        assert_eq!(run.name, "run_a");
    }

    #[test]
    fn files_are_not_runs() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::write(root.join("model"), "stray").expect("write");

        let err = resolve_err(resolve_run(root, None).unwrap_err());

        assert_eq!(err, ResolveError::NoRunsAvailable(root.to_path_buf()));
    }

    #[test]
    fn empty_root_has_no_runs() {
        let temp = tempfile::tempdir().expect("tempdir");

        let err = resolve_err(resolve_run(temp.path(), None).unwrap_err());

        assert_eq!(err, ResolveError::NoRunsAvailable(temp.path().to_path_buf()));
    }

    #[test]
    fn missing_root_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("models");

        let err = resolve_err(resolve_run(&root, None).unwrap_err());

        assert_eq!(err, ResolveError::DirectoryNotFound(root));
    }

    #[test]
    fn unknown_named_run_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("run_a")).expect("mkdir");

        let err = resolve_err(resolve_run(temp.path(), Some("run_z")).unwrap_err());

        assert_eq!(err, ResolveError::RunNotFound(temp.path().join("run_z")));
    }

    #[test]
    fn artifact_path_requires_persisted_artifact() {
        let temp = tempfile::tempdir().expect("tempdir");
        let run_dir = temp.path().join("run_a");
        fs::create_dir(&run_dir).expect("mkdir");
        let run = RunRecord::new(&run_dir);

        let err = resolve_err(run.artifact_path().unwrap_err());
        assert_eq!(err, ResolveError::ArtifactNotFound(run_dir.join("model")));

        fs::write(run_dir.join("model.tmp"), "partial").expect("write");
        assert!(run.artifact_path().is_err());

        fs::write(run_dir.join("model"), "{}").expect("write");
        assert_eq!(run.artifact_path().expect("artifact"), run_dir.join("model"));
    }
}
