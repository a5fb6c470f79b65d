//! Plan/apply orchestration for patching one virtualenv.
//!
//! A [`PatchPlan`] holds the target file plus its original and updated
//! content, so callers can inspect (or diff) the change before committing
//! it. Applying a plan writes the file atomically, and only if the edit
//! sequence actually changed something.

use crate::edits::apply_edits;
use crate::locate::{self, LocateError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Outcome of patching one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchOutcome should be checked to report what happened"]
pub enum PatchOutcome {
    /// The service module was rewritten with the patched content.
    Patched { file: PathBuf },
    /// Already patched, or no anchor matched; the file was not touched.
    Unchanged { file: PathBuf },
    /// airtrain is not installed in this environment; nothing to do.
    NotInstalled { file: PathBuf },
}

/// A computed patch for one target file, not yet written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPlan {
    pub file: PathBuf,
    pub original: String,
    pub updated: String,
}

impl PatchPlan {
    /// True when the edit sequence left the content byte-identical.
    pub fn is_noop(&self) -> bool {
        self.original == self.updated
    }

    /// Persist the plan. No-op plans never touch the file, so its
    /// modification time stays put and nothing downstream rebuilds.
    pub fn apply(&self) -> Result<PatchOutcome, PatchError> {
        if self.is_noop() {
            return Ok(PatchOutcome::Unchanged {
                file: self.file.clone(),
            });
        }

        atomic_write(&self.file, self.updated.as_bytes()).map_err(|source| PatchError::Write {
            path: self.file.clone(),
            source,
        })?;

        Ok(PatchOutcome::Patched {
            file: self.file.clone(),
        })
    }
}

/// Compute the patch for a virtualenv without applying it.
///
/// `Ok(None)` means airtrain is not installed (the service module does not
/// exist); a malformed environment with no site-packages is an error.
pub fn plan(venv: &Path) -> Result<Option<PatchPlan>, PatchError> {
    let file = locate::service_file(venv)?;

    if !file.exists() {
        return Ok(None);
    }

    let original = fs::read_to_string(&file).map_err(|source| PatchError::Read {
        path: file.clone(),
        source,
    })?;
    let updated = apply_edits(&original);

    Ok(Some(PatchPlan {
        file,
        original,
        updated,
    }))
}

/// Resolve, compute, and persist in one step.
pub fn patch_environment(venv: &Path) -> Result<PatchOutcome, PatchError> {
    match plan(venv)? {
        Some(plan) => plan.apply(),
        None => Ok(PatchOutcome::NotInstalled {
            file: locate::service_file(venv)?,
        }),
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full updated content lands on disk or the original file is
/// left untouched. The mtime is stamped after the rename so Python's
/// bytecode cache notices the source changed.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent directory")
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    filetime::set_file_mtime(path, filetime::FileTime::now())?;

    Ok(())
}
