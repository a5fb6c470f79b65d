//! Target-file resolution inside a virtualenv layout.
//!
//! A virtualenv keeps installed packages under `lib/python<X.Y>/site-packages`.
//! The interpreter-version component varies per environment, so the resolver
//! scans `lib/` for the first directory that matches.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Fixed path of the telemetry service module relative to site-packages.
pub const SERVICE_RELATIVE_PATH: &str = "airtrain/telemetry/service.py";

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("could not locate site-packages under {venv}")]
    SitePackagesNotFound { venv: PathBuf },

    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// Find the site-packages directory under `<venv>/lib`.
///
/// Candidates are `python*` directories that contain a `site-packages`
/// child. Entries are sorted by name so the chosen candidate is
/// deterministic when several interpreter versions coexist.
pub fn site_packages(venv: &Path) -> Result<PathBuf, LocateError> {
    let lib_dir = venv.join("lib");

    if !lib_dir.is_dir() {
        return Err(LocateError::SitePackagesNotFound {
            venv: venv.to_path_buf(),
        });
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(&lib_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| LocateError::Scan {
            path: lib_dir.clone(),
            source,
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let is_python_dir = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with("python"));
        if is_python_dir && entry.path().join("site-packages").is_dir() {
            candidates.push(entry.path().join("site-packages"));
        }
    }

    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| LocateError::SitePackagesNotFound {
            venv: venv.to_path_buf(),
        })
}

/// Resolve the telemetry service module path for a virtualenv.
///
/// The returned path is not checked for existence: an absent file means the
/// dependency is not installed, which the caller treats as a no-op.
pub fn service_file(venv: &Path) -> Result<PathBuf, LocateError> {
    Ok(site_packages(venv)?.join(SERVICE_RELATIVE_PATH))
}
