//! Path utilities for Gemfile and lockfile detection.
//! Supports both traditional (Gemfile/Gemfile.lock) and modern (gems.rb/gems.locked) naming.

use crate::env_vars;
use std::path::{Path, PathBuf};

/// Find the Gemfile in the current directory.
/// Priority: `BUNDLE_GEMFILE` env var -> gems.rb -> Gemfile (defaults to Gemfile if neither exists).
#[must_use]
pub fn find_gemfile() -> PathBuf {
    // Check BUNDLE_GEMFILE environment variable first
    if let Some(gemfile) = env_vars::bundle_gemfile() {
        return PathBuf::from(gemfile);
    }

    find_gemfile_in(".")
}

/// Find the Gemfile in `dir`, checking gems.rb first (modern) then Gemfile (traditional).
/// Defaults to "Gemfile" if neither exists.
#[must_use]
pub fn find_gemfile_in(dir: impl AsRef<Path>) -> PathBuf {
    let dir = dir.as_ref();

    // Check for gems.rb (modern convention)
    let gems_rb = dir.join("gems.rb");
    if gems_rb.exists() {
        return gems_rb;
    }

    // Check for Gemfile (traditional)
    let gemfile = dir.join("Gemfile");
    if gemfile.exists() {
        return gemfile;
    }

    // Default to Gemfile if neither exists
    gemfile
}

/// Find the lockfile in the current directory.
/// Priority: gems.locked -> Gemfile.lock (defaults to Gemfile.lock if neither exists).
#[must_use]
pub fn find_lockfile() -> PathBuf {
    find_lockfile_in(".")
}

/// Find the lockfile in `dir`, checking gems.locked first (modern) then Gemfile.lock (traditional).
/// Defaults to "Gemfile.lock" if neither exists.
#[must_use]
pub fn find_lockfile_in(dir: impl AsRef<Path>) -> PathBuf {
    let dir = dir.as_ref();

    // Check for gems.locked (modern convention)
    let gems_locked = dir.join("gems.locked");
    if gems_locked.exists() {
        return gems_locked;
    }

    // Check for Gemfile.lock (traditional)
    let gemfile_lock = dir.join("Gemfile.lock");
    if gemfile_lock.exists() {
        return gemfile_lock;
    }

    // Default to Gemfile.lock if neither exists
    gemfile_lock
}

/// Get the lockfile path for a given Gemfile.
/// Maps gems.rb -> gems.locked, otherwise appends ".lock".
#[must_use]
pub fn lockfile_for_gemfile(gemfile: &Path) -> PathBuf {
    if let Some(file_name) = gemfile.file_name()
        && file_name == "gems.rb"
    {
        return gemfile.with_file_name("gems.locked");
    }

    // Default: append .lock to the gemfile path
    let mut lockfile = gemfile.as_os_str().to_owned();
    lockfile.push(".lock");
    PathBuf::from(lockfile)
}

/// Get the Gemfile path for a given lockfile.
/// Maps gems.locked -> gems.rb, otherwise removes ".lock".
#[must_use]
pub fn gemfile_for_lockfile(lockfile: &Path) -> PathBuf {
    if let Some(file_name) = lockfile.file_name()
        && file_name == "gems.locked"
    {
        return lockfile.with_file_name("gems.rb");
    }

    // Default: remove .lock extension
    let lockfile_str = lockfile.to_string_lossy();
    if let Some(gemfile_str) = lockfile_str.strip_suffix(".lock") {
        return PathBuf::from(gemfile_str);
    }

    // Fallback: just return the lockfile as-is
    lockfile.to_path_buf()
}
