//! Cache statistics and management
//!
//! Analyzes cache directories, calculates statistics, and formats sizes in
//! human-readable format.

use std::fs;
use std::path::Path;

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Number of files in cache
    pub files: usize,
    /// Total size in bytes
    pub total_size: i64,
}

impl Stats {
    /// Create empty stats
    #[must_use]
    pub const fn new() -> Self {
        Self {
            files: 0,
            total_size: 0,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect statistics from a cache directory
///
/// Walks the directory tree and counts files and total size.
/// Returns empty stats if directory doesn't exist (not an error).
///
/// # Errors
///
/// Returns an error if directory traversal fails.
pub fn collect_stats<P: AsRef<Path>>(cache_dir: P) -> std::io::Result<Stats> {
    let cache_dir = cache_dir.as_ref();
    let mut stats = Stats::new();

    if !cache_dir.exists() {
        return Ok(stats);
    }

    walk_dir(cache_dir, &mut stats)?;
    Ok(stats)
}

/// Recursive directory walker
fn walk_dir(dir: &Path, stats: &mut Stats) -> std::io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            walk_dir(&path, stats)?;
        } else if path.is_file() {
            stats.files += 1;
            if let Ok(metadata) = fs::metadata(&path) {
                stats.total_size += i64::try_from(metadata.len()).unwrap_or(i64::MAX);
            }
        }
        // Ignore symlinks and other special files for now
    }

    Ok(())
}

/// Convert bytes to human-readable format using binary units (1 KiB = 1024 bytes).
/// Examples: 512 -> "512 B", 1024 -> "1.0 KiB", 1048576 -> "1.0 MiB"
#[must_use]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_precision_loss)]
pub fn human_bytes(size: i64) -> String {
    const UNIT: f64 = 1024.0;
    const UNITS: &[char] = &['K', 'M', 'G', 'T', 'P', 'E'];

    // Handle sizes smaller than 1 KiB (including negative)
    if size < UNIT as i64 && size > -(UNIT as i64) {
        return format!("{size} B");
    }

    let size_f = size as f64;
    let abs_size = size_f.abs();
    let mut div = UNIT;
    let mut exp = 0;

    while abs_size / (div * UNIT) >= 1.0 && exp < UNITS.len() - 1 {
        div *= UNIT;
        exp += 1;
    }

    let unit = UNITS.get(exp).copied().unwrap_or('?');
    format!("{:.1} {unit}iB", size_f / div)
}
