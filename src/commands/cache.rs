//! Cache command
//!
//! Inspect and clear the content-addressed archive cache that the
//! Acquisition Orchestrator reads and writes (`~/.cache/lode/gems` or
//! `XDG_CACHE_HOME`-derived equivalent).

use anyhow::{Context, Result};
use lode::{Config, config};
use std::fs;

pub(crate) enum CacheAction {
    Clean,
    List,
    Path,
}

/// Run the `lode cache` subcommand.
///
/// # Errors
///
/// Returns an error if the cache directory cannot be determined, read, or
/// (for `clean`) removed.
pub(crate) fn run(action: CacheAction) -> Result<()> {
    let cfg = Config::load().unwrap_or_default();
    let cache_dir = config::cache_dir(Some(&cfg)).context("Failed to determine cache directory")?;

    match action {
        CacheAction::Path => {
            println!("{}", cache_dir.display());
        }
        CacheAction::List => {
            let stats = lode::collect_stats(&cache_dir).context("Failed to read cache directory")?;
            println!("{}", cache_dir.display());
            if cache_dir.exists() {
                for entry in fs::read_dir(&cache_dir).context("Failed to read cache directory")? {
                    let entry = entry?;
                    if let Some(name) = entry.file_name().to_str() {
                        println!("  {name}");
                    }
                }
            }
            println!(
                "{} files, {}",
                stats.files,
                lode::human_bytes(stats.total_size)
            );
        }
        CacheAction::Clean => {
            if cache_dir.exists() {
                fs::remove_dir_all(&cache_dir).with_context(|| {
                    format!("Failed to remove cache directory {}", cache_dir.display())
                })?;
            }
            println!("Removed {}", cache_dir.display());
        }
    }

    Ok(())
}
