//! Check command
//!
//! Verify all gems are installed

use anyhow::{Context, Result};
use lode::{Config, config, lockfile::Lockfile};
use std::fs;
use std::path::Path;

/// Verify all gems are installed
pub(crate) fn run(lockfile_path: &str, dry_run: bool) -> Result<()> {
    // In dry-run mode, just show what would be checked
    if dry_run {
        println!("Dry run: Would check gems in lockfile: {lockfile_path}");
    }

    // Read and parse lockfile
    let content = fs::read_to_string(lockfile_path)
        .with_context(|| format!("Failed to read lockfile: {lockfile_path}"))?;

    let lockfile = Lockfile::parse(&content)
        .with_context(|| format!("Failed to parse lockfile: {lockfile_path}"))?;

    // Get vendor directory
    let cfg = Config::load().unwrap_or_default();
    let vendor_dir = config::vendor_dir(Some(&cfg))?;

    // Determine Ruby version from lockfile or detect from active Ruby
    let ruby_version = config::ruby_version(lockfile.ruby_version.as_deref());

    let gems_dir = vendor_dir.join("ruby").join(&ruby_version).join("gems");

    println!("Checking installed gems in {}", gems_dir.display());

    let mut missing = Vec::new();
    let mut installed_count = 0;

    // Check regular gems
    for gem in &lockfile.gems {
        let gem_dir = gems_dir.join(gem.full_name());
        if gem_dir.exists() {
            installed_count += 1;
            println!(
                "  {name} ({version})",
                name = gem.name,
                version = gem.version
            );
        } else {
            missing.push(format!("{} ({})", gem.name, gem.version));
            println!(
                "  {name} ({version}) - not found",
                name = gem.name,
                version = gem.version
            );
        }
    }

    // Check git gems
    for git_gem in &lockfile.git_gems {
        let gem_dir = gems_dir.join(format!("{}-{}", git_gem.name, git_gem.version));
        if gem_dir.exists() {
            installed_count += 1;
            println!(
                "  {name} ({version}) [git]",
                name = git_gem.name,
                version = git_gem.version
            );
        } else {
            missing.push(format!("{} ({}) [git]", git_gem.name, git_gem.version));
            println!(
                "  {name} ({version}) [git] - not found",
                name = git_gem.name,
                version = git_gem.version
            );
        }
    }

    // Check path gems (these should exist at their source path)
    for path_gem in &lockfile.path_gems {
        if Path::new(&path_gem.path).exists() {
            installed_count += 1;
            println!(
                "  {name} ({version}) [path]",
                name = path_gem.name,
                version = path_gem.version
            );
        } else {
            missing.push(format!(
                "{} ({}) [path: {}]",
                path_gem.name, path_gem.version, path_gem.path
            ));
            println!(
                "  {name} ({version}) [path] - source not found at {path}",
                name = path_gem.name,
                version = path_gem.version,
                path = path_gem.path
            );
        }
    }

    // Print summary
    if !missing.is_empty() {
        println!("\nThe following gems are missing:");
        for gem in &missing {
            println!("  * {gem}");
        }
        println!("\nRun `lode install` to install missing gems.");
        anyhow::bail!("Missing {} gem(s)", missing.len());
    }

    println!("\nAll gems are installed ({installed_count} total)");
    Ok(())
}
