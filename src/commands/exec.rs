//! Exec command
//!
//! Run a command with the lode managed gem environment

use anyhow::{Context, Result};
use lode::{Config, config, lockfile::Lockfile, ruby};
use std::env;
use std::fs;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Name of the no-op file that shadows the default package-manager entry
/// point so gems that unconditionally `require "rubygems"` don't fail
/// under the library-search-path model.
const SHIM_FILE: &str = "rubygems.rb";

/// Name of the generated file preloaded via `RUBYOPT` that defines a
/// private no-op `gem(name, *requirements)`, suppressing activation
/// calls that have no meaning once gems are resolved by library path.
const PRELOAD_FILE: &str = "lode_preload.rb";

/// Build the library-search-path components for `gems_dir`, in order:
/// the shims directory, then each installed gem's `.require_paths`
/// entries, then the interpreter's own stdlib directories.
fn build_library_search_path(
    environment_root: &Path,
    gems_dir: &Path,
    ruby_version: &str,
) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    let shims_dir = environment_root.join("shims");
    if let Err(err) = write_shim_file(&shims_dir) {
        eprintln!("lode: warning: failed to write shim file: {err}");
    } else {
        paths.push(shims_dir);
    }

    if let Ok(entries) = fs::read_dir(gems_dir) {
        let mut gem_dirs: Vec<_> = entries.flatten().map(|e| e.path()).collect();
        gem_dirs.sort();

        for gem_dir in gem_dirs {
            if !gem_dir.is_dir() {
                continue;
            }

            for require_path in require_paths_for(&gem_dir) {
                let full_path = gem_dir.join(&require_path);
                if full_path.is_dir() {
                    paths.push(full_path);
                }
            }
        }
    }

    if let Some(prefix) = ruby::detect_interpreter_prefix() {
        let api_version = ruby::to_major_minor(ruby_version);
        paths.extend(ruby::stdlib_dirs(&prefix, &api_version));
    }

    paths
}

/// Read a gem's `.require_paths` marker file, defaulting to `lib` if the
/// marker is missing or empty.
fn require_paths_for(gem_dir: &Path) -> Vec<String> {
    let marker = gem_dir.join(".require_paths");
    fs::read_to_string(marker).map_or_else(
        |_| vec!["lib".to_string()],
        |content| {
            let paths: Vec<String> = content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            if paths.is_empty() {
                vec!["lib".to_string()]
            } else {
                paths
            }
        },
    )
}

fn write_shim_file(shims_dir: &Path) -> Result<()> {
    fs::create_dir_all(shims_dir)?;
    fs::write(
        shims_dir.join(SHIM_FILE),
        "# shadows the interpreter's default package-manager bootstrap\n",
    )?;
    Ok(())
}

fn write_preload_file(environment_root: &Path) -> Result<PathBuf> {
    fs::create_dir_all(environment_root)?;
    let preload_path = environment_root.join(PRELOAD_FILE);
    fs::write(&preload_path, "private def gem(name, *requirements); end\n")?;
    Ok(preload_path)
}

/// Run a command with the lode-managed gem environment
pub(crate) fn run(command: &[String], lockfile_path: &str) -> Result<()> {
    if command.is_empty() {
        anyhow::bail!("No command specified. Usage: lode exec -- <command> [args...]");
    }

    // Read and parse lockfile to get Ruby version
    let content = fs::read_to_string(lockfile_path)
        .with_context(|| format!("Failed to read lockfile: {lockfile_path}"))?;

    let lockfile = Lockfile::parse(&content)
        .with_context(|| format!("Failed to parse lockfile: {lockfile_path}"))?;

    // Get vendor directory
    let cfg = Config::load().unwrap_or_default();
    let vendor_dir = config::vendor_dir(Some(&cfg))?;

    // Determine Ruby version from lockfile or detect active Ruby
    let ruby_version = config::ruby_version(lockfile.ruby_version.as_deref());

    // Build gem paths
    let gems_root = vendor_dir.join("ruby").join(&ruby_version);
    let gems_dir = gems_root.join("gems");
    let bin_dir = gems_root.join("bin");

    // Prepare environment variables
    let first_cmd = command.first().context("Command cannot be empty")?;
    let mut cmd = Command::new(first_cmd);

    // Add command arguments
    if let Some(args) = command.get(1..) {
        cmd.args(args);
    }

    // Set GEM_HOME to our vendor directory
    cmd.env("GEM_HOME", &gems_root);

    // Set GEM_PATH to include our vendor directory
    let gem_path = env::var("GEM_PATH").map_or_else(
        |_| gems_root.display().to_string(),
        |existing_path| format!("{}:{existing_path}", gems_root.display()),
    );
    cmd.env("GEM_PATH", gem_path);

    // Set BUNDLE_GEMFILE to absolute path (supports both Gemfile and gems.rb)
    let gemfile_path = env::current_dir()?.join(lode::paths::find_gemfile());
    if gemfile_path.exists() {
        cmd.env("BUNDLE_GEMFILE", gemfile_path);
    }

    // Prepend bin directory to PATH
    if bin_dir.exists() {
        let path = env::var("PATH").map_or_else(
            |_| bin_dir.display().to_string(),
            |existing_path| format!("{}:{existing_path}", bin_dir.display()),
        );
        cmd.env("PATH", path);
    }

    // Build the library-search-path: shims, then each gem's require_paths,
    // then the interpreter's own standard library.
    let search_path = build_library_search_path(&gems_root, &gems_dir, &ruby_version);
    if !search_path.is_empty() {
        let joined = search_path
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":");
        let rubylib = env::var("RUBYLIB").map_or_else(
            |_| joined.clone(),
            |existing_lib| format!("{joined}:{existing_lib}"),
        );
        cmd.env("RUBYLIB", rubylib);
    }

    // Runtime-linker search path, pointing at the interpreter's own lib dir.
    if let Some(prefix) = ruby::detect_interpreter_prefix() {
        let lib_dir = prefix.join("lib");
        if lib_dir.is_dir() {
            let var_name = if cfg!(target_os = "macos") {
                "DYLD_LIBRARY_PATH"
            } else {
                "LD_LIBRARY_PATH"
            };
            let existing = env::var(var_name);
            let value = existing.map_or_else(
                |_| lib_dir.display().to_string(),
                |existing| format!("{}:{existing}", lib_dir.display()),
            );
            cmd.env(var_name, value);
        }
    }

    // Preload the gem() no-op shim so activation calls under the
    // library-search-path model don't fail.
    match write_preload_file(&gems_root) {
        Ok(preload_path) => {
            let rubyopt = env::var("RUBYOPT").map_or_else(
                |_| format!("-r{}", preload_path.display()),
                |existing| format!("-r{} {existing}", preload_path.display()),
            );
            cmd.env("RUBYOPT", rubyopt);
        }
        Err(err) => {
            eprintln!("lode: warning: failed to write preload file: {err}");
        }
    }

    // Replace this process outright, matching the ecosystem's own `exec`
    // semantics: no child to wait on, signals go straight to the target.
    let err = cmd.exec();
    Err(err).with_context(|| format!("Failed to execute command: {first_cmd}"))
}
