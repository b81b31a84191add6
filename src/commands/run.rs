//! Run command (Ephemeral Runner, L8)
//!
//! `lode run <gem>[@version]` is the `npx`-style entry point: run a gem's
//! executable without adding it to any Gemfile, auto-installing it into a
//! per-interpreter ephemeral cache on first use.
//!
//! Interpreter resolution only ever picks among Ruby interpreters already
//! installed on the system (version managers' install directories, or
//! whatever `ruby` resolves to on `PATH`); it never compiles or fetches one,
//! matching how the rest of the library leaves interpreter provisioning to
//! the user's existing toolchain.

use anyhow::{Context, Result};
use lode::gem_store::GemStore;
use lode::version::ConstraintSet;
use lode::{Config, DownloadManager, GemSpec, RegistryProvider, Resolver, Version, config};
use std::env;
use std::fs;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Split `<gem>[@<version>]` into its name and optional pinned version.
fn parse_gem_arg(spec: &str) -> (&str, Option<&str>) {
    spec.split_once('@')
        .map_or((spec, None), |(name, version)| (name, Some(version)))
}

/// One Ruby interpreter found on the system: its version string and the
/// path to its `ruby` binary.
struct Interpreter {
    version: String,
    ruby_bin: PathBuf,
}

/// Scan version-manager install directories and `PATH` for installed Ruby
/// interpreters, returning the highest one whose version starts with
/// `prefix` (or the highest one overall when `prefix` is `None`).
///
/// # Errors
///
/// Returns an error if no installed interpreter matches.
fn resolve_interpreter(prefix: Option<&str>) -> Result<Interpreter> {
    let mut candidates: Vec<Interpreter> = Vec::new();

    if let Some(home) = dirs::home_dir() {
        for versions_dir in [
            home.join(".rbenv").join("versions"),
            home.join(".rubies"),
            home.join(".asdf").join("installs").join("ruby"),
        ] {
            let Ok(entries) = fs::read_dir(&versions_dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let ruby_bin = entry.path().join("bin").join("ruby");
                if !ruby_bin.is_file() {
                    continue;
                }
                if let Ok(version) = entry.file_name().into_string() {
                    candidates.push(Interpreter { version, ruby_bin });
                }
            }
        }
    }

    for rubies_dir in ["/opt/rubies", "/usr/local/rvm/rubies"] {
        let Ok(entries) = fs::read_dir(rubies_dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let ruby_bin = entry.path().join("bin").join("ruby");
            if !ruby_bin.is_file() {
                continue;
            }
            let name = entry.file_name().into_string().unwrap_or_default();
            let version = name.strip_prefix("ruby-").unwrap_or(&name).to_string();
            candidates.push(Interpreter { version, ruby_bin });
        }
    }

    if let Some(ruby_bin) = find_on_path("ruby")
        && let Some(version) = ruby_version_of(&ruby_bin)
    {
        candidates.push(Interpreter { version, ruby_bin });
    }

    candidates.retain(|i| prefix.is_none_or(|p| i.version.starts_with(p)));
    candidates.sort_by(|a, b| {
        let a_ver: Option<Version> = a.version.parse().ok();
        let b_ver: Option<Version> = b.version.parse().ok();
        a_ver.cmp(&b_ver)
    });

    candidates.pop().ok_or_else(|| {
        prefix.map_or_else(
            || anyhow::anyhow!("No installed Ruby interpreter found"),
            |p| anyhow::anyhow!("No installed Ruby interpreter matching '{p}' found"),
        )
    })
}

/// Find an executable named `name` on `PATH`.
fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path).find_map(|dir| {
        let candidate = dir.join(name);
        candidate.is_file().then_some(candidate)
    })
}

/// Run `ruby --version` through the given binary and extract its version.
fn ruby_version_of(ruby_bin: &Path) -> Option<String> {
    let output = Command::new(ruby_bin).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    Some(lode::ruby::parse_ruby_version_string(&text))
}

/// Read the `.executables` marker in `gem_dir` and pick the one matching
/// `gem_name`, falling back to the first listed, returning its full path
/// under `exe/` or `bin/`.
fn find_executable(gem_dir: &Path, gem_name: &str) -> Option<PathBuf> {
    let content = fs::read_to_string(gem_dir.join(".executables")).ok()?;
    let mut names: Vec<&str> = content.lines().filter(|l| !l.is_empty()).collect();
    if names.is_empty() {
        return None;
    }
    let chosen = names
        .iter()
        .position(|n| *n == gem_name)
        .map_or(names.remove(0), |i| names.remove(i));

    for bin_dir_name in ["exe", "bin"] {
        let candidate = gem_dir.join(bin_dir_name).join(chosen);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Find the highest version of `gem_name` already extracted under
/// `cache_root`, or the exact `<gem>-<version>` directory when `version` is
/// given.
fn resolve_cached_gem_dir(
    cache_root: &Path,
    gem_name: &str,
    version: Option<&str>,
) -> Option<PathBuf> {
    if let Some(version) = version {
        let dir = cache_root.join(format!("{gem_name}-{version}"));
        return dir.is_dir().then_some(dir);
    }

    let prefix = format!("{gem_name}-");
    let mut best: Option<(Version, PathBuf)> = None;
    for entry in fs::read_dir(cache_root).ok()?.flatten() {
        let Ok(dir_name) = entry.file_name().into_string() else {
            continue;
        };
        let Some(version_str) = dir_name.strip_prefix(&prefix) else {
            continue;
        };
        let Ok(version) = version_str.parse::<Version>() else {
            continue;
        };
        if best.as_ref().is_none_or(|(best_version, _)| version > *best_version) {
            best = Some((version, entry.path()));
        }
    }
    best.map(|(_, path)| path)
}

/// Build `RUBYLIB` from every resolved gem's `lib/` directory and exec the
/// target executable in place, replacing this process.
fn exec_gem(
    executable: &Path,
    ruby_bin: &Path,
    lib_dirs: &[PathBuf],
    gemfile: Option<&Path>,
    args: &[String],
) -> Result<()> {
    let mut cmd = Command::new(ruby_bin);
    cmd.arg(executable);
    cmd.args(args);

    let rubylib = lib_dirs
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(":");
    if !rubylib.is_empty() {
        let rubylib = env::var("RUBYLIB").map_or_else(
            |_| rubylib.clone(),
            |existing| format!("{rubylib}:{existing}"),
        );
        cmd.env("RUBYLIB", rubylib);
    }

    if let Some(gemfile) = gemfile {
        cmd.env("BUNDLE_GEMFILE", gemfile);
    }

    let err = cmd.exec();
    Err(err).with_context(|| format!("Failed to execute {}", executable.display()))
}

/// Resolve, download, and extract `gem_name` (and its dependencies) into
/// `cache_root`, returning the target gem's directory and the `lib/`
/// directories of everything installed.
async fn install_ephemeral(
    cache_root: &Path,
    gem_name: &str,
    version: Option<&str>,
) -> Result<(PathBuf, Vec<PathBuf>)> {
    fs::create_dir_all(cache_root).context("Failed to create ephemeral cache directory")?;

    let constraint: ConstraintSet = version
        .map_or_else(|| Ok(ConstraintSet::any()), |v| format!("= {v}").parse())
        .map_err(|e| anyhow::anyhow!("Invalid version '{}': {e:?}", version.unwrap_or_default()))?;

    let gem_source = lode::gem_source_url();
    let registry =
        RegistryProvider::new(&gem_source).context("Failed to create registry provider")?;
    let resolver = Resolver::new(registry);

    let resolved = resolver
        .resolve(&[(gem_name.to_string(), constraint)], lode::detect_current_platform().as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("Could not resolve '{gem_name}': {e}"))?;

    anyhow::ensure!(!resolved.is_empty(), "'{gem_name}' did not resolve to any version");

    let download_cache = config::cache_dir(None).context("Failed to determine cache directory")?;
    let downloader =
        DownloadManager::new(download_cache).context("Failed to set up gem download manager")?;

    let mut lib_dirs = Vec::new();
    let mut target_dir = None;

    for gem in &resolved {
        let gem_dir = cache_root.join(format!("{}-{}", gem.name, gem.version));

        if !gem_dir.join(".installed").exists() {
            let spec = GemSpec::new(
                gem.name.clone(),
                gem.version.to_string(),
                gem.platform.clone(),
                vec![],
                vec![],
            );

            let cache_path = downloader
                .download_gem(&spec)
                .await
                .with_context(|| format!("Failed to download {}", spec.full_name()))?;

            if let Some(expected) = &gem.checksum {
                let actual = DownloadManager::compute_checksum(&cache_path)
                    .with_context(|| format!("Failed to hash {}", spec.full_name()))?;
                if !actual.eq_ignore_ascii_case(expected) {
                    let _ = fs::remove_file(&cache_path);
                    anyhow::bail!(
                        "Checksum mismatch for {}: expected {expected}, got {actual}",
                        spec.full_name()
                    );
                }
            }

            fs::create_dir_all(&gem_dir)?;
            let spec_path = gem_dir.join(format!("{}.gemspec", spec.full_name()));
            lode::install::extract_gem(&cache_path, &gem_dir, &gem.name, &spec_path)
                .with_context(|| format!("Failed to extract {}", spec.full_name()))?;
            lode::install::write_gem_markers(&gem_dir)
                .with_context(|| format!("Failed to write markers for {}", spec.full_name()))?;
            fs::write(gem_dir.join(".installed"), "")?;
        }

        if gem_dir.join("lib").is_dir() {
            lib_dirs.push(gem_dir.join("lib"));
        }
        if gem.name == gem_name {
            target_dir = Some(gem_dir);
        }
    }

    let target_dir = target_dir
        .ok_or_else(|| anyhow::anyhow!("resolved set did not include the requested gem"))?;

    Ok((target_dir, lib_dirs))
}

/// Run the `lode run` subcommand.
///
/// # Errors
///
/// Returns an error if no interpreter is installed, the gem cannot be
/// resolved or installed, or it carries no usable executable.
pub(crate) async fn run(spec: &str, interpreter: Option<&str>, args: &[String]) -> Result<()> {
    let (gem_name, version) = parse_gem_arg(spec);

    let ruby = resolve_interpreter(interpreter)?;
    let api_version = lode::ruby::to_major_minor(&ruby.version);

    let gemfile = lode::find_gemfile();
    let gemfile = gemfile.exists().then_some(gemfile);

    // Fast path: a user-installed copy of the gem is already on the system,
    // and the caller didn't ask for a specific interpreter.
    if interpreter.is_none()
        && let Ok(store) = GemStore::new()
    {
        let installed = if let Some(version) = version {
            store
                .find_gem_by_name(gem_name)
                .ok()
                .and_then(|gems| gems.into_iter().find(|g| g.version == version))
        } else {
            store.find_gem_latest(gem_name).ok().flatten()
        };

        if let Some(installed) = installed
            && let Some(exe) = find_executable(&installed.path, gem_name)
        {
            return exec_gem(&exe, &ruby.ruby_bin, &[], gemfile.as_deref(), args);
        }
    }

    let cfg = Config::load().unwrap_or_default();
    let cache_root = config::cache_dir(Some(&cfg))?
        .join("run")
        .join(&api_version);

    if let Some(gem_dir) = resolve_cached_gem_dir(&cache_root, gem_name, version)
        && gem_dir.join(".installed").exists()
        && let Some(exe) = find_executable(&gem_dir, gem_name)
    {
        let lib_dirs = sibling_lib_dirs(&cache_root);
        return exec_gem(&exe, &ruby.ruby_bin, &lib_dirs, gemfile.as_deref(), args);
    }

    let (gem_dir, lib_dirs) = install_ephemeral(&cache_root, gem_name, version).await?;
    let exe = find_executable(&gem_dir, gem_name)
        .ok_or_else(|| anyhow::anyhow!("'{gem_name}' does not provide an executable"))?;
    exec_gem(&exe, &ruby.ruby_bin, &lib_dirs, gemfile.as_deref(), args)
}

/// `lib/` directories of every gem already extracted under `cache_root`,
/// used to rebuild `RUBYLIB` on the cache-hit path without re-resolving.
fn sibling_lib_dirs(cache_root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(cache_root) else {
        return Vec::new();
    };
    entries
        .flatten()
        .map(|entry| entry.path().join("lib"))
        .filter(|p| p.is_dir())
        .collect()
}
