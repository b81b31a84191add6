//! Lode command-line interface
//!
//! Bundler and `RubyGems` compatible package manager for Ruby

use clap::{Parser, Subcommand};
use std::process;

/// Note: backtrace display is controlled by the `--backtrace` flag
/// Actual backtrace capture requires `RUST_BACKTRACE` environment variable to be set
fn setup_backtrace(_enabled: bool) {
    // Backtrace display is handled in display_error() function
}

/// Display an error with optional backtrace information
fn display_error(err: &anyhow::Error, backtrace_enabled: bool) {
    eprintln!("error: {err}");

    // Show error chain
    let mut source = err.source();
    while let Some(err) = source {
        eprintln!("caused by: {err}");
        source = err.source();
    }

    // Show backtrace if enabled
    if backtrace_enabled {
        let backtrace = err.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            eprintln!("\nBacktrace:");
            eprintln!("{backtrace}");
        }
    }
}

#[derive(Parser)]
#[command(name = "lode")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A portable Ruby package manager", long_about = None)]
#[command(disable_version_flag = true)]
pub(crate) struct Cli {
    /// Print version
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    _version: Option<bool>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[allow(clippy::large_enum_variant)]
enum Commands {
    /// Install gems from Gemfile.lock
    Install {
        /// Path to Gemfile (lockfile will be derived as Gemfile.lock)
        #[arg(long)]
        gemfile: Option<String>,

        /// Re-download or reinstall even if artifacts exist (replaces deprecated --force)
        #[arg(long, visible_alias = "force")]
        redownload: bool,

        /// Enable verbose output including extension build logs
        #[arg(long)]
        verbose: bool,

        /// Suppress all output except errors
        #[arg(long, short, conflicts_with = "verbose")]
        quiet: bool,

        /// Number of concurrent downloads (Bundler: --jobs/-j)
        #[arg(long, short = 'j', alias = "workers")]
        jobs: Option<usize>,

        /// Do not fetch gems remotely, use only local cache
        #[arg(long)]
        local: bool,

        /// Prefer local cache over remote fetching
        #[arg(long, conflicts_with = "local")]
        prefer_local: bool,

        /// Number of times to retry failed downloads
        #[arg(long)]
        retry: Option<usize>,

        /// Do not update the cache in vendor/cache
        #[arg(long)]
        no_cache: bool,

        /// Generate standalone bundle that works without Bundler (optional: specify groups)
        #[arg(long)]
        standalone: Option<String>,

        /// Gem security trust policy: `HighSecurity`, `MediumSecurity`, `LowSecurity`, or `NoSecurity`
        #[arg(long)]
        trust_policy: Option<String>,

        /// Use alternative rbconfig for native extensions (for cross-compilation)
        #[arg(long)]
        target_rbconfig: Option<String>,
    },

    /// Regenerate Gemfile.lock from Gemfile
    Lock {
        /// Path to Gemfile
        #[arg(long, default_value = "Gemfile")]
        gemfile: String,

        /// Path to lockfile (defaults to Gemfile.lock or gems.locked)
        #[arg(long)]
        lockfile: Option<String>,

        /// Add a platform to the lockfile
        #[arg(long = "add-platform")]
        add_platform: Vec<String>,

        /// Remove a platform from the lockfile
        #[arg(long = "remove-platform")]
        remove_platform: Vec<String>,

        /// Unlock specified gems for update (allows version changes)
        /// When no gems specified, updates all gems; when gems specified, updates only those
        #[arg(long, num_args(0..))]
        update: Vec<String>,

        /// Print lockfile to stdout instead of writing to file
        #[arg(long)]
        print: bool,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Prefer updating only to next patch version
        #[arg(long, conflicts_with_all = ["minor", "major"])]
        patch: bool,

        /// Prefer updating only to next minor version
        #[arg(long, conflicts_with_all = ["patch", "major"])]
        minor: bool,

        /// Prefer updating to next major version (default)
        #[arg(long, conflicts_with_all = ["patch", "minor"])]
        major: bool,

        /// Do not allow any gem to be updated past latest patch/minor/major
        #[arg(long)]
        strict: bool,

        /// Use conservative update behavior (don't update shared dependencies)
        #[arg(long)]
        conservative: bool,

        /// Do not attempt to connect to rubygems.org (use cached gems only)
        #[arg(long)]
        local: bool,

        /// Allow prerelease versions when updating
        #[arg(long)]
        pre: bool,

        /// Update locked Bundler version (uses current lode version if no version specified)
        #[arg(long)]
        bundler: Option<String>,

        /// Normalize platform names in lockfile
        #[arg(long)]
        normalize_platforms: bool,

        /// Add checksums to lockfile for verification
        #[arg(long)]
        add_checksums: bool,

        /// Quiet output (suppress messages)
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Add gems to Gemfile
    Add {
        /// Name of the gem to add
        gem: String,

        /// Version constraint (e.g., "~> 3.0")
        #[arg(short, long)]
        version: Option<String>,

        /// Gem group (e.g., development, test)
        #[arg(short, long)]
        group: Option<String>,

        /// Whether to require the gem (default: true)
        #[arg(short = 'r', long)]
        require: Option<bool>,

        /// Custom gem source URL
        #[arg(short, long)]
        source: Option<String>,

        /// Git repository URL
        #[arg(long, conflicts_with_all = ["path", "source", "github"])]
        git: Option<String>,

        /// GitHub repository (shorthand for --git <https://github.com/USER/REPO>)
        #[arg(long, conflicts_with_all = ["path", "source", "git"])]
        github: Option<String>,

        /// Git branch
        #[arg(long)]
        branch: Option<String>,

        /// Git ref (tag or commit)
        #[arg(long)]
        ref_: Option<String>,

        /// Glob pattern for .gemspec location
        #[arg(long)]
        glob: Option<String>,

        /// Local path to gem
        #[arg(short = 'p', long, conflicts_with_all = ["git", "github", "source"])]
        path: Option<String>,

        /// Add strict version constraint (= version)
        #[arg(long, conflicts_with = "optimistic")]
        strict: bool,

        /// Add optimistic version constraint (>= version)
        #[arg(long, conflicts_with = "strict")]
        optimistic: bool,

        /// Suppress progress output
        #[arg(long)]
        quiet: bool,

        /// Skip running `bundle install` after adding (for Bundler compatibility)
        #[arg(long)]
        skip_install: bool,
    },

    /// Remove gems from Gemfile
    Remove {
        /// Name(s) of gem(s) to remove
        gems: Vec<String>,

        /// Quiet output (suppress messages)
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Run commands with lode-managed environment
    Exec {
        /// Command to execute
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,

        /// Path to Gemfile
        #[arg(long)]
        gemfile: Option<String>,
    },

    /// Run a gem's executable without adding it to any Gemfile, installing
    /// it to a throwaway cache on first use
    Run {
        /// Gem to run, optionally pinned to a version: `<gem>[@<version>]`
        spec: String,

        /// Use a specific installed Ruby interpreter (prefix-matched, e.g. "3.3")
        #[arg(long)]
        interpreter: Option<String>,

        /// Arguments passed through to the gem's executable
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Verify all gems are installed
    Check {
        /// Path to Gemfile
        #[arg(long)]
        gemfile: Option<String>,

        /// Show what would be checked without checking
        #[arg(long)]
        dry_run: bool,
    },

    /// List all gems in the current bundle
    List {
        /// Print only gem names (one per line)
        #[arg(long)]
        name_only: bool,

        /// Show installation paths for each gem
        #[arg(long)]
        paths: bool,

        /// Only list gems from a specific group
        #[arg(long, conflicts_with = "without_group")]
        only_group: Option<String>,

        /// Exclude gems from specific groups (comma-separated)
        #[arg(long, conflicts_with = "only_group")]
        without_group: Option<String>,
    },

    /// Show the source location of a gem
    Show {
        /// Name of the gem (optional when using --paths)
        gem: Option<String>,

        /// List all gem paths instead of showing a single gem
        #[arg(long)]
        paths: bool,
    },

    /// List gems with newer versions available
    Outdated {
        /// Path to Gemfile.lock
        #[arg(long, default_value = "Gemfile.lock")]
        lockfile: String,

        /// Output in machine-readable format
        #[arg(long)]
        parseable: bool,

        /// Only show gems with major version updates
        #[arg(long, conflicts_with_all = ["minor", "patch"])]
        major: bool,

        /// Only show gems with minor version updates
        #[arg(long, conflicts_with_all = ["major", "patch"])]
        minor: bool,

        /// Only show gems with patch version updates
        #[arg(long, conflicts_with_all = ["major", "minor"])]
        patch: bool,

        /// Include prerelease versions in available versions
        #[arg(long)]
        pre: bool,

        /// Only check gems from a specific group
        #[arg(long)]
        group: Option<String>,
    },

    /// Inspect or clear the content-addressed archive cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },

    /// Display platform compatibility information
    Platform {
        /// Display Ruby version from environment
        #[arg(long)]
        ruby: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Remove all cached gem archives
    Clean,
    /// List cached gem archives
    List,
    /// Print the cache directory path
    Path,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let debug = std::env::var("LODE_DEBUG").is_ok_and(|v| v != "0");
    let backtrace = std::env::var("RUST_BACKTRACE").is_ok_and(|v| v != "0");

    // Initialize debug mode
    lode::init_debug(debug);

    // Setup backtrace
    setup_backtrace(backtrace);

    let result = match cli.command {
        Commands::Add {
            gem,
            version,
            group,
            require,
            source,
            git,
            github,
            branch,
            ref_,
            glob,
            path,
            strict,
            optimistic,
            quiet,
            skip_install,
        } => {
            commands::add::run(
                &gem,
                version.as_deref(),
                group.as_deref(),
                require,
                source.as_deref(),
                git.as_deref(),
                github.as_deref(),
                branch.as_deref(),
                ref_.as_deref(),
                glob.as_deref(),
                path.as_deref(),
                strict,
                optimistic,
                quiet,
                !skip_install,
            )
            .await
        }
        Commands::Remove { gems, quiet } => commands::remove::run(&gems, quiet).await,
        Commands::Outdated {
            lockfile,
            parseable,
            major,
            minor,
            patch,
            pre,
            group,
        } => {
            commands::outdated::run(
                &lockfile,
                parseable,
                major,
                minor,
                patch,
                pre,
                group.as_deref(),
            )
            .await
        }
        Commands::Lock {
            gemfile,
            lockfile,
            add_platform,
            remove_platform,
            update,
            print,
            verbose,
            patch,
            minor,
            major,
            strict,
            conservative,
            local,
            pre,
            bundler,
            normalize_platforms,
            add_checksums,
            quiet,
        } => {
            let bundle_config = lode::BundleConfig::load().unwrap_or_default();

            // Merge settings with proper priority (CLI > Config > Env > Default)
            let verbose_merged = verbose
                || bundle_config.verbose.unwrap_or(false)
                || lode::env_vars::bundle_verbose();
            let local_merged =
                local || bundle_config.local.unwrap_or(false) || lode::env_vars::bundle_local();

            commands::lock::run(
                &gemfile,
                lockfile.as_deref(),
                &add_platform,
                &remove_platform,
                &update,
                print,
                verbose_merged,
                patch,
                minor,
                major,
                strict,
                conservative,
                local_merged,
                pre,
                bundler.as_deref(),
                normalize_platforms,
                add_checksums,
                quiet,
            )
            .await
        }
        Commands::Install {
            gemfile,
            redownload,
            verbose,
            quiet,
            jobs,
            local,
            prefer_local,
            retry,
            no_cache,
            standalone,
            trust_policy,
            target_rbconfig,
        } => {
            let lockfile_path = gemfile.as_ref().map_or_else(
                || "Gemfile.lock".to_string(),
                |gemfile_path| format!("{gemfile_path}.lock"),
            );

            // Load bundle config from .bundle/config files
            // Priority: CLI flags > Local config > Env vars > Global config > Defaults
            let bundle_config = lode::BundleConfig::load().unwrap_or_default();

            // Merge settings with proper priority (CLI > Config > Env > Default)
            let jobs_merged = jobs
                .or(bundle_config.jobs)
                .or_else(lode::env_vars::bundle_jobs);
            let retry_merged = retry
                .or_else(|| bundle_config.retry.map(|v| v as usize))
                .or_else(|| lode::env_vars::bundle_retry().map(|v| v as usize));
            let local_merged =
                local || bundle_config.local.unwrap_or(false) || lode::env_vars::bundle_local();
            let prefer_local_merged = prefer_local
                || bundle_config.prefer_local.unwrap_or(false)
                || lode::env_vars::bundle_prefer_local();
            let force_merged = redownload
                || bundle_config.force.unwrap_or(false)
                || lode::env_vars::bundle_force();
            let no_cache_merged = no_cache; // No env var for this (not commonly used)
            let verbose_merged = verbose
                || bundle_config.verbose.unwrap_or(false)
                || lode::env_vars::bundle_verbose();

            // Warn if running as root (unless silenced)
            let silence_root_warning = bundle_config.silence_root_warning.unwrap_or(false)
                || lode::env_vars::bundle_silence_root_warning();
            if lode::user::is_root() && !silence_root_warning && !quiet {
                eprintln!(
                    "Warning: Running as root user. Set BUNDLE_SILENCE_ROOT_WARNING=1 to silence this warning."
                );
            }

            // Handle deployment mode: deployment = frozen + exclude dev/test
            let deployment_mode = bundle_config.deployment.unwrap_or(false);
            let frozen_merged = deployment_mode
                || bundle_config.frozen.unwrap_or(false)
                || lode::env_vars::bundle_frozen();

            // Gather group filters from config (Config > Env > Default)
            let mut without_groups_merged = bundle_config
                .without
                .clone()
                .or_else(lode::env_vars::bundle_without)
                .unwrap_or_default();
            let with_groups_merged = bundle_config
                .with
                .clone()
                .or_else(lode::env_vars::bundle_with)
                .unwrap_or_default();

            // Deployment mode automatically excludes development and test groups
            if deployment_mode {
                if !without_groups_merged.contains(&"development".to_string()) {
                    without_groups_merged.push("development".to_string());
                }
                if !without_groups_merged.contains(&"test".to_string()) {
                    without_groups_merged.push("test".to_string());
                }
            }

            // Auto-clean after install if BUNDLE_CLEAN is enabled
            let auto_clean = bundle_config.clean.unwrap_or(false) || lode::env_vars::bundle_clean();

            commands::install::run(commands::install::InstallOptions {
                lockfile_path: &lockfile_path,
                redownload: force_merged,
                verbose: verbose_merged,
                quiet,
                workers: jobs_merged,
                local: local_merged,
                prefer_local: prefer_local_merged,
                retry: retry_merged,
                no_cache: no_cache_merged,
                standalone: standalone.as_deref(),
                trust_policy: trust_policy.as_deref(),
                target_rbconfig: target_rbconfig.as_deref(),
                frozen: frozen_merged,
                without_groups: without_groups_merged,
                with_groups: with_groups_merged,
                auto_clean,
            })
            .await
        }
        Commands::Check { gemfile, dry_run } => {
            let lockfile_path = gemfile.as_ref().map_or_else(
                || "Gemfile.lock".to_string(),
                |gemfile_path| format!("{gemfile_path}.lock"),
            );
            commands::check::run(&lockfile_path, dry_run)
        }
        Commands::List {
            name_only,
            paths,
            only_group,
            without_group,
        } => commands::list::run(
            "Gemfile.lock",
            name_only,
            paths,
            only_group.as_deref(),
            without_group.as_deref(),
        ),
        Commands::Show { gem, paths } => commands::show::run(gem.as_deref(), paths, "Gemfile.lock"),
        Commands::Exec { command, gemfile } => {
            let lockfile_path = gemfile.as_ref().map_or_else(
                || "Gemfile.lock".to_string(),
                |gemfile_path| format!("{gemfile_path}.lock"),
            );
            commands::exec::run(&command, &lockfile_path)
        }
        Commands::Run {
            spec,
            interpreter,
            args,
        } => commands::run::run(&spec, interpreter.as_deref(), &args).await,
        Commands::Cache { action } => {
            let action = match action {
                CacheCommand::Clean => commands::cache::CacheAction::Clean,
                CacheCommand::List => commands::cache::CacheAction::List,
                CacheCommand::Path => commands::cache::CacheAction::Path,
            };
            commands::cache::run(action)
        }
        Commands::Platform { ruby } => commands::platform::run(ruby),
        Commands::Completion { shell } => commands::completion::run(shell),
    };

    if let Err(e) = result {
        // Display error with formatting
        display_error(&e, backtrace);
        process::exit(1);
    }
}

mod commands;
