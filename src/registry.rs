//! Compact-index registry provider (L1)
//!
//! Fetches the per-package line-oriented index format and exposes
//! `versions_of`/`dependencies_of` to the solver, with in-memory caching for
//! the duration of one resolution run and coalescing of concurrent fetches
//! for the same package name.

use crate::version::{ConstraintSet, Version};
use anyhow::Context as _;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry transport error fetching {name}: {source}")]
    Transport {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("registry parse error for {name} at line {line}: {reason}")]
    Parse {
        name: String,
        line: usize,
        reason: String,
    },
}

/// One version entry from a package's compact index.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub version: Version,
    pub platform: Option<String>,
    pub dependencies: Vec<(String, ConstraintSet)>,
    pub checksum: Option<String>,
    pub ruby_constraint: Option<ConstraintSet>,
    pub rubygems_constraint: Option<ConstraintSet>,
}

type Snapshot = Arc<Vec<RegistryEntry>>;

/// Lazily-populated, per-run cache of one package's parsed index.
pub struct RegistryProvider {
    base_url: String,
    client: reqwest::Client,
    cache: Mutex<HashMap<String, Arc<OnceCell<Snapshot>>>>,
}

impl std::fmt::Debug for RegistryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RegistryProvider {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let timeout_secs = crate::env_vars::bundle_timeout();
        let user_agent = crate::env_vars::bundle_user_agent()
            .unwrap_or_else(|| format!("lode/{}", env!("CARGO_PKG_VERSION")));

        let mut builder = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(user_agent);

        if let Some(proxy_url) = crate::env_vars::http_proxy() {
            let mut proxy = reqwest::Proxy::all(&proxy_url)
                .with_context(|| format!("Invalid proxy URL: {proxy_url}"))?;
            if let Some(no_proxy) = crate::env_vars::no_proxy() {
                proxy = proxy.no_proxy(reqwest::NoProxy::from_string(&no_proxy));
            }
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into(),
            client,
            cache: Mutex::new(HashMap::new()),
        })
    }

    async fn cell_for(&self, name: &str) -> Arc<OnceCell<Snapshot>> {
        let mut cache = self.cache.lock().await;
        cache
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    async fn snapshot(&self, name: &str) -> Result<Snapshot, RegistryError> {
        let cell = self.cell_for(name).await;
        cell.get_or_try_init(|| async { self.fetch_and_parse(name).await })
            .await
            .cloned()
    }

    async fn fetch_and_parse(&self, name: &str) -> Result<Snapshot, RegistryError> {
        let url = format!("{}/info/{}", self.base_url, name);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| RegistryError::Transport {
                name: name.to_string(),
                source,
            })?;

        if response.status().as_u16() == 404 {
            return Ok(Arc::new(Vec::new()));
        }

        let response = response
            .error_for_status()
            .map_err(|source| RegistryError::Transport {
                name: name.to_string(),
                source,
            })?;

        let body = response
            .text()
            .await
            .map_err(|source| RegistryError::Transport {
                name: name.to_string(),
                source,
            })?;

        let mut entries = parse_index(&body, name)?;
        entries.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(Arc::new(entries))
    }

    /// `versions_of(name) → [Version…]` (descending), after platform and
    /// interpreter-version filtering.
    ///
    /// # Errors
    ///
    /// Returns a transport or parse error; an unknown package is treated as
    /// an empty list rather than an error.
    pub async fn versions_of(
        &self,
        name: &str,
        current_platform: Option<&str>,
        interpreter_version: Option<&Version>,
    ) -> Result<Vec<Version>, RegistryError> {
        let snapshot = self.snapshot(name).await?;
        Ok(snapshot
            .iter()
            .filter(|e| platform_acceptable(e.platform.as_deref(), current_platform))
            .filter(|e| {
                e.ruby_constraint.as_ref().is_none_or(|cs| {
                    interpreter_version.is_none_or(|v| cs.satisfies(v))
                })
            })
            .map(|e| e.version.clone())
            .collect())
    }

    /// `dependencies_of(name, version) → [Dependency…]`
    ///
    /// # Errors
    ///
    /// Returns a transport or parse error.
    pub async fn dependencies_of(
        &self,
        name: &str,
        version: &Version,
    ) -> Result<Vec<(String, ConstraintSet)>, RegistryError> {
        let snapshot = self.snapshot(name).await?;
        Ok(snapshot
            .iter()
            .find(|e| &e.version == version)
            .map(|e| e.dependencies.clone())
            .unwrap_or_default())
    }

    /// Checksum recorded for a specific resolved version, used by the
    /// acquisition orchestrator's hash-verify step.
    ///
    /// # Errors
    ///
    /// Returns a transport or parse error.
    pub async fn checksum_of(
        &self,
        name: &str,
        version: &Version,
    ) -> Result<Option<String>, RegistryError> {
        let snapshot = self.snapshot(name).await?;
        Ok(snapshot
            .iter()
            .find(|e| &e.version == version)
            .and_then(|e| e.checksum.clone()))
    }

    /// The most specific platform tag available for `name`/`version` that
    /// still matches `current_platform`, or `None` for the platform-neutral
    /// ("ruby") variant. A solver resolves a bare `(name, version)` pair;
    /// this disambiguates which physical archive variant to install.
    ///
    /// # Errors
    ///
    /// Returns a transport or parse error.
    pub async fn platform_for(
        &self,
        name: &str,
        version: &Version,
        current_platform: Option<&str>,
    ) -> Result<Option<String>, RegistryError> {
        let snapshot = self.snapshot(name).await?;
        let mut candidates: Vec<Option<String>> = snapshot
            .iter()
            .filter(|e| &e.version == version)
            .filter(|e| platform_acceptable(e.platform.as_deref(), current_platform))
            .map(|e| e.platform.clone())
            .collect();
        candidates.sort_by_key(Option::is_none);
        Ok(candidates.into_iter().next().flatten())
    }
}

fn platform_acceptable(entry_platform: Option<&str>, current: Option<&str>) -> bool {
    match entry_platform {
        None => true,
        Some(p) => current.is_some_and(|c| crate::platform::platform_matches(&Some(p.to_string()), c)),
    }
}

/// Parse a full compact-index response body for one package.
///
/// # Errors
///
/// Returns `RegistryError::Parse` with the offending line number.
pub fn parse_index(body: &str, name: &str) -> Result<Vec<RegistryEntry>, RegistryError> {
    let mut past_separator = false;
    let mut entries = Vec::new();

    for (idx, line) in body.lines().enumerate() {
        let line_no = idx + 1;

        if !past_separator {
            if line.trim() == "---" {
                past_separator = true;
            }
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        entries.push(parse_line(line, name, line_no)?);
    }

    Ok(entries)
}

fn parse_line(line: &str, name: &str, line_no: usize) -> Result<RegistryEntry, RegistryError> {
    let err = |reason: String| RegistryError::Parse {
        name: name.to_string(),
        line: line_no,
        reason,
    };

    let (version_field, rest) = line
        .split_once(' ')
        .ok_or_else(|| err("missing space after version field".to_string()))?;

    let (version_str, platform) = split_platform(version_field);
    let version: Version = version_str
        .parse()
        .map_err(|e| err(format!("bad version: {e}")))?;

    let (deps_str, metadata_str) = rest
        .split_once('|')
        .ok_or_else(|| err("missing '|' separating deps from metadata".to_string()))?;

    let dependencies = if deps_str.trim().is_empty() {
        Vec::new()
    } else {
        deps_str
            .split(',')
            .map(|dep| {
                let (dep_name, constraints) = dep
                    .split_once(':')
                    .ok_or_else(|| err(format!("dependency missing ':' in {dep:?}")))?;
                let set: ConstraintSet = constraints
                    .split('&')
                    .collect::<Vec<_>>()
                    .join(",")
                    .parse()
                    .map_err(|e| err(format!("bad constraint set {constraints:?}: {e}")))?;
                Ok((dep_name.to_string(), set))
            })
            .collect::<Result<Vec<_>, RegistryError>>()?
    };

    let mut checksum = None;
    let mut ruby_constraint = None;
    let mut rubygems_constraint = None;

    for field in metadata_str.split(',') {
        if field.is_empty() {
            continue;
        }
        let Some((key, value)) = field.split_once(':') else {
            continue; // unknown/malformed metadata key: tolerated and ignored
        };
        match key {
            "checksum" => checksum = Some(value.to_string()),
            "ruby" => {
                ruby_constraint = value
                    .split('&')
                    .collect::<Vec<_>>()
                    .join(",")
                    .parse()
                    .ok();
            }
            "rubygems" => {
                rubygems_constraint = value
                    .split('&')
                    .collect::<Vec<_>>()
                    .join(",")
                    .parse()
                    .ok();
            }
            _ => {} // unknown metadata keys are tolerated and ignored
        }
    }

    Ok(RegistryEntry {
        version,
        platform,
        dependencies,
        checksum,
        ruby_constraint,
        rubygems_constraint,
    })
}

/// Platform tag is present iff a `-` is followed by a lowercase alphabetic
/// character; a `-` followed by a digit is part of a prerelease segment.
fn split_platform(field: &str) -> (&str, Option<String>) {
    let bytes = field.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'-'
            && bytes
                .get(i + 1)
                .is_some_and(|c| c.is_ascii_lowercase())
        {
            return (&field[..i], Some(field[i + 1..].to_string()));
        }
    }
    (field, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_deps_single_space_before_pipe() {
        let entries = parse_index("---\n0.0.0 |checksum:abc\n", "pkg").unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].dependencies.is_empty());
    }

    #[test]
    fn intra_dependency_ampersand_multiple_constraints() {
        let entries =
            parse_index("---\n1.0.0 rack:>= 1.0&< 3.0|checksum:abc\n", "pkg").unwrap();
        let (dep_name, set) = &entries[0].dependencies[0];
        assert_eq!(dep_name, "rack");
        assert_eq!(set.constraints().len(), 2);
    }

    #[test]
    fn unknown_metadata_keys_ignored() {
        let entries = parse_index("---\n1.0.0 |weird:value,checksum:abc\n", "pkg").unwrap();
        assert_eq!(entries[0].checksum.as_deref(), Some("abc"));
    }

    #[test]
    fn platform_tag_requires_lowercase_letter() {
        let (v, p) = split_platform("1.0.0-x86_64-linux");
        assert_eq!(v, "1.0.0");
        assert_eq!(p.as_deref(), Some("x86_64-linux"));

        let (v, p) = split_platform("1.0.0-1");
        assert_eq!(v, "1.0.0-1");
        assert_eq!(p, None);
    }

    #[test]
    fn lines_before_separator_discarded() {
        let entries = parse_index("garbage preamble\n---\n1.0.0 |checksum:abc\n", "pkg").unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn multiple_dependencies_comma_separated() {
        let entries = parse_index(
            "---\n1.0.0 rack:>= 1.0,rake:~> 13.0|checksum:abc\n",
            "pkg",
        )
        .unwrap();
        assert_eq!(entries[0].dependencies.len(), 2);
    }
}
