//! PubGrub-based dependency resolution (L2).
//!
//! Uses the `pubgrub` crate for resolution mechanics (propagation, conflict
//! resolution, backtracking) with a custom [`Version`] in place of the
//! crate's bundled `SemanticVersion`, so the *semantics* (segments,
//! prerelease dominance, the pessimistic operator) are the gem versioning
//! scheme rather than strict semver. This mirrors how other PubGrub-based
//! Ruby resolvers bridge the crate to gem versions.

use crate::registry::RegistryProvider;
use crate::version::{ConstraintSet, Version};
use pubgrub::{
    DefaultStringReporter, Dependencies, DependencyConstraints, DependencyProvider,
    PackageResolutionStatistics, Ranges, Reporter,
};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("{explanation}")]
    ResolutionFailed { explanation: String },

    #[error("registry error resolving '{gem}': {source}")]
    Registry {
        gem: String,
        #[source]
        source: crate::registry::RegistryError,
    },
}

/// One resolved `(name, version)` pair with its dependency list as it stood
/// at resolution time, for re-emission by the Lockfile Writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGem {
    pub name: String,
    pub version: Version,
    /// Platform tag of the archive variant to install, or `None` for the
    /// platform-neutral ("ruby") variant. Resolved separately from the
    /// version itself, since the solver reasons about `(name, version)`
    /// pairs without regard to platform.
    pub platform: Option<String>,
    /// SHA-256 content hash recorded for this version in the registry, used
    /// by the acquisition orchestrator's hash-verify step.
    pub checksum: Option<String>,
    pub dependencies: Vec<ResolvedDependency>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub name: String,
    /// The constraint string as it appeared in the registry, re-emitted
    /// verbatim into the lockfile.
    pub requirement: String,
}

const ROOT_PACKAGE: &str = "___root___";

/// Drives one resolution run against a [`RegistryProvider`].
pub struct Resolver {
    registry: RegistryProvider,
}

impl Resolver {
    #[must_use]
    pub fn new(registry: RegistryProvider) -> Self {
        Self { registry }
    }

    /// Resolve a set of root `(name, ConstraintSet)` dependencies to a
    /// single consistent [`ResolvedGem`] set, or a human-readable failure
    /// explanation.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::ResolutionFailed`] with the rendered
    /// PubGrub explanation on an unsatisfiable input, or
    /// [`ResolverError::Registry`] on a transport/parse failure.
    pub async fn resolve(
        &self,
        root_deps: &[(String, ConstraintSet)],
        current_platform: Option<&str>,
    ) -> Result<Vec<ResolvedGem>, ResolverError> {
        self.resolve_with_prerelease(root_deps, current_platform, false)
            .await
    }

    /// As [`Resolver::resolve`], but `allow_prerelease` additionally permits
    /// a prerelease version for every root dependency regardless of whether
    /// its own constraint set names one explicitly (the CLI's blanket
    /// `--pre` flag).
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub async fn resolve_with_prerelease(
        &self,
        root_deps: &[(String, ConstraintSet)],
        current_platform: Option<&str>,
        allow_prerelease: bool,
    ) -> Result<Vec<ResolvedGem>, ResolverError> {
        let provider = GemDependencyProvider {
            registry: &self.registry,
            current_platform: current_platform.map(ToString::to_string),
            root_deps: root_deps.to_vec(),
            prerelease_allowed: Mutex::new(
                root_deps
                    .iter()
                    .filter(|(_, cs)| allow_prerelease || cs.admits_prerelease())
                    .map(|(name, _)| (name.clone(), true))
                    .collect(),
            ),
            requirement_strings: Mutex::new(HashMap::new()),
            global_prerelease: allow_prerelease,
        };

        let resolved = pubgrub::resolve(&provider, ROOT_PACKAGE.to_string(), Version::root())
            .map_err(|err| {
                let explanation = match err {
                    pubgrub::PubGrubError::NoSolution(tree) => {
                        let mut report = DefaultStringReporter::report(&tree);
                        if !report.trim_end().ends_with("version solving failed.") {
                            report.push_str("\nversion solving failed.");
                        }
                        report
                    }
                    pubgrub::PubGrubError::ErrorRetrievingDependencies {
                        package,
                        version,
                        source,
                    } => format!(
                        "error retrieving dependencies for {package} {version}: {source:?}"
                    ),
                };
                ResolverError::ResolutionFailed { explanation }
            })?;

        let requirement_strings = provider
            .requirement_strings
            .into_inner()
            .unwrap_or_default();

        let mut result = Vec::new();
        for (name, version) in &resolved {
            if name == ROOT_PACKAGE {
                continue;
            }

            let deps = requirement_strings
                .get(&(name.clone(), version.clone()))
                .cloned()
                .unwrap_or_default();

            let platform = self
                .registry
                .platform_for(name, version, current_platform)
                .await
                .unwrap_or(None);

            let checksum = self
                .registry
                .checksum_of(name, version)
                .await
                .unwrap_or(None);

            result.push(ResolvedGem {
                name: name.clone(),
                version: version.clone(),
                platform,
                checksum,
                dependencies: deps
                    .into_iter()
                    .map(|(name, requirement)| ResolvedDependency { name, requirement })
                    .collect(),
            });
        }

        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }
}

impl Version {
    /// Synthetic version of the virtual root package.
    fn root() -> Self {
        "0".parse().expect("literal version parses")
    }
}

/// Converts a [`ConstraintSet`] to the `Ranges<Version>` the `pubgrub` crate
/// operates over.
fn constraint_set_to_ranges(set: &ConstraintSet) -> Ranges<Version> {
    let mut combined = Ranges::full();
    for constraint in set.constraints() {
        let range = constraint_to_range(constraint);
        combined = combined.intersection(&range);
    }
    combined
}

fn constraint_to_range(constraint: &crate::version::Constraint) -> Ranges<Version> {
    use crate::version::Operator;
    let v = constraint.version.clone();
    match constraint.operator {
        Operator::Eq => Ranges::singleton(v),
        Operator::Ne => {
            Ranges::union(&Ranges::strictly_lower_than(v.clone()), &Ranges::strictly_higher_than(v))
        }
        Operator::Gt => Ranges::strictly_higher_than(v),
        Operator::Ge => Ranges::higher_than(v),
        Operator::Lt => Ranges::strictly_lower_than(v),
        Operator::Le => Ranges::lower_than(v),
        Operator::Pessimistic => {
            let upper = v.pessimistic_upper_bound();
            Ranges::intersection(&Ranges::higher_than(v), &Ranges::strictly_lower_than(upper))
        }
    }
}

struct GemDependencyProvider<'a> {
    registry: &'a RegistryProvider,
    current_platform: Option<String>,
    root_deps: Vec<(String, ConstraintSet)>,
    /// Packages for which a prerelease version may be chosen, because some
    /// constraint set reaching them explicitly mentioned a prerelease.
    prerelease_allowed: Mutex<HashMap<String, bool>>,
    /// `(name, version) -> [(dep_name, source constraint string)]`, captured
    /// at dependency-resolution time for byte-exact lockfile re-emission.
    requirement_strings: Mutex<HashMap<(String, Version), Vec<(String, String)>>>,
    /// When set, every package (not just ones with an explicit prerelease
    /// constraint) may resolve to a prerelease version.
    global_prerelease: bool,
}

impl GemDependencyProvider<'_> {
    fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
    }

    fn allows_prerelease(&self, name: &str) -> bool {
        self.global_prerelease
            || self
                .prerelease_allowed
                .lock()
                .expect("prerelease_allowed lock")
                .get(name)
                .copied()
                .unwrap_or(false)
    }
}

impl DependencyProvider for GemDependencyProvider<'_> {
    type P = String;
    type V = Version;
    type VS = Ranges<Version>;
    type M = String;
    type Err = Infallible;
    type Priority = usize;

    fn prioritize(
        &self,
        _package: &Self::P,
        _range: &Self::VS,
        _conflicts: &PackageResolutionStatistics,
    ) -> Self::Priority {
        0
    }

    fn choose_version(
        &self,
        package: &Self::P,
        range: &Self::VS,
    ) -> Result<Option<Self::V>, Self::Err> {
        if package == ROOT_PACKAGE {
            return Ok(Some(Version::root()));
        }

        let allow_prerelease = self.allows_prerelease(package);

        let Ok(versions) = self.block_on(self.registry.versions_of(
            package,
            self.current_platform.as_deref(),
            None,
        )) else {
            return Ok(None);
        };

        // Versions are already descending; attempt highest-first.
        let chosen = versions
            .into_iter()
            .filter(|v| allow_prerelease || !v.has_prerelease())
            .find(|v| range.contains(v));

        Ok(chosen)
    }

    fn get_dependencies(
        &self,
        package: &Self::P,
        version: &Self::V,
    ) -> Result<Dependencies<Self::P, Self::VS, Self::M>, Self::Err> {
        if package == ROOT_PACKAGE {
            let mut deps = DependencyConstraints::default();
            for (name, set) in &self.root_deps {
                deps.insert(name.clone(), constraint_set_to_ranges(set));
            }
            return Ok(Dependencies::Available(deps));
        }

        let Ok(dependencies) = self.block_on(self.registry.dependencies_of(package, version))
        else {
            return Ok(Dependencies::Unavailable(
                "failed to fetch dependency list".to_string(),
            ));
        };

        let mut deps = DependencyConstraints::default();
        let mut strings = Vec::with_capacity(dependencies.len());
        for (name, set) in &dependencies {
            if set.admits_prerelease() {
                self.prerelease_allowed
                    .lock()
                    .expect("prerelease_allowed lock")
                    .insert(name.clone(), true);
            }
            deps.insert(name.clone(), constraint_set_to_ranges(set));
            strings.push((name.clone(), set.to_string()));
        }

        self.requirement_strings
            .lock()
            .expect("requirement_strings lock")
            .insert((package.clone(), version.clone()), strings);

        Ok(Dependencies::Available(deps))
    }
}
