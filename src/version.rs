//! Gem version and constraint algebra
//!
//! Segment-based versions (`1.2.3`, `1.2.3.pre1`) with the RubyGems comparison
//! and pessimistic-operator (`~>`) rules.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("empty version string")]
    Empty,
    #[error("malformed version segment in {0:?}")]
    MalformedSegment(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstraintParseError {
    #[error("empty constraint string")]
    Empty,
    #[error("unknown constraint operator {0:?}")]
    UnknownOperator(String),
    #[error(transparent)]
    Version(#[from] VersionParseError),
}

/// A single numeric or alphanumeric segment of a version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Segment {
    Num(u64),
    Alpha(String),
}

impl Segment {
    fn parse_numeric(s: &str) -> Option<Self> {
        s.parse::<u64>().ok().map(Segment::Num)
    }
}

/// A segment-based, prerelease-aware Ruby gem version.
///
/// Canonical string form preserves the originally parsed text.
#[derive(Debug, Clone, Eq)]
pub struct Version {
    raw: String,
    numeric: Vec<u64>,
    prerelease: Vec<Segment>,
}

impl Version {
    /// The numeric segment prefix, e.g. `[1, 2, 3]` for `1.2.3.pre1`.
    #[must_use]
    pub fn numeric_segments(&self) -> &[u64] {
        &self.numeric
    }

    #[must_use]
    pub fn has_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Build the `~>` implicit upper bound: increment the next-to-last
    /// numeric segment and zero everything after it. For a single-segment
    /// version, this is "one past this segment" with an implicit zero tail.
    #[must_use]
    pub fn pessimistic_upper_bound(&self) -> Self {
        let mut numeric = self.numeric.clone();
        if numeric.len() < 2 {
            numeric.push(0);
        }
        let bump_index = numeric.len() - 2;
        numeric[bump_index] += 1;
        for slot in numeric.iter_mut().skip(bump_index + 1) {
            *slot = 0;
        }
        let raw = numeric
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Self {
            raw,
            numeric,
            prerelease: Vec::new(),
        }
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let parts: Vec<&str> = s.split('.').collect();

        let mut numeric = Vec::new();
        let mut prerelease = Vec::new();
        let mut in_prerelease = false;

        for part in &parts {
            if part.is_empty() {
                return Err(VersionParseError::MalformedSegment(s.to_string()));
            }

            if !in_prerelease {
                if let Some(Segment::Num(n)) = Segment::parse_numeric(part) {
                    numeric.push(n);
                    continue;
                }
                // First non-numeric component must start with a letter to be
                // a valid prerelease tag.
                if part.chars().next().is_some_and(char::is_alphabetic) {
                    in_prerelease = true;
                } else {
                    return Err(VersionParseError::MalformedSegment(s.to_string()));
                }
            }

            if let Some(seg) = Segment::parse_numeric(part) {
                prerelease.push(seg);
            } else {
                prerelease.push(Segment::Alpha((*part).to_string()));
            }
        }

        if numeric.is_empty() {
            return Err(VersionParseError::MalformedSegment(s.to_string()));
        }

        Ok(Self {
            raw: s.to_string(),
            numeric,
            prerelease,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.numeric.len().max(other.numeric.len());
        for i in 0..len {
            let a = self.numeric.get(i).copied().unwrap_or(0);
            let b = other.numeric.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }

        // Equal numeric prefixes: a version with no prerelease tag strictly
        // dominates the same prefix with one.
        match (self.prerelease.is_empty(), other.prerelease.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.prerelease.cmp(&other.prerelease),
        }
    }
}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.numeric.hash(state);
        self.prerelease.hash(state);
    }
}

/// Comparison operator of a single constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Pessimistic,
}

impl Operator {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            "~>" => Some(Self::Pessimistic),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Pessimistic => "~>",
        };
        f.write_str(s)
    }
}

/// A single `(operator, version)` constraint.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub operator: Operator,
    pub version: Version,
    /// Precomputed for `~>`: `version <= v < upper`.
    upper: Option<Version>,
}

impl Constraint {
    #[must_use]
    pub fn new(operator: Operator, version: Version) -> Self {
        let upper = matches!(operator, Operator::Pessimistic)
            .then(|| version.pessimistic_upper_bound());
        Self {
            operator,
            version,
            upper,
        }
    }

    #[must_use]
    pub fn satisfies(&self, candidate: &Version) -> bool {
        match self.operator {
            Operator::Eq => candidate == &self.version,
            Operator::Ne => candidate != &self.version,
            Operator::Gt => candidate > &self.version,
            Operator::Ge => candidate >= &self.version,
            Operator::Lt => candidate < &self.version,
            Operator::Le => candidate <= &self.version,
            Operator::Pessimistic => {
                let upper = self.upper.as_ref().expect("pessimistic upper is precomputed");
                candidate >= &self.version && candidate < upper
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.version)
    }
}

impl FromStr for Constraint {
    type Err = ConstraintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConstraintParseError::Empty);
        }

        for op_str in ["~>", ">=", "<=", "!=", ">", "<", "="] {
            if let Some(rest) = s.strip_prefix(op_str) {
                let operator =
                    Operator::parse(op_str).ok_or_else(|| {
                        ConstraintParseError::UnknownOperator(op_str.to_string())
                    })?;
                let version: Version = rest.trim().parse()?;
                return Ok(Self::new(operator, version));
            }
        }

        // Bare version: exact match.
        let version: Version = s.parse()?;
        Ok(Self::new(Operator::Eq, version))
    }
}

/// Conjunction of constraints; empty set means "any version".
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    #[must_use]
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self { constraints }
    }

    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    #[must_use]
    pub fn satisfies(&self, candidate: &Version) -> bool {
        self.constraints.iter().all(|c| c.satisfies(candidate))
    }

    /// True iff some member constraint's version carries a prerelease tag —
    /// the constraint set "explicitly admits" prereleases.
    #[must_use]
    pub fn admits_prerelease(&self) -> bool {
        self.constraints.iter().any(|c| c.version.has_prerelease())
    }
}

impl fmt::Display for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.constraints.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join(", "))
    }
}

impl FromStr for ConstraintSet {
    type Err = ConstraintParseError;

    /// Parses a comma-separated list of constraints, e.g. `">= 1.0, < 2.0"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::any());
        }
        let constraints = s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(constraints))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totality() {
        let pairs = [("1.0.0", "2.0.0"), ("1.0", "1.0.0"), ("1.0.0.pre", "1.0.0")];
        for (a, b) in pairs {
            let a: Version = a.parse().unwrap();
            let b: Version = b.parse().unwrap();
            let lt = a < b;
            let gt = a > b;
            let eq = a == b;
            assert_eq!([lt, gt, eq].iter().filter(|x| **x).count(), 1);
        }
    }

    #[test]
    fn transitivity() {
        let a: Version = "1.0.0".parse().unwrap();
        let b: Version = "1.5.0".parse().unwrap();
        let c: Version = "2.0.0".parse().unwrap();
        assert!(a < b && b < c && a < c);
    }

    #[test]
    fn prerelease_dominance() {
        let v: Version = "1.0.0".parse().unwrap();
        let pre: Version = "1.0.0.pre".parse().unwrap();
        let pre2: Version = "1.0.0.pre2".parse().unwrap();
        assert!(v > pre);
        assert!(v > pre2);
    }

    #[test]
    fn padding_equality() {
        let a: Version = "1.0".parse().unwrap();
        let b: Version = "1.0.0".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn pessimistic_two_segments() {
        let c: Constraint = "~> 4.1".parse().unwrap();
        assert!(c.satisfies(&"4.1.1".parse().unwrap()));
        assert!(c.satisfies(&"4.9.0".parse().unwrap()));
        assert!(!c.satisfies(&"5.0.0".parse().unwrap()));
    }

    #[test]
    fn pessimistic_three_segments() {
        let c: Constraint = "~> 4.1.0".parse().unwrap();
        assert!(c.satisfies(&"4.1.9".parse().unwrap()));
        assert!(!c.satisfies(&"4.2.0".parse().unwrap()));
    }

    #[test]
    fn exact_excludes_prerelease() {
        let c: Constraint = "= 1.0.0".parse().unwrap();
        assert!(!c.satisfies(&"1.0.0.pre".parse().unwrap()));
        assert!(c.satisfies(&"1.0.0".parse().unwrap()));
    }

    #[test]
    fn constraint_set_any() {
        let set = ConstraintSet::any();
        assert!(set.satisfies(&"0.0.1".parse().unwrap()));
    }

    #[test]
    fn constraint_set_conjunction() {
        let set: ConstraintSet = ">= 1.0, < 2.0".parse().unwrap();
        assert!(set.satisfies(&"1.5.0".parse().unwrap()));
        assert!(!set.satisfies(&"2.0.0".parse().unwrap()));
    }

    #[test]
    fn admits_prerelease_only_when_explicit() {
        let set: ConstraintSet = "~> 4.1".parse().unwrap();
        assert!(!set.admits_prerelease());
        let set: ConstraintSet = ">= 4.1.1.pre".parse().unwrap();
        assert!(set.admits_prerelease());
    }

    #[test]
    fn rejects_malformed() {
        assert!("".parse::<Version>().is_err());
        assert!("abc".parse::<Version>().is_err());
    }
}
