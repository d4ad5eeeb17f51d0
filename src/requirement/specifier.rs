//! Version specifier sets: `==`, `!=`, `<=`, `>=`, `<`, `>`, `~=`, `===`.
//!
//! A specifier set is a comma-separated list of clauses that a candidate
//! version must satisfy simultaneously, e.g. `>=1.2, <2.0, !=1.5.*`.

use std::fmt;

use serde::Serialize;

use super::version::Version;

/// Comparison operator of a single specifier clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
    Compatible,
    ArbitraryEqual,
}

impl Operator {
    fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::Compatible => "~=",
            Operator::ArbitraryEqual => "===",
        }
    }
}

/// A single specifier clause, e.g. `>=1.2` or `==1.4.*`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Specifier {
    pub op: Operator,
    /// Version text as written (used verbatim by `===`).
    pub text: String,
    /// Parsed version; `None` only for `===`.
    #[serde(skip)]
    pub version: Option<Version>,
    /// True for `==X.*` / `!=X.*` prefix matching.
    pub wildcard: bool,
}

impl Specifier {
    /// Parse one clause: operator followed by a version.
    pub fn parse(input: &str) -> Result<Self, String> {
        let text = input.trim();
        let (op, rest) = if let Some(rest) = text.strip_prefix("===") {
            (Operator::ArbitraryEqual, rest)
        } else if let Some(rest) = text.strip_prefix("==") {
            (Operator::Equal, rest)
        } else if let Some(rest) = text.strip_prefix("!=") {
            (Operator::NotEqual, rest)
        } else if let Some(rest) = text.strip_prefix("<=") {
            (Operator::LessEqual, rest)
        } else if let Some(rest) = text.strip_prefix(">=") {
            (Operator::GreaterEqual, rest)
        } else if let Some(rest) = text.strip_prefix("~=") {
            (Operator::Compatible, rest)
        } else if let Some(rest) = text.strip_prefix('<') {
            (Operator::Less, rest)
        } else if let Some(rest) = text.strip_prefix('>') {
            (Operator::Greater, rest)
        } else {
            return Err(format!(
                "expected a version operator (==, !=, <=, >=, <, >, ~=, ===) in '{}'",
                text
            ));
        };

        let version_text = rest.trim();
        if version_text.is_empty() {
            return Err(format!("missing version after '{}'", op.symbol()));
        }

        if op == Operator::ArbitraryEqual {
            return Ok(Specifier {
                op,
                text: version_text.to_string(),
                version: None,
                wildcard: false,
            });
        }

        let (bare, wildcard) = match version_text.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (version_text, false),
        };

        if wildcard && !matches!(op, Operator::Equal | Operator::NotEqual) {
            return Err(format!(
                "wildcard versions are only allowed with == and != (got '{}{}')",
                op.symbol(),
                version_text
            ));
        }

        let version = Version::parse(bare).map_err(|e| format!("invalid version '{}': {}", bare, e))?;

        if wildcard && (version.is_prerelease() || version.post.is_some() || version.local.is_some())
        {
            return Err(format!(
                "wildcard version '{}' must be a plain release prefix",
                version_text
            ));
        }
        if op == Operator::Compatible && version.release.len() < 2 {
            return Err(format!(
                "~= requires at least two release segments (got '{}')",
                version_text
            ));
        }
        if version.local.is_some() && !matches!(op, Operator::Equal | Operator::NotEqual) {
            return Err(format!(
                "local version label not allowed with '{}'",
                op.symbol()
            ));
        }

        Ok(Specifier {
            op,
            text: version_text.to_string(),
            version: Some(version),
            wildcard,
        })
    }

    /// Does `candidate` satisfy this clause?
    pub fn matches(&self, candidate: &Version) -> bool {
        let spec = match &self.version {
            Some(v) => v,
            // `===` compares the exact text; normalize only case/whitespace
            None => return candidate.to_string() == self.text.trim().to_ascii_lowercase(),
        };

        match self.op {
            Operator::Equal => {
                if self.wildcard {
                    prefix_matches(spec, candidate)
                } else if spec.local.is_none() {
                    candidate.without_local() == *spec
                } else {
                    candidate == spec
                }
            }
            Operator::NotEqual => {
                !Specifier {
                    op: Operator::Equal,
                    ..self.clone()
                }
                .matches(candidate)
            }
            Operator::LessEqual => candidate.without_local() <= *spec,
            Operator::GreaterEqual => candidate.without_local() >= *spec,
            Operator::Less => candidate.without_local() < *spec,
            Operator::Greater => candidate.without_local() > *spec,
            Operator::Compatible => {
                // ~=X.Y(.Z)  ==>  >=X.Y(.Z), ==X.(Y.)*
                if candidate.without_local() < *spec {
                    return false;
                }
                let mut prefix = spec.clone();
                prefix.release.pop();
                prefix.pre = None;
                prefix.post = None;
                prefix.dev = None;
                prefix.local = None;
                prefix_matches(&prefix, candidate)
            }
            Operator::ArbitraryEqual => unreachable!("handled above"),
        }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.symbol(), self.text)
    }
}

/// Prefix match for wildcard specifiers: the candidate's release must
/// start with the spec's release segments and share its epoch.
fn prefix_matches(spec: &Version, candidate: &Version) -> bool {
    spec.epoch == candidate.epoch
        && candidate.padded_release(spec.release.len())[..spec.release.len()]
            == spec.release[..]
}

/// A conjunction of specifier clauses.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct SpecifierSet {
    pub specifiers: Vec<Specifier>,
}

impl SpecifierSet {
    /// Parse a comma-separated clause list. Empty input yields the empty
    /// set, which every version satisfies.
    pub fn parse(input: &str) -> Result<Self, String> {
        let text = input.trim();
        let mut specifiers = Vec::new();
        if !text.is_empty() {
            for clause in text.split(',') {
                specifiers.push(Specifier::parse(clause)?);
            }
        }
        Ok(SpecifierSet { specifiers })
    }

    pub fn is_empty(&self) -> bool {
        self.specifiers.is_empty()
    }

    /// Does `candidate` satisfy every clause?
    pub fn contains(&self, candidate: &Version) -> bool {
        self.specifiers.iter().all(|s| s.matches(candidate))
    }

    /// Detect obviously unsatisfiable sets: two distinct `==` pins, or a
    /// pin rejected by another clause. Returns a human-readable reason.
    pub fn contradiction(&self) -> Option<String> {
        let pins: Vec<&Specifier> = self
            .specifiers
            .iter()
            .filter(|s| s.op == Operator::Equal && !s.wildcard)
            .collect();

        for pair in pins.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.version != b.version {
                return Some(format!("conflicting pins {} and {}", a, b));
            }
        }

        if let Some(pin) = pins.first() {
            let pinned = pin.version.as_ref()?;
            for other in &self.specifiers {
                if other.op != Operator::Equal && !other.matches(pinned) {
                    return Some(format!("{} excludes the pinned version {}", other, pin));
                }
            }
        }
        None
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = self.specifiers.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", clauses.join(","))
    }
}
