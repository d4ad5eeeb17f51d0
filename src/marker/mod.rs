//! Environment markers: the conditional expressions after `;` in a
//! requirement line, e.g. `platform_machine != "aarch64"`.
//!
//! Markers restrict a requirement to specific platforms or interpreter
//! versions. This module defines the expression tree, parsing (see
//! [`parser`]) and evaluation against a [`MarkerEnvironment`].

mod environment;
mod parser;

pub use environment::MarkerEnvironment;
pub use parser::parse_marker;

use std::fmt;

use crate::requirement::specifier::{Operator, Specifier};
use crate::requirement::version::Version;

/// A marker variable defined by the requirement grammar.
///
/// Unknown variable names are rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerVariable {
    OsName,
    SysPlatform,
    PlatformMachine,
    PlatformSystem,
    PlatformRelease,
    PlatformVersion,
    PythonVersion,
    PythonFullVersion,
    ImplementationName,
    Extra,
}

impl MarkerVariable {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "os_name" => Some(Self::OsName),
            "sys_platform" => Some(Self::SysPlatform),
            "platform_machine" => Some(Self::PlatformMachine),
            "platform_system" => Some(Self::PlatformSystem),
            "platform_release" => Some(Self::PlatformRelease),
            "platform_version" => Some(Self::PlatformVersion),
            "python_version" => Some(Self::PythonVersion),
            "python_full_version" => Some(Self::PythonFullVersion),
            "implementation_name" => Some(Self::ImplementationName),
            "extra" => Some(Self::Extra),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OsName => "os_name",
            Self::SysPlatform => "sys_platform",
            Self::PlatformMachine => "platform_machine",
            Self::PlatformSystem => "platform_system",
            Self::PlatformRelease => "platform_release",
            Self::PlatformVersion => "platform_version",
            Self::PythonVersion => "python_version",
            Self::PythonFullVersion => "python_full_version",
            Self::ImplementationName => "implementation_name",
            Self::Extra => "extra",
        }
    }

    /// Variables whose values are versions and compare numerically.
    fn is_version_typed(&self) -> bool {
        matches!(self, Self::PythonVersion | Self::PythonFullVersion)
    }
}

impl fmt::Display for MarkerVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator inside a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Compatible,
    ArbitraryEqual,
    In,
    NotIn,
}

impl MarkerOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Compatible => "~=",
            Self::ArbitraryEqual => "===",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

/// One side of a marker comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerOperand {
    Variable(MarkerVariable),
    Literal(String),
}

impl MarkerOperand {
    fn resolve<'a>(&'a self, env: &'a MarkerEnvironment) -> &'a str {
        match self {
            MarkerOperand::Variable(var) => env.value_of(*var),
            MarkerOperand::Literal(text) => text,
        }
    }

    fn is_version_typed(&self) -> bool {
        matches!(self, MarkerOperand::Variable(v) if v.is_version_typed())
    }
}

impl fmt::Display for MarkerOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerOperand::Variable(var) => write!(f, "{}", var),
            MarkerOperand::Literal(text) => write!(f, "\"{}\"", text),
        }
    }
}

/// A marker expression tree. `and` binds tighter than `or`.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerExpr {
    And(Vec<MarkerExpr>),
    Or(Vec<MarkerExpr>),
    Comparison {
        lhs: MarkerOperand,
        op: MarkerOp,
        rhs: MarkerOperand,
    },
}

impl MarkerExpr {
    /// Evaluate against an environment. Evaluation is pure.
    pub fn evaluate(&self, env: &MarkerEnvironment) -> bool {
        match self {
            MarkerExpr::And(terms) => terms.iter().all(|t| t.evaluate(env)),
            MarkerExpr::Or(terms) => terms.iter().any(|t| t.evaluate(env)),
            MarkerExpr::Comparison { lhs, op, rhs } => {
                let version_typed = lhs.is_version_typed() || rhs.is_version_typed();
                compare(lhs.resolve(env), *op, rhs.resolve(env), version_typed)
            }
        }
    }
}

impl fmt::Display for MarkerExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerExpr::And(terms) => {
                let parts: Vec<String> = terms
                    .iter()
                    .map(|t| match t {
                        MarkerExpr::Or(_) => format!("({})", t),
                        _ => t.to_string(),
                    })
                    .collect();
                write!(f, "{}", parts.join(" and "))
            }
            MarkerExpr::Or(terms) => {
                let parts: Vec<String> = terms.iter().map(|t| t.to_string()).collect();
                write!(f, "{}", parts.join(" or "))
            }
            MarkerExpr::Comparison { lhs, op, rhs } => {
                write!(f, "{} {} {}", lhs, op.symbol(), rhs)
            }
        }
    }
}

/// Compare two marker values. Version-typed comparisons fall back to
/// string comparison when either side is not a valid version, which is
/// what pip does (with a warning; we log at debug level).
fn compare(lhs: &str, op: MarkerOp, rhs: &str, version_typed: bool) -> bool {
    if version_typed && !matches!(op, MarkerOp::In | MarkerOp::NotIn) {
        match (Version::parse(lhs), Version::parse(rhs)) {
            (Ok(l), Ok(r)) => return compare_versions(&l, op, &r, rhs),
            _ => {
                log::debug!(
                    "marker compares '{}' {} '{}' as strings (not valid versions)",
                    lhs,
                    op.symbol(),
                    rhs
                );
            }
        }
    }

    match op {
        MarkerOp::Equal => lhs == rhs,
        MarkerOp::NotEqual => lhs != rhs,
        MarkerOp::Less => lhs < rhs,
        MarkerOp::LessEqual => lhs <= rhs,
        MarkerOp::Greater => lhs > rhs,
        MarkerOp::GreaterEqual => lhs >= rhs,
        // Version-only operators are false for plain strings
        MarkerOp::Compatible => false,
        MarkerOp::ArbitraryEqual => lhs == rhs,
        MarkerOp::In => rhs.contains(lhs),
        MarkerOp::NotIn => !rhs.contains(lhs),
    }
}

fn compare_versions(lhs: &Version, op: MarkerOp, rhs: &Version, rhs_text: &str) -> bool {
    match op {
        MarkerOp::Equal => lhs == rhs,
        MarkerOp::NotEqual => lhs != rhs,
        MarkerOp::Less => lhs < rhs,
        MarkerOp::LessEqual => lhs <= rhs,
        MarkerOp::Greater => lhs > rhs,
        MarkerOp::GreaterEqual => lhs >= rhs,
        // ~= needs two release segments to have a prefix to hold fixed;
        // a bare major like '3' evaluates false, as for non-versions
        MarkerOp::Compatible if rhs.release.len() < 2 => {
            log::debug!("'~= {}' needs at least two release segments", rhs_text);
            false
        }
        MarkerOp::Compatible => Specifier {
            op: Operator::Compatible,
            text: rhs_text.to_string(),
            version: Some(rhs.clone()),
            wildcard: false,
        }
        .matches(lhs),
        MarkerOp::ArbitraryEqual => lhs.to_string() == rhs_text.trim().to_ascii_lowercase(),
        MarkerOp::In | MarkerOp::NotIn => unreachable!("handled by the string path"),
    }
}
