//! Requirement line grammar (PEP 508).
//!
//! A requirement names a package, optionally with extras, a version
//! specifier set (or a direct URL), and an environment marker:
//!
//! ```text
//! mdtraj ~= 1.9 ; platform_machine != "aarch64"
//! nglview[lab] >= 3.0, < 4
//! sire @ https://example.org/sire-2023.1.0.tar.gz
//! ```

pub mod specifier;
pub mod version;

use std::fmt;

use crate::marker::{MarkerExpr, MarkerEnvironment, parse_marker};
use specifier::SpecifierSet;

/// One parsed requirement.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    /// Package name as written in the manifest.
    pub name: String,
    pub extras: Vec<String>,
    pub specifiers: SpecifierSet,
    /// Direct reference (`name @ url`); mutually exclusive with specifiers.
    pub url: Option<String>,
    pub marker: Option<MarkerExpr>,
}

impl Requirement {
    /// Parse one logical requirement line (comments already stripped).
    pub fn parse(input: &str) -> Result<Self, String> {
        let text = input.trim();
        if text.is_empty() {
            return Err("empty requirement".to_string());
        }

        let (body, marker_text) = split_marker(text)?;
        let marker = match marker_text {
            Some(m) if m.trim().is_empty() => {
                return Err("missing marker expression after ';'".to_string());
            }
            Some(m) => Some(parse_marker(m)?),
            None => None,
        };

        let body = body.trim();
        let (name, rest) = take_name(body)?;
        let (extras, rest) = take_extras(rest)?;
        let rest = rest.trim_start();

        let (specifiers, url) = if let Some(url_part) = rest.strip_prefix('@') {
            let url = url_part.trim();
            if url.is_empty() {
                return Err("missing URL after '@'".to_string());
            }
            (SpecifierSet::default(), Some(url.to_string()))
        } else {
            // Specifiers may be parenthesized: "name (>=1.0)"
            let spec_text = rest
                .strip_prefix('(')
                .and_then(|inner| inner.strip_suffix(')'))
                .unwrap_or(rest);
            (SpecifierSet::parse(spec_text)?, None)
        };

        Ok(Requirement {
            name: name.to_string(),
            extras,
            specifiers,
            url,
            marker,
        })
    }

    /// PEP 503 normalized name: lowercase, runs of `-_.` collapse to `-`.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// True when the marker (if any) holds in `env`.
    pub fn applies_to(&self, env: &MarkerEnvironment) -> bool {
        self.marker.as_ref().is_none_or(|m| m.evaluate(env))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        if let Some(url) = &self.url {
            write!(f, " @ {}", url)?;
        } else if !self.specifiers.is_empty() {
            write!(f, "{}", self.specifiers)?;
        }
        if let Some(marker) = &self.marker {
            write!(f, " ; {}", marker)?;
        }
        Ok(())
    }
}

/// Normalize a package name per PEP 503. Idempotent.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            in_separator = true;
        } else {
            if in_separator {
                normalized.push('-');
                in_separator = false;
            }
            normalized.push(c.to_ascii_lowercase());
        }
    }
    normalized
}

/// Split off the marker at the first `;` outside quotes.
fn split_marker(text: &str) -> Result<(&str, Option<&str>), String> {
    let mut quote: Option<char> = None;
    for (pos, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ';') => return Ok((&text[..pos], Some(&text[pos + 1..]))),
            (None, _) => {}
        }
    }
    if quote.is_some() {
        return Err("unterminated string in requirement".to_string());
    }
    Ok((text, None))
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn take_name(text: &str) -> Result<(&str, &str), String> {
    let end = text.find(|c| !is_name_char(c)).unwrap_or(text.len());
    let name = &text[..end];
    validate_name(name)?;
    Ok((name, &text[end..]))
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("missing package name".to_string());
    }
    let first_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let last_ok = name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    if !first_ok || !last_ok {
        return Err(format!(
            "package name '{}' must start and end with a letter or digit",
            name
        ));
    }
    Ok(())
}

/// Parse the optional `[extra1,extra2]` list.
fn take_extras(text: &str) -> Result<(Vec<String>, &str), String> {
    let Some(inner) = text.strip_prefix('[') else {
        return Ok((Vec::new(), text));
    };
    let Some(close) = inner.find(']') else {
        return Err("missing ']' after extras".to_string());
    };
    let mut extras = Vec::new();
    for extra in inner[..close].split(',') {
        let extra = extra.trim();
        if extra.is_empty() {
            return Err("empty extra name".to_string());
        }
        if !extra.chars().all(is_name_char) {
            return Err(format!("invalid extra name '{}'", extra));
        }
        validate_name(extra)?;
        extras.push(extra.to_string());
    }
    Ok((extras, &inner[close + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirement::version::Version;

    #[test]
    fn test_parse_bare_name() {
        let req = Requirement::parse("mdtraj").unwrap();
        assert_eq!(req.name, "mdtraj");
        assert!(req.extras.is_empty());
        assert!(req.specifiers.is_empty());
        assert!(req.marker.is_none());
        assert!(req.url.is_none());
    }

    #[test]
    fn test_parse_with_specifiers() {
        let req = Requirement::parse("pygtail >= 0.11, < 1.0").unwrap();
        assert_eq!(req.name, "pygtail");
        assert_eq!(req.specifiers.specifiers.len(), 2);
        assert!(req.specifiers.contains(&Version::parse("0.14").unwrap()));
        assert!(!req.specifiers.contains(&Version::parse("1.0").unwrap()));
    }

    #[test]
    fn test_parse_parenthesized_specifiers() {
        let req = Requirement::parse("mdanalysis (~=2.0)").unwrap();
        assert_eq!(req.specifiers.specifiers.len(), 1);
    }

    #[test]
    fn test_parse_extras() {
        let req = Requirement::parse("nglview[lab,md] >= 3.0").unwrap();
        assert_eq!(req.extras, vec!["lab".to_string(), "md".to_string()]);
        assert_eq!(req.specifiers.specifiers.len(), 1);
    }

    #[test]
    fn test_parse_marker() {
        let req = Requirement::parse("mdtraj ~= 1.9 ; platform_machine != \"aarch64\"").unwrap();
        assert!(req.marker.is_some());

        let mut env = MarkerEnvironment::for_tests();
        assert!(req.applies_to(&env));
        env.platform_machine = "aarch64".to_string();
        assert!(!req.applies_to(&env));
    }

    #[test]
    fn test_parse_url_reference() {
        let req =
            Requirement::parse("sire @ https://example.org/sire-2023.1.0.tar.gz").unwrap();
        assert_eq!(
            req.url.as_deref(),
            Some("https://example.org/sire-2023.1.0.tar.gz")
        );
        assert!(req.specifiers.is_empty());
    }

    #[test]
    fn test_parse_url_with_marker() {
        let req = Requirement::parse("sire @ https://example.org/x.tar.gz ; os_name == 'posix'")
            .unwrap();
        assert!(req.url.is_some());
        assert!(req.marker.is_some());
    }

    #[test]
    fn test_parse_errors() {
        assert!(Requirement::parse("").is_err());
        assert!(Requirement::parse("-mdtraj").is_err()); // bad leading char
        assert!(Requirement::parse("mdtraj-").is_err()); // bad trailing char
        assert!(Requirement::parse("mdtraj ==").is_err()); // missing version
        assert!(Requirement::parse("mdtraj 1.9").is_err()); // missing operator
        assert!(Requirement::parse("mdtraj ;").is_err()); // missing marker
        assert!(Requirement::parse("nglview[").is_err()); // unclosed extras
        assert!(Requirement::parse("nglview[]").is_err()); // empty extra
        assert!(Requirement::parse("sire @").is_err()); // missing url
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("MDAnalysis"), "mdanalysis");
        assert_eq!(normalize_name("ruamel.yaml"), "ruamel-yaml");
        assert_eq!(normalize_name("a__b--c..d"), "a-b-c-d");
    }

    #[test]
    fn test_normalize_name_idempotent() {
        for name in ["MDAnalysis", "ruamel.yaml", "typing_extensions", "x"] {
            let once = normalize_name(name);
            assert_eq!(normalize_name(&once), once);
        }
    }

    #[test]
    fn test_normalized_names_agree_case_insensitively() {
        let a = Requirement::parse("RDKit").unwrap();
        let b = Requirement::parse("rdkit").unwrap();
        assert_eq!(a.normalized_name(), b.normalized_name());
    }

    #[test]
    fn test_display_round_trip() {
        for line in [
            "mdtraj~=1.9 ; platform_machine != \"aarch64\"",
            "nglview[lab]>=3.0,<4",
            "sire @ https://example.org/sire.tar.gz",
            "pygtail",
        ] {
            let req = Requirement::parse(line).unwrap();
            let reparsed = Requirement::parse(&req.to_string()).unwrap();
            assert_eq!(req, reparsed);
        }
    }
}
