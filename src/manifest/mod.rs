//! Manifest reading.
//!
//! A manifest is a flat list of requirement lines plus installer option
//! lines (`--index-url ...`, `-r other.txt`, ...). Options are carried
//! through without interpretation; the external installer owns them. The
//! one exception is `-r`/`--requirement`, which pulls in another manifest
//! relative to the including file.

mod parser;

pub use parser::{LogicalLine, logical_lines};

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::requirement::Requirement;
use crate::runtime::Runtime;

/// Where an entry came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub file: PathBuf,
    pub line: usize,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// An installer option line, carried verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionLine {
    pub flag: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    Requirement(Requirement),
    Option(OptionLine),
}

/// One parsed manifest entry with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub source: Source,
    pub kind: EntryKind,
    /// The logical line as written.
    pub raw: String,
}

/// A fully read manifest tree (includes resolved), plus everything that
/// went wrong while reading it.
#[derive(Debug, Default)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Manifest {
    /// All requirement entries in manifest order.
    pub fn requirements(&self) -> impl Iterator<Item = (&Source, &Requirement)> {
        self.entries.iter().filter_map(|entry| match &entry.kind {
            EntryKind::Requirement(req) => Some((&entry.source, req)),
            EntryKind::Option(_) => None,
        })
    }

    /// Cross-entry lints: duplicate packages and contradictory specifier
    /// sets. These are warnings; the manifest still parses.
    pub fn lint(&self) -> Vec<Diagnostic> {
        let mut findings = Vec::new();

        let requirements: Vec<(&Source, &Requirement)> = self.requirements().collect();
        for (index, (source, req)) in requirements.iter().enumerate() {
            let name = req.normalized_name();
            if let Some((first_source, _)) = requirements[..index]
                .iter()
                .find(|(_, other)| other.normalized_name() == name)
            {
                findings.push(Diagnostic::warning(
                    source.file.clone(),
                    source.line,
                    format!("duplicate entry for '{}' (first at {})", name, first_source),
                ));
            }

            if let Some(reason) = req.specifiers.contradiction() {
                findings.push(Diagnostic::warning(
                    source.file.clone(),
                    source.line,
                    format!("unsatisfiable version constraints: {}", reason),
                ));
            }
        }

        findings
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == crate::diagnostics::Severity::Error)
    }
}

/// Option flags pip understands in a requirements file. Anything else is
/// flagged but still carried through.
const KNOWN_OPTIONS: &[&str] = &[
    "-r",
    "--requirement",
    "-c",
    "--constraint",
    "-e",
    "--editable",
    "-i",
    "--index-url",
    "--extra-index-url",
    "--no-index",
    "-f",
    "--find-links",
    "--no-binary",
    "--only-binary",
    "--prefer-binary",
    "--require-hashes",
    "--pre",
    "--trusted-host",
    "--use-feature",
];

/// Reads manifests through a [`Runtime`].
pub struct ManifestReader<'a, R: Runtime> {
    runtime: &'a R,
}

impl<'a, R: Runtime> ManifestReader<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    /// Read `path` and everything it includes. An unreadable root file is
    /// a hard error; problems inside the tree become diagnostics so the
    /// rest of the manifest is still checked.
    pub fn read(&self, path: &Path) -> Result<Manifest> {
        let mut manifest = Manifest::default();
        let mut visited = Vec::new();
        let content = self.runtime.read_to_string(path)?;
        visited.push(self.identity(path));
        self.read_content(path, &content, &mut manifest, &mut visited);
        Ok(manifest)
    }

    fn read_content(
        &self,
        path: &Path,
        content: &str,
        manifest: &mut Manifest,
        visited: &mut Vec<PathBuf>,
    ) {
        for logical in logical_lines(content) {
            let source = Source {
                file: path.to_path_buf(),
                line: logical.line,
            };
            if logical.text.starts_with('-') {
                self.handle_option(&logical.text, source, manifest, visited);
            } else {
                match Requirement::parse(&logical.text) {
                    Ok(req) => manifest.entries.push(ManifestEntry {
                        source,
                        kind: EntryKind::Requirement(req),
                        raw: logical.text,
                    }),
                    Err(message) => manifest.diagnostics.push(Diagnostic::error(
                        source.file,
                        source.line,
                        message,
                    )),
                }
            }
        }
    }

    fn handle_option(
        &self,
        text: &str,
        source: Source,
        manifest: &mut Manifest,
        visited: &mut Vec<PathBuf>,
    ) {
        let (flag, value) = match text.split_once(char::is_whitespace) {
            Some((flag, value)) => (flag, Some(value.trim().to_string())),
            None => match text.split_once('=') {
                Some((flag, value)) => (flag, Some(value.trim().to_string())),
                None => (text, None),
            },
        };

        if !KNOWN_OPTIONS.contains(&flag) {
            manifest.diagnostics.push(Diagnostic::warning(
                source.file.clone(),
                source.line,
                format!("unrecognized option '{}'", flag),
            ));
        }

        if matches!(flag, "-r" | "--requirement") {
            match &value {
                Some(target) => self.include(target, &source, manifest, visited),
                None => manifest.diagnostics.push(Diagnostic::error(
                    source.file.clone(),
                    source.line,
                    format!("'{}' requires a file argument", flag),
                )),
            }
        }

        manifest.entries.push(ManifestEntry {
            source,
            kind: EntryKind::Option(OptionLine {
                flag: flag.to_string(),
                value,
            }),
            raw: text.to_string(),
        });
    }

    fn include(
        &self,
        target: &str,
        source: &Source,
        manifest: &mut Manifest,
        visited: &mut Vec<PathBuf>,
    ) {
        let target_path = source
            .file
            .parent()
            .map(|dir| dir.join(target))
            .unwrap_or_else(|| PathBuf::from(target));

        if !self.runtime.exists(&target_path) {
            manifest.diagnostics.push(Diagnostic::error(
                source.file.clone(),
                source.line,
                format!("included file '{}' not found", target_path.display()),
            ));
            return;
        }

        let identity = self.identity(&target_path);
        if visited.contains(&identity) {
            manifest.diagnostics.push(Diagnostic::error(
                source.file.clone(),
                source.line,
                format!("circular include of '{}'", target_path.display()),
            ));
            return;
        }

        let content = match self.runtime.read_to_string(&target_path) {
            Ok(content) => content,
            Err(err) => {
                manifest.diagnostics.push(Diagnostic::error(
                    source.file.clone(),
                    source.line,
                    format!("{:#}", err),
                ));
                return;
            }
        };

        visited.push(identity);
        self.read_content(&target_path, &content, manifest, visited);
        visited.pop();
    }

    /// Stable identity for cycle detection; falls back to the joined path
    /// when canonicalization fails.
    fn identity(&self, path: &Path) -> PathBuf {
        self.runtime
            .canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
