//! Check action - validates manifests and collects diagnostics.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::diagnostics::{Diagnostic, Severity};
use crate::manifest::ManifestReader;
use crate::runtime::Runtime;

/// Result of checking one or more manifests.
#[derive(Debug, Serialize)]
pub struct CheckOutcome {
    pub files: usize,
    pub requirements: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckOutcome {
    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Warnings fail the check only in strict mode.
    pub fn passed(&self, strict: bool) -> bool {
        self.errors() == 0 && (!strict || self.warnings() == 0)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} file(s), {} requirement(s), {} error(s), {} warning(s)",
            self.files,
            self.requirements,
            self.errors(),
            self.warnings()
        )
    }
}

/// Check action - parses manifests and reports everything wrong with them.
pub struct CheckAction<'a, R: Runtime> {
    runtime: &'a R,
}

impl<'a, R: Runtime> CheckAction<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    /// Check each file, including everything it pulls in via `-r`.
    pub fn run(&self, files: &[PathBuf]) -> Result<CheckOutcome> {
        let reader = ManifestReader::new(self.runtime);
        let mut outcome = CheckOutcome {
            files: files.len(),
            requirements: 0,
            diagnostics: Vec::new(),
        };

        for file in files {
            let manifest = reader.read(file)?;
            outcome.requirements += manifest.requirements().count();
            outcome.diagnostics.extend(manifest.lint());
            outcome.diagnostics.extend(manifest.diagnostics);
        }

        outcome
            .diagnostics
            .sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::manifest_runtime;

    fn check(content: &'static str) -> CheckOutcome {
        let runtime = manifest_runtime(vec![("/m/requirements.txt", content)]);
        CheckAction::new(&runtime)
            .run(&[PathBuf::from("/m/requirements.txt")])
            .unwrap()
    }

    #[test]
    fn test_clean_manifest_passes() {
        let outcome = check("mdtraj ~= 1.9 ; platform_machine != \"aarch64\"\npygtail\n");
        assert_eq!(outcome.requirements, 2);
        assert!(outcome.diagnostics.is_empty());
        assert!(outcome.passed(true));
    }

    #[test]
    fn test_errors_fail() {
        let outcome = check("mdtraj ==\n");
        assert_eq!(outcome.errors(), 1);
        assert!(!outcome.passed(false));
    }

    #[test]
    fn test_warnings_fail_only_in_strict_mode() {
        let outcome = check("mdtraj\nMDTRAJ\n");
        assert_eq!(outcome.errors(), 0);
        assert_eq!(outcome.warnings(), 1);
        assert!(outcome.passed(false));
        assert!(!outcome.passed(true));
    }

    #[test]
    fn test_diagnostics_sorted_by_location() {
        let outcome = check("good\nbad ==\nalso-bad ~=1\n");
        let lines: Vec<usize> = outcome.diagnostics.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![2, 3]);
    }

    #[test]
    fn test_summary_counts() {
        let outcome = check("mdtraj\nbad ==\n");
        assert_eq!(outcome.summary(), "1 file(s), 1 requirement(s), 1 error(s), 0 warning(s)");
    }
}
