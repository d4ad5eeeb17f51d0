//! Show action - details for a single package in a manifest.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::manifest::ManifestReader;
use crate::marker::MarkerEnvironment;
use crate::requirement::normalize_name;
use crate::runtime::Runtime;

use super::RequirementInfo;

/// All entries for one (normalized) package name.
#[derive(Debug, Serialize)]
pub struct ShowOutcome {
    pub name: String,
    pub entries: Vec<RequirementInfo>,
}

impl ShowOutcome {
    pub fn found(&self) -> bool {
        !self.entries.is_empty()
    }
}

/// Show action - looks a package up by name, ignoring spelling
/// differences the ecosystem treats as equivalent.
pub struct ShowAction<'a, R: Runtime> {
    runtime: &'a R,
}

impl<'a, R: Runtime> ShowAction<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    pub fn run(
        &self,
        file: &Path,
        package: &str,
        env: &MarkerEnvironment,
    ) -> Result<ShowOutcome> {
        let wanted = normalize_name(package);
        let manifest = ManifestReader::new(self.runtime).read(file)?;
        let entries = manifest
            .requirements()
            .filter(|(_, req)| req.normalized_name() == wanted)
            .map(|(source, req)| RequirementInfo::from_requirement(source, req, env))
            .collect();
        Ok(ShowOutcome {
            name: wanted,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::manifest_runtime;

    fn show(content: &'static str, package: &str) -> ShowOutcome {
        let runtime = manifest_runtime(vec![("/m/requirements.txt", content)]);
        ShowAction::new(&runtime)
            .run(
                Path::new("/m/requirements.txt"),
                package,
                &MarkerEnvironment::for_tests(),
            )
            .unwrap()
    }

    #[test]
    fn test_show_matches_normalized_spelling() {
        let outcome = show("ruamel.yaml >= 0.17\n", "Ruamel-YAML");
        assert!(outcome.found());
        assert_eq!(outcome.name, "ruamel-yaml");
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].name, "ruamel.yaml");
    }

    #[test]
    fn test_show_collects_every_entry() {
        let content = "mdtraj ; sys_platform == 'linux'\nmdtraj ; sys_platform == 'darwin'\n";
        let outcome = show(content, "mdtraj");
        assert_eq!(outcome.entries.len(), 2);
        assert!(outcome.entries[0].applicable);
        assert!(!outcome.entries[1].applicable);
    }

    #[test]
    fn test_show_absent_package() {
        let outcome = show("mdtraj\n", "numpy");
        assert!(!outcome.found());
        assert!(outcome.entries.is_empty());
    }
}
