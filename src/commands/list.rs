//! List action - reports the requirements a manifest declares.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::manifest::{ManifestReader, Source};
use crate::marker::MarkerEnvironment;
use crate::requirement::Requirement;
use crate::runtime::Runtime;

/// One requirement as reported to the user.
#[derive(Debug, Clone, Serialize)]
pub struct RequirementInfo {
    pub name: String,
    pub normalized_name: String,
    pub extras: Vec<String>,
    pub specifiers: String,
    pub url: Option<String>,
    pub marker: Option<String>,
    /// Whether the marker (if any) holds in the evaluated environment.
    pub applicable: bool,
    pub source: Source,
}

impl RequirementInfo {
    pub fn from_requirement(
        source: &Source,
        req: &Requirement,
        env: &MarkerEnvironment,
    ) -> Self {
        Self {
            name: req.name.clone(),
            normalized_name: req.normalized_name(),
            extras: req.extras.clone(),
            specifiers: req.specifiers.to_string(),
            url: req.url.clone(),
            marker: req.marker.as_ref().map(|m| m.to_string()),
            applicable: req.applies_to(env),
            source: source.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListOutcome {
    pub requirements: Vec<RequirementInfo>,
    pub diagnostics: Vec<Diagnostic>,
}

/// List action - parses one manifest and evaluates markers.
pub struct ListAction<'a, R: Runtime> {
    runtime: &'a R,
}

impl<'a, R: Runtime> ListAction<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    /// List requirements; with `applicable_only`, skip entries whose
    /// marker is false in `env`.
    pub fn run(
        &self,
        file: &Path,
        env: &MarkerEnvironment,
        applicable_only: bool,
    ) -> Result<ListOutcome> {
        let manifest = ManifestReader::new(self.runtime).read(file)?;
        let requirements = manifest
            .requirements()
            .map(|(source, req)| RequirementInfo::from_requirement(source, req, env))
            .filter(|info| !applicable_only || info.applicable)
            .collect();
        Ok(ListOutcome {
            requirements,
            diagnostics: manifest.diagnostics,
        })
    }
}
