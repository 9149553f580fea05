//! Project-index reader: a TOML catalog of known WordNet projects and their
//! downloadable versions.
//!
//! Resolving and downloading a project is out of scope here (an external
//! collaborator's job per the component boundary); this module only reads
//! and looks up the catalog.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One entry in a project's `versions` table: either a set of download
/// URLs or an explanation of why the version is unavailable. Mutually
/// exclusive, matching the TOML source.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProjectVersion {
    Available { url: String },
    Unavailable { error: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub versions: BTreeMap<String, ProjectVersion>,
}

/// The full project-index catalog, keyed by project id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectIndex {
    #[serde(flatten)]
    pub projects: BTreeMap<String, Project>,
}

impl ProjectIndex {
    /// Parses a project-index TOML document.
    pub fn parse(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(Error::from)
    }

    /// Reads and parses a project-index file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn project(&self, id: &str) -> Result<&Project> {
        self.projects
            .get(id)
            .ok_or_else(|| Error::UnknownProject(id.to_string()))
    }

    /// The download URL for a specific `project:version`, raising the
    /// appropriate domain error for unknown projects/versions, explicitly
    /// retired versions, or a version with no URL recorded.
    pub fn resolve_url(&self, project_id: &str, version: &str) -> Result<String> {
        let project = self.project(project_id)?;
        let entry = project
            .versions
            .get(version)
            .ok_or_else(|| Error::UnknownProjectVersion {
                project: project_id.to_string(),
                version: version.to_string(),
            })?;
        match entry {
            ProjectVersion::Available { url } => Ok(url.clone()),
            ProjectVersion::Unavailable { error } => Err(Error::ProjectVersionError(error.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[oewn]
label = "Open English WordNet"
language = "en"
license = "CC BY 4.0"

[oewn.versions."2021"]
url = "https://example.org/oewn-2021.xml.gz"

[oewn.versions."2020"]
error = "retired: superseded by 2021 release"
"#;

    #[test]
    fn resolves_available_version_url() {
        let index = ProjectIndex::parse(SAMPLE).unwrap();
        let url = index.resolve_url("oewn", "2021").unwrap();
        assert_eq!(url, "https://example.org/oewn-2021.xml.gz");
    }

    #[test]
    fn retired_version_raises_project_version_error() {
        let index = ProjectIndex::parse(SAMPLE).unwrap();
        let err = index.resolve_url("oewn", "2020").unwrap_err();
        assert!(matches!(err, Error::ProjectVersionError(_)));
    }

    #[test]
    fn unknown_project_is_reported() {
        let index = ProjectIndex::parse(SAMPLE).unwrap();
        let err = index.resolve_url("nope", "1").unwrap_err();
        assert!(matches!(err, Error::UnknownProject(_)));
    }

    #[test]
    fn unknown_version_is_reported() {
        let index = ProjectIndex::parse(SAMPLE).unwrap();
        let err = index.resolve_url("oewn", "9999").unwrap_err();
        assert!(matches!(err, Error::UnknownProjectVersion { .. }));
    }
}
