//! Project identifiers, descriptors and catalog snapshots.

use std::{
    ffi::OsStr,
    fmt,
    path::{self, Component, Path, PathBuf},
};

use serde::Serialize;

use super::error::DomainError;

/// Identifier used when no project can be derived from configuration.
pub const FALLBACK_PROJECT: &str = "default";

/// Entry point every project directory must contain, relative to the project root.
pub const DEFAULT_DEFINITION_FILE: &str = "src/project.ts";

/// A project name that is safe to join onto the projects root.
///
/// Names are single normal path components on the host platform: they never
/// contain a separator, never traverse upwards and are never empty. Any
/// directory name the projects root can hold is accepted, so a listed project
/// can always be dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.is_empty() {
            return Err(DomainError::invalid_project_name(raw, "name is empty"));
        }
        if raw.contains('\0') {
            return Err(DomainError::invalid_project_name(
                raw,
                "name contains a NUL byte",
            ));
        }
        if raw.chars().any(path::is_separator) {
            return Err(DomainError::invalid_project_name(
                raw,
                "name contains a path separator",
            ));
        }

        let mut components = Path::new(raw).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(component)), None) if component == OsStr::new(raw) => {
                Ok(Self(raw.to_string()))
            }
            _ => Err(DomainError::invalid_project_name(
                raw,
                "name is not a plain directory name",
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A project resolved against the file system for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub name: ProjectName,
    pub definition_path: PathBuf,
}

impl ProjectDescriptor {
    /// Compute the descriptor of `name` under `root` without touching the disk.
    pub fn locate(root: &Path, definition_file: &Path, name: ProjectName) -> Self {
        let definition_path = root.join(name.as_str()).join(definition_file);
        Self {
            name,
            definition_path,
        }
    }
}

/// Answer to "which projects exist, and which one is the default".
///
/// `projects` is never empty. `default` may name a project that is not part of
/// `projects` when real projects were discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSnapshot {
    pub projects: Vec<String>,
    pub default: String,
}

impl CatalogSnapshot {
    pub fn new(projects: Vec<String>, default: String) -> Self {
        if projects.is_empty() {
            return Self {
                projects: vec![default.clone()],
                default,
            };
        }
        Self { projects, default }
    }

    pub fn contains_default(&self) -> bool {
        self.projects.iter().any(|name| name == &self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_directory_names() {
        for name in ["default", "demo", "intro-2024", "año", ".hidden"] {
            let parsed = ProjectName::parse(name).expect("valid name");
            assert_eq!(parsed.as_str(), name);
        }
    }

    #[test]
    fn rejects_names_that_escape_the_root() {
        for name in ["", ".", "..", "../etc", "a/b", "nul\0byte"] {
            assert!(
                ProjectName::parse(name).is_err(),
                "expected `{name:?}` to be rejected"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn backslash_is_an_ordinary_character_on_unix() {
        let parsed = ProjectName::parse("a\\b").expect("valid unix directory name");
        assert_eq!(parsed.as_str(), "a\\b");
    }

    #[cfg(windows)]
    #[test]
    fn backslash_and_prefixes_are_rejected_on_windows() {
        for name in ["a\\b", "C:", "C:x"] {
            assert!(ProjectName::parse(name).is_err(), "expected `{name:?}` to be rejected");
        }
    }

    #[test]
    fn locate_joins_definition_file() {
        let name = ProjectName::parse("demo").expect("valid name");
        let descriptor = ProjectDescriptor::locate(
            Path::new("projects"),
            Path::new(DEFAULT_DEFINITION_FILE),
            name,
        );
        assert_eq!(
            descriptor.definition_path,
            Path::new("projects/demo/src/project.ts")
        );
    }

    #[test]
    fn empty_snapshot_gets_synthetic_default() {
        let snapshot = CatalogSnapshot::new(Vec::new(), "default".to_string());
        assert_eq!(snapshot.projects, vec!["default".to_string()]);
        assert!(snapshot.contains_default());
    }

    #[test]
    fn default_is_not_forced_into_listing() {
        let snapshot = CatalogSnapshot::new(vec!["demo".to_string()], "intro".to_string());
        assert_eq!(snapshot.projects, vec!["demo".to_string()]);
        assert_eq!(snapshot.default, "intro");
        assert!(!snapshot.contains_default());
    }

    #[test]
    fn snapshot_serializes_with_expected_keys() {
        let snapshot = CatalogSnapshot::new(
            vec!["default".to_string(), "demo".to_string()],
            "default".to_string(),
        );
        let json = serde_json::to_value(&snapshot).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "projects": ["default", "demo"], "default": "default" })
        );
    }
}
