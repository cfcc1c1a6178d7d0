use crate::domain::project::FALLBACK_PROJECT;

/// Derive the fallback project name from a configured project-file path.
///
/// The project directory is the second meaningful segment of the path, so
/// `projects/intro/src/project.ts` and `./projects/intro/src/project.ts` both
/// resolve to `intro`. Anything shorter falls back to [`FALLBACK_PROJECT`].
pub fn resolve_default(project_file: Option<&str>) -> String {
    project_file
        .and_then(|path| {
            path.split('/')
                .filter(|segment| !segment.is_empty() && *segment != ".")
                .nth(1)
        })
        .unwrap_or(FALLBACK_PROJECT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_configuration_uses_fallback() {
        assert_eq!(resolve_default(None), "default");
    }

    #[test]
    fn extracts_project_directory() {
        assert_eq!(
            resolve_default(Some("projects/intro/src/project.ts")),
            "intro"
        );
        assert_eq!(
            resolve_default(Some("./projects/intro/src/project.ts")),
            "intro"
        );
        assert_eq!(resolve_default(Some("projects//intro")), "intro");
    }

    #[test]
    fn malformed_paths_degrade_to_fallback() {
        for input in ["", "/", "./", "project.ts", "./projects", "projects/", "//"] {
            assert_eq!(resolve_default(Some(input)), "default", "input {input:?}");
        }
    }

    #[test]
    fn never_returns_empty() {
        let inputs = [
            "a/b",
            "../../x",
            "   ",
            "a\\b\\c",
            "ñ/ü/ß",
            "/abs/projects/x/src/project.ts",
        ];
        for input in inputs {
            assert!(!resolve_default(Some(input)).is_empty(), "input {input:?}");
        }
    }
}
