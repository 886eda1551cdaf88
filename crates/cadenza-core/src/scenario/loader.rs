//! Scenario file parsing.

use std::path::Path;

use crate::error::DefinitionError;
use crate::types::ScenarioDefinition;

/// Load a scenario definition from a file, dispatching on its extension.
pub fn load_definition(path: &Path) -> Result<ScenarioDefinition, DefinitionError> {
    let content = std::fs::read_to_string(path).map_err(|source| DefinitionError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_definition(path, &content)
}

/// Parse scenario file content, dispatching on the path's extension.
///
/// `.json` parses as JSON; `.yaml`/`.yml` parse as YAML; the comparison is
/// case-insensitive. Anything else is rejected.
pub fn parse_definition(path: &Path, content: &str) -> Result<ScenarioDefinition, DefinitionError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "json" => serde_json::from_str(content).map_err(|e| DefinitionError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        }),
        "yaml" | "yml" => serde_yaml::from_str(content).map_err(|e| DefinitionError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        }),
        _ => Err(DefinitionError::UnsupportedExtension {
            path: path.display().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const YAML: &str = "name: echo\nvalidModels: [m]\nstages:\n  - id: 1\n    name: only\n    userPrompts:\n      - template: hi\n";

    #[test]
    fn test_parse_definition_dispatches_on_extension() {
        let yaml_path = PathBuf::from("echo.YAML");
        let def = parse_definition(&yaml_path, YAML).expect("parse yaml");
        assert_eq!(def.name, "echo");

        let json_path = PathBuf::from("echo.json");
        let json = serde_json::to_string(&def).expect("render json");
        let reparsed = parse_definition(&json_path, &json).expect("parse json");
        assert_eq!(def, reparsed);
    }

    #[test]
    fn test_parse_definition_rejects_unknown_extension() {
        let path = PathBuf::from("echo.toml");
        assert!(matches!(
            parse_definition(&path, YAML),
            Err(DefinitionError::UnsupportedExtension { .. })
        ));
    }

    #[test]
    fn test_parse_error_carries_the_file_path() {
        let path = PathBuf::from("broken.json");
        let err = parse_definition(&path, "{not json").expect_err("must fail");
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_load_definition_reports_missing_file() {
        let path = PathBuf::from("/definitely/not/here.yaml");
        assert!(matches!(
            load_definition(&path),
            Err(DefinitionError::Read { .. })
        ));
    }
}
