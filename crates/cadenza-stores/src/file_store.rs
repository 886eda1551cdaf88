//! Filesystem ScenarioStore implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use cadenza_core::scenario::{parse_definition, ScenarioBuilder, ScenarioStore};
use cadenza_core::store::StoreError;
use cadenza_core::types::ScenarioPrompt;

/// Loads scenarios from a directory of YAML/JSON definition files.
///
/// Each readable, valid definition becomes one built scenario; files that
/// fail to parse or build are logged and skipped. The store is read-only;
/// mutations belong to administrative stores.
pub struct FileScenarioStore {
    directory: PathBuf,
    builder: ScenarioBuilder,
}

impl FileScenarioStore {
    /// Create a store over the given directory
    pub fn new(directory: impl Into<PathBuf>, builder: ScenarioBuilder) -> Self {
        Self {
            directory: directory.into(),
            builder,
        }
    }

    fn is_scenario_file(path: &Path) -> bool {
        matches!(
            path.extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .as_deref(),
            Some("json") | Some("yaml") | Some("yml")
        )
    }

    async fn load_file(&self, path: &Path) -> Option<ScenarioPrompt> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read scenario file");
                return None;
            }
        };
        let definition = match parse_definition(path, &content) {
            Ok(definition) => definition,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse scenario file");
                return None;
            }
        };
        match self.builder.build(&definition) {
            Ok(scenario) => {
                info!(
                    path = %path.display(),
                    scenario = %scenario.name,
                    stage_count = scenario.stages.len(),
                    "scenario loaded"
                );
                Some(scenario)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to build scenario");
                None
            }
        }
    }

    async fn load_all(&self) -> Result<Vec<ScenarioPrompt>, StoreError> {
        let mut dir = match tokio::fs::read_dir(&self.directory).await {
            Ok(dir) => dir,
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "cannot read scenario directory {}: {}",
                    self.directory.display(),
                    e
                )))
            }
        };

        let mut paths = Vec::new();
        loop {
            match dir.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if Self::is_scenario_file(&path) {
                        paths.push(path);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(
                        directory = %self.directory.display(),
                        error = %e,
                        "failed to read directory entry"
                    );
                    break;
                }
            }
        }
        paths.sort();

        let mut scenarios = Vec::new();
        for path in paths {
            if let Some(scenario) = self.load_file(&path).await {
                scenarios.push(scenario);
            }
        }
        Ok(scenarios)
    }
}

#[async_trait]
impl ScenarioStore for FileScenarioStore {
    async fn get_scenario(&self, name: &str) -> Result<Option<ScenarioPrompt>, StoreError> {
        let scenarios = self.load_all().await?;
        Ok(scenarios
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(name)))
    }

    async fn get_all_scenarios(&self) -> Result<Vec<ScenarioPrompt>, StoreError> {
        self.load_all().await
    }

    async fn list_scenario_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self
            .load_all()
            .await?
            .into_iter()
            .map(|s| s.name)
            .collect();
        names.sort();
        Ok(names)
    }

    async fn store_scenario(&self, _scenario: ScenarioPrompt) -> Result<(), StoreError> {
        Err(StoreError::Unsupported(
            "file scenario store is read-only".to_string(),
        ))
    }

    async fn delete_scenario(&self, _name: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unsupported(
            "file scenario store is read-only".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_core::schema::SchemaRegistry;
    use std::sync::Arc;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new() -> Self {
            let path = std::env::temp_dir().join(format!("cadenza-test-{}", uuid::Uuid::new_v4()));
            std::fs::create_dir_all(&path).expect("create temp dir");
            Self(path)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn builder() -> ScenarioBuilder {
        ScenarioBuilder::new(Arc::new(SchemaRegistry::new()))
    }

    const ECHO_YAML: &str = "name: echo\nvalidModels: [m]\nstages:\n  - id: 1\n    name: only\n    userPrompts:\n      - template: hi\n";

    #[tokio::test]
    async fn test_loads_scenarios_from_directory() {
        let dir = TempDir::new();
        std::fs::write(dir.0.join("echo.yaml"), ECHO_YAML).expect("write");
        std::fs::write(dir.0.join("notes.txt"), "not a scenario").expect("write");

        let store = FileScenarioStore::new(&dir.0, builder());
        let scenarios = store.get_all_scenarios().await.expect("load");
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].name, "echo");

        let found = store.get_scenario("ECHO").await.expect("get");
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_broken_files_are_skipped() {
        let dir = TempDir::new();
        std::fs::write(dir.0.join("echo.yaml"), ECHO_YAML).expect("write");
        std::fs::write(dir.0.join("broken.json"), "{not json").expect("write");

        let store = FileScenarioStore::new(&dir.0, builder());
        let names = store.list_scenario_names().await.expect("list");
        assert_eq!(names, vec!["echo".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_unavailable() {
        let store = FileScenarioStore::new("/definitely/not/here", builder());
        assert!(matches!(
            store.get_all_scenarios().await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_mutations_are_unsupported() {
        let dir = TempDir::new();
        let store = FileScenarioStore::new(&dir.0, builder());
        assert!(matches!(
            store.delete_scenario("echo").await,
            Err(StoreError::Unsupported(_))
        ));
    }
}
