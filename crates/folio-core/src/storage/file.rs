//! File-based backend for native platforms.

use super::{
    BoxFuture, Project, ProjectBackend, ProjectPatch, StorageError, StorageResult,
    validate_project_id,
};
use std::fs;
use std::path::{Path, PathBuf};

/// File-based backend for native platforms.
///
/// Stores each project as `<id>.json` in a directory. Ids are used as file
/// names unchanged, so ids that are not valid project ids are rejected.
pub struct FileBackend {
    base_path: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create a backend in the default location.
    ///
    /// On Linux: `~/.local/share/folio/projects/`
    /// On Windows: `%LOCALAPPDATA%\folio\projects\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("folio").join("projects"))
    }

    fn project_path(&self, id: &str) -> StorageResult<PathBuf> {
        validate_project_id(id)?;
        Ok(self.base_path.join(format!("{}.json", id)))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn read(path: &Path, id: &str) -> StorageResult<Project> {
        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let json = fs::read_to_string(path)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&json).map_err(|e| {
            StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn write(path: &Path, project: &Project) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(project)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(path, json)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }
}

impl ProjectBackend for FileBackend {
    fn get_project(&self, id: &str) -> BoxFuture<'_, StorageResult<Project>> {
        let path = self.project_path(id);
        let id = id.to_string();
        Box::pin(async move { Self::read(&path?, &id) })
    }

    fn update_project(&self, id: &str, patch: &ProjectPatch) -> BoxFuture<'_, StorageResult<Project>> {
        let path = self.project_path(id);
        let id = id.to_string();
        let patch = patch.clone();
        Box::pin(async move {
            let path = path?;
            let mut project = Self::read(&path, &id)?;
            patch.apply_to(&mut project);
            Self::write(&path, &project)?;
            Ok(project)
        })
    }

    fn create_project(&self, project: &Project) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.project_path(&project.id);
        let project = project.clone();
        Box::pin(async move { Self::write(&path?, &project) })
    }

    fn delete_project(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.project_path(id);
        Box::pin(async move {
            let path = path?;
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })?;
            }
            Ok(())
        })
    }

    fn list_projects(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let base = self.base_path.clone();
        Box::pin(async move {
            if !base.exists() {
                return Ok(vec![]);
            }
            let entries = fs::read_dir(&base)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let ids = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
                .filter(|id| validate_project_id(id).is_ok())
                .collect();
            Ok(ids)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::block_on;
    use tempfile::tempdir;

    #[test]
    fn test_file_backend_create_get() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf()).unwrap();

        let mut project = Project::new("case-study", "Case Study");
        project.technologies = vec!["rust".to_string(), "wasm".to_string()];

        block_on(backend.create_project(&project)).unwrap();
        let loaded = block_on(backend.get_project("case-study")).unwrap();
        assert_eq!(loaded, project);
    }

    #[test]
    fn test_file_backend_update_is_partial() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf()).unwrap();
        block_on(backend.create_project(&Project::new("p1", "Title"))).unwrap();

        let updated = block_on(backend.update_project("p1", &ProjectPatch::layout("{}"))).unwrap();
        assert_eq!(updated.title, "Title");

        let loaded = block_on(backend.get_project("p1")).unwrap();
        assert_eq!(loaded.layout_config.as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_backend_not_found() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf()).unwrap();

        let result = block_on(backend.get_project("missing"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
        let result = block_on(backend.update_project("missing", &ProjectPatch::layout("{}")));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_file_backend_corrupt_file() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf()).unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let result = block_on(backend.get_project("broken"));
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_file_backend_list_and_delete() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf()).unwrap();
        block_on(backend.create_project(&Project::new("a", "A"))).unwrap();
        block_on(backend.create_project(&Project::new("b", "B"))).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let list = block_on(backend.list_projects()).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains(&"a".to_string()));

        block_on(backend.delete_project("a")).unwrap();
        assert_eq!(block_on(backend.list_projects()).unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_ids_are_not_rewritten() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf()).unwrap();
        block_on(backend.create_project(&Project::new("a_b", "Underscore"))).unwrap();

        let result = block_on(backend.create_project(&Project::new("a/b", "Slash")));
        assert!(matches!(result, Err(StorageError::InvalidId(_))));
        let result = block_on(backend.get_project("a/b"));
        assert!(matches!(result, Err(StorageError::InvalidId(_))));
        let result = block_on(backend.delete_project("../escape"));
        assert!(matches!(result, Err(StorageError::InvalidId(_))));

        assert_eq!(block_on(backend.get_project("a_b")).unwrap().title, "Underscore");
        assert_eq!(block_on(backend.list_projects()).unwrap(), vec!["a_b".to_string()]);
    }
}
