//! In-memory backend implementation.

use super::{
    BoxFuture, Project, ProjectBackend, ProjectPatch, StorageError, StorageResult,
    validate_project_id,
};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory backend for testing and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    projects: RwLock<HashMap<String, Project>>,
    /// Number of successful `update_project` calls, for observing write coalescing.
    updates: RwLock<usize>,
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend holding `projects`.
    pub fn with_projects(projects: impl IntoIterator<Item = Project>) -> Self {
        let projects = projects.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            projects: RwLock::new(projects),
            updates: RwLock::new(0),
        }
    }

    /// How many updates have been applied.
    pub fn update_count(&self) -> usize {
        self.updates.read().map(|count| *count).unwrap_or(0)
    }

    fn lock_error(e: impl std::fmt::Display) -> StorageError {
        StorageError::Other(format!("Lock error: {}", e))
    }

    fn update_sync(&self, id: &str, patch: &ProjectPatch) -> StorageResult<Project> {
        let mut projects = self.projects.write().map_err(Self::lock_error)?;
        let project = projects
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        patch.apply_to(project);
        let updated = project.clone();
        drop(projects);

        *self.updates.write().map_err(Self::lock_error)? += 1;
        Ok(updated)
    }
}

impl ProjectBackend for MemoryBackend {
    fn get_project(&self, id: &str) -> BoxFuture<'_, StorageResult<Project>> {
        let result = self
            .projects
            .read()
            .map_err(Self::lock_error)
            .and_then(|projects| {
                projects
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StorageError::NotFound(id.to_string()))
            });
        Box::pin(async move { result })
    }

    fn update_project(&self, id: &str, patch: &ProjectPatch) -> BoxFuture<'_, StorageResult<Project>> {
        let result = self.update_sync(id, patch);
        Box::pin(async move { result })
    }

    fn create_project(&self, project: &Project) -> BoxFuture<'_, StorageResult<()>> {
        let result = validate_project_id(&project.id).and_then(|()| {
            self.projects
                .write()
                .map_err(Self::lock_error)
                .map(|mut projects| {
                    projects.insert(project.id.clone(), project.clone());
                })
        });
        Box::pin(async move { result })
    }

    fn delete_project(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let result = self
            .projects
            .write()
            .map_err(Self::lock_error)
            .map(|mut projects| {
                projects.remove(id);
            });
        Box::pin(async move { result })
    }

    fn list_projects(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let result = self
            .projects
            .read()
            .map_err(Self::lock_error)
            .map(|projects| projects.keys().cloned().collect());
        Box::pin(async move { result })
    }
}
