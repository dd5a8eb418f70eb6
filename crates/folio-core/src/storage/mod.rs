//! Project persistence: the backend the layout is written to and the
//! debounced adapter that schedules those writes.

mod memory;
mod persistence;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use memory::MemoryBackend;
pub use persistence::{DEFAULT_DEBOUNCE_MS, LayoutPersistence, LayoutWrite, PendingWrite, WriteToken};

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileBackend;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Project not found: {0}")]
    NotFound(String),
    #[error("Invalid project id: {0:?}")]
    InvalidId(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for backend operations.
#[cfg(not(target_arch = "wasm32"))]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Boxed future for backend operations (WASM is single-threaded).
#[cfg(target_arch = "wasm32")]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// A portfolio project as stored by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    /// Serialized layout document, as produced by the layout editor.
    #[serde(default)]
    pub layout_config: Option<String>,
}

impl Project {
    /// Create a project with a title and nothing else.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Check that `id` is usable as a project id: non-empty ASCII letters,
/// digits, `-` and `_`. Backends key files and URLs by it unchanged.
pub fn validate_project_id(id: &str) -> StorageResult<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

/// Partial update of a project. Only present fields are written, so a
/// layout write and a form save never overwrite each other's fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_config: Option<String>,
}

impl ProjectPatch {
    /// A patch that only replaces the layout document.
    pub fn layout(layout_config: impl Into<String>) -> Self {
        Self {
            layout_config: Some(layout_config.into()),
            ..Self::default()
        }
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write the present fields into `project`.
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(title) = &self.title {
            project.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            project.description.clone_from(description);
        }
        if let Some(category) = &self.category {
            project.category = Some(category.clone());
        }
        if let Some(technologies) = &self.technologies {
            project.technologies.clone_from(technologies);
        }
        if let Some(layout_config) = &self.layout_config {
            project.layout_config = Some(layout_config.clone());
        }
    }
}

/// Trait for project storage backends.
///
/// Implementations can keep projects in memory, on disk, or behind a
/// remote API. On native platforms they must be Send + Sync.
#[cfg(not(target_arch = "wasm32"))]
pub trait ProjectBackend: Send + Sync {
    /// Fetch a project.
    fn get_project(&self, id: &str) -> BoxFuture<'_, StorageResult<Project>>;

    /// Apply a partial update and return the updated project.
    fn update_project(&self, id: &str, patch: &ProjectPatch) -> BoxFuture<'_, StorageResult<Project>>;

    /// Store a new project (replacing one with the same id).
    fn create_project(&self, project: &Project) -> BoxFuture<'_, StorageResult<()>>;

    /// Delete a project. Deleting a missing project is not an error.
    fn delete_project(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all project ids.
    fn list_projects(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;
}

/// Trait for project storage backends (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait ProjectBackend {
    /// Fetch a project.
    fn get_project(&self, id: &str) -> BoxFuture<'_, StorageResult<Project>>;

    /// Apply a partial update and return the updated project.
    fn update_project(&self, id: &str, patch: &ProjectPatch) -> BoxFuture<'_, StorageResult<Project>>;

    /// Store a new project (replacing one with the same id).
    fn create_project(&self, project: &Project) -> BoxFuture<'_, StorageResult<()>>;

    /// Delete a project. Deleting a missing project is not an error.
    fn delete_project(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all project ids.
    fn list_projects(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;
}

/// Simple blocking executor for the boxed futures in tests. Backends here
/// never return `Pending`.
#[cfg(test)]
pub(crate) fn block_on<F: Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);

    loop {
        match f.as_mut().poll(&mut cx) {
            Poll::Ready(result) => return result,
            Poll::Pending => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_patch_leaves_form_fields() {
        let mut project = Project::new("p1", "Portfolio");
        project.technologies = vec!["rust".to_string()];

        ProjectPatch::layout("{}").apply_to(&mut project);

        assert_eq!(project.title, "Portfolio");
        assert_eq!(project.technologies, vec!["rust".to_string()]);
        assert_eq!(project.layout_config.as_deref(), Some("{}"));
    }

    #[test]
    fn test_form_patch_leaves_layout() {
        let mut project = Project::new("p1", "Portfolio");
        project.layout_config = Some("{\"mobile\":{}}".to_string());

        let patch = ProjectPatch {
            title: Some("Renamed".to_string()),
            ..ProjectPatch::default()
        };
        patch.apply_to(&mut project);

        assert_eq!(project.title, "Renamed");
        assert_eq!(project.layout_config.as_deref(), Some("{\"mobile\":{}}"));
    }

    #[test]
    fn test_project_id_validation() {
        assert!(validate_project_id("case-study_2").is_ok());
        for id in ["", "a/b", "../escape", "a b", "caf\u{e9}"] {
            assert!(matches!(validate_project_id(id), Err(StorageError::InvalidId(_))), "{id:?}");
        }
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let value = serde_json::to_value(ProjectPatch::layout("{}")).unwrap();
        assert_eq!(value, serde_json::json!({ "layout_config": "{}" }));
        assert!(ProjectPatch::default().is_empty());
    }
}
