//! Debounced layout persistence.
//!
//! Layout edits schedule a write instead of saving straight away. A newer
//! schedule supersedes the pending one, so a burst of edits becomes a
//! single write once the debounce window passes. The write itself carries
//! only the layout field, and the document is serialized when the write is
//! taken, not when it was scheduled.

use super::{ProjectBackend, ProjectPatch, StorageResult};
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Identifies one scheduled write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteToken(u64);

/// A write waiting for its debounce window to pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub token: WriteToken,
    pub project_id: String,
    pub due: Instant,
}

/// Owns the pending write and the backend it targets.
pub struct LayoutPersistence<B: ProjectBackend + ?Sized> {
    backend: Arc<B>,
    debounce: Duration,
    pending: Option<PendingWrite>,
    next_token: u64,
}

impl<B: ProjectBackend + ?Sized> LayoutPersistence<B> {
    /// Create a persistence adapter with the default debounce window.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            pending: None,
            next_token: 0,
        }
    }

    /// Set the debounce window.
    pub fn set_interval(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    /// Get the debounce window.
    pub fn interval(&self) -> Duration {
        self.debounce
    }

    /// Get a reference to the backend.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Schedule a write for `project_id`, superseding any pending one.
    pub fn schedule(&mut self, project_id: &str, now: Instant) -> WriteToken {
        self.next_token += 1;
        let token = WriteToken(self.next_token);
        if let Some(previous) = self.pending.take() {
            log::debug!("Superseding pending layout write {:?}", previous.token);
        }
        self.pending = Some(PendingWrite {
            token,
            project_id: project_id.to_string(),
            due: now + self.debounce,
        });
        token
    }

    /// The currently pending write, if any.
    pub fn pending(&self) -> Option<&PendingWrite> {
        self.pending.as_ref()
    }

    /// Whether the pending write's window has passed.
    pub fn is_due(&self, now: Instant) -> bool {
        self.pending.as_ref().is_some_and(|p| now >= p.due)
    }

    /// Take the pending write if its window has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<PendingWrite> {
        if self.is_due(now) { self.pending.take() } else { None }
    }

    /// Take the pending write regardless of its window.
    pub fn take_pending(&mut self) -> Option<PendingWrite> {
        self.pending.take()
    }

    /// Drop the pending write without running it.
    pub fn cancel(&mut self) -> Option<PendingWrite> {
        let cancelled = self.pending.take();
        if let Some(pending) = &cancelled {
            log::debug!("Cancelled layout write {:?} for {}", pending.token, pending.project_id);
        }
        cancelled
    }

    /// Build a write of `layout_json` to the layout field of `project_id`.
    pub fn write(&self, project_id: &str, layout_json: String) -> LayoutWrite<B> {
        LayoutWrite {
            backend: Arc::clone(&self.backend),
            project_id: project_id.to_string(),
            patch: ProjectPatch::layout(layout_json),
        }
    }
}

/// A ready-to-run layout write.
pub struct LayoutWrite<B: ProjectBackend + ?Sized> {
    backend: Arc<B>,
    project_id: String,
    patch: ProjectPatch,
}

impl<B: ProjectBackend + ?Sized> LayoutWrite<B> {
    /// Target project.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Serialized layout document being written.
    pub fn layout_json(&self) -> &str {
        self.patch.layout_config.as_deref().unwrap_or_default()
    }

    /// Run the write. Failures are logged and returned; the in-memory
    /// layout is left as it is.
    pub async fn execute(self) -> StorageResult<()> {
        match self.backend.update_project(&self.project_id, &self.patch).await {
            Ok(_) => {
                log::info!("Saved layout for project {}", self.project_id);
                Ok(())
            }
            Err(e) => {
                log::warn!("Failed to save layout for project {}: {}", self.project_id, e);
                Err(e)
            }
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::storage::{MemoryBackend, Project, StorageError, block_on};

    fn persistence() -> LayoutPersistence<MemoryBackend> {
        let backend = Arc::new(MemoryBackend::with_projects([Project::new("p1", "Portfolio")]));
        LayoutPersistence::new(backend)
    }

    #[test]
    fn test_nothing_pending_initially() {
        let persistence = persistence();
        assert!(persistence.pending().is_none());
        assert!(!persistence.is_due(Instant::now()));
        assert_eq!(persistence.interval(), Duration::from_millis(DEFAULT_DEBOUNCE_MS));
    }

    #[test]
    fn test_schedule_waits_for_window() {
        let mut persistence = persistence();
        let start = Instant::now();
        persistence.schedule("p1", start);

        assert!(persistence.take_due(start + Duration::from_millis(999)).is_none());
        let due = persistence.take_due(start + Duration::from_millis(1000)).unwrap();
        assert_eq!(due.project_id, "p1");
        assert!(persistence.pending().is_none());
    }

    #[test]
    fn test_newer_schedule_supersedes() {
        let mut persistence = persistence();
        let start = Instant::now();
        let first = persistence.schedule("p1", start);
        let second = persistence.schedule("p1", start + Duration::from_millis(500));
        assert_ne!(first, second);

        // The first window has passed but the write was pushed back.
        assert!(persistence.take_due(start + Duration::from_millis(1200)).is_none());
        let due = persistence.take_due(start + Duration::from_millis(1500)).unwrap();
        assert_eq!(due.token, second);
    }

    #[test]
    fn test_cancel() {
        let mut persistence = persistence();
        let start = Instant::now();
        persistence.schedule("p1", start);
        assert!(persistence.cancel().is_some());
        assert!(persistence.take_due(start + Duration::from_secs(5)).is_none());
        assert!(persistence.cancel().is_none());
    }

    #[test]
    fn test_write_updates_layout_only() {
        let persistence = persistence();
        let write = persistence.write("p1", "{\"mobile\":{}}".to_string());
        assert_eq!(write.layout_json(), "{\"mobile\":{}}");

        block_on(write.execute()).unwrap();

        let project = block_on(persistence.backend().get_project("p1")).unwrap();
        assert_eq!(project.title, "Portfolio");
        assert_eq!(project.layout_config.as_deref(), Some("{\"mobile\":{}}"));
        assert_eq!(persistence.backend().update_count(), 1);
    }

    #[test]
    fn test_failed_write_is_returned() {
        let persistence = persistence();
        let result = block_on(persistence.write("missing", "{}".to_string()).execute());
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
