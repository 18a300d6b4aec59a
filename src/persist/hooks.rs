use super::Persistable;
use crate::core::Result;
use lazy_static::lazy_static;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{Level, event};

lazy_static! {
    static ref GLOBAL_HOOKS: Arc<HookRegistry> = Arc::new(HookRegistry::with_snapshot_refresh());
}

/// Whether a successful save inserted a new row or rewrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

/// Observer invoked synchronously after a record is written successfully.
pub trait PostSaveHook: Send + Sync {
    /// Registration key; connecting a second hook with the same key is a no-op.
    fn hook_id(&self) -> &str;

    fn post_save(&self, record: &mut dyn Persistable, outcome: SaveOutcome);
}

/// Re-captures the snapshot of tracked records after every save.
pub struct SnapshotRefreshHook;

impl SnapshotRefreshHook {
    pub const HOOK_ID: &'static str = "tracked_model.snapshot_refresh";
}

impl PostSaveHook for SnapshotRefreshHook {
    fn hook_id(&self) -> &str {
        Self::HOOK_ID
    }

    fn post_save(&self, record: &mut dyn Persistable, _outcome: SaveOutcome) {
        match record.as_tracked_mut() {
            Some(tracked) => tracked.refresh_snapshot(),
            None => event!(
                Level::TRACE,
                type_name = record.type_name(),
                "record is not change-tracked; snapshot refresh skipped"
            ),
        }
    }
}

/// Ordered set of post-save hooks.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<Vec<Arc<dyn PostSaveHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the snapshot refresh hook already connected.
    pub fn with_snapshot_refresh() -> Self {
        Self {
            hooks: RwLock::new(vec![Arc::new(SnapshotRefreshHook)]),
        }
    }

    /// Process-wide registry shared by sessions that opt into it.
    pub fn global() -> &'static Arc<HookRegistry> {
        &GLOBAL_HOOKS
    }

    /// Connects a hook; returns `false` if its key was already registered.
    pub fn connect(&self, hook: Arc<dyn PostSaveHook>) -> Result<bool> {
        let mut hooks = self.hooks.write()?;
        if hooks.iter().any(|existing| existing.hook_id() == hook.hook_id()) {
            return Ok(false);
        }
        hooks.push(hook);
        Ok(true)
    }

    /// Removes the hook registered under `hook_id`; returns whether one existed.
    pub fn disconnect(&self, hook_id: &str) -> Result<bool> {
        let mut hooks = self.hooks.write()?;
        let before = hooks.len();
        hooks.retain(|hook| hook.hook_id() != hook_id);
        Ok(hooks.len() != before)
    }

    pub fn is_connected(&self, hook_id: &str) -> bool {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|hook| hook.hook_id() == hook_id)
    }

    pub fn len(&self) -> usize {
        self.hooks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every hook, in registration order, against the saved record.
    ///
    /// The hook list is copied first so a hook may connect or disconnect
    /// others without deadlocking.
    pub fn notify_saved(&self, record: &mut dyn Persistable, outcome: SaveOutcome) {
        let hooks: Vec<Arc<dyn PostSaveHook>> = self
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for hook in hooks {
            event!(
                Level::DEBUG,
                hook = hook.hook_id(),
                type_name = record.type_name(),
                outcome = ?outcome,
                "post-save hook"
            );
            hook.post_save(record, outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, TableSchema};
    use crate::persist::RawRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        id: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl PostSaveHook for Counting {
        fn hook_id(&self) -> &str {
            self.id
        }

        fn post_save(&self, _record: &mut dyn Persistable, _outcome: SaveOutcome) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn raw() -> RawRecord {
        RawRecord::new(
            "AuditRow",
            TableSchema::new("audit", "id", vec![Column::new("event", DataType::Text)]),
        )
    }

    #[test]
    fn test_connect_is_idempotent_per_key() {
        let registry = HookRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let hook = Arc::new(Counting {
            id: "count",
            calls: calls.clone(),
        });

        assert!(registry.connect(hook.clone()).unwrap());
        assert!(!registry.connect(hook).unwrap());
        assert_eq!(registry.len(), 1);

        registry.notify_saved(&mut raw(), SaveOutcome::Created);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disconnect() {
        let registry = HookRegistry::with_snapshot_refresh();
        assert!(registry.is_connected(SnapshotRefreshHook::HOOK_ID));
        assert!(registry.disconnect(SnapshotRefreshHook::HOOK_ID).unwrap());
        assert!(!registry.disconnect(SnapshotRefreshHook::HOOK_ID).unwrap());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_refresh_hook_ignores_untracked_records() {
        let registry = HookRegistry::with_snapshot_refresh();
        let mut record = raw().with_value("event", "login");
        registry.notify_saved(&mut record, SaveOutcome::Updated);
        assert_eq!(record.get("event").and_then(|v| v.as_str()), Some("login"));
    }

    #[test]
    fn test_global_registry_has_refresh_hook() {
        assert!(HookRegistry::global().is_connected(SnapshotRefreshHook::HOOK_ID));
    }
}
