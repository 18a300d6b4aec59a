// ============================================================================
// tracked_model Library
// ============================================================================

pub mod core;
pub mod persist;
pub mod storage;

// Re-exported for `tracked_model!` expansions
pub use lazy_static;
pub use paste;
pub use serde_json;

// Re-export main types for convenience
pub use crate::core::{DataType, DbError, PartialCaptureWarning, Result, Row, Value};
pub use crate::persist::{
    ColumnValue, Deferred, FieldUpdates, ForeignKey, HookRegistry, Model, PersistConfig,
    PersistSession, PostSaveHook, RecordState, SaveOutcome, StoredJson, Tracked,
};
pub use crate::storage::{MemoryStore, RowStore};

/// Commonly used items for declaring and persisting tracked models.
pub mod prelude {
    pub use crate::core::{DbError, Result, Value};
    pub use crate::persist::{
        Deferred, FieldUpdates, ForeignKey, HookRegistry, Model, PersistConfig, PersistSession,
        SaveOutcome, StoredJson, Tracked,
    };
    pub use crate::tracked_model;
}
