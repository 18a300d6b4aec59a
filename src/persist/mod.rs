//! Change-tracked records on top of a [`RowStore`](crate::storage::RowStore).
//!
//! A [`Tracked`] record keeps a [`Snapshot`] of its last persisted column
//! values. The snapshot is captured on construction, on load and on import,
//! and refreshed after every successful save by the [`SnapshotRefreshHook`]
//! connected to the session's [`HookRegistry`].

pub mod config;
pub mod descriptors;
pub mod hooks;
pub mod model;
pub mod repr;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod tracked;
pub mod values;
mod macros;

pub use config::PersistConfig;
pub use descriptors::{
    FieldDescriptor, FieldKind, IDENTIFIER_ALIAS, IDENTIFIER_FIELD, ModelDescriptor,
};
pub use hooks::{HookRegistry, PostSaveHook, SaveOutcome, SnapshotRefreshHook};
pub use model::{Model, Persistable, RawRecord, SnapshotTarget, row_identifier};
pub use session::PersistSession;
pub use snapshot::Snapshot;
pub use state::RecordState;
pub use tracked::{FieldUpdates, Tracked};
pub use values::{ColumnValue, Deferred, ForeignKey, StoredJson, field_descriptor};
