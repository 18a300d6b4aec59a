use super::{HookRegistry, Model, Persistable, PersistConfig, SaveOutcome, SnapshotRefreshHook, Tracked};
use crate::core::{DbError, Result};
use crate::storage::{MemoryStore, RowStore};
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Entry point for writing records: a backing store, the post-save hooks
/// to run after each successful write, and the session configuration.
#[derive(Clone)]
pub struct PersistSession {
    store: Arc<dyn RowStore>,
    hooks: Arc<HookRegistry>,
    config: PersistConfig,
}

impl PersistSession {
    /// Creates a session over an owned store with its own hook registry.
    pub fn new(store: impl RowStore + 'static) -> Self {
        Self::from_shared(Arc::new(store))
    }

    /// Creates a session sharing an existing store.
    pub fn from_shared(store: Arc<dyn RowStore>) -> Self {
        Self {
            store,
            hooks: Arc::new(HookRegistry::with_snapshot_refresh()),
            config: PersistConfig::default(),
        }
    }

    /// Creates a session over a fresh in-memory store.
    pub fn memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Opens an in-memory session from a validated configuration.
    pub fn open(config: PersistConfig) -> Result<Self> {
        config.validate().map_err(DbError::ExecutionError)?;
        Ok(Self::memory().with_config(config))
    }

    pub fn with_config(mut self, config: PersistConfig) -> Self {
        self.config = config;
        self
    }

    /// Swaps in another hook registry, connecting the snapshot refresh hook
    /// to it if it is not there yet.
    pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Result<Self> {
        hooks.connect(Arc::new(SnapshotRefreshHook))?;
        self.hooks = hooks;
        Ok(self)
    }

    /// Uses the process-wide hook registry.
    pub fn with_global_hooks(self) -> Result<Self> {
        self.with_hooks(HookRegistry::global().clone())
    }

    pub fn store(&self) -> &Arc<dyn RowStore> {
        &self.store
    }

    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    pub fn config(&self) -> &PersistConfig {
        &self.config
    }

    /// Writes a record and, on success, runs the post-save hooks on it.
    ///
    /// A record without an identifier is inserted and receives one. A
    /// record with an identifier rewrites its row; if that row is gone it is
    /// inserted again under the same identifier. Nothing runs on failure.
    pub async fn save_record(&self, record: &mut dyn Persistable) -> Result<SaveOutcome> {
        let schema = record.table_schema().clone();
        let span = info_span!(
            "persist.save",
            database = %self.config.database,
            table = %schema.name(),
            type_name = %record.type_name()
        );

        let outcome = async {
            self.store.ensure_table(&schema).await?;
            let row = record.to_row()?;

            match record.record_id() {
                None => {
                    let id = self.store.insert(schema.name(), None, row).await?;
                    record.assign_id(Some(id));
                    Ok(SaveOutcome::Created)
                }
                Some(id) => match self.store.update(schema.name(), id, row.clone()).await? {
                    0 => {
                        self.store.insert(schema.name(), Some(id), row).await?;
                        Ok(SaveOutcome::Created)
                    }
                    1 => Ok(SaveOutcome::Updated),
                    affected => Err(integrity_anomaly(schema.name(), id, affected)),
                },
            }
        }
        .instrument(span)
        .await?;

        self.hooks.notify_saved(record, outcome);
        Ok(outcome)
    }

    /// Loads a record by identifier; the result starts with a fresh snapshot.
    pub async fn load<M: Model>(&self, id: i64) -> Result<Option<Tracked<M>>> {
        let descriptor = M::descriptor();
        self.store.ensure_table(descriptor.table_schema()).await?;
        match self.store.fetch(descriptor.table_name(), id).await? {
            Some(row) => Tracked::from_row(&row).map(Some),
            None => Ok(None),
        }
    }
}

/// Error for a write keyed by one identifier that touched several rows.
pub(crate) fn integrity_anomaly(table: &str, id: i64, affected: u64) -> DbError {
    event!(
        Level::ERROR,
        table = %table,
        id,
        affected,
        "write by identifier affected more than one row"
    );
    DbError::IntegrityAnomaly(format!(
        "write to '{}' for id {} affected {} rows",
        table, id, affected
    ))
}
