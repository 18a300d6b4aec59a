use super::{RowStore, Table};
use crate::core::{DbError, Result, Row, TableSchema};
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process row store.
///
/// Each table sits behind its own lock; the table map lock is only held
/// while resolving or creating a table handle.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Arc<RwLock<Table>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the named table.
    pub async fn get_table(&self, name: &str) -> Result<Arc<RwLock<Table>>> {
        self.tables
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub async fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn row_count(&self, table: &str) -> Result<usize> {
        let handle = self.get_table(table).await?;
        let table = handle.read().await;
        Ok(table.len())
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn ensure_table(&self, schema: &TableSchema) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.get(schema.name()) {
            let existing = existing.read().await;
            if existing.schema() != schema {
                return Err(DbError::ExecutionError(format!(
                    "Table '{}' already exists with a different layout",
                    schema.name()
                )));
            }
            return Ok(());
        }

        debug!("creating table '{}'", schema.name());
        tables.insert(
            schema.name().to_string(),
            Arc::new(RwLock::new(Table::new(schema.clone()))),
        );
        Ok(())
    }

    async fn fetch(&self, table: &str, id: i64) -> Result<Option<Row>> {
        let handle = self.get_table(table).await?;
        let table = handle.read().await;
        Ok(table.get(id))
    }

    async fn insert(&self, table: &str, id: Option<i64>, row: Row) -> Result<i64> {
        let handle = self.get_table(table).await?;
        let mut guard = handle.write().await;
        guard.insert(id, row).inspect_err(|err| {
            warn!("insert into '{}' rejected: {}", table, err);
        })
    }

    async fn update(&self, table: &str, id: i64, values: Row) -> Result<u64> {
        let handle = self.get_table(table).await?;
        let mut guard = handle.write().await;
        guard.update(id, values).inspect_err(|err| {
            warn!("update of '{}' id={} rejected: {}", table, id, err);
        })
    }

    async fn delete(&self, table: &str, id: i64) -> Result<u64> {
        let handle = self.get_table(table).await?;
        let mut guard = handle.write().await;
        Ok(guard.delete(id))
    }
}
