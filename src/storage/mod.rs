//! Backing-store contract consumed by persisted records.

use crate::core::{Result, Row, TableSchema};
use async_trait::async_trait;

pub mod memory;
pub mod table;

pub use memory::MemoryStore;
pub use table::Table;

/// Row storage addressed by table name and integer identifier.
///
/// Implementations own identifier assignment. Every write reports how many
/// rows it touched so callers can tell a missing row from an anomaly.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Creates the table if it does not exist yet.
    async fn ensure_table(&self, schema: &TableSchema) -> Result<()>;

    /// Looks up one row, including its primary key column.
    async fn fetch(&self, table: &str, id: i64) -> Result<Option<Row>>;

    /// Inserts a row and returns its identifier.
    ///
    /// With `id == None` the store assigns the next identifier.
    async fn insert(&self, table: &str, id: Option<i64>, row: Row) -> Result<i64>;

    /// Writes `values` onto the row with `id` only; returns affected rows.
    async fn update(&self, table: &str, id: i64, values: Row) -> Result<u64>;

    /// Removes the row with `id`; returns affected rows.
    async fn delete(&self, table: &str, id: i64) -> Result<u64>;
}
