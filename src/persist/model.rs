use super::{FieldDescriptor, IDENTIFIER_FIELD, ModelDescriptor, Snapshot};
use crate::core::{DbError, Result, Row, TableSchema, Value};

/// Contract implemented by every concrete record type.
///
/// Usually generated by `tracked_model!`; hand-written impls must keep
/// `read_field`/`write_field` consistent with `descriptor()`.
pub trait Model: Clone + Send + Sync + 'static {
    /// Stable type name, also used as the reference target of foreign keys.
    const TYPE_NAME: &'static str;

    /// Static field registration for the type.
    fn descriptor() -> &'static ModelDescriptor;

    /// Store-assigned identifier; `None` until first persisted.
    fn id(&self) -> Option<i64>;

    /// Store-owned; records change their identifier through `save`/`delete`.
    fn set_id(&mut self, id: Option<i64>);

    /// Reads the tracked value of a field (the scalar key for references).
    fn read_field(&self, field: &FieldDescriptor) -> Result<Value>;

    fn write_field(&mut self, field: &FieldDescriptor, value: Value) -> Result<()>;

    /// Encodes every available field for exported state, keyed by field name.
    fn to_fields(&self) -> Result<serde_json::Map<String, serde_json::Value>>;

    fn from_fields(
        id: Option<i64>,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self>;

    fn from_row(row: &Row) -> Result<Self>;

    /// Full-object validation; skipped by bulk updates unless configured.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Best-effort attribute lookup for diagnostics.
    ///
    /// Accepts logical field names and storage columns.
    fn attribute(&self, name: &str) -> Option<Value> {
        let field = Self::descriptor().field(name)?;
        self.read_field(field).ok()
    }

    /// Resolves a field name or fails with `UnknownField`.
    fn resolve_field(name: &str) -> Result<&'static FieldDescriptor> {
        Self::descriptor()
            .field(name)
            .ok_or_else(|| DbError::UnknownField(name.to_string(), Self::TYPE_NAME.to_string()))
    }
}

/// Reads the identifier back out of a stored row.
pub fn row_identifier(row: &Row) -> Option<i64> {
    row.get(IDENTIFIER_FIELD).and_then(Value::as_i64)
}

/// A record whose snapshot can be refreshed from its current state.
pub trait SnapshotTarget {
    fn refresh_snapshot(&mut self);

    fn snapshot(&self) -> &Snapshot;
}

/// Anything the session can write to a `RowStore`.
pub trait Persistable: Send {
    fn type_name(&self) -> &str;

    fn table_schema(&self) -> &TableSchema;

    fn record_id(&self) -> Option<i64>;

    fn assign_id(&mut self, id: Option<i64>);

    /// Columns to write, excluding the primary key.
    fn to_row(&self) -> Result<Row>;

    /// Returns the change-tracking view of the record, if it has one.
    fn as_tracked_mut(&mut self) -> Option<&mut dyn SnapshotTarget> {
        None
    }
}

/// Untracked row written straight through the session.
///
/// Used for bookkeeping rows that have no model type; post-save hooks see it
/// but there is no snapshot to refresh.
#[derive(Debug, Clone)]
pub struct RawRecord {
    type_name: String,
    schema: TableSchema,
    id: Option<i64>,
    values: Row,
}

impl RawRecord {
    pub fn new(type_name: impl Into<String>, schema: TableSchema) -> Self {
        Self {
            type_name: type_name.into(),
            schema,
            id: None,
            values: Row::new(),
        }
    }

    pub fn with_value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Persistable for RawRecord {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn table_schema(&self) -> &TableSchema {
        &self.schema
    }

    fn record_id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: Option<i64>) {
        self.id = id;
    }

    fn to_row(&self) -> Result<Row> {
        Ok(self.values.clone())
    }
}
