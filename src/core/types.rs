use super::{DataType, DbError, Result, Value};
use std::collections::BTreeMap;

/// A stored row keyed by storage column name.
pub type Row = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub unique: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            unique: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if matches!(value, Value::Null) {
            if !self.nullable {
                return Err(DbError::ConstraintViolation(format!(
                    "Column '{}' cannot be NULL",
                    self.name
                )));
            }
            return Ok(());
        }

        if !self.data_type.is_compatible(value) {
            return Err(DbError::TypeMismatch(format!(
                "Column '{}' expects type {}, got {}",
                self.name,
                self.data_type,
                value.type_name()
            )));
        }

        Ok(())
    }
}

/// Table layout derived from a model descriptor.
///
/// The primary key column is kept apart from `columns`: it is owned by the
/// store and never part of a written row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    primary_key: String,
    columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_validation() {
        let col = Column::new("key", DataType::Text).not_null();
        assert!(col.validate(&Value::Text("a".into())).is_ok());
        assert!(matches!(
            col.validate(&Value::Null),
            Err(DbError::ConstraintViolation(_))
        ));
        assert!(matches!(
            col.validate(&Value::Integer(1)),
            Err(DbError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_schema_lookup() {
        let schema = TableSchema::new(
            "sentry_option",
            "id",
            vec![Column::new("key", DataType::Text).unique()],
        );
        assert_eq!(schema.primary_key(), "id");
        assert!(schema.get_column("key").unwrap().unique);
        assert!(schema.get_column("id").is_none());
        assert_eq!(schema.column_count(), 1);
    }
}
