use crate::core::{DbError, Result, Row, TableSchema, Value};
use std::collections::BTreeMap;

/// Largest identifier the auto-increment sequence may hand out.
pub const MAX_ROW_ID: i64 = i64::MAX;

#[derive(Debug, Clone)]
pub struct Table {
    schema: TableSchema,
    rows: BTreeMap<i64, Row>,
    next_row_id: i64,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_row_id: 1,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the row with the primary key column filled in.
    pub fn get(&self, id: i64) -> Option<Row> {
        self.rows.get(&id).map(|row| {
            let mut row = row.clone();
            row.insert(self.schema.primary_key().to_string(), Value::Integer(id));
            row
        })
    }

    pub fn insert(&mut self, id: Option<i64>, row: Row) -> Result<i64> {
        let row = self.normalize_row(row)?;
        self.check_uniqueness(&row, None)?;

        let id = match id {
            Some(id) => {
                if id < 1 {
                    return Err(DbError::ConstraintViolation(format!(
                        "Identifier {} is out of range for table '{}'",
                        id,
                        self.schema.name()
                    )));
                }
                if self.rows.contains_key(&id) {
                    return Err(DbError::ConstraintViolation(format!(
                        "Duplicate key {} in table '{}'",
                        id,
                        self.schema.name()
                    )));
                }
                id
            }
            None => self.next_row_id,
        };

        if id == MAX_ROW_ID && self.rows.contains_key(&MAX_ROW_ID) {
            return Err(DbError::ConstraintViolation(format!(
                "Identifier sequence exhausted for table '{}'",
                self.schema.name()
            )));
        }

        self.rows.insert(id, row);
        self.next_row_id = self.next_row_id.max(id.saturating_add(1));
        Ok(id)
    }

    /// Applies a partial row to the record with `id`; returns affected rows.
    pub fn update(&mut self, id: i64, values: Row) -> Result<u64> {
        let Some(existing) = self.rows.get(&id) else {
            return Ok(0);
        };

        for (name, value) in &values {
            self.column_for(name)?.validate(value)?;
        }

        let mut merged = existing.clone();
        merged.extend(values);
        self.check_uniqueness(&merged, Some(id))?;
        self.rows.insert(id, merged);
        Ok(1)
    }

    pub fn delete(&mut self, id: i64) -> u64 {
        u64::from(self.rows.remove(&id).is_some())
    }

    fn column_for(&self, name: &str) -> Result<&crate::core::Column> {
        self.schema
            .get_column(name)
            .ok_or_else(|| DbError::ColumnNotFound(name.to_string(), self.schema.name().to_string()))
    }

    fn normalize_row(&self, mut row: Row) -> Result<Row> {
        if let Some(name) = row.keys().find(|name| self.schema.get_column(name).is_none()) {
            return Err(DbError::ColumnNotFound(
                name.clone(),
                self.schema.name().to_string(),
            ));
        }

        for column in self.schema.columns() {
            let value = row.entry(column.name.clone()).or_insert(Value::Null);
            column.validate(value)?;
        }
        Ok(row)
    }

    fn check_uniqueness(&self, row: &Row, ignore_id: Option<i64>) -> Result<()> {
        for column in self.schema.columns().iter().filter(|col| col.unique) {
            let Some(value) = row.get(&column.name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            let clash = self
                .rows
                .iter()
                .filter(|(id, _)| Some(**id) != ignore_id)
                .any(|(_, other)| other.get(&column.name) == Some(value));
            if clash {
                return Err(DbError::ConstraintViolation(format!(
                    "Unique constraint violation: Column '{}' already contains value {}",
                    column.name, value
                )));
            }
        }
        Ok(())
    }
}
