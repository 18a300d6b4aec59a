use super::session::integrity_anomaly;
use super::{
    FieldDescriptor, Model, PersistSession, Persistable, SaveOutcome, Snapshot, SnapshotTarget,
    repr,
};
use crate::core::{DbError, Result, Row, TableSchema, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use tracing::{Instrument, info_span};

/// Field assignments for [`Tracked::update`], keyed by field name or column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdates {
    values: Vec<(String, Value)>,
}

impl FieldUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((field.into(), value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FieldUpdates {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        }
    }
}

/// A model paired with the snapshot of its last persisted state.
///
/// Every way of obtaining a `Tracked` (construction, loading from a store,
/// importing exported state, cloning) captures a snapshot before returning.
/// Cloning therefore gives the copy its own baseline taken from the current
/// values, not the original's snapshot.
pub struct Tracked<M: Model> {
    record: M,
    snapshot: Snapshot,
}

impl<M: Model> Tracked<M> {
    pub fn new(record: M) -> Self {
        let snapshot = Snapshot::capture(&record);
        Self { record, snapshot }
    }

    /// Reconstructs a record from a stored row.
    pub fn from_row(row: &Row) -> Result<Self> {
        M::from_row(row).map(Self::new)
    }

    pub fn record(&self) -> &M {
        &self.record
    }

    pub fn into_inner(self) -> M {
        self.record
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Replaces the snapshot with the record's current values.
    pub fn capture(&mut self) {
        self.snapshot = Snapshot::capture(&self.record);
    }

    /// Whether `field` differs from its value at the last capture.
    ///
    /// Always `false` for a record that was never persisted.
    pub fn has_changed(&self, field: &str) -> Result<bool> {
        let field = M::resolve_field(field)?;
        if self.snapshot.is_unsaved() {
            return Ok(false);
        }
        let current = self.record.read_field(field).ok();
        Ok(self.snapshot.get(&field.column) != current.as_ref())
    }

    /// Value of `field` at the last capture.
    ///
    /// `None` for a never-persisted record, or when the field could not be
    /// read during that capture.
    pub fn old_value(&self, field: &str) -> Result<Option<Value>> {
        let field = M::resolve_field(field)?;
        Ok(self.snapshot.get(&field.column).cloned())
    }

    /// Logical names of all fields that differ from the snapshot.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        M::descriptor()
            .fields()
            .iter()
            .filter(|field| self.has_changed(field.name).unwrap_or(false))
            .map(|field| field.name)
            .collect()
    }

    /// Persists the record; the snapshot advances only if the write succeeds.
    pub async fn save(&mut self, session: &PersistSession) -> Result<SaveOutcome> {
        session.save_record(self).await
    }

    /// Writes `updates` to exactly the row with this record's identifier.
    ///
    /// Full-object validation is skipped unless the session enables
    /// `validate_updates`. After the write the values are applied in memory.
    /// One affected row advances the snapshot; zero leaves it untouched and
    /// returns `0`; more than one is an `IntegrityAnomaly`.
    pub async fn update(&mut self, session: &PersistSession, updates: FieldUpdates) -> Result<u64> {
        let descriptor = M::descriptor();
        let id = self
            .record
            .id()
            .ok_or_else(|| DbError::NotPersisted(M::TYPE_NAME.to_string()))?;

        let mut resolved: Vec<(&'static FieldDescriptor, Value)> =
            Vec::with_capacity(updates.len());
        for (name, value) in updates.values {
            let field = M::resolve_field(&name)?;
            if field.is_identifier() {
                return Err(DbError::ValidationError(format!(
                    "identifier of '{}' cannot be bulk-updated",
                    M::TYPE_NAME
                )));
            }
            resolved.push((field, value));
        }

        let mut staged = self.record.clone();
        let mut row = Row::new();
        for (field, value) in resolved {
            staged.write_field(field, value)?;
            row.insert(field.column.clone(), staged.read_field(field)?);
        }
        if session.config().validate_updates {
            staged.validate()?;
        }

        let table = descriptor.table_name();
        let span = info_span!("persist.update", table = %table, id, columns = row.len());
        let affected = async {
            session.store().ensure_table(descriptor.table_schema()).await?;
            session.store().update(table, id, row).await
        }
        .instrument(span)
        .await?;

        self.record = staged;
        match affected {
            0 => Ok(0),
            1 => {
                session.hooks().notify_saved(self, SaveOutcome::Updated);
                Ok(1)
            }
            affected => Err(integrity_anomaly(table, id, affected)),
        }
    }

    /// Deletes the stored row and returns the record to the unsaved state.
    pub async fn delete(&mut self, session: &PersistSession) -> Result<u64> {
        let Some(id) = self.record.id() else {
            return Ok(0);
        };
        let table = M::descriptor().table_name();
        let affected = session.store().delete(table, id).await?;
        if affected > 1 {
            return Err(integrity_anomaly(table, id, affected));
        }
        self.record.set_id(None);
        self.snapshot = Snapshot::Unsaved;
        Ok(affected)
    }

    /// `<Type at 0x…: id=…, …>` rendering of the diagnostic attributes.
    pub fn sane_repr(&self) -> String {
        repr::sane_repr(
            M::TYPE_NAME,
            &self.record as *const M as usize,
            M::descriptor().repr_attrs(),
            |name| self.record.attribute(name),
        )
    }

    /// `"<type>.<attr>" -> value` map of the audit attributes.
    pub fn sane_dict(&self) -> BTreeMap<String, String> {
        repr::sane_dict(M::TYPE_NAME, M::descriptor().dict_attrs(), |name| {
            self.record.attribute(name)
        })
    }
}

impl<M: Model> Deref for Tracked<M> {
    type Target = M;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

impl<M: Model> DerefMut for Tracked<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.record
    }
}

impl<M: Model> Clone for Tracked<M> {
    fn clone(&self) -> Self {
        Self::new(self.record.clone())
    }
}

impl<M: Model> From<M> for Tracked<M> {
    fn from(record: M) -> Self {
        Self::new(record)
    }
}

impl<M: Model> fmt::Debug for Tracked<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sane_repr())
    }
}

impl<M: Model> SnapshotTarget for Tracked<M> {
    fn refresh_snapshot(&mut self) {
        self.capture();
    }

    fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl<M: Model> Persistable for Tracked<M> {
    fn type_name(&self) -> &str {
        M::TYPE_NAME
    }

    fn table_schema(&self) -> &TableSchema {
        M::descriptor().table_schema()
    }

    fn record_id(&self) -> Option<i64> {
        self.record.id()
    }

    fn assign_id(&mut self, id: Option<i64>) {
        self.record.set_id(id);
    }

    /// Unloaded fields are left out so the stored value is kept.
    fn to_row(&self) -> Result<Row> {
        let mut row = Row::new();
        for field in M::descriptor().fields().iter().filter(|f| !f.is_identifier()) {
            match self.record.read_field(field) {
                Ok(value) => {
                    row.insert(field.column.clone(), value);
                }
                Err(DbError::FieldUnavailable(_)) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(row)
    }

    fn as_tracked_mut(&mut self) -> Option<&mut dyn SnapshotTarget> {
        Some(self)
    }
}
