use super::Model;
use crate::core::{PartialCaptureWarning, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Last-known persisted column values of a record.
///
/// `Unsaved` is held exactly while the record has no identifier. A snapshot
/// is never edited field by field; each capture replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Snapshot {
    #[default]
    Unsaved,
    Captured(BTreeMap<String, Value>),
}

impl Snapshot {
    /// Derives a snapshot from the record's current field values.
    ///
    /// Fields that cannot be read are logged and left out.
    pub fn capture<M: Model>(record: &M) -> Self {
        if record.id().is_none() {
            return Self::Unsaved;
        }

        let descriptor = M::descriptor();
        let mut values = BTreeMap::new();
        for field in descriptor.fields() {
            match record.read_field(field) {
                Ok(value) => {
                    values.insert(field.column.clone(), value);
                }
                Err(err) => {
                    let warning = PartialCaptureWarning {
                        model: descriptor.type_name().to_string(),
                        field: field.name.to_string(),
                        reason: err.to_string(),
                    };
                    warn!(
                        model = %warning.model,
                        field = %warning.field,
                        "{}",
                        warning
                    );
                }
            }
        }
        Self::Captured(values)
    }

    pub fn is_unsaved(&self) -> bool {
        matches!(self, Self::Unsaved)
    }

    /// Stored value for a storage column; `None` when unsaved or skipped.
    pub fn get(&self, column: &str) -> Option<&Value> {
        match self {
            Self::Unsaved => None,
            Self::Captured(values) => values.get(column),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        let values = match self {
            Self::Unsaved => None,
            Self::Captured(values) => Some(values),
        };
        values.into_iter().flat_map(|values| values.keys().map(String::as_str))
    }
}
