use super::{Model, Tracked};
use crate::core::{DbError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Transferable state of a record.
///
/// Holds the identifier and field values only; the snapshot never leaves
/// the process and is re-derived when the state is imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordState {
    pub type_name: String,
    pub table_name: String,
    pub id: Option<i64>,
    pub fields: serde_json::Value,
}

impl RecordState {
    /// Returns the fields as a JSON object, or an error if they are not an object.
    pub fn fields_object(&self) -> Result<&serde_json::Map<String, serde_json::Value>> {
        self.fields.as_object().ok_or_else(|| {
            DbError::SerializationError("Record state fields must be a JSON object".to_string())
        })
    }

    /// Encodes the state as MessagePack.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|err| {
            DbError::SerializationError(format!("Failed to encode record state: {}", err))
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes).map_err(|err| {
            DbError::SerializationError(format!("Failed to decode record state: {}", err))
        })
    }
}

impl<M: Model> Tracked<M> {
    /// Exports identifier and fields, leaving the snapshot behind.
    pub fn export_state(&self) -> Result<RecordState> {
        let descriptor = M::descriptor();
        Ok(RecordState {
            type_name: M::TYPE_NAME.to_string(),
            table_name: descriptor.table_name().to_string(),
            id: self.record().id(),
            fields: serde_json::Value::Object(self.record().to_fields()?),
        })
    }

    /// Restores the attributes first, then captures a fresh snapshot from them.
    pub fn import_state(state: RecordState) -> Result<Self> {
        if state.type_name != M::TYPE_NAME {
            return Err(DbError::SerializationError(format!(
                "Record state of type '{}' cannot be restored as '{}'",
                state.type_name,
                M::TYPE_NAME
            )));
        }
        let record = M::from_fields(state.id, state.fields_object()?)?;
        Ok(Self::new(record))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.export_state()?)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::import_state(serde_json::from_str(json)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.export_state()?.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::import_state(RecordState::from_bytes(bytes)?)
    }
}

impl<M: Model> Serialize for Tracked<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.export_state()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de, M: Model> Deserialize<'de> for Tracked<M> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let state = RecordState::deserialize(deserializer)?;
        Self::import_state(state).map_err(serde::de::Error::custom)
    }
}
