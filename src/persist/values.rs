use super::{FieldDescriptor, Model};
use crate::core::{DataType, DbError, Result, Value};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Trait for values that can back a model column.
pub trait ColumnValue:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn data_type() -> DataType;

    fn nullable() -> bool {
        false
    }

    /// Type name of the referenced model when the column is a foreign key.
    fn reference_target() -> Option<&'static str> {
        None
    }

    /// Returns the tracked (stored) representation of the value.
    fn to_value(&self) -> Result<Value>;

    fn from_value(value: Value) -> Result<Self>;

    /// Encodes the value for exported record state; `None` omits the field.
    fn to_json(&self) -> Result<Option<serde_json::Value>> {
        Ok(Some(serde_json::to_value(self)?))
    }

    /// Decodes the value from exported record state; `json` is `None` when
    /// the payload has no entry for the field.
    fn from_json(json: Option<&serde_json::Value>, field: &str) -> Result<Self> {
        let json = json.ok_or_else(|| {
            DbError::SerializationError(format!("Field '{}' missing in record state", field))
        })?;
        serde_json::from_value(json.clone()).map_err(|err| {
            DbError::SerializationError(format!("deserialize field '{}': {}", field, err))
        })
    }
}

/// Builds the static descriptor for a field backed by `T`.
pub fn field_descriptor<T: ColumnValue>(name: &'static str) -> FieldDescriptor {
    let descriptor = match T::reference_target() {
        Some(target) => FieldDescriptor::reference(name, target),
        None => FieldDescriptor::column(name, T::data_type()),
    };
    descriptor.nullable(T::nullable())
}

const NAN_LABEL: &str = "NaN";
const INFINITY_LABEL: &str = "Infinity";
const NEG_INFINITY_LABEL: &str = "-Infinity";

fn mismatch<T>(expected: &str, value: &Value) -> Result<T> {
    Err(DbError::TypeMismatch(format!(
        "expected {}, got {}",
        expected,
        value.type_name()
    )))
}

impl ColumnValue for i64 {
    fn data_type() -> DataType {
        DataType::Integer
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Integer(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            other => mismatch("INTEGER", &other),
        }
    }
}

impl ColumnValue for i32 {
    fn data_type() -> DataType {
        DataType::Integer
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Integer(i64::from(*self)))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => i32::try_from(i).map_err(|_| {
                DbError::TypeMismatch(format!("integer {} out of range for i32", i))
            }),
            other => mismatch("INTEGER", &other),
        }
    }
}

impl ColumnValue for f64 {
    fn data_type() -> DataType {
        DataType::Float
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Float(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value.as_f64() {
            Some(f) => Ok(f),
            None => mismatch("FLOAT", &value),
        }
    }

    /// JSON has no non-finite numbers; those travel as `"NaN"`, `"Infinity"`
    /// and `"-Infinity"`.
    fn to_json(&self) -> Result<Option<serde_json::Value>> {
        let json = if self.is_nan() {
            serde_json::Value::from(NAN_LABEL)
        } else if self.is_infinite() {
            serde_json::Value::from(if *self > 0.0 { INFINITY_LABEL } else { NEG_INFINITY_LABEL })
        } else {
            serde_json::Value::from(*self)
        };
        Ok(Some(json))
    }

    fn from_json(json: Option<&serde_json::Value>, field: &str) -> Result<Self> {
        match json {
            Some(serde_json::Value::String(label)) => match label.as_str() {
                NAN_LABEL => Ok(f64::NAN),
                INFINITY_LABEL => Ok(f64::INFINITY),
                NEG_INFINITY_LABEL => Ok(f64::NEG_INFINITY),
                other => Err(DbError::SerializationError(format!(
                    "deserialize field '{}': '{}' is not a float",
                    field, other
                ))),
            },
            Some(serde_json::Value::Number(number)) => number.as_f64().ok_or_else(|| {
                DbError::SerializationError(format!(
                    "deserialize field '{}': {} is out of range for f64",
                    field, number
                ))
            }),
            Some(other) => Err(DbError::SerializationError(format!(
                "deserialize field '{}': expected a float, got {}",
                field, other
            ))),
            None => Err(DbError::SerializationError(format!(
                "Field '{}' missing in record state",
                field
            ))),
        }
    }
}

impl ColumnValue for bool {
    fn data_type() -> DataType {
        DataType::Boolean
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Boolean(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => mismatch("BOOLEAN", &other),
        }
    }
}

impl ColumnValue for String {
    fn data_type() -> DataType {
        DataType::Text
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Text(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => mismatch("TEXT", &other),
        }
    }
}

impl ColumnValue for DateTime<Utc> {
    fn data_type() -> DataType {
        DataType::Timestamp
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Timestamp(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            Value::Text(s) => DateTime::parse_from_rfc3339(&s)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|err| DbError::TypeMismatch(format!("invalid timestamp '{}': {}", s, err))),
            other => mismatch("TIMESTAMP", &other),
        }
    }
}

impl<T: ColumnValue> ColumnValue for Option<T> {
    fn data_type() -> DataType {
        T::data_type()
    }

    fn nullable() -> bool {
        true
    }

    fn reference_target() -> Option<&'static str> {
        T::reference_target()
    }

    fn to_value(&self) -> Result<Value> {
        match self {
            Some(value) => value.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn to_json(&self) -> Result<Option<serde_json::Value>> {
        match self {
            Some(value) => value.to_json(),
            None => Ok(Some(serde_json::Value::Null)),
        }
    }

    fn from_json(json: Option<&serde_json::Value>, field: &str) -> Result<Self> {
        match json {
            Some(serde_json::Value::Null) => Ok(None),
            json => T::from_json(json, field).map(Some),
        }
    }
}

/// JSON-backed column for nested or free-form values.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct StoredJson<T>(pub T);

impl<T> StoredJson<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for StoredJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::ops::DerefMut for StoredJson<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> ColumnValue for StoredJson<T>
where
    T: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn data_type() -> DataType {
        DataType::Json
    }

    fn to_value(&self) -> Result<Value> {
        serde_json::to_value(&self.0)
            .map(Value::Json)
            .map_err(|err| DbError::FieldUnavailable(format!("JSON encoding failed: {}", err)))
    }

    fn from_value(value: Value) -> Result<Self> {
        let json = match value {
            Value::Json(json) => json,
            Value::Text(text) => serde_json::from_str(&text)?,
            Value::Null => serde_json::Value::Null,
            other => return mismatch("JSON", &other),
        };
        Ok(Self(serde_json::from_value(json)?))
    }
}

/// Reference to another model, tracked by its scalar key.
///
/// The related record may be cached alongside the key, but equality, storage
/// and change tracking only ever look at the key.
pub struct ForeignKey<T> {
    key: Option<i64>,
    related: Option<Arc<T>>,
}

impl<T> ForeignKey<T> {
    pub fn new(key: i64) -> Self {
        Self {
            key: Some(key),
            related: None,
        }
    }

    pub fn unset() -> Self {
        Self {
            key: None,
            related: None,
        }
    }

    pub fn key(&self) -> Option<i64> {
        self.key
    }

    /// Returns the cached related record, if one was attached.
    pub fn related(&self) -> Option<&T> {
        self.related.as_deref()
    }

    /// Points at another key and drops any cached related record.
    pub fn set_key(&mut self, key: Option<i64>) {
        self.key = key;
        self.related = None;
    }
}

impl<T: Model> ForeignKey<T> {
    /// Builds a reference to `related`, caching a copy of it.
    pub fn to(related: &T) -> Self {
        Self {
            key: related.id(),
            related: Some(Arc::new(related.clone())),
        }
    }

    pub fn set_related(&mut self, related: &T) {
        *self = Self::to(related);
    }
}

impl<T> Clone for ForeignKey<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            related: self.related.clone(),
        }
    }
}

impl<T> Default for ForeignKey<T> {
    fn default() -> Self {
        Self::unset()
    }
}

impl<T> PartialEq for ForeignKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> fmt::Debug for ForeignKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignKey")
            .field("key", &self.key)
            .field("cached", &self.related.is_some())
            .finish()
    }
}

impl<T> Serialize for ForeignKey<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.key.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for ForeignKey<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let key = Option::<i64>::deserialize(deserializer)?;
        Ok(Self { key, related: None })
    }
}

impl<T: Model> ColumnValue for ForeignKey<T> {
    fn data_type() -> DataType {
        DataType::Integer
    }

    fn reference_target() -> Option<&'static str> {
        Some(T::TYPE_NAME)
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::from(self.key))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::unset()),
            Value::Integer(key) => Ok(Self::new(key)),
            other => mismatch("INTEGER reference key", &other),
        }
    }
}

/// Column whose value may not have been loaded.
///
/// Restoring a payload that lacks the field leaves it `NotLoaded`; reading
/// it for a snapshot then fails and the field is skipped.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Deferred<T> {
    #[default]
    NotLoaded,
    Loaded(T),
}

impl<T> Deferred<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::NotLoaded => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

impl<T: Serialize> Serialize for Deferred<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Loaded(value) => value.serialize(serializer),
            Self::NotLoaded => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Deferred<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        T::deserialize(deserializer).map(Self::Loaded)
    }
}

impl<T: ColumnValue> ColumnValue for Deferred<T> {
    fn data_type() -> DataType {
        T::data_type()
    }

    fn nullable() -> bool {
        T::nullable()
    }

    fn reference_target() -> Option<&'static str> {
        T::reference_target()
    }

    fn to_value(&self) -> Result<Value> {
        match self {
            Self::Loaded(value) => value.to_value(),
            Self::NotLoaded => Err(DbError::FieldUnavailable(
                "deferred value was never loaded".to_string(),
            )),
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        T::from_value(value).map(Self::Loaded)
    }

    fn to_json(&self) -> Result<Option<serde_json::Value>> {
        match self {
            Self::Loaded(value) => value.to_json(),
            Self::NotLoaded => Ok(None),
        }
    }

    fn from_json(json: Option<&serde_json::Value>, field: &str) -> Result<Self> {
        match json {
            Some(json) => T::from_json(Some(json), field).map(Self::Loaded),
            None => Ok(Self::NotLoaded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_option_column_is_nullable() {
        assert!(<Option<String> as ColumnValue>::nullable());
        assert!(!<String as ColumnValue>::nullable());
        assert_eq!(None::<String>.to_value().unwrap(), Value::Null);
        assert_eq!(
            <Option<i64> as ColumnValue>::from_value(Value::Integer(3)).unwrap(),
            Some(3)
        );
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        assert!(matches!(
            <bool as ColumnValue>::from_value(Value::Text("yes".into())),
            Err(DbError::TypeMismatch(_))
        ));
        assert!(<i32 as ColumnValue>::from_value(Value::Integer(i64::MAX)).is_err());
    }

    #[test]
    fn test_stored_json_round_trips_through_value() {
        let original = StoredJson(json!({"retries": 3, "hosts": ["a", "b"]}));
        let value = original.to_value().unwrap();
        assert_eq!(StoredJson::<serde_json::Value>::from_value(value).unwrap(), original);
        let from_text =
            StoredJson::<Vec<i64>>::from_value(Value::Text("[1,2]".into())).unwrap();
        assert_eq!(from_text.into_inner(), vec![1, 2]);
    }

    #[test]
    fn test_timestamp_accepts_rfc3339_text() {
        let ts = <DateTime<Utc> as ColumnValue>::from_value(Value::Text(
            "2024-05-01T10:00:00Z".into(),
        ))
        .unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_deferred_missing_from_state_is_not_loaded() {
        let value = <Deferred<String> as ColumnValue>::from_json(None, "provider").unwrap();
        assert!(!value.is_loaded());
        assert!(matches!(value.to_value(), Err(DbError::FieldUnavailable(_))));
        assert_eq!(value.to_json().unwrap(), None);

        let loaded =
            <Deferred<String> as ColumnValue>::from_json(Some(&json!("saml")), "provider").unwrap();
        assert_eq!(loaded.loaded().map(String::as_str), Some("saml"));
    }

    #[test]
    fn test_non_finite_floats_survive_json() {
        for value in [f64::INFINITY, f64::NEG_INFINITY, 2.5] {
            let json = value.to_json().unwrap();
            assert_eq!(f64::from_json(json.as_ref(), "level").unwrap(), value);
        }
        assert_eq!(f64::NAN.to_json().unwrap(), Some(json!("NaN")));
        assert!(f64::from_json(Some(&json!("NaN")), "level").unwrap().is_nan());
        assert!(f64::from_json(Some(&json!(null)), "level").is_err());

        let missing: Option<f64> = None;
        assert_eq!(missing.to_json().unwrap(), Some(json!(null)));
        assert_eq!(
            <Option<f64> as ColumnValue>::from_json(Some(&json!("-Infinity")), "level").unwrap(),
            Some(f64::NEG_INFINITY)
        );
        assert_eq!(
            <Option<f64> as ColumnValue>::from_json(Some(&json!(null)), "level").unwrap(),
            None
        );
    }

    #[test]
    fn test_plain_field_missing_from_state_is_an_error() {
        assert!(matches!(
            <String as ColumnValue>::from_json(None, "key"),
            Err(DbError::SerializationError(_))
        ));
    }
}
