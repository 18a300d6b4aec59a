pub mod data_type;
pub mod error;
pub mod types;
pub mod value;

pub use data_type::DataType;
pub use error::{DbError, PartialCaptureWarning, Result};
pub use types::{Column, Row, TableSchema};
pub use value::Value;
