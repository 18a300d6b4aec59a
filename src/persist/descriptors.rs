use crate::core::{Column, DataType, TableSchema};

/// Logical name of the identifier field every model carries.
pub const IDENTIFIER_FIELD: &str = "id";

/// Alternative name the identifier answers to.
pub const IDENTIFIER_ALIAS: &str = "pk";

/// How a declared field maps onto its storage column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// The store-assigned primary key.
    Identifier,
    /// A plain value column stored under the field's own name.
    Column,
    /// A foreign reference tracked by its scalar key under `<name>_id`.
    Reference { target: &'static str },
}

/// Static metadata for one declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub column: String,
    pub kind: FieldKind,
    pub data_type: DataType,
    pub nullable: bool,
    pub unique: bool,
}

impl FieldDescriptor {
    pub fn identifier() -> Self {
        Self {
            name: IDENTIFIER_FIELD,
            column: IDENTIFIER_FIELD.to_string(),
            kind: FieldKind::Identifier,
            data_type: DataType::Integer,
            nullable: false,
            unique: true,
        }
    }

    pub fn column(name: &'static str, data_type: DataType) -> Self {
        Self {
            name,
            column: name.to_string(),
            kind: FieldKind::Column,
            data_type,
            nullable: false,
            unique: false,
        }
    }

    pub fn reference(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            column: format!("{}_id", name),
            kind: FieldKind::Reference { target },
            data_type: DataType::Integer,
            nullable: false,
            unique: false,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self.kind, FieldKind::Identifier)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, FieldKind::Reference { .. })
    }

    /// Returns `true` when `name` is the logical name, the column, or `pk`
    /// for the identifier.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name
            || self.column == name
            || (self.is_identifier() && name == IDENTIFIER_ALIAS)
    }

    fn to_column(&self) -> Column {
        let mut column = Column::new(self.column.clone(), self.data_type);
        if !self.nullable {
            column = column.not_null();
        }
        if self.unique {
            column = column.unique();
        }
        column
    }
}

/// Per-type registration of fields and diagnostic attribute lists.
///
/// Built once per model type; capture, dirty checks and debug output all
/// consult it instead of inspecting the value at runtime.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    type_name: &'static str,
    table_name: String,
    fields: Vec<FieldDescriptor>,
    repr_attrs: Vec<&'static str>,
    dict_attrs: Vec<&'static str>,
    table_schema: TableSchema,
}

impl ModelDescriptor {
    /// Builds a descriptor; the identifier field is always first.
    pub fn new(
        type_name: &'static str,
        table_name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Self {
        let table_name = table_name.into();
        let mut all_fields = vec![FieldDescriptor::identifier()];
        all_fields.extend(fields.into_iter().filter(|field| !field.is_identifier()));

        let columns = all_fields
            .iter()
            .filter(|field| !field.is_identifier())
            .map(FieldDescriptor::to_column)
            .collect();
        let table_schema = TableSchema::new(table_name.clone(), IDENTIFIER_FIELD, columns);

        Self {
            type_name,
            table_name,
            fields: all_fields,
            repr_attrs: vec![IDENTIFIER_FIELD],
            dict_attrs: vec![IDENTIFIER_FIELD],
            table_schema,
        }
    }

    /// Extends the attributes shown by the repr form and the audit dict.
    pub fn with_repr_attrs(mut self, attrs: &[&'static str]) -> Self {
        extend_unique(&mut self.repr_attrs, attrs);
        extend_unique(&mut self.dict_attrs, attrs);
        self
    }

    /// Extends only the attributes of the audit dict.
    pub fn with_dict_attrs(mut self, attrs: &[&'static str]) -> Self {
        extend_unique(&mut self.dict_attrs, attrs);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Resolves a field by logical name or storage column.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.answers_to(name))
    }

    pub fn repr_attrs(&self) -> &[&'static str] {
        &self.repr_attrs
    }

    pub fn dict_attrs(&self) -> &[&'static str] {
        &self.dict_attrs
    }

    pub fn table_schema(&self) -> &TableSchema {
        &self.table_schema
    }
}

/// Reads `#[model(...)]` field attributes, passed as their stringified
/// contents, and reports whether any of them carries the `unique` flag.
#[doc(hidden)]
pub fn declares_unique(attrs: &[&str]) -> bool {
    attrs.iter().any(|attr| {
        let compact: String = attr.chars().filter(|c| !c.is_whitespace()).collect();
        compact
            .strip_prefix("model(")
            .and_then(|rest| rest.strip_suffix(')'))
            .is_some_and(|flags| flags.split(',').any(|flag| flag == "unique"))
    })
}

fn extend_unique(target: &mut Vec<&'static str>, attrs: &[&'static str]) {
    for attr in attrs {
        if !target.contains(attr) {
            target.push(attr);
        }
    }
}
