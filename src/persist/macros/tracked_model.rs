/// Declares a change-tracked record type.
///
/// ```
/// use tracked_model::{StoredJson, tracked_model};
///
/// tracked_model! {
///     pub struct Setting table = "settings" {
///         #[model(unique)]
///         key: String,
///         value: StoredJson<serde_json::Value>,
///     }
///     repr = [key];
/// }
///
/// let setting = Setting::new("mail.from".to_string(), StoredJson(serde_json::json!("root@localhost")));
/// assert_eq!(setting.key(), "mail.from");
/// assert_eq!(setting.id(), None);
/// ```
///
/// The generated struct carries a store-owned `id` plus the declared fields,
/// and derives `Clone`, `Debug` and `PartialEq`. Without `table = "..."` the
/// table is named after the lowercased type. `repr` lists extra attributes
/// for the repr form (and the audit dict), `audit` extends the audit dict
/// only, and `validate` names a `fn(&Self) -> Result<()>` that bulk updates
/// run when the session enables `validate_updates`.
#[macro_export]
macro_rules! tracked_model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(table = $table:literal)? {
            $($(#[$($field_meta:tt)*])* $field:ident : $field_ty:ty),+ $(,)?
        }
        $(repr = [$($repr:ident),* $(,)?];)?
        $(audit = [$($audit:ident),* $(,)?];)?
        $(validate = $validator:path;)?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        $vis struct $name {
            id: ::core::option::Option<i64>,
            $( $field: $field_ty, )+
        }

        #[allow(dead_code)]
        impl $name {
            /// Builds an unsaved record.
            pub fn new($($field: $field_ty),+) -> Self {
                Self {
                    id: ::core::option::Option::None,
                    $( $field, )+
                }
            }

            pub fn id(&self) -> ::core::option::Option<i64> {
                self.id
            }

            $crate::paste::paste! {
                $(
                    pub fn $field(&self) -> &$field_ty {
                        &self.$field
                    }

                    pub fn [<set_ $field>](&mut self, value: $field_ty) {
                        self.$field = value;
                    }

                    pub fn [<$field _mut>](&mut self) -> &mut $field_ty {
                        &mut self.$field
                    }
                )+
            }
        }

        impl $crate::persist::Model for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn descriptor() -> &'static $crate::persist::ModelDescriptor {
                $crate::lazy_static::lazy_static! {
                    static ref DESCRIPTOR: $crate::persist::ModelDescriptor =
                        $crate::persist::ModelDescriptor::new(
                            stringify!($name),
                            $crate::__tracked_table_name!($name $(, $table)?),
                            vec![
                                $(
                                    $crate::persist::field_descriptor::<$field_ty>(stringify!($field))
                                        .unique($crate::persist::descriptors::declares_unique(
                                            &[$(stringify!($($field_meta)*)),*],
                                        )),
                                )+
                            ],
                        )
                        .with_repr_attrs(&[$($(stringify!($repr)),*)?])
                        .with_dict_attrs(&[$($(stringify!($audit)),*)?]);
                }
                &*DESCRIPTOR
            }

            fn id(&self) -> ::core::option::Option<i64> {
                self.id
            }

            fn set_id(&mut self, id: ::core::option::Option<i64>) {
                self.id = id;
            }

            fn read_field(
                &self,
                field: &$crate::persist::FieldDescriptor,
            ) -> $crate::core::Result<$crate::core::Value> {
                if field.is_identifier() {
                    return ::core::result::Result::Ok($crate::core::Value::from(self.id));
                }
                $(
                    if field.name == stringify!($field) {
                        return <$field_ty as $crate::persist::ColumnValue>::to_value(&self.$field);
                    }
                )+
                ::core::result::Result::Err($crate::core::DbError::UnknownField(
                    field.name.to_string(),
                    stringify!($name).to_string(),
                ))
            }

            fn write_field(
                &mut self,
                field: &$crate::persist::FieldDescriptor,
                value: $crate::core::Value,
            ) -> $crate::core::Result<()> {
                if field.is_identifier() {
                    self.id = <::core::option::Option<i64> as $crate::persist::ColumnValue>::from_value(value)?;
                    return ::core::result::Result::Ok(());
                }
                $(
                    if field.name == stringify!($field) {
                        self.$field = <$field_ty as $crate::persist::ColumnValue>::from_value(value)?;
                        return ::core::result::Result::Ok(());
                    }
                )+
                ::core::result::Result::Err($crate::core::DbError::UnknownField(
                    field.name.to_string(),
                    stringify!($name).to_string(),
                ))
            }

            fn to_fields(
                &self,
            ) -> $crate::core::Result<$crate::serde_json::Map<::std::string::String, $crate::serde_json::Value>> {
                let mut fields = $crate::serde_json::Map::new();
                $(
                    if let ::core::option::Option::Some(json) =
                        <$field_ty as $crate::persist::ColumnValue>::to_json(&self.$field)?
                    {
                        fields.insert(stringify!($field).to_string(), json);
                    }
                )+
                ::core::result::Result::Ok(fields)
            }

            fn from_fields(
                id: ::core::option::Option<i64>,
                fields: &$crate::serde_json::Map<::std::string::String, $crate::serde_json::Value>,
            ) -> $crate::core::Result<Self> {
                ::core::result::Result::Ok(Self {
                    id,
                    $(
                        $field: <$field_ty as $crate::persist::ColumnValue>::from_json(
                            fields.get(stringify!($field)),
                            stringify!($field),
                        )?,
                    )+
                })
            }

            fn from_row(row: &$crate::core::Row) -> $crate::core::Result<Self> {
                ::core::result::Result::Ok(Self {
                    id: $crate::persist::row_identifier(row),
                    $(
                        $field: {
                            let field = <Self as $crate::persist::Model>::resolve_field(stringify!($field))?;
                            match row.get(&field.column) {
                                ::core::option::Option::Some(value) => {
                                    <$field_ty as $crate::persist::ColumnValue>::from_value(value.clone())?
                                }
                                ::core::option::Option::None => {
                                    <$field_ty as $crate::persist::ColumnValue>::from_json(
                                        ::core::option::Option::None,
                                        stringify!($field),
                                    )?
                                }
                            }
                        },
                    )+
                })
            }

            fn validate(&self) -> $crate::core::Result<()> {
                $crate::__tracked_validate!(self $(, $validator)?)
            }
        }
    };
}
