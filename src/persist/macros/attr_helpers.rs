#[macro_export]
#[doc(hidden)]
macro_rules! __tracked_table_name {
    ($name:ident) => {
        stringify!($name).to_lowercase()
    };
    ($name:ident, $table:literal) => {
        $table
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! __tracked_validate {
    ($record:expr) => {
        ::core::result::Result::Ok(())
    };
    ($record:expr, $validator:path) => {
        $validator($record)
    };
}
