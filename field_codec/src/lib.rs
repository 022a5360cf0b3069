//! Field Codec - typed codecs for PostgreSQL-specific column types
//!
//! Every extended column type (arrays, composite row types, JSON, UUID) is a
//! [`Field`]: it knows its backing SQL type, how to coerce application values,
//! how to serialize them for the wire and parse them back, and how to turn a
//! named lookup (`exact`, `contains`, `len`) into an SQL fragment. Fields that
//! need a catalog type of their own also expose a [`TypeDefinition`].

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod coercive_list;
pub mod connection;
pub mod errors;
pub mod fields;
pub mod lookup;
pub mod prelude;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use coercive_list::CoerciveList;
pub use connection::{Connection, PgPoolConnection, Row, Vendor, JSON_NATIVE_MIN_VERSION};
pub use errors::CodecError;
pub use fields::{
    materialize, ArrayField, CompositeField, CompositeType, CompositeTypeBuilder, DateTimeField,
    Field, FieldDescription, FieldKind, FieldOptions, FieldRef, JsonField, JsonKind,
    RelationField, ScalarField, ScalarKind, TypeDefinition, UuidField, UuidGenerator,
};
pub use lookup::{Lookup, LookupSql};
pub use registry::{type_exists, type_names, AdapterKey, AdapterRegistry, WireAdapter};

pub use type_mapping::{CompositeInstance, PgValue};
