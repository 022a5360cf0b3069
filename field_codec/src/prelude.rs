//! Convenience re-exports for declaring and using extended fields
//!
//! ```rust
//! use field_codec::prelude::*;
//! ```

pub use crate::coercive_list::{Coercer, CoerciveList};
pub use crate::connection::{Connection, PgPoolConnection, Vendor};
pub use crate::errors::CodecError;
pub use crate::fields::{
    materialize, ArrayField, CompositeField, CompositeType, DateTimeField, Field, FieldRef,
    JsonField, JsonKind, RelationField, ScalarField, TypeDefinition, UuidField,
};
pub use crate::lookup::{Lookup, LookupSql};
pub use crate::registry::AdapterRegistry;

pub use type_mapping::{CompositeInstance, PgValue};
