//! UUID columns

use super::{Field, FieldDescription, FieldKind, FieldOptions};
use crate::connection::Connection;
use crate::errors::CodecError;
use crate::registry::{AdapterKey, AdapterRegistry, UuidAdapter};
use std::fmt;
use std::sync::Arc;
use type_mapping::PgValue;
use uuid::Uuid;

/// Produces a value for an auto-generating UUID field
pub type UuidGenerator = Arc<dyn Fn() -> Uuid + Send + Sync>;

#[derive(Clone)]
pub struct UuidField {
    options: FieldOptions,
    auto_add: Option<UuidGenerator>,
}

impl Default for UuidField {
    fn default() -> Self {
        Self::new()
    }
}

impl UuidField {
    pub fn new() -> Self {
        let options = FieldOptions {
            unique: true,
            ..FieldOptions::default()
        };
        Self {
            options,
            auto_add: None,
        }
    }

    field_options!();

    /// Generate a random (v4) UUID on insert when no value is set.
    ///
    /// Makes the field non-editable; call [`editable`](Self::editable)
    /// afterwards to override.
    pub fn auto_add(self, auto_add: bool) -> Self {
        if auto_add {
            self.auto_add_with(Arc::new(Uuid::new_v4))
        } else {
            Self {
                auto_add: None,
                ..self
            }
        }
    }

    /// Generate values on insert with a custom function
    pub fn auto_add_with(mut self, generator: UuidGenerator) -> Self {
        self.auto_add = Some(generator);
        self.options.editable = false;
        self
    }

    pub fn is_auto(&self) -> bool {
        self.auto_add.is_some()
    }
}

impl fmt::Debug for UuidField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UuidField")
            .field("options", &self.options)
            .field("auto_add", &self.auto_add.is_some())
            .finish()
    }
}

impl Field for UuidField {
    fn kind(&self) -> FieldKind {
        FieldKind::Uuid
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn backing_type(&self, _conn: &dyn Connection) -> String {
        "uuid".to_string()
    }

    fn check(&self) -> Result<(), CodecError> {
        if self.options.blank && !self.options.null {
            return Err(CodecError::Configuration(
                "Blank UUIDs are stored as NULL. Therefore, setting `blank` to true requires \
                 `null` to be true."
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn to_native(&self, value: PgValue) -> Result<PgValue, CodecError> {
        match value {
            PgValue::Uuid(uuid) => Ok(PgValue::Uuid(uuid)),
            ref empty if empty.is_falsy() => Ok(PgValue::Null),
            PgValue::Text(text) => parse_uuid(&text),
            PgValue::Json(serde_json::Value::String(text)) => parse_uuid(&text),
            other => Err(CodecError::mismatch("uuid", &other)),
        }
    }

    fn to_wire(&self, value: PgValue) -> Result<PgValue, CodecError> {
        if value.is_falsy() {
            if self.options.null || self.auto_add.is_some() {
                return Ok(PgValue::Null);
            }
            return Err(CodecError::MissingValue(
                "Explicit UUID required unless either `null` is true or `auto_add` is given."
                    .to_string(),
            ));
        }
        self.to_native(value)
    }

    fn pre_save(&self, current: &PgValue, adding: bool) -> Option<PgValue> {
        let generator = self.auto_add.as_ref()?;
        if adding && current.is_falsy() {
            let generated = generator();
            crate::debug_log!("Generated UUID {}", generated);
            return Some(PgValue::Uuid(generated));
        }
        None
    }

    fn register_wire_adapters(&self, registry: &AdapterRegistry) {
        registry.register(AdapterKey::Uuid, Arc::new(UuidAdapter));
    }

    fn describe(&self) -> FieldDescription {
        FieldDescription::new(FieldKind::Uuid, "uuid", &self.options)
            .with_extra("auto_add", self.auto_add.is_some().into())
    }
}

fn parse_uuid(text: &str) -> Result<PgValue, CodecError> {
    Uuid::parse_str(text.trim())
        .map(PgValue::Uuid)
        .map_err(|e| CodecError::invalid_text("uuid", text, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockConnection;
    use crate::lookup::Lookup;

    const KNOWN: &str = "c0b2b8a2-4a8e-4f5c-9d51-2b9f3c0f6a11";

    #[test]
    fn test_defaults() {
        let field = UuidField::new();
        assert!(field.options().unique);
        assert!(field.options().editable);
        assert_eq!(field.backing_type(&MockConnection::new()), "uuid");

        let auto = UuidField::new().auto_add(true);
        assert!(!auto.options().editable);
        assert!(UuidField::new().auto_add(true).editable(true).options().editable);
    }

    #[test]
    fn test_blank_requires_null() {
        assert!(matches!(
            UuidField::new().blank(true).check(),
            Err(CodecError::Configuration(_))
        ));
        assert!(UuidField::new().blank(true).null(true).check().is_ok());
    }

    #[test]
    fn test_text_is_parsed() {
        let field = UuidField::new();
        let expected = Uuid::parse_str(KNOWN).unwrap();
        assert_eq!(field.to_native(KNOWN.into()).unwrap(), PgValue::Uuid(expected));
        assert_eq!(field.to_native(PgValue::Uuid(expected)).unwrap(), PgValue::Uuid(expected));
        assert!(matches!(
            field.to_native("not-a-uuid".into()),
            Err(CodecError::InvalidText { .. })
        ));
        assert!(matches!(
            field.to_native(PgValue::Integer(5)),
            Err(CodecError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_missing_values() {
        assert!(matches!(
            UuidField::new().to_wire(PgValue::Null),
            Err(CodecError::MissingValue(_))
        ));
        assert_eq!(UuidField::new().null(true).to_wire("".into()).unwrap(), PgValue::Null);
        assert_eq!(UuidField::new().auto_add(true).to_wire(PgValue::Null).unwrap(), PgValue::Null);
    }

    #[test]
    fn test_pre_save_generates_v4() {
        let field = UuidField::new().auto_add(true);
        let Some(PgValue::Uuid(generated)) = field.pre_save(&PgValue::Null, true) else {
            panic!("expected a generated UUID");
        };
        let text = generated.to_string();
        assert_eq!(&text[14..15], "4");
        assert!(matches!(&text[19..20], "8" | "9" | "a" | "b"));

        // existing values and updates are left alone
        assert!(field.pre_save(&PgValue::Uuid(generated), true).is_none());
        assert!(field.pre_save(&PgValue::Null, false).is_none());
        assert!(UuidField::new().pre_save(&PgValue::Null, true).is_none());
    }

    #[test]
    fn test_custom_generator() {
        let field = UuidField::new().auto_add_with(Arc::new(Uuid::nil));
        assert_eq!(field.pre_save(&PgValue::Null, true), Some(PgValue::Uuid(Uuid::nil())));
    }

    #[test]
    fn test_exact_lookup_only() {
        let conn = MockConnection::new();
        let field = UuidField::new();
        let sql = field.translate_lookup(&Lookup::Exact, KNOWN.into(), &conn).unwrap();
        assert_eq!(sql.params, vec![PgValue::Uuid(Uuid::parse_str(KNOWN).unwrap())]);

        let registry = AdapterRegistry::new();
        field.register_wire_adapters(&registry);
        assert_eq!(
            sql.render_inline("\"id\"", &registry).unwrap(),
            format!("\"id\" = '{}'", KNOWN)
        );

        assert!(matches!(
            field.translate_lookup(&Lookup::Contains, KNOWN.into(), &conn),
            Err(CodecError::UnsupportedLookup { field_kind: "uuid", .. })
        ));
    }
}
