//! Composite (row) types
//!
//! A [`CompositeType`] is declared once through [`CompositeTypeBuilder`]:
//! a name and an ordered list of sub-fields. Declaring touches no database.
//! Creating the catalog type and installing its wire adapter happens later,
//! per connection, through [`materialize`](super::materialize).
//!
//! Values of a composite type are [`CompositeInstance`]s whose slots line up
//! with the declared sub-fields.

use super::{Field, FieldDescription, FieldKind, FieldOptions, FieldRef, TypeDefinition};
use crate::connection::Connection;
use crate::errors::CodecError;
use crate::lookup::{Lookup, LookupSql};
use crate::registry::{type_exists, AdapterKey, AdapterRegistry, CompositeAdapter};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use type_mapping::{
    json_to_pg_value, quote_ident, split_record_text, validate_identifier,
    validate_quoted_identifier, CompositeInstance, PgValue,
};

/// Declaration of a composite type, before validation
pub struct CompositeTypeBuilder {
    name: String,
    db_type: Option<String>,
    fields: Vec<(String, FieldRef)>,
}

impl CompositeTypeBuilder {
    /// Override the database type name (default: the lower-cased name
    /// without a trailing `field`). The override is lower-cased too, since
    /// the name appears unquoted in column types and casts.
    pub fn db_type(mut self, db_type: impl Into<String>) -> Self {
        self.db_type = Some(db_type.into());
        self
    }

    pub fn field(self, name: impl Into<String>, field: impl Field + 'static) -> Self {
        self.field_ref(name, Arc::new(field))
    }

    pub fn field_ref(mut self, name: impl Into<String>, field: FieldRef) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    /// Validate the declaration and order the sub-fields by creation
    pub fn build(self) -> Result<Arc<CompositeType>, CodecError> {
        let db_type = match self.db_type {
            Some(db_type) => db_type.to_lowercase(),
            None => {
                let lowered = self.name.to_lowercase();
                lowered
                    .strip_suffix("field")
                    .unwrap_or(&lowered)
                    .to_string()
            }
        };
        validate_identifier(&db_type)?;

        if self.fields.is_empty() {
            return Err(CodecError::Configuration(format!(
                "Composite type '{}' declares no fields",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for (name, field) in &self.fields {
            if field.kind() == FieldKind::Relation {
                return Err(CodecError::Configuration(
                    "Composite types cannot contain related fields of any kind.".to_string(),
                ));
            }
            validate_quoted_identifier(name)?;
            if !seen.insert(name.as_str()) {
                return Err(CodecError::Configuration(format!(
                    "Composite type '{}' declares field '{}' more than once",
                    self.name, name
                )));
            }
            field.check()?;
        }

        let mut fields = self.fields;
        fields.sort_by_key(|(_, field)| field.options().creation_counter);

        let instance_name = self
            .name
            .strip_suffix("Field")
            .unwrap_or(&self.name)
            .to_string();

        crate::debug_log!(
            "Declared composite type '{}' ({} fields)",
            db_type,
            fields.len()
        );

        Ok(Arc::new(CompositeType {
            name: self.name,
            instance_name,
            db_type,
            fields,
        }))
    }
}

/// A validated composite type declaration
#[derive(Debug)]
pub struct CompositeType {
    name: String,
    instance_name: String,
    db_type: String,
    fields: Vec<(String, FieldRef)>,
}

impl CompositeType {
    pub fn builder(name: impl Into<String>) -> CompositeTypeBuilder {
        CompositeTypeBuilder {
            name: name.into(),
            db_type: None,
            fields: Vec::new(),
        }
    }

    /// Name as declared
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the instances, e.g. `Monarch` for `MonarchField`
    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn db_type(&self) -> &str {
        &self.db_type
    }

    pub fn fields(&self) -> &[(String, FieldRef)] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldRef> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, field)| field)
    }

    fn position(&self, name: &str) -> Result<usize, CodecError> {
        self.fields
            .iter()
            .position(|(field_name, _)| field_name == name)
            .ok_or_else(|| CodecError::UnknownField {
                type_name: self.instance_name.clone(),
                field: name.to_string(),
            })
    }

    fn make(&self, values: Vec<PgValue>) -> CompositeInstance {
        CompositeInstance::from_parts(
            self.instance_name.as_str(),
            self.db_type.as_str(),
            self.fields.iter().map(|(name, _)| name.clone()).collect(),
            values,
        )
    }

    /// Instance with every slot at its sub-field's default
    pub fn default_instance(&self) -> CompositeInstance {
        self.make(self.fields.iter().map(|(_, field)| field.default_value()).collect())
    }

    /// Build an instance from positional and named values.
    ///
    /// Positional values fill sub-fields in declaration order. Every value
    /// goes through its sub-field's coercion; omitted sub-fields take their
    /// default.
    pub fn instance(
        &self,
        positional: Vec<PgValue>,
        named: Vec<(String, PgValue)>,
    ) -> Result<CompositeInstance, CodecError> {
        if positional.len() > self.fields.len() {
            return Err(CodecError::TypeMismatch(format!(
                "{} takes at most {} values; got {}",
                self.instance_name,
                self.fields.len(),
                positional.len()
            )));
        }

        let mut slots: Vec<Option<PgValue>> = vec![None; self.fields.len()];
        for (idx, value) in positional.into_iter().enumerate() {
            slots[idx] = Some(self.fields[idx].1.to_native(value)?);
        }
        for (name, value) in named {
            let idx = self.position(&name)?;
            if slots[idx].is_some() {
                return Err(CodecError::TypeMismatch(format!(
                    "{} got multiple values for {}.",
                    self.instance_name, name
                )));
            }
            slots[idx] = Some(self.fields[idx].1.to_native(value)?);
        }

        let values = slots
            .into_iter()
            .zip(&self.fields)
            .map(|(slot, (_, field))| slot.unwrap_or_else(|| field.default_value()))
            .collect();
        Ok(self.make(values))
    }

    /// Instance from values in declaration order
    pub fn from_values(&self, values: Vec<PgValue>) -> Result<CompositeInstance, CodecError> {
        self.instance(values, Vec::new())
    }

    /// Instance from name/value pairs
    pub fn from_named<K: Into<String>>(
        &self,
        pairs: impl IntoIterator<Item = (K, PgValue)>,
    ) -> Result<CompositeInstance, CodecError> {
        self.instance(
            Vec::new(),
            pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )
    }

    /// Assign one sub-field of an instance, coercing the value first
    pub fn set(
        &self,
        instance: &mut CompositeInstance,
        name: &str,
        value: PgValue,
    ) -> Result<(), CodecError> {
        if instance.db_type() != self.db_type {
            return Err(CodecError::TypeMismatch(format!(
                "Expected {} instance; got {}",
                self.instance_name,
                instance.type_name()
            )));
        }
        let idx = self.position(name)?;
        let coerced = self.fields[idx].1.to_native(value)?;
        if let Some(slot) = instance.slot_mut(idx) {
            *slot = coerced;
        }
        Ok(())
    }

    /// Reconstruct an instance from the server's row text, e.g.
    /// `(King,Elessar,2)`
    pub fn parse_text(&self, text: &str) -> Result<CompositeInstance, CodecError> {
        let elements = split_record_text(text)
            .map_err(|e| CodecError::from_text_format(&self.db_type, text, e))?;
        if elements.len() != self.fields.len() {
            return Err(CodecError::invalid_text(
                &self.db_type,
                text,
                format!("expected {} values, got {}", self.fields.len(), elements.len()),
            ));
        }
        let values = elements
            .iter()
            .zip(&self.fields)
            .map(|(element, (_, field))| field.from_text(element.as_deref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.make(values))
    }

    /// Coerce any accepted input into an instance of this type
    pub fn coerce(&self, value: PgValue) -> Result<CompositeInstance, CodecError> {
        match value {
            PgValue::Composite(instance) if instance.db_type() == self.db_type => {
                self.from_values(instance.into_values())
            }
            PgValue::Composite(instance) => Err(CodecError::TypeMismatch(format!(
                "Expected {} instance; got {}",
                self.instance_name,
                instance.type_name()
            ))),
            ref falsy if falsy.is_falsy() => Ok(self.default_instance()),
            PgValue::Array(values) => self.from_values(values),
            PgValue::Record(pairs) => self.instance(Vec::new(), pairs),
            PgValue::Text(text) => self.parse_text(&text),
            PgValue::Json(json @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
                self.coerce(json_to_pg_value(json))
            }
            other => Err(CodecError::mismatch(&self.instance_name, &other)),
        }
    }

    fn create_statement(&self, conn: &dyn Connection) -> String {
        let columns = self
            .fields
            .iter()
            .map(|(name, field)| format!("    {} {}", quote_ident(name), field.backing_type(conn)))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("CREATE TYPE {} AS (\n{}\n)", quote_ident(&self.db_type), columns)
    }
}

#[async_trait]
impl TypeDefinition for CompositeType {
    fn type_name(&self) -> &str {
        &self.db_type
    }

    async fn create_type_statements(
        &self,
        conn: &dyn Connection,
        only_if_not_exists: bool,
    ) -> Result<Vec<String>, CodecError> {
        let mut statements: Vec<String> = Vec::new();

        // dependent types must exist before this one
        for (_, field) in &self.fields {
            if let Some(definition) = field.type_definition() {
                for statement in definition
                    .create_type_statements(conn, only_if_not_exists)
                    .await?
                {
                    if !statements.contains(&statement) {
                        statements.push(statement);
                    }
                }
            }
        }

        let exists = only_if_not_exists
            && conn.vendor().supports_ddl()
            && type_exists(conn, &self.db_type).await?;
        if !exists {
            statements.push(self.create_statement(conn));
        }
        Ok(statements)
    }
}

/// Column holding a composite value
#[derive(Debug, Clone)]
pub struct CompositeField {
    composite: Arc<CompositeType>,
    options: FieldOptions,
}

impl CompositeField {
    pub fn new(composite: Arc<CompositeType>) -> Self {
        let options = FieldOptions {
            null: true,
            blank: true,
            ..FieldOptions::default()
        };
        Self { composite, options }
    }

    field_options!(fixed_null);

    pub fn composite(&self) -> &Arc<CompositeType> {
        &self.composite
    }
}

impl Field for CompositeField {
    fn kind(&self) -> FieldKind {
        FieldKind::Composite
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn backing_type(&self, _conn: &dyn Connection) -> String {
        self.composite.db_type.clone()
    }

    fn to_native(&self, value: PgValue) -> Result<PgValue, CodecError> {
        self.composite.coerce(value).map(PgValue::Composite)
    }

    fn default_value(&self) -> PgValue {
        match &self.options.default {
            Some(value) => value.clone(),
            None => PgValue::Composite(self.composite.default_instance()),
        }
    }

    fn to_wire(&self, value: PgValue) -> Result<PgValue, CodecError> {
        if value.is_null() {
            return Ok(PgValue::Null);
        }
        let instance = self.composite.coerce(value)?;
        let values = instance
            .into_values()
            .into_iter()
            .zip(&self.composite.fields)
            .map(|(value, (_, field))| field.to_wire(value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PgValue::Composite(self.composite.make(values)))
    }

    fn from_text(&self, text: Option<&str>) -> Result<PgValue, CodecError> {
        match text {
            Some(text) => self.composite.parse_text(text).map(PgValue::Composite),
            None => Ok(PgValue::Composite(self.composite.default_instance())),
        }
    }

    /// Only `exact`; a null operand compares against the default instance
    fn translate_lookup(
        &self,
        lookup: &Lookup,
        operand: PgValue,
        _conn: &dyn Connection,
    ) -> Result<LookupSql, CodecError> {
        match lookup {
            Lookup::Exact => {
                let operand = if operand.is_null() {
                    PgValue::Composite(self.composite.default_instance())
                } else {
                    operand
                };
                Ok(LookupSql::new("{field} = {value}", vec![self.to_wire(operand)?]))
            }
            other => Err(CodecError::unsupported_lookup(self.kind().name(), other.name())),
        }
    }

    fn type_definition(&self) -> Option<&dyn TypeDefinition> {
        Some(self.composite.as_ref())
    }

    fn register_wire_adapters(&self, registry: &AdapterRegistry) {
        let db_type = self.composite.db_type.clone();
        registry.register(
            AdapterKey::Composite(db_type.clone()),
            Arc::new(CompositeAdapter::new(db_type)),
        );
        for (_, field) in &self.composite.fields {
            field.register_wire_adapters(registry);
        }
    }

    fn describe(&self) -> FieldDescription {
        let mut description = FieldDescription::new(
            FieldKind::Composite,
            self.composite.instance_name.clone(),
            &self.options,
        )
        .with_extra("db_type", self.composite.db_type.clone().into());
        description.fields = self
            .composite
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), field.describe()))
            .collect();
        description
    }
}
