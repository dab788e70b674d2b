//! Field descriptors for declared attribute blocks.
//!
//! Each handler describes the fields of its block as a table of
//! [`FieldDescriptor`]s. The table is consumed by whatever registers the
//! schema with the outer configuration system, and here to validate and
//! decode declared JSON values into typed blocks.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while registering a schema or decoding declared values
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("attribute '{0}' is already registered")]
    DuplicateAttribute(String),

    #[error("attribute '{0}' is required")]
    MissingAttribute(String),

    #[error("'{key}' must be a list of blocks, got {found}")]
    NotAList { key: String, found: &'static str },

    #[error("'{key}' expects between {min} and {max} block(s), got {count}")]
    Cardinality {
        key: String,
        min: usize,
        max: usize,
        count: usize,
    },

    #[error("block {index} of '{key}' must be an object")]
    NotABlock { key: String, index: usize },

    #[error("block {index} of '{key}': missing required field '{field}'")]
    MissingField {
        key: String,
        index: usize,
        field: &'static str,
    },

    #[error("block {index} of '{key}': unknown field '{field}'")]
    UnknownField {
        key: String,
        index: usize,
        field: String,
    },

    #[error("block {index} of '{key}': field '{field}' must be {expected}")]
    WrongType {
        key: String,
        index: usize,
        field: &'static str,
        expected: FieldType,
    },

    #[error("block {index} of '{key}': field '{field}' {message}")]
    Invalid {
        key: String,
        index: usize,
        field: &'static str,
        message: String,
    },

    #[error("block {index} of '{key}': {source}")]
    Decode {
        key: String,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// Field Descriptors
// ============================================================================

/// Value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Bool,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "a string"),
            Self::Int => write!(f, "an integer"),
            Self::Bool => write!(f, "a boolean"),
        }
    }
}

/// Who supplies a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// Must be declared
    Required,
    /// May be declared; a default may fill it in
    Optional,
    /// Assigned by the server, never declared
    Computed,
    /// May be declared, otherwise the server value is kept
    OptionalComputed,
}

/// Value constraint checked after type checking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "rule", content = "values")]
pub enum Validation {
    /// Integer must be one of the listed values
    OneOfInt(&'static [i64]),
    /// String must be one of the listed values
    OneOfStr(&'static [&'static str]),
}

impl Validation {
    /// Check a value that already passed type checking
    fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Self::OneOfInt(allowed) => match value.as_i64() {
                Some(v) if allowed.contains(&v) => Ok(()),
                _ => Err(format!("must be one of {allowed:?}, got {value}")),
            },
            Self::OneOfStr(allowed) => match value.as_str() {
                Some(v) if allowed.contains(&v) => Ok(()),
                _ => Err(format!("must be one of {allowed:?}, got {value}")),
            },
        }
    }
}

/// Description of one field in a block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub presence: Presence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
}

impl FieldDescriptor {
    fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            presence: Presence::Optional,
            default: None,
            description: "",
            validation: None,
        }
    }

    /// A string field, optional unless stated otherwise
    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldType::String)
    }

    /// An integer field, optional unless stated otherwise
    pub fn int(name: &'static str) -> Self {
        Self::new(name, FieldType::Int)
    }

    /// A boolean field, optional unless stated otherwise
    pub fn bool(name: &'static str) -> Self {
        Self::new(name, FieldType::Bool)
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn computed(mut self) -> Self {
        self.presence = Presence::Computed;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.presence = Presence::OptionalComputed;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn validate_with(mut self, validation: Validation) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Whether users may declare this field
    pub fn is_declarable(&self) -> bool {
        self.presence != Presence::Computed
    }

    fn type_matches(&self, value: &Value) -> bool {
        match self.field_type {
            FieldType::String => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Bool => value.is_boolean(),
        }
    }
}

// ============================================================================
// Attribute Schemas
// ============================================================================

/// Shape of an attribute's block collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Collection {
    /// Unordered set of uniquely keyed blocks
    Set,
    /// Ordered list with bounded length
    List { min_items: usize, max_items: usize },
}

/// Schema of one named attribute of a service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeSchema {
    pub key: &'static str,
    pub collection: Collection,
    pub required: bool,
    pub fields: Vec<FieldDescriptor>,
}

impl AttributeSchema {
    /// Optional set of blocks
    pub fn set(key: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            key,
            collection: Collection::Set,
            required: false,
            fields,
        }
    }

    /// Required list holding exactly one block
    pub fn single(key: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            key,
            collection: Collection::List {
                min_items: 1,
                max_items: 1,
            },
            required: true,
            fields,
        }
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate a declared value, including the required check
    pub fn validate(&self, value: Option<&Value>) -> Result<(), SchemaError> {
        if self.required && is_absent(value) {
            return Err(SchemaError::MissingAttribute(self.key.to_string()));
        }
        self.prepare(value, Origin::Declared).map(|_| ())
    }

    /// Validate and decode a declared value into typed blocks
    ///
    /// Absent values decode to an empty list. Server-computed fields are
    /// dropped, defaults are filled in for missing optional fields.
    pub fn decode<B: DeserializeOwned>(&self, value: Option<&Value>) -> Result<Vec<B>, SchemaError> {
        self.decode_from(value, Origin::Declared)
    }

    /// Decode a value recorded by a previous read
    ///
    /// The recorded form is already normalized, so neither defaults nor
    /// validators apply.
    pub fn decode_recorded<B: DeserializeOwned>(
        &self,
        value: Option<&Value>,
    ) -> Result<Vec<B>, SchemaError> {
        self.decode_from(value, Origin::Recorded)
    }

    fn decode_from<B: DeserializeOwned>(
        &self,
        value: Option<&Value>,
        origin: Origin,
    ) -> Result<Vec<B>, SchemaError> {
        self.prepare(value, origin)?
            .into_iter()
            .enumerate()
            .map(|(index, block)| {
                serde_json::from_value(Value::Object(block)).map_err(|source| {
                    SchemaError::Decode {
                        key: self.key.to_string(),
                        index,
                        source,
                    }
                })
            })
            .collect()
    }

    /// Check every block and return it in canonical form
    fn prepare(
        &self,
        value: Option<&Value>,
        origin: Origin,
    ) -> Result<Vec<Map<String, Value>>, SchemaError> {
        let items = match value {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(SchemaError::NotAList {
                    key: self.key.to_string(),
                    found: json_type(other),
                });
            }
        };

        if let Collection::List {
            min_items,
            max_items,
        } = self.collection
            && !items.is_empty()
            && (items.len() < min_items || items.len() > max_items)
        {
            return Err(SchemaError::Cardinality {
                key: self.key.to_string(),
                min: min_items,
                max: max_items,
                count: items.len(),
            });
        }

        items
            .iter()
            .enumerate()
            .map(|(index, item)| self.prepare_block(index, item, origin))
            .collect()
    }

    /// Canonical form of one block
    ///
    /// Optional string fields holding the empty string are dropped after
    /// defaults are applied, the same way read-back prunes them, so an
    /// omitted field and an empty one decode identically.
    fn prepare_block(
        &self,
        index: usize,
        item: &Value,
        origin: Origin,
    ) -> Result<Map<String, Value>, SchemaError> {
        let Value::Object(map) = item else {
            return Err(SchemaError::NotABlock {
                key: self.key.to_string(),
                index,
            });
        };

        if let Some(unknown) = map.keys().find(|k| self.field(k).is_none()) {
            return Err(SchemaError::UnknownField {
                key: self.key.to_string(),
                index,
                field: unknown.clone(),
            });
        }

        let mut block = Map::new();
        for field in &self.fields {
            if !field.is_declarable() {
                continue;
            }

            let value = match map.get(field.name) {
                Some(Value::Null) | None => None,
                Some(v) => Some(v),
            };

            let Some(value) = value else {
                if field.presence == Presence::Required {
                    return Err(SchemaError::MissingField {
                        key: self.key.to_string(),
                        index,
                        field: field.name,
                    });
                }
                if origin == Origin::Declared
                    && let Some(default) = &field.default
                    && !is_empty_string(default)
                {
                    block.insert(field.name.to_string(), default.clone());
                }
                continue;
            };

            if !field.type_matches(value) {
                return Err(SchemaError::WrongType {
                    key: self.key.to_string(),
                    index,
                    field: field.name,
                    expected: field.field_type,
                });
            }

            if field.presence != Presence::Required && is_empty_string(value) {
                continue;
            }

            if origin == Origin::Declared
                && let Some(validation) = &field.validation
            {
                validation
                    .check(value)
                    .map_err(|message| SchemaError::Invalid {
                        key: self.key.to_string(),
                        index,
                        field: field.name,
                        message,
                    })?;
            }

            block.insert(field.name.to_string(), value.clone());
        }

        Ok(block)
    }
}

/// Where a value being decoded comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Written by the user
    Declared,
    /// Stored by a previous read
    Recorded,
}

fn is_empty_string(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}

fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Schema Registry
// ============================================================================

/// Descriptor sink that handlers register their attributes into
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    attributes: BTreeMap<&'static str, AttributeSchema>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attribute; each key may only be registered once
    pub fn register(&mut self, attribute: AttributeSchema) -> Result<(), SchemaError> {
        if self.attributes.contains_key(attribute.key) {
            return Err(SchemaError::DuplicateAttribute(attribute.key.to_string()));
        }
        self.attributes.insert(attribute.key, attribute);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&AttributeSchema> {
        self.attributes.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.attributes.keys().copied()
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeSchema> {
        self.attributes.values()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Endpoint {
        name: String,
        port: u32,
        #[serde(default)]
        placement: Option<String>,
    }

    fn endpoint_schema() -> AttributeSchema {
        AttributeSchema::set(
            "endpoint",
            vec![
                FieldDescriptor::string("name").required(),
                FieldDescriptor::int("port").default_value(20000),
                FieldDescriptor::string("placement")
                    .validate_with(Validation::OneOfStr(&["none", "waf_debug"])),
                FieldDescriptor::string("endpoint_id").computed(),
            ],
        )
    }

    #[test]
    fn test_decode_applies_defaults() {
        let value = json!([{ "name": "a" }]);
        let blocks: Vec<Endpoint> = endpoint_schema().decode(Some(&value)).unwrap();
        assert_eq!(
            blocks,
            vec![Endpoint {
                name: "a".into(),
                port: 20000,
                placement: None,
            }]
        );
    }

    #[test]
    fn test_empty_optional_string_is_dropped() {
        let schema = AttributeSchema::set(
            "endpoint",
            vec![
                FieldDescriptor::string("name").required(),
                FieldDescriptor::int("port").default_value(20000),
                FieldDescriptor::string("placement")
                    .default_value("")
                    .validate_with(Validation::OneOfStr(&["none", "waf_debug"])),
            ],
        );

        let omitted: Vec<Endpoint> = schema.decode(Some(&json!([{ "name": "a" }]))).unwrap();
        let empty: Vec<Endpoint> = schema
            .decode(Some(&json!([{ "name": "a", "placement": "" }])))
            .unwrap();
        assert_eq!(omitted[0].placement, None);
        assert_eq!(omitted, empty);
    }

    #[test]
    fn test_decode_recorded_skips_defaults_and_validators() {
        let schema = endpoint_schema();
        let value = json!([{ "name": "a", "port": 1, "placement": "legacy", "endpoint_id": "x" }]);

        assert!(schema.decode::<Endpoint>(Some(&value)).is_err());
        let blocks: Vec<Endpoint> = schema.decode_recorded(Some(&value)).unwrap();
        assert_eq!(blocks[0].placement.as_deref(), Some("legacy"));

        let no_port = json!([{ "name": "a" }]);
        assert!(matches!(
            schema.decode_recorded::<Endpoint>(Some(&no_port)),
            Err(SchemaError::Decode { .. })
        ));
    }

    #[test]
    fn test_decode_absent_is_empty() {
        let schema = endpoint_schema();
        assert!(schema.decode::<Endpoint>(None).unwrap().is_empty());
        assert!(schema.decode::<Endpoint>(Some(&Value::Null)).unwrap().is_empty());
    }

    #[test]
    fn test_decode_drops_computed_fields() {
        let value = json!([{ "name": "a", "port": 1, "endpoint_id": "xyz" }]);
        let blocks: Vec<Endpoint> = endpoint_schema().decode(Some(&value)).unwrap();
        assert_eq!(blocks[0].port, 1);
    }

    #[test]
    fn test_decode_rejects_missing_required() {
        let value = json!([{ "port": 1 }]);
        let err = endpoint_schema().decode::<Endpoint>(Some(&value)).unwrap_err();
        assert!(matches!(err, SchemaError::MissingField { field: "name", .. }));
    }

    #[test]
    fn test_decode_rejects_unknown_and_mistyped_fields() {
        let schema = endpoint_schema();

        let unknown = json!([{ "name": "a", "colour": "red" }]);
        assert!(matches!(
            schema.decode::<Endpoint>(Some(&unknown)),
            Err(SchemaError::UnknownField { .. })
        ));

        let mistyped = json!([{ "name": "a", "port": "80" }]);
        assert!(matches!(
            schema.decode::<Endpoint>(Some(&mistyped)),
            Err(SchemaError::WrongType {
                field: "port",
                expected: FieldType::Int,
                ..
            })
        ));

        let scalar = json!("a");
        assert!(matches!(
            schema.decode::<Endpoint>(Some(&scalar)),
            Err(SchemaError::NotAList { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_unlisted_value() {
        let value = json!([{ "name": "a", "placement": "everywhere" }]);
        let err = endpoint_schema().decode::<Endpoint>(Some(&value)).unwrap_err();
        assert!(err.to_string().contains("placement"));
    }

    #[test]
    fn test_single_cardinality_and_required() {
        let schema = AttributeSchema::single("package", vec![FieldDescriptor::string("filename").required()]);

        let two = json!([{ "filename": "a" }, { "filename": "b" }]);
        assert!(matches!(
            schema.validate(Some(&two)),
            Err(SchemaError::Cardinality { count: 2, .. })
        ));
        assert!(matches!(
            schema.validate(None),
            Err(SchemaError::MissingAttribute(_))
        ));
        assert!(schema.validate(Some(&json!([{ "filename": "a" }]))).is_ok());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut schema = Schema::new();
        schema.register(endpoint_schema()).unwrap();
        assert!(matches!(
            schema.register(endpoint_schema()),
            Err(SchemaError::DuplicateAttribute(_))
        ));
        assert_eq!(schema.len(), 1);
        assert!(schema.get("endpoint").is_some());
    }

    #[test]
    fn test_schema_serializes_descriptors() {
        let value = serde_json::to_value(endpoint_schema()).unwrap();
        assert_eq!(value["fields"][0]["name"], "name");
        assert_eq!(value["fields"][0]["presence"], "required");
        assert_eq!(value["fields"][1]["default"], 20000);
        assert_eq!(value["collection"]["type"], "set");
    }
}
