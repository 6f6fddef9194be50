//! Introspection models matching the backend's catalog and schema payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::AppError;

/// One entry of the resource catalog returned by `GET /introspect`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntrospectedRoute {
    #[serde(default)]
    pub in_admin: bool,
    #[serde(default)]
    pub key: String,
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub model_name: String,
}

impl IntrospectedRoute {
    /// The route path without its leading slash, as used in API paths.
    pub fn route(&self) -> &str {
        self.url.trim_start_matches('/')
    }
}

/// Declared type of an introspected field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    String,
    Number,
    Text,
    Integer,
    Float,
    Boolean,
    Decimal,
    Array,
    Object,
    /// Any type the backend reports that the admin has no dedicated handling for
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Decimal => "decimal",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Other(other) => other,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "string" => FieldType::String,
            "number" => FieldType::Number,
            "text" => FieldType::Text,
            "integer" => FieldType::Integer,
            "float" => FieldType::Float,
            "boolean" => FieldType::Boolean,
            "decimal" => FieldType::Decimal,
            "array" => FieldType::Array,
            "object" => FieldType::Object,
            other => FieldType::Other(other.to_string()),
        }
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        FieldType::parse(&s)
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

/// Descriptor of a single field of a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    /// Absent when the backend could not determine a type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_show")]
    pub show: bool,
    /// Serialized JSON: enum options for `_enum` fields, sub-schemas for `microres_` fields
    #[serde(default)]
    pub schema: Option<String>,
}

fn default_show() -> bool {
    true
}

impl FieldDescriptor {
    pub fn new(field_type: FieldType, label: &str) -> Self {
        Self {
            field_type: Some(field_type),
            required: false,
            label: label.to_string(),
            show: true,
            schema: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.show = false;
        self
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.to_string());
        self
    }

    pub fn is_type(&self, field_type: &FieldType) -> bool {
        self.field_type.as_ref() == Some(field_type)
    }

    /// Options of an enumerated field, in server order.
    ///
    /// A malformed option list yields no options rather than an error.
    pub fn enum_options(&self) -> Vec<EnumOption> {
        let raw = self.schema.as_deref().unwrap_or("[]");
        match serde_json::from_str(raw) {
            Ok(options) => options,
            Err(e) => {
                tracing::warn!("Malformed enum option list {:?}: {}", raw, e);
                Vec::new()
            }
        }
    }
}

/// One `{label, value}` option of an enumerated field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnumOption {
    #[serde(default)]
    pub label: String,
    pub value: Value,
}

/// Relation tuple `(kind, related_model, foreign_key, label)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationDescriptor(pub String, pub String, pub Option<String>, pub String);

impl RelationDescriptor {
    pub fn kind(&self) -> &str {
        &self.0
    }

    pub fn related_model(&self) -> &str {
        &self.1
    }

    pub fn foreign_key(&self) -> Option<&str> {
        self.2.as_deref().filter(|fk| !fk.is_empty())
    }

    pub fn label(&self) -> &str {
        &self.3
    }

    pub fn is_to_many(&self) -> bool {
        self.0.contains("Many")
    }
}

/// A media slot a resource exposes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaSlotDescriptor {
    #[serde(default)]
    pub key: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub mime: Vec<String>,
    #[serde(default)]
    pub multiple: bool,
    pub name: String,
}

/// Full introspection of one resource route.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceSchema {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDescriptor>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rels: BTreeMap<String, RelationDescriptor>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub media: Vec<MediaSlotDescriptor>,
}

impl ResourceSchema {
    /// Check the schema invariants.
    ///
    /// A name present in both `fields` and `rels` is rejected. A foreign key
    /// that names no field is only logged, the relation still works as a picker.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = self.rels.keys().find(|name| self.fields.contains_key(*name)) {
            return Err(AppError::Schema(format!(
                "Field {} is declared both as a field and as a relation",
                name
            )));
        }

        for (name, rel) in &self.rels {
            if let Some(fk) = rel.foreign_key() {
                if !self.fields.contains_key(fk) {
                    tracing::warn!("Relation {} names unknown foreign key {}", name, fk);
                }
            }
        }

        Ok(())
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.rels.get(name)
    }

    /// Whether `name` is the resolved foreign key of some relation.
    pub fn is_foreign_key(&self, name: &str) -> bool {
        self.rels.values().any(|rel| rel.foreign_key() == Some(name))
    }

    /// Visible fields of the primary "Parameters" tab, relation foreign keys excluded.
    pub fn parameter_fields(&self) -> impl Iterator<Item = (&String, &FieldDescriptor)> {
        self.fields
            .iter()
            .filter(move |(name, desc)| desc.show && !self.is_foreign_key(name))
    }
}

/// Global API metadata returned by `GET /api_meta`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiMeta {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDescriptor>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
