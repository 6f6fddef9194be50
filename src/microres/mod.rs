//! Microres sub-list editing.
//!
//! A microres field stores an ordered list of small sub-records as a JSON
//! string. The editor parses that string, edits the list through a draft
//! and writes the re-encoded string back into the parent form values.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::errors::AppError;
use crate::fields::{FieldRenderer, FormValues};
use crate::form::ValidatorSet;
use crate::models::{FieldDescriptor, FieldType, ResourceSchema};

/// Route whose records pick their block layout through a sibling enum.
pub const MICRORESOURCES_ROUTE: &str = "microresources";
/// Sibling field naming the schema type on [`MICRORESOURCES_ROUTE`].
pub const SCHEMA_TYPE_FIELD: &str = "microresource_type_enum";

// ==================== ENCODING ====================

/// Decode a stored microres value. `null` and blank strings are empty lists.
pub fn parse_items(value: &Value) -> Result<Vec<Value>, AppError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items.clone()),
        Value::String(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        Value::String(raw) => match serde_json::from_str::<Value>(raw)? {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(AppError::Serialization(format!(
                "Microres value is not a list: {}",
                other
            ))),
        },
        other => Err(AppError::Serialization(format!(
            "Microres value is not a list: {}",
            other
        ))),
    }
}

/// Encode items as the stored JSON string.
pub fn encode_items(items: &[Value]) -> Result<String, AppError> {
    Ok(serde_json::to_string(items)?)
}

// ==================== SUB-SCHEMA ====================

/// Block layout used when the field carries no usable schema.
pub fn default_schema() -> BTreeMap<String, FieldDescriptor> {
    BTreeMap::from([
        (
            "title".to_string(),
            FieldDescriptor::new(FieldType::String, "Title"),
        ),
        (
            "subtitle".to_string(),
            FieldDescriptor::new(FieldType::String, "Subtitle"),
        ),
        (
            "text_content".to_string(),
            FieldDescriptor::new(FieldType::Text, "Text content"),
        ),
        (
            "image_url".to_string(),
            FieldDescriptor::new(FieldType::String, "Image"),
        ),
    ])
}

/// Schema type selected by the parent record, if its route uses one.
///
/// The sibling enum may hold a bare value or a picked `{label, value}`.
pub fn schema_type_for(route: &str, values: &FormValues) -> Option<String> {
    if route != MICRORESOURCES_ROUTE {
        return None;
    }
    let selected = match values.get(SCHEMA_TYPE_FIELD)? {
        Value::Object(option) => option.get("value")?,
        bare => bare,
    };
    match selected {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Resolve the sub-field map of a microres field.
///
/// An object schema is used directly. A list schema is searched for the
/// entry whose `type` equals `schema_type`; no match falls back to
/// [`default_schema`], as does a missing or unparseable schema.
pub fn resolve_sub_schema(
    descriptor: Option<&FieldDescriptor>,
    schema_type: Option<&str>,
) -> BTreeMap<String, FieldDescriptor> {
    let Some(raw) = descriptor.and_then(|d| d.schema.as_deref()) else {
        return default_schema();
    };

    let parsed = match serde_json::from_str::<Value>(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Unparseable microres schema, using default: {}", e);
            return default_schema();
        }
    };

    let fields = match parsed {
        Value::Array(entries) => entries
            .into_iter()
            .find(|entry| {
                schema_type.is_some_and(|t| entry.get("type").and_then(Value::as_str) == Some(t))
            })
            .and_then(|entry| entry.get("schema").cloned())
            .map(|schema| match schema {
                Value::String(nested) => serde_json::from_str(&nested).unwrap_or(Value::Null),
                other => other,
            }),
        object @ Value::Object(_) => Some(object),
        _ => None,
    };

    fields
        .and_then(|fields| serde_json::from_value::<BTreeMap<String, FieldDescriptor>>(fields).ok())
        .filter(|fields| !fields.is_empty())
        .unwrap_or_else(default_schema)
}

// ==================== EDITOR ====================

/// Which item the draft will be committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftTarget {
    New,
    Existing(usize),
}

/// Editor over one microres field of a parent form.
#[derive(Debug, Clone)]
pub struct MicroresEditor {
    field: String,
    fields: BTreeMap<String, FieldDescriptor>,
    renderer: FieldRenderer,
    validators: ValidatorSet,
    items: Vec<Value>,
    draft: Option<(DraftTarget, FormValues)>,
}

impl MicroresEditor {
    /// Open the editor for `field` of a parent record on `route`.
    pub fn open(
        route: &str,
        field: &str,
        schema: &ResourceSchema,
        parent: &FormValues,
    ) -> Result<Self, AppError> {
        let schema_type = schema_type_for(route, parent);
        let fields = resolve_sub_schema(schema.fields.get(field), schema_type.as_deref());
        let items = parse_items(parent.get(field).unwrap_or(&Value::Null))?;

        let sub_schema = ResourceSchema {
            fields: fields.clone(),
            ..Default::default()
        };
        tracing::debug!(
            "Microres editor on {}.{} with {} items",
            route,
            field,
            items.len()
        );

        Ok(Self {
            field: field.to_string(),
            renderer: FieldRenderer::compile(&sub_schema),
            validators: ValidatorSet::build(&fields),
            fields,
            items,
            draft: None,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldDescriptor> {
        &self.fields
    }

    /// Renderer for the sub-record form.
    pub fn renderer(&self) -> &FieldRenderer {
        &self.renderer
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// An empty sub-record with every sub-field present.
    pub fn blank_item(&self) -> FormValues {
        self.fields
            .keys()
            .map(|name| (name.clone(), Value::String(String::new())))
            .collect()
    }

    pub fn draft(&self) -> Option<&FormValues> {
        self.draft.as_ref().map(|(_, values)| values)
    }

    pub fn start_add(&mut self) {
        self.draft = Some((DraftTarget::New, self.blank_item()));
    }

    pub fn start_edit(&mut self, index: usize) -> Result<(), AppError> {
        let item = self.item(index)?;
        let values = item.as_object().cloned().unwrap_or_default();
        self.draft = Some((DraftTarget::Existing(index), values));
        Ok(())
    }

    /// Replace the draft values; the caller writes them through the renderer.
    pub fn set_draft(&mut self, values: FormValues) -> Result<(), AppError> {
        match &mut self.draft {
            Some((_, draft)) => {
                *draft = values;
                Ok(())
            }
            None => Err(AppError::Validation("No item is being edited".to_string())),
        }
    }

    pub fn cancel(&mut self) {
        self.draft = None;
    }

    /// Validate the draft and add or replace its item.
    ///
    /// On validation failure the draft is kept and the field errors returned.
    pub fn commit(&mut self, parent: &FormValues) -> Result<FormValues, BTreeMap<String, String>> {
        let Some((target, values)) = self.draft.take() else {
            return Ok(parent.clone());
        };

        let errors = self.validators.validate(&values);
        if !errors.is_empty() {
            self.draft = Some((target, values));
            return Err(errors);
        }

        match target {
            DraftTarget::New => self.items.push(Value::Object(values)),
            DraftTarget::Existing(index) => match self.items.get_mut(index) {
                Some(slot) => *slot = Value::Object(values),
                None => self.items.push(Value::Object(values)),
            },
        }
        Ok(self.write_into(parent))
    }

    /// Remove the item at `index`.
    pub fn remove(&mut self, index: usize, parent: &FormValues) -> Result<FormValues, AppError> {
        self.item(index)?;
        self.items.remove(index);
        if matches!(self.draft, Some((DraftTarget::Existing(i), _)) if i == index) {
            self.draft = None;
        }
        Ok(self.write_into(parent))
    }

    /// Move the item at `from` so it ends at `to`.
    pub fn move_item(
        &mut self,
        from: usize,
        to: usize,
        parent: &FormValues,
    ) -> Result<FormValues, AppError> {
        self.item(from)?;
        if to >= self.items.len() {
            return Err(AppError::Validation(format!(
                "Position {} is out of range",
                to
            )));
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(self.write_into(parent))
    }

    /// The parent values with this field holding the encoded items.
    pub fn write_into(&self, parent: &FormValues) -> FormValues {
        let encoded = encode_items(&self.items).unwrap_or_else(|e| {
            tracing::error!("Failed to encode microres items: {}", e);
            "[]".to_string()
        });
        let mut next = parent.clone();
        next.insert(self.field.clone(), Value::String(encoded));
        next
    }

    fn item(&self, index: usize) -> Result<&Value, AppError> {
        self.items
            .get(index)
            .ok_or_else(|| AppError::Validation(format!("No item at position {}", index)))
    }
}
