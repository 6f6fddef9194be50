//! Form controller.
//!
//! Owns one form's values, validation state and submit lifecycle. Create
//! forms take their field map from the schema; edit forms derive it from the
//! keys of the loaded record.

mod serialize;
mod validation;

pub use serialize::{apply_slug, serialize_create, serialize_submission, slugify};
pub use validation::{FieldValidator, ValidatorSet, ValueKind, REQUIRED_MESSAGE};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;

use crate::api::ApiClient;
use crate::errors::AppError;
use crate::fields::{FieldRenderer, FormValues, ResolvedField};
use crate::models::{FieldDescriptor, FieldType, ResourceSchema};
use crate::notifications::Notifier;
use crate::schema::CompiledSchema;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { uuid: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStatus {
    Idle,
    Validating,
    Submitting,
}

/// Field map of an edit form, derived from the record's keys.
///
/// Keys described by the schema keep their descriptor; relation keys get an
/// untyped descriptor so the value picks the picker; anything else is
/// treated as an "applicable" list.
pub fn edit_fields(schema: &ResourceSchema, record: &FormValues) -> BTreeMap<String, FieldDescriptor> {
    record
        .keys()
        .filter(|key| key.as_str() != "metadata")
        .map(|key| {
            let descriptor = if let Some(descriptor) = schema.fields.get(key) {
                descriptor.clone()
            } else if let Some(rel) = schema.relation(key) {
                FieldDescriptor {
                    field_type: None,
                    required: false,
                    label: rel.label().to_string(),
                    show: true,
                    schema: None,
                }
            } else {
                let label = format!("Applicable {}", key.trim_start_matches("applicable_"));
                FieldDescriptor::new(FieldType::Array, &label)
            };
            (key.clone(), descriptor)
        })
        .collect()
}

/// Version and field set the current validators were built for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BuildKey {
    version: u64,
    fields: Vec<String>,
}

pub struct FormController {
    api: ApiClient,
    notifier: Notifier,
    schema: Arc<CompiledSchema>,
    mode: FormMode,
    fields: BTreeMap<String, FieldDescriptor>,
    renderer: FieldRenderer,
    validators: Arc<ValidatorSet>,
    built_for: BuildKey,
    initial: FormValues,
    values: FormValues,
    errors: BTreeMap<String, String>,
    touched: BTreeSet<String>,
    status: FormStatus,
}

impl FormController {
    /// A create form; every schema field starts as an empty string.
    pub fn create(api: ApiClient, notifier: Notifier, schema: Arc<CompiledSchema>) -> Self {
        let initial: FormValues = schema
            .schema
            .fields
            .keys()
            .map(|name| (name.clone(), Value::String(String::new())))
            .collect();

        Self {
            api,
            notifier,
            fields: schema.schema.fields.clone(),
            renderer: schema.renderer.clone(),
            validators: Arc::clone(&schema.validators),
            built_for: BuildKey {
                version: schema.version,
                fields: schema.schema.fields.keys().cloned().collect(),
            },
            schema,
            mode: FormMode::Create,
            values: initial.clone(),
            initial,
            errors: BTreeMap::new(),
            touched: BTreeSet::new(),
            status: FormStatus::Idle,
        }
    }

    /// An edit form over an already loaded record.
    pub fn edit(
        api: ApiClient,
        notifier: Notifier,
        schema: Arc<CompiledSchema>,
        uuid: &str,
        record: FormValues,
    ) -> Self {
        let fields = edit_fields(&schema.schema, &record);
        let mut controller = Self {
            api,
            notifier,
            renderer: FieldRenderer::default(),
            validators: Arc::new(ValidatorSet::default()),
            built_for: BuildKey {
                version: schema.version,
                fields: Vec::new(),
            },
            fields,
            schema,
            mode: FormMode::Edit {
                uuid: uuid.to_string(),
            },
            initial: record.clone(),
            values: record,
            errors: BTreeMap::new(),
            touched: BTreeSet::new(),
            status: FormStatus::Idle,
        };
        controller.rebuild();
        controller
    }

    /// Fetch a record and open an edit form over it.
    pub async fn load(
        api: ApiClient,
        notifier: Notifier,
        schema: Arc<CompiledSchema>,
        uuid: &str,
    ) -> Result<Self, AppError> {
        let record = match api.get(&schema.route, uuid).await {
            Ok(Value::Object(record)) => record,
            Ok(other) => {
                let err = AppError::Serialization(format!(
                    "Record {} of {} is not an object: {}",
                    uuid, schema.route, other
                ));
                notifier.failure(&err);
                return Err(err);
            }
            Err(err) => {
                notifier.failure(&err);
                return Err(err);
            }
        };
        Ok(Self::edit(api, notifier, schema, uuid, record))
    }

    // ==================== SCHEMA ====================

    /// Swap in a newer schema; validators and widgets follow it.
    pub fn set_schema(&mut self, schema: Arc<CompiledSchema>) {
        if let FormMode::Edit { .. } = self.mode {
            self.fields = edit_fields(&schema.schema, &self.values);
        } else {
            self.fields = schema.schema.fields.clone();
        }
        self.schema = schema;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let key = BuildKey {
            version: self.schema.version,
            fields: self.fields.keys().cloned().collect(),
        };
        if key == self.built_for {
            return;
        }

        if self.mode == FormMode::Create && key.fields.iter().eq(self.schema.schema.fields.keys()) {
            self.renderer = self.schema.renderer.clone();
            self.validators = Arc::clone(&self.schema.validators);
        } else {
            let view = ResourceSchema {
                fields: self.fields.clone(),
                rels: self.schema.schema.rels.clone(),
                media: self.schema.schema.media.clone(),
            };
            self.renderer = FieldRenderer::compile(&view);
            self.validators = Arc::new(ValidatorSet::build(&self.fields));
        }
        tracing::debug!(
            "Built {} validators for {} (schema version {})",
            self.validators.len(),
            self.schema.route,
            key.version
        );
        self.built_for = key;
        self.errors = self.validators.validate(&self.values);
        self.errors.retain(|name, _| self.touched.contains(name));
    }

    // ==================== STATE ====================

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldDescriptor> {
        &self.fields
    }

    pub fn renderer(&self) -> &FieldRenderer {
        &self.renderer
    }

    pub fn validators(&self) -> &ValidatorSet {
        &self.validators
    }

    /// Errors of touched fields.
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn touched(&self) -> &BTreeSet<String> {
        &self.touched
    }

    pub fn is_dirty(&self) -> bool {
        self.values != self.initial
    }

    /// Visible fields of the "Parameters" tab, resolved against the values.
    pub fn parameter_fields(&self) -> Vec<ResolvedField> {
        let names: Vec<&str> = self
            .fields
            .iter()
            .filter(|(name, d)| d.show && !self.schema.schema.is_foreign_key(name))
            .map(|(name, _)| name.as_str())
            .collect();
        self.renderer.resolve_all(names, &self.values)
    }

    // ==================== EDITING ====================

    /// Write a widget's output into the form through the field's writer.
    pub fn set_field(&mut self, name: &str, input: Value) {
        self.values = match self.renderer.writer(name, &self.values) {
            Some(writer) => writer.write(&self.values, input),
            None => {
                let mut next = self.values.clone();
                next.insert(name.to_string(), input);
                next
            }
        };
        self.touch(name);
    }

    /// Replace the whole value map, e.g. with a microres editor's output.
    pub fn set_values(&mut self, values: FormValues) {
        self.values = values;
        let touched: Vec<String> = self.touched.iter().cloned().collect();
        for name in touched {
            self.refresh_error(&name);
        }
    }

    /// Mark a field touched and validate it.
    pub fn touch(&mut self, name: &str) {
        self.touched.insert(name.to_string());
        self.refresh_error(name);
    }

    fn refresh_error(&mut self, name: &str) {
        match self.validators.validate_field(name, &self.values) {
            Some(message) => {
                self.errors.insert(name.to_string(), message);
            }
            None => {
                self.errors.remove(name);
            }
        }
    }

    /// Validate every field, touching all of them.
    pub fn validate(&mut self) -> bool {
        self.touched.extend(self.fields.keys().cloned());
        self.errors = self.validators.validate(&self.values);
        self.errors.is_empty()
    }

    /// Whether a submit would be attempted right now.
    pub fn can_submit(&self) -> bool {
        self.status == FormStatus::Idle && self.validators.validate(&self.values).is_empty()
    }

    /// Back to the initial values with no errors.
    pub fn reset(&mut self) {
        self.values = self.initial.clone();
        self.errors.clear();
        self.touched.clear();
    }

    /// The payload a submit would send.
    pub fn payload(&self) -> FormValues {
        match self.mode {
            FormMode::Create => serialize_create(&self.values, &self.schema.schema),
            FormMode::Edit { .. } => serialize_submission(&self.values, &self.schema.schema),
        }
    }

    // ==================== SUBMIT ====================

    /// Validate and persist the form.
    ///
    /// Refused while another submit runs. Create forms reset on success;
    /// edit forms keep their values.
    pub async fn submit(&mut self) -> Result<Value, AppError> {
        if self.status != FormStatus::Idle {
            return Err(AppError::Validation(
                "A submission is already in progress".to_string(),
            ));
        }

        self.status = FormStatus::Validating;
        if !self.validate() {
            self.status = FormStatus::Idle;
            tracing::debug!("Submit refused, {} invalid fields", self.errors.len());
            return Err(AppError::Validation(format!(
                "{} fields are invalid",
                self.errors.len()
            )));
        }

        self.status = FormStatus::Submitting;
        let payload = Value::Object(self.payload());
        let route = self.schema.route.clone();
        let result = match &self.mode {
            FormMode::Create => self.api.create(&route, &payload).await,
            FormMode::Edit { uuid } => self.api.update(&route, uuid, &payload).await,
        };
        self.status = FormStatus::Idle;

        match result {
            Ok(saved) => {
                match self.mode {
                    FormMode::Create => {
                        tracing::info!("Created record in {}", route);
                        self.notifier.success("Record created");
                        self.reset();
                    }
                    FormMode::Edit { .. } => {
                        tracing::info!("Updated record in {}", route);
                        self.notifier.success("Changes saved");
                    }
                }
                Ok(saved)
            }
            Err(err) => {
                tracing::warn!("Submit to {} failed: {}", route, err);
                self.notifier.failure(&err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    fn compiled(version: u64) -> Arc<CompiledSchema> {
        let schema: ResourceSchema = serde_json::from_value(json!({
            "fields": {
                "title": {"type": "string", "label": "Title", "required": true},
                "active": {"type": "boolean", "label": "Active", "required": true},
                "category_id": {"type": "string", "label": "Category"}
            },
            "rels": {"category": ["BelongsTo", "Category", "category_id", "Category"]}
        }))
        .unwrap();
        Arc::new(CompiledSchema::compile("articles", schema, version, String::new()))
    }

    fn api() -> ApiClient {
        ApiClient::new(&Config::default()).unwrap()
    }

    fn values(v: Value) -> FormValues {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_edit_fields_from_record_keys() {
        let schema = compiled(1);
        let fields = edit_fields(
            &schema.schema,
            &values(json!({
                "title": "x",
                "category": {"id": "c"},
                "applicable_regions": [],
                "metadata": {}
            })),
        );
        assert_eq!(fields["title"].label, "Title");
        assert_eq!(fields["category"].label, "Category");
        assert!(fields["category"].field_type.is_none());
        assert_eq!(fields["applicable_regions"].label, "Applicable regions");
        assert!(fields["applicable_regions"].is_type(&FieldType::Array));
        assert!(!fields.contains_key("metadata"));
    }

    #[test]
    fn test_create_form_starts_blank_and_invalid() {
        let (notifier, _rx) = Notifier::channel();
        let mut form = FormController::create(api(), notifier, compiled(1));
        assert_eq!(form.values()["title"], json!(""));
        assert!(!form.can_submit());

        form.set_field("title", json!("Hello"));
        assert!(form.errors().is_empty());
        assert!(!form.can_submit());

        form.set_field("active", json!(false));
        assert_eq!(form.values()["active"], json!(0));
        assert!(form.can_submit());
        assert!(form.is_dirty());

        form.reset();
        assert_eq!(form.values()["title"], json!(""));
        assert!(form.touched().is_empty());
    }

    #[test]
    fn test_touch_reports_required() {
        let (notifier, _rx) = Notifier::channel();
        let mut form = FormController::create(api(), notifier, compiled(1));
        form.touch("title");
        assert_eq!(form.errors()["title"], REQUIRED_MESSAGE);
        assert!(!form.errors().contains_key("active"));
    }

    #[test]
    fn test_parameter_fields_exclude_foreign_keys() {
        let (notifier, _rx) = Notifier::channel();
        let form = FormController::create(api(), notifier, compiled(1));
        let names: Vec<String> = form.parameter_fields().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["active".to_string(), "title".to_string()]);
    }

    #[test]
    fn test_new_schema_version_rebuilds_validators() {
        let (notifier, _rx) = Notifier::channel();
        let mut form = FormController::create(api(), notifier, compiled(1));
        let first = Arc::clone(&form.validators);

        form.set_schema(compiled(1));
        assert!(Arc::ptr_eq(&first, &form.validators));

        let mut schema = (*compiled(2)).clone();
        schema
            .schema
            .fields
            .insert("rating".to_string(), FieldDescriptor::new(FieldType::Integer, "Rating"));
        let schema = Arc::new(CompiledSchema::compile("articles", schema.schema, 2, String::new()));
        form.set_schema(schema);
        assert!(form.validators().get("rating").is_some());
    }

    #[tokio::test]
    async fn test_invalid_submit_is_refused_without_request() {
        let (notifier, mut rx) = Notifier::channel();
        let mut form = FormController::create(api(), notifier, compiled(1));
        let err = form.submit().await.unwrap_err();
        assert_eq!(err.error_code(), crate::errors::codes::VALIDATION_ERROR);
        assert_eq!(form.status(), FormStatus::Idle);
        assert!(form.errors().contains_key("title"));
        assert!(rx.try_recv().is_err());
    }
}
