//! Field renderer.
//!
//! Maps `(name, descriptor, value)` to a widget and the value transforms
//! between form state and that widget. Name traits and relation targets are
//! compiled once per schema load; only the value-dependent rules run per call.

mod rules;
mod transform;

pub use rules::{NameTraits, WidgetKind};
pub use transform::{as_text, is_truthy, parse_date};

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::models::{EnumOption, FieldDescriptor, ResourceSchema};
use rules::RuleInput;

/// The whole value map of one form.
pub type FormValues = Map<String, Value>;

/// A widget choice with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    /// The value is not loaded yet
    Placeholder,
    MicroresList,
    Checkbox,
    RichText,
    ImageUpload,
    FileUpload,
    MultilineText { disabled: bool },
    MultiPicker { related_model: Option<String> },
    SinglePicker { related_model: Option<String> },
    DatePicker,
    EnumSelect { options: Vec<EnumOption> },
    TextInput { disabled: bool },
}

impl Widget {
    pub fn kind(&self) -> Option<WidgetKind> {
        Some(match self {
            Widget::Placeholder => return None,
            Widget::MicroresList => WidgetKind::MicroresList,
            Widget::Checkbox => WidgetKind::Checkbox,
            Widget::RichText => WidgetKind::RichText,
            Widget::ImageUpload => WidgetKind::ImageUpload,
            Widget::FileUpload => WidgetKind::FileUpload,
            Widget::MultilineText { .. } => WidgetKind::MultilineText,
            Widget::MultiPicker { .. } => WidgetKind::MultiPicker,
            Widget::SinglePicker { .. } => WidgetKind::SinglePicker,
            Widget::DatePicker => WidgetKind::DatePicker,
            Widget::EnumSelect { .. } => WidgetKind::EnumSelect,
            Widget::TextInput { .. } => WidgetKind::TextInput,
        })
    }
}

/// Per-field facts fixed for the lifetime of a schema.
#[derive(Debug, Clone)]
struct FieldPlan {
    traits: NameTraits,
    descriptor: FieldDescriptor,
    related_model: Option<String>,
    options: Vec<EnumOption>,
}

/// A field resolved against the current form values.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub name: String,
    pub label: String,
    pub widget: Widget,
    /// The value in the shape the widget consumes
    pub display: Value,
}

/// Merges one field's widget output into a whole form map.
#[derive(Debug, Clone)]
pub struct FieldWriter {
    field: String,
    kind: WidgetKind,
}

impl FieldWriter {
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Return the entire new value map with this field replaced.
    pub fn write(&self, values: &FormValues, input: Value) -> FormValues {
        let mut next = values.clone();
        next.insert(self.field.clone(), transform::to_wire(self.kind, input));
        next
    }
}

/// Widget resolution compiled from one schema.
#[derive(Debug, Clone, Default)]
pub struct FieldRenderer {
    plans: BTreeMap<String, FieldPlan>,
    related: BTreeMap<String, String>,
}

impl FieldRenderer {
    pub fn compile(schema: &ResourceSchema) -> Self {
        let related: BTreeMap<String, String> = schema
            .rels
            .iter()
            .map(|(name, rel)| (name.clone(), rel.related_model().to_string()))
            .collect();

        let plans = schema
            .fields
            .iter()
            .map(|(name, descriptor)| {
                let traits = NameTraits::of(name);
                let options = if traits.enumerated {
                    descriptor.enum_options()
                } else {
                    Vec::new()
                };
                let plan = FieldPlan {
                    traits,
                    descriptor: descriptor.clone(),
                    related_model: related.get(name).cloned(),
                    options,
                };
                (name.clone(), plan)
            })
            .collect();

        Self { plans, related }
    }

    /// Label of a field; unknown fields fall back to their name.
    pub fn label(&self, name: &str) -> String {
        self.plans
            .get(name)
            .map(|plan| plan.descriptor.label.clone())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| name.to_string())
    }

    /// Pick the widget of `name` for its current value.
    ///
    /// `None` means the value is not loaded yet and yields a placeholder.
    pub fn widget(&self, name: &str, value: Option<&Value>) -> Widget {
        let Some(value) = value else {
            return Widget::Placeholder;
        };

        let plan = self.plans.get(name);
        let traits = plan.map(|p| p.traits).unwrap_or_else(|| NameTraits::of(name));
        let kind = rules::select(&RuleInput {
            traits,
            descriptor: plan.map(|p| &p.descriptor),
            value,
        });
        let related_model = plan
            .and_then(|p| p.related_model.clone())
            .or_else(|| self.related.get(name).cloned());

        match kind {
            WidgetKind::MicroresList => Widget::MicroresList,
            WidgetKind::Checkbox => Widget::Checkbox,
            WidgetKind::RichText => Widget::RichText,
            WidgetKind::ImageUpload => Widget::ImageUpload,
            WidgetKind::FileUpload => Widget::FileUpload,
            WidgetKind::MultilineText => Widget::MultilineText {
                disabled: traits.read_only,
            },
            WidgetKind::MultiPicker => Widget::MultiPicker { related_model },
            WidgetKind::SinglePicker => Widget::SinglePicker { related_model },
            WidgetKind::DatePicker => Widget::DatePicker,
            WidgetKind::EnumSelect => Widget::EnumSelect {
                options: plan.map(|p| p.options.clone()).unwrap_or_default(),
            },
            WidgetKind::TextInput => Widget::TextInput {
                disabled: traits.read_only,
            },
        }
    }

    /// Resolve a field against the whole value map.
    pub fn resolve(&self, name: &str, values: &FormValues) -> ResolvedField {
        let value = values.get(name);
        let widget = self.widget(name, value);
        let display = match (widget.kind(), value) {
            (Some(kind), Some(value)) => {
                let options = match &widget {
                    Widget::EnumSelect { options } => options.as_slice(),
                    _ => &[],
                };
                transform::to_display(kind, value, options)
            }
            _ => Value::Null,
        };

        ResolvedField {
            name: name.to_string(),
            label: self.label(name),
            widget,
            display,
        }
    }

    /// Resolve every named field, in the given order.
    pub fn resolve_all<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
        values: &FormValues,
    ) -> Vec<ResolvedField> {
        names
            .into_iter()
            .map(|name| self.resolve(name, values))
            .collect()
    }

    /// A writer for `name`, bound to the widget its current value selects.
    ///
    /// Returns `None` while the value is still loading.
    pub fn writer(&self, name: &str, values: &FormValues) -> Option<FieldWriter> {
        let kind = self.widget(name, values.get(name)).kind()?;
        Some(FieldWriter {
            field: name.to_string(),
            kind,
        })
    }
}
