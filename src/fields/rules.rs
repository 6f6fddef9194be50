//! The ordered widget rule table.
//!
//! Rules are evaluated top to bottom and the first match wins. Name rules
//! and type rules are interleaved on purpose: `microres_text_content` must
//! resolve to a sub-list, a boolean `image_url` to a checkbox.

use serde_json::Value;

use crate::models::{FieldDescriptor, FieldType};

/// Widget families, one per rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    MicroresList,
    Checkbox,
    RichText,
    ImageUpload,
    FileUpload,
    MultilineText,
    MultiPicker,
    SinglePicker,
    DatePicker,
    EnumSelect,
    TextInput,
}

/// Name-derived facts, computed once per field per schema load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameTraits {
    pub microres: bool,
    pub text_content: bool,
    pub image_url: bool,
    pub media_url: bool,
    pub date_like: bool,
    pub enumerated: bool,
    pub read_only: bool,
}

impl NameTraits {
    pub fn of(name: &str) -> Self {
        Self {
            microres: name.contains("microres_"),
            text_content: name.contains("text_content"),
            image_url: name.contains("image_url"),
            media_url: name.contains("media_url"),
            date_like: name.contains("_at") || name == "date",
            enumerated: name.contains("_enum"),
            read_only: name.contains("_at") || name.contains("_id") || name == "id",
        }
    }
}

/// Everything a rule may inspect.
pub struct RuleInput<'a> {
    pub traits: NameTraits,
    pub descriptor: Option<&'a FieldDescriptor>,
    pub value: &'a Value,
}

impl RuleInput<'_> {
    fn has_type(&self, field_type: &FieldType) -> bool {
        self.descriptor.is_some_and(|d| d.is_type(field_type))
    }

    fn type_absent(&self) -> bool {
        self.descriptor.map_or(true, |d| d.field_type.is_none())
    }
}

pub struct Rule {
    pub kind: WidgetKind,
    pub matches: fn(&RuleInput<'_>) -> bool,
}

/// Priority-ordered rules; [`WidgetKind::TextInput`] is the fallback.
pub const RULES: &[Rule] = &[
    Rule {
        kind: WidgetKind::MicroresList,
        matches: |i| i.traits.microres,
    },
    Rule {
        kind: WidgetKind::Checkbox,
        matches: |i| i.has_type(&FieldType::Boolean),
    },
    Rule {
        kind: WidgetKind::RichText,
        matches: |i| i.traits.text_content,
    },
    Rule {
        kind: WidgetKind::ImageUpload,
        matches: |i| i.traits.image_url,
    },
    Rule {
        kind: WidgetKind::FileUpload,
        matches: |i| i.traits.media_url,
    },
    Rule {
        kind: WidgetKind::MultilineText,
        matches: |i| i.has_type(&FieldType::Text),
    },
    Rule {
        kind: WidgetKind::MultiPicker,
        matches: |i| i.has_type(&FieldType::Array) || i.value.is_array(),
    },
    Rule {
        kind: WidgetKind::SinglePicker,
        matches: |i| i.has_type(&FieldType::Object) || (i.type_absent() && i.value.is_object()),
    },
    Rule {
        kind: WidgetKind::DatePicker,
        matches: |i| i.traits.date_like,
    },
    Rule {
        kind: WidgetKind::EnumSelect,
        matches: |i| i.traits.enumerated,
    },
];

/// First matching rule, or the plain text fallback.
pub fn select(input: &RuleInput<'_>) -> WidgetKind {
    RULES
        .iter()
        .find(|rule| (rule.matches)(input))
        .map(|rule| rule.kind)
        .unwrap_or(WidgetKind::TextInput)
}
