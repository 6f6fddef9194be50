//! Validators derived from field descriptors.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::fields::FormValues;
use crate::models::{FieldDescriptor, FieldType};

pub const REQUIRED_MESSAGE: &str = "field is required";

/// Primitive a field's value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    Integer,
    Boolean,
    /// Composite or unknown values; only presence is checked
    Mixed,
}

impl ValueKind {
    fn for_field(name: &str, descriptor: &FieldDescriptor) -> Self {
        // Relation ids and enums hold picked objects, not their declared primitive.
        if name.contains("_id") || name.contains("_enum") {
            return ValueKind::Mixed;
        }
        match descriptor.field_type {
            Some(FieldType::String) | Some(FieldType::Text) => ValueKind::String,
            Some(FieldType::Number) | Some(FieldType::Float) | Some(FieldType::Decimal) => {
                ValueKind::Number
            }
            Some(FieldType::Integer) => ValueKind::Integer,
            Some(FieldType::Boolean) => ValueKind::Boolean,
            _ => ValueKind::Mixed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldValidator {
    pub kind: ValueKind,
    pub required: bool,
    pub label: String,
}

impl FieldValidator {
    /// Check one value; `None` is a field absent from the map.
    pub fn check(&self, value: Option<&Value>) -> Result<(), String> {
        let value = match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(v) => Some(v),
        };

        let Some(value) = value else {
            return if self.required {
                Err(REQUIRED_MESSAGE.to_string())
            } else {
                Ok(())
            };
        };

        let ok = match self.kind {
            ValueKind::String => matches!(value, Value::String(_) | Value::Number(_)),
            ValueKind::Number => as_number(value).is_some(),
            ValueKind::Integer => as_number(value).is_some_and(|n| n.fract() == 0.0),
            ValueKind::Boolean => match value {
                Value::Bool(_) => true,
                Value::Number(n) => matches!(n.as_i64(), Some(0) | Some(1)),
                Value::String(s) => matches!(s.as_str(), "true" | "false" | "1" | "0"),
                _ => false,
            },
            ValueKind::Mixed => true,
        };

        if ok {
            Ok(())
        } else {
            Err(self.type_message())
        }
    }

    fn type_message(&self) -> String {
        let expected = match self.kind {
            ValueKind::String => "a string",
            ValueKind::Number => "a number",
            ValueKind::Integer => "an integer",
            ValueKind::Boolean => "a boolean",
            ValueKind::Mixed => "a value",
        };
        format!("\"{}\" must be {}", self.label, expected)
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Validators for every visible field of a field map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatorSet {
    validators: BTreeMap<String, FieldValidator>,
}

impl ValidatorSet {
    /// Build validators; hidden fields get none.
    pub fn build(fields: &BTreeMap<String, FieldDescriptor>) -> Self {
        let validators = fields
            .iter()
            .filter(|(_, descriptor)| descriptor.show)
            .map(|(name, descriptor)| {
                let validator = FieldValidator {
                    kind: ValueKind::for_field(name, descriptor),
                    required: descriptor.required,
                    label: if descriptor.label.is_empty() {
                        name.clone()
                    } else {
                        descriptor.label.clone()
                    },
                };
                (name.clone(), validator)
            })
            .collect();

        Self { validators }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValidator> {
        self.validators.get(name)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Error of a single field, if any.
    pub fn validate_field(&self, name: &str, values: &FormValues) -> Option<String> {
        self.validators
            .get(name)
            .and_then(|validator| validator.check(values.get(name)).err())
    }

    /// Errors of every invalid field.
    pub fn validate(&self, values: &FormValues) -> BTreeMap<String, String> {
        self.validators
            .iter()
            .filter_map(|(name, validator)| {
                validator
                    .check(values.get(name))
                    .err()
                    .map(|message| (name.clone(), message))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: Vec<(&str, FieldDescriptor)>) -> BTreeMap<String, FieldDescriptor> {
        pairs
            .into_iter()
            .map(|(n, d)| (n.to_string(), d))
            .collect()
    }

    fn values(v: Value) -> FormValues {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_required_boolean_missing_fails_false_passes() {
        let set = ValidatorSet::build(&fields(vec![(
            "active",
            FieldDescriptor::new(FieldType::Boolean, "Active").required(),
        )]));

        let errors = set.validate(&FormValues::new());
        assert_eq!(errors["active"], REQUIRED_MESSAGE);

        assert!(set.validate(&values(json!({"active": false}))).is_empty());
        assert!(set.validate(&values(json!({"active": 0}))).is_empty());
    }

    #[test]
    fn test_id_and_enum_are_passthrough() {
        let set = ValidatorSet::build(&fields(vec![
            ("category_id", FieldDescriptor::new(FieldType::Integer, "Category")),
            ("kind_enum", FieldDescriptor::new(FieldType::String, "Kind")),
        ]));
        assert_eq!(set.get("category_id").unwrap().kind, ValueKind::Mixed);
        assert_eq!(set.get("kind_enum").unwrap().kind, ValueKind::Mixed);
        assert!(set
            .validate(&values(json!({"category_id": {"id": "c"}, "kind_enum": {"value": "a"}})))
            .is_empty());
    }

    #[test]
    fn test_hidden_fields_have_no_validator() {
        let set = ValidatorSet::build(&fields(vec![(
            "secret",
            FieldDescriptor::new(FieldType::Integer, "Secret").required().hidden(),
        )]));
        assert!(set.is_empty());
    }

    #[test]
    fn test_type_errors_name_the_label() {
        let set = ValidatorSet::build(&fields(vec![
            ("rating", FieldDescriptor::new(FieldType::Integer, "Rating")),
            ("price", FieldDescriptor::new(FieldType::Decimal, "Price")),
            ("title", FieldDescriptor::new(FieldType::String, "Title")),
        ]));
        let errors = set.validate(&values(json!({"rating": 2.5, "price": "abc", "title": ["x"]})));
        assert_eq!(errors["rating"], "\"Rating\" must be an integer");
        assert_eq!(errors["price"], "\"Price\" must be a number");
        assert_eq!(errors["title"], "\"Title\" must be a string");

        assert!(set
            .validate(&values(json!({"rating": "3", "price": "9.99", "title": 12})))
            .is_empty());
    }

    #[test]
    fn test_optional_fields_accept_empty() {
        let set = ValidatorSet::build(&fields(vec![(
            "rating",
            FieldDescriptor::new(FieldType::Number, "Rating"),
        )]));
        assert!(set.validate(&values(json!({"rating": ""}))).is_empty());
        assert!(set.validate(&values(json!({"rating": null}))).is_empty());
    }

    #[test]
    fn test_required_string_rejects_empty() {
        let set = ValidatorSet::build(&fields(vec![(
            "title",
            FieldDescriptor::new(FieldType::String, "Title").required(),
        )]));
        assert_eq!(
            set.validate_field("title", &values(json!({"title": ""}))),
            Some(REQUIRED_MESSAGE.to_string())
        );
    }
}
