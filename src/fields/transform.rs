//! Value transforms between form state (wire shape) and widget shape.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::rules::WidgetKind;
use crate::microres;
use crate::models::EnumOption;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Shape of a stored value as the widget consumes it.
///
/// A microres value that does not parse is passed through as stored, so
/// writing it back leaves it intact.
pub fn to_display(kind: WidgetKind, value: &Value, options: &[EnumOption]) -> Value {
    match kind {
        WidgetKind::MicroresList => match microres::parse_items(value) {
            Ok(items) => Value::Array(items),
            Err(err) => {
                tracing::warn!("Malformed microres value kept as stored: {}", err);
                value.clone()
            }
        },
        WidgetKind::Checkbox => Value::Bool(is_truthy(value)),
        WidgetKind::RichText
        | WidgetKind::ImageUpload
        | WidgetKind::FileUpload
        | WidgetKind::MultilineText
        | WidgetKind::TextInput => Value::String(as_text(value)),
        WidgetKind::MultiPicker => match value {
            Value::Array(_) => value.clone(),
            _ => Value::Array(Vec::new()),
        },
        WidgetKind::SinglePicker => match value {
            Value::Object(_) => value.clone(),
            _ => Value::Null,
        },
        WidgetKind::DatePicker => parse_date(value)
            .map(|d| Value::String(d.format(DATE_FORMAT).to_string()))
            .unwrap_or(Value::Null),
        WidgetKind::EnumSelect => match value {
            Value::Object(_) => value.clone(),
            bare => options
                .iter()
                .find(|option| &option.value == bare)
                .map(|option| serde_json::json!({"label": option.label, "value": option.value}))
                .unwrap_or_else(|| bare.clone()),
        },
    }
}

/// Shape a widget's output for storage in form state.
pub fn to_wire(kind: WidgetKind, input: Value) -> Value {
    match kind {
        WidgetKind::MicroresList => match input {
            Value::Array(items) => {
                Value::String(microres::encode_items(&items).unwrap_or_else(|_| "[]".to_string()))
            }
            Value::String(s) if !s.trim().is_empty() => Value::String(s),
            _ => Value::String("[]".to_string()),
        },
        WidgetKind::Checkbox => Value::from(if is_truthy(&input) { 1 } else { 0 }),
        WidgetKind::RichText
        | WidgetKind::ImageUpload
        | WidgetKind::FileUpload
        | WidgetKind::MultilineText
        | WidgetKind::TextInput => Value::String(as_text(&input)),
        WidgetKind::MultiPicker => match input {
            Value::Array(items) => Value::Array(items.into_iter().map(strip_metadata).collect()),
            _ => Value::Array(Vec::new()),
        },
        WidgetKind::SinglePicker => match input {
            Value::Object(_) => strip_metadata(input),
            _ => Value::Null,
        },
        WidgetKind::DatePicker => parse_date(&input)
            .map(|d| Value::String(d.format(DATE_FORMAT).to_string()))
            .unwrap_or(Value::Null),
        WidgetKind::EnumSelect => input,
    }
}

/// Truthiness as the checkbox sees it: `1`, `true`, `"1"`, `"true"`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.as_str(), "1" | "true"),
        _ => false,
    }
}

/// Text shown in a text-like widget; `null` is the empty string.
pub fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Parse the date forms the backend emits: plain dates, RFC 3339 and SQL timestamps.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let raw = value.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Drop the server-computed `metadata` of a picked record.
fn strip_metadata(mut record: Value) -> Value {
    if let Value::Object(map) = &mut record {
        map.remove("metadata");
    }
    record
}
