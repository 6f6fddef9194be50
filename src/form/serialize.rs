//! Submission serialization.
//!
//! Turns form state into the payload the backend expects. Every step leaves
//! already-serialized values untouched, so the pass is idempotent.

use std::collections::BTreeSet;

use serde_json::Value;
use uuid::Uuid;

use crate::fields::FormValues;
use crate::models::ResourceSchema;

/// Attributes a generated slug is derived from, in order of preference.
const SLUG_SOURCES: [&str; 6] = ["title", "name", "value", "city", "rating", "id"];

/// Serialize form values for `POST`/`PATCH`.
pub fn serialize_submission(values: &FormValues, schema: &ResourceSchema) -> FormValues {
    let mut payload = values.clone();
    let mut foreign_keys = BTreeSet::new();
    let mut applicable = BTreeSet::new();

    for key in values.keys() {
        if key == "metadata" {
            continue;
        }

        if let Some(fk) = schema.relation(key).and_then(|rel| rel.foreign_key()) {
            foreign_keys.insert(fk.to_string());
        }

        if key.contains("_enum") {
            unwrap_object_field(&mut payload, key, "value");
        }

        if key.contains("applicable") {
            applicable.insert(key.clone());
            continue;
        }

        if key.contains("_id") {
            unwrap_object_field(&mut payload, key, "id");
        }

        if key.contains("microres_") {
            if let Some(value) = payload.get_mut(key) {
                let empty = match value {
                    Value::Null => true,
                    Value::String(s) => s.trim().is_empty(),
                    Value::Array(items) => items.is_empty(),
                    _ => false,
                };
                let encoded = match value {
                    _ if empty => Some("[]".to_string()),
                    Value::Array(items) => Some(
                        crate::microres::encode_items(items).unwrap_or_else(|_| "[]".to_string()),
                    ),
                    _ => None,
                };
                if let Some(encoded) = encoded {
                    *value = Value::String(encoded);
                }
            }
        }
    }

    for fk in foreign_keys.difference(&applicable) {
        payload.remove(fk);
    }

    for value in payload.values_mut() {
        if let Value::Array(items) = value {
            for item in items.iter_mut() {
                let id = match item {
                    Value::Object(record) => record.get("id").cloned().unwrap_or(Value::Null),
                    _ => continue,
                };
                *item = id;
            }
        }
    }

    payload
}

/// Serialize a create submission: fresh UUID `id` and a generated slug when needed.
pub fn serialize_create(values: &FormValues, schema: &ResourceSchema) -> FormValues {
    let mut payload = serialize_submission(values, schema);
    payload.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    apply_slug(&mut payload, schema);
    payload
}

/// Fill an empty `slug` from the record's naming attributes.
pub fn apply_slug(payload: &mut FormValues, schema: &ResourceSchema) {
    if !schema.fields.contains_key("slug") {
        return;
    }
    let has_slug = matches!(payload.get("slug"), Some(Value::String(s)) if !s.trim().is_empty());
    if has_slug {
        return;
    }

    let source = SLUG_SOURCES.iter().find_map(|key| match payload.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    });

    if let Some(source) = source {
        let slug = slugify(&source);
        tracing::debug!("Generated slug {:?} from {:?}", slug, source);
        payload.insert("slug".to_string(), Value::String(slug));
    }
}

/// Lowercase, hyphen-separated slug. Letters of any script are kept.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Replace an object value by one of its members; bare values are kept.
fn unwrap_object_field(payload: &mut FormValues, key: &str, member: &str) {
    if let Some(value) = payload.get_mut(key) {
        let inner = match value {
            Value::Object(object) => object.get(member).cloned().unwrap_or(Value::Null),
            _ => return,
        };
        *value = inner;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ResourceSchema {
        serde_json::from_value(json!({
            "fields": {
                "title": {"type": "string", "label": "Title"},
                "slug": {"type": "string", "label": "Slug"},
                "category_id": {"type": "string", "label": "Category"},
                "status_enum": {"type": "string", "label": "Status"},
                "microres_blocks": {"type": "text", "label": "Blocks"}
            },
            "rels": {
                "category": ["BelongsTo", "Category", "category_id", "Category"],
                "tags": ["BelongsToMany", "Tag", null, "Tags"]
            }
        }))
        .unwrap()
    }

    fn values(v: Value) -> FormValues {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_submission_steps() {
        let form = values(json!({
            "title": "Hello",
            "metadata": {"views": 3},
            "category": {"id": "c1", "name": "News"},
            "category_id": {"id": "c1"},
            "status_enum": {"label": "Live", "value": "live"},
            "owner_id": {"id": "u1", "name": "Ann"},
            "microres_blocks": null,
            "tags": [{"id": "t1", "name": "a"}, {"id": "t2"}],
            "applicable_regions": [{"id": "r1"}]
        }));

        let payload = serialize_submission(&form, &schema());

        assert_eq!(payload["title"], json!("Hello"));
        assert_eq!(payload["status_enum"], json!("live"));
        assert_eq!(payload["owner_id"], json!("u1"));
        assert_eq!(payload["microres_blocks"], json!("[]"));
        assert_eq!(payload["tags"], json!(["t1", "t2"]));
        assert_eq!(payload["applicable_regions"], json!(["r1"]));
        assert!(!payload.contains_key("category_id"));
        assert_eq!(payload["metadata"], json!({"views": 3}));
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let form = values(json!({
            "title": "Hello",
            "status_enum": {"label": "Live", "value": "live"},
            "owner_id": {"id": "u1"},
            "nullable_id": null,
            "microres_blocks": [{"title": "a"}],
            "tags": [{"id": "t1"}, "t2"],
            "applicable_regions": [{"id": "r1"}]
        }));

        let once = serialize_submission(&form, &schema());
        let twice = serialize_submission(&once, &schema());
        assert_eq!(once, twice);
        assert_eq!(once["microres_blocks"], json!(r#"[{"title":"a"}]"#));
        assert_eq!(once["nullable_id"], json!(null));
    }

    #[test]
    fn test_applicable_foreign_key_survives() {
        let schema: ResourceSchema = serde_json::from_value(json!({
            "fields": {"applicable_zone_id": {"type": "string", "label": "Zone"}},
            "rels": {"zone": ["BelongsTo", "Zone", "applicable_zone_id", "Zone"]}
        }))
        .unwrap();
        let form = values(json!({"zone": {"id": "z"}, "applicable_zone_id": {"id": "z"}}));
        let payload = serialize_submission(&form, &schema);
        assert_eq!(payload["applicable_zone_id"], json!({"id": "z"}));
    }

    #[test]
    fn test_applicable_array_sends_ids() {
        let form = values(json!({
            "applicable_regions": [{"id": "r1", "name": "North"}, {"id": "r2", "name": "South"}]
        }));
        let payload = serialize_submission(&form, &ResourceSchema::default());
        assert_eq!(payload["applicable_regions"], json!(["r1", "r2"]));
    }

    #[test]
    fn test_create_adds_uuid_and_slug() {
        let form = values(json!({"title": "Hello, World  Again!", "slug": ""}));
        let payload = serialize_create(&form, &schema());

        let id = payload["id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(payload["slug"], json!("hello-world-again"));

        let other = serialize_create(&form, &schema());
        assert_ne!(other["id"], payload["id"]);
    }

    #[test]
    fn test_existing_slug_kept() {
        let mut payload = values(json!({"title": "New title", "slug": "old-slug"}));
        apply_slug(&mut payload, &schema());
        assert_eq!(payload["slug"], json!("old-slug"));

        let mut no_slug_field = values(json!({"title": "x"}));
        apply_slug(&mut no_slug_field, &ResourceSchema::default());
        assert!(!no_slug_field.contains_key("slug"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Café au Lait "), "café-au-lait");
        assert_eq!(slugify("Привет мир"), "привет-мир");
        assert_eq!(slugify("--"), "");
    }
}
