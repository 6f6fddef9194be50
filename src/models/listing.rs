//! Paginated listing models.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One page of a larger ordered collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaginatedListing<T> {
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default = "first_page")]
    pub last_page: u32,
    #[serde(default)]
    pub total: u64,
    pub data: Option<Vec<T>>,
}

fn first_page() -> u32 {
    1
}

impl<T> PaginatedListing<T> {
    /// An empty first page, used before anything is loaded and after failures.
    pub fn empty(per_page: u32) -> Self {
        Self {
            current_page: 1,
            per_page,
            last_page: 1,
            total: 0,
            data: Some(Vec::new()),
        }
    }

    pub fn items(&self) -> &[T] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn is_last_page(&self) -> bool {
        self.current_page >= self.last_page
    }
}

/// Query parameters of `GET /{route}`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ListingQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paginate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perpage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(rename = "searchBy", skip_serializing_if = "Option::is_none")]
    pub search_by: Option<String>,
}

impl ListingQuery {
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            page: Some(page),
            paginate: Some(true),
            perpage: Some(per_page),
            ..Default::default()
        }
    }

    pub fn with_search(mut self, query: Option<String>, search_by: Option<String>) -> Self {
        self.query = query.filter(|q| !q.is_empty());
        self.search_by = search_by.filter(|s| !s.is_empty());
        self
    }
}

/// A record of a sortable listing.
///
/// `id` and `sort` are lifted out; every other attribute is kept verbatim so
/// the record can be sent back whole when its sort changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "sort_value")]
    pub sort: i64,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ListItem {
    /// The full record as a JSON object.
    pub fn to_record(&self) -> Value {
        let mut record = self.attributes.clone();
        record.insert("id".to_string(), Value::String(self.id.clone()));
        record.insert("sort".to_string(), Value::from(self.sort));
        Value::Object(record)
    }

    /// Human-readable name, following the usual naming attributes.
    pub fn display_name(&self) -> String {
        ["name", "value", "title", "subtitle", "city"]
            .iter()
            .find_map(|key| match self.attributes.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
            .unwrap_or_else(|| self.id.clone())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("invalid id: {}", other))),
    }
}

/// Sort keys arrive as numbers or numeric strings; both are parsed, never compared as text.
fn sort_value<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.floor() as i64))
            .ok_or_else(|| D::Error::custom(format!("invalid sort: {}", n))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .or_else(|_| s.trim().parse::<f64>().map(|f| f.floor() as i64))
            .map_err(|_| D::Error::custom(format!("invalid sort: {:?}", s))),
        other => Err(D::Error::custom(format!("invalid sort: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_parsed_from_strings_and_numbers() {
        let listing: PaginatedListing<ListItem> = serde_json::from_value(json!({
            "current_page": 2, "per_page": 3, "last_page": 4, "total": 11,
            "data": [
                {"id": "a", "sort": "900", "title": "A"},
                {"id": 7, "sort": 1000},
                {"id": "c", "sort": null}
            ]
        }))
        .unwrap();

        let items = listing.items();
        assert_eq!(items[0].sort, 900);
        assert_eq!(items[1].id, "7");
        assert_eq!(items[1].sort, 1000);
        assert_eq!(items[2].sort, 0);
        assert_eq!(items[0].attributes["title"], json!("A"));
        assert!(!listing.is_last_page());
    }

    #[test]
    fn test_record_keeps_all_attributes() {
        let item: ListItem =
            serde_json::from_value(json!({"id": "x", "sort": 5, "name": "Ex", "flag": 1})).unwrap();
        assert_eq!(
            item.to_record(),
            json!({"id": "x", "sort": 5, "name": "Ex", "flag": 1})
        );
        assert_eq!(item.display_name(), "Ex");
    }

    #[test]
    fn test_null_data_reads_as_empty() {
        let listing: PaginatedListing<ListItem> =
            serde_json::from_value(json!({"current_page": 1, "per_page": 10, "last_page": 1, "total": 0, "data": null}))
                .unwrap();
        assert!(listing.items().is_empty());
    }

    #[test]
    fn test_missing_data_reads_as_empty() {
        let listing: PaginatedListing<ListItem> =
            serde_json::from_value(json!({"current_page": 3, "last_page": 3})).unwrap();
        assert!(listing.data.is_none());
        assert!(listing.items().is_empty());
        assert_eq!(listing.per_page, 0);
        assert!(listing.is_last_page());
    }

    #[test]
    fn test_query_serializes_search_by() {
        let query = ListingQuery::page(2, 30)
            .with_search(Some("bob".to_string()), Some("name".to_string()));
        let encoded = serde_json::to_value(&query).unwrap();
        assert_eq!(
            encoded,
            json!({"page": 2, "paginate": true, "perpage": 30, "query": "bob", "searchBy": "name"})
        );
    }
}
