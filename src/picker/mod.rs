//! Async search picker over a related resource.
//!
//! Options accumulate page by page for the current input and reset when the
//! input changes. Requests are numbered; a response older than the latest
//! issued request is dropped so a slow early search never overwrites a
//! later one.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::api::ApiClient;
use crate::errors::AppError;
use crate::models::{ListingQuery, PaginatedListing, ResourceSchema};
use crate::schema::SchemaCache;

/// Page size of picker queries.
pub const PICKER_PAGE_SIZE: u32 = 30;

/// Fields searched by, in order of preference; `id` when none exist.
const SEARCH_FIELDS: [&str; 6] = ["name", "title", "value", "subtitle", "city", "description"];

/// Field a picker over `schema` searches by.
pub fn search_field(schema: &ResourceSchema) -> &'static str {
    SEARCH_FIELDS
        .iter()
        .find(|field| schema.fields.contains_key(**field))
        .copied()
        .unwrap_or("id")
}

/// A selectable record.
#[derive(Debug, Clone, PartialEq)]
pub struct PickerOption {
    pub id: String,
    pub label: String,
    pub record: Value,
}

impl PickerOption {
    fn from_record(record: Value) -> Option<Self> {
        let id = match record.get("id")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let label = record
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| id.clone());
        Some(Self { id, label, record })
    }

    /// The record as stored in form state, without server metadata.
    pub fn selected(&self) -> Value {
        let mut record = self.record.clone();
        if let Value::Object(map) = &mut record {
            map.remove("metadata");
        }
        record
    }
}

/// One issued page request.
#[derive(Clone)]
pub struct PickerRequest {
    api: ApiClient,
    route: String,
    input: String,
    query: ListingQuery,
    sequence: u64,
}

/// A fetched page, tagged with the request it answers.
#[derive(Debug)]
pub struct PickerPage {
    sequence: u64,
    input: String,
    listing: PaginatedListing<Value>,
}

impl PickerRequest {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub async fn run(self) -> Result<PickerPage, AppError> {
        let listing = self.api.listing(&self.route, &self.query).await?;
        Ok(PickerPage {
            sequence: self.sequence,
            input: self.input,
            listing,
        })
    }
}

pub struct SearchPicker {
    api: ApiClient,
    route: String,
    search_by: &'static str,
    input: String,
    options: Vec<PickerOption>,
    page: u32,
    last_page: u32,
    issued: AtomicU64,
}

impl SearchPicker {
    pub fn new(api: ApiClient, route: &str, schema: &ResourceSchema) -> Self {
        Self {
            api,
            route: route.trim_start_matches('/').to_string(),
            search_by: search_field(schema),
            input: String::new(),
            options: Vec::new(),
            page: 0,
            last_page: 0,
            issued: AtomicU64::new(0),
        }
    }

    /// A picker over the catalog route serving `related_model`.
    pub async fn for_model(
        api: ApiClient,
        cache: &SchemaCache,
        related_model: &str,
    ) -> Result<Self, AppError> {
        let route = cache.route_for_model(related_model).await.ok_or_else(|| {
            AppError::Schema(format!("No route serves model {}", related_model))
        })?;
        let schema = cache.schema(route.route()).await?;
        Ok(Self::new(api, route.route(), &schema.schema))
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn search_by(&self) -> &str {
        self.search_by
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn options(&self) -> &[PickerOption] {
        &self.options
    }

    pub fn option(&self, id: &str) -> Option<&PickerOption> {
        self.options.iter().find(|option| option.id == id)
    }

    /// Whether another page exists for the current input.
    pub fn has_more(&self) -> bool {
        self.page < self.last_page
    }

    /// Issue a request for `page` of `input`.
    pub fn request(&self, input: &str, page: u32) -> PickerRequest {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let query = ListingQuery::page(page, PICKER_PAGE_SIZE).with_search(
            Some(input.to_string()).filter(|q| !q.is_empty()),
            Some(self.search_by.to_string()),
        );
        PickerRequest {
            api: self.api.clone(),
            route: self.route.clone(),
            input: input.to_string(),
            query,
            sequence,
        }
    }

    /// Apply a fetched page. Returns `false` when it was stale and dropped.
    pub fn apply(&mut self, page: PickerPage) -> bool {
        let latest = self.issued.load(Ordering::SeqCst);
        if page.sequence < latest {
            tracing::debug!(
                "Dropping stale picker response {} (latest {})",
                page.sequence,
                latest
            );
            return false;
        }

        if page.input != self.input || page.listing.current_page <= 1 {
            self.options.clear();
            self.input = page.input;
        }
        self.page = page.listing.current_page;
        self.last_page = page.listing.last_page;

        for record in page.listing.data.unwrap_or_default() {
            if let Some(option) = PickerOption::from_record(record) {
                if !self.options.iter().any(|existing| existing.id == option.id) {
                    self.options.push(option);
                }
            }
        }
        true
    }

    /// Search from the first page.
    pub async fn search(&mut self, input: &str) -> Result<(), AppError> {
        let page = self.request(input, 1).run().await?;
        self.apply(page);
        Ok(())
    }

    /// Append the next page of the current input, if any.
    pub async fn load_more(&mut self) -> Result<(), AppError> {
        if !self.has_more() {
            return Ok(());
        }
        let page = self.request(&self.input, self.page + 1).run().await?;
        self.apply(page);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{FieldDescriptor, FieldType};
    use serde_json::json;

    fn schema(fields: &[&str]) -> ResourceSchema {
        let mut schema = ResourceSchema::default();
        for field in fields {
            schema
                .fields
                .insert(field.to_string(), FieldDescriptor::new(FieldType::String, field));
        }
        schema
    }

    fn picker() -> SearchPicker {
        let api = ApiClient::new(&Config::default()).unwrap();
        SearchPicker::new(api, "/tags", &schema(&["title", "slug"]))
    }

    fn page(sequence: u64, input: &str, current: u32, last: u32, data: Value) -> PickerPage {
        PickerPage {
            sequence,
            input: input.to_string(),
            listing: PaginatedListing {
                current_page: current,
                per_page: PICKER_PAGE_SIZE,
                last_page: last,
                total: 0,
                data: serde_json::from_value(data).unwrap(),
            },
        }
    }

    #[test]
    fn test_search_field_preference() {
        assert_eq!(search_field(&schema(&["city", "title"])), "title");
        assert_eq!(search_field(&schema(&["description"])), "description");
        assert_eq!(search_field(&schema(&["slug"])), "id");
    }

    #[test]
    fn test_request_query() {
        let p = picker();
        assert_eq!(p.route(), "tags");
        let req = p.request("ne", 2);
        assert_eq!(req.sequence(), 1);
        assert_eq!(req.query.perpage, Some(PICKER_PAGE_SIZE));
        assert_eq!(req.query.page, Some(2));
        assert_eq!(req.query.search_by.as_deref(), Some("title"));
        assert_eq!(req.query.query.as_deref(), Some("ne"));
        assert!(p.request("", 1).query.query.is_none());
    }

    #[test]
    fn test_stale_response_dropped() {
        let mut p = picker();
        let first = p.request("n", 1);
        let second = p.request("ne", 1);

        assert!(p.apply(page(second.sequence(), "ne", 1, 1, json!([{"id": "2", "name": "News"}]))));
        assert!(!p.apply(page(first.sequence(), "n", 1, 1, json!([{"id": "1", "name": "Nature"}]))));
        assert_eq!(p.options().len(), 1);
        assert_eq!(p.options()[0].label, "News");
        assert_eq!(p.input(), "ne");
    }

    #[test]
    fn test_pages_accumulate_and_dedupe() {
        let mut p = picker();
        let r1 = p.request("", 1);
        p.apply(page(r1.sequence(), "", 1, 2, json!([{"id": "1", "name": "A"}, {"id": 2}])));
        assert!(p.has_more());

        let r2 = p.request("", 2);
        p.apply(page(r2.sequence(), "", 2, 2, json!([{"id": "2"}, {"id": "3", "name": ""}])));
        assert!(!p.has_more());

        let labels: Vec<&str> = p.options().iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "2", "3"]);

        let r3 = p.request("x", 1);
        p.apply(page(r3.sequence(), "x", 1, 1, json!(null)));
        assert!(p.options().is_empty());
    }

    #[test]
    fn test_selected_strips_metadata() {
        let option = PickerOption::from_record(json!({"id": "t1", "name": "Tag", "metadata": {"n": 1}})).unwrap();
        assert_eq!(option.selected(), json!({"id": "t1", "name": "Tag"}));
        assert!(PickerOption::from_record(json!({"name": "no id"})).is_none());
    }
}
