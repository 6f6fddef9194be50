//! Generic resource CRUD endpoints.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ApiClient;
use crate::errors::AppError;
use crate::models::{ListingQuery, PaginatedListing};

impl ApiClient {
    /// GET /{route} - One page of a listing.
    ///
    /// A `null` body is read as an empty first page.
    pub async fn listing<T: DeserializeOwned>(
        &self,
        route: &str,
        query: &ListingQuery,
    ) -> Result<PaginatedListing<T>, AppError> {
        tracing::debug!("GET /{} {:?}", route, query);
        let listing: Option<PaginatedListing<T>> =
            self.send(self.http.get(self.url(route)).query(query)).await?;
        Ok(listing.unwrap_or_else(|| PaginatedListing::empty(query.perpage.unwrap_or(0))))
    }

    /// GET /{route}/{uuid} - A single record.
    pub async fn get(&self, route: &str, uuid: &str) -> Result<Value, AppError> {
        tracing::debug!("GET /{}/{}", route, uuid);
        let record: Value = self
            .send(self.http.get(self.url(&format!("{}/{}", route, uuid))))
            .await?;
        if record.is_null() {
            return Err(AppError::NotFound(format!("{} {} not found", route, uuid)));
        }
        Ok(record)
    }

    /// POST /{route} - Create a record.
    pub async fn create(&self, route: &str, payload: &Value) -> Result<Value, AppError> {
        tracing::debug!("POST /{}", route);
        self.send(self.http.post(self.url(route)).json(payload)).await
    }

    /// PATCH /{route}/{uuid} - Update a record.
    pub async fn update(&self, route: &str, uuid: &str, payload: &Value) -> Result<Value, AppError> {
        tracing::debug!("PATCH /{}/{}", route, uuid);
        self.send(
            self.http
                .patch(self.url(&format!("{}/{}", route, uuid)))
                .json(payload),
        )
        .await
    }

    /// DELETE /{route}/{uuid} - Delete a record.
    pub async fn delete(&self, route: &str, uuid: &str) -> Result<(), AppError> {
        tracing::debug!("DELETE /{}/{}", route, uuid);
        self.send_unit(self.http.delete(self.url(&format!("{}/{}", route, uuid))))
            .await
    }
}
