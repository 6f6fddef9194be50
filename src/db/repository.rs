//! Cache repository keyed by route path.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{ApiMeta, IntrospectedRoute, ResourceSchema};

const CATALOG_KEY: &str = "routes";
const API_META_KEY: &str = "api_meta";

/// A schema read back from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSchema {
    pub schema: ResourceSchema,
    pub fetched_at: String,
}

/// Repository over the local cache database.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== CATALOG ====================

    /// Get the cached resource catalog.
    pub async fn get_catalog(&self) -> Result<Option<Vec<IntrospectedRoute>>, AppError> {
        self.get_document(CATALOG_KEY).await
    }

    /// Replace the cached resource catalog.
    pub async fn put_catalog(&self, routes: &[IntrospectedRoute]) -> Result<(), AppError> {
        self.put_document(CATALOG_KEY, routes).await
    }

    /// Get the cached API metadata.
    pub async fn get_api_meta(&self) -> Result<Option<ApiMeta>, AppError> {
        self.get_document(API_META_KEY).await
    }

    /// Replace the cached API metadata.
    pub async fn put_api_meta(&self, meta: &ApiMeta) -> Result<(), AppError> {
        self.put_document(API_META_KEY, meta).await
    }

    async fn get_document<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let row = sqlx::query("SELECT body FROM documents WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let body: String = row.get("body");
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    async fn put_document<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let body = serde_json::to_string(value)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO documents (key, body, fetched_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, fetched_at = excluded.fetched_at",
        )
        .bind(key)
        .bind(&body)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ==================== SCHEMAS ====================

    /// Get the cached schema of a route.
    pub async fn get_schema(&self, route: &str) -> Result<Option<CachedSchema>, AppError> {
        let row = sqlx::query("SELECT body, fetched_at FROM resource_schemas WHERE route = ?")
            .bind(route)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let body: String = row.get("body");
                Ok(Some(CachedSchema {
                    schema: serde_json::from_str(&body)?,
                    fetched_at: row.get("fetched_at"),
                }))
            }
            None => Ok(None),
        }
    }

    /// Store the schema of a route, returning its fetch timestamp.
    pub async fn put_schema(&self, route: &str, schema: &ResourceSchema) -> Result<String, AppError> {
        let body = serde_json::to_string(schema)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO resource_schemas (route, body, fetched_at) VALUES (?, ?, ?) \
             ON CONFLICT(route) DO UPDATE SET body = excluded.body, fetched_at = excluded.fetched_at",
        )
        .bind(route)
        .bind(&body)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(now)
    }

    /// Routes that have a cached schema.
    pub async fn list_schema_routes(&self) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT route FROM resource_schemas ORDER BY route")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.get("route")).collect())
    }

    /// Drop the cached schema of a route.
    pub async fn delete_schema(&self, route: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM resource_schemas WHERE route = ?")
            .bind(route)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Drop everything cached.
    pub async fn clear(&self) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM resource_schemas")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}
