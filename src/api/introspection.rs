//! Introspection endpoints.

use super::ApiClient;
use crate::errors::AppError;
use crate::models::{ApiMeta, IntrospectedRoute, ResourceSchema};

impl ApiClient {
    /// GET /introspect - The resource catalog.
    pub async fn introspect_routes(&self) -> Result<Vec<IntrospectedRoute>, AppError> {
        tracing::debug!("GET /introspect");
        let routes: Option<Vec<IntrospectedRoute>> =
            self.send(self.http.get(self.url("introspect"))).await?;
        Ok(routes.unwrap_or_default())
    }

    /// GET /{route}?introspect=true - One resource's schema.
    pub async fn introspect(&self, route: &str) -> Result<ResourceSchema, AppError> {
        tracing::debug!("GET /{}?introspect=true", route);
        let schema: Option<ResourceSchema> = self
            .send(
                self.http
                    .get(self.url(route))
                    .query(&[("introspect", "true")]),
            )
            .await?;
        Ok(schema.unwrap_or_default())
    }

    /// GET /api_meta - Global API metadata.
    pub async fn api_meta(&self) -> Result<ApiMeta, AppError> {
        tracing::debug!("GET /api_meta");
        let meta: Option<ApiMeta> = self.send(self.http.get(self.url("api_meta"))).await?;
        meta.ok_or_else(|| AppError::Schema("Empty API metadata".to_string()))
    }
}
