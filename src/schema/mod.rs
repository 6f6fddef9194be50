//! Schema cache.
//!
//! Holds the resource catalog and every loaded route schema, compiled into
//! field plans and validators. Lookups go memory, then network, then the
//! SQLite cache. Entries are never invalidated automatically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::api::ApiClient;
use crate::db::Repository;
use crate::errors::AppError;
use crate::fields::FieldRenderer;
use crate::form::ValidatorSet;
use crate::models::{ApiMeta, IntrospectedRoute, ResourceSchema};

/// A route schema with everything derived from it.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub route: String,
    pub schema: ResourceSchema,
    pub renderer: FieldRenderer,
    /// Validators of the schema's own field map
    pub validators: Arc<ValidatorSet>,
    /// Unique per compilation; a new load always gets a new version
    pub version: u64,
    pub fetched_at: String,
}

impl CompiledSchema {
    pub fn compile(route: &str, schema: ResourceSchema, version: u64, fetched_at: String) -> Self {
        Self {
            route: route.to_string(),
            renderer: FieldRenderer::compile(&schema),
            validators: Arc::new(ValidatorSet::build(&schema.fields)),
            schema,
            version,
            fetched_at,
        }
    }
}

#[derive(Default)]
struct CacheState {
    catalog: Vec<IntrospectedRoute>,
    schemas: HashMap<String, Arc<CompiledSchema>>,
    api_meta: Option<ApiMeta>,
}

/// Whether a failed fetch may be answered from the local cache.
fn can_fall_back(err: &AppError) -> bool {
    matches!(
        err,
        AppError::Network(_) | AppError::Server { .. } | AppError::Serialization(_)
    )
}

/// Shared cache of catalog and schemas.
pub struct SchemaCache {
    api: ApiClient,
    repository: Repository,
    state: RwLock<CacheState>,
    next_version: AtomicU64,
}

impl SchemaCache {
    pub fn new(api: ApiClient, repository: Repository) -> Arc<Self> {
        Arc::new(Self {
            api,
            repository,
            state: RwLock::new(CacheState::default()),
            next_version: AtomicU64::new(1),
        })
    }

    /// Load everything persisted into memory, for starting offline.
    ///
    /// Returns the number of schemas loaded.
    pub async fn hydrate(&self) -> Result<usize, AppError> {
        let catalog = self.repository.get_catalog().await?.unwrap_or_default();
        let api_meta = self.repository.get_api_meta().await?;
        let routes = self.repository.list_schema_routes().await?;

        let mut schemas = HashMap::new();
        for route in routes {
            if let Some(cached) = self.repository.get_schema(&route).await? {
                let compiled = self.compile(&route, cached.schema, cached.fetched_at);
                schemas.insert(route, Arc::new(compiled));
            }
        }

        let count = schemas.len();
        let mut state = self.state.write().await;
        state.catalog = catalog;
        state.schemas = schemas;
        state.api_meta = api_meta;
        tracing::info!(
            "Hydrated schema cache: {} routes, {} schemas",
            state.catalog.len(),
            count
        );
        Ok(count)
    }

    fn compile(&self, route: &str, schema: ResourceSchema, fetched_at: String) -> CompiledSchema {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        CompiledSchema::compile(route, schema, version, fetched_at)
    }

    // ==================== CATALOG ====================

    /// Fetch the catalog, falling back to the persisted one when offline.
    pub async fn load_catalog(&self) -> Result<Vec<IntrospectedRoute>, AppError> {
        let catalog = match self.api.introspect_routes().await {
            Ok(routes) => {
                if let Err(err) = self.repository.put_catalog(&routes).await {
                    tracing::warn!("Could not persist catalog: {}", err);
                }
                tracing::info!("Loaded catalog of {} routes", routes.len());
                routes
            }
            Err(err) if can_fall_back(&err) => match self.repository.get_catalog().await? {
                Some(routes) => {
                    tracing::warn!("Catalog fetch failed ({}), using cached catalog", err);
                    routes
                }
                None => return Err(err),
            },
            Err(err) => return Err(err),
        };

        self.state.write().await.catalog = catalog.clone();
        Ok(catalog)
    }

    /// The catalog currently in memory.
    pub async fn catalog(&self) -> Vec<IntrospectedRoute> {
        self.state.read().await.catalog.clone()
    }

    /// Catalog entry serving `model_name`.
    pub async fn route_for_model(&self, model_name: &str) -> Option<IntrospectedRoute> {
        self.state
            .read()
            .await
            .catalog
            .iter()
            .find(|route| route.model_name == model_name)
            .cloned()
    }

    // ==================== SCHEMAS ====================

    /// Schema of a route: memory, then network, then the local cache.
    pub async fn schema(&self, route: &str) -> Result<Arc<CompiledSchema>, AppError> {
        let route = route.trim_start_matches('/');
        if let Some(compiled) = self.state.read().await.schemas.get(route) {
            return Ok(Arc::clone(compiled));
        }

        match self.fetch(route).await {
            Ok(compiled) => Ok(compiled),
            Err(err) if can_fall_back(&err) => match self.repository.get_schema(route).await? {
                Some(cached) => {
                    tracing::warn!("Schema fetch for {} failed ({}), using cached copy", route, err);
                    let compiled = Arc::new(self.compile(route, cached.schema, cached.fetched_at));
                    self.state
                        .write()
                        .await
                        .schemas
                        .insert(route.to_string(), Arc::clone(&compiled));
                    Ok(compiled)
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    async fn fetch(&self, route: &str) -> Result<Arc<CompiledSchema>, AppError> {
        let schema = self.api.introspect(route).await?;
        schema.validate()?;

        let fetched_at = match self.repository.put_schema(route, &schema).await {
            Ok(fetched_at) => fetched_at,
            Err(err) => {
                tracing::warn!("Could not persist schema of {}: {}", route, err);
                Utc::now().to_rfc3339()
            }
        };

        let compiled = Arc::new(self.compile(route, schema, fetched_at));
        tracing::debug!(
            "Compiled schema for {} (version {}, {} fields)",
            route,
            compiled.version,
            compiled.schema.fields.len()
        );
        self.state
            .write()
            .await
            .schemas
            .insert(route.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Load the schema of every admin route in the catalog.
    ///
    /// Failures are logged per route; returns the number loaded.
    pub async fn warm_admin_routes(&self) -> usize {
        let routes: Vec<String> = self
            .catalog()
            .await
            .iter()
            .filter(|route| route.in_admin)
            .map(|route| route.route().to_string())
            .collect();

        let mut loaded = 0;
        for route in &routes {
            match self.schema(route).await {
                Ok(_) => loaded += 1,
                Err(err) => tracing::warn!("Failed to load schema of {}: {}", route, err),
            }
        }
        tracing::info!("Warmed {}/{} admin schemas", loaded, routes.len());
        loaded
    }

    /// Forget a route's schema in memory and on disk.
    pub async fn invalidate(&self, route: &str) -> Result<(), AppError> {
        let route = route.trim_start_matches('/');
        self.state.write().await.schemas.remove(route);
        self.repository.delete_schema(route).await?;
        tracing::info!("Invalidated schema of {}", route);
        Ok(())
    }

    /// Re-fetch a route's schema; the old entry stays if the fetch fails.
    pub async fn refresh(&self, route: &str) -> Result<Arc<CompiledSchema>, AppError> {
        self.fetch(route.trim_start_matches('/')).await
    }

    /// Drop everything, in memory and on disk.
    pub async fn clear(&self) -> Result<(), AppError> {
        *self.state.write().await = CacheState::default();
        self.repository.clear().await?;
        tracing::info!("Cleared schema cache");
        Ok(())
    }

    /// Global API metadata: memory, then network, then the local cache.
    pub async fn api_meta(&self) -> Result<ApiMeta, AppError> {
        if let Some(meta) = &self.state.read().await.api_meta {
            return Ok(meta.clone());
        }

        let meta = match self.api.api_meta().await {
            Ok(meta) => {
                self.repository.put_api_meta(&meta).await?;
                meta
            }
            Err(err) if can_fall_back(&err) => match self.repository.get_api_meta().await? {
                Some(meta) => {
                    tracing::warn!("API metadata fetch failed ({}), using cached copy", err);
                    meta
                }
                None => return Err(err),
            },
            Err(err) => return Err(err),
        };

        self.state.write().await.api_meta = Some(meta.clone());
        Ok(meta)
    }
}
