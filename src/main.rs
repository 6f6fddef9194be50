//! Schema Admin sync tool
//!
//! Loads the resource catalog and every admin schema into the local cache,
//! then logs the widget each visible field resolves to.

use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use schema_admin::api::ApiClient;
use schema_admin::config::Config;
use schema_admin::db::{self, Repository};
use schema_admin::schema::{CompiledSchema, SchemaCache};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Schema Admin sync");
    tracing::info!("API base: {}", config.api_base_url());
    tracing::info!("Cache path: {:?}", config.cache_path);

    if config.api_token.is_none() {
        tracing::warn!("No API token configured (ADMIN_API_TOKEN). Requests are anonymous!");
    }

    // Initialize cache database
    let pool = db::init_database(&config.cache_path).await?;
    let repository = Repository::new(pool);

    let api = ApiClient::new(&config)?;
    let cache = SchemaCache::new(api, repository);
    cache.hydrate().await?;

    let catalog = cache.load_catalog().await?;
    let admin_routes: Vec<_> = catalog.iter().filter(|route| route.in_admin).collect();
    tracing::info!(
        "Catalog has {} routes, {} in admin",
        catalog.len(),
        admin_routes.len()
    );

    cache.warm_admin_routes().await;
    for route in admin_routes {
        match cache.schema(route.route()).await {
            Ok(compiled) => log_widget_plan(&compiled),
            Err(err) => tracing::warn!("Skipping {}: {}", route.route(), err),
        }
    }

    match cache.api_meta().await {
        Ok(meta) => tracing::info!("API metadata describes {} fields", meta.fields.len()),
        Err(err) => tracing::warn!("No API metadata: {}", err),
    }

    Ok(())
}

/// Log the widget of every parameter field of a blank record.
fn log_widget_plan(compiled: &CompiledSchema) {
    tracing::info!(
        "{}: {} fields, {} relations, {} media slots (fetched {})",
        compiled.route,
        compiled.schema.fields.len(),
        compiled.schema.rels.len(),
        compiled.schema.media.len(),
        compiled.fetched_at
    );
    for (name, _) in compiled.schema.parameter_fields() {
        let widget = compiled.renderer.widget(name, Some(&Value::Null));
        tracing::info!("  {} -> {:?}", name, widget);
    }
}
