//! Demo server: loads every resource description from RESOURCES_DIR, mounts one
//! controller per resource plus the common routes, and serves them.
//! Uses Postgres when DATABASE_URL is set, otherwise the in-memory store.

use axum::Router;
use schema_resource::{
    common_routes, load_dir, resource_routes, DocumentStore, MemoryStore, PgDocumentStore,
    ResourceController, ResourceOptions,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("schema_resource=info".parse()?))
        .init();

    let resources_dir = std::env::var("RESOURCES_DIR").unwrap_or_else(|_| "demos/resources".into());
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let options = ResourceOptions::from_env()?;
    let definitions = load_dir(&resources_dir)?;

    let pool = match std::env::var("DATABASE_URL") {
        Ok(url) => Some(
            sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&url)
                .await?,
        ),
        Err(_) => {
            tracing::info!("DATABASE_URL not set, using in-memory store");
            None
        }
    };

    let mut app = Router::new();
    let mut probe: Option<Arc<dyn DocumentStore>> = None;
    for named in definitions {
        let store: Arc<dyn DocumentStore> = match &pool {
            Some(pool) => Arc::new(PgDocumentStore::ensure_collection(pool.clone(), &named.name).await?),
            None => Arc::new(MemoryStore::new()),
        };
        probe.get_or_insert_with(|| store.clone());
        let controller = ResourceController::new(named.base_path, named.definition, store)
            .with_options(options.clone());
        app = app.merge(resource_routes(Arc::new(controller)));
    }
    let probe = probe.unwrap_or_else(|| Arc::new(MemoryStore::new()));
    let app = app.merge(common_routes(probe));

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
