//! Example consumer: a separate Rust project that uses schema-resource as a dependency.
//! Every resource is guarded by a group policy read from the environment
//! (VIEW_GROUPS, EDIT_GROUPS, ADMIN_GROUPS; comma-separated).
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Or from this directory: `cargo run`

use axum::Router;
use schema_resource::{
    common_routes, load_dir, resource_routes, DocumentStore, GroupPolicy, MemoryStore,
    PgDocumentStore, ResourceController, ResourceOptions,
};
use std::sync::Arc;
use tokio::net::TcpListener;

fn groups_from_env(key: &str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("schema_resource=info")),
        )
        .init();

    let resources_dir = std::env::var("RESOURCES_DIR").unwrap_or_else(|_| "../demos/resources".into());
    let policy = GroupPolicy::new()
        .view(groups_from_env("VIEW_GROUPS"))
        .create(groups_from_env("EDIT_GROUPS"))
        .update(groups_from_env("EDIT_GROUPS"))
        .delete(groups_from_env("EDIT_GROUPS"))
        .admin(groups_from_env("ADMIN_GROUPS"));
    let options = ResourceOptions::from_env()?;

    let pool = match std::env::var("DATABASE_URL") {
        Ok(url) => Some(
            sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&url)
                .await?,
        ),
        Err(_) => None,
    };

    let mut app = Router::new();
    let mut probe: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    for named in load_dir(&resources_dir)? {
        let store: Arc<dyn DocumentStore> = match &pool {
            Some(pool) => Arc::new(PgDocumentStore::ensure_collection(pool.clone(), &named.name).await?),
            None => Arc::new(MemoryStore::new()),
        };
        probe = store.clone();
        let controller = ResourceController::new(named.base_path, named.definition, store)
            .with_policy(policy.clone())
            .with_options(options.clone());
        app = app.merge(resource_routes(Arc::new(controller)));
    }
    let app = app.merge(common_routes(probe));

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    let port = listener.local_addr()?.port();
    tracing::info!("Example consumer listening on http://127.0.0.1:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
