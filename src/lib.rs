//! Schema Resource: CRUD HTTP resources derived from declarative resource descriptions.

pub mod access;
pub mod config;
pub mod controller;
pub mod error;
pub mod extractors;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod store;

pub use access::{AccessPolicy, AllowAll, GroupPolicy};
pub use config::{load_dir, NamedDefinition, ResourceDefinition, ResourceKind, ResourceOptions};
pub use controller::{RequestContext, ResourceController, RouteKind};
pub use error::{ApiError, DefinitionError, StoreError};
pub use response::{canonicalize, public_document, ResourceResponse};
pub use routes::{common_routes, resource_routes, route_table, RouteSpec};
pub use service::{decode_body, paginate, validate, PageEnvelope, PageRequest};
pub use store::{DocumentStore, MemoryStore, PgDocumentStore};
