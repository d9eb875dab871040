//! Collection and item routes for one deployed resource.
//! Both routes accept any method so unsupported ones reach the controller and answer 405.

use crate::controller::{RequestContext, ResourceController, RouteKind};
use crate::error::ApiError;
use crate::extractors::CallerGroups;
use crate::response::ResourceResponse;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Path, Query, State},
    http::{Method, StatusCode},
    routing::any,
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Host-neutral description of one route: `{param}` templates and the methods it serves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteSpec {
    pub path: String,
    pub methods: Vec<Method>,
    pub kind: RouteKind,
}

impl RouteSpec {
    /// Path in axum's `:param` syntax.
    pub fn axum_path(&self) -> String {
        self.path
            .split('/')
            .map(|seg| match seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => format!(":{}", name),
                None => seg.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// `{base}` accepting GET/POST and `{base}/{idParam}` accepting GET/POST/DELETE.
pub fn route_table(controller: &ResourceController) -> Vec<RouteSpec> {
    let base = controller.base_path().trim_end_matches('/');
    let collection_path = if base.is_empty() { "/".to_string() } else { base.to_string() };
    vec![
        RouteSpec {
            path: collection_path,
            methods: vec![Method::GET, Method::POST],
            kind: RouteKind::Collection,
        },
        RouteSpec {
            path: format!("{}/{{{}}}", base, controller.definition().identifier_field()),
            methods: vec![Method::GET, Method::POST, Method::DELETE],
            kind: RouteKind::Item,
        },
    ]
}

/// Body read failures answer through the same error shaping as the controller.
fn body_rejection(controller: &ResourceController, rejection: BytesRejection) -> ResourceResponse {
    let err = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::BodyTooLarge(controller.options().max_body_bytes)
    } else {
        ApiError::BodyRead(rejection.body_text())
    };
    tracing::debug!(resource = %controller.base_path(), error = %err, "request body rejected");
    ResourceResponse::from_error(&err)
}

async fn collection(
    State(controller): State<Arc<ResourceController>>,
    method: Method,
    CallerGroups(groups): CallerGroups,
    Query(query): Query<HashMap<String, String>>,
    body: Result<Bytes, BytesRejection>,
) -> ResourceResponse {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return body_rejection(&controller, rejection),
    };
    let ctx = RequestContext::new(method)
        .with_query(query)
        .with_groups(groups)
        .with_body(body);
    controller.dispatch(RouteKind::Collection, ctx).await
}

async fn item(
    State(controller): State<Arc<ResourceController>>,
    method: Method,
    Path(params): Path<HashMap<String, String>>,
    CallerGroups(groups): CallerGroups,
    Query(query): Query<HashMap<String, String>>,
    body: Result<Bytes, BytesRejection>,
) -> ResourceResponse {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return body_rejection(&controller, rejection),
    };
    let mut ctx = RequestContext::new(method)
        .with_query(query)
        .with_groups(groups)
        .with_body(body);
    ctx.path_params = params;
    controller.dispatch(RouteKind::Item, ctx).await
}

/// Router for one resource, with the body size cap from its options and request tracing.
pub fn resource_routes(controller: Arc<ResourceController>) -> Router {
    let max_body = controller.options().max_body_bytes;
    let mut router = Router::new();
    for spec in route_table(&controller) {
        let path = spec.axum_path();
        tracing::debug!(path = %path, kind = ?spec.kind, "mounting route");
        router = match spec.kind {
            RouteKind::Collection => router.route(&path, any(collection)),
            RouteKind::Item => router.route(&path, any(item)),
        };
    }
    router.with_state(controller).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(max_body)),
    )
}
