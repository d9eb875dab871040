//! Resource controller: classifies each request into one CRUD action and runs it
//! against the document store, authorization policy and validation engine.

use crate::access::{AccessPolicy, AllowAll};
use crate::config::{Envelope, ResourceDefinition, ResourceKind, ResourceOptions, UpdateResponse};
use crate::error::ApiError;
use crate::response::{public_document, ItemEnvelope, ResourceResponse};
use crate::service::{decode_body, paginate, validate, BodyDecodeError, JsonSchema, PageRequest, ValidationIssue, PUBLIC_ID};
use crate::store::{Document, DocumentId, DocumentStore};
use axum::body::Bytes;
use axum::http::{Method, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Which of the two registered routes a request arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteKind {
    /// `{base}`
    Collection,
    /// `{base}/{idParam}`
    Item,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    List,
    Create,
    Read,
    Update,
    Delete,
}

/// Map method and route shape to an action, honouring the resource's writability.
pub fn resolve_action(
    method: &Method,
    route: RouteKind,
    definition: &ResourceDefinition,
) -> Result<Action, ApiError> {
    let writable = definition.kind() == ResourceKind::Writable;
    let item_writable = definition.item_kind() == ResourceKind::Writable;
    match (route, method) {
        (RouteKind::Collection, &Method::GET) => Ok(Action::List),
        (RouteKind::Collection, &Method::POST) if writable => Ok(Action::Create),
        (RouteKind::Item, &Method::GET) => Ok(Action::Read),
        (RouteKind::Item, &Method::POST) if item_writable => Ok(Action::Update),
        (RouteKind::Item, &Method::DELETE) if writable => Ok(Action::Delete),
        _ => Err(ApiError::MethodNotAllowed),
    }
}

/// Everything one dispatch needs. Built per request, never shared.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub method: Method,
    pub path_params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Bytes,
    /// Caller's groups as asserted by upstream authentication.
    pub groups: Vec<String>,
    decoded: OnceLock<Result<Value, BodyDecodeError>>,
}

impl RequestContext {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            path_params: HashMap::new(),
            query: HashMap::new(),
            body: Bytes::new(),
            groups: Vec::new(),
            decoded: OnceLock::new(),
        }
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.decoded = OnceLock::new();
        self
    }

    pub fn with_groups(mut self, groups: impl IntoIterator<Item = String>) -> Self {
        self.groups = groups.into_iter().collect();
        self
    }

    /// Body decoded as JSON on first use.
    pub fn json_body(&self) -> Result<&Value, BodyDecodeError> {
        match self.decoded.get_or_init(|| decode_body(&self.body)) {
            Ok(value) => Ok(value),
            Err(e) => Err(e.clone()),
        }
    }
}

/// One deployed resource. Immutable after construction; share behind an `Arc`.
pub struct ResourceController {
    base_path: String,
    definition: ResourceDefinition,
    store: Arc<dyn DocumentStore>,
    policy: Arc<dyn AccessPolicy>,
    options: ResourceOptions,
}

impl ResourceController {
    pub fn new(
        base_path: impl Into<String>,
        definition: ResourceDefinition,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let base_path = base_path.into();
        tracing::info!(
            resource = %base_path,
            kind = ?definition.kind(),
            item_kind = ?definition.item_kind(),
            id_param = %definition.identifier_field(),
            "registered resource"
        );
        Self {
            base_path,
            definition,
            store,
            policy: Arc::new(AllowAll),
            options: ResourceOptions::default(),
        }
    }

    pub fn with_policy(mut self, policy: impl AccessPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_options(mut self, options: ResourceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn definition(&self) -> &ResourceDefinition {
        &self.definition
    }

    pub fn options(&self) -> &ResourceOptions {
        &self.options
    }

    /// Run one request to completion. Every failure becomes exactly one error response.
    pub async fn dispatch(&self, route: RouteKind, ctx: RequestContext) -> ResourceResponse {
        match self.handle(route, &ctx).await {
            Ok(response) => response,
            Err(err) => {
                match &err {
                    ApiError::Store(e) => {
                        tracing::warn!(resource = %self.base_path, error = %e, "store failure")
                    }
                    other => {
                        tracing::debug!(resource = %self.base_path, error = %other, "request rejected")
                    }
                }
                ResourceResponse::from_error(&err)
            }
        }
    }

    async fn handle(&self, route: RouteKind, ctx: &RequestContext) -> Result<ResourceResponse, ApiError> {
        let action = resolve_action(&ctx.method, route, &self.definition)?;
        tracing::debug!(resource = %self.base_path, action = ?action, "dispatch");
        match action {
            Action::List => self.list(ctx).await,
            Action::Create => self.create(ctx).await,
            Action::Read => self.read(ctx).await,
            Action::Update => self.update(ctx).await,
            Action::Delete => self.delete(ctx).await,
        }
    }

    async fn list(&self, ctx: &RequestContext) -> Result<ResourceResponse, ApiError> {
        if !self.policy.list_allowed(ctx) {
            return Err(ApiError::Forbidden);
        }
        let id_field = self.store.id_field();
        let request = PageRequest::from_query(&ctx.query, &self.options, id_field)?;
        let cursor = self.store.find_all().await?;
        let page = paginate(cursor, &request, id_field).await?;
        Ok(ResourceResponse::json(StatusCode::OK, &page))
    }

    async fn create(&self, ctx: &RequestContext) -> Result<ResourceResponse, ApiError> {
        let body = ctx.json_body()?;
        if !self.policy.create_allowed(ctx, body) {
            return Err(ApiError::Forbidden);
        }
        let schema = self.definition.create_schema().ok_or(ApiError::MethodNotAllowed)?;
        let mut document = checked_object(body, schema)?;
        self.strip_identifiers(&mut document);

        let inserted = self.store.insert_one(document.clone()).await?;
        document.insert(self.store.id_field().to_string(), inserted.inserted_id);
        Ok(self.document_response(self.options.create_status, document))
    }

    async fn read(&self, ctx: &RequestContext) -> Result<ResourceResponse, ApiError> {
        let id = self.item_id(ctx)?;
        if !self.policy.item_view_allowed(ctx, &id) {
            return Err(ApiError::Forbidden);
        }
        let document = self
            .store
            .find_one_by_id(&id)
            .await?
            .ok_or(ApiError::NotFound)?;
        Ok(self.document_response(StatusCode::OK, document))
    }

    /// Not atomic: a delete between fetch and replace surfaces as 404.
    /// The hook needs the stored document, so the fetch runs first and a caller
    /// denied by `update_allowed` still learns whether the id exists (404 vs 401).
    async fn update(&self, ctx: &RequestContext) -> Result<ResourceResponse, ApiError> {
        let id = self.item_id(ctx)?;
        let existing = self
            .store
            .find_one_by_id(&id)
            .await?
            .ok_or(ApiError::NotFound)?;
        let body = ctx.json_body()?;
        if !self.policy.update_allowed(ctx, body, &existing) {
            return Err(ApiError::Forbidden);
        }
        let schema = self.definition.update_schema().ok_or(ApiError::MethodNotAllowed)?;
        let mut update = checked_object(body, schema)?;
        self.strip_identifiers(&mut update);

        let mut merged = existing;
        for (key, value) in update {
            merged.insert(key, value);
        }
        let replaced = self.store.replace_one_by_id(&id, merged.clone()).await?;
        if replaced.matched_count == 0 {
            return Err(ApiError::NotFound);
        }
        match self.options.update_response {
            UpdateResponse::NoContent => Ok(ResourceResponse::empty(StatusCode::NO_CONTENT)),
            UpdateResponse::Document => Ok(self.document_response(StatusCode::OK, merged)),
        }
    }

    async fn delete(&self, ctx: &RequestContext) -> Result<ResourceResponse, ApiError> {
        let id = self.item_id(ctx)?;
        if !self.policy.delete_allowed(ctx, &id) {
            return Err(ApiError::Forbidden);
        }
        self.store
            .delete_one_by_id(&id)
            .await?
            .ok_or(ApiError::NotFound)?;
        Ok(ResourceResponse::empty(StatusCode::NO_CONTENT))
    }

    fn item_id(&self, ctx: &RequestContext) -> Result<DocumentId, ApiError> {
        ctx.path_params
            .get(self.definition.identifier_field())
            .map(|s| DocumentId(s.clone()))
            .ok_or(ApiError::NotFound)
    }

    /// Clients never choose or rewrite identifiers.
    fn strip_identifiers(&self, document: &mut Document) {
        document.remove(PUBLIC_ID);
        document.remove(self.store.id_field());
    }

    fn document_response(&self, status: StatusCode, document: Document) -> ResourceResponse {
        let public = public_document(document, self.store.id_field());
        match self.options.envelope {
            Envelope::Bare => ResourceResponse::json(status, &public),
            Envelope::Item => ResourceResponse::json(status, &ItemEnvelope { item: public }),
        }
    }
}

/// Validate, then require a JSON object since documents are mappings.
fn checked_object(body: &Value, schema: &JsonSchema) -> Result<Document, ApiError> {
    let issues = validate(body, schema);
    if !issues.is_empty() {
        return Err(ApiError::BodyValidation(issues));
    }
    match body {
        Value::Object(map) => Ok(map.clone()),
        other => Err(ApiError::BodyValidation(vec![ValidationIssue {
            message: format!("{} is not of type 'object'", other),
            path: Vec::new(),
        }])),
    }
}
