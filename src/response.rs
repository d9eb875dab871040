//! Canonical JSON encoding and response shaping.

use crate::error::ApiError;
use crate::store::Document;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Status, body bytes and content type produced by one dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub content_type: Option<&'static str>,
}

impl ResourceResponse {
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => ResourceResponse {
                status,
                body: bytes,
                content_type: Some(JSON_CONTENT_TYPE),
            },
            Err(e) => {
                tracing::warn!(error = %e, "response encoding failed");
                Self::empty(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        ResourceResponse {
            status,
            body: Vec::new(),
            content_type: None,
        }
    }

    pub fn from_error(err: &ApiError) -> Self {
        match err.body() {
            Some(body) => Self::json(err.status(), &body),
            None => Self::empty(err.status()),
        }
    }

    /// Decoded JSON body; `Value::Null` when empty.
    pub fn json_body(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

impl IntoResponse for ResourceResponse {
    fn into_response(self) -> Response {
        let mut builder = Response::builder().status(self.status);
        if let Some(ct) = self.content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder
            .body(Body::from(self.body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

/// Canonical string form of a store identifier.
pub fn canonical_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("$oid") {
            Some(Value::String(oid)) if map.len() == 1 => oid.clone(),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}

/// Rewrite extended-JSON store values: `{"$oid": s}` to `s`, `{"$date": ..}` to epoch seconds.
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(oid)) = map.get("$oid") {
                    return Value::String(oid.clone());
                }
                if let Some(secs) = map.get("$date").and_then(epoch_seconds) {
                    return Value::Number(secs.into());
                }
            }
            Value::Object(map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

fn epoch_seconds(date: &Value) -> Option<i64> {
    match date {
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.timestamp()),
        Value::Number(n) => n.as_i64().map(|ms| ms.div_euclid(1000)),
        Value::Object(map) => map
            .get("$numberLong")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<i64>().ok())
            .map(|ms| ms.div_euclid(1000)),
        _ => None,
    }
}

/// Public representation: store-native identifier replaced by a string `id`.
pub fn public_document(mut document: Document, id_field: &str) -> Value {
    let id = document.remove(id_field);
    let mut out: Map<String, Value> = document
        .into_iter()
        .map(|(k, v)| (k, canonicalize(v)))
        .collect();
    if let Some(id) = id {
        out.insert("id".into(), Value::String(canonical_id(&id)));
    }
    Value::Object(out)
}

/// `{item: ...}` wrapper used when the envelope option asks for it.
#[derive(Serialize)]
pub struct ItemEnvelope<T> {
    pub item: T,
}
