//! Typed errors and HTTP mapping.

use crate::service::{BodyDecodeError, ValidationIssue};
use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Malformed resource description. Fatal at registration time.
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("unsupported collection type: must be 'collection' or 'read-only-collection' (got {0})")]
    UnsupportedCollectionType(String),
    #[error("unsupported item type: must be 'collection-item' or 'read-only-collection-item' (got {0})")]
    UnsupportedItemType(String),
    #[error("expected exactly one identifier sub-path, found {0}")]
    IdentifierPathCount(usize),
    #[error("identifier sub-path must be a single bracketed segment like '/{{id}}' (got '{0}')")]
    IdentifierPathShape(String),
    #[error("only the identifier sub-path is supported under a collection (got '{0}')")]
    UnexpectedSubPath(String),
    #[error("missing schema field '{0}'")]
    MissingSchema(&'static str),
    #[error("schema field '{field}' is not valid JSON: {message}")]
    SchemaJson { field: &'static str, message: String },
    #[error("schema field '{field}' is not a valid JSON schema: {message}")]
    InvalidSchema { field: &'static str, message: String },
    #[error("description load: {0}")]
    Load(String),
    #[error("resource options: {0}")]
    Options(String),
}

/// Failure inside a document store adapter. Not classified further by the controller.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("store: {0}")]
    Backend(String),
}

/// Per-request failure. Each variant renders to exactly one status and body.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request body decode: {0}")]
    BodyDecode(#[from] BodyDecodeError),
    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),
    #[error("request body read: {0}")]
    BodyRead(String),
    #[error("request body failed validation ({} violations)", .0.len())]
    BodyValidation(Vec<ValidationIssue>),
    #[error("invalid page number: {0}")]
    InvalidPage(i64),
    #[error("invalid pagination arguments: {0}")]
    InvalidPagination(String),
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
#[serde(tag = "error_type", rename_all = "snake_case")]
enum ErrorBody<'a> {
    #[serde(rename = "request_body_decode")]
    Decode {
        message: &'a str,
        position: usize,
        line_no: usize,
        col_no: usize,
    },
    #[serde(rename = "request_body_too_large")]
    TooLarge {
        limit: usize,
    },
    #[serde(rename = "request_body_read")]
    Read {
        message: &'a str,
    },
    #[serde(rename = "request_body_validation")]
    Validation {
        validation_errors: &'a [ValidationIssue],
    },
    InvalidPage {
        page: i64,
    },
    #[serde(rename = "invalid_pagination_args")]
    InvalidPagination {
        message: &'a str,
    },
    StoreError {
        message: String,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BodyDecode(_) => StatusCode::BAD_REQUEST,
            ApiError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::BodyRead(_) => StatusCode::BAD_REQUEST,
            ApiError::BodyValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidPage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidPagination(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::UNAUTHORIZED,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable body, or None for the kinds that answer with an empty body.
    pub fn body(&self) -> Option<serde_json::Value> {
        let body = match self {
            ApiError::BodyDecode(e) => ErrorBody::Decode {
                message: &e.message,
                position: e.position,
                line_no: e.line,
                col_no: e.column,
            },
            ApiError::BodyTooLarge(limit) => ErrorBody::TooLarge { limit: *limit },
            ApiError::BodyRead(message) => ErrorBody::Read { message },
            ApiError::BodyValidation(issues) => ErrorBody::Validation {
                validation_errors: issues,
            },
            ApiError::InvalidPage(page) => ErrorBody::InvalidPage { page: *page },
            ApiError::InvalidPagination(message) => ErrorBody::InvalidPagination { message },
            ApiError::Store(e) => ErrorBody::StoreError {
                message: e.to_string(),
            },
            ApiError::NotFound | ApiError::Forbidden | ApiError::MethodNotAllowed => return None,
        };
        serde_json::to_value(body).ok()
    }
}
