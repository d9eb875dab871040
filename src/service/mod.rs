//! Request-body validation and list pagination.

mod pagination;
mod validation;

pub use pagination::{check_page, paginate, total_pages, PageEnvelope, PageRequest, PUBLIC_ID};
pub use validation::{decode_body, validate, BodyDecodeError, JsonSchema, PathSegment, ValidationIssue};
