//! Extract the caller's groups from the request (`X-User-Groups` header).

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Comma-separated group names set by upstream authentication.
pub const USER_GROUPS_HEADER: &str = "X-User-Groups";

/// Caller's groups; empty when the header is absent or unreadable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallerGroups(pub Vec<String>);

#[async_trait]
impl<S> FromRequestParts<S> for CallerGroups
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let groups = parts
            .headers
            .get_all(USER_GROUPS_HEADER)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|s| s.split(','))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(CallerGroups(groups))
    }
}
