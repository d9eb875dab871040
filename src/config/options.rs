//! Per-resource response and pagination options, overridable from env.

use crate::error::DefinitionError;
use axum::http::StatusCode;
use std::str::FromStr;

/// Shape of single-document response bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Envelope {
    /// The public document itself.
    Bare,
    /// `{"item": document}`.
    Item,
}

impl FromStr for Envelope {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bare" => Ok(Envelope::Bare),
            "item" => Ok(Envelope::Item),
            other => Err(DefinitionError::Options(format!(
                "envelope must be 'bare' or 'item' (got '{}')",
                other
            ))),
        }
    }
}

/// What a successful update answers with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateResponse {
    /// 204, empty body.
    NoContent,
    /// 200 with the merged public document.
    Document,
}

impl FromStr for UpdateResponse {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "no_content" | "204" => Ok(UpdateResponse::NoContent),
            "document" | "200" => Ok(UpdateResponse::Document),
            other => Err(DefinitionError::Options(format!(
                "update response must be 'no_content' or 'document' (got '{}')",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceOptions {
    pub envelope: Envelope,
    pub create_status: StatusCode,
    pub update_response: UpdateResponse,
    pub default_per_page: u64,
    /// Requests above this fail rather than being clamped.
    pub max_per_page: u64,
    pub max_body_bytes: usize,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            envelope: Envelope::Bare,
            create_status: StatusCode::CREATED,
            update_response: UpdateResponse::NoContent,
            default_per_page: 25,
            max_per_page: 100,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl ResourceOptions {
    /// Defaults overridden by `RESOURCE_ENVELOPE`, `RESOURCE_UPDATE_RESPONSE`,
    /// `RESOURCE_DEFAULT_PER_PAGE`, `RESOURCE_MAX_PER_PAGE`, `RESOURCE_MAX_BODY_BYTES`.
    pub fn from_env() -> Result<Self, DefinitionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DefinitionError> {
        let mut options = Self::default();
        if let Some(v) = lookup("RESOURCE_ENVELOPE") {
            options.envelope = v.parse()?;
        }
        if let Some(v) = lookup("RESOURCE_UPDATE_RESPONSE") {
            options.update_response = v.parse()?;
        }
        if let Some(v) = lookup("RESOURCE_DEFAULT_PER_PAGE") {
            options.default_per_page = parse_number("RESOURCE_DEFAULT_PER_PAGE", &v)?;
        }
        if let Some(v) = lookup("RESOURCE_MAX_PER_PAGE") {
            options.max_per_page = parse_number("RESOURCE_MAX_PER_PAGE", &v)?;
        }
        if let Some(v) = lookup("RESOURCE_MAX_BODY_BYTES") {
            options.max_body_bytes = parse_number("RESOURCE_MAX_BODY_BYTES", &v)?;
        }
        options.check()?;
        Ok(options)
    }

    fn check(&self) -> Result<(), DefinitionError> {
        if self.max_per_page == 0 || self.default_per_page == 0 {
            return Err(DefinitionError::Options("per-page values must be at least 1".into()));
        }
        if self.default_per_page > self.max_per_page {
            return Err(DefinitionError::Options(format!(
                "default per-page {} exceeds max {}",
                self.default_per_page, self.max_per_page
            )));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, DefinitionError> {
    value
        .trim()
        .parse()
        .map_err(|_| DefinitionError::Options(format!("{} is not a valid number: '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let options = ResourceOptions::from_lookup(lookup(&[])).unwrap();
        assert_eq!(options, ResourceOptions::default());
        assert_eq!(options.default_per_page, 25);
        assert_eq!(options.max_per_page, 100);
    }

    #[test]
    fn env_overrides() {
        let options = ResourceOptions::from_lookup(lookup(&[
            ("RESOURCE_ENVELOPE", "item"),
            ("RESOURCE_UPDATE_RESPONSE", "document"),
            ("RESOURCE_DEFAULT_PER_PAGE", "10"),
        ]))
        .unwrap();
        assert_eq!(options.envelope, Envelope::Item);
        assert_eq!(options.update_response, UpdateResponse::Document);
        assert_eq!(options.default_per_page, 10);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ResourceOptions::from_lookup(lookup(&[("RESOURCE_ENVELOPE", "boxed")])).is_err());
        assert!(ResourceOptions::from_lookup(lookup(&[("RESOURCE_MAX_PER_PAGE", "many")])).is_err());
        assert!(ResourceOptions::from_lookup(lookup(&[("RESOURCE_DEFAULT_PER_PAGE", "200")])).is_err());
    }
}
