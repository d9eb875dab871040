//! Raw resource description types (RAML-style nested mapping, usually parsed from YAML).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const COLLECTION: &str = "collection";
pub const READ_ONLY_COLLECTION: &str = "read-only-collection";
pub const COLLECTION_ITEM: &str = "collection-item";
pub const READ_ONLY_COLLECTION_ITEM: &str = "read-only-collection-item";

pub const NEW_ITEM_SCHEMA: &str = "newItemSchema";
pub const UPDATE_ITEM_SCHEMA: &str = "updateItemSchema";

/// `type:` either names a resource type or maps one name to its parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDecl {
    Name(String),
    Parameterized(Map<String, Value>),
}

impl TypeDecl {
    /// `Some(params)` when this declaration is of type `name`; params are empty for the bare form.
    pub fn params_for(&self, name: &str) -> Option<Map<String, Value>> {
        match self {
            TypeDecl::Name(n) if n == name => Some(Map::new()),
            TypeDecl::Name(_) => None,
            TypeDecl::Parameterized(map) => map.get(name).map(|v| match v {
                Value::Object(params) => params.clone(),
                _ => Map::new(),
            }),
        }
    }

    /// Human-readable declared type, for error messages.
    pub fn declared(&self) -> String {
        match self {
            TypeDecl::Name(n) => format!("'{}'", n),
            TypeDecl::Parameterized(map) => {
                let keys: Vec<_> = map.keys().map(|k| format!("'{}'", k)).collect();
                keys.join(", ")
            }
        }
    }
}

/// One node of a description: its `type` plus every other key (sub-paths, docs, methods).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceNode {
    #[serde(rename = "type", default)]
    pub type_: Option<TypeDecl>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl ResourceNode {
    /// Keys naming child resources (`/...`).
    pub fn sub_paths(&self) -> Vec<&str> {
        self.rest
            .keys()
            .filter(|k| k.starts_with('/'))
            .map(String::as_str)
            .collect()
    }
}
