//! Resolved resource definition: description validated and flattened for runtime use.

use crate::service::JsonSchema;

/// Whether create/update/delete are permitted on a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Writable,
    ReadOnly,
}

/// Immutable after parsing; shared read-only across requests.
/// Holds a create schema iff `kind` is writable and an update schema iff `item_kind` is writable.
#[derive(Clone, Debug)]
pub struct ResourceDefinition {
    kind: ResourceKind,
    item_kind: ResourceKind,
    create_schema: Option<JsonSchema>,
    update_schema: Option<JsonSchema>,
    identifier_field: String,
}

impl ResourceDefinition {
    pub(crate) fn new(
        create_schema: Option<JsonSchema>,
        update_schema: Option<JsonSchema>,
        identifier_field: String,
    ) -> Self {
        let kind_of = |s: &Option<JsonSchema>| {
            if s.is_some() {
                ResourceKind::Writable
            } else {
                ResourceKind::ReadOnly
            }
        };
        Self {
            kind: kind_of(&create_schema),
            item_kind: kind_of(&update_schema),
            create_schema,
            update_schema,
            identifier_field,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn item_kind(&self) -> ResourceKind {
        self.item_kind
    }

    pub fn create_schema(&self) -> Option<&JsonSchema> {
        self.create_schema.as_ref()
    }

    pub fn update_schema(&self) -> Option<&JsonSchema> {
        self.update_schema.as_ref()
    }

    /// Name of the item route's path parameter (the bracketed segment).
    pub fn identifier_field(&self) -> &str {
        &self.identifier_field
    }
}

/// A definition loaded from a file, with the base path derived from its name.
#[derive(Clone, Debug)]
pub struct NamedDefinition {
    pub name: String,
    pub base_path: String,
    pub definition: ResourceDefinition,
}
