//! Per-resource authorization hooks. A denied hook answers 401 with an empty body.

use crate::controller::RequestContext;
use crate::store::{Document, DocumentId};
use serde_json::Value;
use std::collections::HashSet;

/// Override only the hooks a deployment cares about; the rest permit.
pub trait AccessPolicy: Send + Sync {
    fn create_allowed(&self, _ctx: &RequestContext, _document: &Value) -> bool {
        true
    }

    fn list_allowed(&self, _ctx: &RequestContext) -> bool {
        true
    }

    fn item_view_allowed(&self, _ctx: &RequestContext, _id: &DocumentId) -> bool {
        true
    }

    fn update_allowed(&self, _ctx: &RequestContext, _update: &Value, _existing: &Document) -> bool {
        true
    }

    fn delete_allowed(&self, _ctx: &RequestContext, _id: &DocumentId) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {}

/// Permits a hook when the caller belongs to one of its groups or to an admin group.
/// Listing uses the view groups.
#[derive(Clone, Debug, Default)]
pub struct GroupPolicy {
    pub create_groups: HashSet<String>,
    pub view_groups: HashSet<String>,
    pub update_groups: HashSet<String>,
    pub delete_groups: HashSet<String>,
    pub admin_groups: HashSet<String>,
}

impl GroupPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.create_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn view<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.view_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn update<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn delete<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.delete_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn admin<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admin_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    fn member_of(&self, ctx: &RequestContext, groups: &HashSet<String>) -> bool {
        ctx.groups
            .iter()
            .any(|g| groups.contains(g) || self.admin_groups.contains(g))
    }
}

impl AccessPolicy for GroupPolicy {
    fn create_allowed(&self, ctx: &RequestContext, _document: &Value) -> bool {
        self.member_of(ctx, &self.create_groups)
    }

    fn list_allowed(&self, ctx: &RequestContext) -> bool {
        self.member_of(ctx, &self.view_groups)
    }

    fn item_view_allowed(&self, ctx: &RequestContext, _id: &DocumentId) -> bool {
        self.member_of(ctx, &self.view_groups)
    }

    fn update_allowed(&self, ctx: &RequestContext, _update: &Value, _existing: &Document) -> bool {
        self.member_of(ctx, &self.update_groups)
    }

    fn delete_allowed(&self, ctx: &RequestContext, _id: &DocumentId) -> bool {
        self.member_of(ctx, &self.delete_groups)
    }
}
