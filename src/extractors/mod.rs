//! Request extractors.

mod groups;

pub use groups::{CallerGroups, USER_GROUPS_HEADER};
