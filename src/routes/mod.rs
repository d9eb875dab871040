//! Router builders.

mod common;
mod resource;

pub use common::common_routes;
pub use resource::{resource_routes, route_table, RouteSpec};
