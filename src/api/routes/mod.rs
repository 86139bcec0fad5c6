//! Route modules served under `/api`
//!
//! Adding a module: create the file, then register it in [`modules`]
//! under its file name.

use super::RouteModule;

pub mod health;
pub mod index;
pub mod session;

/// Every route module, by file name
pub fn modules() -> Vec<RouteModule> {
    vec![
        RouteModule::new("index.rs", index::router),
        RouteModule::new("health.rs", health::router),
        RouteModule::new("session.rs", session::router),
    ]
}
