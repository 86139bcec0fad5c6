//! API layer
//!
//! Route modules are registered by file name and mounted under
//! [`API_PREFIX`]. The mount path is derived from the name:
//! `users.rs` is served at `/api/users`, `index.rs` at `/api`.

mod metrics;
pub mod routes;

use axum::Router;
use std::collections::BTreeMap;

use crate::AppState;
use crate::error::AppError;

pub use metrics::metrics_router;

/// Prefix every route module is mounted under
pub const API_PREFIX: &str = "/api";

/// Slug that mounts a module at the bare prefix
const INDEX_SLUG: &str = "index";

/// A named sub-router
#[derive(Clone, Copy)]
pub struct RouteModule {
    name: &'static str,
    router: fn() -> Router<AppState>,
}

impl RouteModule {
    /// # Arguments
    /// * `name` - File name the slug is derived from (e.g. "users.rs")
    /// * `router` - Builds the module's sub-router
    pub const fn new(name: &'static str, router: fn() -> Router<AppState>) -> Self {
        Self { name, router }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn slug(&self) -> &'static str {
        derive_slug(self.name)
    }
}

impl std::fmt::Debug for RouteModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteModule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Everything before the first `.` of a file name
pub fn derive_slug(file_name: &str) -> &str {
    file_name
        .split_once('.')
        .map_or(file_name, |(stem, _)| stem)
}

/// Mount path for a slug under `prefix`
///
/// `index` maps to the bare prefix.
pub fn mount_path(prefix: &str, slug: &str) -> String {
    if slug == INDEX_SLUG {
        prefix.to_string()
    } else {
        format!("{prefix}/{slug}")
    }
}

/// Mount path → route module, fixed after startup
#[derive(Debug, Default)]
pub struct RouteTable {
    mounts: BTreeMap<String, RouteModule>,
}

impl RouteTable {
    /// Build the table, rejecting modules that share a mount path
    ///
    /// # Errors
    /// Returns `AppError::RouteConflict` on a duplicate or empty slug
    pub fn build(modules: impl IntoIterator<Item = RouteModule>) -> Result<Self, AppError> {
        let mut mounts = BTreeMap::new();

        for module in modules {
            let slug = module.slug();
            if slug.is_empty() || slug.contains('/') {
                return Err(AppError::RouteConflict(format!(
                    "route module {:?} has no usable slug",
                    module.name
                )));
            }

            let path = mount_path(API_PREFIX, slug);
            if let Some(existing) = mounts.insert(path.clone(), module) {
                return Err(AppError::RouteConflict(format!(
                    "{:?} and {:?} both mount at {path}",
                    existing.name, module.name
                )));
            }
        }

        Ok(Self { mounts })
    }

    /// Mount paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.mounts.keys().map(String::as_str)
    }

    /// Nest every module's sub-router at its mount path
    pub fn mount(&self, mut router: Router<AppState>) -> Router<AppState> {
        for (path, module) in &self.mounts {
            tracing::debug!(module = module.name, path = %path, "Mounting route module");
            router = router.nest(path, (module.router)());
        }
        router
    }
}
