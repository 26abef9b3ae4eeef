//! HTTP API for lmchat
//!
//! HTML pages for the browser flow (submit, then poll through a meta
//! refresh) plus a small JSON surface over the same coordinator.

mod assets;
mod handlers;
mod types;

pub use handlers::create_router;

use crate::runtime::ProductionCoordinator;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ProductionCoordinator>,
}

impl AppState {
    pub fn new(coordinator: ProductionCoordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
        }
    }
}
