//! HTTP API: LINE webhook intake, health and tool listing

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::debounce::Debouncer;
use crate::orchestrator::ToolExecutor;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub debouncer: Arc<Debouncer>,
    pub tools: Arc<dyn ToolExecutor>,
}

impl AppState {
    pub fn new(debouncer: Arc<Debouncer>, tools: Arc<dyn ToolExecutor>) -> Self {
        Self { debouncer, tools }
    }
}
