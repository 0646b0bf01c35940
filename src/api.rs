//! HTTP API and chat page for Gazzi Chat

mod assets;
mod handlers;
mod types;

pub use handlers::create_router;
pub use types::PageInfo;

use crate::engine::ChatEngine;
use crate::session::SessionRegistry;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
    pub sessions: Arc<SessionRegistry>,
    pub page: Arc<PageInfo>,
}

impl AppState {
    pub fn new(engine: Arc<ChatEngine>, sessions: Arc<SessionRegistry>) -> Self {
        let page = Arc::new(PageInfo::new(engine.model_id()));
        Self {
            engine,
            sessions,
            page,
        }
    }
}
