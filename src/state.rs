//! Shared application state for all routes.

use crate::gateway::Gateway;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// The only state shared between requests; bounds open store connections.
    pub gateway: Arc<dyn Gateway>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }
}
