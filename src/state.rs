//! Shared state injected into every HTTP handler.

use std::sync::Arc;

use crate::application::services::UserAccessor;

#[derive(Clone)]
pub struct AppState {
    pub accessor: Arc<UserAccessor>,
}

impl AppState {
    pub fn new(accessor: Arc<UserAccessor>) -> Self {
        Self { accessor }
    }
}
