//! Application state shared across routes

use std::sync::Arc;

use crate::cache::ItemCache;
use crate::config::Config;
use crate::store::{ItemStore, UserStore};

/// Shared application state
///
/// Stores and cache are held behind trait objects so tests can substitute
/// in-memory implementations.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserStore>,
    pub items: Arc<dyn ItemStore>,
    pub cache: Arc<dyn ItemCache>,
}

impl AppState {
    pub fn new(
        config: Config,
        users: Arc<dyn UserStore>,
        items: Arc<dyn ItemStore>,
        cache: Arc<dyn ItemCache>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            users,
            items,
            cache,
        }
    }
}
