//! Shared server state handed to every request handler.

use crate::auth::Sessions;
use crate::config::Config;
use crate::store::Store;
use std::sync::{Arc, RwLock};

pub struct AppState {
    pub config: Config,
    pub store: RwLock<Store>,
    pub sessions: Sessions,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Arc<Self> {
        Arc::new(Self {
            config,
            store: RwLock::new(store),
            sessions: Sessions::new(),
        })
    }
}
