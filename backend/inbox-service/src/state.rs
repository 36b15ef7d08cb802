use std::sync::Arc;

use crate::{config::Config, gateway::SessionRegistry, store::EntityStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub gateway: SessionRegistry,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>, gateway: SessionRegistry, config: Arc<Config>) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }
}
