use std::sync::Arc;

use crate::config::Settings;
use crate::hub::BroadcastHub;
use crate::registry::ConnectionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<ConnectionRegistry>,
    pub hub: Arc<BroadcastHub>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let hub = Arc::new(BroadcastHub::new(registry.clone()));

        Self {
            settings: Arc::new(settings),
            registry,
            hub,
        }
    }
}
