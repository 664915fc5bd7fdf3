use std::sync::Arc;

use tokio::sync::mpsc;

use carmart_core::auth::AuthSession;
use carmart_core::config::AppConfig;
use carmart_core::events::{Event, EventSender};
use carmart_core::services::{build_services, AppServices};
use carmart_core::store::MemoryStore;

/// Test harness: the full service graph over an in-memory store.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub services: AppServices,
    pub config: Arc<AppConfig>,
    // Held so best-effort event sends land somewhere instead of warning.
    _event_rx: mpsc::Receiver<Event>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let config = Arc::new(config);
        let (event_tx, event_rx) = mpsc::channel(1024);
        let event_sender = Arc::new(EventSender::new(event_tx));

        let services = build_services(store.clone(), config.clone(), event_sender);

        Self {
            store,
            services,
            config,
            _event_rx: event_rx,
        }
    }

    pub fn user_session(&self, user_id: &str) -> AuthSession {
        AuthSession::new(user_id, format!("token-{}", user_id))
    }

    pub fn admin_session(&self) -> AuthSession {
        AuthSession::admin("admin-1", "token-admin")
    }
}
