use crate::channel::RealtimeChannel;
use std::sync::Arc;
use stellar_core::auth::AuthGate;
use stellar_core::session::SessionManager;

/// Shared handles given to every route.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    auth_gate: Arc<AuthGate>,
    session_manager: Arc<SessionManager>,
    channel: Arc<RealtimeChannel>,
    cookie_name: String,
}

impl AppState {
    pub fn new(
        auth_gate: Arc<AuthGate>,
        session_manager: Arc<SessionManager>,
        channel: Arc<RealtimeChannel>,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                auth_gate,
                session_manager,
                channel,
                cookie_name: cookie_name.into(),
            }),
        }
    }

    pub fn auth_gate(&self) -> &AuthGate {
        &self.inner.auth_gate
    }

    pub fn session_manager(&self) -> &SessionManager {
        &self.inner.session_manager
    }

    pub fn channel(&self) -> &Arc<RealtimeChannel> {
        &self.inner.channel
    }

    pub fn cookie_name(&self) -> &str {
        &self.inner.cookie_name
    }
}
