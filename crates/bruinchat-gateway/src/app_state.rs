//! Shared application state for the chat gateway.
//!
//! Startup errors are returned, never panicked: a missing JWT secret fails
//! `AppState::new` and `main` exits non-zero.

use std::sync::Arc;

use bruinchat_core::error::Result;

use crate::auth::{JwtVerifier, TokenVerifier};
use crate::config::GatewayConfig;
use crate::obs::GatewayMetrics;
use crate::realtime::Hub;
use crate::services::ChatService;
use crate::store::{InMemoryMessageStore, MessageStore};
use crate::transport::session::{SessionConfig, SessionDeps};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    hub: Arc<Hub>,
    chat: Arc<ChatService>,
    verifier: Arc<dyn TokenVerifier>,
    metrics: Arc<GatewayMetrics>,
    session_cfg: SessionConfig,
}

impl AppState {
    /// Production wiring: JWT secret from the environment, in-memory store.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let verifier = JwtVerifier::from_env(&cfg.auth.jwt_secret_env)?;
        Ok(Self::with_parts(
            cfg,
            Arc::new(verifier),
            Arc::new(InMemoryMessageStore::new()),
        ))
    }

    /// Wire the gateway around caller-supplied collaborators.
    pub fn with_parts(
        cfg: GatewayConfig,
        verifier: Arc<dyn TokenVerifier>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        let metrics = Arc::new(GatewayMetrics::default());
        let hub = Arc::new(Hub::with_metrics(cfg.hub.on_reconnect, Arc::clone(&metrics)));
        let chat = Arc::new(ChatService::new(store, Arc::clone(&metrics)));
        let session_cfg = SessionConfig::from_config(&cfg);

        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                hub,
                chat,
                verifier,
                metrics,
                session_cfg,
            }),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn hub(&self) -> Arc<Hub> {
        Arc::clone(&self.inner.hub)
    }

    pub fn verifier(&self) -> &dyn TokenVerifier {
        self.inner.verifier.as_ref()
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn session_deps(&self) -> SessionDeps {
        SessionDeps {
            hub: self.hub(),
            chat: Arc::clone(&self.inner.chat),
            metrics: self.metrics(),
            cfg: self.inner.session_cfg.clone(),
        }
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    /// Stop accepting connections and close every registered session.
    /// Returns how many sessions were closed.
    pub fn begin_shutdown(&self) -> usize {
        self.inner.metrics.set_draining();
        let closed = self.inner.hub.shutdown();
        tracing::info!(closed, "draining: registry closed");
        closed
    }

    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![("bruinchat_hub_sessions", self.inner.hub.len() as u64)]
    }
}
