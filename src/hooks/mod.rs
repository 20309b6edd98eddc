mod error;
mod handler;

pub use error::HookError;
pub use handler::{HookHandler, RmqttHookAdapter};

use std::sync::Arc;

use crate::auth::{Authenticator, SessionStore};
use crate::batcher::TelemetryBatcher;
use crate::config::BrokerConfig;

/// Shared state reachable from every hook invocation. One instance is
/// built at startup and handed to the RMQTT adapter.
#[derive(Clone)]
pub struct HookContext {
    pub authenticator: Arc<Authenticator>,
    pub sessions: Arc<SessionStore>,
    pub batcher: Arc<TelemetryBatcher>,
    pub max_payload_size_bytes: usize,
}

impl HookContext {
    pub fn new(
        authenticator: Authenticator,
        sessions: SessionStore,
        batcher: TelemetryBatcher,
        config: &BrokerConfig,
    ) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
            sessions: Arc::new(sessions),
            batcher: Arc::new(batcher),
            max_payload_size_bytes: config.max_payload_size_bytes,
        }
    }
}
