use std::sync::Arc;

use async_trait::async_trait;
use rmqtt::hook::{Handler, HookResult, Parameter, ReturnType};
use rmqtt::types::{PublishAclResult, SubscribeAclResult};
use tracing::{debug, error, instrument, warn};

use crate::auth::AuthError;
use crate::store::TelemetryRecord;
use crate::topic::{self, TopicError};

use super::error::HookError;
use super::HookContext;

/// Pure, rmqtt-free enforcement logic shared by every hook call site.
///
/// Kept separate from [`RmqttHookAdapter`] so the decision logic is testable
/// with plain strings and byte slices, without standing up a broker.
pub struct HookHandler {
    context: Arc<HookContext>,
}

impl HookHandler {
    pub fn new(context: Arc<HookContext>) -> Self {
        Self { context }
    }

    /// Runs the CONNECT decision table and, on success, stamps the session.
    #[instrument(skip(self, password))]
    pub async fn handle_client_connected(
        &self,
        client_id: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), AuthError> {
        let session = self.context.authenticator.authenticate(username, password).await?;
        debug!(
            client_id,
            tenant_id = session.tenant_id,
            device_id = %session.device_id,
            "CONNECT authenticated"
        );
        self.context.sessions.insert(client_id, session);
        Ok(())
    }

    pub fn handle_client_disconnected(&self, client_id: &str) {
        self.context.sessions.remove(client_id);
    }

    /// Shared by the PUBLISH and SUBSCRIBE authorization hooks: fail closed
    /// on an unauthenticated session, otherwise rewrite the topic under the
    /// session's tenant namespace.
    pub fn rewrite_for_session(&self, client_id: &str, topic: &str) -> Result<String, HookError> {
        let session = self.context.sessions.get(client_id).ok_or(HookError::Unauthenticated)?;
        topic::rewrite(topic, session.tenant_id).map_err(HookError::from)
    }

    /// Full PUBLISH path: rewrite the topic, then forward the accepted
    /// message to the telemetry batcher. The batcher submission is
    /// fire-and-forget — its result is logged, never surfaced as a publish
    /// rejection, because the broker has already committed to routing this
    /// message to subscribers by the time this runs.
    pub fn handle_message_publish(
        &self,
        client_id: &str,
        topic: &str,
        payload: &[u8],
    ) -> Result<String, HookError> {
        let session = self.context.sessions.get(client_id).ok_or(HookError::Unauthenticated)?;
        let rewritten = topic::rewrite(topic, session.tenant_id)?;
        if !topic.starts_with('$') {
            self.forward_to_batcher(session.tenant_id, &rewritten, payload);
        }
        Ok(rewritten)
    }

    fn forward_to_batcher(&self, tenant_id: i64, topic: &str, payload: &[u8]) {
        if crate::validation::check_payload_size(payload.len(), self.context.max_payload_size_bytes)
            .is_err()
        {
            warn!(topic, size = payload.len(), "dropping oversized telemetry payload");
            return;
        }
        if topic.is_empty() {
            warn!("dropping telemetry message with empty topic");
            return;
        }
        let Ok(payload_str) = std::str::from_utf8(payload) else {
            warn!(topic, "dropping telemetry payload: not valid utf-8");
            return;
        };
        if payload_str.is_empty() {
            warn!(topic, "dropping telemetry message with empty payload");
            return;
        }

        let record = TelemetryRecord::new(tenant_id, topic.to_string(), payload_str.to_string());
        let batcher = Arc::clone(&self.context.batcher);
        tokio::spawn(async move {
            if let Err(err) = batcher.submit(record).await {
                error!(error = %err, "telemetry batcher rejected submission");
            }
        });
    }
}

/// Adapts [`HookHandler`] to rmqtt's `Handler` trait, translating between
/// rmqtt's packet/session types and this crate's plain-value API.
#[derive(Clone)]
pub struct RmqttHookAdapter {
    handler: Arc<HookHandler>,
}

impl RmqttHookAdapter {
    pub fn new(context: Arc<HookContext>) -> Self {
        Self {
            handler: Arc::new(HookHandler::new(context)),
        }
    }
}

#[async_trait]
impl Handler for RmqttHookAdapter {
    async fn hook(&self, param: &Parameter, acc: Option<HookResult>) -> ReturnType {
        match param {
            Parameter::ClientConnected(session) => {
                let client_id = session.id.client_id.as_ref();
                let username = session.id.username.as_ref().map(|u| u.as_ref());
                let password = session.id.password.as_ref().map(|p| p.as_ref());

                match self.handler.handle_client_connected(client_id, username, password).await {
                    Ok(()) => (true, acc),
                    Err(_) => {
                        warn!(client_id, "rejecting CONNECT: not authorized");
                        (false, acc)
                    }
                }
            }

            Parameter::ClientDisconnected(session, _reason) => {
                self.handler.handle_client_disconnected(session.id.client_id.as_ref());
                (true, acc)
            }

            Parameter::MessagePublishCheckAcl(session, publish) => {
                let client_id = session.id.client_id.as_ref();
                let topic: &str = &publish.topic;
                match self.handler.rewrite_for_session(client_id, topic) {
                    Ok(_) => (true, Some(HookResult::PublishAclResult(PublishAclResult::Allow))),
                    Err(err) => {
                        warn!(client_id, topic, error = %err, "rejecting PUBLISH ACL check");
                        (false, Some(HookResult::PublishAclResult(PublishAclResult::Rejected(false))))
                    }
                }
            }

            Parameter::MessagePublish(session_opt, _from, publish) => {
                let Some(session) = session_opt else {
                    return (true, acc);
                };
                let client_id = session.id.client_id.as_ref();
                let topic: &str = &publish.topic;

                match self.handler.handle_message_publish(client_id, topic, publish.payload.as_ref())
                {
                    Ok(rewritten) => {
                        let mut rewritten_publish = (*publish).clone();
                        rewritten_publish.topic = rewritten.into();
                        (true, Some(HookResult::Publish(rewritten_publish)))
                    }
                    Err(HookError::Topic(TopicError::ReservedTopic)) => {
                        warn!(client_id, topic, "dropping publish to reserved namespace");
                        (false, acc)
                    }
                    Err(HookError::Unauthenticated) => {
                        warn!(client_id, topic, "dropping publish from unauthenticated session");
                        (false, acc)
                    }
                }
            }

            Parameter::ClientSubscribeCheckAcl(session, subscribe) => {
                let client_id = session.id.client_id.as_ref();
                let topic_filter: &str = &subscribe.topic_filter;
                match self.handler.rewrite_for_session(client_id, topic_filter) {
                    Ok(_) => (
                        true,
                        Some(HookResult::SubscribeAclResult(SubscribeAclResult::new_success(
                            subscribe.opts.qos(),
                            None,
                        ))),
                    ),
                    Err(err) => {
                        warn!(client_id, topic_filter, error = %err, "rejecting SUBSCRIBE ACL check");
                        (false, None)
                    }
                }
            }

            _ => (true, acc),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::auth::{Authenticator, SessionStore};
    use crate::batcher::TelemetryBatcher;
    use crate::config::BrokerConfig;
    use crate::crypto::{hash_secret, lookup_digest, Pepper};
    use crate::store::{Database, DeviceCredentialStore, TelemetryStore, TenantStore};

    fn handler() -> (HookHandler, i64, TelemetryStore) {
        let db = Database::open_in_memory().unwrap();
        let tenants = TenantStore::new(db.clone());
        let devices = DeviceCredentialStore::new(db.clone());
        let telemetry = TelemetryStore::new(db);
        let pepper = Pepper::new("test-pepper".to_string());

        let tenant = tenants.create("acme", "key-1").unwrap();
        let token = "device-secret";
        let token_hash = hash_secret(token).unwrap();
        let token_lookup = lookup_digest(token, &pepper);
        devices
            .create(tenant.id, "dev-1", &token_hash, &token_lookup, "Sensor", None, None, None)
            .unwrap();

        let authenticator = Authenticator::new(devices, pepper);
        let sessions = SessionStore::new();
        let batcher = TelemetryBatcher::new(telemetry.clone(), 100, Duration::from_secs(3600), 3);
        let config = BrokerConfig::default();
        let context = Arc::new(HookContext::new(authenticator, sessions, batcher, &config));

        (HookHandler::new(context), tenant.id, telemetry)
    }

    #[tokio::test]
    async fn connect_then_publish_rewrites_topic_under_tenant() {
        let (handler, tenant_id, _telemetry) = handler();
        handler.handle_client_connected("client-1", Some("device-secret"), None).await.unwrap();

        let rewritten = handler.handle_message_publish("client-1", "sensors/temp", b"{}").unwrap();
        assert_eq!(rewritten, format!("tenants/{tenant_id}/sensors/temp"));
    }

    #[tokio::test]
    async fn publish_without_connect_is_unauthenticated() {
        let (handler, _tenant_id, _telemetry) = handler();
        let err = handler.handle_message_publish("ghost", "sensors/temp", b"{}").unwrap_err();
        assert_eq!(err, HookError::Unauthenticated);
    }

    #[tokio::test]
    async fn publish_to_reserved_topic_is_rejected() {
        let (handler, _tenant_id, _telemetry) = handler();
        handler.handle_client_connected("client-1", Some("device-secret"), None).await.unwrap();

        let err = handler.handle_message_publish("client-1", "$SYS/broker/uptime", b"{}").unwrap_err();
        assert_eq!(err, HookError::Topic(TopicError::ReservedTopic));
    }

    #[tokio::test]
    async fn disconnect_clears_session_so_later_publish_is_rejected() {
        let (handler, _tenant_id, _telemetry) = handler();
        handler.handle_client_connected("client-1", Some("device-secret"), None).await.unwrap();
        handler.handle_client_disconnected("client-1");

        let err = handler.handle_message_publish("client-1", "sensors/temp", b"{}").unwrap_err();
        assert_eq!(err, HookError::Unauthenticated);
    }

    #[tokio::test]
    async fn connect_with_wrong_token_is_rejected() {
        let (handler, _tenant_id, _telemetry) = handler();
        let err = handler.handle_client_connected("client-1", Some("wrong"), None).await.unwrap_err();
        assert_eq!(err, AuthError);
    }

    /// A non-reserved `$`-prefixed topic (e.g. broker-internal but not one
    /// of the three reserved prefixes) is allowed through to subscribers
    /// but never forwarded to the telemetry store, per SPEC_FULL.md §4.6.
    #[tokio::test]
    async fn dollar_prefixed_non_reserved_topic_is_not_forwarded_to_telemetry() {
        let (handler, tenant_id, telemetry) = handler();
        handler.handle_client_connected("client-1", Some("device-secret"), None).await.unwrap();

        let rewritten = handler.handle_message_publish("client-1", "$custom/stats", b"{}").unwrap();
        assert_eq!(rewritten, format!("tenants/{tenant_id}/$custom/stats"));

        // forward_to_batcher spawns the submit; give the runtime a chance to
        // run it before asserting nothing landed in the store.
        tokio::task::yield_now().await;
        assert_eq!(telemetry.count().unwrap(), 0);
    }
}
