use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rmqtt::context::ServerContext;
use rmqtt::hook::Type;
use rmqtt::net::Builder as ListenerBuilder;
use rmqtt::server::MqttServer;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::auth::{Authenticator, SessionStore};
use crate::batcher::TelemetryBatcher;
use crate::bootstrap::api::{self, ApiState};
use crate::bootstrap::BootstrapService;
use crate::config::BrokerConfig;
use crate::crypto::Pepper;
use crate::hooks::{HookContext, RmqttHookAdapter};
use crate::store::{Database, DeviceCredentialStore, TelemetryStore, TenantStore};

/// Owns every long-lived task the broker starts and tears them down in the
/// order the spec mandates: listener, then engine, then batcher — with the
/// bootstrap HTTP listener alongside, collecting errors from each stage
/// rather than bailing out on the first one.
pub struct BrokerServer {
    batcher: TelemetryBatcher,
    batcher_scheduler: JoinHandle<()>,
    mqtt_task: JoinHandle<()>,
    bootstrap_task: JoinHandle<()>,
}

impl BrokerServer {
    /// Wires every subsystem and starts listening. Hooks are registered on
    /// the rmqtt engine before the TCP listener is bound, so no packet can
    /// traverse an un-hooked broker.
    pub async fn start(config: BrokerConfig) -> Result<Self> {
        let database = Database::open(&config.data_dir)
            .with_context(|| format!("failed to open broker database in {}", config.data_dir.display()))?;

        let tenants = TenantStore::new(database.clone());
        let devices = DeviceCredentialStore::new(database.clone());
        let telemetry = TelemetryStore::new(database);

        let pepper = load_pepper(&config);

        let authenticator = Authenticator::new(devices, pepper.clone());
        let sessions = SessionStore::new();

        let batcher = TelemetryBatcher::new(
            telemetry,
            config.batch_max_size,
            Duration::from_millis(config.batch_flush_interval_ms),
            config.batch_max_retries as u32,
        );
        let batcher_scheduler = batcher.start();

        let hook_context =
            Arc::new(HookContext::new(authenticator, sessions, batcher.clone(), &config));

        let mqtt_task = start_mqtt_server(&config, hook_context).await?;
        let bootstrap_task = start_bootstrap_server(&config, tenants, pepper).await?;

        info!("broker server fully started");

        Ok(Self {
            batcher,
            batcher_scheduler,
            mqtt_task,
            bootstrap_task,
        })
    }

    /// Drains the batcher and tears down both listeners. Every stage is
    /// attempted regardless of whether an earlier one reported an error;
    /// all errors are collected and returned together.
    pub async fn stop(self) -> Result<()> {
        let mut errors = Vec::new();

        self.bootstrap_task.abort();
        if let Err(err) = self.bootstrap_task.await {
            if !err.is_cancelled() {
                errors.push(anyhow::anyhow!("bootstrap server task panicked: {err}"));
            }
        }

        self.mqtt_task.abort();
        if let Err(err) = self.mqtt_task.await {
            if !err.is_cancelled() {
                errors.push(anyhow::anyhow!("mqtt server task panicked: {err}"));
            }
        }

        self.batcher.stop(self.batcher_scheduler).await;

        if errors.is_empty() {
            Ok(())
        } else {
            let combined = errors.into_iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
            Err(anyhow::anyhow!("broker shutdown reported errors: {combined}"))
        }
    }
}

fn load_pepper(config: &BrokerConfig) -> Pepper {
    match &config.tenant_token_pepper {
        Some(value) => Pepper::new(value.clone()),
        None if config.run_mode.is_production() => {
            // config.validate() already rejects this combination at startup;
            // this arm only guards against a BrokerConfig built by hand.
            panic!("TENANT_TOKEN_PEPPER must be set when RUN_MODE=production");
        }
        None => {
            warn!("TENANT_TOKEN_PEPPER not set; using an ephemeral development pepper");
            Pepper::ephemeral()
        }
    }
}

async fn start_mqtt_server(
    config: &BrokerConfig,
    hook_context: Arc<HookContext>,
) -> Result<JoinHandle<()>> {
    let scx = ServerContext::new().node_id(1).build().await;

    let register = scx.extends.hook_mgr().register();
    let adapter = RmqttHookAdapter::new(hook_context);

    register.add_priority(Type::ClientConnected, 0, Box::new(adapter.clone())).await;
    register.add_priority(Type::ClientDisconnected, 0, Box::new(adapter.clone())).await;
    register.add_priority(Type::MessagePublishCheckAcl, 0, Box::new(adapter.clone())).await;
    register.add_priority(Type::MessagePublish, 0, Box::new(adapter.clone())).await;
    register.add_priority(Type::ClientSubscribeCheckAcl, 0, Box::new(adapter)).await;
    register.start().await;

    let bind_addr: std::net::IpAddr = config
        .mqtt_host
        .parse()
        .with_context(|| format!("invalid MQTT_HOST {:?}", config.mqtt_host))?;

    let listener = ListenerBuilder::new()
        .name(&config.broker_name)
        .laddr((bind_addr, config.mqtt_port).into())
        .max_packet_size(config.max_payload_size_bytes as u32)
        .bind()
        .with_context(|| format!("failed to bind MQTT listener on {}:{}", config.mqtt_host, config.mqtt_port))?
        .tcp()
        .with_context(|| format!("failed to start MQTT listener on {}:{}", config.mqtt_host, config.mqtt_port))?;

    let server = MqttServer::new(scx).listener(listener).build();

    info!(host = %config.mqtt_host, port = config.mqtt_port, "MQTT listener bound");

    Ok(tokio::spawn(async move {
        if let Err(err) = server.run().await {
            tracing::error!(error = %err, "MQTT server task exited with an error");
        }
    }))
}

async fn start_bootstrap_server(
    config: &BrokerConfig,
    tenants: TenantStore,
    pepper: Pepper,
) -> Result<JoinHandle<()>> {
    let service = Arc::new(BootstrapService::new(
        tenants,
        pepper,
        config.bootstrap_rate_limit_per_minute,
    ));
    let state = Arc::new(ApiState::new(service));
    let router = api::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.bootstrap_host, config.bootstrap_port)
        .parse()
        .with_context(|| {
            format!(
                "invalid bootstrap listener address {}:{}",
                config.bootstrap_host, config.bootstrap_port
            )
        })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind bootstrap listener on {addr}"))?;

    info!(%addr, "bootstrap HTTP listener bound");

    Ok(tokio::spawn(async move {
        let make_service = router.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(err) = axum::serve(listener, make_service).await {
            tracing::error!(error = %err, "bootstrap server task exited with an error");
        }
    }))
}
