use tenant_mqtt_broker::config::BrokerConfig;
use tenant_mqtt_broker::BrokerServer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BrokerConfig::from_env()?;
    init_tracing(&config.log_level);

    info!("tenant-mqtt-broker starting");
    info!(
        mqtt = format!("{}:{}", config.mqtt_host, config.mqtt_port),
        bootstrap = format!("{}:{}", config.bootstrap_host, config.bootstrap_port),
        data_dir = %config.data_dir.display(),
        run_mode = ?config.run_mode,
        "configuration loaded"
    );

    let server = BrokerServer::start(config).await?;
    info!("tenant-mqtt-broker started");

    shutdown_signal().await;
    info!("shutdown signal received, draining subsystems");

    server.stop().await?;
    info!("tenant-mqtt-broker stopped");
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt().with_env_filter(filter).with_target(false).compact().init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
