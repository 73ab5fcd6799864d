use agent_domain::{AgentState, Device, EventPublisher, ObdSource, Vehicle};
use agent_runner::Runner;
use agent_storage::FileBuffer;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use telematics_agent::auth::AuthClient;
use telematics_agent::config::AgentConfig;
use telematics_agent::obd::FixedObdSource;
use telematics_agent::scheduler::{run_scheduler, TickIntervals};
use telematics_agent::{http, mqtt};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(device_id = %config.device_id, vehicle_id = %config.vehicle_id, "starting telematics agent");

    if let Err(err) = run(config).await {
        error!("agent exited with error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(config: AgentConfig) -> Result<(), anyhow::Error> {
    // No credential, no broker session
    let auth = AuthClient::new(
        &config.auth_issuer,
        &config.auth_client_id,
        &config.auth_client_secret,
        Duration::from_secs(config.auth_timeout_secs),
    )?;
    let access_token = auth
        .authenticate()
        .await
        .context("authentication failed, refusing to start")?;

    let state = Arc::new(AgentState::new(
        Device::new(&config.vehicle_id, &config.device_id),
        Vehicle::new(&config.vehicle_id),
    ));
    let buffer = Arc::new(FileBuffer::open(&config.storage_dir).await?);
    let obd: Arc<dyn ObdSource> = Arc::new(FixedObdSource::new());

    let (gateway, eventloop) = mqtt::connect(&config, &access_token)?;
    gateway.announce().await?;
    let gateway = Arc::new(gateway);
    let publisher: Arc<dyn EventPublisher> = gateway.clone();

    let intervals = TickIntervals {
        collection: Duration::from_secs(config.collect_interval_secs),
        session: Duration::from_secs(config.session_interval_secs),
        transmission: Duration::from_secs(config.transmit_interval_secs),
    };

    let runner = Runner::new()
        .with_process({
            let state = state.clone();
            move |token| mqtt::run_event_loop(state, eventloop, token)
        })
        .with_process({
            let state = state.clone();
            move |token| run_scheduler(state, obd, buffer, publisher, intervals, token)
        })
        .with_process({
            let state = state.clone();
            let addr = config.http_addr.clone();
            move |token| http::serve(addr, state, token)
        })
        .with_closer({
            let gateway = gateway.clone();
            move || async move {
                if let Err(err) = gateway.disconnect().await {
                    error!(error = %err, "broker disconnect failed");
                }
                Ok(())
            }
        })
        .with_closer_timeout(Duration::from_secs(5));

    runner.run().await
}
