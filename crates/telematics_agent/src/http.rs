use agent_domain::{AgentState, EngineStatus};
use axum::{extract::State, response::Json, routing::post, Router};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Control surface for the simulated engine switch.
pub fn router(state: Arc<AgentState>) -> Router {
    Router::new()
        .route("/engine/on", post(engine_on))
        .route("/engine/off", post(engine_off))
        .with_state(state)
}

async fn engine_on(State(state): State<Arc<AgentState>>) -> Json<EngineStatus> {
    Json(state.set_engine(true))
}

async fn engine_off(State(state): State<Arc<AgentState>>) -> Json<EngineStatus> {
    Json(state.set_engine(false))
}

pub async fn serve(
    addr: String,
    state: Arc<AgentState>,
    token: CancellationToken,
) -> Result<(), anyhow::Error> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "engine control endpoints listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;
    Ok(())
}
