use crate::tasks;
use agent_domain::{AgentState, EventPublisher, ObdSource};
use agent_storage::FileBuffer;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Tick cadence for the three periodic tasks.
#[derive(Debug, Clone, Copy)]
pub struct TickIntervals {
    pub collection: Duration,
    pub session: Duration,
    pub transmission: Duration,
}

/// Drive the collection, session and transmission ticks until
/// cancelled.
///
/// All three tick bodies run on this one task: a tick body always runs
/// to completion before the next body starts, so the busy flag's
/// check-then-set sequence cannot interleave. Missed ticks are skipped,
/// not replayed.
pub async fn run_scheduler(
    state: Arc<AgentState>,
    obd: Arc<dyn ObdSource>,
    buffer: Arc<FileBuffer>,
    publisher: Arc<dyn EventPublisher>,
    intervals: TickIntervals,
    token: CancellationToken,
) -> Result<(), anyhow::Error> {
    let mut collection = tokio::time::interval(intervals.collection);
    let mut session = tokio::time::interval(intervals.session);
    let mut transmission = tokio::time::interval(intervals.transmission);
    collection.set_missed_tick_behavior(MissedTickBehavior::Delay);
    session.set_missed_tick_behavior(MissedTickBehavior::Delay);
    transmission.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        collection = ?intervals.collection,
        session = ?intervals.session,
        transmission = ?intervals.transmission,
        "scheduler started"
    );

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!("scheduler stopping");
                return Ok(());
            }
            _ = collection.tick() => {
                if let Err(err) = tasks::collection_tick(&state, obd.as_ref(), &buffer).await {
                    error!(error = %err, "collection tick failed");
                }
            }
            _ = session.tick() => {
                tasks::session_tick(&state, publisher.as_ref()).await;
            }
            _ = transmission.tick() => {
                if let Err(err) = tasks::transmission_tick(&state, &buffer, publisher.as_ref()).await {
                    error!(error = %err, "transmission tick failed");
                }
            }
        }
    }
}
