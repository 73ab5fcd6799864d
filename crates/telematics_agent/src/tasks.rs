use agent_domain::{
    AgentState, DomainResult, EventPublisher, ObdSource, ProtocolEvent, TelemetrySample,
};
use agent_storage::FileBuffer;
use tracing::{debug, error, info};

/// Collection tick: acquire one sample and buffer it. Local-only, so it
/// never touches the busy flag.
pub async fn collection_tick(
    state: &AgentState,
    obd: &dyn ObdSource,
    buffer: &FileBuffer,
) -> DomainResult<()> {
    let snap = state.snapshot();
    if !snap.active || !snap.session_open || !snap.engine_on {
        debug!(
            active = snap.active,
            session_open = snap.session_open,
            engine_on = snap.engine_on,
            "collection skipped"
        );
        return Ok(());
    }

    let (vehicle_id, device_id) = state.identity();
    let sample = TelemetrySample::new(vehicle_id, device_id, obd.read());
    buffer.append(&sample).await?;
    debug!("buffered telemetry sample");
    Ok(())
}

/// Session tick: evaluate the start/end guards and drive the
/// driving-session transitions. Local session state mutates only after
/// the corresponding event was handed to the transport without error,
/// so local and published state cannot diverge. The busy flag is
/// released on every exit path.
pub async fn session_tick(state: &AgentState, publisher: &dyn EventPublisher) {
    let snap = state.snapshot();
    let (vehicle_id, device_id) = state.identity();

    if snap.active && !snap.busy && !snap.session_open && snap.engine_on {
        state.set_busy(true);
        let event = ProtocolEvent::driving_session_start(&device_id, &vehicle_id);
        match publisher.publish(&event).await {
            Ok(()) => state.start_driving_session(),
            Err(err) => error!(error = %err, "failed to announce driving-session start"),
        }
        state.set_busy(false);
    } else if snap.active && !snap.busy && snap.session_open && !snap.engine_on {
        state.set_busy(true);
        let event = ProtocolEvent::driving_session_end(&device_id, &vehicle_id);
        match publisher.publish(&event).await {
            Ok(()) => state.end_driving_session(),
            Err(err) => error!(error = %err, "failed to announce driving-session end"),
        }
        state.set_busy(false);
    }
}

/// Transmission tick: drain the buffer and send one metric event per
/// sample, in buffer order. Individual send failures are logged and the
/// samples dropped; drain errors propagate after the busy flag is
/// released.
pub async fn transmission_tick(
    state: &AgentState,
    buffer: &FileBuffer,
    publisher: &dyn EventPublisher,
) -> DomainResult<()> {
    let snap = state.snapshot();
    if !snap.active {
        debug!("transmission deferred: device not activated");
        return Ok(());
    }
    if snap.busy {
        debug!("transmission deferred: device busy");
        return Ok(());
    }
    if !snap.session_open {
        debug!("transmission deferred: no driving session open");
        return Ok(());
    }
    if !snap.engine_on {
        debug!("transmission deferred: engine off");
        return Ok(());
    }

    state.set_busy(true);
    let result = drain_and_send(buffer, publisher).await;
    state.set_busy(false);
    result
}

async fn drain_and_send(buffer: &FileBuffer, publisher: &dyn EventPublisher) -> DomainResult<()> {
    let samples = buffer.drain().await?;
    if samples.is_empty() {
        debug!("no buffered samples to transmit");
        return Ok(());
    }

    info!(count = samples.len(), "transmitting buffered samples");
    for sample in &samples {
        match ProtocolEvent::metric(sample) {
            Ok(event) => {
                if let Err(err) = publisher.publish(&event).await {
                    error!(error = %err, "metric send failed, sample dropped");
                }
            }
            Err(err) => error!(error = %err, "metric serialization failed, sample dropped"),
        }
    }
    Ok(())
}
