use super::{
    fcu_link::FlightControllerLink,
    offboard_phase::OffboardPhase,
    sequencer::{OffboardSequencer, RequestKind, TickOutput, VehicleRequest},
    setpoint::Setpoint,
    telemetry_cache::{TelemetryCache, TelemetrySnapshot},
};
use crate::config::OffboardConfig;
use crate::{fcu, info, log, warn};
use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};
use tokio::{
    sync::{mpsc, watch},
    time::{Instant, MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;

/// Runs the fixed-rate tick loop.
///
/// Every tick takes one snapshot of the [`TelemetryCache`], advances the
/// [`OffboardSequencer`] with it and hands the resulting setpoint and request to the
/// [`FlightControllerLink`]. Setpoints go through a single publisher task that always
/// sends the latest one, so at most one publication is in flight and they arrive in
/// order. Mode and arm requests run in spawned tasks. Neither a slow bridge nor a slow
/// service delays the next tick.
pub struct FlightComputer {
    sequencer: OffboardSequencer,
    cache: Arc<TelemetryCache>,
    link: Arc<dyn FlightControllerLink>,
    tick_period: Duration,
    warmup_ticks: u32,
    /// Latest setpoint, consumed by the publisher task.
    setpoint_tx: watch::Sender<Option<Setpoint>>,
    /// Finished mode/arm requests, reported back by their tasks.
    done_tx: mpsc::UnboundedSender<RequestKind>,
    done_rx: mpsc::UnboundedReceiver<RequestKind>,
    /// Failed setpoint publications since the last diagnostic.
    publish_failures: Arc<AtomicU32>,
}

impl FlightComputer {
    /// Records older than this are reported by the diagnostic.
    const STALE_TELEMETRY: Duration = Duration::from_secs(1);
    const MAX_NORM_DEVIATION: f64 = 0.01;

    pub fn new(
        config: &OffboardConfig,
        cache: Arc<TelemetryCache>,
        link: Arc<dyn FlightControllerLink>,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (setpoint_tx, _) = watch::channel(None);
        Self {
            sequencer: OffboardSequencer::new(config),
            cache,
            link,
            tick_period: config.tick_period(),
            warmup_ticks: config.warmup_ticks,
            setpoint_tx,
            done_tx,
            done_rx,
            publish_failures: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn sequencer(&self) -> &OffboardSequencer { &self.sequencer }

    /// Ticks until `cancel` fires. Missed ticks are skipped, not caught up.
    pub async fn run(&mut self, cancel: CancellationToken) {
        let mut ticker = interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let publisher = tokio::spawn(Self::publish_latest(
            Arc::clone(&self.link),
            self.setpoint_tx.subscribe(),
            Arc::clone(&self.publish_failures),
        ));
        info!(
            "Tick loop running at {:.1} Hz with target orientation {}, waiting for flight controller link.",
            1.0 / self.tick_period.as_secs_f64(),
            self.sequencer.composer().target_orientation()
        );
        loop {
            let now = tokio::select! {
                () = cancel.cancelled() => break,
                now = ticker.tick() => now,
            };
            self.tick(now).await;
        }
        publisher.abort();
        let seq = self.sequencer();
        info!(
            "Tick loop stopped in phase {} after {} ticks ({} warm-up ticks).",
            seq.phase(),
            seq.tick_count(),
            seq.step_count()
        );
    }

    /// Executes a single tick at `now` and returns what the sequencer decided.
    pub async fn tick(&mut self, now: Instant) -> TickOutput {
        while let Ok(kind) = self.done_rx.try_recv() {
            self.sequencer.on_request_complete(kind);
        }
        let telemetry = self.cache.snapshot().await;
        let out = self.sequencer.step(&telemetry, now);

        if let Some(setpoint) = out.setpoint {
            self.setpoint_tx.send_replace(Some(setpoint));
        }
        if let Some(request) = out.request.clone() {
            self.dispatch_request(request);
        }
        self.report(&out, &telemetry);
        out
    }

    /// Publishes the most recent setpoint whenever a new one is handed over. Setpoints
    /// superseded while a publication is in flight are skipped.
    async fn publish_latest(
        link: Arc<dyn FlightControllerLink>,
        mut setpoints: watch::Receiver<Option<Setpoint>>,
        failures: Arc<AtomicU32>,
    ) {
        while setpoints.changed().await.is_ok() {
            let Some(setpoint) = *setpoints.borrow_and_update() else {
                continue;
            };
            let res = match setpoint {
                Setpoint::Position(sp) => link.publish_position(sp).await,
                Setpoint::Attitude(sp) => link.publish_attitude(sp).await,
            };
            if res.is_err() {
                failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn dispatch_request(&self, request: VehicleRequest) {
        let link = Arc::clone(&self.link);
        let done = self.done_tx.clone();
        let kind = request.kind();
        tokio::spawn(async move {
            match request {
                VehicleRequest::SetMode { custom_mode } => match link.set_mode(&custom_mode).await {
                    Ok(true) => fcu!("{custom_mode} enabled"),
                    Ok(false) => warn!("Mode change to {custom_mode} was not sent."),
                    Err(err) => warn!("Mode change to {custom_mode} failed: {err:?}"),
                },
                VehicleRequest::Arm { value } => match link.arm(value).await {
                    Ok(true) => fcu!("Vehicle armed"),
                    Ok(false) => warn!("Arming was rejected by the flight controller."),
                    Err(err) => warn!("Arming request failed: {err:?}"),
                },
            }
            // The receiver lives as long as the tick loop.
            done.send(kind).ok();
        });
    }

    fn report(&self, out: &TickOutput, telemetry: &TelemetrySnapshot) {
        if let Some((from, to)) = out.transition {
            info!("Phase {from} -> {to}");
            match to {
                OffboardPhase::Warmup => {
                    info!("Holding position setpoint for {} ticks.", self.warmup_ticks);
                }
                OffboardPhase::AttitudeHold => info!("Start to use attitude!"),
                _ => {}
            }
        }
        if let Some(VehicleRequest::Arm { .. }) = out.request {
            fcu!("Trying to arm");
        }
        if let Some(mode) = &out.mode_drift {
            warn!("Flight controller left offboard control, reported mode is '{mode}'.");
        }
        if let Some(euler) = out.diagnostic {
            log!("IMU attitude: {euler}");
            let norm = telemetry.orientation.norm();
            if (norm - 1.0).abs() > Self::MAX_NORM_DEVIATION {
                warn!("IMU orientation is not a unit quaternion (|q| = {norm:.4}).");
            }
            let stale = telemetry.stale_records(Self::STALE_TELEMETRY);
            if out.phase != OffboardPhase::AwaitingLink && !stale.is_empty() {
                warn!("No recent telemetry for: {}", stale.join(", "));
            }
            let failures = self.publish_failures.swap(0, Ordering::Relaxed);
            if failures > 0 {
                warn!("{failures} setpoint publications failed since the last report.");
            }
        }
    }
}
