use super::{
    Supervisor,
    fcu_link::{FlightControllerLink, LinkError},
    flight_computer::FlightComputer,
    offboard_phase::OffboardPhase,
    rotation::{EulerAngles, Quaternion, euler_to_quaternion, quaternion_to_euler},
    sequencer::{OffboardSequencer, RequestKind, VehicleRequest},
    setpoint::{AttitudeSetpoint, AttitudeTypeMask, Position, PositionSetpoint, Setpoint, SetpointComposer},
    telemetry_cache::{OrientationSample, TelemetryCache, TelemetrySnapshot, TelemetryUpdate, VehicleState},
};
use crate::config::OffboardConfig;
use crate::http_handler::http_client::HTTPClient;
use async_trait::async_trait;
use itertools::Itertools;
use rand::{Rng, rng};
use std::{
    f64::consts::{FRAC_PI_2, PI},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    time::{Instant, sleep, timeout},
};
use tokio_util::sync::CancellationToken;

const TOL: f64 = 1e-5;
const TICK: Duration = Duration::from_millis(50);

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + (end - start) * i as f64 / (n - 1) as f64).collect()
}

/// Snapshot of telemetry that was received just now.
fn fresh(state: VehicleState, orientation: Quaternion) -> TelemetrySnapshot {
    TelemetrySnapshot {
        state,
        orientation,
        euler: orientation.to_euler(),
        state_age: Some(Duration::ZERO),
        orientation_age: Some(Duration::ZERO),
    }
}

fn telemetry(connected: bool, armed: bool, mode: &str) -> TelemetrySnapshot {
    fresh(VehicleState { connected, armed, mode: mode.to_string() }, Quaternion::IDENTITY)
}

/// Steps `seq` `n` times with the same telemetry, starting at `*now` and advancing it.
fn run_ticks(
    seq: &mut OffboardSequencer,
    snap: &TelemetrySnapshot,
    now: &mut Instant,
    n: usize,
) -> Vec<super::sequencer::TickOutput> {
    (0..n)
        .map(|_| {
            let out = seq.step(snap, *now);
            *now += TICK;
            out
        })
        .collect()
}

#[test]
fn test_euler_round_trip() {
    let eps = 0.05;
    let rolls = linspace(-PI + eps, PI - eps, 15);
    let pitches = linspace(-FRAC_PI_2 + eps, FRAC_PI_2 - eps, 15);
    let yaws = linspace(-PI + eps, PI - eps, 15);

    for ((&r, &p), &y) in rolls.iter().cartesian_product(&pitches).cartesian_product(&yaws) {
        let back = quaternion_to_euler(euler_to_quaternion(EulerAngles::new(r, p, y)));
        assert!(
            (back.roll - r).abs() < TOL && (back.pitch - p).abs() < TOL && (back.yaw - y).abs() < TOL,
            "round trip of ({r}, {p}, {y}) gave {back:?}"
        );
    }
}

#[test]
fn test_euler_to_quaternion_is_unit() {
    let mut rand = rng();
    for _ in 0..10_000 {
        let angles = EulerAngles::new(
            rand.random_range(-10.0..10.0),
            rand.random_range(-10.0..10.0),
            rand.random_range(-10.0..10.0),
        );
        let norm = euler_to_quaternion(angles).norm();
        assert!((norm - 1.0).abs() < 1e-9, "norm {norm} for {angles:?}");
    }
}

#[test]
fn test_quaternion_to_euler_clamps_pitch() {
    // 2(wy - zx) = 1.28, outside the arcsine domain
    let overshoot = quaternion_to_euler(Quaternion::new(0.8, 0.0, 0.8, 0.0));
    assert!(overshoot.pitch.is_finite());
    assert!((overshoot.pitch - FRAC_PI_2).abs() < 1e-12);

    let undershoot = quaternion_to_euler(Quaternion::new(0.8, 0.0, -0.8, 0.0));
    assert!((undershoot.pitch + FRAC_PI_2).abs() < 1e-12);

    let mut rand = rng();
    for _ in 0..10_000 {
        let base = euler_to_quaternion(EulerAngles::new(
            rand.random_range(-PI..PI),
            rand.random_range(-FRAC_PI_2..FRAC_PI_2),
            rand.random_range(-PI..PI),
        ));
        let noisy = Quaternion::new(
            base.w + rand.random_range(-0.2..0.2),
            base.x + rand.random_range(-0.2..0.2),
            base.y + rand.random_range(-0.2..0.2),
            base.z + rand.random_range(-0.2..0.2),
        );
        let e = quaternion_to_euler(noisy);
        assert!(e.roll.is_finite() && e.pitch.is_finite() && e.yaw.is_finite());
        assert!((-FRAC_PI_2..=FRAC_PI_2).contains(&e.pitch), "pitch {} for {noisy:?}", e.pitch);
    }
}

#[test]
fn test_euler_convention_matches_nalgebra() {
    let mut rand = rng();
    for _ in 0..1000 {
        let (r, p, y) = (
            rand.random_range(-PI..PI),
            rand.random_range(-1.5..1.5),
            rand.random_range(-PI..PI),
        );
        let ours = euler_to_quaternion(EulerAngles::new(r, p, y));
        let reference = nalgebra::UnitQuaternion::from_euler_angles(r, p, y);
        assert!((ours.w - reference.w).abs() < 1e-12);
        assert!((ours.x - reference.i).abs() < 1e-12);
        assert!((ours.y - reference.j).abs() < 1e-12);
        assert!((ours.z - reference.k).abs() < 1e-12);

        let (nr, np, ny) = reference.euler_angles();
        let back = ours.to_euler();
        assert!((back.roll - nr).abs() < 1e-9);
        assert!((back.pitch - np).abs() < 1e-9);
        assert!((back.yaw - ny).abs() < 1e-9);
    }
}

#[test]
fn test_known_orientations() {
    assert_eq!(EulerAngles::default().to_quaternion(), Quaternion::IDENTITY);

    let yaw_90 = Quaternion::new(0.5f64.sqrt(), 0.0, 0.0, 0.5f64.sqrt());
    let e = yaw_90.to_euler();
    assert!(e.roll.abs() < 1e-12 && e.pitch.abs() < 1e-12);
    assert!((e.yaw - FRAC_PI_2).abs() < 1e-12);

    let (r, p, y) = EulerAngles::from_degrees(30.0, -20.0, 135.0).to_quaternion().to_euler().to_degrees();
    assert!((r - 30.0).abs() < 1e-9 && (p + 20.0).abs() < 1e-9 && (y - 135.0).abs() < 1e-9);
}

#[test]
fn test_level_attitude_setpoint() {
    let composer = SetpointComposer::new(EulerAngles::from_degrees(0.0, 0.0, 0.0));
    let sp = composer.build_attitude_setpoint(0.705_912_2);
    assert_eq!(sp.orientation, Quaternion::new(1.0, 0.0, 0.0, 0.0));
    assert!((sp.thrust - 0.705_912_2).abs() < f64::EPSILON);
    assert_eq!(sp.type_mask, AttitudeTypeMask::IGNORE_BODY_RATES);
    assert_eq!(sp.type_mask.bits(), 0b0000_0111);

    let pos = composer.build_position_setpoint(Position::new(1.0, 2.0, 5.0));
    assert_eq!(pos.position, Position::new(1.0, 2.0, 5.0));
    assert_eq!(pos.orientation, composer.target_orientation());
}

#[test]
fn test_attitude_thrust_is_clamped() {
    let composer = SetpointComposer::new(EulerAngles::from_degrees(5.0, 0.0, 45.0));
    assert!((composer.build_attitude_setpoint(1.7).thrust - 1.0).abs() < f64::EPSILON);
    assert!(composer.build_attitude_setpoint(-0.3).thrust.abs() < f64::EPSILON);
    assert_eq!(
        composer.build_attitude_setpoint(0.5).orientation,
        composer.build_position_setpoint(Position::default()).orientation
    );
}

#[test]
fn test_sequencer_visits_phases_in_order() {
    let cfg = OffboardConfig::default();
    let mut seq = OffboardSequencer::new(&cfg);
    let mut now = Instant::now();
    let mut outputs = Vec::new();

    outputs.extend(run_ticks(&mut seq, &telemetry(false, false, ""), &mut now, 30));
    assert!(outputs.iter().all(|o| o.setpoint.is_none() && o.request.is_none()));

    // link up in HOLD until the mode request goes out
    let hold = telemetry(true, false, "HOLD");
    let mut requested = false;
    for _ in 0..200 {
        let out = seq.step(&hold, now);
        now += TICK;
        requested = out.request.is_some();
        outputs.push(out);
        if requested {
            break;
        }
    }
    assert!(requested);
    seq.on_request_complete(RequestKind::SetMode);

    outputs.extend(run_ticks(&mut seq, &telemetry(true, false, "OFFBOARD"), &mut now, 3));
    seq.on_request_complete(RequestKind::Arm);
    outputs.extend(run_ticks(&mut seq, &telemetry(true, true, "OFFBOARD"), &mut now, 410));

    for (prev, out) in outputs.iter().tuple_windows() {
        assert_eq!(out.setpoint.is_some(), prev.phase.publishes());
    }
    let visited: Vec<OffboardPhase> = outputs.iter().map(|o| o.phase).dedup().collect();
    assert_eq!(
        visited,
        vec![
            OffboardPhase::AwaitingLink,
            OffboardPhase::RequestingMode,
            OffboardPhase::RequestingArm,
            OffboardPhase::Warmup,
            OffboardPhase::AttitudeHold,
        ]
    );
    let requests: Vec<VehicleRequest> = outputs.iter().filter_map(|o| o.request.clone()).collect();
    assert_eq!(
        requests,
        vec![
            VehicleRequest::SetMode { custom_mode: String::from("OFFBOARD") },
            VehicleRequest::Arm { value: true },
        ]
    );
    assert_eq!(seq.phase(), OffboardPhase::AttitudeHold);
}

#[test]
fn test_first_mode_request_waits_for_cooldown_after_link() {
    let cfg = OffboardConfig::default();
    let mut seq = OffboardSequencer::new(&cfg);
    let start = Instant::now();
    let hold = telemetry(true, false, "HOLD");

    let out = seq.step(&hold, start);
    assert_eq!(out.transition, Some((OffboardPhase::AwaitingLink, OffboardPhase::RequestingMode)));
    assert!(out.request.is_none());

    let early = seq.step(&hold, start + Duration::from_millis(4950));
    assert!(early.request.is_none());
    assert!(matches!(early.setpoint, Some(Setpoint::Position(_))));

    let due = seq.step(&hold, start + Duration::from_secs(5));
    assert_eq!(due.request, Some(VehicleRequest::SetMode { custom_mode: String::from("OFFBOARD") }));
}

#[test]
fn test_matching_mode_skips_mode_request() {
    let cfg = OffboardConfig::default();
    let mut seq = OffboardSequencer::new(&cfg);
    let mut now = Instant::now();
    let outs = run_ticks(&mut seq, &telemetry(true, false, "OFFBOARD"), &mut now, 3);

    assert_eq!(outs[0].phase, OffboardPhase::RequestingMode);
    assert_eq!(outs[1].phase, OffboardPhase::RequestingArm);
    assert!(outs[1].request.is_none());
    assert_eq!(outs[2].request, Some(VehicleRequest::Arm { value: true }));
}

#[test]
fn test_requests_respect_cooldown() {
    let cfg = OffboardConfig::default();
    let modes = ["OFFBOARD", "HOLD", "POSCTL"];
    let mut rand = rng();

    for _ in 0..50 {
        let mut seq = OffboardSequencer::new(&cfg);
        let mut now = Instant::now();
        let mut last_mode: Option<Instant> = None;
        let mut last_arm: Option<Instant> = None;

        for _ in 0..2000 {
            let snap = telemetry(
                rand.random_bool(0.95),
                rand.random_bool(0.05),
                modes[rand.random_range(0..modes.len())],
            );
            let out = seq.step(&snap, now);
            if let Some(req) = out.request {
                let last = match req.kind() {
                    RequestKind::SetMode => &mut last_mode,
                    RequestKind::Arm => &mut last_arm,
                };
                if let Some(prev) = *last {
                    assert!(now - prev >= cfg.request_cooldown, "{req:?} only {:?} apart", now - prev);
                }
                *last = Some(now);
                seq.on_request_complete(req.kind());
            }
            now += Duration::from_millis(rand.random_range(1..400));
        }
    }
}

#[test]
fn test_request_in_flight_blocks_next_request() {
    let cfg = OffboardConfig::default();
    let mut seq = OffboardSequencer::new(&cfg);
    let start = Instant::now();
    let hold = telemetry(true, false, "HOLD");

    seq.step(&hold, start);
    assert!(seq.step(&hold, start + Duration::from_secs(5)).request.is_some());
    assert!(seq.step(&hold, start + Duration::from_secs(20)).request.is_none());

    seq.on_request_complete(RequestKind::SetMode);
    assert!(seq.step(&hold, start + Duration::from_secs(21)).request.is_some());
}

#[test]
fn test_mode_mismatch_takes_priority_over_arming() {
    let cfg = OffboardConfig::default();
    let mut seq = OffboardSequencer::new(&cfg);
    let mut now = Instant::now();
    run_ticks(&mut seq, &telemetry(true, false, "OFFBOARD"), &mut now, 2);
    assert_eq!(seq.phase(), OffboardPhase::RequestingArm);

    // armed, but the flight controller fell back to another mode
    now += Duration::from_secs(6);
    let out = seq.step(&telemetry(true, true, "POSCTL"), now);
    assert_eq!(out.phase, OffboardPhase::RequestingMode);
    assert_eq!(out.request, Some(VehicleRequest::SetMode { custom_mode: String::from("OFFBOARD") }));
    assert_ne!(seq.phase(), OffboardPhase::Warmup);
}

#[test]
fn test_warmup_boundary() {
    let cfg = OffboardConfig::default();
    let mut seq = OffboardSequencer::new(&cfg);
    let mut now = Instant::now();
    let ready = telemetry(true, true, "OFFBOARD");
    run_ticks(&mut seq, &ready, &mut now, 3);
    assert_eq!(seq.phase(), OffboardPhase::Warmup);
    assert_eq!(seq.step_count(), 0);

    let warmup = run_ticks(&mut seq, &ready, &mut now, 400);
    assert!(warmup.iter().all(|o| matches!(o.setpoint, Some(Setpoint::Position(_)))));
    assert_eq!(seq.step_count(), 400);
    assert_eq!(warmup[398].phase, OffboardPhase::Warmup);
    assert_eq!(warmup[399].transition, Some((OffboardPhase::Warmup, OffboardPhase::AttitudeHold)));

    let hold = run_ticks(&mut seq, &ready, &mut now, 50);
    let expected = seq.composer().build_attitude_setpoint(cfg.target_thrust);
    assert!(hold.iter().all(|o| o.setpoint == Some(Setpoint::Attitude(expected))));
    assert!(hold.iter().all(|o| o.transition.is_none() && o.request.is_none()));
}

#[test]
fn test_mode_drift_after_arming_is_reported_once() {
    let cfg = OffboardConfig { warmup_ticks: 10, ..OffboardConfig::default() };
    let mut seq = OffboardSequencer::new(&cfg);
    let mut now = Instant::now();
    run_ticks(&mut seq, &telemetry(true, true, "OFFBOARD"), &mut now, 20);
    assert_eq!(seq.phase(), OffboardPhase::AttitudeHold);

    let drift = run_ticks(&mut seq, &telemetry(true, true, "AUTO.LAND"), &mut now, 200);
    let reports: Vec<&str> = drift.iter().filter_map(|o| o.mode_drift.as_deref()).collect();
    assert_eq!(reports, vec!["AUTO.LAND"]);
    assert!(drift.iter().all(|o| o.request.is_none() && o.phase == OffboardPhase::AttitudeHold));

    run_ticks(&mut seq, &telemetry(true, true, "OFFBOARD"), &mut now, 1);
    let again = run_ticks(&mut seq, &telemetry(true, true, "AUTO.LAND"), &mut now, 5);
    assert_eq!(again.iter().filter(|o| o.mode_drift.is_some()).count(), 1);
}

#[test]
fn test_diagnostic_period() {
    let cfg = OffboardConfig::default();
    let mut seq = OffboardSequencer::new(&cfg);
    let mut now = Instant::now();
    let tilted = Quaternion::new(0.9659258, 0.258819, 0.0, 0.0);
    let snap = fresh(VehicleState::default(), tilted);
    let outs = run_ticks(&mut seq, &snap, &mut now, 100);

    let ticks: Vec<usize> =
        outs.iter().enumerate().filter(|(_, o)| o.diagnostic.is_some()).map(|(i, _)| i).collect();
    assert_eq!(ticks, vec![0, 20, 40, 60, 80]);
    let roll = outs[0].diagnostic.unwrap().to_degrees().0;
    assert!((roll - 30.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_cache_replaces_records() {
    let cache = TelemetryCache::new();
    let empty = cache.snapshot().await;
    assert_eq!(empty.stale_records(Duration::from_secs(1)), vec!["vehicle state", "orientation"]);

    cache
        .on_vehicle_state(VehicleState { connected: true, armed: false, mode: String::from("HOLD") })
        .await;
    cache
        .apply(TelemetryUpdate::from(VehicleState {
            connected: true,
            armed: true,
            mode: String::from("OFFBOARD"),
        }))
        .await;
    let orientation = EulerAngles::from_degrees(0.0, 10.0, -90.0).to_quaternion();
    cache.apply(OrientationSample { orientation }.into()).await;

    let snap = cache.snapshot().await;
    assert_eq!(snap.state.mode, "OFFBOARD");
    assert!(snap.state.armed);
    assert_eq!(snap.orientation, orientation);
    let (_, pitch, yaw) = snap.euler.to_degrees();
    assert!((pitch - 10.0).abs() < 1e-9 && (yaw + 90.0).abs() < 1e-9);
    assert!(snap.stale_records(Duration::from_secs(1)).is_empty());
}

#[derive(Debug, Clone, PartialEq)]
enum LinkCall {
    Position(PositionSetpoint),
    Attitude(AttitudeSetpoint),
    SetMode(String, Instant),
    Arm(bool, Instant),
}

/// In-memory flight controller that applies accepted requests to the telemetry cache.
struct MockLink {
    cache: Arc<TelemetryCache>,
    state: Mutex<VehicleState>,
    calls: Mutex<Vec<LinkCall>>,
    accept_mode: bool,
    accept_arm: bool,
    /// Latency of every setpoint publication.
    publish_delay: Duration,
    publishing: AtomicU32,
    max_publishing: AtomicU32,
}

impl MockLink {
    fn new(cache: Arc<TelemetryCache>, state: VehicleState, accept: bool) -> Self {
        Self {
            cache,
            state: Mutex::new(state),
            calls: Mutex::new(Vec::new()),
            accept_mode: accept,
            accept_arm: accept,
            publish_delay: Duration::ZERO,
            publishing: AtomicU32::new(0),
            max_publishing: AtomicU32::new(0),
        }
    }

    fn with_publish_delay(mut self, delay: Duration) -> Self {
        self.publish_delay = delay;
        self
    }

    async fn publish(&self, call: LinkCall) {
        let publishing = self.publishing.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_publishing.fetch_max(publishing, Ordering::SeqCst);
        if !self.publish_delay.is_zero() {
            tokio::time::sleep(self.publish_delay).await;
        }
        self.record(call);
        self.publishing.fetch_sub(1, Ordering::SeqCst);
    }

    fn calls(&self) -> Vec<LinkCall> { self.calls.lock().unwrap().clone() }

    fn record(&self, call: LinkCall) { self.calls.lock().unwrap().push(call); }

    async fn update_state(&self, change: impl FnOnce(&mut VehicleState)) {
        let state = {
            let mut state = self.state.lock().unwrap();
            change(&mut state);
            state.clone()
        };
        self.cache.on_vehicle_state(state).await;
    }
}

#[async_trait]
impl FlightControllerLink for MockLink {
    async fn publish_position(&self, setpoint: PositionSetpoint) -> Result<(), LinkError> {
        self.publish(LinkCall::Position(setpoint)).await;
        Ok(())
    }

    async fn publish_attitude(&self, setpoint: AttitudeSetpoint) -> Result<(), LinkError> {
        self.publish(LinkCall::Attitude(setpoint)).await;
        Ok(())
    }

    async fn set_mode(&self, custom_mode: &str) -> Result<bool, LinkError> {
        self.record(LinkCall::SetMode(custom_mode.to_string(), Instant::now()));
        if self.accept_mode {
            let mode = custom_mode.to_string();
            self.update_state(|s| s.mode = mode).await;
        }
        Ok(self.accept_mode)
    }

    async fn arm(&self, value: bool) -> Result<bool, LinkError> {
        self.record(LinkCall::Arm(value, Instant::now()));
        if self.accept_arm {
            self.update_state(|s| s.armed = value).await;
        }
        Ok(self.accept_arm)
    }
}

async fn run_for(f_comp: &mut FlightComputer, duration: Duration) {
    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    tokio::join!(f_comp.run(cancel), async move {
        tokio::time::sleep(duration).await;
        stopper.cancel();
    });
    // let spawned link calls finish
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test(start_paused = true)]
async fn test_flight_computer_flies_full_sequence() {
    let cfg = OffboardConfig::default();
    let cache = Arc::new(TelemetryCache::new());
    let initial = VehicleState { connected: true, armed: false, mode: String::from("MANUAL") };
    cache.on_vehicle_state(initial.clone()).await;
    let link = Arc::new(MockLink::new(Arc::clone(&cache), initial, true));
    let mut f_comp = FlightComputer::new(&cfg, Arc::clone(&cache), Arc::clone(&link) as Arc<dyn FlightControllerLink>);

    run_for(&mut f_comp, Duration::from_secs(30)).await;

    assert_eq!(f_comp.sequencer().phase(), OffboardPhase::AttitudeHold);
    let calls = link.calls();
    let requests: Vec<&LinkCall> =
        calls.iter().filter(|c| matches!(c, LinkCall::SetMode(..) | LinkCall::Arm(..))).collect();
    assert_eq!(requests.len(), 2);
    assert!(matches!(requests[0], LinkCall::SetMode(mode, _) if mode == "OFFBOARD"));
    assert!(matches!(requests[1], LinkCall::Arm(true, _)));

    let positions = calls.iter().filter(|c| matches!(c, LinkCall::Position(_))).count();
    let attitudes: Vec<&LinkCall> = calls.iter().filter(|c| matches!(c, LinkCall::Attitude(_))).collect();
    assert!(positions >= 400 + 100);
    assert!(!attitudes.is_empty());
    let expected = SetpointComposer::new(cfg.target_attitude()).build_attitude_setpoint(cfg.target_thrust);
    assert!(attitudes.iter().all(|c| **c == LinkCall::Attitude(expected)));
}

#[tokio::test(start_paused = true)]
async fn test_flight_computer_retries_rejected_mode_after_cooldown() {
    let cfg = OffboardConfig::default();
    let cache = Arc::new(TelemetryCache::new());
    let initial = VehicleState { connected: true, armed: false, mode: String::from("HOLD") };
    cache.on_vehicle_state(initial.clone()).await;
    let link = Arc::new(MockLink::new(Arc::clone(&cache), initial, false));
    let mut f_comp = FlightComputer::new(&cfg, Arc::clone(&cache), Arc::clone(&link) as Arc<dyn FlightControllerLink>);

    run_for(&mut f_comp, Duration::from_secs(12)).await;

    let stamps: Vec<Instant> = link
        .calls()
        .into_iter()
        .filter_map(|c| if let LinkCall::SetMode(_, t) = c { Some(t) } else { None })
        .collect();
    assert_eq!(stamps.len(), 2);
    assert!(stamps[1] - stamps[0] >= cfg.request_cooldown);
    assert_eq!(f_comp.sequencer().phase(), OffboardPhase::RequestingMode);
}

#[tokio::test(start_paused = true)]
async fn test_flight_computer_is_silent_without_link() {
    let cfg = OffboardConfig::default();
    let cache = Arc::new(TelemetryCache::new());
    let link = Arc::new(MockLink::new(Arc::clone(&cache), VehicleState::default(), true));
    let mut f_comp = FlightComputer::new(&cfg, Arc::clone(&cache), Arc::clone(&link) as Arc<dyn FlightControllerLink>);

    run_for(&mut f_comp, Duration::from_secs(3)).await;

    assert!(link.calls().is_empty());
    assert_eq!(f_comp.sequencer().phase(), OffboardPhase::AwaitingLink);
    assert!(f_comp.sequencer().tick_count() >= 60);
}

#[tokio::test(start_paused = true)]
async fn test_slow_bridge_gets_one_setpoint_at_a_time_in_order() {
    let cfg = OffboardConfig::default();
    let cache = Arc::new(TelemetryCache::new());
    let initial = VehicleState { connected: true, armed: false, mode: String::from("MANUAL") };
    cache.on_vehicle_state(initial.clone()).await;
    // each publication takes longer than six ticks
    let link = Arc::new(
        MockLink::new(Arc::clone(&cache), initial, true).with_publish_delay(Duration::from_millis(320)),
    );
    let mut f_comp = FlightComputer::new(&cfg, Arc::clone(&cache), Arc::clone(&link) as Arc<dyn FlightControllerLink>);

    run_for(&mut f_comp, Duration::from_secs(30)).await;

    assert_eq!(f_comp.sequencer().phase(), OffboardPhase::AttitudeHold);
    assert_eq!(link.max_publishing.load(Ordering::SeqCst), 1);

    let setpoints: Vec<LinkCall> = link
        .calls()
        .into_iter()
        .filter(|c| matches!(c, LinkCall::Position(_) | LinkCall::Attitude(_)))
        .collect();
    assert!(setpoints.len() <= 30_000 / 320 + 1);
    let first_attitude = setpoints
        .iter()
        .position(|c| matches!(c, LinkCall::Attitude(_)))
        .expect("attitude setpoints must reach the bridge");
    assert!(setpoints[..first_attitude].iter().all(|c| matches!(c, LinkCall::Position(_))));
    assert!(setpoints[first_attitude..].iter().all(|c| matches!(c, LinkCall::Attitude(_))));
}

/// Serves every accepted connection as a server-sent event stream carrying `events`.
/// With `hang_up` the connection is closed after the last event, otherwise it stays open.
async fn serve_events(events: &'static [&'static str], hang_up: bool) -> (String, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&chunk[..n]),
                    }
                }
                let mut response = String::from(
                    "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncache-control: no-cache\r\n\r\n",
                );
                for event in events {
                    response.push_str(&format!("data: {event}\n\n"));
                }
                if socket.write_all(response.as_bytes()).await.is_err() {
                    return;
                }
                socket.flush().await.ok();
                if !hang_up {
                    sleep(Duration::from_secs(60)).await;
                }
            });
        }
    });
    (url, accepted)
}

async fn wait_for_mode(cache: &TelemetryCache, mode: &str) {
    timeout(Duration::from_secs(5), async {
        while cache.snapshot().await.state.mode != mode {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("state event must reach the cache");
}

const HOLD_EVENT: &str = r#"{"connected": true, "armed": false, "mode": "HOLD"}"#;

#[tokio::test]
async fn test_supervisor_skips_malformed_events_and_stops_on_cancel() {
    let (url, accepted) = serve_events(&["not json", r#"{"connected": 1}"#, HOLD_EVENT], false).await;
    let cache = Arc::new(TelemetryCache::new());
    let cancel = CancellationToken::new();
    let supervisor = Supervisor::new(Arc::clone(&cache), Arc::new(HTTPClient::new(&url).unwrap()), cancel.clone());
    let monitor = tokio::spawn(async move { supervisor.run_state_monitor().await });

    wait_for_mode(&cache, "HOLD").await;
    cancel.cancel();
    let reconnects = timeout(Duration::from_secs(1), monitor)
        .await
        .expect("monitor must stop once cancelled")
        .unwrap();

    assert_eq!(reconnects, 0);
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    let snap = cache.snapshot().await;
    assert!(snap.state.connected);
    assert!(snap.orientation_age.is_none());
}

#[tokio::test]
async fn test_supervisor_reopens_closed_stream() {
    let (url, accepted) = serve_events(&[HOLD_EVENT], true).await;
    let cache = Arc::new(TelemetryCache::new());
    let cancel = CancellationToken::new();
    let supervisor = Supervisor::new(Arc::clone(&cache), Arc::new(HTTPClient::new(&url).unwrap()), cancel.clone());
    let monitor = tokio::spawn(async move { supervisor.run_state_monitor().await });

    wait_for_mode(&cache, "HOLD").await;
    timeout(Duration::from_secs(5), async {
        while accepted.load(Ordering::SeqCst) < 2 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("closed stream must be reopened");

    cancel.cancel();
    let reconnects = timeout(Duration::from_secs(2), monitor)
        .await
        .expect("monitor must stop once cancelled")
        .unwrap();
    assert!(reconnects >= 1);
}

#[tokio::test(start_paused = true)]
async fn test_supervisor_keeps_retrying_unusable_bridge() {
    let cache = Arc::new(TelemetryCache::new());
    let cancel = CancellationToken::new();
    let client = Arc::new(HTTPClient::new("not a bridge url").unwrap());
    let supervisor = Supervisor::new(Arc::clone(&cache), client, cancel.clone());
    let monitor = tokio::spawn(async move { supervisor.run_imu_monitor().await });

    sleep(Duration::from_millis(10_500)).await;
    assert!(!monitor.is_finished());
    cancel.cancel();
    let reconnects = timeout(Duration::from_millis(10), monitor)
        .await
        .expect("monitor must stop once cancelled")
        .unwrap();

    assert_eq!(reconnects, 10);
    assert_eq!(cache.snapshot().await, TelemetryCache::new().snapshot().await);
}
