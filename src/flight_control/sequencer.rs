use super::{
    offboard_phase::OffboardPhase,
    rotation::EulerAngles,
    setpoint::{Position, Setpoint, SetpointComposer},
    telemetry_cache::TelemetrySnapshot,
};
use crate::config::OffboardConfig;
use std::time::Duration;
use strum_macros::Display;
use tokio::time::Instant;

/// The two kinds of requests the sequencer sends to the flight controller.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy, Hash)]
pub enum RequestKind {
    SetMode,
    Arm,
}

/// A request to be dispatched to the flight controller services.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum VehicleRequest {
    /// Switch to the given custom mode.
    SetMode { custom_mode: String },
    /// Arm (`true`) or disarm (`false`) the vehicle.
    Arm { value: bool },
}

impl VehicleRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            VehicleRequest::SetMode { .. } => RequestKind::SetMode,
            VehicleRequest::Arm { .. } => RequestKind::Arm,
        }
    }
}

/// Everything a single call to [`OffboardSequencer::step`] asks the caller to do.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    /// Phase after this tick.
    pub phase: OffboardPhase,
    /// `(from, to)` if the phase changed on this tick.
    pub transition: Option<(OffboardPhase, OffboardPhase)>,
    /// Setpoint to publish, `None` while waiting for the link.
    pub setpoint: Option<Setpoint>,
    /// Request to dispatch, already accounted for in the cool-down bookkeeping.
    pub request: Option<VehicleRequest>,
    /// Current attitude, set once every diagnostic period.
    pub diagnostic: Option<EulerAngles>,
    /// The reported mode, set on the first tick of a mode drift after arming.
    pub mode_drift: Option<String>,
}

/// State machine driving the vehicle from link-up to attitude control.
///
/// `step` is the only transition function. It takes the telemetry observed on a tick and
/// the tick's timestamp and returns the outputs of that tick; the sequencer never performs
/// I/O itself.
#[derive(Debug)]
pub struct OffboardSequencer {
    composer: SetpointComposer,
    target_mode: String,
    target_position: Position,
    target_thrust: f64,
    warmup_ticks: u32,
    request_cooldown: Duration,
    diag_period: u32,

    phase: OffboardPhase,
    step_count: u32,
    tick_count: u64,
    link_seen_at: Option<Instant>,
    last_mode_request: Option<Instant>,
    last_arm_request: Option<Instant>,
    mode_request_in_flight: bool,
    arm_request_in_flight: bool,
    mode_drift_reported: bool,
}

impl OffboardSequencer {
    /// Creates a sequencer in [`OffboardPhase::AwaitingLink`].
    ///
    /// # Arguments
    /// * `config` – Startup configuration; the target attitude is converted to a
    ///   quaternion here and never changes afterwards.
    pub fn new(config: &OffboardConfig) -> Self {
        Self {
            composer: SetpointComposer::new(config.target_attitude()),
            target_mode: config.target_mode.clone(),
            target_position: config.target_position,
            target_thrust: config.target_thrust,
            warmup_ticks: config.warmup_ticks,
            request_cooldown: config.request_cooldown,
            diag_period: config.diag_period_ticks,
            phase: OffboardPhase::AwaitingLink,
            step_count: 0,
            tick_count: 0,
            link_seen_at: None,
            last_mode_request: None,
            last_arm_request: None,
            mode_request_in_flight: false,
            arm_request_in_flight: false,
            mode_drift_reported: false,
        }
    }

    pub fn phase(&self) -> OffboardPhase { self.phase }

    /// Ticks spent in [`OffboardPhase::Warmup`] since the vehicle was armed.
    pub fn step_count(&self) -> u32 { self.step_count }

    pub fn tick_count(&self) -> u64 { self.tick_count }

    pub fn composer(&self) -> &SetpointComposer { &self.composer }

    /// Marks a dispatched request as finished, whatever its outcome.
    ///
    /// The next request of the same kind is still gated by the cool-down.
    pub fn on_request_complete(&mut self, kind: RequestKind) {
        match kind {
            RequestKind::SetMode => self.mode_request_in_flight = false,
            RequestKind::Arm => self.arm_request_in_flight = false,
        }
    }

    /// Advances the sequence by one tick.
    ///
    /// The setpoint published on a tick is chosen by the phase the tick started in, so
    /// the last warm-up tick still publishes the position setpoint and attitude setpoints
    /// start on the following tick. At most one phase transition happens per tick.
    ///
    /// # Arguments
    /// * `telemetry` – Snapshot of the telemetry cache taken for this tick.
    /// * `now` – Timestamp of this tick, used for the request cool-downs.
    pub fn step(&mut self, telemetry: &TelemetrySnapshot, now: Instant) -> TickOutput {
        let start_phase = self.phase;
        let diagnostic = self.diagnostic_due().then_some(telemetry.euler);
        self.tick_count += 1;

        let setpoint = self.setpoint_for(start_phase);
        let state = &telemetry.state;
        let mode_matches = state.mode == self.target_mode;
        let mut request = None;
        let mut mode_drift = None;

        match start_phase {
            OffboardPhase::AwaitingLink => {
                if state.connected {
                    self.link_seen_at = Some(now);
                    self.phase = OffboardPhase::RequestingMode;
                }
            }
            OffboardPhase::RequestingMode | OffboardPhase::RequestingArm if !mode_matches => {
                self.phase = OffboardPhase::RequestingMode;
                if self.mode_request_due(now) {
                    self.last_mode_request = Some(now);
                    self.mode_request_in_flight = true;
                    request = Some(VehicleRequest::SetMode { custom_mode: self.target_mode.clone() });
                }
            }
            OffboardPhase::RequestingMode => self.phase = OffboardPhase::RequestingArm,
            OffboardPhase::RequestingArm => {
                if state.armed {
                    self.step_count = 0;
                    self.phase = OffboardPhase::Warmup;
                } else if self.arm_request_due(now) {
                    self.last_arm_request = Some(now);
                    self.arm_request_in_flight = true;
                    request = Some(VehicleRequest::Arm { value: true });
                }
            }
            OffboardPhase::Warmup | OffboardPhase::AttitudeHold => {
                if start_phase == OffboardPhase::Warmup {
                    self.step_count += 1;
                    if self.step_count >= self.warmup_ticks {
                        self.phase = OffboardPhase::AttitudeHold;
                    }
                }
                if mode_matches {
                    self.mode_drift_reported = false;
                } else if !self.mode_drift_reported {
                    self.mode_drift_reported = true;
                    mode_drift = Some(state.mode.clone());
                }
            }
        }

        let transition = (start_phase != self.phase).then_some((start_phase, self.phase));
        TickOutput { phase: self.phase, transition, setpoint, request, diagnostic, mode_drift }
    }

    fn diagnostic_due(&self) -> bool {
        self.tick_count % u64::from(self.diag_period) == 0
    }

    fn setpoint_for(&self, phase: OffboardPhase) -> Option<Setpoint> {
        if !phase.publishes() {
            return None;
        }
        Some(if phase == OffboardPhase::AttitudeHold {
            Setpoint::Attitude(self.composer.build_attitude_setpoint(self.target_thrust))
        } else {
            Setpoint::Position(self.composer.build_position_setpoint(self.target_position))
        })
    }

    /// The first mode request waits one cool-down after the link came up, so that
    /// position setpoints are already streaming when offboard mode is requested.
    fn mode_request_due(&self, now: Instant) -> bool {
        if self.mode_request_in_flight {
            return false;
        }
        self.last_mode_request
            .or(self.link_seen_at)
            .is_none_or(|last| now.saturating_duration_since(last) >= self.request_cooldown)
    }

    fn arm_request_due(&self, now: Instant) -> bool {
        !self.arm_request_in_flight
            && self
                .last_arm_request
                .is_none_or(|last| now.saturating_duration_since(last) >= self.request_cooldown)
    }
}
