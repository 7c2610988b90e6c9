use super::rotation::{EulerAngles, Quaternion};
use std::time::Duration;
use tokio::{sync::RwLock, time::Instant};

/// Link, arming and mode status as last reported by the flight controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VehicleState {
    /// Whether the bridge currently has a link to the flight controller.
    pub connected: bool,
    /// Whether the vehicle is armed.
    pub armed: bool,
    /// The flight controller mode string, e.g. `"OFFBOARD"`.
    pub mode: String,
}

/// The most recent orientation estimate received on the IMU channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    pub orientation: Quaternion,
}

/// An update received on one of the inbound telemetry channels.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryUpdate {
    State(VehicleState),
    Orientation(OrientationSample),
}

impl From<VehicleState> for TelemetryUpdate {
    fn from(value: VehicleState) -> Self { TelemetryUpdate::State(value) }
}

impl From<OrientationSample> for TelemetryUpdate {
    fn from(value: OrientationSample) -> Self { TelemetryUpdate::Orientation(value) }
}

/// A consistent copy of everything the cache holds, taken once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    pub state: VehicleState,
    pub orientation: Quaternion,
    /// Derived from `orientation` when the sample was stored.
    pub euler: EulerAngles,
    /// Time since the last vehicle state update, `None` if none was received yet.
    pub state_age: Option<Duration>,
    /// Time since the last orientation update, `None` if none was received yet.
    pub orientation_age: Option<Duration>,
}

impl TelemetrySnapshot {
    /// Names of the records that are missing or older than `max_age`.
    pub fn stale_records(&self, max_age: Duration) -> Vec<&'static str> {
        let mut stale = Vec::new();
        if self.state_age.is_none_or(|age| age > max_age) {
            stale.push("vehicle state");
        }
        if self.orientation_age.is_none_or(|age| age > max_age) {
            stale.push("orientation");
        }
        stale
    }
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            state: VehicleState::default(),
            orientation: Quaternion::IDENTITY,
            euler: EulerAngles::default(),
            state_age: None,
            orientation_age: None,
        }
    }
}

#[derive(Debug, Default)]
struct TelemetryRecord {
    state: VehicleState,
    state_received: Option<Instant>,
    orientation: Quaternion,
    euler: EulerAngles,
    orientation_received: Option<Instant>,
}

/// Holds the latest vehicle state and orientation.
///
/// Each update replaces its part of the record under the write lock, and
/// [`TelemetryCache::snapshot`] copies the whole record under a single read lock,
/// so a tick never observes a half-written update. No history is kept.
#[derive(Debug, Default)]
pub struct TelemetryCache {
    record: RwLock<TelemetryRecord>,
}

impl TelemetryCache {
    pub fn new() -> Self { Self::default() }

    /// Replaces the cached vehicle state.
    pub async fn on_vehicle_state(&self, update: VehicleState) {
        let mut record = self.record.write().await;
        record.state = update;
        record.state_received = Some(Instant::now());
    }

    /// Replaces the cached orientation and recomputes the Euler angles from it.
    pub async fn on_orientation(&self, update: OrientationSample) {
        let euler = update.orientation.to_euler();
        let mut record = self.record.write().await;
        record.orientation = update.orientation;
        record.euler = euler;
        record.orientation_received = Some(Instant::now());
    }

    /// Routes an update to the matching `on_*` handler.
    pub async fn apply(&self, update: TelemetryUpdate) {
        match update {
            TelemetryUpdate::State(state) => self.on_vehicle_state(state).await,
            TelemetryUpdate::Orientation(sample) => self.on_orientation(sample).await,
        }
    }

    /// Copies out the current record.
    pub async fn snapshot(&self) -> TelemetrySnapshot {
        let record = self.record.read().await;
        TelemetrySnapshot {
            state: record.state.clone(),
            orientation: record.orientation,
            euler: record.euler,
            state_age: record.state_received.map(|t| t.elapsed()),
            orientation_age: record.orientation_received.map(|t| t.elapsed()),
        }
    }
}
