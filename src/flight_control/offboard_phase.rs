use strum_macros::Display;

/// Phases of the scripted offboard sequence, in the order they are entered.
///
/// `RequestingMode` and `RequestingArm` may alternate if the reported mode drifts while
/// arming; `AttitudeHold` is terminal.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy, Hash)]
pub enum OffboardPhase {
    /// No link to the flight controller yet, nothing is published.
    AwaitingLink,
    /// Waiting for the reported mode to match the target mode.
    RequestingMode,
    /// Mode matches, waiting for the vehicle to report armed.
    RequestingArm,
    /// Armed, holding the position setpoint for the warm-up interval.
    Warmup,
    /// Publishing attitude and thrust setpoints indefinitely.
    AttitudeHold,
}

impl OffboardPhase {
    /// Whether a setpoint is published while in this phase.
    pub fn publishes(self) -> bool { self != OffboardPhase::AwaitingLink }
}
