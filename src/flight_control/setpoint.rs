use super::rotation::{EulerAngles, Quaternion};
use std::fmt::{Display, Formatter};

/// A position in the local frame of the flight controller, in metres.
#[derive(serde::Serialize, Debug, PartialEq, Clone, Copy, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self { Self { x, y, z } }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.2}, {:.2}, {:.2}]", self.x, self.y, self.z)
    }
}

/// Selects which fields of an [`AttitudeSetpoint`] the flight controller ignores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttitudeTypeMask(u8);

bitflags::bitflags! {
    impl AttitudeTypeMask: u8 {
        const IgnoreRollRate  = 0b0000_0001;
        const IgnorePitchRate = 0b0000_0010;
        const IgnoreYawRate   = 0b0000_0100;
        const IgnoreThrust    = 0b0100_0000;
        const IgnoreAttitude  = 0b1000_0000;
    }
}

impl AttitudeTypeMask {
    /// Body rates are ignored, orientation and thrust are honored.
    pub const IGNORE_BODY_RATES: Self = Self::IgnoreRollRate
        .union(Self::IgnorePitchRate)
        .union(Self::IgnoreYawRate);
}

/// Position target holding the configured orientation.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct PositionSetpoint {
    pub position: Position,
    pub orientation: Quaternion,
}

/// Attitude and collective thrust target.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct AttitudeSetpoint {
    pub orientation: Quaternion,
    /// Normalized collective thrust in `[0, 1]`.
    pub thrust: f64,
    pub type_mask: AttitudeTypeMask,
}

/// The setpoint published on a single tick.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Setpoint {
    Position(PositionSetpoint),
    Attitude(AttitudeSetpoint),
}

/// Builds setpoints around an orientation target fixed at construction.
///
/// Setpoints are built fresh on every call instead of being kept and mutated.
#[derive(Debug, Clone, Copy)]
pub struct SetpointComposer {
    target_orientation: Quaternion,
}

impl SetpointComposer {
    /// Creates a composer for the given target attitude.
    ///
    /// # Arguments
    /// * `target` – Target roll, pitch and yaw; converted to a quaternion once.
    pub fn new(target: EulerAngles) -> Self {
        Self { target_orientation: target.to_quaternion() }
    }

    pub fn target_orientation(&self) -> Quaternion { self.target_orientation }

    pub fn build_position_setpoint(&self, position: Position) -> PositionSetpoint {
        PositionSetpoint { position, orientation: self.target_orientation }
    }

    /// Builds an attitude setpoint that honors orientation and thrust only.
    /// `thrust` is clamped to `[0, 1]`.
    pub fn build_attitude_setpoint(&self, thrust: f64) -> AttitudeSetpoint {
        AttitudeSetpoint {
            orientation: self.target_orientation,
            thrust: thrust.clamp(0.0, 1.0),
            type_mask: AttitudeTypeMask::IGNORE_BODY_RATES,
        }
    }
}
