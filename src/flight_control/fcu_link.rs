use super::setpoint::{AttitudeSetpoint, PositionSetpoint};
use async_trait::async_trait;
use strum_macros::Display;

/// Failure of a single exchange with the flight controller.
#[derive(Debug, Display, PartialEq, Eq, Clone)]
pub enum LinkError {
    /// The transport did not deliver the request or its response.
    Unreachable(String),
    /// The far end answered, but not with what was expected.
    BadResponse(String),
}

impl std::error::Error for LinkError {}

/// Outbound side of the flight controller link: two setpoint topics and two services.
///
/// Implementations must not retry internally; retries are paced by the sequencer's
/// request cool-down.
#[async_trait]
pub trait FlightControllerLink: Send + Sync {
    async fn publish_position(&self, setpoint: PositionSetpoint) -> Result<(), LinkError>;

    async fn publish_attitude(&self, setpoint: AttitudeSetpoint) -> Result<(), LinkError>;

    /// Requests a mode change.
    ///
    /// # Returns
    /// Whether the request was forwarded to the flight controller (`mode_sent`).
    async fn set_mode(&self, custom_mode: &str) -> Result<bool, LinkError>;

    /// Requests arming (`true`) or disarming (`false`).
    ///
    /// # Returns
    /// Whether the flight controller accepted the command.
    async fn arm(&self, value: bool) -> Result<bool, LinkError>;
}
