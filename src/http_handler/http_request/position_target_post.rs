use super::request_common::{HTTPRequestMethod, HTTPRequestType, JSONBodyHTTPRequestType};
use super::setpoint_ack::SetpointAck;
use crate::flight_control::{
    rotation::Quaternion,
    setpoint::{Position, PositionSetpoint},
};

/// Request type for the /mavros/setpoint_position/local topic.
#[derive(serde::Serialize, Debug)]
pub(crate) struct PositionTargetRequest {
    pub(crate) position: Position,
    pub(crate) orientation: Quaternion,
}

impl From<PositionSetpoint> for PositionTargetRequest {
    fn from(value: PositionSetpoint) -> Self {
        Self { position: value.position, orientation: value.orientation }
    }
}

impl JSONBodyHTTPRequestType for PositionTargetRequest {
    type Body = PositionTargetRequest;
    fn body(&self) -> &Self::Body { self }
}

impl HTTPRequestType for PositionTargetRequest {
    type Response = SetpointAck;
    fn endpoint(&self) -> &'static str { "/mavros/setpoint_position/local" }
    fn request_method(&self) -> HTTPRequestMethod { HTTPRequestMethod::Post }
}
