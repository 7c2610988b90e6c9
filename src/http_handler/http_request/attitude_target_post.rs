use super::request_common::{HTTPRequestMethod, HTTPRequestType, JSONBodyHTTPRequestType};
use super::setpoint_ack::SetpointAck;
use crate::flight_control::{rotation::Quaternion, setpoint::AttitudeSetpoint};

/// Request type for the /mavros/setpoint_raw/attitude topic.
#[derive(serde::Serialize, Debug)]
pub(crate) struct AttitudeTargetRequest {
    pub(crate) orientation: Quaternion,
    pub(crate) thrust: f64,
    /// Raw bits of the `AttitudeTypeMask`.
    pub(crate) type_mask: u8,
}

impl From<AttitudeSetpoint> for AttitudeTargetRequest {
    fn from(value: AttitudeSetpoint) -> Self {
        Self {
            orientation: value.orientation,
            thrust: value.thrust,
            type_mask: value.type_mask.bits(),
        }
    }
}

impl JSONBodyHTTPRequestType for AttitudeTargetRequest {
    type Body = AttitudeTargetRequest;
    fn body(&self) -> &Self::Body { self }
}

impl HTTPRequestType for AttitudeTargetRequest {
    type Response = SetpointAck;
    fn endpoint(&self) -> &'static str { "/mavros/setpoint_raw/attitude" }
    fn request_method(&self) -> HTTPRequestMethod { HTTPRequestMethod::Post }
}
