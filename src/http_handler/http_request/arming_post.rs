use super::arming::ArmingResponse;
use super::request_common::{HTTPRequestMethod, HTTPRequestType, JSONBodyHTTPRequestType};

/// Request type for the /mavros/cmd/arming service.
#[derive(serde::Serialize, Debug)]
pub(crate) struct ArmingRequest {
    /// `true` to arm, `false` to disarm.
    pub(crate) value: bool,
}

impl JSONBodyHTTPRequestType for ArmingRequest {
    type Body = ArmingRequest;
    fn body(&self) -> &Self::Body { self }
}

impl HTTPRequestType for ArmingRequest {
    type Response = ArmingResponse;
    fn endpoint(&self) -> &'static str { "/mavros/cmd/arming" }
    fn request_method(&self) -> HTTPRequestMethod { HTTPRequestMethod::Post }
}
