use super::set_mode::SetModeResponse;
use super::request_common::{HTTPRequestMethod, HTTPRequestType, JSONBodyHTTPRequestType};

/// Request type for the /mavros/set_mode service.
#[derive(serde::Serialize, Debug)]
pub(crate) struct SetModeRequest {
    /// Flight controller specific mode name, e.g. `"OFFBOARD"`.
    pub(crate) custom_mode: String,
}

impl JSONBodyHTTPRequestType for SetModeRequest {
    type Body = SetModeRequest;
    fn body(&self) -> &Self::Body { self }
}

impl HTTPRequestType for SetModeRequest {
    type Response = SetModeResponse;
    fn endpoint(&self) -> &'static str { "/mavros/set_mode" }
    fn request_method(&self) -> HTTPRequestMethod { HTTPRequestMethod::Post }
}
