use super::imu::ImuMessage;
use super::request_common::{HTTPRequestMethod, HTTPRequestType};
use super::vehicle_state::StateMessage;

/// Event stream request for the /mavros/state topic.
#[derive(Debug)]
pub(crate) struct StateStreamRequest {}

impl HTTPRequestType for StateStreamRequest {
    /// Type of a single event of the stream.
    type Response = StateMessage;
    fn endpoint(&self) -> &'static str { "/mavros/state/stream" }
    fn request_method(&self) -> HTTPRequestMethod { HTTPRequestMethod::Get }
}

/// Event stream request for the /mavros/imu/data topic.
#[derive(Debug)]
pub(crate) struct ImuStreamRequest {}

impl HTTPRequestType for ImuStreamRequest {
    /// Type of a single event of the stream.
    type Response = ImuMessage;
    fn endpoint(&self) -> &'static str { "/mavros/imu/data/stream" }
    fn request_method(&self) -> HTTPRequestMethod { HTTPRequestMethod::Get }
}
