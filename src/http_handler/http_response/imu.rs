use crate::flight_control::{
    rotation::Quaternion,
    telemetry_cache::{OrientationSample, TelemetryUpdate},
};
use crate::http_handler::http_response::response_common::SerdeJSONBodyHTTPResponseType;

/// One event of the /mavros/imu/data/stream topic. Only the orientation is used.
#[derive(serde::Deserialize, Debug, Clone, Copy, PartialEq)]
pub(crate) struct ImuMessage {
    orientation: Quaternion,
}

impl From<ImuMessage> for OrientationSample {
    fn from(value: ImuMessage) -> Self { OrientationSample { orientation: value.orientation } }
}

impl From<ImuMessage> for TelemetryUpdate {
    fn from(value: ImuMessage) -> Self { TelemetryUpdate::Orientation(value.into()) }
}

impl SerdeJSONBodyHTTPResponseType for ImuMessage {}
