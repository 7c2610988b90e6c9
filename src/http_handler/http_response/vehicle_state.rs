use crate::flight_control::telemetry_cache::{TelemetryUpdate, VehicleState};
use crate::http_handler::http_response::response_common::SerdeJSONBodyHTTPResponseType;

/// One event of the /mavros/state/stream topic. Further fields sent by the bridge
/// (`guided`, `system_status`, ...) are ignored.
#[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct StateMessage {
    connected: bool,
    armed: bool,
    mode: String,
}

impl From<StateMessage> for VehicleState {
    fn from(value: StateMessage) -> Self {
        VehicleState { connected: value.connected, armed: value.armed, mode: value.mode }
    }
}

impl From<StateMessage> for TelemetryUpdate {
    fn from(value: StateMessage) -> Self { TelemetryUpdate::State(value.into()) }
}

impl SerdeJSONBodyHTTPResponseType for StateMessage {}
