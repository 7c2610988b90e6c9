use crate::http_handler::http_response::response_common::SerdeJSONBodyHTTPResponseType;

/// Response type for the /mavros/cmd/arming service.
#[derive(serde::Deserialize, Debug, PartialEq, Eq)]
pub(crate) struct ArmingResponse {
    /// Whether the flight controller accepted the command.
    success: bool,
    /// Raw `MAV_RESULT` of the command acknowledgement, if the bridge forwards it.
    #[serde(default)]
    result: Option<u8>,
}

impl ArmingResponse {
    pub(crate) fn success(&self) -> bool { self.success }
    pub(crate) fn result(&self) -> Option<u8> { self.result }
}

impl SerdeJSONBodyHTTPResponseType for ArmingResponse {}
