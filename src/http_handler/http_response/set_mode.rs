use crate::http_handler::http_response::response_common::SerdeJSONBodyHTTPResponseType;

/// Response type for the /mavros/set_mode service.
#[derive(serde::Deserialize, Debug, PartialEq, Eq)]
pub(crate) struct SetModeResponse {
    /// Whether the mode change was forwarded to the flight controller.
    mode_sent: bool,
}

impl SetModeResponse {
    pub(crate) fn mode_sent(&self) -> bool { self.mode_sent }
}

impl SerdeJSONBodyHTTPResponseType for SetModeResponse {}
