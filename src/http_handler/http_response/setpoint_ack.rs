use crate::http_handler::http_response::response_common::{HTTPResponseType, ResponseError};

/// Response of a setpoint topic. The bridge only acknowledges with a status code,
/// any body is ignored.
pub(crate) struct SetpointAck {}

impl HTTPResponseType for SetpointAck {
    type ParsedResponseType = ();

    async fn read_response(
        response: reqwest::Response,
    ) -> Result<Self::ParsedResponseType, ResponseError> {
        Self::unwrap_return_code(response).await?;
        Ok(())
    }
}
