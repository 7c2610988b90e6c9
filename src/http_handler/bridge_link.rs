use super::{
    common::HTTPError,
    http_client::HTTPClient,
    http_request::{
        arming_post::ArmingRequest, attitude_target_post::AttitudeTargetRequest,
        position_target_post::PositionTargetRequest, request_common::JSONBodyHTTPRequestType,
        set_mode_post::SetModeRequest,
    },
    http_response::response_common::ResponseError,
};
use crate::flight_control::{
    fcu_link::{FlightControllerLink, LinkError},
    setpoint::{AttitudeSetpoint, PositionSetpoint},
};
use crate::event;
use async_trait::async_trait;

impl From<HTTPError> for LinkError {
    fn from(value: HTTPError) -> Self {
        match value {
            HTTPError::HTTPRequestError(err) => LinkError::Unreachable(err.to_string()),
            HTTPError::HTTPResponseError(ResponseError::BadRequest(body)) => {
                LinkError::BadResponse(format!("rejected by bridge: {body}"))
            }
            HTTPError::HTTPResponseError(err) => LinkError::BadResponse(err.to_string()),
        }
    }
}

#[async_trait]
impl FlightControllerLink for HTTPClient {
    async fn publish_position(&self, setpoint: PositionSetpoint) -> Result<(), LinkError> {
        Ok(PositionTargetRequest::from(setpoint).send_request(self).await?)
    }

    async fn publish_attitude(&self, setpoint: AttitudeSetpoint) -> Result<(), LinkError> {
        Ok(AttitudeTargetRequest::from(setpoint).send_request(self).await?)
    }

    async fn set_mode(&self, custom_mode: &str) -> Result<bool, LinkError> {
        let req = SetModeRequest { custom_mode: custom_mode.to_string() };
        let resp = req.send_request(self).await?;
        Ok(resp.mode_sent())
    }

    async fn arm(&self, value: bool) -> Result<bool, LinkError> {
        let resp = ArmingRequest { value }.send_request(self).await?;
        if let Some(result) = resp.result() {
            event!("Arming command acknowledged with MAV_RESULT {result}");
        }
        Ok(resp.success())
    }
}
