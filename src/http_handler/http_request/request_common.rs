use super::super::{
    common::HTTPError,
    http_client::HTTPClient,
    http_response::response_common::HTTPResponseType,
};
use strum_macros::Display;

/// HTTP methods used by the bridge endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HTTPRequestMethod {
    Get,
    Post,
}

impl From<HTTPRequestMethod> for reqwest::Method {
    fn from(value: HTTPRequestMethod) -> Self {
        match value {
            HTTPRequestMethod::Get => reqwest::Method::GET,
            HTTPRequestMethod::Post => reqwest::Method::POST,
        }
    }
}

/// Common description of a request against the bridge.
pub(crate) trait HTTPRequestType {
    /// Type of the expected response.
    type Response: HTTPResponseType;
    /// Path of the endpoint relative to the base URL.
    fn endpoint(&self) -> &str;
    fn request_method(&self) -> HTTPRequestMethod;
    fn header_params(&self) -> reqwest::header::HeaderMap { reqwest::header::HeaderMap::new() }
    fn compose_url(&self, client: &HTTPClient) -> String {
        format!("{}{}", client.url(), self.endpoint())
    }
}

/// Requests carrying a JSON body.
pub(crate) trait JSONBodyHTTPRequestType: HTTPRequestType {
    /// The type of the json body.
    type Body: serde::Serialize;
    fn body(&self) -> &Self::Body;

    async fn send_request(
        &self,
        client: &HTTPClient,
    ) -> Result<<Self::Response as HTTPResponseType>::ParsedResponseType, HTTPError> {
        let response = client
            .client()
            .request(self.request_method().into(), self.compose_url(client))
            .headers(self.header_params())
            .json(self.body())
            .send()
            .await
            .map_err(RequestError::from)?;
        Ok(Self::Response::read_response(response).await?)
    }
}

/// Failures before a response was received.
#[derive(Debug, Display, PartialEq, Eq)]
pub enum RequestError {
    /// The request exceeded `HTTPClient::REQUEST_TIMEOUT`.
    Timeout,
    /// The bridge could not be reached.
    NoConnection,
    /// The request could not be built or serialized.
    Builder,
    Unknown,
}

impl std::error::Error for RequestError {}

impl From<reqwest::Error> for RequestError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            RequestError::Timeout
        } else if value.is_connect() {
            RequestError::NoConnection
        } else if value.is_builder() || value.is_request() {
            RequestError::Builder
        } else {
            RequestError::Unknown
        }
    }
}
