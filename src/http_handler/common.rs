use super::http_request::request_common::RequestError;
use super::http_response::response_common::ResponseError;
use strum_macros::Display;

#[derive(Debug, Display, PartialEq, Eq)]
pub enum HTTPError {
    HTTPRequestError(RequestError),
    HTTPResponseError(ResponseError),
}

impl std::error::Error for HTTPError {}

impl From<RequestError> for HTTPError {
    fn from(value: RequestError) -> Self { HTTPError::HTTPRequestError(value) }
}

impl From<ResponseError> for HTTPError {
    fn from(value: ResponseError) -> Self { HTTPError::HTTPResponseError(value) }
}

/// Errors of a telemetry event stream.
#[derive(Debug, Display)]
pub enum StreamError {
    /// The event source reported a transport or protocol failure.
    Transport(String),
    /// An event payload did not match the expected schema.
    Decode(serde_json::Error),
    /// The bridge closed the stream.
    Ended,
}

impl std::error::Error for StreamError {}

impl From<serde_json::Error> for StreamError {
    fn from(value: serde_json::Error) -> Self { StreamError::Decode(value) }
}

impl From<reqwest_eventsource::Error> for StreamError {
    fn from(value: reqwest_eventsource::Error) -> Self {
        match value {
            reqwest_eventsource::Error::StreamEnded => StreamError::Ended,
            other => StreamError::Transport(other.to_string()),
        }
    }
}
