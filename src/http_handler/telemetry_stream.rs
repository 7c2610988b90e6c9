use super::{
    common::StreamError,
    http_client::HTTPClient,
    http_request::request_common::HTTPRequestType,
};
use crate::event;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// A server-sent event stream of one bridge topic, decoding every event into
/// the response type of the request that opened it.
pub(crate) struct TelemetryStream<R: HTTPRequestType> {
    source: EventSource,
    endpoint: String,
    _request: PhantomData<fn() -> R>,
}

impl<R> TelemetryStream<R>
where
    R: HTTPRequestType,
    R::Response: DeserializeOwned,
{
    /// Opens the stream. The connection itself is only established on the first call to
    /// [`TelemetryStream::next_message`].
    pub(crate) fn open(request: &R, client: &HTTPClient) -> Result<Self, StreamError> {
        let builder = client
            .stream_client()
            .request(request.request_method().into(), request.compose_url(client))
            .headers(request.header_params());
        let source =
            EventSource::new(builder).map_err(|e| StreamError::Transport(format!("{e:?}")))?;
        Ok(Self { source, endpoint: request.endpoint().to_string(), _request: PhantomData })
    }

    /// Waits for the next event carrying data and decodes it.
    ///
    /// # Returns
    /// * `Ok(message)` for a well-formed event.
    /// * `Err(StreamError::Decode)` for a malformed event; the stream stays usable.
    /// * Any other `Err` if the stream failed or ended and has to be reopened.
    pub(crate) async fn next_message(&mut self) -> Result<R::Response, StreamError> {
        loop {
            match self.source.next().await {
                Some(Ok(Event::Open)) => event!("Telemetry stream {} opened", self.endpoint),
                Some(Ok(Event::Message(msg))) => return parse_event(&msg.data),
                Some(Err(err)) => return Err(err.into()),
                None => return Err(StreamError::Ended),
            }
        }
    }

    pub(crate) fn endpoint(&self) -> &str { &self.endpoint }

    pub(crate) fn close(&mut self) { self.source.close(); }
}

/// Decodes the JSON payload of a single event.
pub(crate) fn parse_event<T: DeserializeOwned>(data: &str) -> Result<T, StreamError> {
    Ok(serde_json::from_str(data)?)
}
