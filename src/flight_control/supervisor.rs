use super::telemetry_cache::{TelemetryCache, TelemetryUpdate};
use crate::http_handler::{
    common::StreamError,
    http_client::HTTPClient,
    http_request::{
        request_common::HTTPRequestType,
        telemetry_stream_get::{ImuStreamRequest, StateStreamRequest},
    },
    telemetry_stream::TelemetryStream,
};
use crate::{error, event, info, warn};
use serde::de::DeserializeOwned;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

/// Keeps the [`TelemetryCache`] fed from the inbound telemetry streams of the bridge.
///
/// Each stream runs in its own task and only ever replaces its own part of the cache.
/// Failed streams are reopened after [`Supervisor::RECONNECT_DELAY`]; a lost link is not
/// reported to the sequencer in any other way.
pub struct Supervisor {
    cache: Arc<TelemetryCache>,
    client: Arc<HTTPClient>,
    cancel: CancellationToken,
}

impl Supervisor {
    /// Delay before a failed telemetry stream is reopened.
    const RECONNECT_DELAY: Duration = Duration::from_secs(1);

    pub(crate) fn new(
        cache: Arc<TelemetryCache>,
        client: Arc<HTTPClient>,
        cancel: CancellationToken,
    ) -> Supervisor {
        Self { cache, client, cancel }
    }

    /// Consumes the vehicle state stream until cancelled. Returns the number of reopens.
    pub async fn run_state_monitor(&self) -> u32 { self.run_stream(StateStreamRequest {}).await }

    /// Consumes the IMU orientation stream until cancelled. Returns the number of reopens.
    pub async fn run_imu_monitor(&self) -> u32 { self.run_stream(ImuStreamRequest {}).await }

    async fn run_stream<R>(&self, request: R) -> u32
    where
        R: HTTPRequestType,
        R::Response: DeserializeOwned + Into<TelemetryUpdate> + Debug,
    {
        let mut reconnects = 0;
        'reopen: loop {
            match TelemetryStream::open(&request, &self.client) {
                Ok(mut stream) => {
                    info!("Subscribed to {}", stream.endpoint());
                    loop {
                        let msg = tokio::select! {
                            () = self.cancel.cancelled() => {
                                stream.close();
                                break 'reopen;
                            }
                            msg = stream.next_message() => msg,
                        };
                        match msg {
                            Ok(msg) => {
                                event!("{}: {msg:?}", stream.endpoint());
                                self.cache.apply(msg.into()).await;
                            }
                            Err(StreamError::Decode(err)) => {
                                event!("Dropping malformed event on {}: {err}", stream.endpoint());
                            }
                            Err(err) => {
                                warn!(
                                    "Telemetry stream {} failed: {err:?}. Reopening in {} s.",
                                    stream.endpoint(),
                                    Self::RECONNECT_DELAY.as_secs()
                                );
                                stream.close();
                                break;
                            }
                        }
                    }
                }
                Err(err) => {
                    error!("Could not open telemetry stream {}: {err:?}", request.endpoint());
                }
            }
            if self.pause().await {
                break;
            }
            reconnects += 1;
        }
        info!("Stopped monitoring {} after {reconnects} reconnects.", request.endpoint());
        reconnects
    }

    /// Sleeps for the reconnect delay. Returns `true` if cancelled meanwhile.
    async fn pause(&self) -> bool {
        tokio::select! {
            () = self.cancel.cancelled() => true,
            () = tokio::time::sleep(Self::RECONNECT_DELAY) => false,
        }
    }
}
