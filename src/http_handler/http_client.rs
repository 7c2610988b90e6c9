use std::time::Duration;

/// A thin wrapper around `reqwest::Client` bound to the base URL of the MAVROS bridge.
///
/// Two clients are kept: one for topics and services, which carries a total request
/// timeout, and one for the long-lived telemetry event streams, which only bounds the
/// connection setup.
#[derive(Debug)]
pub(crate) struct HTTPClient {
    /// Client for setpoint topics and the mode/arming services.
    client: reqwest::Client,
    /// Client for server-sent event streams.
    stream_client: reqwest::Client,
    /// Base URL for the bridge, prepended to all endpoint paths.
    base_url: String,
}

impl HTTPClient {
    /// Total timeout of a setpoint or service request.
    pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
    /// Connection timeout for telemetry streams.
    const STREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

    /// Constructs a new `HTTPClient`.
    ///
    /// # Arguments
    /// * `base_url` – The root URL of the bridge (e.g., `"http://localhost:8080"`).
    ///
    /// # Returns
    /// The configured client, or the `reqwest::Error` raised while building it.
    pub(crate) fn new(base_url: &str) -> Result<HTTPClient, reqwest::Error> {
        Ok(HTTPClient {
            client: reqwest::Client::builder().timeout(Self::REQUEST_TIMEOUT).build()?,
            stream_client: reqwest::Client::builder()
                .connect_timeout(Self::STREAM_CONNECT_TIMEOUT)
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub(super) fn client(&self) -> &reqwest::Client { &self.client }
    pub(super) fn stream_client(&self) -> &reqwest::Client { &self.stream_client }
    pub(crate) fn url(&self) -> &str { self.base_url.as_str() }
}
