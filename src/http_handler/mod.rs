pub mod common;
pub mod bridge_link;
pub mod http_client;
pub mod http_request;
pub mod http_response;
pub mod telemetry_stream;
