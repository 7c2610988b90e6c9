use super::http_response::{arming, imu, set_mode, setpoint_ack, vehicle_state};

pub(crate) mod arming_post;
pub(crate) mod attitude_target_post;
pub(crate) mod position_target_post;
pub(crate) mod request_common;
pub(crate) mod set_mode_post;
pub(crate) mod telemetry_stream_get;
