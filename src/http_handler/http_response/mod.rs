pub(crate) mod arming;
pub(crate) mod imu;
pub(crate) mod response_common;
pub(crate) mod set_mode;
pub(crate) mod setpoint_ack;
pub(crate) mod vehicle_state;
