pub(crate) mod fcu_link;
pub(crate) mod flight_computer;
pub(crate) mod offboard_phase;
pub(crate) mod rotation;
pub(crate) mod sequencer;
pub(crate) mod setpoint;
pub(crate) mod supervisor;
pub(crate) mod telemetry_cache;

pub use flight_computer::FlightComputer;
pub use supervisor::Supervisor;
pub use telemetry_cache::TelemetryCache;

#[cfg(test)]
mod tests;
