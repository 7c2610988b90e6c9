use crate::flight_control::{rotation::EulerAngles, setpoint::Position};
use std::{env, time::Duration};
use strum_macros::Display;

/// Errors found while reading the startup configuration.
#[derive(Debug, Display, PartialEq)]
pub enum ConfigError {
    /// A variable could not be parsed as a number.
    InvalidNumber { var: &'static str, value: String },
    /// A list variable did not contain the expected number of components.
    WrongComponentCount { var: &'static str, expected: usize, found: usize },
    /// The flight controller falls back to a failsafe mode below 2 Hz.
    TickRateTooLow(f64),
    /// The tick period would round down to nothing.
    TickRateTooHigh(f64),
    /// A duration too long to be represented.
    DurationOutOfRange(&'static str),
    ThrustOutOfRange(f64),
    /// A count or duration that must be strictly positive was not.
    NotPositive(&'static str),
    EmptyMode,
}

impl std::error::Error for ConfigError {}

/// Startup configuration of the offboard node. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct OffboardConfig {
    /// Base URL of the MAVROS HTTP bridge.
    pub bridge_url: String,
    pub target_position: Position,
    /// Target `(roll, pitch, yaw)` in degrees.
    pub target_attitude_deg: (f64, f64, f64),
    pub target_thrust: f64,
    pub target_mode: String,
    /// Warm-up ticks spent on the position setpoint after arming.
    pub warmup_ticks: u32,
    /// Minimum time between two requests of the same kind.
    pub request_cooldown: Duration,
    pub tick_rate_hz: f64,
    /// Period of the attitude diagnostic, in ticks.
    pub diag_period_ticks: u32,
}

impl Default for OffboardConfig {
    fn default() -> Self {
        Self {
            bridge_url: String::from("http://localhost:8080"),
            target_position: Position::new(1.0, 2.0, 5.0),
            target_attitude_deg: (0.0, 0.0, 0.0),
            target_thrust: 0.705_912_2,
            target_mode: String::from("OFFBOARD"),
            warmup_ticks: 400,
            request_cooldown: Duration::from_secs(5),
            tick_rate_hz: 20.0,
            diag_period_ticks: 20,
        }
    }
}

impl OffboardConfig {
    /// Setpoints must be published faster than this.
    pub const MIN_TICK_RATE_HZ: f64 = 2.0;
    pub const MAX_TICK_RATE_HZ: f64 = 1000.0;

    const BRIDGE_URL: &'static str = "OFFB_BRIDGE_URL";
    const TARGET_POSITION: &'static str = "OFFB_TARGET_POSITION";
    const TARGET_ATTITUDE: &'static str = "OFFB_TARGET_ATTITUDE";
    const TARGET_THRUST: &'static str = "OFFB_TARGET_THRUST";
    const TARGET_MODE: &'static str = "OFFB_TARGET_MODE";
    const WARMUP_TICKS: &'static str = "OFFB_WARMUP_TICKS";
    const REQUEST_COOLDOWN: &'static str = "OFFB_REQUEST_COOLDOWN_S";
    const TICK_RATE: &'static str = "OFFB_TICK_RATE_HZ";
    const DIAG_PERIOD: &'static str = "OFFB_DIAG_PERIOD_TICKS";

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> { Self::from_lookup(|var| env::var(var).ok()) }

    /// Builds and validates a configuration, taking every unset variable from
    /// [`OffboardConfig::default`].
    ///
    /// # Arguments
    /// * `lookup` – Returns the value of a variable, `None` if unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where F: Fn(&str) -> Option<String> {
        let mut cfg = Self::default();
        if let Some(url) = lookup(Self::BRIDGE_URL) {
            cfg.bridge_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup(Self::TARGET_POSITION) {
            let [x, y, z] = parse_triple(Self::TARGET_POSITION, &raw)?;
            cfg.target_position = Position::new(x, y, z);
        }
        if let Some(raw) = lookup(Self::TARGET_ATTITUDE) {
            let [r, p, y] = parse_triple(Self::TARGET_ATTITUDE, &raw)?;
            cfg.target_attitude_deg = (r, p, y);
        }
        if let Some(raw) = lookup(Self::TARGET_THRUST) {
            cfg.target_thrust = parse_num(Self::TARGET_THRUST, &raw)?;
        }
        if let Some(mode) = lookup(Self::TARGET_MODE) {
            cfg.target_mode = mode.trim().to_string();
        }
        if let Some(raw) = lookup(Self::WARMUP_TICKS) {
            cfg.warmup_ticks = parse_num(Self::WARMUP_TICKS, &raw)?;
        }
        if let Some(raw) = lookup(Self::REQUEST_COOLDOWN) {
            let secs: f64 = parse_num(Self::REQUEST_COOLDOWN, &raw)?;
            if !(secs.is_finite() && secs > 0.0) {
                return Err(ConfigError::NotPositive(Self::REQUEST_COOLDOWN));
            }
            cfg.request_cooldown = Duration::try_from_secs_f64(secs)
                .map_err(|_| ConfigError::DurationOutOfRange(Self::REQUEST_COOLDOWN))?;
        }
        if let Some(raw) = lookup(Self::TICK_RATE) {
            cfg.tick_rate_hz = parse_num(Self::TICK_RATE, &raw)?;
        }
        if let Some(raw) = lookup(Self::DIAG_PERIOD) {
            cfg.diag_period_ticks = parse_num(Self::DIAG_PERIOD, &raw)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_rate_hz.is_finite() && self.tick_rate_hz > Self::MIN_TICK_RATE_HZ) {
            return Err(ConfigError::TickRateTooLow(self.tick_rate_hz));
        }
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            return Err(ConfigError::TickRateTooHigh(self.tick_rate_hz));
        }
        if !(0.0..=1.0).contains(&self.target_thrust) {
            return Err(ConfigError::ThrustOutOfRange(self.target_thrust));
        }
        if self.request_cooldown.is_zero() {
            return Err(ConfigError::NotPositive(Self::REQUEST_COOLDOWN));
        }
        if self.warmup_ticks == 0 {
            return Err(ConfigError::NotPositive(Self::WARMUP_TICKS));
        }
        if self.diag_period_ticks == 0 {
            return Err(ConfigError::NotPositive(Self::DIAG_PERIOD));
        }
        if self.target_mode.is_empty() {
            return Err(ConfigError::EmptyMode);
        }
        Ok(())
    }

    pub fn target_attitude(&self) -> EulerAngles {
        let (r, p, y) = self.target_attitude_deg;
        EulerAngles::from_degrees(r, p, y)
    }

    pub fn tick_period(&self) -> Duration { Duration::from_secs_f64(1.0 / self.tick_rate_hz) }
}

fn parse_num<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { var, value: raw.to_string() })
}

fn parse_triple(var: &'static str, raw: &str) -> Result<[f64; 3], ConfigError> {
    let parts: Vec<&str> = raw.split(',').collect();
    let [a, b, c] = parts.as_slice() else {
        return Err(ConfigError::WrongComponentCount { var, expected: 3, found: parts.len() });
    };
    let triple = [parse_num::<f64>(var, a)?, parse_num(var, b)?, parse_num(var, c)?];
    if triple.iter().any(|v| !v.is_finite()) {
        return Err(ConfigError::InvalidNumber { var, value: raw.to_string() });
    }
    Ok(triple)
}
