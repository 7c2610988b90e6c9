use std::fmt::{Display, Formatter};

/// A rotation quaternion in scalar-first `(w, x, y, z)` order.
///
/// Samples received from the flight controller are expected to be of unit length,
/// but are never renormalized here.
#[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq, Clone, Copy)]
pub struct Quaternion {
    /// Scalar part.
    pub w: f64,
    /// Vector part along the body x-axis.
    pub x: f64,
    /// Vector part along the body y-axis.
    pub y: f64,
    /// Vector part along the body z-axis.
    pub z: f64,
}

impl Quaternion {
    /// The identity rotation.
    pub const IDENTITY: Quaternion = Quaternion::new(1.0, 0.0, 0.0, 0.0);

    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self { Self { w, x, y, z } }

    /// Euclidean length of the quaternion.
    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn to_euler(&self) -> EulerAngles { quaternion_to_euler(*self) }
}

impl Default for Quaternion {
    fn default() -> Self { Self::IDENTITY }
}

impl Display for Quaternion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[w {:.4}, x {:.4}, y {:.4}, z {:.4}]", self.w, self.x, self.y, self.z)
    }
}

/// Roll, pitch and yaw in radians, aerospace convention
/// (yaw about z, then pitch about y, then roll about x).
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl EulerAngles {
    pub const fn new(roll: f64, pitch: f64, yaw: f64) -> Self { Self { roll, pitch, yaw } }

    /// Creates a set of angles from values given in degrees.
    pub fn from_degrees(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self::new(roll.to_radians(), pitch.to_radians(), yaw.to_radians())
    }

    /// Returns `(roll, pitch, yaw)` converted to degrees.
    pub fn to_degrees(&self) -> (f64, f64, f64) {
        (self.roll.to_degrees(), self.pitch.to_degrees(), self.yaw.to_degrees())
    }

    pub fn to_quaternion(&self) -> Quaternion { euler_to_quaternion(*self) }
}

impl Display for EulerAngles {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (r, p, y) = self.to_degrees();
        write!(f, "roll {r:.2}°, pitch {p:.2}°, yaw {y:.2}°")
    }
}

/// Converts a unit quaternion into roll, pitch and yaw.
///
/// The arcsine argument for pitch is clamped to `[-1, 1]`, so a quaternion that drifted
/// slightly off unit length near gimbal lock yields `±π/2` instead of `NaN`.
///
/// # Arguments
/// * `q` – The orientation as reported by the flight controller.
///
/// # Returns
/// The corresponding `EulerAngles`, pitch in `[-π/2, π/2]`, roll and yaw in `[-π, π]`.
pub fn quaternion_to_euler(q: Quaternion) -> EulerAngles {
    let Quaternion { w, x, y, z } = q;
    let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
    let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
    let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));
    EulerAngles { roll, pitch, yaw }
}

/// Composes the quaternion equivalent to the given Euler angles from their half angles.
///
/// The result is of unit length up to floating point error; it is not renormalized.
pub fn euler_to_quaternion(angles: EulerAngles) -> Quaternion {
    let (sr, cr) = (angles.roll * 0.5).sin_cos();
    let (sp, cp) = (angles.pitch * 0.5).sin_cos();
    let (sy, cy) = (angles.yaw * 0.5).sin_cos();

    Quaternion {
        w: cr * cp * cy + sr * sp * sy,
        x: sr * cp * cy - cr * sp * sy,
        y: cr * sp * cy + sr * cp * sy,
        z: cr * cp * sy - sr * sp * cy,
    }
}
