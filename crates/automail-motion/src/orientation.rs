use automail_sensors::SensorSample;
use glam::{DQuat, DVec3};
use tracing::debug;

/// Below this squared norm a quaternion is treated as the zero sample and
/// its inverse as identity.
const NORM_EPSILON: f64 = 1e-12;

/// Below this sine magnitude the axis-angle conversion falls back to the raw
/// vector part instead of dividing by a vanishing sinus.
const SIN_EPSILON: f64 = 1e-9;

/// Euler decomposition of an orientation, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

/// Convert a quaternion to pitch/roll/yaw in degrees.
///
/// Operates on the raw components as the device supplies them. The pitch
/// term is clamped into the asin domain so quaternions sitting numerically
/// past the gimbal-lock boundary saturate at ±90° instead of producing NaN.
pub fn quat_to_euler(q: DQuat) -> EulerAngles {
    let (w, x, y, z) = (q.w, q.x, q.y, q.z);

    // roll (x-axis rotation)
    let sinr_cosp = 2.0 * (w * x + y * z);
    let cosr_cosp = 1.0 - 2.0 * (x * x + y * y);
    let roll = sinr_cosp.atan2(cosr_cosp);

    // pitch (y-axis rotation)
    let sinp = 2.0 * (w * y - z * x);
    let pitch = sinp.clamp(-1.0, 1.0).asin();

    // yaw (z-axis rotation)
    let siny_cosp = 2.0 * (w * z + x * y);
    let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);
    let yaw = siny_cosp.atan2(cosy_cosp);

    EulerAngles {
        pitch: pitch.to_degrees(),
        roll: roll.to_degrees(),
        yaw: yaw.to_degrees(),
    }
}

/// Axis-angle form of a quaternion, used for orientations sourced from the
/// binary fixed-point frames.
///
/// Returns the rotation axis and the angle in radians. When the sinus of the
/// angle is too small to divide by, the un-normalized vector part is
/// returned as-is; the rotation is negligible there anyway.
pub fn axis_angle(q: DQuat) -> (DVec3, f64) {
    let v = DVec3::new(q.x, q.y, q.z);
    let angle = v.length().atan2(q.w);
    let s = angle.sin();
    let axis = if s.abs() < SIN_EPSILON { v } else { v / s };
    (axis, angle)
}

/// Tracks the live orientation and the "resting pose" reference.
///
/// The corrected orientation is `current ⊗ offset⁻¹`: composing away the
/// reference so that the resting pose reads as identity. Until
/// [`OrientationModel::recenter`] is called there is no reference and the
/// raw orientation passes through.
#[derive(Debug, Clone)]
pub struct OrientationModel {
    current: SensorSample,
    offset: Option<SensorSample>,
}

impl OrientationModel {
    pub fn new(initial: SensorSample) -> Self {
        Self {
            current: initial,
            offset: None,
        }
    }

    /// Replace the live sample. Samples are immutable values; this swaps,
    /// never mutates in place.
    pub fn update(&mut self, sample: SensorSample) {
        self.current = sample;
    }

    pub fn current(&self) -> &SensorSample {
        &self.current
    }

    /// Define the resting pose from `sample`, or from the live sample when
    /// none is given. Idempotent: recentering twice on the same live sample
    /// leaves the same offset in place.
    pub fn recenter(&mut self, sample: Option<&SensorSample>) {
        let reference = *sample.unwrap_or(&self.current);
        debug!(offset = %reference, "Resting pose set");
        self.offset = Some(reference);
    }

    /// Current orientation with the resting-pose reference composed away.
    pub fn corrected(&self) -> DQuat {
        match &self.offset {
            Some(offset) => self.current.gyro * inverse(offset.gyro),
            None => self.current.gyro,
        }
    }

    /// Euler angles of the corrected orientation, in degrees.
    pub fn euler(&self) -> EulerAngles {
        quat_to_euler(self.corrected())
    }

    /// Axis-angle of the corrected orientation.
    pub fn axis_angle(&self) -> (DVec3, f64) {
        axis_angle(self.corrected())
    }
}

/// True quaternion inverse: conjugate over squared norm. Works for the
/// un-normalized quaternions raw device data produces; a (near-)zero
/// quaternion inverts to identity rather than dividing by zero.
fn inverse(q: DQuat) -> DQuat {
    let n = q.length_squared();
    if n < NORM_EPSILON {
        return DQuat::IDENTITY;
    }
    DQuat::from_xyzw(-q.x / n, -q.y / n, -q.z / n, q.w / n)
}
