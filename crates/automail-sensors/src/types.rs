use glam::{DQuat, DVec3, EulerRot};
use std::fmt;
use std::time::Instant;

/// One reading from the sensor board.
///
/// Immutable once constructed: partial wire frames produce a *new* sample via
/// [`RawSample::apply`], carrying forward the fields the frame did not supply.
#[derive(Debug, Clone, Copy)]
pub struct SensorSample {
    /// Orientation quaternion from the IMU's DMP. Not necessarily unit-norm;
    /// normalization happens only where a conversion requires it.
    pub gyro: DQuat,
    /// World-frame acceleration.
    pub accel: DVec3,
    /// Flex sensor bend angle in degrees.
    pub flex: f64,
    /// When this reading was taken off the wire.
    pub captured_at: Instant,
}

impl SensorSample {
    /// The all-zero sample used before any frame has arrived.
    pub fn zero(at: Instant) -> Self {
        Self {
            gyro: DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0),
            accel: DVec3::ZERO,
            flex: 0.0,
            captured_at: at,
        }
    }
}

impl fmt::Display for SensorSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gyro({:4.2},{:4.2},{:4.2},{:4.2}) accel({:8.1},{:8.1},{:8.1}) flex({:8.1})",
            self.gyro.w, self.gyro.x, self.gyro.y, self.gyro.z,
            self.accel.x, self.accel.y, self.accel.z, self.flex,
        )
    }
}

/// A decoded wire frame, tagged with the encoding it came from.
///
/// This is the single canonical decode result; the historical firmware
/// variants all collapse into one of these four shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawSample {
    /// Tagged ASCII `ypr` frame: Euler angles in degrees, optionally with
    /// accelerometer and flex groups.
    YawPitchRoll {
        yaw: f64,
        pitch: f64,
        roll: f64,
        accel: Option<DVec3>,
        flex: Option<f64>,
    },
    /// Tagged ASCII `quat` frame, optionally with accelerometer and flex
    /// groups. The most complete variant; other encodings fold into the same
    /// sample shape.
    Quaternion {
        quat: DQuat,
        accel: Option<DVec3>,
        flex: Option<f64>,
    },
    /// Fixed binary frame carrying only a fixed-point quaternion.
    BinaryQuaternion { quat: DQuat },
    /// 96-byte UDP datagram: accelerometer plus Euler angles in degrees.
    Datagram {
        accel: DVec3,
        yaw: f64,
        pitch: f64,
        roll: f64,
    },
}

impl RawSample {
    /// Fold this frame into a full sample, keeping `prev`'s value for any
    /// field the encoding did not carry.
    pub fn apply(&self, prev: &SensorSample, now: Instant) -> SensorSample {
        match *self {
            RawSample::YawPitchRoll {
                yaw,
                pitch,
                roll,
                accel,
                flex,
            } => SensorSample {
                gyro: quat_from_ypr_degrees(yaw, pitch, roll),
                accel: accel.unwrap_or(prev.accel),
                flex: flex.unwrap_or(prev.flex),
                captured_at: now,
            },
            RawSample::Quaternion { quat, accel, flex } => SensorSample {
                gyro: quat,
                accel: accel.unwrap_or(prev.accel),
                flex: flex.unwrap_or(prev.flex),
                captured_at: now,
            },
            RawSample::BinaryQuaternion { quat } => SensorSample {
                gyro: quat,
                accel: prev.accel,
                flex: prev.flex,
                captured_at: now,
            },
            RawSample::Datagram {
                accel,
                yaw,
                pitch,
                roll,
            } => SensorSample {
                gyro: quat_from_ypr_degrees(yaw, pitch, roll),
                accel,
                flex: prev.flex,
                captured_at: now,
            },
        }
    }
}

/// Orientation quaternion from yaw/pitch/roll in degrees (ZYX Tait-Bryan,
/// the convention the Euler-reporting firmware uses).
fn quat_from_ypr_degrees(yaw: f64, pitch: f64, roll: f64) -> DQuat {
    DQuat::from_euler(
        EulerRot::ZYX,
        yaw.to_radians(),
        pitch.to_radians(),
        roll.to_radians(),
    )
}
