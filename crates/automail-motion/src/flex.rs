/// Maps raw flex-sensor counts to a bend angle in degrees.
///
/// The sensor reads high when the joint is straight and low when fully bent;
/// the mapping is a plain linear remap between the two calibration points.
/// Sensor-sourced angles are deliberately left unclamped so miscalibration
/// shows up in the data instead of silently saturating.
#[derive(Debug, Clone, Copy)]
pub struct FlexCalibration {
    /// Raw reading with the joint straight (0°).
    pub straight_raw: f64,
    /// Raw reading with the joint fully bent (90°).
    pub bent_raw: f64,
}

impl Default for FlexCalibration {
    fn default() -> Self {
        // Calibration points measured on the prototype's voltage divider.
        Self {
            straight_raw: 64000.0,
            bent_raw: 29000.0,
        }
    }
}

impl FlexCalibration {
    /// Bend angle in degrees for a raw sensor count.
    pub fn angle(&self, raw: f64) -> f64 {
        let span = self.bent_raw - self.straight_raw;
        (raw - self.straight_raw) / span * 90.0
    }
}

/// Clamp a manually-driven flex angle to the joint's [0°, 90°] range.
/// Applies to manual input only; sensor readings pass through unclamped.
pub fn clamp_manual(angle: f64) -> f64 {
    angle.clamp(0.0, 90.0)
}
