use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where sensor data comes from.
    pub transport: TransportConfig,
    /// Lookback for the motion-delta feature, in seconds.
    pub window_seconds: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            window_seconds: 1.0,
        }
    }
}

impl AppConfig {
    /// Reject settings the loop cannot run with. The lookback must be a
    /// positive finite duration and the serial link needs a real baud rate;
    /// a zero UDP port would bind an ephemeral one the sender cannot know.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.window_seconds.is_finite() || self.window_seconds <= 0.0 {
            return Err("window_seconds must be a positive number");
        }
        if self.transport.baud_rate == 0 {
            return Err("baud_rate must be non-zero");
        }
        if self.transport.udp_port == 0 {
            return Err("udp_port must be non-zero");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Serial link or UDP listener.
    pub mode: TransportMode,
    /// Serial device path. `None` means autodetect (prefer a port that
    /// enumerates as an Arduino, else the last port listed).
    pub serial_device: Option<String>,
    /// Serial baud rate. The board firmware talks at 115200.
    pub baud_rate: u32,
    /// UDP port for datagram mode.
    pub udp_port: u16,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::Serial,
            serial_device: None,
            baud_rate: 115_200,
            udp_port: 5000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Serial,
    Net,
}
