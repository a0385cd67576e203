use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::io;
use std::net::UdpSocket;
use std::time::Duration;
use thiserror::Error;

/// Serial reads block for at most this long; a timeout is "no sample this
/// tick", not an error.
pub const SERIAL_READ_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no serial ports available")]
    NoPorts,
    #[error("failed to enumerate serial ports")]
    Enumerate(#[source] serialport::Error),
    #[error("failed to open serial port {device}")]
    Open {
        device: String,
        #[source]
        source: serialport::Error,
    },
    #[error("failed to bind UDP socket on port {port}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },
}

/// The byte source a [`crate::Sensors`] reader pulls from.
pub enum Transport {
    /// Serial link to the sensor board: CRLF-framed lines.
    Serial { port: Box<dyn SerialPort> },
    /// UDP socket: one fixed-size datagram per sample.
    Net { socket: UdpSocket },
}

impl Transport {
    /// Open the serial link at `baud_rate` with the fixed 1 s read timeout.
    ///
    /// `device` is resolved against the enumerated ports: an explicit match
    /// wins, otherwise the first port that looks like an Arduino, otherwise
    /// the last port the OS lists.
    pub fn serial(device: Option<&str>, baud_rate: u32) -> Result<Self, TransportError> {
        let device = resolve_serial_device(device)?;
        tracing::info!(%device, baud_rate, "Opening serial port");
        let port = serialport::new(device.as_str(), baud_rate)
            .timeout(SERIAL_READ_TIMEOUT)
            .open()
            .map_err(|source| TransportError::Open { device, source })?;
        Ok(Self::Serial { port })
    }

    /// Bind the UDP receiver on `0.0.0.0:<port>`.
    pub fn net(port: u16) -> Result<Self, TransportError> {
        let socket =
            UdpSocket::bind(("0.0.0.0", port)).map_err(|source| TransportError::Bind {
                port,
                source,
            })?;
        tracing::info!(port, "Listening for sensor datagrams");
        Ok(Self::Net { socket })
    }
}

/// Pick the serial device to open.
fn resolve_serial_device(requested: Option<&str>) -> Result<String, TransportError> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;

    if let Some(requested) = requested {
        if ports.iter().any(|p| p.port_name.contains(requested)) {
            return Ok(requested.to_string());
        }
        tracing::warn!(requested, "Requested serial port not found, autodetecting");
    }

    if let Some(port) = ports.iter().find(|p| is_arduino(p)) {
        return Ok(port.port_name.clone());
    }
    ports
        .last()
        .map(|p| p.port_name.clone())
        .ok_or(TransportError::NoPorts)
}

fn is_arduino(info: &SerialPortInfo) -> bool {
    match &info.port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .as_deref()
            .map_or(false, |p| p.to_lowercase().contains("arduino")),
        _ => false,
    }
}
