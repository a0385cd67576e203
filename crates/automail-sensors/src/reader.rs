use crate::decode::FrameDecoder;
use crate::transport::{Transport, TransportError};
use crate::types::SensorSample;
use serialport::ClearBuffer;
use std::io::{Read, Write};
use std::net::UdpSocket;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Single byte written to the serial device as a keep-alive, re-arming the
/// DMP in case the board was reset while the host kept running.
const TRIGGER_BYTE: &[u8] = b"r";

/// Longest serial line worth accumulating; anything past this is noise from
/// a desynced stream.
const MAX_LINE_LEN: usize = 256;

/// UDP receive buffer. Datagrams other than the expected 96 bytes still get
/// read in full so the decoder can reject them by length.
const DATAGRAM_BUF_LEN: usize = 1024;

/// Blocking reader over a [`Transport`].
///
/// Owns the decoder and the last fully-populated sample, so partial frames
/// (quaternion-only, say) still yield a complete reading. One call to
/// [`Sensors::read`] performs at most one transport read; timeouts and
/// malformed frames come back as `None` and the loop stays live.
pub struct Sensors {
    transport: Transport,
    decoder: FrameDecoder,
    data: SensorSample,
}

impl Sensors {
    /// Open the serial transport. See [`Transport::serial`] for the device
    /// resolution rules.
    pub fn serial(device: Option<&str>, baud_rate: u32) -> Result<Self, TransportError> {
        Ok(Self::from_transport(Transport::serial(device, baud_rate)?))
    }

    /// Bind the UDP transport on `0.0.0.0:<port>`.
    pub fn net(port: u16) -> Result<Self, TransportError> {
        Ok(Self::from_transport(Transport::net(port)?))
    }

    pub fn from_transport(transport: Transport) -> Self {
        Self {
            transport,
            decoder: FrameDecoder::new(),
            data: SensorSample::zero(Instant::now()),
        }
    }

    /// The most recent fully-populated sample.
    pub fn last_sample(&self) -> &SensorSample {
        &self.data
    }

    /// Perform one blocking read and decode. Returns `None` when the tick
    /// produced no usable sample (timeout, malformed frame, transport
    /// hiccup); the caller proceeds with its previously-held sample.
    pub fn read(&mut self) -> Option<SensorSample> {
        let payload = match &mut self.transport {
            Transport::Serial { port } => {
                if self.decoder.should_trigger(Instant::now()) {
                    // Failure to write is logged only; the read still runs.
                    if let Err(e) = port.write_all(TRIGGER_BYTE) {
                        warn!(error = %e, "Failed to write serial trigger");
                    }
                }
                if let Err(e) = port.clear(ClearBuffer::All) {
                    warn!(error = %e, "Failed to clear serial buffers");
                }
                read_line(port.as_mut())?
            }
            Transport::Net { socket } => read_datagram(socket)?,
        };

        match self.decoder.decode(&payload) {
            Ok(raw) => {
                let sample = raw.apply(&self.data, Instant::now());
                self.data = sample;
                Some(sample)
            }
            Err(reason) => {
                trace!(%reason, len = payload.len(), "Discarded frame");
                None
            }
        }
    }
}

/// Accumulate one `\n`-terminated line from the serial port.
fn read_line<R: Read + ?Sized>(port: &mut R) -> Option<Vec<u8>> {
    let mut line = Vec::with_capacity(64);
    let mut byte = [0u8; 1];
    loop {
        match port.read(&mut byte) {
            Ok(0) => {
                debug!("Serial stream returned no data");
                return None;
            }
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    return Some(line);
                }
                if line.len() > MAX_LINE_LEN {
                    trace!("Serial line overran without terminator");
                    return None;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                debug!("Serial read timed out");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Serial read failed");
                return None;
            }
        }
    }
}

/// Receive one datagram. Blocks until a packet arrives.
fn read_datagram(socket: &UdpSocket) -> Option<Vec<u8>> {
    let mut buf = [0u8; DATAGRAM_BUF_LEN];
    match socket.recv_from(&mut buf) {
        Ok((len, _peer)) => Some(buf[..len].to_vec()),
        Err(e) => {
            warn!(error = %e, "UDP receive failed");
            None
        }
    }
}
