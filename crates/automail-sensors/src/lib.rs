//! Sensor ingest for the automail prosthesis board.
//!
//! The board reports orientation (as a quaternion or Euler angles depending
//! on firmware), world-frame acceleration and a flex-sensor reading, over
//! either a serial link or UDP. This crate decodes the wire formats into one
//! canonical [`SensorSample`] and drives the blocking read loop.

pub mod decode;
pub mod reader;
pub mod transport;
pub mod types;

pub use decode::{DecodeError, FrameDecoder};
pub use reader::Sensors;
pub use transport::{Transport, TransportError};
pub use types::{RawSample, SensorSample};
