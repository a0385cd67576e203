use crate::types::RawSample;
use glam::{DQuat, DVec3};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Tagged ASCII frame prefixes.
const YPR_TAG: &[u8] = b"ypr";
const QUAT_TAG: &[u8] = b"quat";
const AWORLD_TAG: &[u8] = b"aworld";
const FLEX_TAG: &[u8] = b"flex";

/// Binary frame magic: control byte `$` followed by packet-type `0x02`.
const BINARY_MAGIC: [u8; 2] = [b'$', 0x02];
/// Binary frame payload: 4 x u16 big-endian fixed-point quaternion.
const BINARY_PAYLOAD_LEN: usize = 8;
/// Fixed-point divisor for the binary quaternion encoding.
const FIXED_POINT_SCALE: f64 = 16384.0;

/// UDP datagram: 24 big-endian f32 values.
const DATAGRAM_LEN: usize = 96;
/// Byte offsets within the datagram (protocol-fixed).
const DATAGRAM_ACCEL_OFFSET: usize = 0;
const DATAGRAM_ANGLES_OFFSET: usize = 36;

const CRLF: &[u8] = b"\r\n";

/// How long between keep-alive triggers to the serial device.
const TRIGGER_INTERVAL: Duration = Duration::from_millis(1000);

/// Why a frame was discarded. Never escapes the read loop as an error; the
/// reader logs the reason and reports "no sample this tick".
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload does not start with a known tag or magic")]
    UnrecognizedTag,
    #[error("wrong field count for `{tag}` frame: {count}")]
    WrongFieldCount { tag: &'static str, count: usize },
    #[error("frame not terminated with CRLF")]
    BadTerminator,
    #[error("frame too short: {len} bytes")]
    ShortFrame { len: usize },
    #[error("unparseable numeric field")]
    BadFloat,
}

/// Decodes raw transport payloads into [`RawSample`]s.
///
/// Stateless apart from the resync timer: the serial firmware halts its DMP
/// output when the host goes quiet, so the reader pokes it with a single
/// trigger byte when more than a second has passed since the last one.
#[derive(Debug)]
pub struct FrameDecoder {
    last_trigger: Option<Instant>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self { last_trigger: None }
    }

    /// Whether the keep-alive trigger byte should be written before the next
    /// read. Records `now` as the trigger time when it answers yes, so a
    /// failed write is not retried until the interval elapses again.
    pub fn should_trigger(&mut self, now: Instant) -> bool {
        let stale = self
            .last_trigger
            .map_or(true, |last| now.duration_since(last) > TRIGGER_INTERVAL);
        if stale {
            self.last_trigger = Some(now);
        }
        stale
    }

    /// Decode one transport payload: a CRLF-terminated serial line or a UDP
    /// datagram. Malformed input yields an error naming the reason; the
    /// caller recovers by skipping the tick.
    pub fn decode(&self, payload: &[u8]) -> Result<RawSample, DecodeError> {
        if payload.starts_with(YPR_TAG) || payload.starts_with(QUAT_TAG) {
            return decode_tagged(payload);
        }
        if payload.starts_with(&BINARY_MAGIC) {
            return decode_binary(payload);
        }
        if payload.len() == DATAGRAM_LEN {
            return decode_datagram(payload);
        }
        Err(DecodeError::UnrecognizedTag)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Tagged ASCII frames: tab-separated fields, CRLF terminator.
///
/// `ypr` carries 3 Euler angles, `quat` 4 quaternion components; both accept
/// an extended form appending `aworld` + 3 floats and `flex` + 1 float. Any
/// other field count rejects the frame.
fn decode_tagged(line: &[u8]) -> Result<RawSample, DecodeError> {
    if !line.ends_with(CRLF) {
        return Err(DecodeError::BadTerminator);
    }
    let body = &line[..line.len() - CRLF.len()];
    let fields: Vec<&[u8]> = body.split(|&b| b == b'\t').collect();

    match fields[0] {
        tag if tag == YPR_TAG => {
            let (accel, flex) = match fields.len() {
                4 => (None, None),
                10 => parse_groups(&fields[4..])?,
                n => {
                    return Err(DecodeError::WrongFieldCount {
                        tag: "ypr",
                        count: n,
                    })
                }
            };
            Ok(RawSample::YawPitchRoll {
                yaw: parse_float(fields[1])?,
                pitch: parse_float(fields[2])?,
                roll: parse_float(fields[3])?,
                accel,
                flex,
            })
        }
        tag if tag == QUAT_TAG => {
            let (accel, flex) = match fields.len() {
                5 => (None, None),
                11 => parse_groups(&fields[5..])?,
                n => {
                    return Err(DecodeError::WrongFieldCount {
                        tag: "quat",
                        count: n,
                    })
                }
            };
            let w = parse_float(fields[1])?;
            let x = parse_float(fields[2])?;
            let y = parse_float(fields[3])?;
            let z = parse_float(fields[4])?;
            Ok(RawSample::Quaternion {
                quat: DQuat::from_xyzw(x, y, z, w),
                accel,
                flex,
            })
        }
        _ => Err(DecodeError::UnrecognizedTag),
    }
}

/// Parse the trailing `aworld <x> <y> <z> flex <deg>` field groups.
fn parse_groups(fields: &[&[u8]]) -> Result<(Option<DVec3>, Option<f64>), DecodeError> {
    if fields[0] != AWORLD_TAG || fields[4] != FLEX_TAG {
        return Err(DecodeError::UnrecognizedTag);
    }
    let accel = DVec3::new(
        parse_float(fields[1])?,
        parse_float(fields[2])?,
        parse_float(fields[3])?,
    );
    let flex = parse_float(fields[5])?;
    Ok((Some(accel), Some(flex)))
}

fn parse_float(field: &[u8]) -> Result<f64, DecodeError> {
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .ok_or(DecodeError::BadFloat)
}

/// Fixed binary quaternion frame: magic, 8 payload bytes, CRLF.
///
/// Each component is an unsigned 16-bit big-endian fixed-point value divided
/// by 16384. The device encodes the signed range [-2, 2) with a +4 bias, so
/// anything that lands at or above 2.0 wraps back by 4.0.
fn decode_binary(frame: &[u8]) -> Result<RawSample, DecodeError> {
    let expected = BINARY_MAGIC.len() + BINARY_PAYLOAD_LEN + CRLF.len();
    if frame.len() < expected {
        return Err(DecodeError::ShortFrame { len: frame.len() });
    }
    if !frame.ends_with(CRLF) {
        return Err(DecodeError::BadTerminator);
    }

    let payload = &frame[BINARY_MAGIC.len()..BINARY_MAGIC.len() + BINARY_PAYLOAD_LEN];
    let mut q = [0.0f64; 4];
    for (component, pair) in q.iter_mut().zip(payload.chunks_exact(2)) {
        let raw = u16::from_be_bytes([pair[0], pair[1]]);
        let mut value = raw as f64 / FIXED_POINT_SCALE;
        if value >= 2.0 {
            value -= 4.0;
        }
        *component = value;
    }

    // Payload order is w, x, y, z.
    Ok(RawSample::BinaryQuaternion {
        quat: DQuat::from_xyzw(q[1], q[2], q[3], q[0]),
    })
}

/// 96-byte UDP datagram of 24 big-endian f32 values. Only the accelerometer
/// (offsets 0/4/8) and yaw/pitch/roll (offsets 36/40/44) regions are used;
/// the rest of the frame carries channels this system does not consume.
fn decode_datagram(payload: &[u8]) -> Result<RawSample, DecodeError> {
    debug_assert_eq!(payload.len(), DATAGRAM_LEN);

    let f = |offset: usize| -> f64 {
        let bytes: [u8; 4] = payload[offset..offset + 4].try_into().unwrap();
        f32::from_be_bytes(bytes) as f64
    };

    let accel = DVec3::new(
        f(DATAGRAM_ACCEL_OFFSET),
        f(DATAGRAM_ACCEL_OFFSET + 4),
        f(DATAGRAM_ACCEL_OFFSET + 8),
    );
    let yaw = f(DATAGRAM_ANGLES_OFFSET);
    let pitch = f(DATAGRAM_ANGLES_OFFSET + 4);
    let roll = f(DATAGRAM_ANGLES_OFFSET + 8);

    Ok(RawSample::Datagram {
        accel,
        yaw,
        pitch,
        roll,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(payload: &[u8]) -> Result<RawSample, DecodeError> {
        FrameDecoder::new().decode(payload)
    }

    /// Build a datagram with the given floats at the consumed offsets.
    fn make_datagram(accel: [f32; 3], angles: [f32; 3]) -> Vec<u8> {
        let mut payload = vec![0u8; DATAGRAM_LEN];
        for (i, v) in accel.iter().enumerate() {
            payload[i * 4..i * 4 + 4].copy_from_slice(&v.to_be_bytes());
        }
        for (i, v) in angles.iter().enumerate() {
            let off = DATAGRAM_ANGLES_OFFSET + i * 4;
            payload[off..off + 4].copy_from_slice(&v.to_be_bytes());
        }
        payload
    }

    /// Build a binary frame from raw fixed-point component values.
    fn make_binary(raw: [u16; 4]) -> Vec<u8> {
        let mut frame = BINARY_MAGIC.to_vec();
        for value in raw {
            frame.extend_from_slice(&value.to_be_bytes());
        }
        frame.extend_from_slice(CRLF);
        frame
    }

    #[test]
    fn bare_ypr_frame() {
        let raw = decode(b"ypr\t10.0\t-5.5\t3.25\r\n").unwrap();
        assert_eq!(
            raw,
            RawSample::YawPitchRoll {
                yaw: 10.0,
                pitch: -5.5,
                roll: 3.25,
                accel: None,
                flex: None,
            }
        );
    }

    #[test]
    fn extended_ypr_frame() {
        let raw = decode(b"ypr\t1.0\t2.0\t3.0\taworld\t0.1\t0.2\t0.3\tflex\t42.0\r\n").unwrap();
        assert_eq!(
            raw,
            RawSample::YawPitchRoll {
                yaw: 1.0,
                pitch: 2.0,
                roll: 3.0,
                accel: Some(DVec3::new(0.1, 0.2, 0.3)),
                flex: Some(42.0),
            }
        );
    }

    #[test]
    fn ypr_frame_with_missing_field_is_rejected() {
        assert_eq!(
            decode(b"ypr\t1.0\t2.0\r\n"),
            Err(DecodeError::WrongFieldCount {
                tag: "ypr",
                count: 3
            })
        );
    }

    #[test]
    fn ypr_frame_without_crlf_is_rejected() {
        assert_eq!(decode(b"ypr\t1.0\t2.0\t3.0\n"), Err(DecodeError::BadTerminator));
    }

    #[test]
    fn bare_quat_frame() {
        let raw = decode(b"quat\t0.7\t0.1\t0.2\t0.3\r\n").unwrap();
        match raw {
            RawSample::Quaternion { quat, accel, flex } => {
                assert_eq!(quat, DQuat::from_xyzw(0.1, 0.2, 0.3, 0.7));
                assert!(accel.is_none());
                assert!(flex.is_none());
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn extended_quat_frame() {
        let line = b"quat\t1.0\t0.0\t0.0\t0.0\taworld\t-1.5\t2.5\t9.8\tflex\t67.0\r\n";
        let raw = decode(line).unwrap();
        match raw {
            RawSample::Quaternion { quat, accel, flex } => {
                assert_eq!(quat.w, 1.0);
                assert_eq!(accel, Some(DVec3::new(-1.5, 2.5, 9.8)));
                assert_eq!(flex, Some(67.0));
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn quat_frame_with_wrong_group_tag_is_rejected() {
        let line = b"quat\t1.0\t0.0\t0.0\t0.0\tawrold\t1.0\t2.0\t3.0\tflex\t1.0\r\n";
        assert_eq!(decode(line), Err(DecodeError::UnrecognizedTag));
    }

    #[test]
    fn quat_frame_with_garbage_number_is_rejected() {
        assert_eq!(
            decode(b"quat\t1.0\tnope\t0.0\t0.0\r\n"),
            Err(DecodeError::BadFloat)
        );
    }

    #[test]
    fn binary_frame_decodes_fixed_point() {
        // 16384 / 16384.0 = 1.0, rest zero: the identity quaternion.
        let frame = make_binary([16384, 0, 0, 0]);
        match decode(&frame).unwrap() {
            RawSample::BinaryQuaternion { quat } => {
                assert_eq!(quat.w, 1.0);
                assert_eq!(quat.x, 0.0);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn binary_frame_wraps_biased_values() {
        // 32768 / 16384.0 = 2.0, which the wrap rule maps to -2.0.
        let frame = make_binary([32768, 49152, 0, 16384]);
        match decode(&frame).unwrap() {
            RawSample::BinaryQuaternion { quat } => {
                assert_eq!(quat.w, -2.0);
                // 49152 / 16384.0 = 3.0 -> -1.0.
                assert_eq!(quat.x, -1.0);
                assert_eq!(quat.y, 0.0);
                assert_eq!(quat.z, 1.0);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn short_binary_frame_is_rejected() {
        assert_eq!(
            decode(b"$\x02\x00\x01\r\n"),
            Err(DecodeError::ShortFrame { len: 6 })
        );
    }

    #[test]
    fn binary_frame_without_crlf_is_rejected() {
        let mut frame = make_binary([16384, 0, 0, 0]);
        frame.truncate(frame.len() - 2);
        frame.extend_from_slice(b"..");
        assert_eq!(decode(&frame), Err(DecodeError::BadTerminator));
    }

    #[test]
    fn datagram_round_trips_injected_floats() {
        let payload = make_datagram([1.5, -2.25, 9.875], [30.0, -14.5, 7.125]);
        match decode(&payload).unwrap() {
            RawSample::Datagram {
                accel,
                yaw,
                pitch,
                roll,
            } => {
                assert_eq!(accel, DVec3::new(1.5, -2.25, 9.875));
                assert_eq!(yaw, 30.0);
                assert_eq!(pitch, -14.5);
                assert_eq!(roll, 7.125);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn truncated_datagram_is_rejected() {
        let mut payload = make_datagram([1.0, 2.0, 3.0], [4.0, 5.0, 6.0]);
        payload.truncate(95);
        assert_eq!(decode(&payload), Err(DecodeError::UnrecognizedTag));
    }

    #[test]
    fn unknown_payload_is_rejected() {
        assert_eq!(decode(b"gibberish\r\n"), Err(DecodeError::UnrecognizedTag));
        assert_eq!(decode(b""), Err(DecodeError::UnrecognizedTag));
    }

    #[test]
    fn trigger_fires_once_per_interval() {
        let mut decoder = FrameDecoder::new();
        let t0 = Instant::now();
        assert!(decoder.should_trigger(t0));
        assert!(!decoder.should_trigger(t0 + Duration::from_millis(500)));
        assert!(decoder.should_trigger(t0 + Duration::from_millis(1500)));
    }
}
