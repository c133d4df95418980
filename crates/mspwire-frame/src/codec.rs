use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::checksum::{crc8_dvb_s2_slice, xor_checksum};
use crate::error::{FrameError, Result};

/// Every frame starts with `$`.
pub const PREAMBLE: u8 = b'$';

/// v1 header: `$` `M` dir size code.
pub const V1_HEADER_SIZE: usize = 5;

/// v1 jumbo header adds a 2-byte real size after the code.
pub const V1_JUMBO_HEADER_SIZE: usize = 7;

/// v2 header: `$` `X` dir flag code(2) size(2).
pub const V2_HEADER_SIZE: usize = 8;

/// Highest code carried by v1 framing. 255 is reserved as the v2-over-v1 escape.
pub const V1_MAX_CODE: u16 = 254;

/// v1 size byte announcing a jumbo frame.
const V1_JUMBO_MARKER: u8 = 255;

/// Default maximum payload size accepted while decoding: 8 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 8 * 1024;

/// MSP protocol revision a frame is carried in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    #[default]
    V1,
    V2,
}

impl Protocol {
    fn marker(self) -> u8 {
        match self {
            Protocol::V1 => b'M',
            Protocol::V2 => b'X',
        }
    }

    fn from_marker(byte: u8) -> Option<Self> {
        match byte {
            b'M' => Some(Protocol::V1),
            b'X' => Some(Protocol::V2),
            _ => None,
        }
    }
}

/// Frame direction byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `<` host to device.
    Request,
    /// `>` device to host.
    Response,
    /// `!` device rejected the code as unsupported.
    Error,
}

impl Direction {
    pub fn as_byte(self) -> u8 {
        match self {
            Direction::Request => b'<',
            Direction::Response => b'>',
            Direction::Error => b'!',
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'<' => Some(Direction::Request),
            b'>' => Some(Direction::Response),
            b'!' => Some(Direction::Error),
            _ => None,
        }
    }
}

/// One decoded MSP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message code.
    pub code: u16,
    /// The message payload. Its length is authoritative.
    pub payload: Bytes,
    /// Direction byte from the header.
    pub direction: Direction,
    /// Framing revision the frame arrived in.
    pub protocol: Protocol,
    /// Whether the trailing checksum matched.
    pub crc_valid: bool,
}

impl Frame {
    /// Create a valid device-to-host v1 frame.
    pub fn new(code: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            code,
            payload: payload.into(),
            direction: Direction::Response,
            protocol: Protocol::V1,
            crc_valid: true,
        }
    }

    /// False when the device answered with the `!` direction.
    pub fn supported(&self) -> bool {
        self.direction != Direction::Error
    }

    /// The total wire size of this frame (header + payload + checksum).
    pub fn wire_size(&self) -> usize {
        let header = match self.protocol {
            Protocol::V1 if self.payload.len() >= V1_JUMBO_MARKER as usize => V1_JUMBO_HEADER_SIZE,
            Protocol::V1 => V1_HEADER_SIZE,
            Protocol::V2 => V2_HEADER_SIZE,
        };
        header + self.payload.len() + 1
    }
}

/// Encode a frame into the wire format.
///
/// ```text
/// v1: '$' 'M' dir | size(1) | code(1) | payload | xor(size..payload)
/// v1 jumbo: '$' 'M' dir | 0xFF | code(1) | size(2 LE) | payload | xor
/// v2: '$' 'X' dir | flag(1) | code(2 LE) | size(2 LE) | payload | crc8(flag..payload)
/// ```
pub fn encode_frame(
    protocol: Protocol,
    direction: Direction,
    code: u16,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    if payload.len() > u16::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u16::MAX as usize,
        });
    }

    let start = dst.len();
    dst.reserve(V2_HEADER_SIZE + payload.len() + 1);
    dst.put_u8(PREAMBLE);
    dst.put_u8(protocol.marker());
    dst.put_u8(direction.as_byte());

    match protocol {
        Protocol::V1 => {
            if code > V1_MAX_CODE {
                dst.truncate(start);
                return Err(FrameError::CodeOutOfRange { code });
            }
            if payload.len() < V1_JUMBO_MARKER as usize {
                dst.put_u8(payload.len() as u8);
                dst.put_u8(code as u8);
            } else {
                dst.put_u8(V1_JUMBO_MARKER);
                dst.put_u8(code as u8);
                dst.put_u16_le(payload.len() as u16);
            }
            dst.put_slice(payload);
            let checksum = xor_checksum(&dst[start + 3..]);
            dst.put_u8(checksum);
        }
        Protocol::V2 => {
            dst.put_u8(0);
            dst.put_u16_le(code);
            dst.put_u16_le(payload.len() as u16);
            dst.put_slice(payload);
            let crc = crc8_dvb_s2_slice(&dst[start + 3..]);
            dst.put_u8(crc);
        }
    }
    Ok(())
}

enum Parsed {
    Incomplete,
    Invalid,
    Complete(Frame),
}

/// Decode a frame from a buffer.
///
/// Returns `None` if the buffer doesn't contain a complete frame yet.
/// Bytes that cannot start a frame are discarded, so a noisy serial stream
/// resynchronises on the next `$`. On success, consumes the frame bytes.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Option<Frame> {
    loop {
        match src.iter().position(|&b| b == PREAMBLE) {
            Some(0) => {}
            Some(skip) => {
                trace!(skip, "discarding bytes before preamble");
                src.advance(skip);
            }
            None => {
                if !src.is_empty() {
                    trace!(skip = src.len(), "discarding bytes without preamble");
                    src.clear();
                }
                return None;
            }
        }

        if src.len() < 3 {
            return None; // Need more data
        }

        let header = Protocol::from_marker(src[1]).zip(Direction::from_byte(src[2]));
        let parsed = match header {
            Some((Protocol::V1, direction)) => parse_v1(src, direction, max_payload),
            Some((Protocol::V2, direction)) => parse_v2(src, direction, max_payload),
            None => Parsed::Invalid,
        };

        match parsed {
            Parsed::Incomplete => return None,
            Parsed::Complete(frame) => return Some(frame),
            Parsed::Invalid => {
                trace!("dropping preamble without a valid header");
                src.advance(1);
            }
        }
    }
}

fn parse_v1(src: &mut BytesMut, direction: Direction, max_payload: usize) -> Parsed {
    if src.len() < V1_HEADER_SIZE {
        return Parsed::Incomplete;
    }
    let code = u16::from(src[4]);
    let (header, size) = if src[3] == V1_JUMBO_MARKER {
        if src.len() < V1_JUMBO_HEADER_SIZE {
            return Parsed::Incomplete;
        }
        let size = u16::from_le_bytes([src[5], src[6]]) as usize;
        (V1_JUMBO_HEADER_SIZE, size)
    } else {
        (V1_HEADER_SIZE, src[3] as usize)
    };

    if size > max_payload {
        return Parsed::Invalid;
    }
    let total = header + size + 1;
    if src.len() < total {
        return Parsed::Incomplete;
    }

    let crc_valid = xor_checksum(&src[3..header + size]) == src[header + size];
    src.advance(header);
    let payload = src.split_to(size).freeze();
    src.advance(1);

    Parsed::Complete(Frame {
        code,
        payload,
        direction,
        protocol: Protocol::V1,
        crc_valid,
    })
}

fn parse_v2(src: &mut BytesMut, direction: Direction, max_payload: usize) -> Parsed {
    if src.len() < V2_HEADER_SIZE {
        return Parsed::Incomplete;
    }
    let code = u16::from_le_bytes([src[4], src[5]]);
    let size = u16::from_le_bytes([src[6], src[7]]) as usize;

    if size > max_payload {
        return Parsed::Invalid;
    }
    let total = V2_HEADER_SIZE + size + 1;
    if src.len() < total {
        return Parsed::Incomplete;
    }

    let crc_valid = crc8_dvb_s2_slice(&src[3..V2_HEADER_SIZE + size]) == src[V2_HEADER_SIZE + size];
    src.advance(V2_HEADER_SIZE);
    let payload = src.split_to(size).freeze();
    src.advance(1);

    Parsed::Complete(Frame {
        code,
        payload,
        direction,
        protocol: Protocol::V2,
        crc_valid,
    })
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size accepted while decoding. Default: 8 KiB.
    pub max_payload_size: usize,
    /// Framing used for outbound frames. Codes above 254 always go out as v2.
    pub protocol: Protocol,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            protocol: Protocol::V1,
        }
    }
}

impl FrameConfig {
    /// Framing to use for a given outbound code.
    pub fn protocol_for(&self, code: u16) -> Protocol {
        if code > V1_MAX_CODE {
            Protocol::V2
        } else {
            self.protocol
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn encode(protocol: Protocol, direction: Direction, code: u16, payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(protocol, direction, code, payload, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_v1_request_wire_bytes() {
        let buf = encode(Protocol::V1, Direction::Request, 1, &[]);
        assert_eq!(buf.as_ref(), b"$M<\x00\x01\x01");
    }

    #[test]
    fn test_v1_encode_decode_roundtrip() {
        let mut buf = encode(Protocol::V1, Direction::Response, 108, &[1, 2, 3, 4, 5, 6]);
        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();

        assert_eq!(frame.code, 108);
        assert_eq!(frame.payload.as_ref(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(frame.protocol, Protocol::V1);
        assert!(frame.crc_valid);
        assert!(frame.supported());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_v2_encode_decode_roundtrip() {
        let mut buf = encode(Protocol::V2, Direction::Response, 0x1009, b"serial");
        assert_eq!(buf.len(), V2_HEADER_SIZE + 6 + 1);

        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert_eq!(frame.code, 0x1009);
        assert_eq!(frame.payload.as_ref(), b"serial");
        assert_eq!(frame.protocol, Protocol::V2);
        assert!(frame.crc_valid);
    }

    #[test]
    fn test_v1_jumbo_frame() {
        let payload = vec![0x42; 600];
        let mut buf = encode(Protocol::V1, Direction::Response, 71, &payload);
        assert_eq!(buf[3], 0xFF);

        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert_eq!(frame.payload.len(), 600);
        assert!(frame.crc_valid);
        assert_eq!(frame.wire_size(), V1_JUMBO_HEADER_SIZE + 600 + 1);
    }

    #[test]
    fn test_checksum_mismatch_is_flagged_not_dropped() {
        let mut buf = encode(Protocol::V1, Direction::Response, 101, &[9, 9]);
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;

        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert_eq!(frame.code, 101);
        assert!(!frame.crc_valid);
    }

    #[test]
    fn test_v2_crc_mismatch_is_flagged() {
        let mut buf = encode(Protocol::V2, Direction::Response, 0x3001, &[4, 0, 1, 2, 3]);
        buf[V2_HEADER_SIZE] ^= 0x01;

        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert!(!frame.crc_valid);
    }

    #[test]
    fn test_error_direction_marks_unsupported() {
        let mut buf = encode(Protocol::V1, Direction::Error, 68, &[]);
        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert!(!frame.supported());
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buf = BytesMut::from(&b"$M>"[..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let mut buf = encode(Protocol::V1, Direction::Response, 2, b"BTFL");
        buf.truncate(V1_HEADER_SIZE + 2);

        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).is_none());
        assert_eq!(buf.len(), V1_HEADER_SIZE + 2);
    }

    #[test]
    fn test_resync_after_garbage() {
        let mut buf = BytesMut::from(&b"\x00\xFFnoise$Q$"[..]);
        buf.extend_from_slice(&encode(Protocol::V1, Direction::Response, 3, &[4, 5, 0]));

        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert_eq!(frame.code, 3);
        assert_eq!(frame.payload.as_ref(), &[4, 5, 0]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_garbage_without_preamble_is_cleared() {
        let mut buf = BytesMut::from(&b"hello"[..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_oversized_declared_size_is_treated_as_noise() {
        let mut buf = BytesMut::new();
        buf.put_slice(b"$X>");
        buf.put_u8(0);
        buf.put_u16_le(1);
        buf.put_u16_le(60_000);
        buf.extend_from_slice(&encode(Protocol::V1, Direction::Response, 5, b"x"));

        let frame = decode_frame(&mut buf, 1024).unwrap();
        assert_eq!(frame.code, 5);
    }

    #[test]
    fn test_multiple_frames() {
        let mut buf = encode(Protocol::V1, Direction::Response, 1, &[0, 1, 46]);
        buf.extend_from_slice(&encode(Protocol::V2, Direction::Response, 0x1009, &[0]));

        let f1 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        let f2 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert_eq!((f1.code, f1.protocol), (1, Protocol::V1));
        assert_eq!((f2.code, f2.protocol), (0x1009, Protocol::V2));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_v1_rejects_wide_code() {
        let mut buf = BytesMut::new();
        let err = encode_frame(Protocol::V1, Direction::Request, 0x1009, &[], &mut buf);
        assert!(matches!(err, Err(FrameError::CodeOutOfRange { code: 0x1009 })));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_protocol_for_upgrades_wide_codes() {
        let config = FrameConfig::default();
        assert_eq!(config.protocol_for(101), Protocol::V1);
        assert_eq!(config.protocol_for(0x1009), Protocol::V2);
    }

    proptest! {
        #[test]
        fn decode_recovers_any_encoded_frame(
            code in 0u16..=254,
            payload in proptest::collection::vec(any::<u8>(), 0..512),
            v2 in any::<bool>(),
        ) {
            let protocol = if v2 { Protocol::V2 } else { Protocol::V1 };
            let mut buf = encode(protocol, Direction::Response, code, &payload);
            let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
            prop_assert_eq!(frame.code, code);
            prop_assert_eq!(frame.payload.as_ref(), payload.as_slice());
            prop_assert!(frame.crc_valid);
            prop_assert!(buf.is_empty());
        }
    }
}
