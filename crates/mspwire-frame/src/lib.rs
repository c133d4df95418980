//! MSP (MultiWii Serial Protocol) wire framing.
//!
//! Two framings share the same stream:
//! - v1: `$M` + direction, 1-byte size, 1-byte code, payload, XOR checksum
//! - v2: `$X` + direction, flag, 2-byte code, 2-byte size, payload, CRC-8/DVB-S2
//!
//! Checksum failures are not dropped: the frame is surfaced with
//! `crc_valid == false` so the layer above can decide who gets told.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod checksum;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::MspCodec;
pub use checksum::{crc8_dvb_s2, xor_checksum};
pub use codec::{
    decode_frame, encode_frame, Direction, Frame, FrameConfig, Protocol, DEFAULT_MAX_PAYLOAD,
    V1_MAX_CODE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
