//! `MSP_DATAFLASH_READ` request and reply layouts.

use bytes::Bytes;
use tracing::warn;

use crate::cursor::{FieldReader, FieldWriter};
use crate::huffman::{self, HuffmanTable};
use crate::version::ApiVersion;

/// Reply carries the data as-is.
pub const COMPRESSION_NONE: u8 = 0;
/// Reply carries a `u16` symbol count and a Huffman bit stream.
pub const COMPRESSION_HUFFMAN: u8 = 1;

/// One validated chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Flash address the chunk starts at.
    pub address: u32,
    /// Decompressed bytes.
    pub data: Bytes,
    /// Bytes the device sent for this chunk, before decompression.
    pub wire_size: usize,
}

/// Request payload for the chunk at `address`.
pub fn request_payload(
    address: u32,
    block_size: u16,
    allow_compression: bool,
    version: ApiVersion,
) -> Bytes {
    let mut w = FieldWriter::new();
    w.write_u32(address);
    if version.at_least(ApiVersion::V1_31) {
        w.write_u16(block_size);
    }
    if version.at_least(ApiVersion::V1_36) {
        w.write_bool(allow_compression);
    }
    w.into_bytes()
}

/// Parse a reply to a request for `address`.
///
/// `None` means the chunk must be requested again: echoed address mismatch,
/// a size that contradicts the payload, an unknown compression type, or a
/// stream that does not decode to the announced length.
pub fn parse_response(
    payload: &[u8],
    address: u32,
    version: ApiVersion,
    table: &HuffmanTable,
) -> Option<Chunk> {
    let mut r = FieldReader::new(payload);
    let echoed = r.read_u32().ok()?;
    if echoed != address {
        warn!(expected = address, received = echoed, "dataflash address mismatch");
        return None;
    }

    let (data_size, compression) = if version.at_least(ApiVersion::V1_31) {
        let size = r.read_u16().ok()? as usize;
        let compression = r.read_u8().ok()?;
        (size, compression)
    } else {
        (r.remaining(), COMPRESSION_NONE)
    };

    let body = match r.read_bytes(data_size) {
        Ok(body) => body,
        Err(_) => {
            warn!(address, data_size, available = r.remaining(), "dataflash chunk shorter than announced");
            return None;
        }
    };

    let data = match compression {
        COMPRESSION_NONE => Bytes::copy_from_slice(body),
        COMPRESSION_HUFFMAN => {
            let mut body = FieldReader::new(body);
            let Ok(count) = body.read_u16() else {
                warn!(address, "compressed chunk missing symbol count");
                return None;
            };
            match huffman::decode(body.rest(), count as usize, table) {
                Ok(data) => data,
                Err(err) => {
                    warn!(address, error = %err, "compressed chunk did not decode");
                    return None;
                }
            }
        }
        other => {
            warn!(address, compression = other, "unknown dataflash compression type");
            return None;
        }
    };

    Some(Chunk {
        address,
        data,
        wire_size: data_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::huffman::default_table;

    fn reply(address: u32, body: &[u8], compression: u8) -> Vec<u8> {
        let mut w = FieldWriter::new();
        w.write_u32(address)
            .write_u16(body.len() as u16)
            .write_u8(compression)
            .write_bytes(body);
        w.into_bytes().to_vec()
    }

    #[test]
    fn request_grows_with_version() {
        assert_eq!(request_payload(0x1000, 4096, true, ApiVersion::V1_25).len(), 4);
        assert_eq!(
            &request_payload(0x1000, 4096, true, ApiVersion::V1_31)[..],
            &[0x00, 0x10, 0x00, 0x00, 0x00, 0x10]
        );
        let full = request_payload(0x1000, 4096, false, ApiVersion::V1_36);
        assert_eq!(full.len(), 7);
        assert_eq!(full[6], 0);
    }

    #[test]
    fn uncompressed_chunk() {
        let payload = reply(64, &[1, 2, 3], COMPRESSION_NONE);
        let chunk = parse_response(&payload, 64, ApiVersion::V1_40, default_table()).unwrap();
        assert_eq!(&chunk.data[..], &[1, 2, 3]);
        assert_eq!(chunk.wire_size, 3);
    }

    #[test]
    fn legacy_chunk_is_the_remainder() {
        let payload = [8, 0, 0, 0, 0xAA, 0xBB];
        let chunk = parse_response(&payload, 8, ApiVersion::V1_25, default_table()).unwrap();
        assert_eq!(&chunk.data[..], &[0xAA, 0xBB]);
    }

    #[test]
    fn address_mismatch_asks_for_retry() {
        let payload = reply(128, &[1], COMPRESSION_NONE);
        assert!(parse_response(&payload, 64, ApiVersion::V1_40, default_table()).is_none());
    }

    #[test]
    fn compressed_chunk_decodes_to_announced_count() {
        let plain = [0u8, 0, 0xFF, 1, 2, 0x40, 0x40];
        let encoded = huffman::encode(&plain, default_table()).unwrap();
        let mut body = (plain.len() as u16).to_le_bytes().to_vec();
        body.extend_from_slice(&encoded);

        let payload = reply(0, &body, COMPRESSION_HUFFMAN);
        let chunk = parse_response(&payload, 0, ApiVersion::V1_40, default_table()).unwrap();
        assert_eq!(&chunk.data[..], &plain);
        assert_eq!(chunk.wire_size, body.len());
    }

    #[test]
    fn inconsistent_or_unknown_chunks_ask_for_retry() {
        let mut payload = reply(0, &[1, 2, 3], COMPRESSION_NONE);
        payload.truncate(payload.len() - 1);
        assert!(parse_response(&payload, 0, ApiVersion::V1_40, default_table()).is_none());

        let payload = reply(0, &[1, 2, 3], 7);
        assert!(parse_response(&payload, 0, ApiVersion::V1_40, default_table()).is_none());

        // Count claims more symbols than the stream holds.
        let payload = reply(0, &[10, 0, 0b0100_0000], COMPRESSION_HUFFMAN);
        assert!(parse_response(&payload, 0, ApiVersion::V1_40, default_table()).is_none());
    }
}
