use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, Direction, Frame, FrameConfig};
use crate::error::FrameError;

/// `tokio_util` codec for host-side MSP links.
///
/// Decodes every inbound frame (including checksum failures) and encodes
/// `(code, payload)` pairs as requests.
#[derive(Debug, Clone, Default)]
pub struct MspCodec {
    config: FrameConfig,
}

impl MspCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self { config }
    }
}

impl Decoder for MspCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        Ok(decode_frame(src, self.config.max_payload_size))
    }
}

impl<P: AsRef<[u8]>> Encoder<(u16, P)> for MspCodec {
    type Error = FrameError;

    fn encode(&mut self, item: (u16, P), dst: &mut BytesMut) -> Result<(), FrameError> {
        let (code, payload) = item;
        encode_frame(
            self.config.protocol_for(code),
            Direction::Request,
            code,
            payload.as_ref(),
            dst,
        )
    }
}
