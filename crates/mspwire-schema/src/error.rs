/// Errors raised while decoding a message payload.
///
/// Every variant means the frame is malformed for the negotiated schema;
/// processing of that frame stops, nothing else is affected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A field read ran past the end of the payload.
    #[error("payload truncated at offset {offset}: needed {needed} bytes, {remaining} left")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// A list payload is not a whole number of fixed-size records.
    #[error("payload length {len} is not a multiple of record size {stride}")]
    StrideMismatch { len: usize, stride: usize },

    /// Decoding finished with unread bytes left in the payload.
    #[error("{remaining} trailing bytes left after decode")]
    TrailingBytes { remaining: usize },

    /// A length or count field contradicts the payload.
    #[error("invalid length: {0}")]
    InvalidLength(String),
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors raised by the Huffman decoder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HuffmanError {
    /// The bit stream ended before the expected number of symbols was produced.
    #[error("compressed stream ended after {decoded} of {expected} symbols")]
    Incomplete { decoded: usize, expected: usize },

    /// A run of bits longer than the longest code matched nothing in the tree.
    #[error("no code matches bit pattern at symbol {position}")]
    InvalidCode { position: usize },

    /// The code length table does not describe a usable prefix code.
    #[error("invalid code length table: {0}")]
    InvalidTable(String),
}
