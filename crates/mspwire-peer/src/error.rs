use mspwire_schema::{DecodeError, MspCode};

/// Errors that can occur in engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Frame-level error while sending.
    #[error("frame error: {0}")]
    Frame(#[from] mspwire_frame::FrameError),

    /// A reply payload did not match the schema for its code.
    #[error("malformed {code} reply: {source}")]
    Decode {
        code: MspCode,
        #[source]
        source: DecodeError,
    },

    /// The code has no encoder, or is written through a sequenced upload at this version.
    #[error("{0} has no single-frame encoder")]
    NoEncoder(MspCode),

    /// The numeric code is not part of the protocol table.
    #[error("unknown message code {0}")]
    UnknownCode(u16),

    /// Batch payloads carry one byte per code.
    #[error("{0} cannot be carried in a batch request")]
    NotBatchable(MspCode),
}

pub type Result<T> = std::result::Result<T, EngineError>;
