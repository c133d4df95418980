//! Versioned MSP message schemas.
//!
//! Every message code maps to a decoder that parses its reply into the
//! [`FcState`] store and, for SET codes, an encoder that builds the request
//! payload back out of it. Layouts that grow with the firmware API version
//! are expressed as ordered ladders of `(threshold, step)` rungs.

pub mod chunk;
pub mod code;
pub mod cursor;
pub mod error;
pub mod huffman;
pub mod ladder;
pub mod messages;
pub mod state;
pub mod upload;
pub mod version;

pub use chunk::Chunk;
pub use code::MspCode;
pub use cursor::{FieldReader, FieldWriter};
pub use error::{DecodeError, HuffmanError, Result};
pub use huffman::HuffmanTable;
pub use messages::{decode, decode_lenient, encode, Codec};
pub use state::FcState;
pub use upload::{UploadKind, UploadPlan};
pub use version::ApiVersion;
