//! MultiWii Serial Protocol for flight controller hosts.
//!
//! # Crate Structure
//!
//! - [`frame`]: MSP v1/v2 wire framing with checksum validation
//! - [`schema`]: Message codes, versioned decoders and encoders, the state store
//! - [`peer`]: Request/response engine (behind `peer` feature)

/// Re-export frame types.
pub mod frame {
    pub use mspwire_frame::*;
}

/// Re-export schema types.
pub mod schema {
    pub use mspwire_schema::*;
}

/// Re-export engine types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use mspwire_peer::*;
}
