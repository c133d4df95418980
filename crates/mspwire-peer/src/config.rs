use std::sync::Arc;
use std::time::Duration;

use mspwire_schema::huffman::{default_table, HuffmanTable};

/// Engine behaviour knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline for requests that do not set their own; `None` waits forever.
    pub default_timeout: Option<Duration>,
    /// Reject replies with unread trailing bytes instead of logging them.
    pub strict_length: bool,
    /// Ask the device to Huffman-compress dataflash chunks (API 1.36+).
    ///
    /// Off by default: enable it only together with a [`EngineConfig::huffman_table`]
    /// that matches the firmware.
    pub allow_compression: bool,
    /// Code table for compressed chunks.
    pub huffman_table: Arc<HuffmanTable>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout: Some(Duration::from_secs(1)),
            strict_length: true,
            allow_compression: false,
            huffman_table: Arc::new(default_table().clone()),
        }
    }
}
