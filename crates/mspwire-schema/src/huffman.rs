//! Canonical Huffman coding for compressed dataflash chunks.
//!
//! The device and host share one code-length table. Codes are assigned
//! canonically (shorter codes first, ties broken by symbol value) and read
//! most-significant bit first. Symbol 256 marks end of stream.

use std::sync::OnceLock;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::HuffmanError;

/// End-of-stream symbol.
pub const EOF_SYMBOL: u16 = 256;
/// Bytes plus the end-of-stream marker.
pub const SYMBOL_COUNT: usize = 257;
/// Longest code the decoder accepts.
pub const MAX_CODE_LEN: u8 = 16;

/// Code length of each symbol in the shared table.
const fn default_lengths() -> [u8; SYMBOL_COUNT] {
    let mut lengths = [10u8; SYMBOL_COUNT];
    lengths[0x00] = 2;
    lengths[0xFF] = 3;
    lengths[0x01] = 4;
    lengths[0x02] = 5;
    lengths[0x03] = 5;
    let mut symbol = 0x04;
    while symbol <= 0x0F {
        lengths[symbol] = 7;
        symbol += 1;
    }
    lengths
}

const DEFAULT_LENGTHS: [u8; SYMBOL_COUNT] = default_lengths();

/// Decoding and encoding tables derived from per-symbol code lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTable {
    /// `(code, length)` by symbol; length 0 means the symbol is absent.
    codes: Vec<(u32, u8)>,
    /// First canonical code of each length.
    first_code: [u32; MAX_CODE_LEN as usize + 1],
    /// Index into `symbols` of the first symbol of each length.
    first_index: [usize; MAX_CODE_LEN as usize + 1],
    count: [usize; MAX_CODE_LEN as usize + 1],
    /// Symbols ordered by (length, value).
    symbols: Vec<u16>,
    max_len: u8,
}

impl HuffmanTable {
    /// Build a table from one code length per symbol (`SYMBOL_COUNT` entries).
    ///
    /// Rejects lengths above [`MAX_CODE_LEN`], an empty table, and tables
    /// that oversubscribe the code space. Incomplete tables are allowed; bit
    /// patterns outside the assigned codes fail at decode time.
    pub fn from_lengths(lengths: &[u8]) -> Result<Self, HuffmanError> {
        if lengths.len() != SYMBOL_COUNT {
            return Err(HuffmanError::InvalidTable(format!(
                "expected {SYMBOL_COUNT} lengths, got {}",
                lengths.len()
            )));
        }
        if let Some(len) = lengths.iter().find(|&&len| len > MAX_CODE_LEN) {
            return Err(HuffmanError::InvalidTable(format!(
                "code length {len} exceeds {MAX_CODE_LEN}"
            )));
        }
        if lengths.iter().all(|&len| len == 0) {
            return Err(HuffmanError::InvalidTable("no symbols".into()));
        }

        // Kraft sum scaled to 2^MAX_CODE_LEN.
        let kraft: u64 = lengths
            .iter()
            .filter(|&&len| len > 0)
            .map(|&len| 1u64 << (MAX_CODE_LEN - len))
            .sum();
        if kraft > 1u64 << MAX_CODE_LEN {
            return Err(HuffmanError::InvalidTable("code space oversubscribed".into()));
        }

        Ok(Self::build(lengths))
    }

    fn build(lengths: &[u8]) -> Self {
        let mut symbols: Vec<u16> = (0..lengths.len() as u16)
            .filter(|&symbol| lengths[symbol as usize] > 0)
            .collect();
        symbols.sort_by_key(|&symbol| (lengths[symbol as usize], symbol));

        let mut table = Self {
            codes: vec![(0, 0); lengths.len()],
            first_code: [0; MAX_CODE_LEN as usize + 1],
            first_index: [0; MAX_CODE_LEN as usize + 1],
            count: [0; MAX_CODE_LEN as usize + 1],
            symbols,
            max_len: 0,
        };

        let mut code = 0u32;
        let mut prev_len = 0u8;
        for (index, &symbol) in table.symbols.iter().enumerate() {
            let len = lengths[symbol as usize];
            if len != prev_len {
                code <<= len - prev_len;
                table.first_code[len as usize] = code;
                table.first_index[len as usize] = index;
                prev_len = len;
            }
            table.codes[symbol as usize] = (code, len);
            table.count[len as usize] += 1;
            code += 1;
        }
        table.max_len = prev_len;
        table
    }

    /// Symbol for a `len`-bit code, if one is assigned.
    fn lookup(&self, code: u32, len: u8) -> Option<u16> {
        let len = len as usize;
        let offset = code.checked_sub(self.first_code[len])? as usize;
        (offset < self.count[len]).then(|| self.symbols[self.first_index[len] + offset])
    }

    fn code(&self, symbol: u16) -> Option<(u32, u8)> {
        self.codes
            .get(symbol as usize)
            .copied()
            .filter(|&(_, len)| len > 0)
    }
}

/// Placeholder code table built from the canonical layout.
///
/// It is not the firmware's table. Callers that enable compressed dataflash
/// reads must supply the firmware's table through the engine configuration.
pub fn default_table() -> &'static HuffmanTable {
    static TABLE: OnceLock<HuffmanTable> = OnceLock::new();
    TABLE.get_or_init(|| HuffmanTable::build(&DEFAULT_LENGTHS))
}

/// Decode exactly `expected` symbols from `data`.
///
/// Stops early only on the end-of-stream symbol, which is an
/// [`HuffmanError::Incomplete`] result, as is running out of bits.
pub fn decode(data: &[u8], expected: usize, table: &HuffmanTable) -> Result<Bytes, HuffmanError> {
    let mut out = BytesMut::with_capacity(expected);
    let mut code = 0u32;
    let mut len = 0u8;

    let bits = data
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |shift| u32::from((byte >> shift) & 1)));

    for bit in bits {
        if out.len() == expected {
            break;
        }
        code = (code << 1) | bit;
        len += 1;

        match table.lookup(code, len) {
            Some(EOF_SYMBOL) => break,
            Some(symbol) => {
                out.put_u8(symbol as u8);
                code = 0;
                len = 0;
            }
            None if len >= table.max_len => {
                return Err(HuffmanError::InvalidCode {
                    position: out.len(),
                });
            }
            None => {}
        }
    }

    if out.len() < expected {
        return Err(HuffmanError::Incomplete {
            decoded: out.len(),
            expected,
        });
    }
    Ok(out.freeze())
}

/// Encode `data` followed by the end-of-stream symbol, zero-padded to a byte.
///
/// Fails with [`HuffmanError::InvalidCode`] when the table has no code for a byte.
pub fn encode(data: &[u8], table: &HuffmanTable) -> Result<Bytes, HuffmanError> {
    let mut out = BytesMut::new();
    let mut acc = 0u8;
    let mut filled = 0u8;

    let symbols = data
        .iter()
        .map(|&byte| u16::from(byte))
        .chain(std::iter::once(EOF_SYMBOL));
    for (position, symbol) in symbols.enumerate() {
        let (code, len) = table
            .code(symbol)
            .ok_or(HuffmanError::InvalidCode { position })?;
        for shift in (0..len).rev() {
            acc = (acc << 1) | ((code >> shift) & 1) as u8;
            filled += 1;
            if filled == 8 {
                out.put_u8(acc);
                acc = 0;
                filled = 0;
            }
        }
    }
    if filled > 0 {
        out.put_u8(acc << (8 - filled));
    }
    Ok(out.freeze())
}
