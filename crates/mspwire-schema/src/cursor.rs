//! Sequential little-endian field access over message payloads.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, Result};

/// Bounds-checked reader over a payload.
///
/// Every read either yields the whole field or fails with
/// [`DecodeError::Truncated`]; the offset never moves past the end.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Total payload length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current offset from the start of the payload.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(i8::from_le_bytes(self.take()?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    /// One byte, non-zero is true.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Consume and return everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    /// Fixed-length text field.
    pub fn read_string(&mut self, len: usize) -> Result<String> {
        Ok(String::from_utf8_lossy(self.read_bytes(len)?).into_owned())
    }

    /// Text field prefixed by a one-byte length.
    pub fn read_pstring(&mut self) -> Result<String> {
        let len = self.read_u8()? as usize;
        self.read_string(len)
    }

    /// Number of `stride`-sized records left, rejecting partial records.
    pub fn records(&self, stride: usize) -> Result<usize> {
        let remaining = self.remaining();
        if stride == 0 || remaining % stride != 0 {
            return Err(DecodeError::StrideMismatch {
                len: remaining,
                stride,
            });
        }
        Ok(remaining / stride)
    }

    /// Succeeds only when the whole payload has been consumed.
    pub fn finish(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(DecodeError::TrailingBytes { remaining }),
        }
    }
}

/// Append-only little-endian payload builder. Calls chain.
#[derive(Debug, Clone, Default)]
pub struct FieldWriter {
    buf: BytesMut,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    pub fn write_i8(&mut self, value: i8) -> &mut Self {
        self.buf.put_i8(value);
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16_le(value);
        self
    }

    pub fn write_i16(&mut self, value: i16) -> &mut Self {
        self.buf.put_i16_le(value);
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.buf.put_u32_le(value);
        self
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.buf.put_i32_le(value);
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_u8(u8::from(value))
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    /// Length-prefixed text, clipped to 255 bytes.
    pub fn write_pstring(&mut self, text: &str) -> &mut Self {
        let bytes = &text.as_bytes()[..text.len().min(u8::MAX as usize)];
        self.write_u8(bytes.len() as u8).write_bytes(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// `value * scale`, rounded and clamped into a byte.
pub fn scaled_u8(value: f64, scale: f64) -> u8 {
    (value * scale).round().clamp(0.0, u8::MAX as f64) as u8
}

/// `value * scale`, rounded and clamped into a u16.
pub fn scaled_u16(value: f64, scale: f64) -> u16 {
    (value * scale).round().clamp(0.0, u16::MAX as f64) as u16
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn reads_little_endian_fields_in_order() {
        let payload = [0x01, 0xFF, 0x34, 0x12, 0xFE, 0xFF, 0x78, 0x56, 0x34, 0x12];
        let mut r = FieldReader::new(&payload);

        assert_eq!(r.read_u8().unwrap(), 1);
        assert_eq!(r.read_i8().unwrap(), -1);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_i16().unwrap(), -2);
        assert_eq!(r.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(r.remaining(), 0);
        assert!(r.finish().is_ok());
    }

    #[test]
    fn read_past_end_fails_without_advancing() {
        let mut r = FieldReader::new(&[1, 2, 3]);
        r.read_u8().unwrap();

        let err = r.read_u32().unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                offset: 1,
                needed: 4,
                remaining: 2
            }
        );
        assert_eq!(r.position(), 1);
        assert_eq!(r.read_u16().unwrap(), 0x0302);
    }

    #[test]
    fn records_rejects_partial_stride() {
        let r = FieldReader::new(&[0; 10]);
        assert_eq!(r.records(2).unwrap(), 5);
        assert_eq!(
            r.records(4).unwrap_err(),
            DecodeError::StrideMismatch { len: 10, stride: 4 }
        );
    }

    #[test]
    fn finish_reports_trailing_bytes() {
        let mut r = FieldReader::new(&[1, 2, 3]);
        r.read_u8().unwrap();
        assert_eq!(
            r.finish().unwrap_err(),
            DecodeError::TrailingBytes { remaining: 2 }
        );
    }

    #[test]
    fn pstring_roundtrip() {
        let mut w = FieldWriter::new();
        w.write_pstring("STM32F405").write_u8(7);
        let bytes = w.into_bytes();

        let mut r = FieldReader::new(&bytes);
        assert_eq!(r.read_pstring().unwrap(), "STM32F405");
        assert_eq!(r.read_u8().unwrap(), 7);
    }

    #[test]
    fn writer_chains() {
        let mut w = FieldWriter::new();
        w.write_u8(1).write_u16(0x0203).write_i16(-1).write_bool(true);
        assert_eq!(w.as_slice(), &[1, 0x03, 0x02, 0xFF, 0xFF, 1]);
    }

    #[test]
    fn scaled_values_round_and_clamp() {
        assert_eq!(scaled_u8(1.23, 100.0), 123);
        assert_eq!(scaled_u8(3.3, 10.0), 33);
        assert_eq!(scaled_u8(9.0, 100.0), 255);
        assert_eq!(scaled_u16(4.35, 100.0), 435);
    }

    proptest! {
        #[test]
        fn mixed_fields_read_back(a: u8, b: i16, c: u32, d: i32) {
            let mut w = FieldWriter::new();
            w.write_u8(a).write_i16(b).write_u32(c).write_i32(d);
            let bytes = w.into_bytes();

            let mut r = FieldReader::new(&bytes);
            prop_assert_eq!(r.read_u8().unwrap(), a);
            prop_assert_eq!(r.read_i16().unwrap(), b);
            prop_assert_eq!(r.read_u32().unwrap(), c);
            prop_assert_eq!(r.read_i32().unwrap(), d);
            prop_assert_eq!(r.remaining(), 0);
        }
    }
}
