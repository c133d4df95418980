//! Outbound side of the transport.

use std::io::Write;

use bytes::Bytes;
use mspwire_frame::FrameWriter;

/// Anything that can put a framed request on the wire.
pub trait FrameSink {
    fn send_frame(&mut self, code: u16, payload: &[u8]) -> mspwire_frame::Result<()>;
}

impl<T: Write> FrameSink for FrameWriter<T> {
    fn send_frame(&mut self, code: u16, payload: &[u8]) -> mspwire_frame::Result<()> {
        self.send(code, payload)
    }
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn send_frame(&mut self, code: u16, payload: &[u8]) -> mspwire_frame::Result<()> {
        (**self).send_frame(code, payload)
    }
}

/// Records requests instead of sending them. Used for replay and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    sent: Vec<(u16, Bytes)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests recorded so far, oldest first.
    pub fn sent(&self) -> &[(u16, Bytes)] {
        &self.sent
    }

    /// Drain recorded requests.
    pub fn take(&mut self) -> Vec<(u16, Bytes)> {
        std::mem::take(&mut self.sent)
    }
}

impl FrameSink for MemorySink {
    fn send_frame(&mut self, code: u16, payload: &[u8]) -> mspwire_frame::Result<()> {
        self.sent.push((code, Bytes::copy_from_slice(payload)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use mspwire_frame::decode_frame;

    #[test]
    fn frame_writer_sink_frames_requests() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.send_frame(108, &[]).unwrap();

        let mut wire = BytesMut::from(&writer.get_ref()[..]);
        let frame = decode_frame(&mut wire, 1024).unwrap();
        assert_eq!(frame.code, 108);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn memory_sink_records_in_order() {
        let mut sink = MemorySink::new();
        sink.send_frame(1, &[1]).unwrap();
        sink.send_frame(2, &[]).unwrap();
        assert_eq!(sink.sent()[0].0, 1);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.sent().is_empty());
    }
}
