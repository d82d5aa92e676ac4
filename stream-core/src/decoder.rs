//! Incremental decoder for `text/event-stream` bodies.
//!
//! HTTP bodies arrive in arbitrary chunks: a frame can be split across
//! chunks, and a multi-byte UTF-8 character can be split across a chunk
//! boundary. The decoder buffers raw bytes and only yields complete frames
//! (terminated by a blank line).
//!
//! `\r\n` and bare `\r` line endings are normalised to `\n`, including a
//! `\r\n` pair split across two chunks. Frames that contain nothing but
//! comments (keep-alives) are skipped.

use stream_types::SseEvent;

/// Buffers body bytes and yields complete event frames.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    /// The previous chunk ended in `\r`; a leading `\n` belongs to it.
    after_cr: bool,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk, returning every frame it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        for &byte in chunk {
            match byte {
                b'\n' if self.after_cr => {}
                b'\r' => self.buf.push(b'\n'),
                other => self.buf.push(other),
            }
            self.after_cr = byte == b'\r';
        }

        let mut events = Vec::new();
        while let Some(end) = find_frame_end(&self.buf) {
            let frame: Vec<u8> = self.buf.drain(..end + 2).collect();
            let text = String::from_utf8_lossy(&frame);
            if let Ok(event) = SseEvent::parse(&text) {
                events.push(event);
            }
        }
        events
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }
}

/// Position of the first `\n\n` in `buf`.
fn find_frame_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}
