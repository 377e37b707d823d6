//! Scripted serial device for terminal-framing tests

use std::collections::VecDeque;
use std::io::{self, Read, Write};

/// In-memory stand-in for a character device.
///
/// Reads serve scripted reply chunks in order; each scripted reply must
/// end at a frame terminator boundary so one reply answers one frame.
/// When the script runs out, `read` reports end of stream, which the
/// client treats as a dead device. Every `write` call is recorded.
#[derive(Debug, Default)]
pub struct MockSerial {
    chunks: VecDeque<Vec<u8>>,
    /// Raw `write` calls, in order.
    pub writes: Vec<Vec<u8>>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw reply exactly as the device would send it.
    pub fn reply(mut self, bytes: &[u8]) -> Self {
        self.chunks.push_back(bytes.to_vec());
        self
    }

    /// Queue a reply body followed by the OK terminator.
    pub fn reply_ok(self, body: &str) -> Self {
        self.reply(format!("{}\r\nOK\r\n", body).as_bytes())
    }

    /// Queue one reply split into several read results, simulating a
    /// slow device trickling bytes out.
    pub fn reply_chunked(mut self, chunks: &[&[u8]]) -> Self {
        for chunk in chunks {
            self.chunks.push_back(chunk.to_vec());
        }
        self
    }

    /// All bytes written, concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.writes.concat()
    }

    /// Number of writes consisting of a single blank line; the recovery
    /// sequence shows up as five of these per invocation.
    pub fn blank_line_writes(&self) -> usize {
        self.writes.iter().filter(|w| w.as_slice() == b"\r\n").count()
    }
}

impl Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(mut chunk) = self.chunks.pop_front() else {
            return Ok(0);
        };
        let n = buf.len().min(chunk.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            chunk.drain(..n);
            self.chunks.push_front(chunk);
        }
        Ok(n)
    }
}

impl Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes.push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
