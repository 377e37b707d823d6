//! Terminal framing over a character device

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use crc::{Crc, CRC_32_ISO_HDLC};
use tracing::debug;

use alh_core::client::{check_for_sneaky_error, concat_args, log_response, AlhClient};
use alh_core::error::{AlhError, AlhResult};

/// Every completed reply ends with this sequence.
const RESPONSE_TERMINATOR: &[u8] = b"\r\nOK\r\n";
/// Reply suffix for a request the node could not parse.
const JUNK_INPUT_TERMINATOR: &[u8] = b"JUNK-INPUT\r\nOK\r\n";
/// Reply suffix for a payload that failed the node's integrity check.
const CORRUPTED_DATA_TERMINATOR: &[u8] = b"CORRUPTED-DATA\r\nOK\r\n";

/// Blank lines sent to resynchronise a confused node parser.
const RECOVERY_LINES: usize = 5;

/// Checksum attached to POST frames; the node recomputes it over the
/// same bytes and rejects the frame on mismatch.
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// ALH client for a node on a serial terminal.
///
/// Owns its device handle exclusively; requests are strictly
/// sequential, each one a blocking write followed by a blocking read up
/// to the frame terminator.
///
/// # Example
///
/// ```ignore
/// use alh_core::AlhClient;
/// use alh_terminal::TerminalClient;
///
/// let mut node = TerminalClient::open("/dev/ttyUSB0")?;
/// let uptime = node.get("uptime", &[])?;
/// ```
pub struct TerminalClient<P> {
    port: P,
}

impl TerminalClient<File> {
    /// Open a character device (e.g. `/dev/ttyUSB0`) for exclusive use.
    pub fn open(path: impl AsRef<Path>) -> AlhResult<Self> {
        let port = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::new(port))
    }
}

impl<P: Read + Write> TerminalClient<P> {
    /// Wrap an already opened device handle.
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Consume the client and hand back the device handle.
    pub fn into_inner(self) -> P {
        self.port
    }

    fn send_frame(&mut self, frame: &[u8]) -> AlhResult<Vec<u8>> {
        self.port.write_all(frame)?;
        self.port.flush()?;

        let mut resp = Vec::new();
        let mut buf = [0u8; 256];
        while !resp.ends_with(RESPONSE_TERMINATOR) {
            let n = self.port.read(&mut buf)?;
            if n == 0 {
                return Err(AlhError::Terminal(
                    "end of stream before response terminator".to_string(),
                ));
            }
            resp.extend_from_slice(&buf[..n]);
        }
        Ok(resp)
    }

    /// Flush blank lines so a node stuck mid-command drops back to a
    /// clean parser state.
    fn recover(&mut self) -> AlhResult<()> {
        debug!("sending recovery sequence");
        for _ in 0..RECOVERY_LINES {
            self.port.write_all(b"\r\n")?;
        }
        self.port.flush()?;
        Ok(())
    }

    fn send_with_error(&mut self, frame: &[u8]) -> AlhResult<String> {
        let resp = self.send_frame(frame)?;

        if resp.ends_with(JUNK_INPUT_TERMINATOR) {
            // The parser swallowed part of the frame; resynchronise
            // before the next attempt.
            self.recover()?;
            return Err(AlhError::junk_input(&resp, JUNK_INPUT_TERMINATOR));
        }
        if resp.ends_with(CORRUPTED_DATA_TERMINATOR) {
            return Err(AlhError::corrupted_data(&resp, CORRUPTED_DATA_TERMINATOR));
        }

        let body = &resp[..resp.len() - RESPONSE_TERMINATOR.len()];
        let text = String::from_utf8_lossy(body).into_owned();
        check_for_sneaky_error(&text)?;
        log_response(&text);
        Ok(text)
    }
}

impl<P: Read + Write> AlhClient for TerminalClient<P> {
    fn request_get(&mut self, resource: &str, args: &[&str]) -> AlhResult<String> {
        let frame = format!("get {}?{}\r\n", resource, concat_args(args));
        self.send_with_error(frame.as_bytes())
    }

    fn request_post(&mut self, resource: &str, data: &[u8], args: &[&str]) -> AlhResult<String> {
        let mut frame = format!(
            "post {}?{}\r\nlength={}\r\n",
            resource,
            concat_args(args),
            data.len()
        )
        .into_bytes();
        frame.extend_from_slice(data);
        frame.extend_from_slice(b"\r\n");

        // The checksum covers everything sent so far, length header
        // included; the crc field itself is outside it.
        let crc = CRC32.checksum(&frame);
        frame.extend_from_slice(format!("crc={}\r\n", crc).as_bytes());

        self.send_with_error(&frame)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::MockSerial;
    use alh_core::RETRIES;

    fn client(device: MockSerial) -> TerminalClient<MockSerial> {
        TerminalClient::new(device)
    }

    #[test]
    fn get_builds_frame_and_strips_terminator() {
        let device = MockSerial::new().reply_ok("21.5C");
        let mut node = client(device);

        let resp = node.get("sensor/mcTemp", &["1", "2"]).unwrap();
        assert_eq!(resp, "21.5C");

        let device = node.into_inner();
        assert_eq!(device.written(), b"get sensor/mcTemp?12\r\n");
    }

    #[test]
    fn get_is_not_cached() {
        let device = MockSerial::new().reply_ok("a").reply_ok("b");
        let mut node = client(device);

        assert_eq!(node.get("uptime", &[]).unwrap(), "a");
        assert_eq!(node.get("uptime", &[]).unwrap(), "b");

        let device = node.into_inner();
        let frames: Vec<_> = device
            .writes
            .iter()
            .filter(|w| w.starts_with(b"get "))
            .collect();
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn post_crc_covers_frame_without_crc_field() {
        let device = MockSerial::new().reply_ok("stored");
        let mut node = client(device);

        node.post("foo", b"hello", &["1"]).unwrap();

        let device = node.into_inner();
        // CRC-32 of b"post foo?1\r\nlength=5\r\nhello\r\n" (zlib polynomial).
        assert_eq!(
            device.written(),
            b"post foo?1\r\nlength=5\r\nhello\r\ncrc=1004362851\r\n".to_vec()
        );
    }

    #[test]
    fn junk_input_triggers_recovery_then_error() {
        let device = MockSerial::new()
            .reply(b"JUNK-INPUT\r\nOK\r\n")
            .reply_ok("fine");
        let mut node = client(device);

        // First attempt fails, retry succeeds after recovery.
        assert_eq!(node.get("uptime", &[]).unwrap(), "fine");

        let device = node.into_inner();
        assert_eq!(device.blank_line_writes(), RECOVERY_LINES);
    }

    #[test]
    fn retry_bound_with_persistent_junk() {
        let mut device = MockSerial::new();
        for _ in 0..RETRIES {
            device = device.reply(b"JUNK-INPUT\r\nOK\r\n");
        }
        let mut node = client(device);

        let err = node.get("uptime", &[]).unwrap_err();
        assert_eq!(err, AlhError::JunkInput(String::new()));

        let device = node.into_inner();
        let frames = device
            .writes
            .iter()
            .filter(|w| w.starts_with(b"get "))
            .count();
        assert_eq!(frames, RETRIES);
        // Recovery runs before each raise, the final attempt included.
        assert_eq!(device.blank_line_writes(), RETRIES * RECOVERY_LINES);
    }

    #[test]
    fn corrupted_data_skips_recovery() {
        let device = MockSerial::new().reply(b"CORRUPTED-DATA\r\nOK\r\n");
        let mut node = client(device);

        let err = node.request_post("firmware", b"\x01\x02", &[]).unwrap_err();
        assert_eq!(err, AlhError::CorruptedData(String::new()));

        let device = node.into_inner();
        assert_eq!(device.blank_line_writes(), 0);
    }

    #[test]
    fn error_message_keeps_reply_body() {
        let device = MockSerial::new().reply(b"line 3: bad token\r\nJUNK-INPUT\r\nOK\r\n");
        let mut node = client(device);

        let err = node.request_get("uptime", &[]).unwrap_err();
        assert_eq!(err, AlhError::JunkInput("line 3: bad token".to_string()));
    }

    #[test]
    fn eof_is_a_channel_fault() {
        // No scripted reply: the first read reports end of stream.
        let mut node = client(MockSerial::new());

        let err = node.get("uptime", &[]).unwrap_err();
        assert!(matches!(err, AlhError::Terminal(_)));

        // No retry for channel faults.
        let device = node.into_inner();
        assert_eq!(device.writes.len(), 1);
    }

    #[test]
    fn warning_in_reply_is_flagged() {
        let device = MockSerial::new().reply_ok("Warning: low battery");
        let mut node = client(device);

        let err = node.request_get("status", &[]).unwrap_err();
        assert_eq!(
            err,
            AlhError::RandomError("Warning: low battery".to_string())
        );
    }

    #[test]
    fn benign_diagnostics_pass_through() {
        let device = MockSerial::new().reply_ok("bus errors  : 3\r\npackets   : 812");
        let mut node = client(device);

        let resp = node.get("radio/stats", &[]).unwrap();
        assert_eq!(resp, "bus errors  : 3\r\npackets   : 812");
    }

    #[test]
    fn reply_split_across_reads_is_reassembled() {
        let device = MockSerial::new()
            .reply_chunked(&[b"21.", b"5C\r\nOK", b"\r\n"]);
        let mut node = client(device);

        assert_eq!(node.get("sensor/mcTemp", &[]).unwrap(), "21.5C");
    }
}
