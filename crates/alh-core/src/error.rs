//! Common error types for ALH clients

use thiserror::Error;

/// Result type for ALH client operations
pub type AlhResult<T> = Result<T, AlhError>;

/// Errors that can occur while talking to ALH nodes
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlhError {
    /// Node rejected the request as unparsable (junk-input frame)
    #[error("junk input: {0}")]
    JunkInput(String),

    /// Node reported a payload integrity failure (corrupted-data frame)
    #[error("corrupted data: {0}")]
    CorruptedData(String),

    /// Response content looks like an unstructured error report
    #[error("error in response: {0}")]
    RandomError(String),

    /// CRC mismatch reported by the remote end
    #[error("CRC mismatch: {0}")]
    Crc(String),

    /// Hard channel fault (dead device, failed HTTP exchange)
    #[error("terminal error: {0}")]
    Terminal(String),
}

impl AlhError {
    /// Whether the generic retry loop should re-attempt after this error.
    ///
    /// Channel faults are final: resending the same frame to a
    /// disconnected device or an unreachable gateway cannot succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AlhError::Terminal(_))
    }

    /// Junk-input error from a raw device reply.
    ///
    /// The frame terminator is dropped from the message so raised and
    /// logged text stays concise.
    pub fn junk_input(resp: &[u8], terminator: &[u8]) -> Self {
        AlhError::JunkInput(strip_terminator(resp, terminator))
    }

    /// Corrupted-data error from a raw device reply.
    pub fn corrupted_data(resp: &[u8], terminator: &[u8]) -> Self {
        AlhError::CorruptedData(strip_terminator(resp, terminator))
    }
}

impl From<std::io::Error> for AlhError {
    fn from(err: std::io::Error) -> Self {
        AlhError::Terminal(err.to_string())
    }
}

fn strip_terminator(resp: &[u8], terminator: &[u8]) -> String {
    let body = resp.strip_suffix(terminator).unwrap_or(resp);
    String::from_utf8_lossy(body).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn junk_input_strips_terminator() {
        let err = AlhError::junk_input(b"bad frame\r\nJUNK-INPUT\r\nOK\r\n", b"JUNK-INPUT\r\nOK\r\n");
        assert_eq!(err, AlhError::JunkInput("bad frame".to_string()));
    }

    #[test]
    fn junk_input_without_terminator_keeps_message() {
        let err = AlhError::junk_input(b"bad frame", b"JUNK-INPUT\r\nOK\r\n");
        assert_eq!(err, AlhError::JunkInput("bad frame".to_string()));
    }

    #[test]
    fn terminal_is_not_retryable() {
        assert!(!AlhError::Terminal("device gone".into()).is_retryable());
        assert!(AlhError::JunkInput("x".into()).is_retryable());
        assert!(AlhError::CorruptedData("x".into()).is_retryable());
        assert!(AlhError::RandomError("x".into()).is_retryable());
        assert!(AlhError::Crc("x".into()).is_retryable());
    }
}
