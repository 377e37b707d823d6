//! AlhClient trait - the request/response abstraction for ALH transports

use tracing::{debug, warn};

use crate::error::{AlhError, AlhResult};

/// Attempts made before a transient failure is reported to the caller
pub const RETRIES: usize = 5;

/// Substrings that legitimately contain "error" in verbose node
/// diagnostics and must not trip the response content check.
const BENIGN_PATTERNS: [&str; 2] = ["bus errors  :", "   : 0 (error)"];

/// Request/response interface shared by every ALH transport.
///
/// Implementations supply the single-attempt [`request_get`] and
/// [`request_post`] channel operations. The provided [`get`] and
/// [`post`] wrappers add request logging and the retry loop on top, so
/// all transports behave identically at the call site.
///
/// [`request_get`]: AlhClient::request_get
/// [`request_post`]: AlhClient::request_post
/// [`get`]: AlhClient::get
/// [`post`]: AlhClient::post
pub trait AlhClient {
    /// Perform one GET attempt against the underlying channel.
    fn request_get(&mut self, resource: &str, args: &[&str]) -> AlhResult<String>;

    /// Perform one POST attempt against the underlying channel.
    fn request_post(&mut self, resource: &str, data: &[u8], args: &[&str]) -> AlhResult<String>;

    /// Read `resource` from the node.
    ///
    /// Transient protocol failures are retried up to [`RETRIES`] times;
    /// the final error is returned unchanged once attempts run out.
    fn get(&mut self, resource: &str, args: &[&str]) -> AlhResult<String> {
        log_request("GET", resource, args, None);
        retry(|| self.request_get(resource, args))
    }

    /// Write `data` to `resource` on the node.
    ///
    /// Same retry behaviour as [`get`](AlhClient::get).
    fn post(&mut self, resource: &str, data: &[u8], args: &[&str]) -> AlhResult<String> {
        log_request("POST", resource, args, Some(data));
        retry(|| self.request_post(resource, data, args))
    }
}

/// Run `attempt` up to [`RETRIES`] times.
///
/// Retryable failures are logged and retried immediately; channel
/// faults propagate on first occurrence. Transports with their own wait
/// behaviour (the gateway busy poll) implement it below this loop.
pub fn retry<T>(mut attempt: impl FnMut() -> AlhResult<T>) -> AlhResult<T> {
    let mut attempts = 1;
    loop {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempts < RETRIES => {
                warn!(attempt = attempts, error = %e, "request failed, retrying");
                attempts += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Join request arguments the way deployed firmware expects: plain
/// concatenation, no separator, no escaping.
pub fn concat_args(args: &[&str]) -> String {
    args.concat()
}

/// Scan a response for unstructured error reports.
///
/// Nodes have no error envelope for partial failures, so any reply that
/// still mentions "error" or "warning" after the known-benign
/// diagnostic lines are carved out is treated as one.
pub fn check_for_sneaky_error(resp: &str) -> AlhResult<()> {
    let mut text = resp.to_lowercase();
    for pattern in BENIGN_PATTERNS {
        text = text.replace(pattern, "");
    }
    if text.contains("error") || text.contains("warning") {
        return Err(AlhError::RandomError(resp.to_string()));
    }
    Ok(())
}

/// Log an outgoing request.
///
/// POST payloads are logged only when printable and longer than a few
/// characters, so binary blobs do not end up in the log.
pub fn log_request(method: &str, resource: &str, args: &[&str], data: Option<&[u8]>) {
    debug!("{}: {}?{}", method, resource, concat_args(args));
    if let Some(data) = data {
        if data.len() > 4 && is_printable(data) {
            debug!("data: {}", String::from_utf8_lossy(data));
        }
    }
}

/// Log a response, falling back to a byte-count placeholder for
/// unprintable content.
pub fn log_response(resp: &str) {
    if is_printable(resp.as_bytes()) {
        debug!("response: {}", resp.trim());
    } else {
        debug!("unprintable response ({} bytes)", resp.len());
    }
}

fn is_printable(data: &[u8]) -> bool {
    data.iter()
        .all(|&b| (0x20..0x7f).contains(&b) || b == b'\r' || b == b'\n' || b == b'\t')
}
