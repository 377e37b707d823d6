//! Test doubles for ALH clients
//!
//! Provides a scripted in-memory client: queued replies are served in
//! order across both request kinds, and every request is recorded so
//! tests can assert on what was sent.

use std::collections::VecDeque;

use crate::client::AlhClient;
use crate::error::AlhResult;

/// One request issued against a [`MockClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// "GET" or "POST"
    pub method: String,
    pub resource: String,
    /// POST payload, `None` for GET
    pub data: Option<Vec<u8>>,
    pub args: Vec<String>,
}

/// Scripted ALH client.
///
/// Replies are consumed front-to-back, one per attempt, shared between
/// GET and POST. An exhausted script answers with an empty success, so
/// incidental requests (e.g. a recovery POST) need no explicit entry.
#[derive(Debug, Default)]
pub struct MockClient {
    replies: VecDeque<AlhResult<String>>,
    /// Every request issued, in order
    pub requests: Vec<RecordedRequest>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(mut self, resp: &str) -> Self {
        self.replies.push_back(Ok(resp.to_string()));
        self
    }

    /// Queue an error reply.
    pub fn reply_err(mut self, err: crate::error::AlhError) -> Self {
        self.replies.push_back(Err(err));
        self
    }

    /// Queue the same error reply `n` times.
    pub fn reply_err_times(mut self, err: crate::error::AlhError, n: usize) -> Self {
        for _ in 0..n {
            self.replies.push_back(Err(err.clone()));
        }
        self
    }

    /// Requests filtered down to one method.
    pub fn requests_for(&self, method: &str) -> Vec<&RecordedRequest> {
        self.requests.iter().filter(|r| r.method == method).collect()
    }

    fn next_reply(&mut self) -> AlhResult<String> {
        self.replies.pop_front().unwrap_or_else(|| Ok(String::new()))
    }

    fn record(&mut self, method: &str, resource: &str, data: Option<&[u8]>, args: &[&str]) {
        self.requests.push(RecordedRequest {
            method: method.to_string(),
            resource: resource.to_string(),
            data: data.map(|d| d.to_vec()),
            args: args.iter().map(|a| a.to_string()).collect(),
        });
    }
}

impl AlhClient for MockClient {
    fn request_get(&mut self, resource: &str, args: &[&str]) -> AlhResult<String> {
        self.record("GET", resource, None, args);
        self.next_reply()
    }

    fn request_post(&mut self, resource: &str, data: &[u8], args: &[&str]) -> AlhResult<String> {
        self.record("POST", resource, Some(data), args);
        self.next_reply()
    }
}
