//! HTTP gateway client implementation

use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::StatusCode;
use tracing::{debug, info};
use url::Url;

use alh_core::client::{check_for_sneaky_error, concat_args, log_response, AlhClient};
use alh_core::error::{AlhError, AlhResult};

use crate::credentials::{CredentialProvider, StandardCredentials};

/// Body the gateway returns while another request holds the radio channel.
const BUSY_RESPONSE: &str = "ERROR: Communication in progress";

/// Delay between busy polls
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Per-request HTTP timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// ALH client that tunnels requests through an HTTP gateway in front of
/// a mesh coordinator.
///
/// Every logical operation maps to an HTTP GET on the gateway base URL
/// with the request encoded in query parameters (`method`, `resource`,
/// `cluster`, and `content` for posts). The numeric cluster id routes
/// the request to the right coordinator behind the gateway.
pub struct WebClient {
    http: HttpClient,
    base_url: Url,
    cluster: u32,
    credentials: Box<dyn CredentialProvider>,
    poll_interval: Duration,
}

impl WebClient {
    /// Connect to the gateway at `base_url`, addressing coordinator
    /// `cluster`.
    ///
    /// Uses the standard credential lookup (rc file search path, then
    /// an interactive prompt) for gateways requiring authentication.
    pub fn new(base_url: &str, cluster: u32) -> AlhResult<Self> {
        Self::with_config(
            base_url,
            cluster,
            Box::new(StandardCredentials::new()),
            DEFAULT_POLL_INTERVAL,
        )
    }

    /// Create a client with an explicit credential source and busy-poll
    /// interval.
    pub fn with_config(
        base_url: &str,
        cluster: u32,
        credentials: Box<dyn CredentialProvider>,
        poll_interval: Duration,
    ) -> AlhResult<Self> {
        // Gateways live on internal networks with self-signed
        // certificates; peer verification is off.
        let http = HttpClient::builder()
            .timeout(DEFAULT_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(http_err)?;

        let base_url =
            Url::parse(base_url).map_err(|e| AlhError::Terminal(format!("invalid URL: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            cluster,
            credentials,
            poll_interval,
        })
    }

    /// Gateway base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request_url(
        &self,
        method: &str,
        resource: &str,
        args: &[&str],
        content: Option<&[u8]>,
    ) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("method", method);
            query.append_pair("resource", &format!("{}?{}", resource, concat_args(args)));
            if let Some(data) = content {
                query.append_pair("content", &String::from_utf8_lossy(data));
            }
            query.append_pair("cluster", &self.cluster.to_string());
        }
        url
    }

    fn fetch(&self, url: &Url) -> AlhResult<Response> {
        let resp = self.http.get(url.clone()).send().map_err(http_err)?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        let host = url.host_str().unwrap_or("");
        debug!(host, "gateway requires authentication");
        let creds = self
            .credentials
            .lookup(host)
            .ok_or_else(|| AlhError::Terminal(format!("no credentials found for {}", host)))?;

        self.http
            .get(url.clone())
            .basic_auth(&creds.user, Some(&creds.password))
            .send()
            .map_err(http_err)
    }

    fn send(&self, url: &Url) -> AlhResult<String> {
        let resp = self.fetch(url)?;
        let status = resp.status();
        let body = resp.text().map_err(http_err)?;
        if status != StatusCode::OK {
            return Err(AlhError::Terminal(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }
        Ok(body)
    }

    /// Poll through gateway-busy replies until a real response arrives.
    ///
    /// The gateway serialises radio access and answers with a fixed
    /// busy body while another client holds the channel. This wait is
    /// unbounded; callers that need a cap must impose their own.
    fn send_with_error(&self, url: &Url) -> AlhResult<String> {
        let started = Instant::now();
        let mut polls = 0u32;
        loop {
            let body = self.send(url)?;
            if body == BUSY_RESPONSE {
                polls += 1;
                debug!(waited = ?started.elapsed(), "gateway busy, polling");
                thread::sleep(self.poll_interval);
                continue;
            }
            if polls > 0 {
                info!(waited = ?started.elapsed(), polls, "gateway became available");
            }
            check_for_sneaky_error(&body)?;
            log_response(&body);
            return Ok(body);
        }
    }
}

fn http_err(err: reqwest::Error) -> AlhError {
    AlhError::Terminal(err.to_string())
}

impl AlhClient for WebClient {
    fn request_get(&mut self, resource: &str, args: &[&str]) -> AlhResult<String> {
        let url = self.request_url("get", resource, args, None);
        self.send_with_error(&url)
    }

    fn request_post(&mut self, resource: &str, data: &[u8], args: &[&str]) -> AlhResult<String> {
        let url = self.request_url("post", resource, args, Some(data));
        self.send_with_error(&url)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::credentials::Credentials;

    struct NoCredentials;

    impl CredentialProvider for NoCredentials {
        fn lookup(&self, _host: &str) -> Option<Credentials> {
            None
        }
    }

    fn client(cluster: u32) -> WebClient {
        WebClient::with_config(
            "https://crn.example.com/communicator",
            cluster,
            Box::new(NoCredentials),
            Duration::from_millis(10),
        )
        .unwrap()
    }

    fn query_map(url: &Url) -> HashMap<String, String> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn get_url_carries_method_resource_cluster() {
        let client = client(10);
        let url = client.request_url("get", "sensor/mcTemp", &["1", "2"], None);

        let query = query_map(&url);
        assert_eq!(query["method"], "get");
        assert_eq!(query["resource"], "sensor/mcTemp?12");
        assert_eq!(query["cluster"], "10");
        assert!(!query.contains_key("content"));
    }

    #[test]
    fn post_url_carries_content() {
        let client = client(3);
        let url = client.request_url("post", "radio/version", &[], Some(b"1"));

        let query = query_map(&url);
        assert_eq!(query["method"], "post");
        assert_eq!(query["resource"], "radio/version?");
        assert_eq!(query["content"], "1");
        assert_eq!(query["cluster"], "3");
    }

    #[test]
    fn base_path_is_preserved() {
        let client = client(1);
        let url = client.request_url("get", "uptime", &[], None);
        assert_eq!(url.path(), "/communicator");
    }
}
