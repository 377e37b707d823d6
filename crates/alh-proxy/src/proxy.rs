//! ProxyClient - forwards requests through a coordinator's nodes resource

use tracing::{info, warn};

use alh_core::client::AlhClient;
use alh_core::error::{AlhError, AlhResult};
use alh_core::routing::{junk_state_report, node_target, strip_node_return};

/// ALH client addressing one node behind a coordinator.
///
/// Composes any other [`AlhClient`] (a terminal on the coordinator's
/// serial port, a web gateway, even another proxy) and forwards every
/// request through the coordinator's `nodes` resource. Responses to
/// POSTs arrive wrapped in the coordinator's `"Node #{addr} return;"`
/// framing, which is stripped before the caller sees them.
///
/// When the coordinator reports the target node's command parser stuck
/// in the junk state, the proxy requests a remote parser reset before
/// reporting the failure, so the caller's next retry has a clean slate.
pub struct ProxyClient<C> {
    coordinator: C,
    addr: u64,
}

impl<C: AlhClient> ProxyClient<C> {
    /// Address node `addr` through `coordinator`.
    pub fn new(coordinator: C, addr: u64) -> Self {
        Self { coordinator, addr }
    }

    /// Network address of the target node
    pub fn addr(&self) -> u64 {
        self.addr
    }

    /// Consume the proxy and hand back the coordinator client.
    pub fn into_inner(self) -> C {
        self.coordinator
    }

    /// Ask the coordinator to reset the node's command parser.
    ///
    /// Best effort: the current request still fails either way, a reset
    /// only makes the next attempt likely to go through.
    fn reset_remote_parser(&mut self) {
        info!(addr = self.addr, "node parser in junk state, requesting remote reset");
        let addr = self.addr.to_string();
        if let Err(e) = self.coordinator.post("radio/noderesetparser", b"1", &[&addr]) {
            warn!(addr = self.addr, error = %e, "remote parser reset failed");
        }
    }

    fn check_junk_state(&mut self, result: AlhResult<String>) -> AlhResult<String> {
        match result {
            Err(AlhError::RandomError(msg)) if msg.contains(&junk_state_report(self.addr)) => {
                self.reset_remote_parser();
                Err(AlhError::RandomError(msg))
            }
            other => other,
        }
    }
}

impl<C: AlhClient> AlhClient for ProxyClient<C> {
    fn request_get(&mut self, resource: &str, args: &[&str]) -> AlhResult<String> {
        let target = node_target(self.addr, resource);
        let mut forwarded: Vec<&str> = Vec::with_capacity(args.len() + 1);
        forwarded.push(&target);
        forwarded.extend_from_slice(args);

        let result = self.coordinator.get("nodes", &forwarded);
        self.check_junk_state(result)
    }

    fn request_post(&mut self, resource: &str, data: &[u8], args: &[&str]) -> AlhResult<String> {
        let target = node_target(self.addr, resource);
        let mut forwarded: Vec<&str> = Vec::with_capacity(args.len() + 1);
        forwarded.push(&target);
        forwarded.extend_from_slice(args);

        let result = self.coordinator.post("nodes", data, &forwarded);
        self.check_junk_state(result)
            .map(|resp| strip_node_return(&resp, self.addr))
    }
}
