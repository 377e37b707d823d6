//! Routing helpers for coordinator-proxied node addressing.
//!
//! A coordinator exposes downstream mesh nodes through its generic
//! `nodes` resource. Requests carry the target in the first argument as
//! `"{addr}/{resource}?"`, and proxied POST responses come back wrapped
//! in a `"Node #{addr} return;"` prefix. These helpers centralise both
//! conventions so every call site behaves identically.

/// Build the `nodes` argument fragment addressing `resource` on node `addr`.
///
/// ```
/// # use alh_core::routing::node_target;
/// assert_eq!(node_target(7, "sensor/mcTemp"), "7/sensor/mcTemp?");
/// ```
pub fn node_target(addr: u64, resource: &str) -> String {
    format!("{}/{}?", addr, resource)
}

/// Strip the coordinator's `"Node #{addr} return;"` wrapper from a
/// proxied response so it is indistinguishable from a direct reply.
///
/// ```
/// # use alh_core::routing::strip_node_return;
/// assert_eq!(strip_node_return("Node #7 return;OK-DATA", 7), "OK-DATA");
/// assert_eq!(strip_node_return("OK-DATA", 7), "OK-DATA");
/// ```
pub fn strip_node_return(resp: &str, addr: u64) -> String {
    let prefix = format!("Node #{} return;", addr);
    resp.strip_prefix(prefix.as_str()).unwrap_or(resp).to_string()
}

/// Message fragment a coordinator reports when a node's command parser
/// has fallen into the junk state and needs a remote reset.
pub fn junk_state_report(addr: u64) -> String {
    format!("NODES:Node {} parser is in junk state", addr)
}
