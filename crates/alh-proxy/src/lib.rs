//! alh-proxy - ALH client for nodes behind a coordinator
//!
//! A coordinator forwards ALH requests to addressed nodes on its mesh
//! network. This crate wraps any other [`alh_core::AlhClient`] and
//! rewrites requests into the coordinator's `nodes` convention, so a
//! proxied node looks exactly like a directly connected one.

mod proxy;

pub use proxy::ProxyClient;
