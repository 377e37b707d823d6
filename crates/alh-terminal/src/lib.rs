//! alh-terminal - ALH over a serial terminal
//!
//! Implements the line-oriented ALH framing for nodes attached on a
//! character device: textual GET/POST frames, a CRC-32 trailer on
//! writes, terminator-delimited reads, and a blank-line recovery
//! sequence for nodes stuck in a bad parser state.

mod client;
pub mod testing;

pub use client::TerminalClient;
