//! Inbound policy (limits, malformed-peer accounting).
//!
//! Compiled once per connection from the dispatch config and consulted by the
//! pump before and after decoding.

pub mod engine;

pub use engine::{InboundPolicy, PolicyDecision};
