//! ipcwire dispatch library entry.
//!
//! This crate wires the decoder into a receive path: strict configuration,
//! the inbound policy, the handler registry, the receive pump and metrics.
//! The transport itself stays outside; it feeds the pump through a channel.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod obs;
pub mod policy;
pub mod services;
pub mod transport;
