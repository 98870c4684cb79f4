//! Dispatcher module exports.
//!
//! Re-exports the handler registry so downstream consumers can depend on this
//! module directly.

pub mod dispatcher;

pub use dispatcher::{DispatchResult, Dispatcher, MessageHandler};
