//! Top-level facade crate for ipcwire.
//!
//! Re-exports the decoder core and the dispatch library so users can depend
//! on a single crate.

pub mod core {
    pub use ipcwire_core::*;
}

pub mod dispatch {
    pub use ipcwire_dispatch::*;
}
