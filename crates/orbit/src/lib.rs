//! Top-level facade crate for orbit.
//!
//! Re-exports the contract, the gateway, and the client bindings so users can
//! depend on a single crate.

pub mod core {
    pub use orbit_core::*;
}

pub mod gateway {
    pub use orbit_gateway::*;
}

pub mod client {
    pub use orbit_client::*;
}
