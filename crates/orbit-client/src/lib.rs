//! orbit client bindings.
//!
//! Three implementations of one contract:
//! - [`SyncClient`]: one blocking round trip per call;
//! - [`AsyncClient`]: callback delivery, with `begin`/`end` batching that
//!   sends any number of calls as one exchange;
//! - [`LocalAdapter`]: the callback contract over an in-process blocking
//!   implementation, with deferred ordering instead of wire batching.
//!
//! All three report failures as [`orbit_core::RpcError`], including transport
//! and decode failures.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod async_client;
pub mod local;
pub mod scheduler;
pub mod sync_client;

pub use async_client::AsyncClient;
pub use local::LocalAdapter;
pub use scheduler::TokioScheduler;
pub use sync_client::SyncClient;
