//! Sessions: participant credentials, token binding, and the per-connection
//! Session Adapter that gates every gameplay operation.

pub mod adapter;
pub mod registry;
pub mod token;

pub use adapter::SessionAdapter;
pub use registry::SessionRegistry;
pub use token::{mint_token, TOKEN_LEN};
