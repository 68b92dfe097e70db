//! Server-side dispatch: decode, execute on the logic thread, re-encode.

pub mod call;
pub mod dispatcher;
pub mod logic;

pub use call::{BatchCall, CallTarget, DeferredCall, SingleCall};
pub use dispatcher::{decode, Connection, Dispatcher};
pub use logic::LogicThread;
