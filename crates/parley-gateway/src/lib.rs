//! Live delivery: binds socket connections to per-user channels and fans
//! persisted messages out to them.

pub mod connection;
pub mod delivery;
pub mod registry;

pub use delivery::{DeliveryError, Gateway, Session};
pub use registry::{ConnectionId, ConnectionRegistry};
