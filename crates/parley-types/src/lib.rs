//! Wire and domain types shared by the store, the REST API and the gateway.

pub mod api;
pub mod events;
mod loose;
pub mod models;
