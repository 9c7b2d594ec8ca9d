//! Wire formats shared between flotilla peers
//!
//! Every node reads the same replicated deployment feed and the same
//! announcement topics, so the JSON shapes defined here are a cross-node
//! contract. Field names are frozen; additions must be optional.

pub mod models;

pub use models::*;
