//! The deployment registry
//!
//! The replicated feed is the only source of truth. Everything else in
//! this module is derived: [`view`] folds the log into current state,
//! [`resolve`] picks rollback targets from it, [`index`] keeps a live
//! fold for long-running processes, and [`deployer`] appends to it.

pub mod deployer;
pub mod index;
pub mod log;
pub mod resolve;
pub mod view;
