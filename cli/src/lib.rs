//! Flotilla Library
//!
//! Core modules for the flotilla deployment coordinator.

pub mod bus;
pub mod commands;
pub mod errors;
pub mod logs;
pub mod ports;
pub mod progress;
pub mod registry;
pub mod stats;
pub mod storage;
pub mod utils;
