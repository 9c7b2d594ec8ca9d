//! The announcement bus
//!
//! Peers tell each other what they just did. Announcements are advisory
//! and lossy by design: every fact they carry is already durable in the
//! log, so missing one only delays convergence until the next feed read.

pub mod announce;
pub mod listener;
pub mod topics;
