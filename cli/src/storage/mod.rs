//! Local storage for CLI configuration

pub mod layout;
pub mod settings;
