//! TabState: reads and writes persisted browser tab state across format generations.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod managers;
pub mod platform;
pub mod services;
pub mod types;
