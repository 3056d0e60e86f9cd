// Shared type definitions
// Each submodule defines types used across the crate.

pub mod credential;
pub mod errors;
pub mod restore;
pub mod safe_browsing;
pub mod settings;
pub mod tab_state;
