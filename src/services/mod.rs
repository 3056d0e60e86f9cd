// Tab-state services
// Services provide the codec layers, crypto, settings, and URL threat lookup.

pub mod contents_state;
pub mod crypto_service;
pub mod pickle;
pub mod safe_browsing;
pub mod settings_engine;
pub mod tab_state_codec;
