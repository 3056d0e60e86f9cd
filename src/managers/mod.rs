// Tab-state managers
// Managers own stateful operations over the tab-state directory.

pub mod tab_state_store;
