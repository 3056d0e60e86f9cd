use serde::Serialize;

use super::tab_state::TabState;

/// A tab whose state file decoded successfully.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoredTab {
    pub tab_id: i32,
    pub incognito: bool,
    pub state: TabState,
}

/// A tab whose state file could not be restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreFailure {
    pub tab_id: i32,
    pub incognito: bool,
    pub error: String,
}

/// Outcome of restoring every tab in a state directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RestoreReport {
    pub restored: Vec<RestoredTab>,
    pub failed: Vec<RestoreFailure>,
    /// Incognito tabs left on disk because incognito restore is disabled.
    pub skipped: Vec<i32>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
