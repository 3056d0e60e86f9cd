use serde::{Deserialize, Serialize};

use super::tab_state::Channel;

/// Settings that control how tab state is located and restored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RestoreSettings {
    /// Channel hint used to place legacy records without a version field.
    pub channel: Option<Channel>,
    /// Directory holding `tab<ID>` files; the platform data dir when unset.
    pub state_dir: Option<String>,
    /// Whether `cryptonito<ID>` files are restored along with regular tabs.
    pub restore_incognito: bool,
}

impl Default for RestoreSettings {
    fn default() -> Self {
        Self {
            channel: None,
            state_dir: None,
            restore_incognito: true,
        }
    }
}
