//! Tagged menu-item model handed to the host for rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a clicked item asks for.
///
/// `StopTimer`, `StartProject`, `AdjustStart`, and `SetDescription` are
/// handled by the controller; `EditDescription`, `SelectWorkspace`, and
/// `Quit` are forwarded to the host (prompting, settings persistence, and
/// shutdown are its job).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuAction {
    StopTimer,
    StartProject { project_id: String },
    AdjustStart { start: DateTime<Utc> },
    EditDescription,
    SetDescription { description: String },
    SelectWorkspace { workspace_id: String, name: String },
    Quit,
}

/// One node of the tray menu tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuItem {
    /// Non-clickable informational line.
    Label {
        text: String,
        tooltip: Option<String>,
    },
    Separator,
    Action {
        label: String,
        action: MenuAction,
    },
    Submenu {
        label: String,
        items: Vec<MenuItem>,
    },
    /// Radio-style item; one checked per group.
    Radio {
        label: String,
        checked: bool,
        action: MenuAction,
    },
}
