//! Read side of the host's settings store.

use std::cell::RefCell;

/// Read-only view of the persisted selection.
///
/// The core never writes settings: a `SelectWorkspace` click goes back to
/// the host, which persists it and asks for a refresh.
pub trait SettingsProvider {
    fn workspace_id(&self) -> Option<String>;
    fn workspace_name(&self) -> Option<String>;
    fn user_id(&self) -> Option<String>;
}

/// In-memory settings for tests and headless use.
#[derive(Default)]
pub struct InMemorySettings {
    workspace: RefCell<Option<(String, String)>>,
    user: RefCell<Option<String>>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_workspace(&self, id: &str, name: &str) {
        *self.workspace.borrow_mut() = Some((id.to_string(), name.to_string()));
    }

    pub fn set_user(&self, id: &str) {
        *self.user.borrow_mut() = Some(id.to_string());
    }
}

impl SettingsProvider for InMemorySettings {
    fn workspace_id(&self) -> Option<String> {
        self.workspace.borrow().as_ref().map(|(id, _)| id.clone())
    }

    fn workspace_name(&self) -> Option<String> {
        self.workspace.borrow().as_ref().map(|(_, name)| name.clone())
    }

    fn user_id(&self) -> Option<String> {
        self.user.borrow().clone()
    }
}
