//! The remote-service operations the controller consumes.

use chrono::{DateTime, Utc};
use pomotray_clockify::{
    ActiveEntryPatch, ClockifyClient, Project, Result, TimeEntry, Workspace,
};
use std::rc::Rc;

/// Time-tracking operations behind the controller.
///
/// [`ClockifyClient`] is the production implementation; tests substitute
/// an in-memory fake. The controller is single-threaded, so there are no
/// `Send` bounds and dispatch is static.
#[allow(async_fn_in_trait)]
pub trait TimeTracker {
    async fn workspaces(&self) -> Result<Vec<Workspace>>;

    async fn projects(&self, workspace_id: &str) -> Result<Vec<Project>>;

    /// Recent entries, newest first, optionally filtered to one project.
    async fn recent_entries(
        &self,
        workspace_id: &str,
        user_id: &str,
        project_id: Option<&str>,
    ) -> Result<Vec<TimeEntry>>;

    /// The running entry; `force` bypasses the cache.
    async fn active_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
        force: bool,
    ) -> Result<Option<TimeEntry>>;

    /// Stop the running entry and return it with its end set.
    async fn stop_current_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<TimeEntry>>;

    /// Start an entry on a project, chained to whatever was running.
    async fn start_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
        project_id: &str,
    ) -> Result<Option<TimeEntry>>;

    /// Merge a partial update into the running entry.
    async fn update_active_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
        patch: ActiveEntryPatch,
    ) -> Result<Option<TimeEntry>>;

    /// Rewrite one entry's end timestamp.
    async fn update_entry_end(
        &self,
        workspace_id: &str,
        user_id: &str,
        entry: &TimeEntry,
        end: DateTime<Utc>,
    ) -> Result<TimeEntry>;
}

impl TimeTracker for ClockifyClient {
    async fn workspaces(&self) -> Result<Vec<Workspace>> {
        ClockifyClient::workspaces(self).await
    }

    async fn projects(&self, workspace_id: &str) -> Result<Vec<Project>> {
        ClockifyClient::projects(self, workspace_id).await
    }

    async fn recent_entries(
        &self,
        workspace_id: &str,
        user_id: &str,
        project_id: Option<&str>,
    ) -> Result<Vec<TimeEntry>> {
        ClockifyClient::recent_entries(self, workspace_id, user_id, project_id).await
    }

    async fn active_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
        force: bool,
    ) -> Result<Option<TimeEntry>> {
        ClockifyClient::active_entry(self, workspace_id, user_id, force).await
    }

    async fn stop_current_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<TimeEntry>> {
        ClockifyClient::stop_current_entry(self, workspace_id, user_id).await
    }

    async fn start_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
        project_id: &str,
    ) -> Result<Option<TimeEntry>> {
        ClockifyClient::start_entry(self, workspace_id, user_id, project_id).await
    }

    async fn update_active_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
        patch: ActiveEntryPatch,
    ) -> Result<Option<TimeEntry>> {
        ClockifyClient::update_active_entry(self, workspace_id, user_id, patch).await
    }

    async fn update_entry_end(
        &self,
        workspace_id: &str,
        user_id: &str,
        entry: &TimeEntry,
        end: DateTime<Utc>,
    ) -> Result<TimeEntry> {
        ClockifyClient::update_entry_end(self, workspace_id, user_id, entry, end).await
    }
}

impl<T: TimeTracker> TimeTracker for Rc<T> {
    async fn workspaces(&self) -> Result<Vec<Workspace>> {
        (**self).workspaces().await
    }

    async fn projects(&self, workspace_id: &str) -> Result<Vec<Project>> {
        (**self).projects(workspace_id).await
    }

    async fn recent_entries(
        &self,
        workspace_id: &str,
        user_id: &str,
        project_id: Option<&str>,
    ) -> Result<Vec<TimeEntry>> {
        (**self).recent_entries(workspace_id, user_id, project_id).await
    }

    async fn active_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
        force: bool,
    ) -> Result<Option<TimeEntry>> {
        (**self).active_entry(workspace_id, user_id, force).await
    }

    async fn stop_current_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<TimeEntry>> {
        (**self).stop_current_entry(workspace_id, user_id).await
    }

    async fn start_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
        project_id: &str,
    ) -> Result<Option<TimeEntry>> {
        (**self).start_entry(workspace_id, user_id, project_id).await
    }

    async fn update_active_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
        patch: ActiveEntryPatch,
    ) -> Result<Option<TimeEntry>> {
        (**self).update_active_entry(workspace_id, user_id, patch).await
    }

    async fn update_entry_end(
        &self,
        workspace_id: &str,
        user_id: &str,
        entry: &TimeEntry,
        end: DateTime<Utc>,
    ) -> Result<TimeEntry> {
        (**self).update_entry_end(workspace_id, user_id, entry, end).await
    }
}
