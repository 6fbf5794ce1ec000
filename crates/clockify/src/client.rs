//! HTTP accessors and mutators over the Clockify REST API.

use crate::models::{Project, TimeEntry, User, Workspace};
use crate::{ClientError, Result};
use chrono::{DateTime, Utc};
use pomotray_cache::{Version, VersionedCache};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.clockify.me/api/v1";

/// TTL for slow-moving catalog resources (workspaces, projects).
pub const CATALOG_TTL: Duration = Duration::from_secs(300);

/// TTL for volatile resources (active entry, recent entries, identity).
pub const LIVE_TTL: Duration = Duration::from_secs(5);

/// Typed cache bundle consumed by [`ClockifyClient`].
///
/// Built by the host and injected into the client constructor; clones
/// share storage, giving one cache per process without a global.
#[derive(Clone, Default)]
pub struct ApiCache {
    workspaces: VersionedCache<Vec<Workspace>>,
    projects: VersionedCache<Vec<Project>>,
    entries: VersionedCache<Vec<TimeEntry>>,
    active: VersionedCache<Option<TimeEntry>>,
    user: VersionedCache<User>,
}

impl ApiCache {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Fields to merge into the active entry. Unset fields keep their current
/// remote values; project, task, tags, and billable are never touched.
#[derive(Debug, Clone, Default)]
pub struct ActiveEntryPatch {
    pub description: Option<String>,
    pub start: Option<DateTime<Utc>>,
}

/// Client for one API key. Reads are cached; mutators force a fresh
/// active-entry read before returning.
pub struct ClockifyClient {
    http: reqwest::Client,
    base_url: String,
    cache: ApiCache,
}

impl ClockifyClient {
    /// Build a client authenticating every request with `api_key`.
    pub fn new(api_key: &str, cache: ApiCache) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key).map_err(|_| ClientError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);
        let http = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache,
        })
    }

    /// Point the client at a different endpoint (self-hosted Clockify).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn workspaces(&self) -> Result<Vec<Workspace>> {
        self.cache
            .workspaces
            .get_or_fetch("workspaces", CATALOG_TTL, None, || {
                self.get_json("/workspaces".to_string())
            })
            .await
    }

    pub async fn projects(&self, workspace_id: &str) -> Result<Vec<Project>> {
        let key = format!("projects:{workspace_id}");
        let path = format!("/workspaces/{workspace_id}/projects?page-size=500");
        self.cache
            .projects
            .get_or_fetch(&key, CATALOG_TTL, None, || self.get_json(path))
            .await
    }

    /// The user's most recent entries, newest first, optionally filtered
    /// to one project.
    pub async fn recent_entries(
        &self,
        workspace_id: &str,
        user_id: &str,
        project_id: Option<&str>,
    ) -> Result<Vec<TimeEntry>> {
        let scope = project_id.unwrap_or("*");
        let key = format!("entries:{workspace_id}:{user_id}:{scope}");
        let mut path =
            format!("/workspaces/{workspace_id}/user/{user_id}/time-entries?page-size=200");
        if let Some(project_id) = project_id {
            path.push_str(&format!("&project={project_id}"));
        }
        self.cache
            .entries
            .get_or_fetch(&key, LIVE_TTL, None, || self.get_json(path))
            .await
    }

    /// The user's `limit` most recent entries, newest first.
    pub async fn last_entries(
        &self,
        workspace_id: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<TimeEntry>> {
        let key = format!("entries:{workspace_id}:{user_id}:last:{limit}");
        let path =
            format!("/workspaces/{workspace_id}/user/{user_id}/time-entries?page-size={limit}");
        self.cache
            .entries
            .get_or_fetch(&key, LIVE_TTL, None, || self.get_json(path))
            .await
    }

    /// The running entry, if any. `force` bypasses the cache with a
    /// never-matching version so the read reflects the remote right now.
    /// A known-absent active entry is cached too.
    pub async fn active_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
        force: bool,
    ) -> Result<Option<TimeEntry>> {
        let key = format!("active:{workspace_id}:{user_id}");
        let path = format!(
            "/workspaces/{workspace_id}/user/{user_id}/time-entries?page-size=1&in-progress=true"
        );
        let expected = force.then(Version::unique);
        self.cache
            .active
            .get_or_fetch(&key, LIVE_TTL, expected, || self.fetch_active(path))
            .await
    }

    async fn fetch_active(&self, path: String) -> Result<Option<TimeEntry>> {
        let entries: Vec<TimeEntry> = self.get_json(path).await?;
        Ok(entries.into_iter().next())
    }

    pub async fn current_user(&self) -> Result<User> {
        self.cache
            .user
            .get_or_fetch("user", LIVE_TTL, None, || self.get_json("/user".to_string()))
            .await
    }

    /// Stop the running entry, if any, and return it with its end set.
    pub async fn stop_current_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<TimeEntry>> {
        if self.active_entry(workspace_id, user_id, true).await?.is_none() {
            return Ok(None);
        }

        let path = format!("/workspaces/{workspace_id}/user/{user_id}/time-entries");
        let stopped: TimeEntry = self
            .send_json(Method::PATCH, path, &serde_json::json!({ "end": Utc::now() }))
            .await?;
        tracing::info!(entry = %stopped.id, "stopped time entry");

        self.active_entry(workspace_id, user_id, true).await?;
        Ok(Some(stopped))
    }

    /// Start an entry on `project_id`, chained gap-free to whatever was
    /// running: the stopped entry's end becomes the new entry's start. The
    /// description is prefilled with the most recent non-blank one used on
    /// that project.
    pub async fn start_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
        project_id: &str,
    ) -> Result<Option<TimeEntry>> {
        let stopped = self.stop_current_entry(workspace_id, user_id).await?;
        let start = stopped.as_ref().and_then(TimeEntry::end).unwrap_or_else(Utc::now);

        let description = self
            .recent_entries(workspace_id, user_id, Some(project_id))
            .await?
            .iter()
            .map(|entry| entry.description.trim())
            .find(|description| !description.is_empty())
            .unwrap_or_default()
            .to_string();

        let path = format!("/workspaces/{workspace_id}/time-entries");
        let created: TimeEntry = self
            .send_json(
                Method::POST,
                path,
                &serde_json::json!({
                    "start": start,
                    "projectId": project_id,
                    "description": description,
                }),
            )
            .await?;
        tracing::info!(entry = %created.id, project = project_id, "started time entry");

        self.active_entry(workspace_id, user_id, true).await
    }

    /// Merge `patch` into the running entry. No-op when nothing is
    /// running.
    pub async fn update_active_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
        patch: ActiveEntryPatch,
    ) -> Result<Option<TimeEntry>> {
        let Some(active) = self.active_entry(workspace_id, user_id, true).await? else {
            return Ok(None);
        };

        let body = serde_json::json!({
            "start": patch.start.unwrap_or_else(|| active.start()),
            "description": patch.description.as_deref().unwrap_or(&active.description),
            "projectId": active.project_id,
            "taskId": active.task_id,
            "tagIds": active.tag_ids,
            "billable": active.billable,
        });
        let path = format!("/workspaces/{workspace_id}/time-entries/{}", active.id);
        let _updated: TimeEntry = self.send_json(Method::PUT, path, &body).await?;

        self.active_entry(workspace_id, user_id, true).await
    }

    /// Rewrite `entry` with a new end timestamp. Used to extend a chained
    /// predecessor when the active entry's start moves.
    pub async fn update_entry_end(
        &self,
        workspace_id: &str,
        user_id: &str,
        entry: &TimeEntry,
        end: DateTime<Utc>,
    ) -> Result<TimeEntry> {
        let body = serde_json::json!({
            "start": entry.start(),
            "end": end,
            "description": entry.description,
            "projectId": entry.project_id,
            "taskId": entry.task_id,
            "tagIds": entry.tag_ids,
            "billable": entry.billable,
        });
        let path = format!("/workspaces/{workspace_id}/time-entries/{}", entry.id);
        let updated: TimeEntry = self.send_json(Method::PUT, path, &body).await?;

        self.active_entry(workspace_id, user_id, true).await?;
        Ok(updated)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: String) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "GET");
        let response = self.http.get(&url).send().await?;
        read_json(response).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: String,
        body: &serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, %url, "request");
        let response = self.http.request(method, &url).json(body).send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(ClientError::Api {
            status: status.as_u16(),
            detail,
        });
    }
    Ok(response.json().await?)
}
