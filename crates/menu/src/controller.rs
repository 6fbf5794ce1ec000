//! Refresh controller: reconciles the tray menu and title against the
//! remote tracker.
//!
//! Two background loops run while the controller is `running`: a fast
//! tick that recomputes only the title, and a slower one that rebuilds
//! the whole view model. User actions flip the controller to stopped
//! before their first suspension point, perform the remote mutation, and
//! flip back with a forced refresh. On a single-threaded scheduler that
//! synchronous flag write is what keeps a concurrently-armed tick from
//! ever observing a half-applied mutation.

use crate::api::TimeTracker;
use crate::item::MenuAction;
use crate::settings::SettingsProvider;
use crate::sink::MenuSink;
use crate::view::{self, ViewModel};
use chrono::{DateTime, Utc};
use pomotray_clockify::{ActiveEntryPatch, ClientError};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Smallest start adjustment worth a remote write; anything below is
/// ignored.
pub const MIN_ADJUSTMENT_MS: i64 = 60_000;

/// How close a predecessor's end must be to the active entry's start to
/// count as chained to it.
pub const CHAIN_TOLERANCE_MS: i64 = 1_000;

/// Tick cadence of the two refresh loops.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Full menu rebuild interval.
    pub menu_refresh: Duration,
    /// Title-only recompute interval.
    pub title_refresh: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            menu_refresh: Duration::from_secs(5),
            title_refresh: Duration::from_secs(1),
        }
    }
}

#[derive(Clone, Copy)]
enum Tick {
    Title,
    Menu,
}

/// Owns the view model and drives it from ticks and user actions.
///
/// Clones share state. Must run inside a `tokio::task::LocalSet` on a
/// current-thread runtime; the tick loops are local tasks.
pub struct RefreshController<C: TimeTracker + 'static> {
    inner: Rc<Inner<C>>,
}

impl<C: TimeTracker + 'static> Clone for RefreshController<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

struct Inner<C> {
    tracker: C,
    sink: Rc<dyn MenuSink>,
    settings: Rc<dyn SettingsProvider>,
    config: ControllerConfig,
    running: Cell<bool>,
    tickers: RefCell<Vec<JoinHandle<()>>>,
}

impl<C: TimeTracker + 'static> RefreshController<C> {
    pub fn new(
        tracker: C,
        sink: Rc<dyn MenuSink>,
        settings: Rc<dyn SettingsProvider>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                tracker,
                sink,
                settings,
                config,
                running: Cell::new(false),
                tickers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Arm both refresh loops (if not already armed) and render
    /// immediately.
    pub async fn start(&self) {
        self.inner.running.set(true);
        if self.inner.tickers.borrow().is_empty() {
            tracing::info!(
                menu_refresh = ?self.inner.config.menu_refresh,
                title_refresh = ?self.inner.config.title_refresh,
                "starting refresh loops"
            );
            let title = spawn_ticker(
                Rc::downgrade(&self.inner),
                self.inner.config.title_refresh,
                Tick::Title,
            );
            let menu = spawn_ticker(
                Rc::downgrade(&self.inner),
                self.inner.config.menu_refresh,
                Tick::Menu,
            );
            *self.inner.tickers.borrow_mut() = vec![title, menu];
        }
        self.inner.refresh_now().await;
    }

    /// Disarm both loops. Idempotent. In-flight fetches are left to
    /// finish; their cache write-backs are version-checked anyway.
    pub fn stop(&self) {
        self.inner.running.set(false);
        for ticker in self.inner.tickers.borrow_mut().drain(..) {
            ticker.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// Forced full refresh regardless of the running flag.
    pub async fn refresh(&self) {
        self.inner.refresh_now().await;
    }

    /// Stop the running timer.
    pub async fn stop_timer(&self) {
        self.inner.running.set(false);
        let result = self.inner.do_stop_timer().await;
        self.finish_action("Error stopping the timer.", result).await;
    }

    /// Start (or switch to) an entry on `project_id`.
    pub async fn start_project(&self, project_id: &str) {
        self.inner.running.set(false);
        let result = self.inner.do_start_project(project_id).await;
        self.finish_action("Error starting new time entry.", result)
            .await;
    }

    /// Move the active entry's start, dragging a chained predecessor's
    /// end along with it. Sub-minute moves are ignored.
    pub async fn adjust_start(&self, new_start: DateTime<Utc>) {
        self.inner.running.set(false);
        let result = self.inner.do_adjust_start(new_start).await;
        self.finish_action("Error adjusting start time.", result).await;
    }

    /// Replace the active entry's description.
    pub async fn set_description(&self, description: &str) {
        self.inner.running.set(false);
        let result = self.inner.do_set_description(description).await;
        self.finish_action("Error updating time entry.", result).await;
    }

    /// Dispatch a clicked menu action. `EditDescription`,
    /// `SelectWorkspace`, and `Quit` belong to the host and are ignored
    /// here.
    pub async fn handle_action(&self, action: MenuAction) {
        match action {
            MenuAction::StopTimer => self.stop_timer().await,
            MenuAction::StartProject { project_id } => self.start_project(&project_id).await,
            MenuAction::AdjustStart { start } => self.adjust_start(start).await,
            MenuAction::SetDescription { description } => {
                self.set_description(&description).await
            }
            other => tracing::debug!(action = ?other, "action handled by host"),
        }
    }

    async fn finish_action(&self, message: &str, result: Result<(), ClientError>) {
        if let Err(error) = &result {
            tracing::warn!(error = %error, "user action failed");
            self.inner.sink.show_error(message, error.detail());
        }
        // Back to running with an immediate refresh either way, so the UI
        // never stays stuck showing a mid-action state.
        self.inner.running.set(true);
        self.inner.refresh_now().await;
    }
}

fn spawn_ticker<C: TimeTracker + 'static>(
    inner: Weak<Inner<C>>,
    period: Duration,
    tick: Tick,
) -> JoinHandle<()> {
    tokio::task::spawn_local(async move {
        loop {
            tokio::time::sleep(period).await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            if !inner.running.get() {
                continue;
            }
            let result = match tick {
                Tick::Title => inner.refresh_title().await,
                Tick::Menu => inner.refresh_menu().await,
            };
            if let Err(error) = result {
                tracing::warn!(error = %error, "background refresh failed");
            }
        }
    })
}

impl<C: TimeTracker + 'static> Inner<C> {
    fn identity(&self) -> Option<(String, String)> {
        Some((self.settings.workspace_id()?, self.settings.user_id()?))
    }

    /// Forced refresh of menu and title together; failures are logged,
    /// never fatal.
    async fn refresh_now(&self) {
        if let Err(error) = self.refresh_menu().await {
            tracing::warn!(error = %error, "menu refresh failed");
        }
        if let Err(error) = self.refresh_title().await {
            tracing::warn!(error = %error, "title refresh failed");
        }
    }

    async fn refresh_menu(&self) -> Result<(), ClientError> {
        let view = self.build_view().await?;
        self.sink.render_menu(&view::menu_items(&view));
        Ok(())
    }

    async fn refresh_title(&self) -> Result<(), ClientError> {
        let title = self.compute_title().await?;
        self.sink.set_title(&title);
        Ok(())
    }

    async fn compute_title(&self) -> Result<String, ClientError> {
        let Some((workspace_id, user_id)) = self.identity() else {
            return Ok(String::new());
        };
        let Some(entry) = self.tracker.active_entry(&workspace_id, &user_id, false).await? else {
            return Ok(String::new());
        };
        let projects = self.tracker.projects(&workspace_id).await?;
        Ok(view::title_for(Some(&entry), &projects, Utc::now()))
    }

    async fn build_view(&self) -> Result<ViewModel, ClientError> {
        let workspaces = self.tracker.workspaces().await?;
        let workspace_id = self.settings.workspace_id();
        let user_id = self.settings.user_id();

        let mut view = ViewModel {
            workspaces,
            selected_workspace: workspace_id.clone(),
            user_configured: user_id.is_some(),
            ..ViewModel::default()
        };
        let Some(workspace_id) = workspace_id else {
            return Ok(view);
        };

        let projects = self.tracker.projects(&workspace_id).await?;
        view.groups = view::group_by_client(&projects);

        let Some(user_id) = user_id else {
            return Ok(view);
        };

        let now = Utc::now();
        let active = self.tracker.active_entry(&workspace_id, &user_id, false).await?;
        let entries = self
            .tracker
            .recent_entries(&workspace_id, &user_id, None)
            .await?;
        view.recent = view::recent_projects(
            &entries,
            &projects,
            active.as_ref().and_then(|entry| entry.project_id.as_deref()),
        );
        view.title = view::title_for(active.as_ref(), &projects, now);

        if let Some(entry) = active {
            let project_entries = match entry.project_id.as_deref() {
                Some(project_id) => {
                    self.tracker
                        .recent_entries(&workspace_id, &user_id, Some(project_id))
                        .await?
                }
                None => Vec::new(),
            };
            view.active = Some(view::active_view(entry, &projects, &project_entries, now));
        }
        Ok(view)
    }

    async fn do_stop_timer(&self) -> Result<(), ClientError> {
        let Some((workspace_id, user_id)) = self.identity() else {
            return Ok(());
        };
        self.tracker.stop_current_entry(&workspace_id, &user_id).await?;
        Ok(())
    }

    async fn do_start_project(&self, project_id: &str) -> Result<(), ClientError> {
        let Some((workspace_id, user_id)) = self.identity() else {
            return Ok(());
        };
        self.tracker
            .start_entry(&workspace_id, &user_id, project_id)
            .await?;
        Ok(())
    }

    async fn do_set_description(&self, description: &str) -> Result<(), ClientError> {
        let Some((workspace_id, user_id)) = self.identity() else {
            return Ok(());
        };
        self.tracker
            .update_active_entry(
                &workspace_id,
                &user_id,
                ActiveEntryPatch {
                    description: Some(description.to_string()),
                    start: None,
                },
            )
            .await?;
        Ok(())
    }

    async fn do_adjust_start(&self, new_start: DateTime<Utc>) -> Result<(), ClientError> {
        let Some((workspace_id, user_id)) = self.identity() else {
            return Ok(());
        };
        let Some(active) = self.tracker.active_entry(&workspace_id, &user_id, true).await? else {
            return Err(ClientError::NoActiveEntry);
        };

        let delta = (new_start - active.start()).num_milliseconds();
        if delta.abs() < MIN_ADJUSTMENT_MS {
            tracing::debug!(delta_ms = delta, "ignoring sub-minute start adjustment");
            return Ok(());
        }

        // Keep the timeline gap-free: an entry ending within a second of
        // the current start is chained to it and its end follows the move.
        let entries = self
            .tracker
            .recent_entries(&workspace_id, &user_id, None)
            .await?;
        let predecessor = entries.iter().find(|entry| {
            entry.id != active.id
                && entry.end().is_some_and(|end| {
                    (active.start() - end).num_milliseconds().abs() <= CHAIN_TOLERANCE_MS
                })
        });
        if let Some(predecessor) = predecessor {
            self.tracker
                .update_entry_end(&workspace_id, &user_id, predecessor, new_start)
                .await?;
        }

        self.tracker
            .update_active_entry(
                &workspace_id,
                &user_id,
                ActiveEntryPatch {
                    description: None,
                    start: Some(new_start),
                },
            )
            .await?;
        Ok(())
    }
}

impl<C> Drop for Inner<C> {
    fn drop(&mut self) {
        for ticker in self.tickers.borrow_mut().drain(..) {
            ticker.abort();
        }
    }
}
