//! Tray menu core for pomotray.
//!
//! Owns the menu view model and keeps it reconciled against the remote
//! tracker, without touching any OS widget directly.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                           │
//! │  item.rs   - tagged menu-item/action model                  │
//! │  view.rs   - view-model construction (pure)                 │
//! │  format.rs - duration/title/started-at rendering            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Seam Layer                            │
//! │  api.rs      - TimeTracker operations (ClockifyClient impl) │
//! │  sink.rs     - MenuSink render target                       │
//! │  settings.rs - SettingsProvider read side                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! │  controller.rs - periodic refresh + user-action entry points│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is single-threaded and cooperative: the controller's loops
//! are local tasks on a current-thread runtime, shared state lives in
//! `Rc`/`Cell`, and user actions suppress background refresh by flipping
//! a flag before their first await.

mod api;
mod controller;
mod format;
mod item;
mod settings;
mod sink;
mod view;

pub use api::TimeTracker;
pub use controller::{
    ControllerConfig, RefreshController, CHAIN_TOLERANCE_MS, MIN_ADJUSTMENT_MS,
};
pub use format::{duration_label, local_time, started_at_label, tray_title};
pub use item::{MenuAction, MenuItem};
pub use settings::{InMemorySettings, SettingsProvider};
pub use sink::{InMemorySink, MenuSink, NullSink};
pub use view::{
    active_view, description_choices, group_by_client, menu_items, recent_projects,
    start_adjustments, title_for, ActiveView, ClientGroup, StartAdjustment, ViewModel,
    DESCRIPTION_SOURCE_ENTRIES, MAX_RECENT_PROJECTS,
};
