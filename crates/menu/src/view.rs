//! View-model construction: the data shaping behind the menu.
//!
//! Everything here is pure; the controller fetches, these functions
//! decide what the tray should show.

use crate::format;
use crate::item::{MenuAction, MenuItem};
use chrono::{DateTime, Utc};
use pomotray_clockify::{Project, TimeEntry, Workspace};

/// Cap on the "Switch to"/"Start" section.
pub const MAX_RECENT_PROJECTS: usize = 10;

/// How many recent entries feed the description suggestions.
pub const DESCRIPTION_SOURCE_ENTRIES: usize = 10;

const HALF_HOUR_MS: i64 = 30 * 60 * 1000;

/// Projects of one client, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientGroup {
    pub client: String,
    pub projects: Vec<Project>,
}

/// One candidate under "Adjust Start Time".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartAdjustment {
    pub label: String,
    pub start: DateTime<Utc>,
}

/// Everything the menu shows about the running entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveView {
    pub entry: TimeEntry,
    pub headline: String,
    pub description: String,
    pub description_choices: Vec<String>,
    pub adjustments: Vec<StartAdjustment>,
}

/// Derived, ephemeral description of what the tray should display.
///
/// Rebuilt wholesale on every refresh, never patched in place; the UI is
/// a render target, not a co-owner.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewModel {
    pub workspaces: Vec<Workspace>,
    pub selected_workspace: Option<String>,
    pub user_configured: bool,
    pub groups: Vec<ClientGroup>,
    pub active: Option<ActiveView>,
    pub recent: Vec<Project>,
    pub title: String,
}

/// Group projects by client name: first-occurrence order, exact string
/// match.
pub fn group_by_client(projects: &[Project]) -> Vec<ClientGroup> {
    let mut groups: Vec<ClientGroup> = Vec::new();
    for project in projects {
        match groups.iter_mut().find(|g| g.client == project.client_name) {
            Some(group) => group.projects.push(project.clone()),
            None => groups.push(ClientGroup {
                client: project.client_name.clone(),
                projects: vec![project.clone()],
            }),
        }
    }
    groups
}

/// Up to ten most-recently-used distinct projects, newest first,
/// excluding the active entry's project. `entries` must be newest first,
/// as the API returns them.
pub fn recent_projects(
    entries: &[TimeEntry],
    projects: &[Project],
    active_project: Option<&str>,
) -> Vec<Project> {
    let mut seen: Vec<&str> = Vec::new();
    let mut recent = Vec::new();
    for entry in entries {
        let Some(project_id) = entry.project_id.as_deref() else {
            continue;
        };
        if seen.contains(&project_id) || active_project == Some(project_id) {
            continue;
        }
        seen.push(project_id);
        if let Some(project) = projects.iter().find(|p| p.id == project_id) {
            recent.push(project.clone());
            if recent.len() == MAX_RECENT_PROJECTS {
                break;
            }
        }
    }
    recent
}

/// Deduplicated non-blank descriptions from the ten most recent entries,
/// newest first, excluding `current`.
pub fn description_choices(entries: &[TimeEntry], current: &str) -> Vec<String> {
    let mut choices: Vec<String> = Vec::new();
    for entry in entries.iter().take(DESCRIPTION_SOURCE_ENTRIES) {
        let description = entry.description.trim();
        if description.is_empty() || description == current {
            continue;
        }
        if choices.iter().any(|choice| choice == description) {
            continue;
        }
        choices.push(description.to_string());
    }
    choices
}

/// The four fixed "Adjust Start Time" candidates: fifteen and thirty
/// minutes back, the nearest half-hour boundary, and the boundary before
/// that.
pub fn start_adjustments(start: DateTime<Utc>) -> Vec<StartAdjustment> {
    let nearest = round_to_half_hour(start);
    let previous = nearest - chrono::Duration::milliseconds(HALF_HOUR_MS);
    vec![
        StartAdjustment {
            label: "by -15m".to_string(),
            start: start - chrono::Duration::minutes(15),
        },
        StartAdjustment {
            label: "by -30m".to_string(),
            start: start - chrono::Duration::minutes(30),
        },
        StartAdjustment {
            label: format!("to {}", format::local_time(nearest)),
            start: nearest,
        },
        StartAdjustment {
            label: format!("to {}", format::local_time(previous)),
            start: previous,
        },
    ]
}

fn round_to_half_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    let ms = t.timestamp_millis();
    let rounded = (ms + HALF_HOUR_MS / 2).div_euclid(HALF_HOUR_MS) * HALF_HOUR_MS;
    DateTime::from_timestamp_millis(rounded).unwrap_or(t)
}

/// Assemble the active-entry section of the view. `project_entries` are
/// the user's entries on the active project, newest first.
pub fn active_view(
    entry: TimeEntry,
    projects: &[Project],
    project_entries: &[TimeEntry],
    now: DateTime<Utc>,
) -> ActiveView {
    let project = entry
        .project_id
        .as_deref()
        .and_then(|id| projects.iter().find(|p| p.id == id));
    let (name, client) = project
        .map(|p| (p.name.as_str(), p.client_name.as_str()))
        .unwrap_or(("(no project)", ""));
    let headline = format!(
        "{name} ({client}) - Started at {}",
        format::started_at_label(entry.start(), now)
    );
    let description = entry.description.trim().to_string();
    ActiveView {
        headline,
        description_choices: description_choices(project_entries, &description),
        adjustments: start_adjustments(entry.start()),
        description,
        entry,
    }
}

/// Tray title for the current state; empty when nothing is running.
pub fn title_for(active: Option<&TimeEntry>, projects: &[Project], now: DateTime<Utc>) -> String {
    let Some(entry) = active else {
        return String::new();
    };
    let client = entry
        .project_id
        .as_deref()
        .and_then(|id| projects.iter().find(|p| p.id == id))
        .map(|p| p.client_name.as_str())
        .unwrap_or("");
    format::tray_title(entry.start(), client, now)
}

/// Assemble the full menu tree for `view`.
pub fn menu_items(view: &ViewModel) -> Vec<MenuItem> {
    let mut items = vec![MenuItem::Separator];

    if view.selected_workspace.is_some() {
        if let Some(active) = &view.active {
            items.push(MenuItem::Label {
                text: active.headline.clone(),
                tooltip: (!active.description.is_empty()).then(|| active.description.clone()),
            });
            if !active.description.is_empty() {
                items.push(MenuItem::Label {
                    text: active.description.clone(),
                    tooltip: None,
                });
            }
            items.push(MenuItem::Action {
                label: if active.description.is_empty() {
                    "Add description".to_string()
                } else {
                    "Update description".to_string()
                },
                action: MenuAction::EditDescription,
            });
            if !active.description_choices.is_empty() {
                items.push(MenuItem::Submenu {
                    label: "Set Description".to_string(),
                    items: active
                        .description_choices
                        .iter()
                        .map(|description| MenuItem::Action {
                            label: description.clone(),
                            action: MenuAction::SetDescription {
                                description: description.clone(),
                            },
                        })
                        .collect(),
                });
            }
            items.push(MenuItem::Action {
                label: "Stop Timer".to_string(),
                action: MenuAction::StopTimer,
            });
            items.push(MenuItem::Submenu {
                label: "Adjust Start Time".to_string(),
                items: active
                    .adjustments
                    .iter()
                    .map(|adjustment| MenuItem::Action {
                        label: adjustment.label.clone(),
                        action: MenuAction::AdjustStart {
                            start: adjustment.start,
                        },
                    })
                    .collect(),
            });
        }

        if view.user_configured {
            items.push(MenuItem::Separator);
            items.push(MenuItem::Label {
                text: if view.active.is_some() {
                    "Switch to".to_string()
                } else {
                    "Start".to_string()
                },
                tooltip: None,
            });
            for project in &view.recent {
                items.push(MenuItem::Action {
                    label: format!("{} ({})", project.name, project.client_name),
                    action: MenuAction::StartProject {
                        project_id: project.id.clone(),
                    },
                });
            }
        }

        items.push(MenuItem::Separator);
        items.push(MenuItem::Submenu {
            label: "All Projects".to_string(),
            items: view
                .groups
                .iter()
                .map(|group| MenuItem::Submenu {
                    label: group.client.clone(),
                    items: group
                        .projects
                        .iter()
                        .map(|project| MenuItem::Action {
                            label: project.name.clone(),
                            action: MenuAction::StartProject {
                                project_id: project.id.clone(),
                            },
                        })
                        .collect(),
                })
                .collect(),
        });
    }

    items.push(MenuItem::Submenu {
        label: "Workspaces".to_string(),
        items: view
            .workspaces
            .iter()
            .map(|workspace| MenuItem::Radio {
                label: workspace.name.clone(),
                checked: view.selected_workspace.as_deref() == Some(workspace.id.as_str()),
                action: MenuAction::SelectWorkspace {
                    workspace_id: workspace.id.clone(),
                    name: workspace.name.clone(),
                },
            })
            .collect(),
    });
    items.push(MenuItem::Separator);
    items.push(MenuItem::Action {
        label: "Exit".to_string(),
        action: MenuAction::Quit,
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pomotray_clockify::TimeInterval;

    fn project(id: &str, name: &str, client: &str) -> Project {
        Project {
            id: id.to_string(),
            name: name.to_string(),
            client_name: client.to_string(),
        }
    }

    fn entry(id: &str, project_id: Option<&str>, description: &str, start: DateTime<Utc>) -> TimeEntry {
        TimeEntry {
            id: id.to_string(),
            description: description.to_string(),
            project_id: project_id.map(str::to_string),
            task_id: None,
            tag_ids: None,
            billable: false,
            time_interval: TimeInterval {
                start,
                end: Some(start + chrono::Duration::minutes(30)),
            },
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_group_by_client_keeps_first_occurrence_order() {
        let projects = vec![
            project("p1", "Site", "ACME"),
            project("p2", "App", "Globex"),
            project("p3", "Audit", "ACME"),
        ];
        let groups = group_by_client(&projects);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].client, "ACME");
        assert_eq!(groups[0].projects.len(), 2);
        assert_eq!(groups[1].client, "Globex");
    }

    #[test]
    fn test_recent_projects_dedup_and_exclusion() {
        let projects = vec![
            project("p1", "Site", "ACME"),
            project("p2", "App", "Globex"),
            project("p3", "Audit", "ACME"),
        ];
        let t = base();
        let entries = vec![
            entry("e1", Some("p2"), "", t),
            entry("e2", Some("p1"), "", t - chrono::Duration::hours(1)),
            entry("e3", Some("p2"), "", t - chrono::Duration::hours(2)),
            entry("e4", Some("gone"), "", t - chrono::Duration::hours(3)),
            entry("e5", None, "", t - chrono::Duration::hours(4)),
            entry("e6", Some("p3"), "", t - chrono::Duration::hours(5)),
        ];

        let recent = recent_projects(&entries, &projects, Some("p1"));
        let ids: Vec<&str> = recent.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p3"]);
    }

    #[test]
    fn test_description_choices_dedup_order_and_filter() {
        // Twelve historical entries carrying three distinct non-blank
        // descriptions, newest first.
        let t = base();
        let descriptions = [
            "triage", "", "review", "triage", "  ", "standup", "review", "triage", "", "standup",
            "review", "standup",
        ];
        let entries: Vec<TimeEntry> = descriptions
            .iter()
            .enumerate()
            .map(|(i, d)| entry(&format!("e{i}"), Some("p1"), d, t - chrono::Duration::hours(i as i64)))
            .collect();

        let choices = description_choices(&entries, "");
        assert_eq!(choices, vec!["triage", "review", "standup"]);

        // The current description is excluded.
        let choices = description_choices(&entries, "review");
        assert_eq!(choices, vec!["triage", "standup"]);
    }

    #[test]
    fn test_description_choices_only_look_at_ten_entries() {
        let t = base();
        let mut entries: Vec<TimeEntry> = (0..10)
            .map(|i| entry(&format!("e{i}"), Some("p1"), "same", t))
            .collect();
        entries.push(entry("e10", Some("p1"), "buried", t));

        assert_eq!(description_choices(&entries, ""), vec!["same"]);
    }

    #[test]
    fn test_start_adjustments_offsets_and_rounding() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 7, 0).unwrap();
        let adjustments = start_adjustments(start);

        assert_eq!(adjustments.len(), 4);
        assert_eq!(adjustments[0].label, "by -15m");
        assert_eq!(adjustments[0].start, start - chrono::Duration::minutes(15));
        assert_eq!(adjustments[1].label, "by -30m");
        assert_eq!(adjustments[1].start, start - chrono::Duration::minutes(30));
        // 10:07 rounds down to 10:00, and one boundary before is 09:30.
        assert_eq!(
            adjustments[2].start,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(
            adjustments[3].start,
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
        );
        assert!(adjustments[2].label.starts_with("to "));

        // 10:20 rounds up to 10:30.
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 20, 0).unwrap();
        assert_eq!(
            start_adjustments(start)[2].start,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_title_for() {
        let projects = vec![project("p1", "Site", "ACME")];
        let mut active = entry("e1", Some("p1"), "", base());
        active.time_interval.end = None;
        let now = base() + chrono::Duration::milliseconds(3_725_000);

        assert_eq!(title_for(Some(&active), &projects, now), " 1:02:05 - ACME");
        assert_eq!(title_for(None, &projects, now), "");
    }

    #[test]
    fn test_menu_without_workspace_is_picker_only() {
        let view = ViewModel {
            workspaces: vec![
                Workspace {
                    id: "w1".to_string(),
                    name: "Personal".to_string(),
                },
                Workspace {
                    id: "w2".to_string(),
                    name: "Work".to_string(),
                },
            ],
            ..ViewModel::default()
        };

        let items = menu_items(&view);
        assert_eq!(items.len(), 4);
        assert!(matches!(&items[1], MenuItem::Submenu { label, items }
            if label == "Workspaces" && items.len() == 2));
        assert!(matches!(&items[3], MenuItem::Action { action: MenuAction::Quit, .. }));
    }

    #[test]
    fn test_menu_marks_selected_workspace() {
        let view = ViewModel {
            workspaces: vec![
                Workspace {
                    id: "w1".to_string(),
                    name: "Personal".to_string(),
                },
                Workspace {
                    id: "w2".to_string(),
                    name: "Work".to_string(),
                },
            ],
            selected_workspace: Some("w2".to_string()),
            ..ViewModel::default()
        };

        let items = menu_items(&view);
        let Some(MenuItem::Submenu { items: radios, .. }) = items
            .iter()
            .find(|item| matches!(item, MenuItem::Submenu { label, .. } if label == "Workspaces"))
        else {
            panic!("workspace submenu missing");
        };
        assert!(matches!(&radios[0], MenuItem::Radio { checked: false, .. }));
        assert!(matches!(&radios[1], MenuItem::Radio { checked: true, .. }));
    }

    #[test]
    fn test_menu_active_section() {
        let projects = vec![project("p1", "Site", "ACME")];
        let mut running = entry("e1", Some("p1"), "triage", base());
        running.time_interval.end = None;
        let history = vec![
            entry("e2", Some("p1"), "review", base() - chrono::Duration::hours(1)),
            entry("e3", Some("p1"), "triage", base() - chrono::Duration::hours(2)),
        ];
        let now = base() + chrono::Duration::minutes(5);

        let view = ViewModel {
            workspaces: vec![Workspace {
                id: "w1".to_string(),
                name: "Personal".to_string(),
            }],
            selected_workspace: Some("w1".to_string()),
            user_configured: true,
            groups: group_by_client(&projects),
            active: Some(active_view(running, &projects, &history, now)),
            recent: Vec::new(),
            title: String::new(),
        };

        let items = menu_items(&view);
        let labels: Vec<String> = items
            .iter()
            .map(|item| match item {
                MenuItem::Label { text, .. } => text.clone(),
                MenuItem::Action { label, .. } => label.clone(),
                MenuItem::Submenu { label, .. } => label.clone(),
                MenuItem::Radio { label, .. } => label.clone(),
                MenuItem::Separator => "---".to_string(),
            })
            .collect();

        assert!(labels.contains(&"Update description".to_string()));
        assert!(labels.contains(&"Stop Timer".to_string()));
        assert!(labels.contains(&"Adjust Start Time".to_string()));
        assert!(labels.contains(&"Switch to".to_string()));

        // The suggestion submenu excludes the current description.
        let Some(MenuItem::Submenu { items: choices, .. }) = items
            .iter()
            .find(|item| matches!(item, MenuItem::Submenu { label, .. } if label == "Set Description"))
        else {
            panic!("set-description submenu missing");
        };
        assert_eq!(choices.len(), 1);
        assert!(matches!(&choices[0], MenuItem::Action { label, .. } if label == "review"));
    }
}
