//! Plain-text rendering of entries, projects and clients.

use crate::dates::{Clock, format_elapsed};
use crate::entries::EntryList;
use crate::models::{Client, Project, TimeEntry, find_project_by_id};

/// One entry: a `*` marker when running, the description, the project and
/// the elapsed time, plus the id when `verbose`.
pub fn format_entry(entry: &TimeEntry, projects: &[Project], clock: &Clock, verbose: bool) -> String {
    let marker = if entry.is_running() { "* " } else { "  " };
    let project = entry
        .pid
        .and_then(|pid| find_project_by_id(projects, pid))
        .map(|project| format!(" @{} ", project.name))
        .unwrap_or_else(|| " ".to_string());
    let elapsed = entry
        .normalized_duration(clock.now_epoch())
        .map(format_elapsed)
        .unwrap_or_else(|_| "?".to_string());

    let mut line = format!(
        "{marker}{}{project}{elapsed}",
        entry.description_or_default()
    );
    if verbose {
        match entry.id {
            Some(id) => line.push_str(&format!(" [{id}]")),
            None => line.push_str(" [-]"),
        }
    }
    line
}

/// Entries grouped under a date heading, each day followed by its total.
pub fn format_entry_list(
    entries: &EntryList,
    projects: &[Project],
    clock: &Clock,
    verbose: bool,
) -> String {
    let mut lines = Vec::new();
    for day in entries.by_day(clock) {
        lines.push(day.date.format("%Y-%m-%d").to_string());
        for entry in &day.entries {
            lines.push(format_entry(entry, projects, clock, verbose));
        }
        lines.push(format!("  ({})", format_elapsed(day.total_seconds)));
    }
    lines.join("\n")
}

/// `@name` per project, with ` - client` when the project has one.
pub fn format_projects(projects: &[Project], clients: &[Client]) -> String {
    projects
        .iter()
        .map(|project| {
            let client = project
                .cid
                .and_then(|cid| clients.iter().find(|client| client.id == cid))
                .map(|client| format!(" - {}", client.name))
                .unwrap_or_default();
            format!("@{}{client}", project.name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_clients(clients: &[Client]) -> String {
    clients
        .iter()
        .map(|client| client.name.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
