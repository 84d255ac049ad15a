//! Human-readable rendering of change sets and conflicts.

use colored::*;
use docmerge_core::{Change, ChangeSet, Conflict};
use serde_json::Value;

pub fn render_changes(changes: &ChangeSet) -> String {
    if changes.is_empty() {
        return "No changes".dimmed().to_string();
    }
    changes
        .iter()
        .map(render_change)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_change(change: &Change) -> String {
    match change {
        Change::Create { path, new_value } => {
            format!("{} {}: {}", "+".green().bold(), path, compact(new_value).green())
        }
        Change::Update {
            path,
            old_value,
            new_value,
        } => format!(
            "{} {}: {} -> {}",
            "~".yellow().bold(),
            path,
            compact(old_value).red(),
            compact(new_value).green()
        ),
        Change::Delete { path, old_value } => {
            format!("{} {}: {}", "-".red().bold(), path, compact(old_value).red())
        }
    }
}

pub fn render_conflicts(conflicts: &[Conflict]) -> String {
    let mut out = format!(
        "{}",
        format!("{} conflict(s) need resolution", conflicts.len())
            .bold()
            .yellow()
    );
    for (i, conflict) in conflicts.iter().enumerate() {
        out.push_str(&format!(
            "\n[{}] {}\n    local:  {}\n    remote: {}",
            i,
            conflict.path.to_string().bold(),
            render_change(&conflict.local_change),
            render_change(&conflict.remote_change)
        ));
    }
    out
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmerge_core::{generate_diff, three_way};
    use serde_json::json;

    #[test]
    fn test_render_changes_plain() {
        colored::control::set_override(false);
        let changes = generate_diff(
            &json!({"a": 1, "b": [1], "c": true}),
            &json!({"a": 2, "c": true, "d": "x"}),
        );
        assert_eq!(
            render_changes(&changes),
            "~ a: 1 -> 2\n- b: [1]\n+ d: \"x\""
        );
        assert_eq!(render_changes(&ChangeSet::new()), "No changes");
    }

    #[test]
    fn test_render_conflicts_plain() {
        colored::control::set_override(false);
        let result = three_way(
            &json!({"tasks": [{"id": "1", "status": "Open"}]}),
            &json!({"tasks": [{"id": "1", "status": "Done"}]}),
            &json!({"tasks": [{"id": "1", "status": "Blocked"}]}),
        );
        let rendered = render_conflicts(&result.conflicts);
        assert_eq!(
            rendered,
            "1 conflict(s) need resolution\n\
             [0] tasks[id=1].status\n    \
             local:  ~ tasks[id=1].status: \"Open\" -> \"Done\"\n    \
             remote: ~ tasks[id=1].status: \"Open\" -> \"Blocked\""
        );
    }
}
