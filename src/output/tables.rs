use buildlens::{BuildRecord, BuildStatus};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn status_cell(status: BuildStatus) -> Cell {
    let cell = Cell::new(status);
    match status {
        BuildStatus::Success => cell.fg(TableColor::Green),
        BuildStatus::Failure => cell.fg(TableColor::Red),
        BuildStatus::Running => cell.fg(TableColor::Cyan),
        BuildStatus::Aborted => cell.fg(TableColor::Yellow),
        BuildStatus::Unknown => cell,
    }
}

fn duration_text(millis: u64) -> String {
    let seconds = millis / 1000;
    if seconds >= 60 {
        format!("{}m{:02}s", seconds / 60, seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

/// One row per build: revisions as `branch@sha`, artifacts as `name:tag`.
pub fn builds_table(records: &[BuildRecord]) -> Table {
    let mut table = create_table();
    table.set_header(vec![
        "Build", "Status", "Started", "Duration", "Revisions", "Artifacts",
    ]);

    for record in records {
        let started = record
            .timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let revisions = record
            .git_revisions
            .iter()
            .map(|r| format!("{}@{}", r.branch, r.sha1.chars().take(10).collect::<String>()))
            .collect::<Vec<_>>()
            .join("\n");
        let artifacts = record
            .artifacts
            .iter()
            .map(|a| format!("{}:{}", a.name, a.version))
            .collect::<Vec<_>>()
            .join("\n");

        table.add_row(vec![
            Cell::new(&record.id),
            status_cell(record.status),
            Cell::new(started),
            Cell::new(duration_text(record.duration)),
            Cell::new(revisions),
            Cell::new(artifacts),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_text() {
        assert_eq!(duration_text(37_527), "37s");
        assert_eq!(duration_text(125_000), "2m05s");
        assert_eq!(duration_text(0), "0s");
    }

    #[test]
    fn test_builds_table_lists_every_build() {
        let record = BuildRecord {
            id: "some-project-4".into(),
            name: "some-project".into(),
            number: 4,
            status: BuildStatus::Success,
            timestamp: None,
            duration: 37_527,
            url: "some-url".into(),
            properties: Default::default(),
            git_revisions: vec![buildlens::GitRevision::new(
                "refs/remotes/origin/main",
                "0123456789abcdef",
                "github.com/test/repo.git",
            )],
            artifacts: vec![],
        };

        let rendered = builds_table(&[record]).to_string();
        assert!(rendered.contains("some-project-4"));
        assert!(rendered.contains("main@0123456789"));
        assert!(rendered.contains("37s"));
    }
}
