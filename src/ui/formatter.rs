//! Pure formatting functions for UI output.
//!
//! Everything here returns plain strings so it can be tested; styling and
//! printing happen in the parent module.

use git_hydro::domain::CommitRecord;
use git_hydro::git::RepositoryInfo;
use git_hydro::plugins::ProcessorReport;
use git_hydro::project::TreeEntry;

/// Tree branch drawn before a project name, one `--` per extra level
pub fn tree_prefix(level: usize) -> String {
    format!(" |--{}", "--".repeat(level.saturating_sub(1)))
}

fn tree_label(entry: &TreeEntry) -> String {
    format!("{} {}", tree_prefix(entry.level), entry.display_name)
}

/// Width of the widest tree label, used to align the detail column
pub fn label_width(entries: &[TreeEntry]) -> usize {
    entries
        .iter()
        .map(|entry| tree_label(entry).chars().count())
        .max()
        .unwrap_or(0)
}

/// One line of the project tree with an aligned detail column
pub fn render_tree_line(entry: &TreeEntry, width: usize, detail: &str) -> String {
    let line = format!("{:<width$}  {}", tree_label(entry), detail, width = width);
    line.trim_end().to_string()
}

/// `current`, or `current -> next` when the version changes
pub fn render_version_detail(current: &str, next: &str) -> String {
    if current == next {
        current.to_string()
    } else {
        format!("{} -> {}", current, next)
    }
}

pub fn render_repository(info: &RepositoryInfo) -> String {
    let mut line = format!(
        "{} ({} @ {})",
        info.path.display(),
        info.branch,
        info.short
    );
    if info.is_dirty {
        line.push_str(" [dirty]");
    }
    if !info.tags.is_empty() {
        line.push_str(&format!(" tags: {}", info.tags.join(", ")));
    }
    line
}

pub fn render_project_count(entries: &[TreeEntry]) -> String {
    let skipped = entries.iter().filter(|entry| entry.skip).count();
    match skipped {
        0 => format!("{} projects", entries.len()),
        n => format!("{} projects ({} skipped)", entries.len(), n),
    }
}

pub fn render_commit_line(commit: &CommitRecord) -> String {
    format!(
        "{} {} ({})",
        commit.short_id, commit.subject, commit.author.name
    )
}

pub fn render_report(project: &str, report: &ProcessorReport) -> String {
    let mut line = format!("{} [{}]", project, report.processor);
    if !report.report.is_empty() {
        line.push_str(": ");
        line.push_str(&report.report);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_hydro::plugins::Outcome;
    use std::path::PathBuf;

    fn entry(name: &str, level: usize, skip: bool) -> TreeEntry {
        TreeEntry {
            identifier: name.to_string(),
            path: name.to_string(),
            display_name: name.to_string(),
            description: None,
            level,
            skip,
        }
    }

    #[test]
    fn test_tree_prefix() {
        assert_eq!(tree_prefix(1), " |--");
        assert_eq!(tree_prefix(2), " |----");
        assert_eq!(tree_prefix(3), " |------");
    }

    #[test]
    fn test_tree_lines_align() {
        let entries = vec![entry("api", 1, false), entry("client", 2, false)];
        let width = label_width(&entries);
        assert_eq!(width, " |---- client".len());

        assert_eq!(
            render_tree_line(&entries[0], width, "1.0.0"),
            " |-- api       1.0.0"
        );
        assert_eq!(
            render_tree_line(&entries[1], width, "0.1.0 -> 0.2.0"),
            " |---- client  0.1.0 -> 0.2.0"
        );
        assert_eq!(render_tree_line(&entries[0], width, ""), " |-- api");
    }

    #[test]
    fn test_version_detail() {
        assert_eq!(render_version_detail("1.0.0", "1.0.0"), "1.0.0");
        assert_eq!(render_version_detail("1.0.0", "2.0.0"), "1.0.0 -> 2.0.0");
    }

    #[test]
    fn test_repository_line() {
        let info = RepositoryInfo {
            path: PathBuf::from("/work/mono"),
            branch: "main".to_string(),
            commit: "a".repeat(40),
            short: "aaaaaaa".to_string(),
            tags: vec!["api/1.0.0".to_string()],
            is_dirty: true,
        };
        assert_eq!(
            render_repository(&info),
            "/work/mono (main @ aaaaaaa) [dirty] tags: api/1.0.0"
        );
    }

    #[test]
    fn test_project_count() {
        assert_eq!(render_project_count(&[entry("a", 1, false)]), "1 projects");
        assert_eq!(
            render_project_count(&[entry("a", 1, false), entry("b", 1, true)]),
            "2 projects (1 skipped)"
        );
    }

    #[test]
    fn test_report_line() {
        let report = ProcessorReport {
            processor: "changelog".to_string(),
            outcome: Outcome::Success,
            report: "Added 1.1.0".to_string(),
        };
        assert_eq!(render_report("api", &report), "api [changelog]: Added 1.1.0");
    }
}
