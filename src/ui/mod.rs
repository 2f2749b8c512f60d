//! User interface module - styled terminal output.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - Styling and printing

use console::style;

use git_hydro::plugins::{Outcome, ProcessorReport};
use git_hydro::project::TreeEntry;
use git_hydro::NodeError;

pub mod formatter;

pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

pub fn display_warning(message: &str) {
    eprintln!("{} {}", style("WARNING:").yellow(), message);
}

pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

pub fn display_heading(message: &str) {
    println!("{}", style(message).bold());
}

/// Print the project tree, `detail` giving the text of each row
pub fn display_tree(entries: &[TreeEntry], detail: impl Fn(usize, &TreeEntry) -> String) {
    let width = formatter::label_width(entries);
    for (index, entry) in entries.iter().enumerate() {
        let line = formatter::render_tree_line(entry, width, &detail(index, entry));
        if entry.skip {
            println!("{}", style(line).dim());
        } else {
            println!("{}", line);
        }
    }
}

pub fn display_node_errors(errors: &[NodeError]) {
    for error in errors {
        display_error(&error.to_string());
    }
}

pub fn display_report(project: &str, report: &ProcessorReport) {
    let line = formatter::render_report(project, report);
    match report.outcome {
        Outcome::Success => display_success(&line),
        Outcome::Neutral => display_status(&line),
        Outcome::Error => display_error(&line),
    }
}
