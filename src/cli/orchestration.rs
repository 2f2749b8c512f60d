//! Command implementations
//!
//! Each command takes the opened [HydroContext] plus its own arguments and
//! returns the number of failures it reported, so `main` can pick the exit
//! status after all output has been rendered.

use anyhow::{anyhow, Context, Result};
use tracing::info;

use git_hydro::git::GitCli;
use git_hydro::plugins::Outcome;
use git_hydro::project::{ProjectNode, ProjectTree};
use git_hydro::{HydroContext, ProjectTreeBuilder};

use crate::ui::{self, formatter};

/// Arguments of `commits`, decoupled from clap
#[derive(Debug, Clone, PartialEq)]
pub struct CommitsArgs {
    pub project: String,
    pub since: Option<String>,
    pub json: bool,
}

/// Arguments of `run`
#[derive(Debug, Clone, PartialEq)]
pub struct RunArgs {
    pub step: String,
    pub force: bool,
}

/// Repository state and the declared project tree
pub fn check(context: &HydroContext) -> Result<usize> {
    match GitCli::new(context.root()).repository_info() {
        Ok(info) => println!("{}", formatter::render_repository(&info)),
        Err(e) => ui::display_warning(&format!("Cannot read repository state: {}", e)),
    }

    let tree = ProjectTreeBuilder::new(context).build()?;
    let listing = tree.listing();
    ui::display_heading(&formatter::render_project_count(&listing));
    ui::display_tree(&listing, |_, entry| {
        entry.description.clone().unwrap_or_default()
    });
    Ok(0)
}

fn version_detail(node: &ProjectNode) -> std::result::Result<String, String> {
    if node.is_skipped() {
        return Ok("skipped".to_string());
    }
    if node.commits().is_none() {
        return Err("commits unavailable".to_string());
    }
    let current = node.current_version().map_err(|e| e.to_string())?;
    let next = node.next_version().map_err(|e| e.to_string())?;
    Ok(formatter::render_version_detail(&current, &next))
}

/// Current version of every project, with the next one where it changes
pub fn versions(context: &HydroContext) -> Result<usize> {
    let report = ProjectTreeBuilder::new(context).load()?;
    let nodes = report.tree.all_projects();
    let details: Vec<_> = nodes.iter().map(|node| version_detail(node)).collect();

    ui::display_tree(&report.tree.listing(), |index, _| match &details[index] {
        Ok(detail) => detail.clone(),
        Err(error) => format!("error: {}", error),
    });
    ui::display_node_errors(&report.errors);

    let failures = details.iter().filter(|d| d.is_err()).count();
    Ok(failures.max(report.errors.len()))
}

/// Paths of the projects changed since their latest release
pub fn changed(context: &HydroContext) -> Result<usize> {
    let report = ProjectTreeBuilder::new(context).load()?;
    for node in report.tree.changed_projects() {
        println!("{}", node.path());
    }
    ui::display_node_errors(&report.errors);
    Ok(report.errors.len())
}

fn find_project<'t>(tree: &'t ProjectTree, query: &str) -> Result<&'t ProjectNode> {
    tree.find(query)
        .ok_or_else(|| anyhow!("Unknown project '{}'", query))
}

/// Commits of one project since its latest release or an explicit revision
pub fn commits(context: &HydroContext, args: &CommitsArgs) -> Result<usize> {
    let tree = ProjectTreeBuilder::new(context).build()?;
    let node = find_project(&tree, &args.project)?;

    let commits = match &args.since {
        Some(since) => node.fetch_commits_since(context.vcs(), Some(since.as_str())),
        None => node.fetch_commits(context.vcs()),
    }
    .with_context(|| format!("Failed to read commits of '{}'", node.display_name()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&commits)?);
    } else {
        for commit in &commits {
            println!("{}", formatter::render_commit_line(commit));
        }
    }
    Ok(0)
}

/// Run a release step on changed projects, or all computed ones with `force`
pub fn run(context: &HydroContext, args: &RunArgs) -> Result<usize> {
    let report = ProjectTreeBuilder::new(context).load()?;
    ui::display_node_errors(&report.errors);

    let targets: Vec<&ProjectNode> = if args.force {
        report
            .tree
            .all_projects()
            .into_iter()
            .filter(|node| node.commits().is_some())
            .collect()
    } else {
        report.tree.changed_projects()
    };

    let mut failures = report.errors.len();
    let mut executed = 0;
    for node in targets {
        info!(project = %node.path(), step = %args.step, "Running step");
        match node.run_step(&args.step) {
            Ok(reports) => {
                for processor_report in &reports {
                    ui::display_report(node.display_name(), processor_report);
                    if processor_report.outcome == Outcome::Error {
                        failures += 1;
                    }
                }
                executed += reports.len();
            }
            Err(e) => {
                ui::display_error(&format!("{}: {}", node.display_name(), e));
                failures += 1;
            }
        }
    }

    if executed == 0 && failures == 0 {
        ui::display_status(&format!("No project ran step '{}'", args.step));
    }
    Ok(failures)
}

/// Write the next version of every changed project
pub fn bump(context: &HydroContext, dry_run: bool) -> Result<usize> {
    let report = ProjectTreeBuilder::new(context).load()?;
    ui::display_node_errors(&report.errors);

    let mut failures = report.errors.len();
    for node in report.tree.changed_projects() {
        let versions = node
            .current_version()
            .and_then(|current| Ok((current, node.next_version()?)));
        let (current, next) = match versions {
            Ok(versions) => versions,
            Err(e) => {
                ui::display_error(&format!("{}: {}", node.display_name(), e));
                failures += 1;
                continue;
            }
        };

        let line = format!(
            "{} {}",
            node.display_name(),
            formatter::render_version_detail(&current, &next)
        );
        if dry_run || current == next {
            ui::display_status(&line);
            continue;
        }
        match node.write_version(&next) {
            Ok(()) => ui::display_success(&line),
            Err(e) => {
                ui::display_error(&format!("{}: {}", node.display_name(), e));
                failures += 1;
            }
        }
    }
    Ok(failures)
}
