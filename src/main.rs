use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use git_hydro::HydroContext;

mod cli;
mod ui;

use cli::{orchestration, CommitsArgs, RunArgs};

#[derive(clap::Parser)]
#[command(
    name = "git-hydro",
    version,
    about = "Per-project versioning and release steps for monorepos"
)]
struct Args {
    #[arg(short, long, global = true, help = "Path inside the repository")]
    path: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Parallel commit computations")]
    jobs: Option<usize>,

    #[arg(short, long, global = true, help = "Enable debug logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the repository state and the project tree
    Check,
    /// Show current and next versions
    Versions,
    /// List projects changed since their latest release
    Changed,
    /// List the commits of one project
    Commits {
        /// Path, key or name of the project
        project: String,

        #[arg(long, help = "Start after this revision instead of the release tag")]
        since: Option<String>,

        #[arg(long, help = "Print commits as JSON")]
        json: bool,
    },
    /// Run a release step on changed projects
    Run {
        step: String,

        #[arg(short, long, help = "Run on every project, changed or not")]
        force: bool,
    },
    /// Write the next version of changed projects
    Bump {
        #[arg(long, help = "Preview without writing")]
        dry_run: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn execute(args: Args) -> Result<usize> {
    let path = args.path.unwrap_or_else(|| PathBuf::from("."));
    let mut context = HydroContext::open(&path, args.config.as_deref())
        .with_context(|| format!("Cannot open repository at {}", path.display()))?;
    if let Some(jobs) = args.jobs {
        context = context.with_jobs(jobs);
    }

    match args.command {
        Command::Check => orchestration::check(&context),
        Command::Versions => orchestration::versions(&context),
        Command::Changed => orchestration::changed(&context),
        Command::Commits {
            project,
            since,
            json,
        } => orchestration::commits(
            &context,
            &CommitsArgs {
                project,
                since,
                json,
            },
        ),
        Command::Run { step, force } => orchestration::run(&context, &RunArgs { step, force }),
        Command::Bump { dry_run } => orchestration::bump(&context, dry_run),
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    match execute(args) {
        Ok(0) => {}
        Ok(failures) => {
            ui::display_error(&format!("{} failure(s) reported", failures));
            process::exit(1);
        }
        Err(e) => {
            ui::display_error(&format!("{:#}", e));
            process::exit(1);
        }
    }
}
