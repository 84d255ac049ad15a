mod errors;
mod file_store;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use docmerge_core::{
    apply_diff, generate_diff, patches::to_json_patch, reconcile, ChangeSet, MergeSession,
    ReconcileOutcome, Resolution, ResolutionPolicy,
};
use errors::CliResult;
use file_store::{read_json, write_json, FileStore};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status when conflicts are left for the user.
const EXIT_CONFLICTS: u8 = 2;

#[derive(Parser)]
#[command(name = "docmerge")]
#[command(about = "Structural diff and three-way merge for JSON documents", long_about = None)]
struct Cli {
    /// Log filter, e.g. "docmerge_core=debug"
    #[arg(long, env = "DOCMERGE_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the changes that turn BASE into CURRENT
    Diff {
        base: PathBuf,
        current: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Apply a change set (as written by `diff --format json`) to TARGET
    Apply {
        target: PathBuf,
        changes: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the diff of BASE and CURRENT as an RFC 6902 JSON Patch
    Patch { base: PathBuf, current: PathBuf },
    /// Three-way merge LOCAL and REMOTE edits of ANCESTOR
    Merge {
        ancestor: PathBuf,
        local: PathBuf,
        remote: PathBuf,
        /// Settle every conflict in favour of one side
        #[arg(long, env = "DOCMERGE_PREFER", value_enum)]
        prefer: Option<Prefer>,
        /// JSON array with one resolution per conflict
        #[arg(long, conflicts_with = "prefer")]
        resolutions: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Merge LOCAL edits into the REMOTE file and write it back
    Sync {
        ancestor: PathBuf,
        local: PathBuf,
        #[arg(long)]
        remote: PathBuf,
        #[arg(long, env = "DOCMERGE_PREFER", value_enum)]
        prefer: Option<Prefer>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Prefer {
    Local,
    Remote,
}

fn policy(prefer: Option<Prefer>) -> ResolutionPolicy {
    match prefer {
        Some(Prefer::Local) => ResolutionPolicy::PreferLocal,
        Some(Prefer::Remote) => ResolutionPolicy::PreferRemote,
        None => ResolutionPolicy::Manual,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log))
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::Conflicts) => ExitCode::from(EXIT_CONFLICTS),
        Err(e) => {
            tracing::error!(%e, "docmerge failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// How a command finished when it did not fail.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Done,
    /// Conflicts were printed and nothing was written
    Conflicts,
}

fn run(command: Command) -> CliResult<Outcome> {
    match command {
        Command::Diff {
            base,
            current,
            format,
        } => {
            let base: Value = read_json(&base)?;
            let current: Value = read_json(&current)?;
            let changes = generate_diff(&base, &current);
            print_changes(&changes, format)?;
        }
        Command::Apply {
            target,
            changes,
            output,
        } => {
            let target: Value = read_json(&target)?;
            let changes: ChangeSet = read_json(&changes)?;
            let result = apply_diff(&target, &changes)?;
            write_json(output.as_deref(), &result)?;
        }
        Command::Patch { base, current } => {
            let base: Value = read_json(&base)?;
            let current: Value = read_json(&current)?;
            let patch = to_json_patch(&base, &generate_diff(&base, &current))?;
            write_json(None, &patch)?;
        }
        Command::Merge {
            ancestor,
            local,
            remote,
            prefer,
            resolutions,
            output,
            format,
        } => {
            let ancestor: Value = read_json(&ancestor)?;
            let local: Value = read_json(&local)?;
            let remote: Value = read_json(&remote)?;
            let mut session = MergeSession::start(&ancestor, &local, &remote)?;
            tracing::info!(session = %session.id(), state = %session.state(), "Merge started");

            if !session.conflicts().is_empty() {
                let chosen: Option<Vec<Resolution>> = match resolutions {
                    Some(path) => Some(read_json(&path)?),
                    None => policy(prefer).resolutions(session.conflicts()),
                };
                match chosen {
                    Some(chosen) => session.resolve(&chosen)?,
                    None => {
                        print_conflicts(&session, format)?;
                        return Ok(Outcome::Conflicts);
                    }
                }
            }

            let merged = session.apply()?;
            write_json(output.as_deref(), &merged)?;
        }
        Command::Sync {
            ancestor,
            local,
            remote,
            prefer,
        } => {
            let ancestor: Value = read_json(&ancestor)?;
            let local: Value = read_json(&local)?;
            let store = FileStore::new(&remote);
            match reconcile(&store, &ancestor, &local, policy(prefer))? {
                ReconcileOutcome::Saved(_) => {
                    eprintln!("Merged into {}", remote.display());
                }
                ReconcileOutcome::NeedsResolution(session) => {
                    print_conflicts(&session, Format::Text)?;
                    return Ok(Outcome::Conflicts);
                }
            }
        }
    }
    Ok(Outcome::Done)
}

fn print_changes(changes: &ChangeSet, format: Format) -> CliResult<()> {
    match format {
        Format::Text => println!("{}", output::render_changes(changes)),
        Format::Json => write_json(None, changes)?,
    }
    Ok(())
}

fn print_conflicts(session: &MergeSession, format: Format) -> CliResult<()> {
    match format {
        Format::Text => eprintln!("{}", output::render_conflicts(session.conflicts())),
        Format::Json => write_json(None, &session.conflicts())?,
    }
    Ok(())
}
