//! Command-line front-end for dbsetup.
//!
//! The binary in `main.rs` only loads `.env`, parses arguments, sets up
//! logging and exits with the [`RunStatus`] code; command handling lives
//! here so it can be tested without spawning a process.

pub mod output;

use clap::{Args, Parser, Subcommand};
use dbsetup_core::{
    ConnectionParams, DbSetupError, Framework, Pipeline, Result, RuleSet, RuleSetSpec, RunStatus,
    SqlConnection, resolve_connection,
};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "dbsetup")]
#[command(about = "Run the SQL migrations of a FiveM server for its framework")]
#[command(version)]
#[command(long_about = "
dbsetup - FiveM database setup

Finds every .sql file of a FiveM server, keeps the ones that belong to the
selected framework and runs each of them in its own transaction.

CONNECTION:
  --database-url or DATABASE_URL (also read from .env), otherwise the
  `set mysql_connection_string` line of the nearest server.cfg.

FRAMEWORKS:
  qbcore, qbx, ox, esx, other (run every file not blacklisted)

EXIT CODES:
  0  all files succeeded, or nothing to run
  1  configuration or connection failure, nothing executed
  2  some files failed

EXAMPLES:
  dbsetup run --framework qbcore --root /srv/fivem
  dbsetup plan --framework esx --root ./resources
  dbsetup rules > rules.json
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute the SQL files selected for a framework
    Run(RunArgs),
    /// Show which files would run, without touching the database
    Plan(PlanArgs),
    /// Print the built-in framework rules as JSON
    Rules,
}

/// Arguments of `dbsetup run`
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Target framework; prompted for when omitted on an interactive terminal
    #[arg(short, long, value_parser = parse_target)]
    pub framework: Option<Framework>,

    /// Directory to start the search from
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Database connection string
    #[arg(
        long,
        env = "DATABASE_URL",
        hide_env_values = true,
        help = "mysql:// URI or user=...;database=... string (credentials are never logged)"
    )]
    pub database_url: Option<String>,

    /// JSON rule file replacing the built-in rules
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Write a JSON report of the run
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

/// Arguments of `dbsetup plan`
#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Target framework
    #[arg(short, long, value_parser = parse_target)]
    pub framework: Framework,

    /// Directory to scan for SQL files
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// JSON rule file replacing the built-in rules
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,
}

/// Flags shared by every command
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all log output except errors")]
    pub quiet: bool,
}

/// Parses a run target. `unknown` is a classifier result, not a target.
///
/// # Errors
/// Returns a message listing the accepted names.
pub fn parse_target(value: &str) -> std::result::Result<Framework, String> {
    match value.parse::<Framework>() {
        Ok(framework) if Framework::TARGETS.contains(&framework) => Ok(framework),
        Ok(_) => Err("expected one of: qbcore, qbx, ox, esx, other".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Executes the parsed command and reports how the run ended.
///
/// Errors are printed here; the caller only maps the status to an exit
/// code.
pub async fn execute_cli(cli: &Cli) -> RunStatus {
    let result = match &cli.command {
        Command::Run(args) => run(args).await,
        Command::Plan(args) => plan(args),
        Command::Rules => print_rules(),
    };

    match result {
        Ok(status) => {
            info!("Finished: {}", status);
            status
        }
        // Errors only escape before any file has been executed.
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            RunStatus::SetupFailed
        }
    }
}

async fn run(args: &RunArgs) -> Result<RunStatus> {
    let target = match args.framework {
        Some(framework) => framework,
        None => prompt_for_target()?,
    };
    let pipeline = Pipeline::new(load_rules(args.rules.as_deref())?);

    let resolved = resolve_connection(args.database_url.as_deref(), &args.root)?;
    println!("Database: {} (from {})", resolved.params, resolved.source);
    println!("Scanning: {}", resolved.scan_root.display());

    let plan = pipeline.plan(&resolved.scan_root, target)?;
    if plan.included_count() == 0 {
        println!("No SQL files to execute for {}", target.label());
        return Ok(RunStatus::NothingToRun);
    }
    println!(
        "Executing {} SQL files for {}",
        plan.included_count(),
        target.label()
    );

    let mut session = open_session(&resolved.params).await?;
    let summary = pipeline
        .run(session.as_mut(), &plan, output::print_progress)
        .await;

    if let Err(e) = output::write_summary(&summary, &mut io::stdout().lock()) {
        warn!("Could not print summary: {}", e);
    }
    if let Some(path) = &args.report {
        match output::write_report(&summary, path).await {
            Ok(()) => println!("Report written to {}", path.display()),
            Err(e) => error!("{:#}", e),
        }
    }

    Ok(summary.status())
}

fn plan(args: &PlanArgs) -> Result<RunStatus> {
    let pipeline = Pipeline::new(load_rules(args.rules.as_deref())?);
    let plan = pipeline.plan(&args.root, args.framework)?;

    output::write_plan(&plan, &mut io::stdout().lock())
        .map_err(|e| DbSetupError::io("Failed to print plan", e))?;

    Ok(if plan.included_count() == 0 {
        RunStatus::NothingToRun
    } else {
        RunStatus::Succeeded
    })
}

fn print_rules() -> Result<RunStatus> {
    println!("{}", RuleSetSpec::builtin().to_json()?);
    Ok(RunStatus::Succeeded)
}

/// Compiles the rules from `path`, or the built-in rules.
///
/// # Errors
/// Returns an error if the file cannot be read or does not compile.
pub fn load_rules(path: Option<&Path>) -> Result<Arc<RuleSet>> {
    let spec = match path {
        Some(path) => {
            info!("Loading rules from {}", path.display());
            RuleSetSpec::from_json_file(path)?
        }
        None => RuleSetSpec::builtin(),
    };
    Ok(Arc::new(RuleSet::compile(&spec)?))
}

#[cfg(feature = "mysql")]
async fn open_session(params: &ConnectionParams) -> Result<Box<dyn SqlConnection>> {
    let session = dbsetup_core::MySqlSession::connect(params).await?;
    Ok(Box::new(session))
}

#[cfg(not(feature = "mysql"))]
async fn open_session(_params: &ConnectionParams) -> Result<Box<dyn SqlConnection>> {
    Err(DbSetupError::configuration(
        "MySQL support not available. Compile with --features mysql",
    ))
}

fn prompt_for_target() -> Result<Framework> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Err(DbSetupError::configuration(
            "--framework is required when stdin is not a terminal",
        ));
    }
    prompt_framework(&mut stdin.lock(), &mut io::stdout())
}

/// Shows the numbered framework menu and reads choices until one is valid.
///
/// # Errors
/// Returns a configuration error if input ends before a valid choice.
pub fn prompt_framework(input: &mut impl BufRead, out: &mut impl Write) -> Result<Framework> {
    let io_error = |e| DbSetupError::io("Failed to read framework choice", e);

    writeln!(out, "Select your FiveM framework:").map_err(io_error)?;
    for (number, framework) in (1..).zip(Framework::TARGETS) {
        writeln!(out, "  {}. {}", number, framework.label()).map_err(io_error)?;
    }

    let mut line = String::new();
    loop {
        write!(out, "Enter the number for your framework: ").map_err(io_error)?;
        out.flush().map_err(io_error)?;

        line.clear();
        if input.read_line(&mut line).map_err(io_error)? == 0 {
            return Err(DbSetupError::configuration("No framework selected"));
        }

        let choice = line
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|number| number.checked_sub(1))
            .and_then(|index| Framework::TARGETS.get(index).copied());
        match choice {
            Some(framework) => return Ok(framework),
            None => {
                writeln!(out, "Invalid choice. Please enter a valid number.").map_err(io_error)?;
            }
        }
    }
}
