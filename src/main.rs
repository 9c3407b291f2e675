//! Ticketflow CLI Entry Point
//!
//! Runs the `build-slides` workflow against a disk state store and
//! inspects or deletes stored runs by claim ticket.
//!
//! # Usage
//!
//! ```bash
//! # Build a slide deck for a set list
//! ticketflow run sunday-morning --output deck.xml
//!
//! # Reuse a known claim ticket
//! ticketflow run sunday-morning --ticket T1
//!
//! # Poll a run
//! ticketflow status T1
//!
//! # Delete a run's state
//! ticketflow delete build-slides T1
//!
//! # Use a configuration file
//! ticketflow --config ticketflow.yaml run evening
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use colored::Colorize;
use log::{error, info};

use ticketflow::config::{load_config, EngineConfig};
use ticketflow::slides::{self, build_slides_pipeline, BuildSlidesContext, MemoryCatalog};
use ticketflow::store::{DiskBlobStore, StateStore};
use ticketflow::workflow::{FinalContent, WorkflowContext, WorkflowRegistry, WorkflowStatus};
use ticketflow::{APP_NAME, VERSION};

/// Subcommand requested on the command line.
#[derive(Debug, PartialEq)]
enum Command {
    Run {
        set_list: String,
        ticket: Option<String>,
        output: Option<PathBuf>,
    },
    Status {
        ticket: String,
    },
    Delete {
        workflow: String,
        ticket: String,
    },
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Cli {
    command: Command,
    config_path: Option<PathBuf>,
    state_dir: Option<PathBuf>,
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Checkpointing Workflow Engine");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: ticketflow [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  run <SET_LIST>               Build a slide deck for a set list");
    println!("      --ticket T               Use T as the claim ticket");
    println!("      --output FILE            Write the deck to FILE");
    println!("  status <TICKET>              Show the status of a run");
    println!("  delete <WORKFLOW> <TICKET>   Delete the stored state of a run");
    println!();
    println!("Options:");
    println!("  --config PATH       Load engine configuration from a YAML file");
    println!("  --state-dir PATH    Directory of stored run state");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  ticketflow run sunday-morning --output deck.xml");
    println!("  ticketflow status 0b7e6c1e-2f7d-4c36-9d0f-52c5c1f1b6b4");
    println!("  ticketflow delete build-slides 0b7e6c1e-2f7d-4c36-9d0f-52c5c1f1b6b4");
}

/// Returns the value following option `name`.
fn option_value(args: &[String], i: &mut usize, name: &str) -> Result<String, String> {
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| format!("{} requires an argument", name))
}

/// Parses command-line arguments into a Cli struct.
fn parse_arguments(args: &[String]) -> Result<Cli, String> {
    let mut positional: Vec<String> = Vec::new();
    let mut config_path = None;
    let mut state_dir = None;
    let mut ticket = None;
    let mut output = None;
    let mut verbose = false;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            "--config" => {
                config_path = Some(PathBuf::from(option_value(args, &mut i, "--config")?));
            }
            "--state-dir" => {
                state_dir = Some(PathBuf::from(option_value(args, &mut i, "--state-dir")?));
            }
            "--ticket" => {
                ticket = Some(option_value(args, &mut i, "--ticket")?);
            }
            "--output" => {
                output = Some(PathBuf::from(option_value(args, &mut i, "--output")?));
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => positional.push(arg.clone()),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        Some("run") => Command::Run {
            set_list: positional.next().ok_or("run requires a set list name")?,
            ticket: ticket.take(),
            output: output.take(),
        },
        Some("status") => Command::Status {
            ticket: positional.next().ok_or("status requires a claim ticket")?,
        },
        Some("delete") => Command::Delete {
            workflow: positional.next().ok_or("delete requires a workflow name")?,
            ticket: positional.next().ok_or("delete requires a claim ticket")?,
        },
        Some(other) => return Err(format!("Unknown command: {}", other)),
        None => return Err("No command given".to_string()),
    };

    if let Some(extra) = positional.next() {
        return Err(format!("Unexpected argument: {}", extra));
    }
    if ticket.is_some() || output.is_some() {
        return Err("--ticket and --output only apply to 'run'".to_string());
    }

    Ok(Cli {
        command,
        config_path,
        state_dir,
        verbose,
    })
}

/// Builds the registry with every known workflow.
fn build_registry(config: &EngineConfig) -> Result<WorkflowRegistry, Box<dyn std::error::Error>> {
    info!("State directory: {}", config.state_dir.display());
    let store = StateStore::new(Arc::new(DiskBlobStore::new(&config.state_dir)));

    let catalog = match &config.catalog {
        Some(path) => MemoryCatalog::load(path)?,
        None => {
            info!("No catalog configured - using the sample catalog");
            MemoryCatalog::sample()?
        }
    };
    let catalog = Arc::new(catalog);

    let mut registry = WorkflowRegistry::new(store.clone());
    registry.register(
        slides::WORKFLOW_NAME,
        build_slides_pipeline(
            store,
            catalog.clone(),
            catalog,
            config.slide_show.clone(),
            config.failure_checkpoint,
        ),
    );
    registry.with_aliases(&config.aliases);

    Ok(registry)
}

fn format_status(status: Option<WorkflowStatus>) -> String {
    match status {
        Some(WorkflowStatus::Completed) => "COMPLETED".green().bold().to_string(),
        Some(WorkflowStatus::Running) => "RUNNING".yellow().bold().to_string(),
        Some(WorkflowStatus::Failed) => "FAILED".red().bold().to_string(),
        None => "NEW".dimmed().to_string(),
    }
}

/// Main application entry point.
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let cli = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(cli.verbose);
    print_banner();

    let mut config = match &cli.config_path {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = cli.state_dir {
        config.state_dir = dir;
    }

    let registry = build_registry(&config)?;

    match cli.command {
        Command::Run {
            set_list,
            ticket,
            output,
        } => {
            let initial = match ticket {
                Some(ticket) => BuildSlidesContext::with_claim_ticket(ticket, set_list),
                None => BuildSlidesContext::new(set_list),
            };
            let claim_ticket = initial.claim_ticket().to_string();

            let done = registry.run(initial).await.map_err(|e| {
                error!("[{}] {}", e.code(), e);
                e
            })?;

            println!();
            println!("Claim ticket: {}", claim_ticket.bold());
            println!("Status:       {}", format_status(done.status()));
            println!(
                "Content:      {} bytes ({})",
                done.final_content().len(),
                done.final_content_type()
            );

            if let Some(path) = output {
                fs::write(&path, done.final_content())
                    .map_err(|e| format!("Could not write '{}': {}", path.display(), e))?;
                println!("Written to:   {}", path.display());
            }
        }
        Command::Status { ticket } => {
            let claim = registry.status(&ticket).await?;
            println!("{}  {}", claim.claim_ticket, format_status(claim.status));
        }
        Command::Delete { workflow, ticket } => {
            let claim = registry.delete(&workflow, &ticket).await?;
            println!(
                "Deleted {} (was {})",
                claim.claim_ticket,
                format_status(claim.status)
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("ticketflow")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_run() {
        let cli = parse_arguments(&args(&["run", "easter", "--ticket", "T1", "--verbose"])).unwrap();
        assert!(cli.verbose);
        assert_eq!(
            cli.command,
            Command::Run {
                set_list: "easter".to_string(),
                ticket: Some("T1".to_string()),
                output: None,
            }
        );
    }

    #[test]
    fn test_parse_options_before_command() {
        let cli = parse_arguments(&args(&["--state-dir", "/tmp/state", "status", "T1"])).unwrap();
        assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/state")));
        assert_eq!(cli.command, Command::Status { ticket: "T1".to_string() });
    }

    #[test]
    fn test_parse_delete() {
        let cli = parse_arguments(&args(&["delete", "build-slides", "T1"])).unwrap();
        assert_eq!(
            cli.command,
            Command::Delete {
                workflow: "build-slides".to_string(),
                ticket: "T1".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_arguments(&args(&[])).is_err());
        assert!(parse_arguments(&args(&["run"])).is_err());
        assert!(parse_arguments(&args(&["launch", "x"])).is_err());
        assert!(parse_arguments(&args(&["status", "T1", "T2"])).is_err());
        assert!(parse_arguments(&args(&["status", "T1", "--ticket", "T2"])).is_err());
        assert!(parse_arguments(&args(&["run", "x", "--bogus"])).is_err());
        assert!(parse_arguments(&args(&["run", "x", "--output"])).is_err());
    }
}
