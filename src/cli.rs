//! Command-line interface module for sortify.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Root directory validation
//! - Wiring configuration into the sort and undo engines
//! - Choosing between console and JSON output

use crate::config::SortConfig;
use crate::file_category::CategoryTable;
use crate::file_organizer::{FileOrganizer, SortOptions};
use crate::observer::{Event, EventRecorder, Observer};
use crate::output::{ConsoleObserver, OutputFormatter};
use crate::undo::UndoManager;
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Sort the files of a directory into category folders by extension.
///
/// Every real move is recorded so the last sort can be reverted with --undo.
#[derive(Parser, Debug)]
#[command(name = "sortify")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory whose files should be sorted
    #[arg(required_unless_present = "undo")]
    pub directory: Option<PathBuf>,

    /// Preview the moves without touching any file
    #[arg(short = 'n', long, conflicts_with = "undo")]
    pub dry_run: bool,

    /// Also sort files found in subdirectories
    #[arg(short, long, conflicts_with = "undo")]
    pub recursive: bool,

    /// Move every file recorded by previous sorts back where it came from
    #[arg(long)]
    pub undo: bool,

    /// Path to configuration file (TOML format)
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Print events as JSON instead of coloured text
    #[arg(long)]
    pub json: bool,

    /// Verbose diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizeCommand {
    /// Sort the files in a directory.
    Sort {
        directory: PathBuf,
        options: SortOptions,
    },
    /// Undo every recorded sort.
    Undo,
}

impl Cli {
    /// Resolves the parsed flags into a command.
    pub fn command(&self) -> Result<OrganizeCommand> {
        if self.undo {
            return Ok(OrganizeCommand::Undo);
        }

        let Some(directory) = self.directory.clone() else {
            bail!("a directory is required unless --undo is given");
        };

        Ok(OrganizeCommand::Sort {
            directory,
            options: SortOptions {
                preview: self.dry_run,
                recursive: self.recursive,
            },
        })
    }
}

/// Runs the CLI application.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use sortify::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["sortify", "/path/to/directory", "--dry-run"]);
/// if let Err(e) = run_cli(&cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<()> {
    let command = cli.command()?;
    let config = SortConfig::load(cli.config.as_deref()).context("Error loading configuration")?;

    if cli.json {
        let (events, outcome) = record_command(&command, &config);
        println!("{}", serde_json::to_string_pretty(&events)?);
        outcome
    } else {
        if let OrganizeCommand::Sort { directory, options } = &command
            && options.preview
        {
            OutputFormatter::info(&format!("DRY RUN: analyzing {}", directory.display()));
        }
        run_command(&command, &config, &mut ConsoleObserver::new())
    }
}

/// Executes `command` with the given configuration, reporting to `observer`.
pub fn run_command(
    command: &OrganizeCommand,
    config: &SortConfig,
    observer: &mut dyn Observer,
) -> Result<()> {
    match command {
        OrganizeCommand::Sort { directory, options } => {
            validate_directory(directory)?;

            let skip = config
                .skip
                .compile()
                .context("Error compiling skip rules")?;
            let organizer = FileOrganizer::new(
                CategoryTable::default(),
                skip,
                config.storage.restore_ledger(),
                config.storage.audit_log(),
            );

            organizer
                .sort(directory, *options, observer)
                .with_context(|| format!("Sorting {} stopped", directory.display()))?;
        }
        OrganizeCommand::Undo => {
            UndoManager::new(config.storage.restore_ledger())
                .undo(observer)
                .context("Undo failed")?;
        }
    }

    Ok(())
}

/// Runs `command` while recording its events.
///
/// The events are returned even when the command fails part way, so files
/// that were already moved are still reported.
pub fn record_command(command: &OrganizeCommand, config: &SortConfig) -> (Vec<Event>, Result<()>) {
    let mut recorder = EventRecorder::new();
    let outcome = run_command(command, config, &mut recorder);
    (recorder.events, outcome)
}

/// Rejects roots that are missing or not directories.
pub fn validate_directory(directory: &Path) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Not a directory: {}", directory.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_sort_flags() {
        let cli = Cli::parse_from(["sortify", "/data", "-n", "-r"]);
        assert_eq!(
            cli.command().unwrap(),
            OrganizeCommand::Sort {
                directory: PathBuf::from("/data"),
                options: SortOptions {
                    preview: true,
                    recursive: true,
                },
            }
        );
    }

    #[test]
    fn test_parse_undo() {
        let cli = Cli::parse_from(["sortify", "--undo"]);
        assert_eq!(cli.command().unwrap(), OrganizeCommand::Undo);
    }

    #[test]
    fn test_directory_required_without_undo() {
        assert!(Cli::try_parse_from(["sortify"]).is_err());
        assert!(Cli::try_parse_from(["sortify", "--undo", "--dry-run"]).is_err());
    }

    #[test]
    fn test_recorded_events_survive_a_failed_sort() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("root");
        std::fs::create_dir(&root).unwrap();
        // "PDFs" is a plain file, so b.pdf cannot be sorted.
        std::fs::write(root.join("PDFs"), "x").unwrap();
        std::fs::write(root.join("a.txt"), "a").unwrap();
        std::fs::write(root.join("b.pdf"), "b").unwrap();

        let mut config = SortConfig::default();
        config.skip.filenames = vec!["PDFs".to_string()];
        config.storage.restore_ledger = temp_dir.path().join("restore_log.txt");
        config.storage.audit_log = temp_dir.path().join("sort_log.txt");

        let command = OrganizeCommand::Sort {
            directory: root.clone(),
            options: SortOptions::default(),
        };
        let (events, outcome) = record_command(&command, &config);

        assert!(outcome.is_err());
        assert!(events.iter().any(|e| matches!(
            e,
            Event::Moved { file_name, .. } if file_name == "a.txt"
        )));
        assert!(serde_json::to_string_pretty(&events).is_ok());
    }

    #[test]
    fn test_validate_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();

        assert!(validate_directory(temp_dir.path()).is_ok());
        assert!(validate_directory(&file).is_err());
        assert!(validate_directory(&temp_dir.path().join("missing")).is_err());
    }
}
