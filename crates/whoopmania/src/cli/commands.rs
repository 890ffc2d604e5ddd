//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

/// Event commands.
#[derive(Debug, Subcommand)]
pub enum EventCommand {
    /// Create an event
    Create {
        /// Event name
        #[arg(short, long)]
        name: String,

        /// Event date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,

        /// Venue
        #[arg(short, long)]
        location: Option<String>,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,

        /// Event type: race or training (anything else means race)
        #[arg(short = 't', long = "type", default_value = "race")]
        event_type: String,
    },

    /// List events, newest first
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Show an event with its qualification and bracket
    Show {
        /// Event id
        id: i64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Change an event's name, venue or description
    Edit {
        /// Event id
        id: i64,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New venue
        #[arg(short, long)]
        location: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,
    },
}

/// Pilot commands.
#[derive(Debug, Subcommand)]
pub enum PilotCommand {
    /// List pilots by nickname
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Show a pilot and the events they took part in
    Show {
        /// Pilot id
        id: i64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Qualification commands.
#[derive(Debug, Subcommand)]
pub enum QualCommand {
    /// Import qualification from a RotorHazard export
    Import(ImportArgs),
}

/// Bracket commands.
#[derive(Debug, Subcommand)]
pub enum BracketCommand {
    /// Create the 14 races of an event's bracket
    Create {
        /// Event id
        event_id: i64,
    },

    /// Score a RotorHazard export into an event's bracket
    Import(ImportArgs),

    /// Show an event's bracket with results
    Show {
        /// Event id
        event_id: i64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Arguments shared by the import commands.
#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Event id
    pub event_id: i64,

    /// Path to the RotorHazard results JSON
    pub file: PathBuf,
}

/// Score command arguments.
#[derive(Debug, Args)]
pub struct ScoreCommand {
    /// Path to the RotorHazard results JSON
    pub file: PathBuf,

    /// Only show this bracket race
    #[arg(long, value_name = "N")]
    pub heat: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_output_format_value_names() {
        let names: Vec<String> = OutputFormat::value_variants()
            .iter()
            .filter_map(|v| v.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["plain", "table", "json"]);
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }

    #[test]
    fn test_import_args_debug() {
        let args = ImportArgs {
            event_id: 3,
            file: PathBuf::from("results.json"),
        };
        let debug_str = format!("{args:?}");
        assert!(debug_str.contains("event_id: 3"));
        assert!(debug_str.contains("results.json"));
    }
}
