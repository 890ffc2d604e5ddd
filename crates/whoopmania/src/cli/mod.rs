//! Command-line interface for whoopmania.
//!
//! This module provides the CLI structure and command handlers for the
//! `whoopmania` binary.

mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    BracketCommand, ConfigCommand, EventCommand, ImportArgs, OutputFormat, PilotCommand,
    QualCommand, ScoreCommand,
};

/// whoopmania - Tiny-whoop race results
///
/// Keeps events, pilots, qualification tables and the 14-race
/// double-elimination bracket, scored from RotorHazard exports.
#[derive(Debug, Parser)]
#[command(name = "whoopmania")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage events
    #[command(subcommand)]
    Event(EventCommand),

    /// Browse pilots
    #[command(subcommand)]
    Pilot(PilotCommand),

    /// Import qualification results
    #[command(subcommand)]
    Qual(QualCommand),

    /// Manage the elimination bracket
    #[command(subcommand)]
    Bracket(BracketCommand),

    /// Score an export without saving anything
    Score(ScoreCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
