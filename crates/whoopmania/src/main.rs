//! `whoopmania` - CLI for whoopmania
//!
//! This binary manages events, pilots and brackets, and imports RotorHazard
//! exports into them.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use whoopmania::cli::output::{self, RaceWithResults};
use whoopmania::cli::{
    BracketCommand, Cli, Command, ConfigCommand, EventCommand, PilotCommand, QualCommand,
    ScoreCommand,
};
use whoopmania::model::{EventType, EventUpdate, NewEvent};
use whoopmania::{export, import, init_logging, Config, Error, Storage};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Config commands work on a broken configuration too
    if let Command::Config(config_cmd) = cli.command {
        return handle_config(cli.config, config_cmd);
    }

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Event(cmd) => handle_event(&config, cmd),
        Command::Pilot(cmd) => handle_pilot(&config, &cmd),
        Command::Qual(cmd) => handle_qual(&config, &cmd),
        Command::Bracket(cmd) => handle_bracket(&config, &cmd),
        Command::Score(cmd) => handle_score(&config, &cmd),
        // Handled before loading the configuration
        Command::Config(_) => Ok(()),
    }
}

fn open_storage(config: &Config) -> Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("failed to open database at {}", path.display()))
}

fn read_export(path: &Path) -> Result<String> {
    export::read_export(path).with_context(|| format!("failed to read {}", path.display()))
}

fn handle_event(config: &Config, cmd: EventCommand) -> Result<()> {
    let storage = open_storage(config)?;

    match cmd {
        EventCommand::Create {
            name,
            date,
            location,
            description,
            event_type,
        } => {
            let event = storage.create_event(&NewEvent {
                name,
                event_type: EventType::parse_or_race(&event_type),
                date,
                location,
                description,
            })?;
            println!("Created event #{} {} on {}", event.id, event.name, event.date);
        }
        EventCommand::List { format } => {
            println!("{}", output::events(&storage.list_events()?, format)?);
        }
        EventCommand::Show { id, format } => {
            let event = storage.require_event(id)?;
            let qualification = storage.qualification(id)?;
            let bracket = load_bracket(&storage, id)?;
            println!(
                "{}",
                output::event_detail(&event, &qualification, &bracket, format)?
            );
        }
        EventCommand::Edit {
            id,
            name,
            location,
            description,
        } => {
            let event = storage.update_event(
                id,
                &EventUpdate {
                    name,
                    location,
                    description,
                },
            )?;
            println!("Updated event #{} {}", event.id, event.name);
        }
    }
    Ok(())
}

fn handle_pilot(config: &Config, cmd: &PilotCommand) -> Result<()> {
    let storage = open_storage(config)?;

    match cmd {
        PilotCommand::List { format } => {
            println!("{}", output::pilots(&storage.list_pilots()?, *format)?);
        }
        PilotCommand::Show { id, format } => {
            let pilot = storage
                .get_pilot(*id)?
                .ok_or(Error::PilotNotFound { id: *id })?;
            let participations = storage.pilot_participations(*id)?;
            println!("{}", output::pilot_detail(&pilot, &participations, *format)?);
        }
    }
    Ok(())
}

fn handle_qual(config: &Config, cmd: &QualCommand) -> Result<()> {
    let QualCommand::Import(args) = cmd;
    let json = read_export(&args.file)?;
    let storage = open_storage(config)?;

    let count = import::import_qualification(&storage, args.event_id, &json, &config.import)
        .with_context(|| format!("failed to import {}", args.file.display()))?;
    println!("Imported {count} qualification results into event #{}", args.event_id);
    Ok(())
}

fn handle_bracket(config: &Config, cmd: &BracketCommand) -> Result<()> {
    let storage = open_storage(config)?;

    match cmd {
        BracketCommand::Create { event_id } => {
            if storage.create_bracket(*event_id)? {
                println!("Created bracket for event #{event_id}");
            } else {
                println!("Event #{event_id} already has a bracket");
            }
        }
        BracketCommand::Import(args) => {
            let json = read_export(&args.file)?;
            let summary = import::import_bracket(&storage, args.event_id, &json, &config.import)
                .with_context(|| format!("failed to import {}", args.file.display()))?;
            println!(
                "Scored {} heats ({} skipped), {} results written",
                summary.heats_scored, summary.heats_skipped, summary.results_written
            );
        }
        BracketCommand::Show { event_id, format } => {
            storage.require_event(*event_id)?;
            let bracket = load_bracket(&storage, *event_id)?;
            println!("{}", output::bracket(&bracket, *format)?);
        }
    }
    Ok(())
}

fn load_bracket(storage: &Storage, event_id: i64) -> Result<Vec<RaceWithResults>> {
    storage
        .bracket_races(event_id)?
        .into_iter()
        .map(|race| {
            let results = storage.race_results(race.id)?;
            Ok(RaceWithResults { race, results })
        })
        .collect()
}

fn handle_score(config: &Config, cmd: &ScoreCommand) -> Result<()> {
    let json = read_export(&cmd.file)?;
    let mut scores = import::score_export(&json, &config.import)
        .with_context(|| format!("failed to score {}", cmd.file.display()))?;

    if let Some(heat) = cmd.heat {
        scores.retain(|(number, _)| *number == heat);
        if scores.is_empty() {
            bail!("no heat {heat} in {}", cmd.file.display());
        }
    }

    println!("{}", output::scores(&scores, cmd.format)?);
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path).context("failed to load configuration")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Import]");
                println!("  Unknown callsign:   {}", config.import.unknown_callsign);
                println!("  Heat numbering:     {:?}", config.import.heat_numbering);
                println!("  Skip heats:         {}", config.import.skip_heats);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
