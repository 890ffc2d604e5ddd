//! Import of RotorHazard exports into storage.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ImportConfig;
use crate::error::Result;
use crate::export::Export;
use crate::model::NewRaceResult;
use crate::scoring::HeatScore;
use crate::storage::Storage;

/// Counts reported by [`import_bracket`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BracketImportSummary {
    /// Heats whose results were written.
    pub heats_scored: usize,
    /// Heats not written: no race number, a repeated number, or no
    /// matching bracket race.
    pub heats_skipped: usize,
    /// Result rows written across all races.
    pub results_written: usize,
}

/// Import an event's qualification table from an export.
///
/// Replaces any previous qualification of the event. Returns the number of
/// rows imported.
///
/// # Errors
///
/// Returns [`crate::Error::EventNotFound`] if the event doesn't exist, an
/// export error if the JSON has no qualification table, or a storage error.
pub fn import_qualification(
    storage: &Storage,
    event_id: i64,
    json: &str,
    config: &ImportConfig,
) -> Result<usize> {
    let event = storage.require_event(event_id)?;
    let export = Export::from_json(json)?;
    let entries = export.qualification(&config.unknown_callsign)?;

    let written = storage.replace_qualification(event.id, &entries)?;
    info!("Imported {} qualification rows into event {} ({})", written, event.id, event.name);
    Ok(written)
}

/// Score every heat of an export and store the results in the event's bracket.
///
/// Heats are numbered per `config`; a heat without a usable number, one
/// repeating an earlier heat's number, or one whose number has no bracket
/// race is skipped. The whole import is a single transaction.
///
/// # Errors
///
/// Returns [`crate::Error::EventNotFound`] if the event doesn't exist, an
/// export error if the JSON has no heats, or a storage error. Nothing is
/// written on error.
pub fn import_bracket(
    storage: &Storage,
    event_id: i64,
    json: &str,
    config: &ImportConfig,
) -> Result<BracketImportSummary> {
    let event = storage.require_event(event_id)?;
    let export = Export::from_json(json)?;
    let numbered = export.bracket_heats(config)?;

    let summary = storage.transaction(|storage| {
        let mut summary = BracketImportSummary {
            heats_skipped: numbered.dropped,
            ..BracketImportSummary::default()
        };

        for heat in &numbered.heats {
            let Some(race) = storage.find_race(event.id, heat.heat_number)? else {
                warn!(
                    "Event {} has no bracket race {}; skipping heat",
                    event.id, heat.heat_number
                );
                summary.heats_skipped += 1;
                continue;
            };

            let score = heat.score();
            let mut rows = Vec::with_capacity(score.results.len());
            for ranked in &score.results {
                let pilot = storage.get_or_create_pilot(&ranked.callsign)?;
                rows.push(NewRaceResult::from_ranked(Some(pilot.id), ranked));
            }

            summary.results_written += storage.replace_race_results(race.id, &rows)?;
            summary.heats_scored += 1;
            debug!(
                "Race {}: {} rounds counted, {} pilots ranked",
                race.number,
                score.selected_rounds.len(),
                rows.len()
            );
        }

        Ok(summary)
    })?;

    info!(
        "Imported bracket for event {}: {} heats scored, {} skipped, {} results",
        event.id, summary.heats_scored, summary.heats_skipped, summary.results_written
    );
    Ok(summary)
}

/// Score every heat of an export without touching storage.
///
/// # Errors
///
/// Returns an export error if the JSON is unreadable or has no heats.
pub fn score_export(json: &str, config: &ImportConfig) -> Result<Vec<(u32, HeatScore)>> {
    let export = Export::from_json(json)?;
    let numbered = export.bracket_heats(config)?;
    Ok(numbered
        .heats
        .iter()
        .map(|heat| (heat.heat_number, heat.score()))
        .collect())
}
