//! RotorHazard JSON export parsing.
//!
//! A results export carries the event leaderboard (used for qualification)
//! and the per-heat round leaderboards (used for bracket scoring). Exports
//! from different RotorHazard versions differ in shape, so everything below
//! the top-level keys is read leniently: absent or malformed substructures
//! become empty heats and rounds instead of errors.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{HeatNumbering, ImportConfig};
use crate::error::{Error, Result};
use crate::model::QualificationEntry;
use crate::scoring::{Heat, HeatRound, RoundEntry};

/// Leaderboard table read when a round does not name its primary one.
const DEFAULT_ROUND_TABLE: &str = "by_race_time";

/// Qualification table inside the event leaderboard.
const QUALIFICATION_TABLE: &str = "by_consecutives";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExport {
    event_leaderboard: Option<Value>,
    leaderboard: Option<Value>,
    heats: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawQualificationRow {
    callsign: Option<String>,
    position: Option<u32>,
    consecutives_raw: Option<f64>,
    fastest_lap_raw: Option<f64>,
    laps: Option<u32>,
    starts: Option<u32>,
    consecutives_base: Option<u32>,
}

/// A heat as found in the export, before it is given a bracket number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportHeat {
    /// Key of the heat in the export's `heats` object (or array index).
    pub key: String,
    /// RotorHazard heat id.
    pub heat_id: Option<i64>,
    /// Heat name as shown in RotorHazard.
    pub display_name: Option<String>,
    /// Rounds in run order.
    pub rounds: Vec<HeatRound>,
}

impl ExportHeat {
    /// Trailing number of the display name (`"Race 7"` is 7).
    #[must_use]
    pub fn display_number(&self) -> Option<u32> {
        let name = self.display_name.as_deref()?;
        trailing_number()
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Read export JSON text from a file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read.
pub fn read_export(path: &Path) -> Result<String> {
    let json = std::fs::read_to_string(path)?;
    debug!("Read {} bytes of export from {}", json.len(), path.display());
    Ok(json)
}

/// A parsed RotorHazard results export.
#[derive(Debug)]
pub struct Export {
    raw: RawExport,
}

impl Export {
    /// Parse an export from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text is not a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawExport = serde_json::from_str(json)?;
        Ok(Self { raw })
    }

    /// Read the qualification table.
    ///
    /// Looks in `event_leaderboard.by_consecutives` first, then
    /// `leaderboard.by_consecutives`. Rows without a callsign get
    /// `unknown_callsign`; rows that cannot be read are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LeaderboardMissing`] if neither table exists.
    pub fn qualification(&self, unknown_callsign: &str) -> Result<Vec<QualificationEntry>> {
        let rows = [&self.raw.event_leaderboard, &self.raw.leaderboard]
            .into_iter()
            .flatten()
            .find_map(|board| board.get(QUALIFICATION_TABLE))
            .and_then(Value::as_array)
            .ok_or(Error::LeaderboardMissing {
                expected: "'by_consecutives' leaderboard",
                searched: "event_leaderboard/leaderboard",
            })?;

        let mut entries = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let raw: RawQualificationRow = match serde_json::from_value(row.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Skipping unreadable qualification row {}: {}", index, e);
                    continue;
                }
            };
            entries.push(QualificationEntry {
                nickname: non_empty(raw.callsign).unwrap_or_else(|| unknown_callsign.to_string()),
                rank: raw.position,
                best_lap_ms: raw.fastest_lap_raw.map(truncate_ms),
                best3_avg_ms: raw.consecutives_raw.map(truncate_ms),
                laps_total: raw.laps,
                attempts_count: raw.starts,
                consecutives_count: raw.consecutives_base,
            });
        }
        Ok(entries)
    }

    /// Read every heat, ordered by heat id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LeaderboardMissing`] if the export has no `heats`.
    pub fn heats(&self, unknown_callsign: &str) -> Result<Vec<ExportHeat>> {
        let mut heats: Vec<ExportHeat> = match &self.raw.heats {
            None | Some(Value::Null) => {
                return Err(Error::LeaderboardMissing {
                    expected: "heat results",
                    searched: "heats",
                })
            }
            Some(Value::Object(map)) => map
                .iter()
                .map(|(key, heat)| parse_heat(key.clone(), heat, unknown_callsign))
                .collect(),
            Some(Value::Array(list)) => list
                .iter()
                .enumerate()
                .map(|(i, heat)| parse_heat(i.to_string(), heat, unknown_callsign))
                .collect(),
            Some(other) => {
                warn!("Ignoring heats of unexpected JSON type: {}", type_name(other));
                Vec::new()
            }
        };

        heats.sort_by(|a, b| {
            let a_id = a.heat_id.or_else(|| a.key.parse().ok());
            let b_id = b.heat_id.or_else(|| b.key.parse().ok());
            // Heats with no usable id sort last, by key
            match (a_id, b_id) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.key.cmp(&b.key),
            }
        });
        Ok(heats)
    }

    /// Read every heat and assign bracket numbers per `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LeaderboardMissing`] if the export has no `heats`.
    pub fn bracket_heats(&self, config: &ImportConfig) -> Result<NumberedHeats> {
        let heats = self.heats(&config.unknown_callsign)?;
        Ok(number_heats(heats, config))
    }
}

/// Export heats with their bracket numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberedHeats {
    /// Heats in export order, at most one per bracket number.
    pub heats: Vec<Heat>,
    /// Heats dropped because they had no number or repeated one.
    pub dropped: usize,
}

/// Assign bracket numbers to export heats.
///
/// Heats that cannot be numbered, and any later heat that repeats an
/// earlier heat's number, are dropped with a warning.
#[must_use]
pub fn number_heats(heats: Vec<ExportHeat>, config: &ImportConfig) -> NumberedHeats {
    let candidates: Vec<(Option<u32>, ExportHeat)> = match config.heat_numbering {
        HeatNumbering::Sequential => (1u32..)
            .zip(heats.into_iter().skip(config.skip_heats))
            .map(|(number, heat)| (Some(number), heat))
            .collect(),
        HeatNumbering::DisplayName => heats
            .into_iter()
            .map(|heat| (heat.display_number(), heat))
            .collect(),
    };

    let mut numbered = NumberedHeats::default();
    let mut seen = BTreeSet::new();
    for (number, heat) in candidates {
        let Some(number) = number else {
            warn!(
                "Heat {} has no race number in its name ({:?}); skipping",
                heat.key, heat.display_name
            );
            numbered.dropped += 1;
            continue;
        };
        if !seen.insert(number) {
            warn!(
                "Heat {} ({:?}) repeats race number {}; keeping the earlier heat",
                heat.key, heat.display_name, number
            );
            numbered.dropped += 1;
            continue;
        }
        numbered.heats.push(Heat::new(number, heat.rounds));
    }
    numbered
}

/// Matches the trailing integer of a heat name.
///
/// # Panics
///
/// Panics if the built-in pattern is invalid.
fn trailing_number() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+)\s*$").expect("Invalid regex pattern"))
}

fn parse_heat(key: String, heat: &Value, unknown_callsign: &str) -> ExportHeat {
    let heat_id = heat.get("heat_id").and_then(Value::as_i64);
    let display_name = heat
        .get("displayname")
        .and_then(Value::as_str)
        .map(String::from);
    let rounds: Vec<HeatRound> = heat
        .get("rounds")
        .and_then(Value::as_array)
        .map(|rounds| {
            rounds
                .iter()
                .map(|round| parse_round(round, unknown_callsign))
                .collect()
        })
        .unwrap_or_default();

    debug!("Parsed heat {} with {} rounds", key, rounds.len());
    ExportHeat {
        key,
        heat_id,
        display_name,
        rounds,
    }
}

fn parse_round(round: &Value, unknown_callsign: &str) -> HeatRound {
    let Some(board) = round.get("leaderboard").and_then(Value::as_object) else {
        return HeatRound::default();
    };

    let table = primary_table(board);
    let entries = board
        .get(table)
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| parse_entry(row, unknown_callsign))
                .collect()
        })
        .unwrap_or_default();

    HeatRound::new(entries)
}

fn primary_table(board: &Map<String, Value>) -> &str {
    board
        .get("meta")
        .and_then(|meta| meta.get("primary_leaderboard"))
        .and_then(Value::as_str)
        .filter(|name| board.contains_key(*name))
        .unwrap_or(DEFAULT_ROUND_TABLE)
}

fn parse_entry(row: &Value, unknown_callsign: &str) -> Option<RoundEntry> {
    let Some(pilot_id) = row.get("pilot_id").and_then(Value::as_i64) else {
        debug!("Skipping leaderboard row without pilot_id");
        return None;
    };
    let callsign = non_empty(row.get("callsign").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| unknown_callsign.to_string());
    let position = row
        .get("position")
        .and_then(Value::as_u64)
        .and_then(|p| u32::try_from(p).ok());

    Some(RoundEntry::new(pilot_id, callsign, position))
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

#[allow(clippy::cast_possible_truncation)]
fn truncate_ms(value: f64) -> i64 {
    value.trunc() as i64
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pilot_id: i64, callsign: &str, position: Option<u32>) -> Value {
        serde_json::json!({ "pilot_id": pilot_id, "callsign": callsign, "position": position })
    }

    fn round_json(rows: Vec<Value>) -> Value {
        serde_json::json!({
            "id": 1,
            "leaderboard": {
                "by_race_time": rows,
                "meta": { "primary_leaderboard": "by_race_time" }
            }
        })
    }

    #[test]
    fn test_read_export_missing_file() {
        let path = std::env::temp_dir().join(format!("whoopmania_missing_{}.json", std::process::id()));
        let err = read_export(&path).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_read_export_from_file() {
        let path = std::env::temp_dir().join(format!("whoopmania_export_{}.json", std::process::id()));
        std::fs::write(&path, r#"{"heats": {}}"#).unwrap();

        let json = read_export(&path).unwrap();
        assert!(Export::from_json(&json).unwrap().heats("Unknown").unwrap().is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = Export::from_json("not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_qualification_from_event_leaderboard() {
        let json = serde_json::json!({
            "event_leaderboard": {
                "by_consecutives": [
                    {
                        "callsign": "Zed",
                        "position": 1,
                        "consecutives_raw": 31_234.7,
                        "fastest_lap_raw": 9_876,
                        "laps": 12,
                        "starts": 3,
                        "consecutives_base": 3
                    },
                    { "position": 2 }
                ]
            }
        });
        let export = Export::from_json(&json.to_string()).unwrap();
        let rows = export.qualification("Unknown").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].nickname, "Zed");
        assert_eq!(rows[0].best3_avg_ms, Some(31_234));
        assert_eq!(rows[0].best_lap_ms, Some(9_876));
        assert_eq!(rows[0].consecutives_count, Some(3));
        assert_eq!(rows[1].nickname, "Unknown");
        assert_eq!(rows[1].rank, Some(2));
        assert!(rows[1].best_lap_ms.is_none());
    }

    #[test]
    fn test_qualification_falls_back_to_leaderboard() {
        let json = r#"{
            "event_leaderboard": { "by_fastest_lap": [] },
            "leaderboard": { "by_consecutives": [ { "callsign": "A", "position": 1 } ] }
        }"#;
        let export = Export::from_json(json).unwrap();
        let rows = export.qualification("Unknown").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].nickname, "A");
    }

    #[test]
    fn test_qualification_missing_table() {
        let export = Export::from_json(r#"{"heats": {}}"#).unwrap();
        let err = export.qualification("Unknown").unwrap_err();
        assert!(matches!(err, Error::LeaderboardMissing { .. }));
    }

    #[test]
    fn test_qualification_skips_bad_rows() {
        let json = r#"{"leaderboard": {"by_consecutives": [
            {"callsign": "Ok", "position": 1},
            {"callsign": "Bad", "position": "first"}
        ]}}"#;
        let export = Export::from_json(json).unwrap();
        let rows = export.qualification("Unknown").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].nickname, "Ok");
    }

    #[test]
    fn test_heats_missing() {
        let export = Export::from_json("{}").unwrap();
        assert!(matches!(
            export.heats("Unknown").unwrap_err(),
            Error::LeaderboardMissing { .. }
        ));
    }

    #[test]
    fn test_heats_parsed_and_sorted() {
        let json = serde_json::json!({
            "heats": {
                "10": { "heat_id": 10, "displayname": "Race 2", "rounds": [
                    round_json(vec![row(1, "A", Some(1)), row(2, "B", None)])
                ]},
                "3": { "heat_id": 3, "displayname": "Race 1", "rounds": [] }
            }
        });
        let export = Export::from_json(&json.to_string()).unwrap();
        let heats = export.heats("Unknown").unwrap();

        assert_eq!(heats.len(), 2);
        assert_eq!(heats[0].heat_id, Some(3));
        assert_eq!(heats[1].heat_id, Some(10));
        let round = &heats[1].rounds[0];
        assert_eq!(round.entries.len(), 2);
        assert_eq!(round.active_count(), 1);
        assert_eq!(round.entries[0].callsign, "A");
    }

    #[test]
    fn test_heats_as_array() {
        let json = serde_json::json!({
            "heats": [ { "rounds": [ round_json(vec![row(5, "E", Some(1))]) ] } ]
        });
        let export = Export::from_json(&json.to_string()).unwrap();
        let heats = export.heats("Unknown").unwrap();
        assert_eq!(heats.len(), 1);
        assert_eq!(heats[0].key, "0");
    }

    #[test]
    fn test_malformed_rounds_become_empty() {
        let json = serde_json::json!({
            "heats": { "1": { "heat_id": 1, "rounds": [
                { "id": 1 },
                { "leaderboard": "oops" },
                { "leaderboard": { "by_race_time": "oops" } },
                { "leaderboard": { "by_race_time": [ { "callsign": "no id", "position": 1 } ] } }
            ]}}
        });
        let export = Export::from_json(&json.to_string()).unwrap();
        let heats = export.heats("Unknown").unwrap();
        assert_eq!(heats[0].rounds.len(), 4);
        assert!(heats[0].rounds.iter().all(|r| r.entries.is_empty()));
    }

    #[test]
    fn test_primary_leaderboard_respected() {
        let json = serde_json::json!({
            "heats": { "1": { "rounds": [ {
                "leaderboard": {
                    "by_race_time": [ row(1, "A", Some(2)) ],
                    "by_fastest_lap": [ row(1, "A", Some(1)) ],
                    "meta": { "primary_leaderboard": "by_fastest_lap" }
                }
            } ] } }
        });
        let export = Export::from_json(&json.to_string()).unwrap();
        let heats = export.heats("Unknown").unwrap();
        assert_eq!(heats[0].rounds[0].entries[0].finish_position, Some(1));
    }

    #[test]
    fn test_missing_callsign_uses_placeholder() {
        let json = serde_json::json!({
            "heats": { "1": { "rounds": [ round_json(vec![
                serde_json::json!({ "pilot_id": 8, "position": 1 })
            ]) ] } }
        });
        let export = Export::from_json(&json.to_string()).unwrap();
        let heats = export.heats("Nobody").unwrap();
        assert_eq!(heats[0].rounds[0].entries[0].callsign, "Nobody");
    }

    #[test]
    fn test_display_number() {
        let mut heat = ExportHeat {
            key: "1".to_string(),
            heat_id: Some(1),
            display_name: Some("Race 12".to_string()),
            rounds: Vec::new(),
        };
        assert_eq!(heat.display_number(), Some(12));
        heat.display_name = Some("Final".to_string());
        assert_eq!(heat.display_number(), None);
        heat.display_name = None;
        assert_eq!(heat.display_number(), None);
    }

    fn export_heat(id: i64, name: &str) -> ExportHeat {
        ExportHeat {
            key: id.to_string(),
            heat_id: Some(id),
            display_name: Some(name.to_string()),
            rounds: Vec::new(),
        }
    }

    #[test]
    fn test_number_heats_sequential_with_skip() {
        let heats = vec![
            export_heat(1, "Qual A"),
            export_heat(2, "Qual B"),
            export_heat(3, "Race 1"),
            export_heat(4, "Race 2"),
        ];
        let config = ImportConfig {
            skip_heats: 2,
            ..ImportConfig::default()
        };
        let numbered = number_heats(heats, &config);
        let numbers: Vec<u32> = numbered.heats.iter().map(|h| h.heat_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(numbered.dropped, 0);
    }

    #[test]
    fn test_number_heats_by_display_name() {
        let heats = vec![
            export_heat(1, "Qual A"),
            export_heat(2, "Race 14"),
            export_heat(3, "Race 3"),
        ];
        let config = ImportConfig {
            heat_numbering: HeatNumbering::DisplayName,
            ..ImportConfig::default()
        };
        let numbered = number_heats(heats, &config);
        let numbers: Vec<u32> = numbered.heats.iter().map(|h| h.heat_number).collect();
        assert_eq!(numbers, vec![14, 3]);
        assert_eq!(numbered.dropped, 1);
    }

    #[test]
    fn test_number_heats_keeps_first_of_repeated_number() {
        let mut first = export_heat(1, "Race 3");
        first.rounds = vec![HeatRound::new(vec![RoundEntry::new(1, "A", Some(1))])];
        let heats = vec![first, export_heat(2, "Race 3 "), export_heat(3, "Race 4")];
        let config = ImportConfig {
            heat_numbering: HeatNumbering::DisplayName,
            ..ImportConfig::default()
        };

        let numbered = number_heats(heats, &config);
        let numbers: Vec<u32> = numbered.heats.iter().map(|h| h.heat_number).collect();
        assert_eq!(numbers, vec![3, 4]);
        assert_eq!(numbered.heats[0].rounds.len(), 1);
        assert_eq!(numbered.dropped, 1);
    }
}
