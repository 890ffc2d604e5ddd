//! Persistent records: events, pilots, qualification and bracket results.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::bracket::{BracketSide, Stage};
use crate::scoring::RankedResult;

/// Kind of event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A scored race.
    #[default]
    Race,
    /// A training session.
    Training,
}

impl EventType {
    /// Parse an event type, falling back to [`EventType::Race`].
    #[must_use]
    pub fn parse_or_race(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "training" => Self::Training,
            _ => Self::Race,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Race => write!(f, "race"),
            Self::Training => write!(f, "training"),
        }
    }
}

/// A stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Storage id.
    pub id: i64,
    /// Event name.
    pub name: String,
    /// Event kind.
    pub event_type: EventType,
    /// Day of the event.
    pub date: NaiveDate,
    /// Venue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Fields for creating an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// Event name.
    pub name: String,
    /// Event kind.
    pub event_type: EventType,
    /// Day of the event.
    pub date: NaiveDate,
    /// Venue.
    pub location: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
}

impl NewEvent {
    /// Create a race event with no location or description.
    #[must_use]
    pub fn race(name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            event_type: EventType::Race,
            date,
            location: None,
            description: None,
        }
    }
}

/// Changes to an event. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventUpdate {
    /// New name.
    pub name: Option<String>,
    /// New venue.
    pub location: Option<String>,
    /// New description.
    pub description: Option<String>,
}

impl EventUpdate {
    /// Whether the update leaves every field as it is.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.location.is_none() && self.description.is_none()
    }
}

/// A stored pilot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pilot {
    /// Storage id.
    pub id: i64,
    /// Nickname; matched against timing-system callsigns.
    pub nickname: String,
    /// Given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Radio callsign, when different from the nickname.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
    /// Home city.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Club.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub club: Option<String>,
    /// Telegram account id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_id: Option<i64>,
    /// When the pilot was first recorded.
    pub created_at: DateTime<Utc>,
}

impl Pilot {
    /// First and last name, or the nickname when neither is known.
    #[must_use]
    pub fn full_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            self.nickname.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// One qualification line, as imported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationEntry {
    /// Pilot nickname.
    pub nickname: String,
    /// Qualification rank.
    pub rank: Option<u32>,
    /// Fastest lap in milliseconds.
    pub best_lap_ms: Option<i64>,
    /// Best three consecutive laps in milliseconds.
    pub best3_avg_ms: Option<i64>,
    /// Laps completed.
    pub laps_total: Option<u32>,
    /// Starts.
    pub attempts_count: Option<u32>,
    /// Length of the best consecutive-lap run (0..=3).
    pub consecutives_count: Option<u32>,
}

/// A stored qualification result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationResult {
    /// Storage id.
    pub id: i64,
    /// Event the result belongs to.
    pub event_id: i64,
    /// Pilot id.
    pub pilot_id: i64,
    /// Pilot nickname.
    pub nickname: String,
    /// Qualification rank.
    pub rank: Option<u32>,
    /// Fastest lap in milliseconds.
    pub best_lap_ms: Option<i64>,
    /// Best three consecutive laps in milliseconds.
    pub best3_avg_ms: Option<i64>,
    /// Laps completed.
    pub laps_total: Option<u32>,
    /// Starts.
    pub attempts_count: Option<u32>,
    /// Length of the best consecutive-lap run.
    pub consecutives_count: Option<u32>,
}

/// A pilot's qualification at one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    /// The event.
    pub event: Event,
    /// The qualification line.
    pub qualification: QualificationResult,
}

/// A stored bracket race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketRace {
    /// Storage id.
    pub id: i64,
    /// Event the race belongs to.
    pub event_id: i64,
    /// Race number, 1..=14.
    pub number: u32,
    /// Display name.
    pub name: String,
    /// Short chart label.
    pub short_label: String,
    /// Bracket stage.
    pub stage: Stage,
    /// Bracket side.
    pub bracket_side: BracketSide,
}

/// Points of one pilot in one bracket race, as written by an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRaceResult {
    /// Resolved pilot id.
    pub pilot_id: Option<i64>,
    /// Points for round slots 1..=5.
    pub round_points: [Option<u32>; 5],
    /// Total points.
    pub total_points: f64,
    /// Final position in the race.
    pub final_position: u32,
}

impl NewRaceResult {
    /// Build a storage row from an engine result.
    ///
    /// Slots beyond the fifth are dropped; the total is taken from the
    /// engine, not recomputed.
    #[must_use]
    pub fn from_ranked(pilot_id: Option<i64>, ranked: &RankedResult) -> Self {
        let mut round_points = [None; 5];
        for (&slot, &points) in &ranked.round_points {
            if let Some(cell) = usize::try_from(slot)
                .ok()
                .and_then(|s| s.checked_sub(1))
                .and_then(|i| round_points.get_mut(i))
            {
                *cell = Some(points);
            }
        }
        Self {
            pilot_id,
            round_points,
            total_points: f64::from(ranked.total_points),
            final_position: ranked.final_position,
        }
    }
}

/// A stored bracket race result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketRaceResult {
    /// Storage id.
    pub id: i64,
    /// Race the result belongs to.
    pub bracket_race_id: i64,
    /// Pilot id, if the pilot still exists.
    pub pilot_id: Option<i64>,
    /// Pilot nickname, if the pilot still exists.
    pub nickname: Option<String>,
    /// Points for round slots 1..=5.
    pub round_points: [Option<u32>; 5],
    /// Total points.
    pub total_points: Option<f64>,
    /// Final position in the race.
    pub final_position: Option<u32>,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn pilot(first: Option<&str>, last: Option<&str>) -> Pilot {
        Pilot {
            id: 1,
            nickname: "zoomer".to_string(),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            callsign: None,
            city: None,
            club: None,
            telegram_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_event_type_parse_or_race() {
        assert_eq!(EventType::parse_or_race("training"), EventType::Training);
        assert_eq!(EventType::parse_or_race("Training "), EventType::Training);
        assert_eq!(EventType::parse_or_race("race"), EventType::Race);
        assert_eq!(EventType::parse_or_race("banquet"), EventType::Race);
    }

    #[test]
    fn test_event_type_display() {
        assert_eq!(EventType::Race.to_string(), "race");
        assert_eq!(EventType::Training.to_string(), "training");
    }

    #[test]
    fn test_event_update_is_empty() {
        assert!(EventUpdate::default().is_empty());
        let update = EventUpdate {
            location: Some("Hall B".to_string()),
            ..EventUpdate::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_full_name() {
        assert_eq!(pilot(None, None).full_name(), "zoomer");
        assert_eq!(pilot(Some("Ivan"), None).full_name(), "Ivan");
        assert_eq!(pilot(Some("Ivan"), Some("Petrov")).full_name(), "Ivan Petrov");
    }

    #[test]
    fn test_new_race_result_from_ranked() {
        let ranked = RankedResult {
            final_position: 2,
            pilot_external_id: 4,
            callsign: "x".to_string(),
            round_points: BTreeMap::from([(1, 3), (3, 1)]),
            total_points: 4,
            positions: BTreeMap::from([(1, 1), (3, 3)]),
        };
        let row = NewRaceResult::from_ranked(Some(9), &ranked);
        assert_eq!(row.pilot_id, Some(9));
        assert_eq!(row.round_points, [Some(3), None, Some(1), None, None]);
        assert!((row.total_points - 4.0).abs() < f64::EPSILON);
        assert_eq!(row.final_position, 2);
    }
}
