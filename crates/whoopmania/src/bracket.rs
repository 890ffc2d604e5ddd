//! The fixed 14-race double-elimination bracket.
//!
//! Topology is static data: each race number has a stage, and each stage
//! belongs to the upper or lower side (or is the final).

use serde::{Deserialize, Serialize};

/// Number of races in a bracket.
pub const RACE_COUNT: u32 = 14;

/// Bracket stage of a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Upper bracket, round of 16.
    #[serde(rename = "upper_1_16")]
    Upper16,
    /// Lower bracket, round of 16.
    #[serde(rename = "lower_1_16")]
    Lower16,
    /// Upper bracket, round of 8.
    #[serde(rename = "upper_1_8")]
    Upper8,
    /// Lower bracket, round of 8.
    #[serde(rename = "lower_1_8")]
    Lower8,
    /// Upper bracket, quarterfinal.
    #[serde(rename = "upper_1_4")]
    Upper4,
    /// Lower bracket, quarterfinal.
    #[serde(rename = "lower_1_4")]
    Lower4,
    /// Semifinal.
    Semi,
    /// Grand final.
    Final,
}

impl Stage {
    /// Storage name of the stage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upper16 => "upper_1_16",
            Self::Lower16 => "lower_1_16",
            Self::Upper8 => "upper_1_8",
            Self::Lower8 => "lower_1_8",
            Self::Upper4 => "upper_1_4",
            Self::Lower4 => "lower_1_4",
            Self::Semi => "semi",
            Self::Final => "final",
        }
    }

    /// Parse a storage name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upper_1_16" => Some(Self::Upper16),
            "lower_1_16" => Some(Self::Lower16),
            "upper_1_8" => Some(Self::Upper8),
            "lower_1_8" => Some(Self::Lower8),
            "upper_1_4" => Some(Self::Upper4),
            "lower_1_4" => Some(Self::Lower4),
            "semi" => Some(Self::Semi),
            "final" => Some(Self::Final),
            _ => None,
        }
    }

    /// Side of the bracket this stage belongs to.
    ///
    /// The semifinal is fed from the lower side and counts as lower.
    #[must_use]
    pub fn side(&self) -> BracketSide {
        match self {
            Self::Final => BracketSide::Final,
            Self::Upper16 | Self::Upper8 | Self::Upper4 => BracketSide::Upper,
            Self::Lower16 | Self::Lower8 | Self::Lower4 | Self::Semi => BracketSide::Lower,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of the bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketSide {
    /// Winners' side.
    Upper,
    /// Losers' side.
    Lower,
    /// The grand final.
    Final,
}

impl BracketSide {
    /// Storage name of the side.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Final => "final",
        }
    }

    /// Parse a storage name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upper" => Some(Self::Upper),
            "lower" => Some(Self::Lower),
            "final" => Some(Self::Final),
            _ => None,
        }
    }
}

impl std::fmt::Display for BracketSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One race of the bracket layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceSlot {
    /// Race number, 1..=14.
    pub number: u32,
    /// Stage of the race.
    pub stage: Stage,
    /// Short label shown on the bracket chart.
    pub short_label: &'static str,
}

impl RaceSlot {
    /// Display name of the race.
    #[must_use]
    pub fn name(&self) -> String {
        format!("Race {}", self.number)
    }

    /// Side of the bracket.
    #[must_use]
    pub fn side(&self) -> BracketSide {
        self.stage.side()
    }
}

const fn slot(number: u32, stage: Stage, short_label: &'static str) -> RaceSlot {
    RaceSlot {
        number,
        stage,
        short_label,
    }
}

/// The bracket, in race order.
pub const LAYOUT: [RaceSlot; RACE_COUNT as usize] = [
    slot(1, Stage::Upper16, "1/16"),
    slot(2, Stage::Upper16, "1/16"),
    slot(3, Stage::Upper16, "1/16"),
    slot(4, Stage::Upper16, "1/16"),
    slot(5, Stage::Lower16, "1/16"),
    slot(6, Stage::Upper8, "1/8"),
    slot(7, Stage::Lower16, "1/16"),
    slot(8, Stage::Upper8, "1/8"),
    slot(9, Stage::Lower8, "1/8"),
    slot(10, Stage::Lower8, "1/8"),
    slot(11, Stage::Upper4, "1/4"),
    slot(12, Stage::Lower4, "1/4"),
    slot(13, Stage::Semi, "Semifinal"),
    slot(14, Stage::Final, "Final"),
];

/// All races of the bracket.
#[must_use]
pub fn layout() -> &'static [RaceSlot] {
    &LAYOUT
}

/// Look up a race slot by number.
#[must_use]
pub fn race_slot(number: u32) -> Option<&'static RaceSlot> {
    LAYOUT.iter().find(|s| s.number == number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::FINAL_HEAT_NUMBER;

    #[test]
    fn test_layout_numbers_are_sequential() {
        for (i, slot) in layout().iter().enumerate() {
            assert_eq!(slot.number as usize, i + 1);
        }
    }

    #[test]
    fn test_final_is_last_race() {
        let last = race_slot(RACE_COUNT).unwrap();
        assert_eq!(last.stage, Stage::Final);
        assert_eq!(last.side(), BracketSide::Final);
        assert_eq!(last.number, FINAL_HEAT_NUMBER);
    }

    #[test]
    fn test_sides() {
        assert_eq!(race_slot(1).unwrap().side(), BracketSide::Upper);
        assert_eq!(race_slot(5).unwrap().side(), BracketSide::Lower);
        assert_eq!(race_slot(11).unwrap().side(), BracketSide::Upper);
        assert_eq!(race_slot(13).unwrap().side(), BracketSide::Lower);
    }

    #[test]
    fn test_unknown_race() {
        assert!(race_slot(0).is_none());
        assert!(race_slot(15).is_none());
    }

    #[test]
    fn test_stage_round_trip_names() {
        for slot in layout() {
            assert_eq!(Stage::parse(slot.stage.as_str()), Some(slot.stage));
        }
        assert_eq!(Stage::parse("quarter"), None);
    }

    #[test]
    fn test_stage_serde_matches_storage_name() {
        let json = serde_json::to_string(&Stage::Lower8).unwrap();
        assert_eq!(json, "\"lower_1_8\"");
    }

    #[test]
    fn test_race_name() {
        assert_eq!(race_slot(7).unwrap().name(), "Race 7");
    }
}
