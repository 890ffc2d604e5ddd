//! Heat scoring engine.
//!
//! Converts one heat's round-by-round leaderboard data into per-pilot point
//! totals and a dense ranking. Only the rounds that reached the heat's
//! largest field size are counted, up to three of them (five for the grand
//! final). Each counted finish earns points from a fixed table.
//!
//! Scoring is a pure function of its input: it performs no I/O and keeps no
//! state between calls.
//!
//! # Example
//!
//! ```
//! use whoopmania::scoring::{score_heat, Heat, HeatRound, RoundEntry};
//!
//! let round = HeatRound::new(vec![
//!     RoundEntry::new(10, "alpha", Some(1)),
//!     RoundEntry::new(20, "bravo", Some(2)),
//! ]);
//! let heat = Heat::new(1, vec![round.clone(), round.clone(), round]);
//!
//! let score = score_heat(&heat, 1);
//! assert_eq!(score.selected_rounds, vec![0, 1, 2]);
//! assert_eq!(score.results[0].pilot_external_id, 10);
//! assert_eq!(score.results[0].total_points, 9);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Bracket number of the grand final.
pub const FINAL_HEAT_NUMBER: u32 = 14;

/// Rounds counted in the grand final.
pub const FINAL_ROUND_COUNT: usize = 5;

/// Rounds counted in every other heat.
pub const ROUND_COUNT: usize = 3;

/// One pilot's line in a round leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEntry {
    /// Pilot id assigned by the timing system.
    pub pilot_external_id: i64,
    /// Callsign as shown by the timing system.
    pub callsign: String,
    /// Finish position, `None` when the pilot was not ranked this round.
    #[serde(default)]
    pub finish_position: Option<u32>,
}

impl RoundEntry {
    /// Create a new round entry.
    #[must_use]
    pub fn new(pilot_external_id: i64, callsign: impl Into<String>, finish_position: Option<u32>) -> Self {
        Self {
            pilot_external_id,
            callsign: callsign.into(),
            finish_position,
        }
    }

    /// Whether this entry carries a finish position.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.finish_position.is_some()
    }
}

/// One timed attempt within a heat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatRound {
    /// Leaderboard entries in timing-system order.
    pub entries: Vec<RoundEntry>,
}

impl HeatRound {
    /// Create a round from its entries.
    #[must_use]
    pub fn new(entries: Vec<RoundEntry>) -> Self {
        Self { entries }
    }

    /// Number of entries with a finish position.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_active()).count()
    }
}

/// A heat: one race slot of the bracket and its rounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heat {
    /// Position in the bracket (1..=14).
    pub heat_number: u32,
    /// Rounds in the order they were run.
    pub rounds: Vec<HeatRound>,
}

impl Heat {
    /// Create a heat.
    #[must_use]
    pub fn new(heat_number: u32, rounds: Vec<HeatRound>) -> Self {
        Self {
            heat_number,
            rounds,
        }
    }

    /// Score this heat at its own bracket position.
    #[must_use]
    pub fn score(&self) -> HeatScore {
        score_heat(self, self.heat_number)
    }
}

/// Points and positions collected for one pilot while scoring a heat.
///
/// Maps are keyed by round slot (1-based index among the selected rounds).
/// Slots the pilot did not finish are absent, not zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PilotHeatRecord {
    /// Pilot id assigned by the timing system.
    pub pilot_external_id: i64,
    /// Callsign from the pilot's first credited entry.
    pub callsign: String,
    /// Points per round slot.
    pub round_points: BTreeMap<u32, u32>,
    /// Finish position per round slot.
    pub positions: BTreeMap<u32, u32>,
}

impl PilotHeatRecord {
    fn new(pilot_external_id: i64, callsign: String) -> Self {
        Self {
            pilot_external_id,
            callsign,
            round_points: BTreeMap::new(),
            positions: BTreeMap::new(),
        }
    }

    /// Sum of the recorded round points.
    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.round_points.values().sum()
    }

    fn into_ranked(self, final_position: u32) -> RankedResult {
        let total_points = self.total_points();
        RankedResult {
            final_position,
            pilot_external_id: self.pilot_external_id,
            callsign: self.callsign,
            round_points: self.round_points,
            total_points,
            positions: self.positions,
        }
    }
}

/// A pilot's final standing in a heat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedResult {
    /// Dense 1-based rank.
    pub final_position: u32,
    /// Pilot id assigned by the timing system.
    pub pilot_external_id: i64,
    /// Callsign from the pilot's first credited entry.
    pub callsign: String,
    /// Points per round slot.
    pub round_points: BTreeMap<u32, u32>,
    /// Sum of `round_points`.
    pub total_points: u32,
    /// Finish position per round slot.
    pub positions: BTreeMap<u32, u32>,
}

/// Outcome of scoring one heat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatScore {
    /// Indices into the heat's rounds that counted, in run order.
    pub selected_rounds: Vec<usize>,
    /// Pilots in final order.
    pub results: Vec<RankedResult>,
}

impl HeatScore {
    /// Whether nobody was ranked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Number of rounds counted for a bracket position.
#[must_use]
pub fn desired_rounds(heat_number: u32) -> usize {
    if heat_number == FINAL_HEAT_NUMBER {
        FINAL_ROUND_COUNT
    } else {
        ROUND_COUNT
    }
}

/// Points for a finish position: 3, 2 and 1 for the podium, 0 otherwise.
#[must_use]
pub fn points_for_position(position: u32) -> u32 {
    match position {
        1 => 3,
        2 => 2,
        3 => 1,
        _ => 0,
    }
}

/// Pick the rounds that count.
///
/// Returns, in run order, the indices of the first `desired` rounds whose
/// active count equals the heat's maximum. Rounds with a smaller field are
/// false starts and never count. A heat where nobody finished selects
/// nothing.
#[must_use]
pub fn select_rounds(rounds: &[HeatRound], desired: usize) -> Vec<usize> {
    let max_active = rounds.iter().map(HeatRound::active_count).max().unwrap_or(0);
    if max_active == 0 {
        return Vec::new();
    }

    rounds
        .iter()
        .enumerate()
        .filter(|(_, round)| round.active_count() == max_active)
        .map(|(index, _)| index)
        .take(desired)
        .collect()
}

/// Score a heat at the given bracket position.
///
/// Ranking is by total points, descending, with ties broken by ascending
/// external pilot id so that every pilot gets a distinct position.
#[must_use]
pub fn score_heat(heat: &Heat, heat_number: u32) -> HeatScore {
    let selected_rounds = select_rounds(&heat.rounds, desired_rounds(heat_number));

    let mut records: BTreeMap<i64, PilotHeatRecord> = BTreeMap::new();
    for (slot, &index) in (1u32..).zip(&selected_rounds) {
        for entry in &heat.rounds[index].entries {
            let Some(position) = entry.finish_position else {
                continue;
            };
            let record = records
                .entry(entry.pilot_external_id)
                .or_insert_with(|| PilotHeatRecord::new(entry.pilot_external_id, entry.callsign.clone()));
            record.round_points.insert(slot, points_for_position(position));
            record.positions.insert(slot, position);
        }
    }

    let mut ordered: Vec<PilotHeatRecord> = records.into_values().collect();
    ordered.sort_by(|a, b| {
        b.total_points()
            .cmp(&a.total_points())
            .then_with(|| a.pilot_external_id.cmp(&b.pilot_external_id))
    });

    let results = (1u32..)
        .zip(ordered)
        .map(|(final_position, record)| record.into_ranked(final_position))
        .collect();

    HeatScore {
        selected_rounds,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(finishers: &[(i64, Option<u32>)]) -> HeatRound {
        HeatRound::new(
            finishers
                .iter()
                .map(|&(id, pos)| RoundEntry::new(id, format!("pilot{id}"), pos))
                .collect(),
        )
    }

    /// A round with `active` finishers (ids 10, 20, ...) finishing in id order.
    fn full_round(active: u32) -> HeatRound {
        let entries: Vec<(i64, Option<u32>)> = (1..=active)
            .map(|p| (i64::from(p) * 10, Some(p)))
            .collect();
        round(&entries)
    }

    #[test]
    fn test_points_for_position() {
        assert_eq!(points_for_position(1), 3);
        assert_eq!(points_for_position(2), 2);
        assert_eq!(points_for_position(3), 1);
        assert_eq!(points_for_position(4), 0);
        assert_eq!(points_for_position(9), 0);
    }

    #[test]
    fn test_desired_rounds() {
        assert_eq!(desired_rounds(1), 3);
        assert_eq!(desired_rounds(13), 3);
        assert_eq!(desired_rounds(14), 5);
    }

    #[test]
    fn test_empty_heat() {
        let score = score_heat(&Heat::new(1, Vec::new()), 1);
        assert!(score.selected_rounds.is_empty());
        assert!(score.is_empty());
    }

    #[test]
    fn test_heat_without_finishers() {
        let heat = Heat::new(3, vec![round(&[(1, None), (2, None)]), round(&[])]);
        let score = score_heat(&heat, 3);
        assert_eq!(score, HeatScore::default());
    }

    #[test]
    fn test_false_start_round_excluded() {
        // Active counts [2, 4, 4, 4]: the first round is a false start
        let first = round(&[(10, Some(1)), (20, Some(2)), (30, None), (40, None)]);
        let heat = Heat::new(
            1,
            vec![first, full_round(4), full_round(4), full_round(4)],
        );

        let score = heat.score();
        assert_eq!(score.selected_rounds, vec![1, 2, 3]);

        let a = &score.results[0];
        assert_eq!(a.final_position, 1);
        assert_eq!(a.pilot_external_id, 10);
        assert_eq!(a.round_points, BTreeMap::from([(1, 3), (2, 3), (3, 3)]));
        assert_eq!(a.total_points, 9);

        let b = &score.results[1];
        assert_eq!(b.final_position, 2);
        assert_eq!(b.pilot_external_id, 20);
        assert_eq!(b.round_points, BTreeMap::from([(1, 2), (2, 2), (3, 2)]));
        assert_eq!(b.total_points, 6);
    }

    #[test]
    fn test_selection_capped_at_three() {
        let heat = Heat::new(2, (0..5).map(|_| full_round(4)).collect());
        assert_eq!(heat.score().selected_rounds, vec![0, 1, 2]);
    }

    #[test]
    fn test_final_selects_five_rounds() {
        let heat = Heat::new(14, (0..5).map(|_| full_round(4)).collect());
        let score = heat.score();
        assert_eq!(score.selected_rounds, vec![0, 1, 2, 3, 4]);
        assert_eq!(score.results[0].total_points, 15);
        assert_eq!(score.results[0].round_points.len(), 5);
    }

    #[test]
    fn test_fewer_full_rounds_than_desired() {
        let heat = Heat::new(14, vec![full_round(4), full_round(3), full_round(4)]);
        assert_eq!(heat.score().selected_rounds, vec![0, 2]);
    }

    #[test]
    fn test_heat_number_argument_overrides_field() {
        let heat = Heat::new(1, (0..5).map(|_| full_round(2)).collect());
        assert_eq!(score_heat(&heat, 14).selected_rounds.len(), 5);
        assert_eq!(score_heat(&heat, 1).selected_rounds.len(), 3);
    }

    #[test]
    fn test_tie_broken_by_external_id() {
        let heat = Heat::new(
            1,
            vec![
                round(&[(50, Some(1)), (7, Some(2))]),
                round(&[(7, Some(1)), (50, Some(2))]),
            ],
        );
        let score = heat.score();
        assert_eq!(score.results[0].total_points, 5);
        assert_eq!(score.results[1].total_points, 5);
        assert_eq!(score.results[0].pilot_external_id, 7);
        assert_eq!(score.results[1].pilot_external_id, 50);
        assert_eq!(score.results[1].final_position, 2);
    }

    #[test]
    fn test_unranked_entry_not_padded() {
        // Pilot 30 finishes in only one of the three counted rounds
        let heat = Heat::new(
            4,
            vec![
                round(&[(10, Some(1)), (20, Some(2)), (30, None)]),
                round(&[(10, Some(2)), (30, Some(1)), (20, None)]),
                round(&[(20, Some(1)), (10, Some(2)), (30, None)]),
            ],
        );
        let score = heat.score();
        let p30 = score
            .results
            .iter()
            .find(|r| r.pilot_external_id == 30)
            .unwrap();
        assert_eq!(p30.round_points, BTreeMap::from([(2, 3)]));
        assert_eq!(p30.positions, BTreeMap::from([(2, 1)]));
        assert_eq!(p30.total_points, 3);
    }

    #[test]
    fn test_pilot_never_ranked_is_absent() {
        let heat = Heat::new(
            1,
            vec![round(&[(10, Some(1)), (99, None)]); 3],
        );
        let score = heat.score();
        assert_eq!(score.results.len(), 1);
        assert!(score.results.iter().all(|r| r.pilot_external_id != 99));
    }

    #[test]
    fn test_fourth_place_scores_zero_but_is_ranked() {
        let heat = Heat::new(5, vec![full_round(5); 3]);
        let score = heat.score();
        assert_eq!(score.results.len(), 5);
        let last = &score.results[4];
        assert_eq!(last.pilot_external_id, 50);
        assert_eq!(last.total_points, 0);
        assert_eq!(last.round_points, BTreeMap::from([(1, 0), (2, 0), (3, 0)]));
        assert_eq!(last.positions, BTreeMap::from([(1, 5), (2, 5), (3, 5)]));
    }

    #[test]
    fn test_first_callsign_wins() {
        let heat = Heat::new(
            1,
            vec![
                HeatRound::new(vec![RoundEntry::new(1, "first", Some(1))]),
                HeatRound::new(vec![RoundEntry::new(1, "renamed", Some(1))]),
            ],
        );
        assert_eq!(heat.score().results[0].callsign, "first");
    }

    #[test]
    fn test_round_entry_deserialize_without_position() {
        let entry: RoundEntry =
            serde_json::from_str(r#"{"pilot_external_id": 3, "callsign": "x"}"#).unwrap();
        assert!(!entry.is_active());
    }

    mod properties {
        use super::super::*;
        use proptest::prelude::*;

        /// Rounds where slot `i` is the pilot with id `(i + 1) * 10`.
        fn heat_strategy() -> impl Strategy<Value = (u32, Vec<HeatRound>)> {
            let round = prop::collection::vec(prop::option::of(1u32..7), 0..6).prop_map(|slots| {
                HeatRound::new(
                    slots
                        .into_iter()
                        .enumerate()
                        .map(|(i, pos)| {
                            let id = (i as i64 + 1) * 10;
                            RoundEntry::new(id, format!("p{id}"), pos)
                        })
                        .collect(),
                )
            });
            (1u32..=14, prop::collection::vec(round, 0..8))
        }

        proptest! {
            #[test]
            fn selection_is_ordered_and_bounded((number, rounds) in heat_strategy()) {
                let heat = Heat::new(number, rounds);
                let score = heat.score();
                prop_assert!(score.selected_rounds.windows(2).all(|w| w[0] < w[1]));
                prop_assert!(score.selected_rounds.len() <= desired_rounds(number));
            }

            #[test]
            fn ranking_is_dense_and_sorted((number, rounds) in heat_strategy()) {
                let heat = Heat::new(number, rounds);
                let score = heat.score();
                for (i, result) in score.results.iter().enumerate() {
                    prop_assert_eq!(result.final_position as usize, i + 1);
                }
                for pair in score.results.windows(2) {
                    let (a, b) = (&pair[0], &pair[1]);
                    prop_assert!(
                        a.total_points > b.total_points
                            || (a.total_points == b.total_points
                                && a.pilot_external_id < b.pilot_external_id)
                    );
                }
            }

            #[test]
            fn totals_and_points_are_consistent((number, rounds) in heat_strategy()) {
                let heat = Heat::new(number, rounds);
                for result in heat.score().results {
                    prop_assert_eq!(result.total_points, result.round_points.values().sum::<u32>());
                    prop_assert_eq!(result.round_points.len(), result.positions.len());
                    for (slot, position) in &result.positions {
                        prop_assert_eq!(result.round_points[slot], points_for_position(*position));
                    }
                }
            }

            #[test]
            fn every_credited_pilot_is_ranked_once((number, rounds) in heat_strategy()) {
                let heat = Heat::new(number, rounds);
                let score = heat.score();
                let mut expected: Vec<i64> = score
                    .selected_rounds
                    .iter()
                    .flat_map(|&i| heat.rounds[i].entries.iter())
                    .filter(|e| e.is_active())
                    .map(|e| e.pilot_external_id)
                    .collect();
                expected.sort_unstable();
                expected.dedup();
                let mut ranked: Vec<i64> = score.results.iter().map(|r| r.pilot_external_id).collect();
                ranked.sort_unstable();
                prop_assert_eq!(ranked, expected);
            }

            #[test]
            fn scoring_is_idempotent((number, rounds) in heat_strategy()) {
                let heat = Heat::new(number, rounds);
                let first = serde_json::to_string(&heat.score()).unwrap();
                let second = serde_json::to_string(&heat.score()).unwrap();
                prop_assert_eq!(first, second);
            }
        }
    }
}
