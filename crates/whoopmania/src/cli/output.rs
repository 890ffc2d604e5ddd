//! Rendering of command output.
//!
//! Every renderer returns the full text so commands only print it.

use serde::Serialize;
use serde_json::json;

use super::OutputFormat;
use crate::error::Result;
use crate::format::{format_ms, format_points, MISSING};
use crate::model::{BracketRace, BracketRaceResult, Event, Participation, Pilot, QualificationResult};
use crate::scoring::{desired_rounds, HeatScore};

/// A bracket race with its stored results.
#[derive(Debug, Clone, Serialize)]
pub struct RaceWithResults {
    /// The race.
    pub race: BracketRace,
    /// Results by final position.
    pub results: Vec<BracketRaceResult>,
}

/// Render the event list.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn events(events: &[Event], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(events)?),
        OutputFormat::Plain => Ok(if events.is_empty() {
            "No events.".to_string()
        } else {
            events
                .iter()
                .map(|e| format!("{:>4}  {}  {} ({})", e.id, e.date, e.name, e.event_type))
                .collect::<Vec<_>>()
                .join("\n")
        }),
        OutputFormat::Table => Ok(table(
            &["ID", "Date", "Name", "Type", "Location"],
            events
                .iter()
                .map(|e| {
                    vec![
                        e.id.to_string(),
                        e.date.to_string(),
                        e.name.clone(),
                        e.event_type.to_string(),
                        e.location.clone().unwrap_or_else(|| MISSING.to_string()),
                    ]
                })
                .collect(),
        )),
    }
}

/// Render one event with its qualification and bracket.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn event_detail(
    event: &Event,
    qualification: &[QualificationResult],
    bracket: &[RaceWithResults],
    format: OutputFormat,
) -> Result<String> {
    if format == OutputFormat::Json {
        let value = json!({
            "event": event,
            "qualification": qualification,
            "bracket": bracket,
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut sections = vec![event_header(event)];

    sections.push(if qualification.is_empty() {
        "Qualification: none".to_string()
    } else {
        format!("Qualification\n{}", qualification_table(qualification, format))
    });

    if !bracket.is_empty() {
        sections.push(format!("Bracket\n{}", self::bracket(bracket, format)?));
    }

    Ok(sections.join("\n\n"))
}

fn event_header(event: &Event) -> String {
    let mut lines = vec![
        format!("{} (#{})", event.name, event.id),
        format!("Date:     {}", event.date),
        format!("Type:     {}", event.event_type),
    ];
    if let Some(location) = &event.location {
        lines.push(format!("Location: {location}"));
    }
    if let Some(description) = &event.description {
        lines.push(format!("About:    {description}"));
    }
    lines.join("\n")
}

fn qualification_table(rows: &[QualificationResult], format: OutputFormat) -> String {
    if format == OutputFormat::Plain {
        return rows
            .iter()
            .map(|r| {
                format!(
                    "{:>3}. {}  best3 {}  best lap {}",
                    r.rank.map_or_else(|| MISSING.to_string(), |n| n.to_string()),
                    r.nickname,
                    format_ms(r.best3_avg_ms),
                    format_ms(r.best_lap_ms),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
    }

    table(
        &["Rank", "Pilot", "Best 3", "Best lap", "Laps", "Starts"],
        rows.iter()
            .map(|r| {
                vec![
                    optional(r.rank),
                    r.nickname.clone(),
                    format_ms(r.best3_avg_ms),
                    format_ms(r.best_lap_ms),
                    optional(r.laps_total),
                    optional(r.attempts_count),
                ]
            })
            .collect(),
    )
}

/// Render a bracket.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn bracket(races: &[RaceWithResults], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(races)?);
    }
    if races.is_empty() {
        return Ok("No bracket.".to_string());
    }

    let blocks: Vec<String> = races
        .iter()
        .map(|entry| {
            let race = &entry.race;
            let title = format!(
                "{} [{} {}]",
                race.name, race.bracket_side, race.short_label
            );
            if entry.results.is_empty() {
                return format!("{title}\n  no results");
            }
            let body = match format {
                OutputFormat::Table => race_results_table(&entry.results),
                _ => entry
                    .results
                    .iter()
                    .map(|r| {
                        format!(
                            "  {}. {}  {} pts",
                            optional(r.final_position),
                            r.nickname.as_deref().unwrap_or(MISSING),
                            format_points(r.total_points),
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            };
            format!("{title}\n{body}")
        })
        .collect();

    Ok(blocks.join("\n\n"))
}

fn race_results_table(results: &[BracketRaceResult]) -> String {
    table(
        &["Pos", "Pilot", "R1", "R2", "R3", "R4", "R5", "Total"],
        results
            .iter()
            .map(|r| {
                let mut row = vec![
                    optional(r.final_position),
                    r.nickname.clone().unwrap_or_else(|| MISSING.to_string()),
                ];
                row.extend(r.round_points.iter().map(|p| optional(*p)));
                row.push(format_points(r.total_points));
                row
            })
            .collect(),
    )
}

/// Render the pilot list.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn pilots(pilots: &[Pilot], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(pilots)?),
        OutputFormat::Plain => Ok(if pilots.is_empty() {
            "No pilots.".to_string()
        } else {
            pilots
                .iter()
                .map(|p| format!("{:>4}  {}", p.id, p.nickname))
                .collect::<Vec<_>>()
                .join("\n")
        }),
        OutputFormat::Table => Ok(table(
            &["ID", "Nickname", "Name", "City", "Club"],
            pilots
                .iter()
                .map(|p| {
                    vec![
                        p.id.to_string(),
                        p.nickname.clone(),
                        p.full_name(),
                        p.city.clone().unwrap_or_else(|| MISSING.to_string()),
                        p.club.clone().unwrap_or_else(|| MISSING.to_string()),
                    ]
                })
                .collect(),
        )),
    }
}

/// Render one pilot with their event history.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn pilot_detail(
    pilot: &Pilot,
    participations: &[Participation],
    format: OutputFormat,
) -> Result<String> {
    if format == OutputFormat::Json {
        let value = json!({ "pilot": pilot, "participations": participations });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut lines = vec![format!("{} (#{})", pilot.nickname, pilot.id)];
    if pilot.first_name.is_some() || pilot.last_name.is_some() {
        lines.push(format!("Name:  {}", pilot.full_name()));
    }
    if let Some(city) = &pilot.city {
        lines.push(format!("City:  {city}"));
    }
    if let Some(club) = &pilot.club {
        lines.push(format!("Club:  {club}"));
    }

    let history = if participations.is_empty() {
        "No events.".to_string()
    } else if format == OutputFormat::Table {
        table(
            &["Date", "Event", "Rank", "Best 3", "Best lap"],
            participations
                .iter()
                .map(|p| {
                    vec![
                        p.event.date.to_string(),
                        p.event.name.clone(),
                        optional(p.qualification.rank),
                        format_ms(p.qualification.best3_avg_ms),
                        format_ms(p.qualification.best_lap_ms),
                    ]
                })
                .collect(),
        )
    } else {
        participations
            .iter()
            .map(|p| {
                format!(
                    "{}  {}  rank {}",
                    p.event.date,
                    p.event.name,
                    optional(p.qualification.rank)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    Ok(format!("{}\n\n{history}", lines.join("\n")))
}

/// Render dry-run scores.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn scores(scores: &[(u32, HeatScore)], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        let value: Vec<_> = scores
            .iter()
            .map(|(heat_number, score)| json!({ "heat_number": heat_number, "score": score }))
            .collect();
        return Ok(serde_json::to_string_pretty(&value)?);
    }
    if scores.is_empty() {
        return Ok("No heats.".to_string());
    }

    let blocks: Vec<String> = scores
        .iter()
        .map(|(heat_number, score)| {
            let counted: Vec<String> = score
                .selected_rounds
                .iter()
                .map(|i| (i + 1).to_string())
                .collect();
            let title = if counted.is_empty() {
                format!("Race {heat_number} (no rounds counted)")
            } else {
                format!("Race {heat_number} (rounds {} counted)", counted.join(", "))
            };

            let slots = u32::try_from(desired_rounds(*heat_number)).unwrap_or(u32::MAX);
            let rows: Vec<Vec<String>> = score
                .results
                .iter()
                .map(|r| {
                    let mut row = vec![r.final_position.to_string(), r.callsign.clone()];
                    row.extend((1..=slots).map(|slot| optional(r.round_points.get(&slot).copied())));
                    row.push(r.total_points.to_string());
                    row
                })
                .collect();

            if rows.is_empty() {
                return format!("{title}\n  nobody ranked");
            }
            let body = if format == OutputFormat::Table {
                let mut headers = vec!["Pos".to_string(), "Pilot".to_string()];
                headers.extend((1..=slots).map(|slot| format!("R{slot}")));
                headers.push("Total".to_string());
                let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
                table(&headers, rows)
            } else {
                rows.iter()
                    .map(|row| {
                        let points = &row[2..row.len() - 1];
                        format!(
                            "  {}. {}  {} pts  [{}]",
                            row[0],
                            row[1],
                            row[row.len() - 1],
                            points.join(" ")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            format!("{title}\n{body}")
        })
        .collect();

    Ok(blocks.join("\n\n"))
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

/// Lay out rows under headers with left-aligned, padded columns.
fn table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let separator: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    let mut lines = vec![
        render(headers.iter().map(|h| (*h).to_string()).collect()),
        render(separator),
    ];
    lines.extend(rows.into_iter().map(render));
    lines.join("\n")
}
