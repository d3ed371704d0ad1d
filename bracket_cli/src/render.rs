//! Plain-text rendering of a bracket.

use std::fmt::Write;

use bracket_engine::{BracketView, LosersMatch, Match, MatchId, TeamId};
use std::collections::HashMap;

/// Short label for every match, used to print links
fn labels(view: &BracketView) -> HashMap<MatchId, String> {
    let mut labels = HashMap::new();
    for m in &view.winners {
        labels.insert(m.id, format!("W{}-{}", m.round, m.match_number));
    }
    for m in &view.losers {
        labels.insert(m.base.id, format!("L{}-{}", m.base.round, m.display_number()));
    }
    for m in &view.championship {
        let name = if m.is_reset() { "Reset" } else { "Final" };
        labels.insert(m.id, name.to_string());
    }
    labels
}

fn team(team_id: Option<TeamId>, waiting_for: &str) -> String {
    match team_id {
        Some(id) => format!("#{id}"),
        None => waiting_for.to_string(),
    }
}

fn result(m: &Match) -> String {
    match m.winner_id {
        Some(winner) => format!("  winner #{winner}"),
        None => String::new(),
    }
}

fn next(m: &Match, labels: &HashMap<MatchId, String>) -> String {
    m.next_match_id
        .and_then(|id| labels.get(&id))
        .map(|label| format!(" -> {label}"))
        .unwrap_or_default()
}

fn losers_source(m: &LosersMatch, team1: bool, labels: &HashMap<MatchId, String>) -> String {
    let (from_winners, round, number, from_match) = if team1 {
        (
            m.team1_from_winners,
            m.team1_winners_round,
            m.team1_winners_match_number,
            m.team1_from_match_id,
        )
    } else {
        (
            m.team2_from_winners,
            m.team2_winners_round,
            m.team2_winners_match_number,
            m.team2_from_match_id,
        )
    };

    if from_winners {
        format!(
            "loser W{}-{}",
            round.unwrap_or_default(),
            number.unwrap_or_default()
        )
    } else {
        from_match
            .and_then(|id| labels.get(&id))
            .map(|label| format!("winner {label}"))
            .unwrap_or_else(|| "?".to_string())
    }
}

/// Render the whole bracket, one match per line
pub fn render(view: &BracketView) -> String {
    let labels = labels(view);
    let label = |id: MatchId| labels.get(&id).cloned().unwrap_or_default();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Tournament {} ({}, {})",
        view.tournament.id,
        view.tournament.format,
        view.tournament.status.as_str()
    );

    let _ = writeln!(out, "\nWinners bracket");
    for m in &view.winners {
        let waiting = if m.has_bye { "(bye, awaiting)" } else { "TBD" };
        let _ = writeln!(
            out,
            "  {:<8} {:>6} vs {:<16}{}{}",
            label(m.id),
            team(m.team1_id, "TBD"),
            team(m.team2_id, waiting),
            next(m, &labels),
            result(m)
        );
    }

    if !view.losers.is_empty() {
        let _ = writeln!(out, "\nLosers bracket");
        for m in &view.losers {
            let qualifier = if m.is_championship_qualifier {
                " -> Final"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "  {:<8} {:>6} vs {:<16}{}{}{}",
                label(m.base.id),
                team(m.base.team1_id, &losers_source(m, true, &labels)),
                team(m.base.team2_id, &losers_source(m, false, &labels)),
                next(&m.base, &labels),
                qualifier,
                result(&m.base)
            );
        }
    }

    if !view.championship.is_empty() {
        let _ = writeln!(out, "\nChampionship");
        for m in &view.championship {
            let _ = writeln!(
                out,
                "  {:<8} {:>6} vs {:<16}{}{}",
                label(m.id),
                team(m.team1_id, "winners champion"),
                team(m.team2_id, "losers champion"),
                next(m, &labels),
                result(m)
            );
        }
    }

    if let Some(champion) = view.champion {
        let _ = writeln!(out, "\nChampion: #{champion}");
    }

    out
}
