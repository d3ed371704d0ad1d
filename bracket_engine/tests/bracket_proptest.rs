/// Property-based tests for bracket structure and progression using proptest
///
/// Random field sizes and random match outcomes are played through the pure
/// graph API; the properties must hold whichever team wins each match.
use bracket_engine::{
    BracketFormat, BracketGraph, Team, TeamId, Tournament, TournamentStatus,
    bracket::{build_bracket, progression::record_result},
    rules::{BracketShape, next_pow2},
};
use proptest::prelude::*;
use std::collections::HashMap;

fn generate(n: usize, format: BracketFormat) -> BracketGraph {
    let teams: Vec<Team> = (1..=n as u32)
        .map(|seed| Team::new(1000 + seed as TeamId, 1, seed))
        .collect();
    build_bracket(Tournament::new(1, format), &teams, format).unwrap()
}

/// Play until no match is playable; `coins` decides each winner in turn
fn play(graph: &mut BracketGraph, coins: &[bool]) -> usize {
    let mut played = 0;
    while let Some(m) = graph.playable().into_iter().next() {
        let core = m.core();
        let heads = coins[played % coins.len()];
        let winner = if heads { core.team1_id } else { core.team2_id };
        record_result(graph, core.id, winner.unwrap()).unwrap();
        played += 1;
    }
    played
}

fn loss_counts(graph: &BracketGraph) -> HashMap<TeamId, usize> {
    let mut losses = HashMap::new();
    for loser in graph.losses() {
        *losses.entry(loser).or_insert(0) += 1;
    }
    losses
}

proptest! {
    #[test]
    fn prop_shape_covers_field(n in 4usize..=32) {
        let shape = BracketShape::new(n).unwrap();
        prop_assert_eq!(shape.byes() + shape.teams_playing_round_one(), n);
        prop_assert_eq!(shape.bracket_size(), next_pow2(n));
        prop_assert_eq!(
            shape.winners_rounds(),
            (next_pow2(n) as f64).log2().ceil() as u32
        );
    }

    #[test]
    fn prop_byes_go_to_top_seeds(n in 4usize..=32) {
        let graph = generate(n, BracketFormat::SingleElimination);
        let byes = next_pow2(n) - n;
        for m in graph.winners().iter().filter(|m| m.round == 1) {
            for team in [m.team1_id, m.team2_id] {
                let seed = (team.unwrap() - 1000) as usize;
                prop_assert!(seed > byes, "seed {} played round 1 with {} byes", seed, byes);
            }
        }
    }

    #[test]
    fn prop_single_elimination_one_unbeaten(
        n in 4usize..=32,
        coins in prop::collection::vec(any::<bool>(), 1..64),
    ) {
        let mut graph = generate(n, BracketFormat::SingleElimination);
        prop_assert_eq!(graph.winners().len(), n - 1);

        let played = play(&mut graph, &coins);
        prop_assert_eq!(played, n - 1);
        prop_assert_eq!(graph.tournament.status, TournamentStatus::Completed);

        let losses = loss_counts(&graph);
        prop_assert_eq!(losses.len(), n - 1);
        prop_assert!(losses.values().all(|&count| count == 1));
        let champion = graph.champion().unwrap();
        prop_assert!(!losses.contains_key(&champion));
    }

    #[test]
    fn prop_double_elimination_loss_counts(
        n in 4usize..=32,
        coins in prop::collection::vec(any::<bool>(), 1..64),
    ) {
        let mut graph = generate(n, BracketFormat::DoubleElimination);
        prop_assert_eq!(graph.losers().len(), n - 2);

        play(&mut graph, &coins);
        prop_assert_eq!(graph.tournament.status, TournamentStatus::Completed);

        let losses = loss_counts(&graph);
        let champion = graph.champion().unwrap();
        prop_assert!(losses.get(&champion).copied().unwrap_or(0) <= 1);

        let runner_up = graph
            .championship()
            .iter()
            .filter_map(|m| m.loser_id)
            .last()
            .unwrap();
        for (&team, &count) in &losses {
            if team == runner_up {
                prop_assert!((1..=2).contains(&count));
            } else if team != champion {
                prop_assert_eq!(count, 2, "team {}", team);
            }
        }
        // Everybody but the champion was beaten at least once
        prop_assert_eq!(
            losses.keys().filter(|&&team| team != champion).count(),
            n - 1
        );
    }
}
