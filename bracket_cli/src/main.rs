//! Elimination bracket preview and simulation tool.
//!
//! Generates a bracket for a seeded field and either prints it or plays it
//! out to a champion, on the in-memory store or on PostgreSQL.

mod config;
mod render;

use std::sync::Arc;

use anyhow::{Context, Error};
use bracket_engine::{
    BracketManager, BracketMatch, Team, TeamId, TournamentId,
    db::{BracketStore, Database, MemoryBracketStore},
};
use config::{CliConfig, Command, Outcomes, Storage};
use log::info;
use pico_args::Arguments;
use rand::{Rng, SeedableRng, rngs::StdRng};

const HELP: &str = "\
Preview and simulate single- and double-elimination brackets

USAGE:
  bracket_cli <COMMAND> [OPTIONS]

COMMANDS:
  preview                  Print the generated bracket
  simulate                 Play every match and print the result

OPTIONS:
  --teams      N           Number of seeded teams, 4 to 32  [default: env BRACKET_TEAMS or 8]
  --format     FORMAT      single or double  [default: double]
  --db-url     URL         Store the bracket in PostgreSQL instead of memory
  --seed       N           Decide simulated matches with a seeded coin flip

FLAGS:
  --random                 Coin-flip winners with a fresh seed (favourites win otherwise)
  --json                   Print the bracket as JSON
  -h, --help               Print help information

ENVIRONMENT:
  RUST_LOG                 Log filter (e.g., info, bracket_engine=debug)
  BRACKET_TX_TIMEOUT_SECS  Upper bound on one bracket transaction
  DB_MAX_CONNECTIONS       Pool size when --db-url is given
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    env_logger::builder().format_target(false).init();

    let config = CliConfig::from_args(pargs, rand::rng().random())?;

    match &config.storage {
        Storage::Memory => {
            let store = MemoryBracketStore::new();
            run(&config, store).await
        }
        Storage::Postgres(database) => {
            info!("Connecting to database");
            let db = Database::new(database)
                .await
                .context("Failed to connect to database")?;
            let store = db.bracket_store();
            store
                .run_migrations()
                .await
                .context("Failed to apply bracket schema")?;
            run(&config, store).await?;
            db.close().await;
            Ok(())
        }
    }
}

async fn run<S: BracketStore>(config: &CliConfig, store: S) -> Result<(), Error> {
    let manager = BracketManager::new(Arc::new(store));

    let tournament_id = manager.create_tournament(config.format).await?;
    let teams: Vec<Team> = (1..=config.teams as u32)
        .map(|seed| Team::new(seed as TeamId, tournament_id, seed))
        .collect();
    manager
        .generate_bracket(tournament_id, &teams, config.format)
        .await?;

    if config.command == Command::Simulate {
        let played = simulate(&manager, tournament_id, config.outcomes).await?;
        info!("Played {} matches", played);
    }

    let view = manager.get_bracket_by_tournament(tournament_id).await?;
    if config.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", render::render(&view));
    }

    Ok(())
}

/// Play every match in order until no match is left
async fn simulate<S: BracketStore>(
    manager: &BracketManager<S>,
    tournament_id: TournamentId,
    outcomes: Outcomes,
) -> Result<usize, Error> {
    let mut rng = match outcomes {
        Outcomes::Favourites => None,
        Outcomes::Random { seed } => {
            info!("Simulating with seed {}", seed);
            Some(StdRng::seed_from_u64(seed))
        }
    };

    let mut played = 0;
    while let Some(next) = manager
        .playable_matches(tournament_id)
        .await?
        .into_iter()
        .next()
    {
        let winner = pick_winner(&next, rng.as_mut())?;
        manager.record_result(next.id(), winner).await?;
        played += 1;
    }

    Ok(played)
}

fn pick_winner(m: &BracketMatch, rng: Option<&mut StdRng>) -> Result<TeamId, Error> {
    let core = m.core();
    let (Some(team1), Some(team2)) = (core.team1_id, core.team2_id) else {
        anyhow::bail!("match {} is not ready to be played", core.id);
    };

    Ok(match rng {
        Some(rng) => {
            if rng.random_bool(0.5) {
                team2
            } else {
                team1
            }
        }
        None => team1.min(team2),
    })
}
