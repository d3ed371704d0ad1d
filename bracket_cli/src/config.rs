//! Command-line configuration.
//!
//! Consolidates flag parsing and environment reads into one validated value.

use bracket_engine::{
    BracketFormat,
    constants::{MAX_TEAMS, MIN_TEAMS},
    db::{self, DatabaseConfig, config::parse_env_or},
};
use pico_args::Arguments;

/// What the binary was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print the generated bracket without playing it
    Preview,
    /// Generate and play every match to a champion
    Simulate,
}

/// Where brackets are stored while the command runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    Memory,
    Postgres(DatabaseConfig),
}

/// How simulated winners are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcomes {
    /// Lower seed always wins
    Favourites,
    /// Coin flip per match from a seeded generator
    Random { seed: u64 },
}

/// Complete CLI configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub command: Command,
    pub teams: usize,
    pub format: BracketFormat,
    pub storage: Storage,
    pub outcomes: Outcomes,
    pub json: bool,
}

impl CliConfig {
    /// Build the configuration from parsed arguments and the environment
    ///
    /// `random_seed` is used when `--random` is given without `--seed`.
    ///
    /// # Errors
    ///
    /// Returns error if a flag is missing, malformed or out of range
    pub fn from_args(mut pargs: Arguments, random_seed: u64) -> Result<Self, ConfigError> {
        let command = match pargs.subcommand().map_err(invalid("COMMAND"))?.as_deref() {
            Some("preview") => Command::Preview,
            Some("simulate") => Command::Simulate,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "COMMAND".to_string(),
                    reason: format!("unknown command '{other}'"),
                });
            }
            None => return Err(ConfigError::MissingCommand),
        };

        let teams = match pargs
            .opt_value_from_str::<_, usize>("--teams")
            .map_err(invalid("--teams"))?
        {
            Some(teams) => teams,
            None => parse_env_or("BRACKET_TEAMS", 8)?,
        };

        let format = match pargs
            .opt_value_from_str::<_, String>("--format")
            .map_err(invalid("--format"))?
        {
            Some(value) => BracketFormat::parse(&value).ok_or_else(|| ConfigError::Invalid {
                var: "--format".to_string(),
                reason: format!("'{value}' is not single or double"),
            })?,
            None => BracketFormat::DoubleElimination,
        };

        let database_url: Option<String> = pargs
            .opt_value_from_str("--db-url")
            .map_err(invalid("--db-url"))?;
        let storage = match database_url {
            Some(url) => Storage::Postgres(DatabaseConfig::from_env_with_url(url)?),
            None => Storage::Memory,
        };

        let seed: Option<u64> = pargs.opt_value_from_str("--seed").map_err(invalid("--seed"))?;
        let random = pargs.contains("--random");
        let outcomes = match (seed, random) {
            (Some(seed), _) => Outcomes::Random { seed },
            (None, true) => Outcomes::Random { seed: random_seed },
            (None, false) => Outcomes::Favourites,
        };

        let json = pargs.contains("--json");

        let leftover = pargs.finish();
        if !leftover.is_empty() {
            return Err(ConfigError::Invalid {
                var: "ARGS".to_string(),
                reason: format!("unexpected arguments {leftover:?}"),
            });
        }

        let config = Self {
            command,
            teams,
            format,
            storage,
            outcomes,
            json,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TEAMS..=MAX_TEAMS).contains(&self.teams) {
            return Err(ConfigError::Invalid {
                var: "--teams".to_string(),
                reason: format!("Must be between {MIN_TEAMS} and {MAX_TEAMS}"),
            });
        }

        if let Storage::Postgres(database) = &self.storage {
            database.validate()?;
        }

        Ok(())
    }
}

fn invalid(var: &'static str) -> impl Fn(pico_args::Error) -> ConfigError {
    move |e| ConfigError::Invalid {
        var: var.to_string(),
        reason: e.to_string(),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing command: expected 'preview' or 'simulate'")]
    MissingCommand,

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error(transparent)]
    Database(#[from] db::ConfigError),
}
