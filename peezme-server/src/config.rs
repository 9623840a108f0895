use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use peezme_core::{GameRules, HazardCounts, HazardEffects};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `memory` keeps everything in process.
    pub database_url: String,
    pub words_directory: String,
    pub ticket_ttl_seconds: i64,
    pub round_time_seconds: u32,
    pub words_per_game: usize,
    pub max_plays: Option<u32>,
    pub target_score: Option<i32>,
    pub board_size: u32,
    pub barrier_count: usize,
    pub obstacle_count: usize,
    pub reward_count: usize,
    pub obstacle_penalty: i32,
    pub reward_bonus: i32,
    pub reward_flips_direction: bool,
    pub max_room_size: u32,
    pub pool_min_players: usize,
    pub pool_max_players: usize,
    pub respond_retry_attempts: u32,
    pub respond_retry_backoff_ms: u64,
    pub sweep_interval_seconds: u64,
    pub service_name: String,
    pub service_revision: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse(&lookup, "PORT", defaults.port)?,
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            words_directory: lookup("WORDS_DIRECTORY").unwrap_or(defaults.words_directory),
            ticket_ttl_seconds: parse(&lookup, "TICKET_TTL_SECONDS", defaults.ticket_ttl_seconds)?,
            round_time_seconds: parse(&lookup, "ROUND_TIME_SECONDS", defaults.round_time_seconds)?,
            words_per_game: parse(&lookup, "WORDS_PER_GAME", defaults.words_per_game)?,
            max_plays: optional_limit(&lookup, "MAX_PLAYS")?,
            target_score: optional_limit(&lookup, "TARGET_SCORE")?,
            board_size: parse(&lookup, "BOARD_SIZE", defaults.board_size)?,
            barrier_count: parse(&lookup, "BARRIER_COUNT", defaults.barrier_count)?,
            obstacle_count: parse(&lookup, "OBSTACLE_COUNT", defaults.obstacle_count)?,
            reward_count: parse(&lookup, "REWARD_COUNT", defaults.reward_count)?,
            obstacle_penalty: parse(&lookup, "OBSTACLE_PENALTY", defaults.obstacle_penalty)?,
            reward_bonus: parse(&lookup, "REWARD_BONUS", defaults.reward_bonus)?,
            reward_flips_direction: parse(
                &lookup,
                "REWARD_FLIPS_DIRECTION",
                defaults.reward_flips_direction,
            )?,
            max_room_size: parse(&lookup, "MAX_ROOM_SIZE", defaults.max_room_size)?,
            pool_min_players: parse(&lookup, "POOL_MIN_PLAYERS", defaults.pool_min_players)?,
            pool_max_players: parse(&lookup, "POOL_MAX_PLAYERS", defaults.pool_max_players)?,
            respond_retry_attempts: parse(
                &lookup,
                "RESPOND_RETRY_ATTEMPTS",
                defaults.respond_retry_attempts,
            )?,
            respond_retry_backoff_ms: parse(
                &lookup,
                "RESPOND_RETRY_BACKOFF_MS",
                defaults.respond_retry_backoff_ms,
            )?,
            sweep_interval_seconds: parse(
                &lookup,
                "SWEEP_INTERVAL_SECONDS",
                defaults.sweep_interval_seconds,
            )?,
            service_name: lookup("SERVICE_NAME").unwrap_or(defaults.service_name),
            service_revision: lookup("SERVICE_REVISION").unwrap_or(defaults.service_revision),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.round_time_seconds == 0 {
            return Err(anyhow!("ROUND_TIME_SECONDS must be positive"));
        }
        if self.ticket_ttl_seconds <= 0 {
            return Err(anyhow!("TICKET_TTL_SECONDS must be positive"));
        }
        if self.board_size == 0 {
            return Err(anyhow!("BOARD_SIZE must be positive"));
        }
        if self.words_per_game == 0 {
            return Err(anyhow!("WORDS_PER_GAME must be positive"));
        }
        if self.pool_min_players == 0 || self.pool_min_players > self.pool_max_players {
            return Err(anyhow!(
                "POOL_MIN_PLAYERS ({}) must be between 1 and POOL_MAX_PLAYERS ({})",
                self.pool_min_players,
                self.pool_max_players
            ));
        }
        if self.pool_max_players > self.max_room_size as usize {
            return Err(anyhow!(
                "POOL_MAX_PLAYERS ({}) exceeds MAX_ROOM_SIZE ({})",
                self.pool_max_players,
                self.max_room_size
            ));
        }
        Ok(())
    }

    pub fn game_rules(&self) -> GameRules {
        GameRules {
            round_time: self.round_time_seconds,
            board_size: self.board_size,
            max_plays: self.max_plays,
            target_score: self.target_score,
            hazard_counts: HazardCounts {
                barriers: self.barrier_count,
                obstacles: self.obstacle_count,
                rewards: self.reward_count,
            },
            effects: HazardEffects {
                obstacle_penalty: self.obstacle_penalty,
                reward_bonus: self.reward_bonus,
                reward_flips_direction: self.reward_flips_direction,
            },
        }
    }

    pub fn ticket_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ticket_ttl_seconds)
    }

    pub fn respond_backoff(&self) -> Duration {
        Duration::from_millis(self.respond_retry_backoff_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        let rules = GameRules::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: "sqlite://peezme.db?mode=rwc".to_string(),
            words_directory: "./words".to_string(),
            ticket_ttl_seconds: 300,
            round_time_seconds: rules.round_time,
            words_per_game: 5,
            max_plays: None,
            target_score: None,
            board_size: rules.board_size,
            barrier_count: rules.hazard_counts.barriers,
            obstacle_count: rules.hazard_counts.obstacles,
            reward_count: rules.hazard_counts.rewards,
            obstacle_penalty: rules.effects.obstacle_penalty,
            reward_bonus: rules.effects.reward_bonus,
            reward_flips_direction: rules.effects.reward_flips_direction,
            max_room_size: 8,
            pool_min_players: 2,
            pool_max_players: 4,
            respond_retry_attempts: 5,
            respond_retry_backoff_ms: 20,
            sweep_interval_seconds: 15,
            service_name: "peezme".to_string(),
            service_revision: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("Invalid {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

/// Unset or zero disables the limit.
fn optional_limit<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr + Default + PartialEq,
    T::Err: Display,
{
    let value: T = parse(lookup, key, T::default())?;
    Ok((value != T::default()).then_some(value))
}
