//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Everything the transport layer doesn't own lives here: the wager
//! ceiling and cooldown, the curve shape, and the ledger database path.
//! Curve parameters all default so a minimal config stays minimal.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::curve::CurveConfig;
use crate::engine::EngineConfig;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub wager: WagerConfig,
    #[serde(default)]
    pub curve: CurveSettings,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    pub name: String,
    /// The bot's platform account — recorded as the recipient on wager rows.
    pub account_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WagerConfig {
    /// Maximum stake the curve is defined over.
    pub ceiling: i64,
    /// Smallest accepted stake.
    #[serde(default = "default_min_stake")]
    pub min_stake: i64,
    /// Minimum interval between gambles per account.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Grant for accounts created on first interaction.
    #[serde(default)]
    pub starting_balance: i64,
    /// Enables the standalone curve-sampling entry point only.
    #[serde(default)]
    pub gamble_debug: bool,
}

/// Curve shape overrides. All optional; see `CurveConfig` for semantics.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CurveSettings {
    pub max_multiplier: f64,
    pub min_win_probability: f64,
    pub max_win_probability: f64,
    pub risk_exponent: f64,
    pub reward_exponent: f64,
}

impl Default for CurveSettings {
    fn default() -> Self {
        let c = CurveConfig::default();
        Self {
            max_multiplier: c.max_multiplier,
            min_win_probability: c.min_win_probability,
            max_win_probability: c.max_win_probability,
            risk_exponent: c.risk_exponent,
            reward_exponent: c.reward_exponent,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "boonbot.db".to_string(),
        }
    }
}

fn default_min_stake() -> i64 {
    1
}

// Six hours, the community's traditional gamble interval.
fn default_cooldown_secs() -> u64 {
    21_600
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine can't run with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.wager.ceiling > 0, "wager.ceiling must be positive");
        anyhow::ensure!(self.wager.min_stake > 0, "wager.min_stake must be positive");
        anyhow::ensure!(
            self.wager.min_stake <= self.wager.ceiling,
            "wager.min_stake must not exceed wager.ceiling"
        );
        anyhow::ensure!(
            self.wager.starting_balance >= 0,
            "wager.starting_balance must not be negative"
        );
        anyhow::ensure!(
            self.curve.max_multiplier >= 1.0,
            "curve.max_multiplier must be at least 1"
        );
        anyhow::ensure!(
            self.curve.min_win_probability > 0.0
                && self.curve.max_win_probability < 1.0
                && self.curve.min_win_probability < self.curve.max_win_probability,
            "curve win probabilities must satisfy 0 < min < max < 1"
        );
        Ok(())
    }

    /// The curve parameters this config selects.
    pub fn curve_config(&self) -> CurveConfig {
        CurveConfig {
            max_multiplier: self.curve.max_multiplier,
            min_win_probability: self.curve.min_win_probability,
            max_win_probability: self.curve.max_win_probability,
            risk_exponent: self.curve.risk_exponent,
            reward_exponent: self.curve.reward_exponent,
        }
    }

    /// The engine parameters this config selects.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            ceiling: self.wager.ceiling,
            min_stake: self.wager.min_stake,
            cooldown_secs: self.wager.cooldown_secs,
            bot_account: self.bot.account_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> AppConfig {
        toml::from_str(
            r#"
            [bot]
            name = "boonbot"
            account_id = "boonbot"

            [wager]
            ceiling = 100
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_minimal_config_defaults() {
        let cfg = minimal();
        assert_eq!(cfg.wager.min_stake, 1);
        assert_eq!(cfg.wager.cooldown_secs, 21_600);
        assert_eq!(cfg.wager.starting_balance, 0);
        assert!(!cfg.wager.gamble_debug);
        assert_eq!(cfg.curve.max_multiplier, 4.0);
        assert_eq!(cfg.storage.database_path, "boonbot.db");
        cfg.validate().unwrap();
    }

    #[test]
    fn test_full_config_parses() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [bot]
            name = "boonbot"
            account_id = "boonbot"

            [wager]
            ceiling = 250
            min_stake = 5
            cooldown_secs = 3600
            starting_balance = 10
            gamble_debug = true

            [curve]
            max_multiplier = 3.0
            risk_exponent = 1.5

            [storage]
            database_path = "/tmp/test.db"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.wager.ceiling, 250);
        assert_eq!(cfg.wager.min_stake, 5);
        assert!(cfg.wager.gamble_debug);
        assert_eq!(cfg.curve.max_multiplier, 3.0);
        // Unset curve fields keep their defaults.
        assert_eq!(cfg.curve.reward_exponent, 1.5);
        assert_eq!(cfg.storage.database_path, "/tmp/test.db");
        cfg.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_ceiling() {
        let mut cfg = minimal();
        cfg.wager.ceiling = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_min_stake_above_ceiling() {
        let mut cfg = minimal();
        cfg.wager.min_stake = 500;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_starting_balance() {
        let mut cfg = minimal();
        cfg.wager.starting_balance = -1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_probabilities() {
        let mut cfg = minimal();
        cfg.curve.min_win_probability = 0.9;
        cfg.curve.max_win_probability = 0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_engine_config_mapping() {
        let cfg = minimal();
        let engine = cfg.engine_config();
        assert_eq!(engine.ceiling, 100);
        assert_eq!(engine.bot_account, "boonbot");
    }

    #[test]
    fn test_load_config_file() {
        // This test requires config.toml to be in the working directory.
        // If it isn't (some test environments), that's acceptable.
        if let Ok(cfg) = AppConfig::load("config.toml") {
            assert!(cfg.wager.ceiling > 0);
            assert!(!cfg.bot.account_id.is_empty());
        }
    }

    #[test]
    fn test_load_missing_file_is_error() {
        assert!(AppConfig::load("/nonexistent/boonbot.toml").is_err());
    }
}
