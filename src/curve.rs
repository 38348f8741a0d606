//! Probability curve — the risk/reward trade-off for a single wager.
//!
//! Maps a stake against the configured ceiling to a win probability and a
//! payout multiplier. A small stake relative to the ceiling wins often for
//! a modest multiplier; a stake near the ceiling rarely wins but pays out
//! close to the full `max_multiplier`.
//!
//! The curve carries no randomness and touches no state: the coin flip
//! against the returned probability happens in the engine. This keeps the
//! curve samplable by external tooling (the `gamble_debug` path) without
//! going anywhere near the ledger.

use serde::Serialize;
use tracing::debug;

use crate::types::WagerError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Curve shape parameters.
///
/// The exact closed form is a tunable, not a contract — only monotonicity
/// is: win probability strictly falls and the multiplier strictly rises as
/// stake/ceiling grows.
#[derive(Debug, Clone)]
pub struct CurveConfig {
    /// Multiplier paid at the full ceiling.
    pub max_multiplier: f64,
    /// Win probability floor, reached as stake approaches the ceiling.
    pub min_win_probability: f64,
    /// Win probability as stake approaches zero.
    pub max_win_probability: f64,
    /// Curvature of the probability drop. Higher = risk ramps up sooner.
    pub risk_exponent: f64,
    /// Curvature of the multiplier climb. Higher = big rewards arrive later.
    pub reward_exponent: f64,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            max_multiplier: 4.0,
            min_win_probability: 0.05,
            max_win_probability: 0.95,
            // With these exponents the expected value p*m stays below 1
            // across the whole domain, peaking around stake/ceiling ~ 0.3.
            risk_exponent: 1.2,
            reward_exponent: 1.5,
        }
    }
}

// ---------------------------------------------------------------------------
// Curve
// ---------------------------------------------------------------------------

/// A point on the curve for a concrete (stake, ceiling) pair.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CurvePoint {
    /// Probability of winning, in (0, 1).
    pub win_probability: f64,
    /// Multiplier applied to the stake on a win, >= 1.
    pub payout_multiplier: f64,
}

impl CurvePoint {
    /// Expected value per staked b00n (`p * m`). Below 1 with the default
    /// parameters, so the bot pays for itself over time.
    pub fn expected_value(&self) -> f64 {
        self.win_probability * self.payout_multiplier
    }
}

/// A sampled point, tagged with the stake it was computed for. Serialised
/// as JSON by the debug entry point for external plotting.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CurveSample {
    pub stake: i64,
    pub win_probability: f64,
    pub payout_multiplier: f64,
}

pub struct ProbabilityCurve {
    config: CurveConfig,
}

impl ProbabilityCurve {
    pub fn new(config: CurveConfig) -> Self {
        Self { config }
    }

    /// Access the curve configuration.
    pub fn config(&self) -> &CurveConfig {
        &self.config
    }

    /// Compute the curve point for a stake against a ceiling.
    ///
    /// Deterministic and side-effect free. Rejects out-of-domain stakes
    /// with a validation error; it never clamps silently.
    pub fn compute(&self, stake: i64, ceiling: i64) -> Result<CurvePoint, WagerError> {
        if ceiling <= 0 {
            return Err(WagerError::InvalidStake(format!(
                "ceiling must be positive, got b{ceiling}"
            )));
        }
        if stake <= 0 {
            return Err(WagerError::InvalidStake(format!(
                "stake must be positive, got b{stake}"
            )));
        }
        if stake > ceiling {
            return Err(WagerError::StakeAboveCeiling { stake, ceiling });
        }

        let risk = stake as f64 / ceiling as f64;

        let span = self.config.max_win_probability - self.config.min_win_probability;
        let win_probability = self.config.min_win_probability
            + span * (1.0 - risk).powf(self.config.risk_exponent);

        let payout_multiplier =
            1.0 + (self.config.max_multiplier - 1.0) * risk.powf(self.config.reward_exponent);

        debug!(
            stake,
            ceiling,
            risk = format!("{risk:.4}"),
            p = format!("{win_probability:.4}"),
            mult = format!("{payout_multiplier:.4}"),
            "Curve point computed"
        );

        Ok(CurvePoint {
            win_probability,
            payout_multiplier,
        })
    }

    /// Sample the curve at `steps` evenly spaced stakes across (0, ceiling].
    ///
    /// This is the debug-mode capability: pure, ledger-free, and cheap to
    /// dump as JSON for whatever plotting tool is at hand.
    pub fn sample(&self, ceiling: i64, steps: usize) -> Result<Vec<CurveSample>, WagerError> {
        if ceiling <= 0 {
            return Err(WagerError::InvalidStake(format!(
                "ceiling must be positive, got b{ceiling}"
            )));
        }

        let steps = steps.clamp(1, ceiling as usize);
        let mut samples = Vec::with_capacity(steps);
        for i in 1..=steps {
            // Spread stakes across the domain, always ending at the ceiling.
            let stake = ((ceiling as f64) * (i as f64 / steps as f64)).round() as i64;
            let stake = stake.max(1);
            let point = self.compute(stake, ceiling)?;
            samples.push(CurveSample {
                stake,
                win_probability: point.win_probability,
                payout_multiplier: point.payout_multiplier,
            });
        }
        Ok(samples)
    }
}

/// The largest stake a bot with `bank` b00ns should accept: a lucky win at
/// the full multiplier must not drain the bank below half of its contents.
pub fn max_stake_for_bank(bank: i64, max_multiplier: f64) -> i64 {
    if bank <= 0 || max_multiplier <= 0.0 {
        return 0;
    }
    (bank as f64 / max_multiplier / 2.0).floor() as i64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
