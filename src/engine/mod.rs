//! Wager engine — orchestrates one wager per inbound request.
//!
//! The transport layer hands us an already-parsed request; we validate,
//! enforce the cooldown, draw the outcome against the probability curve,
//! and commit the settlement through the ledger. Every rejection comes
//! back as a typed error the caller renders; only a storage fault is
//! treated as exceptional for the request.

use chrono::{Duration, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::curve::{CurvePoint, ProbabilityCurve};
use crate::ledger::Ledger;
use crate::types::{CooldownStatus, OutcomeKind, WagerError, WagerRequest, WagerResult};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Engine parameters, supplied at construction (no ambient globals).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum stake the curve is defined over.
    pub ceiling: i64,
    /// Smallest accepted stake.
    pub min_stake: i64,
    /// Minimum interval between gambles per account.
    pub cooldown_secs: u64,
    /// The bot's account — recorded as the counterparty on wager rows.
    pub bot_account: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ceiling: 100,
            min_stake: 1,
            cooldown_secs: 21_600,
            bot_account: "boonbot".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct WagerEngine {
    ledger: Ledger,
    curve: ProbabilityCurve,
    config: EngineConfig,
}

impl WagerEngine {
    pub fn new(ledger: Ledger, curve: ProbabilityCurve, config: EngineConfig) -> Self {
        Self {
            ledger,
            curve,
            config,
        }
    }

    /// The ledger this engine settles against (for stats and audit).
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn cooldown(&self) -> Duration {
        Duration::seconds(self.config.cooldown_secs as i64)
    }

    /// Resolve one request: deposit directly, or run the wager state
    /// machine (validate → cooldown → funds → draw → settle).
    pub async fn resolve(&self, req: &WagerRequest) -> Result<WagerResult, WagerError> {
        if req.direct_deposit {
            return self.deposit(req).await;
        }

        self.validate_stake(req.stake)?;

        match self
            .ledger
            .check_cooldown(&req.sender_id, Utc::now(), self.cooldown())
            .await?
        {
            CooldownStatus::Ready => {}
            CooldownStatus::Active { remaining } => {
                // Round up so we never tell a user to wait 0 seconds.
                let remaining_secs = (remaining.num_milliseconds() + 999) / 1000;
                debug!(user = %req.sender_id, remaining_secs, "Wager hit cooldown");
                return Err(WagerError::CooldownActive { remaining_secs });
            }
        }

        let account = self.ledger.get_account(&req.sender_id).await?;
        if !account.can_cover(req.stake) {
            debug!(
                user = %req.sender_id,
                stake = req.stake,
                balance = account.balance,
                "Wager exceeds balance"
            );
            return Err(WagerError::InsufficientFunds {
                stake: req.stake,
                balance: account.balance,
            });
        }

        let point = self.curve.compute(req.stake, self.config.ceiling)?;
        let roll: f64 = rand::rng().random();
        self.settle(req, point, roll).await
    }

    /// Commit the outcome a roll decides. Split from `resolve` so the
    /// draw can be forced deterministically in tests.
    async fn settle(
        &self,
        req: &WagerRequest,
        point: CurvePoint,
        roll: f64,
    ) -> Result<WagerResult, WagerError> {
        let (outcome, payout) = decide(req.stake, &point, roll);

        let settled = self
            .ledger
            .reserve_and_settle(
                &req.sender_id,
                &self.config.bot_account,
                req.stake,
                payout,
                outcome,
                &req.message,
                Utc::now(),
            )
            .await;

        let account = match settled {
            Ok(account) => account,
            Err(e @ WagerError::InsufficientFunds { .. }) => {
                // A concurrent operation spent the balance between the
                // pre-check and the commit. Surface it, don't retry.
                warn!(user = %req.sender_id, "Funds changed between pre-check and settle");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        info!(
            user = %req.sender_id,
            outcome = %outcome,
            stake = req.stake,
            payout,
            p = format!("{:.3}", point.win_probability),
            balance = account.balance,
            "Wager resolved"
        );

        Ok(WagerResult {
            outcome,
            payout,
            new_balance: account.balance,
            win_probability: Some(point.win_probability),
        })
    }

    /// The `!boonsave` path: credit the account, skip the curve entirely.
    async fn deposit(&self, req: &WagerRequest) -> Result<WagerResult, WagerError> {
        if req.stake <= 0 {
            return Err(WagerError::InvalidStake(format!(
                "deposit must be positive, got b{}",
                req.stake
            )));
        }

        let account = self
            .ledger
            .direct_deposit(&req.sender_id, req.stake, &req.message)
            .await?;

        Ok(WagerResult {
            outcome: OutcomeKind::Deposit,
            payout: req.stake,
            new_balance: account.balance,
            win_probability: None,
        })
    }

    fn validate_stake(&self, stake: i64) -> Result<(), WagerError> {
        if stake <= 0 {
            return Err(WagerError::InvalidStake(format!(
                "stake must be positive, got b{stake}"
            )));
        }
        if stake < self.config.min_stake {
            return Err(WagerError::InvalidStake(format!(
                "stake b{stake} is below the b{} minimum",
                self.config.min_stake
            )));
        }
        if stake > self.config.ceiling {
            return Err(WagerError::StakeAboveCeiling {
                stake,
                ceiling: self.config.ceiling,
            });
        }
        Ok(())
    }
}

/// Pure outcome decision for a uniform roll in [0, 1): WIN iff the roll
/// lands under the curve probability; payout is the stake times the
/// multiplier, floored to whole b00ns.
fn decide(stake: i64, point: &CurvePoint, roll: f64) -> (OutcomeKind, i64) {
    if roll < point.win_probability {
        let payout = (stake as f64 * point.payout_multiplier).floor() as i64;
        (OutcomeKind::Win, payout)
    } else {
        (OutcomeKind::Loss, 0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
