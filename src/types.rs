//! Shared types for the boonbot core.
//!
//! These types form the data model used across all modules: accounts,
//! transaction records, wager requests/results, and the error taxonomy.
//! They are designed to be stable so that the curve, ledger, and engine
//! modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Outcome kind
// ---------------------------------------------------------------------------

/// How a balance-changing operation resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    Win,
    Loss,
    Deposit,
}

impl OutcomeKind {
    /// All known outcome kinds (useful for iteration).
    pub const ALL: &'static [OutcomeKind] =
        &[OutcomeKind::Win, OutcomeKind::Loss, OutcomeKind::Deposit];

    /// Stable string form used in the transaction log.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Win => "WIN",
            OutcomeKind::Loss => "LOSS",
            OutcomeKind::Deposit => "DEPOSIT",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OutcomeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WIN" => Ok(OutcomeKind::Win),
            "LOSS" => Ok(OutcomeKind::Loss),
            "DEPOSIT" => Ok(OutcomeKind::Deposit),
            _ => Err(anyhow::anyhow!("Unknown outcome kind: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A per-user account. Owned exclusively by the ledger; created lazily on
/// first interaction and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    /// Balance in whole b00ns. Never negative.
    pub balance: i64,
    /// When the user last gambled. `None` means never.
    pub last_gamble_at: Option<DateTime<Utc>>,
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_gamble_at {
            Some(at) => write!(f, "{} b{} (last gamble {})", self.user_id, self.balance, at),
            None => write!(f, "{} b{} (never gambled)", self.user_id, self.balance),
        }
    }
}

impl Account {
    /// Whether the account can cover a stake.
    pub fn can_cover(&self, stake: i64) -> bool {
        stake <= self.balance
    }
}

// ---------------------------------------------------------------------------
// Transaction record
// ---------------------------------------------------------------------------

/// One row of the append-only transaction log. Immutable once written;
/// insertion order is chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Insertion-ordered row id assigned by the ledger.
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub sender_id: String,
    /// The bot's own account for wagers, `None` for deposits.
    pub recipient_id: Option<String>,
    /// What the sender put in (stake, or deposit amount).
    pub amount_sent: i64,
    /// What came back to the sender (payout, or deposit amount credited).
    pub amount_received: i64,
    /// The original command text, kept verbatim for audit.
    pub message: String,
    pub outcome: OutcomeKind,
}

impl TransactionRecord {
    /// The balance delta this record applied to the sender's account.
    ///
    /// Replaying these deltas in insertion order from the initial balance
    /// must reproduce the account's stored balance exactly.
    pub fn balance_delta(&self) -> i64 {
        match self.outcome {
            OutcomeKind::Deposit => self.amount_received,
            OutcomeKind::Win | OutcomeKind::Loss => self.amount_received - self.amount_sent,
        }
    }
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}] {} {} sent=b{} received=b{}",
            self.id,
            self.timestamp,
            self.outcome,
            self.sender_id,
            self.amount_sent,
            self.amount_received,
        )
    }
}

// ---------------------------------------------------------------------------
// Wager request & result
// ---------------------------------------------------------------------------

/// Transient input to the engine — an already-parsed command from the
/// transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WagerRequest {
    pub sender_id: String,
    /// Stake in whole b00ns (or the deposit amount when `direct_deposit`).
    pub stake: i64,
    /// The raw command text, logged verbatim.
    pub message: String,
    /// Bypass the gamble and credit the account directly.
    pub direct_deposit: bool,
}

impl WagerRequest {
    /// A plain wager request.
    pub fn wager(sender_id: impl Into<String>, stake: i64, message: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            stake,
            message: message.into(),
            direct_deposit: false,
        }
    }

    /// A direct-deposit request (the `!boonsave` path).
    pub fn deposit(sender_id: impl Into<String>, amount: i64, message: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            stake: amount,
            message: message.into(),
            direct_deposit: true,
        }
    }
}

/// Transient output of a settled request, returned to the transport layer
/// for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WagerResult {
    pub outcome: OutcomeKind,
    /// Amount credited back to the sender (0 on a loss).
    pub payout: i64,
    pub new_balance: i64,
    /// The curve probability the draw was made against. `None` for deposits.
    pub win_probability: Option<f64>,
}

impl fmt::Display for WagerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.win_probability {
            Some(p) => write!(
                f,
                "{} payout=b{} balance=b{} (p={:.3})",
                self.outcome, self.payout, self.new_balance, p,
            ),
            None => write!(
                f,
                "{} payout=b{} balance=b{}",
                self.outcome, self.payout, self.new_balance,
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Cooldown status
// ---------------------------------------------------------------------------

/// Result of a cooldown check against the configured duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CooldownStatus {
    Ready,
    Active { remaining: chrono::Duration },
}

impl CooldownStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, CooldownStatus::Ready)
    }
}

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Domain errors for the wager core.
///
/// Everything except `Storage` is a rejection: an ordinary, expected
/// outcome the caller renders back to the user. `Storage` is the only
/// fault treated as fatal for the request.
#[derive(Debug, thiserror::Error)]
pub enum WagerError {
    #[error("invalid stake: {0}")]
    InvalidStake(String),

    #[error("stake b{stake} exceeds the ceiling of b{ceiling}")]
    StakeAboveCeiling { stake: i64, ceiling: i64 },

    #[error("cooldown active: {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: i64 },

    #[error("insufficient funds: staked b{stake}, balance b{balance}")]
    InsufficientFunds { stake: i64, balance: i64 },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl WagerError {
    /// Whether this is an expected rejection rather than a fault.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, WagerError::Storage(_))
    }
}

/// Format a second count as HH:MM:SS for cooldown messaging.
pub fn format_hhmmss(total_secs: i64) -> String {
    let secs = total_secs.max(0);
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
