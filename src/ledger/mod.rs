//! Persistence layer — the b00n ledger.
//!
//! SQLite-backed store of per-account balances plus the append-only
//! transaction log. Every balance mutation in the system goes through
//! here, and every mutation commits the balance change and its log row
//! in one transaction: a reader never observes one without the other.
//!
//! Per-account linearizability comes from the storage layer rather than
//! application locks. The settle path is a single short transaction whose
//! balance update carries its own funds guard (`WHERE balance >= stake`),
//! so a stale pre-check read can never let two wagers spend the same
//! b00ns. Unrelated accounts are never serialized by application code.

use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info};

use crate::types::{Account, CooldownStatus, OutcomeKind, TransactionRecord, WagerError};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS accounts (
        user_id        TEXT PRIMARY KEY,
        balance        INTEGER NOT NULL CHECK (balance >= 0),
        last_gamble_at INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS transactions (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp       INTEGER NOT NULL,
        sender_id       TEXT NOT NULL,
        recipient_id    TEXT,
        amount_sent     INTEGER NOT NULL,
        amount_received INTEGER NOT NULL,
        message         TEXT NOT NULL,
        outcome         TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_transactions_sender
        ON transactions (sender_id, timestamp)",
];

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Handle to the ledger database. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
    starting_balance: i64,
}

impl Ledger {
    /// Open (or create) the ledger at `path`.
    ///
    /// WAL mode keeps readers concurrent with the write path; the busy
    /// timeout lets simultaneous settles queue instead of erroring.
    pub async fn open(path: impl AsRef<Path>, starting_balance: i64) -> Result<Self, WagerError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        info!(path = %path.as_ref().display(), starting_balance, "Ledger opened");

        Ok(Self {
            pool,
            starting_balance,
        })
    }

    /// Fetch an account, creating it with the starting balance if this is
    /// the user's first interaction.
    pub async fn get_account(&self, user_id: &str) -> Result<Account, WagerError> {
        sqlx::query(
            "INSERT OR IGNORE INTO accounts (user_id, balance, last_gamble_at) VALUES (?, ?, NULL)",
        )
        .bind(user_id)
        .bind(self.starting_balance)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT user_id, balance, last_gamble_at FROM accounts WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        account_from_row(&row)
    }

    /// Compare `now - last_gamble_at` against the cooldown duration.
    /// Accounts that never gambled (or were never seen) always pass.
    pub async fn check_cooldown(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<CooldownStatus, WagerError> {
        let row = sqlx::query("SELECT last_gamble_at FROM accounts WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let last_secs: Option<i64> = match row {
            Some(r) => r.try_get("last_gamble_at")?,
            None => None,
        };

        match last_secs.and_then(|secs| DateTime::from_timestamp(secs, 0)) {
            Some(last_at) => {
                let elapsed = now - last_at;
                if elapsed < cooldown {
                    Ok(CooldownStatus::Active {
                        remaining: cooldown - elapsed,
                    })
                } else {
                    Ok(CooldownStatus::Ready)
                }
            }
            None => Ok(CooldownStatus::Ready),
        }
    }

    /// Atomically settle a wager: re-validate funds, apply the balance
    /// delta, stamp `last_gamble_at`, and append the log row. Either the
    /// whole settle commits or nothing does.
    ///
    /// The funds guard on the UPDATE is the commit-time re-check: a stale
    /// pre-check read cannot slip through it. Fails with
    /// `InsufficientFunds` and zero mutation when the guard rejects.
    #[allow(clippy::too_many_arguments)]
    pub async fn reserve_and_settle(
        &self,
        user_id: &str,
        recipient: &str,
        stake: i64,
        payout: i64,
        outcome: OutcomeKind,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<Account, WagerError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT OR IGNORE INTO accounts (user_id, balance, last_gamble_at) VALUES (?, ?, NULL)",
        )
        .bind(user_id)
        .bind(self.starting_balance)
        .execute(&mut *tx)
        .await?;

        // payout >= 0, so the guard alone keeps the balance non-negative.
        let delta = payout - stake;
        let updated = sqlx::query(
            "UPDATE accounts SET balance = balance + ?, last_gamble_at = ?
             WHERE user_id = ? AND balance >= ?",
        )
        .bind(delta)
        .bind(now.timestamp())
        .bind(user_id)
        .bind(stake)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let balance: i64 = sqlx::query("SELECT balance FROM accounts WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?
                .try_get("balance")?;
            // Dropping the transaction rolls everything back.
            debug!(user = user_id, stake, balance, "Commit-time funds check rejected settle");
            return Err(WagerError::InsufficientFunds { stake, balance });
        }

        sqlx::query(
            "INSERT INTO transactions
                (timestamp, sender_id, recipient_id, amount_sent, amount_received, message, outcome)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(now.timestamp())
        .bind(user_id)
        .bind(recipient)
        .bind(stake)
        .bind(payout)
        .bind(message)
        .bind(outcome.as_str())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query("SELECT user_id, balance, last_gamble_at FROM accounts WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        let account = account_from_row(&row)?;

        tx.commit().await?;

        info!(
            user = user_id,
            outcome = %outcome,
            stake,
            payout,
            balance = account.balance,
            "Wager settled"
        );

        Ok(account)
    }

    /// Credit an account outside the gamble path (the `!boonsave` flow).
    /// Logs a DEPOSIT row; never touches the cooldown stamp.
    pub async fn direct_deposit(
        &self,
        user_id: &str,
        amount: i64,
        message: &str,
    ) -> Result<Account, WagerError> {
        if amount <= 0 {
            return Err(WagerError::InvalidStake(format!(
                "deposit must be positive, got b{amount}"
            )));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT OR IGNORE INTO accounts (user_id, balance, last_gamble_at) VALUES (?, ?, NULL)",
        )
        .bind(user_id)
        .bind(self.starting_balance)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE accounts SET balance = balance + ? WHERE user_id = ?")
            .bind(amount)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO transactions
                (timestamp, sender_id, recipient_id, amount_sent, amount_received, message, outcome)
             VALUES (?, ?, NULL, ?, ?, ?, ?)",
        )
        .bind(now.timestamp())
        .bind(user_id)
        .bind(amount)
        .bind(amount)
        .bind(message)
        .bind(OutcomeKind::Deposit.as_str())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query("SELECT user_id, balance, last_gamble_at FROM accounts WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        let account = account_from_row(&row)?;

        tx.commit().await?;

        info!(user = user_id, amount, balance = account.balance, "Direct deposit");

        Ok(account)
    }

    /// An account's transaction history, most recent first.
    pub async fn history(&self, user_id: &str, limit: i64) -> Result<Vec<TransactionRecord>, WagerError> {
        let rows = sqlx::query(
            "SELECT id, timestamp, sender_id, recipient_id, amount_sent, amount_received, message, outcome
             FROM transactions WHERE sender_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    /// An account's transactions within `[from, to)`, in insertion order.
    pub async fn history_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, WagerError> {
        let rows = sqlx::query(
            "SELECT id, timestamp, sender_id, recipient_id, amount_sent, amount_received, message, outcome
             FROM transactions
             WHERE sender_id = ? AND timestamp >= ? AND timestamp < ?
             ORDER BY id ASC",
        )
        .bind(user_id)
        .bind(from.timestamp())
        .bind(to.timestamp())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    /// The most recent transactions across all accounts.
    pub async fn recent(&self, limit: i64) -> Result<Vec<TransactionRecord>, WagerError> {
        let rows = sqlx::query(
            "SELECT id, timestamp, sender_id, recipient_id, amount_sent, amount_received, message, outcome
             FROM transactions ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    /// Replay an account's transaction log from the initial state and
    /// return the reconstructed balance. Must equal the stored balance —
    /// used for audit and by tests.
    pub async fn audit_balance(&self, user_id: &str) -> Result<i64, WagerError> {
        let rows = sqlx::query(
            "SELECT id, timestamp, sender_id, recipient_id, amount_sent, amount_received, message, outcome
             FROM transactions WHERE sender_id = ? ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut balance = self.starting_balance;
        for row in &rows {
            balance += record_from_row(row)?.balance_delta();
        }
        Ok(balance)
    }

    pub async fn account_count(&self) -> Result<i64, WagerError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    pub async fn transaction_count(&self) -> Result<i64, WagerError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn account_from_row(row: &SqliteRow) -> Result<Account, WagerError> {
    let last_secs: Option<i64> = row.try_get("last_gamble_at")?;
    Ok(Account {
        user_id: row.try_get("user_id")?,
        balance: row.try_get("balance")?,
        last_gamble_at: last_secs.and_then(|secs| DateTime::from_timestamp(secs, 0)),
    })
}

fn record_from_row(row: &SqliteRow) -> Result<TransactionRecord, WagerError> {
    let secs: i64 = row.try_get("timestamp")?;
    let timestamp = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        WagerError::Storage(sqlx::Error::Decode(
            format!("timestamp out of range: {secs}").into(),
        ))
    })?;

    let outcome: String = row.try_get("outcome")?;
    let outcome = outcome.parse::<OutcomeKind>().map_err(|_| {
        WagerError::Storage(sqlx::Error::Decode(
            format!("unknown outcome kind: {outcome}").into(),
        ))
    })?;

    Ok(TransactionRecord {
        id: row.try_get("id")?,
        timestamp,
        sender_id: row.try_get("sender_id")?,
        recipient_id: row.try_get("recipient_id")?,
        amount_sent: row.try_get("amount_sent")?,
        amount_received: row.try_get("amount_received")?,
        message: row.try_get("message")?,
        outcome,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
