//! End-to-end wager flows over a real ledger file.
//!
//! Drives the public engine API the way the transport layer does:
//! deposits, wagers, rejections, and concurrent traffic, asserting the
//! ledger invariants hold at every step (balance never negative, one log
//! row per balance change, replaying the log reproduces the balance).

use std::sync::Arc;

use futures::future::join_all;

use boonbot::curve::{CurveConfig, ProbabilityCurve};
use boonbot::engine::{EngineConfig, WagerEngine};
use boonbot::ledger::Ledger;
use boonbot::types::{OutcomeKind, WagerError, WagerRequest};

fn temp_path() -> std::path::PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("boonbot_test_flow_{}.db", uuid::Uuid::new_v4()));
    p
}

async fn engine_with(config: EngineConfig, starting_balance: i64) -> WagerEngine {
    let ledger = Ledger::open(temp_path(), starting_balance).await.unwrap();
    WagerEngine::new(ledger, ProbabilityCurve::new(CurveConfig::default()), config)
}

#[tokio::test]
async fn deposit_on_fresh_account() {
    let engine = engine_with(EngineConfig::default(), 0).await;

    let result = engine
        .resolve(&WagerRequest::deposit("n00b", 25, "!boonsave"))
        .await
        .unwrap();

    assert_eq!(result.outcome, OutcomeKind::Deposit);
    assert_eq!(result.new_balance, 25);

    let account = engine.ledger().get_account("n00b").await.unwrap();
    assert_eq!(account.balance, 25);
    assert!(account.last_gamble_at.is_none());

    let history = engine.ledger().history("n00b", 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].outcome, OutcomeKind::Deposit);
    assert_eq!(history[0].amount_received, 25);
}

#[tokio::test]
async fn back_to_back_wagers_hit_cooldown() {
    let engine = engine_with(EngineConfig::default(), 0).await;
    engine
        .resolve(&WagerRequest::deposit("n00b", 100, "!boonsave"))
        .await
        .unwrap();

    let first = engine
        .resolve(&WagerRequest::wager("n00b", 10, "b10"))
        .await
        .unwrap();
    let rows_after_first = engine.ledger().transaction_count().await.unwrap();

    let err = engine
        .resolve(&WagerRequest::wager("n00b", 10, "b10 again"))
        .await
        .unwrap_err();
    assert!(matches!(err, WagerError::CooldownActive { .. }));

    // The rejection caused zero balance change and no log row.
    let account = engine.ledger().get_account("n00b").await.unwrap();
    assert_eq!(account.balance, first.new_balance);
    assert_eq!(
        engine.ledger().transaction_count().await.unwrap(),
        rows_after_first
    );
}

#[tokio::test]
async fn rejections_are_distinguishable_for_messaging() {
    let engine = engine_with(EngineConfig::default(), 0).await;
    engine
        .resolve(&WagerRequest::deposit("n00b", 50, "!boonsave"))
        .await
        .unwrap();

    // Funds rejection: balance 50, stake 90 against the 100 ceiling.
    let funds = engine
        .resolve(&WagerRequest::wager("n00b", 90, "b90"))
        .await
        .unwrap_err();
    assert!(funds.is_rejection());
    assert!(matches!(
        funds,
        WagerError::InsufficientFunds { stake: 90, balance: 50 }
    ));

    // Validation rejection: over the ceiling, before any state access.
    let validation = engine
        .resolve(&WagerRequest::wager("n00b", 500, "b500"))
        .await
        .unwrap_err();
    assert!(validation.is_rejection());
    assert!(matches!(validation, WagerError::StakeAboveCeiling { .. }));

    // A wager that goes through arms the cooldown for the next one.
    engine
        .resolve(&WagerRequest::wager("n00b", 10, "b10"))
        .await
        .unwrap();
    let cooldown = engine
        .resolve(&WagerRequest::wager("n00b", 10, "b10"))
        .await
        .unwrap_err();
    assert!(cooldown.is_rejection());
    assert!(matches!(cooldown, WagerError::CooldownActive { .. }));
}

#[tokio::test]
async fn losing_the_whole_balance_leaves_exactly_zero() {
    // No cooldown, huge ceiling: keep staking the full balance until a
    // loss lands. The loss must leave exactly 0, and the next wager must
    // be a funds rejection.
    let engine = engine_with(
        EngineConfig {
            ceiling: 1_000_000,
            cooldown_secs: 0,
            ..Default::default()
        },
        0,
    )
    .await;
    engine
        .resolve(&WagerRequest::deposit("n00b", 100, "!boonsave"))
        .await
        .unwrap();

    let mut balance = 100;
    for _ in 0..10_000 {
        let result = engine
            .resolve(&WagerRequest::wager("n00b", balance, "all in"))
            .await
            .unwrap();
        match result.outcome {
            OutcomeKind::Win => {
                assert_eq!(result.new_balance, result.payout);
                balance = result.new_balance;
            }
            OutcomeKind::Loss => {
                assert_eq!(result.new_balance, 0);
                balance = 0;
                break;
            }
            OutcomeKind::Deposit => unreachable!(),
        }
    }
    assert_eq!(balance, 0, "a loss should have landed well within bounds");

    let err = engine
        .resolve(&WagerRequest::wager("n00b", 1, "b1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WagerError::InsufficientFunds { stake: 1, balance: 0 }
    ));

    // The log replays to the same zero.
    assert_eq!(engine.ledger().audit_balance("n00b").await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_wagers_never_lose_updates() {
    // Eight tasks race full-balance wagers with no cooldown. However the
    // draws land, the stored balance must equal the log replay, stay
    // non-negative, and every rejection must be typed.
    let engine = Arc::new(
        engine_with(
            EngineConfig {
                cooldown_secs: 0,
                ..Default::default()
            },
            0,
        )
        .await,
    );
    engine
        .resolve(&WagerRequest::deposit("n00b", 100, "!boonsave"))
        .await
        .unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .resolve(&WagerRequest::wager("n00b", 100, format!("racer {i}")))
                    .await
            })
        })
        .collect();

    let mut settled = 0;
    for outcome in join_all(tasks).await {
        match outcome.unwrap() {
            Ok(result) => {
                settled += 1;
                assert!(result.new_balance >= 0);
            }
            Err(e) => assert!(e.is_rejection(), "unexpected fault: {e}"),
        }
    }
    assert!(settled >= 1, "at least the first racer must settle");

    let account = engine.ledger().get_account("n00b").await.unwrap();
    assert!(account.balance >= 0);
    assert_eq!(
        engine.ledger().audit_balance("n00b").await.unwrap(),
        account.balance
    );

    // One deposit row plus one row per settled wager — rejections write nothing.
    assert_eq!(
        engine.ledger().transaction_count().await.unwrap(),
        1 + settled
    );
}

#[tokio::test]
async fn unrelated_users_proceed_independently() {
    let engine = Arc::new(
        engine_with(
            EngineConfig {
                cooldown_secs: 0,
                ..Default::default()
            },
            0,
        )
        .await,
    );

    let users = ["alice", "bob", "carol", "dave"];
    for user in users {
        engine
            .resolve(&WagerRequest::deposit(user, 100, "!boonsave"))
            .await
            .unwrap();
    }

    let tasks: Vec<_> = users
        .iter()
        .map(|user| {
            let engine = Arc::clone(&engine);
            let user = user.to_string();
            tokio::spawn(async move {
                for stake in [10, 20, 30] {
                    engine
                        .resolve(&WagerRequest::wager(user.as_str(), stake, format!("b{stake}")))
                        .await
                        .unwrap();
                }
            })
        })
        .collect();
    for task in join_all(tasks).await {
        task.unwrap();
    }

    // Every account replays cleanly and stayed within bounds.
    for user in users {
        let account = engine.ledger().get_account(user).await.unwrap();
        assert!(account.balance >= 0);
        assert_eq!(
            engine.ledger().audit_balance(user).await.unwrap(),
            account.balance
        );
        // Deposit + three wagers.
        assert_eq!(engine.ledger().history(user, 10).await.unwrap().len(), 4);
    }
}
