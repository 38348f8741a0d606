//! boonbot — offline inspection entry point.
//!
//! Loads configuration, initialises structured logging, and either dumps
//! a JSON table of probability-curve samples (`gamble_debug = true`, for
//! piping into whatever plotting tool is at hand) or opens the ledger and
//! reports its state. The operational path — polling the platform,
//! parsing commands, rendering replies — lives in the transport layer,
//! which drives this crate through `WagerEngine::resolve`.

use anyhow::Result;
use tracing::info;

use boonbot::config::AppConfig;
use boonbot::curve::ProbabilityCurve;
use boonbot::ledger::Ledger;

const BANNER: &str = r#"
 _                       _           _
| |__   ___   ___  _ __ | |__   ___ | |_
| '_ \ / _ \ / _ \| '_ \| '_ \ / _ \| __|
| |_) | (_) | (_) | | | | |_) | (_) | |_
|_.__/ \___/ \___/|_| |_|_.__/ \___/ \__|

  wager engine & b00n ledger
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        bot = %cfg.bot.name,
        ceiling = cfg.wager.ceiling,
        cooldown_secs = cfg.wager.cooldown_secs,
        min_stake = cfg.wager.min_stake,
        "boonbot starting up"
    );

    // Debug mode: sample the curve and exit. Requires no ledger.
    if cfg.wager.gamble_debug {
        let curve = ProbabilityCurve::new(cfg.curve_config());
        let samples = curve.sample(cfg.wager.ceiling, 50)?;
        info!(points = samples.len(), "Sampling probability curve");
        println!("{}", serde_json::to_string_pretty(&samples)?);
        return Ok(());
    }

    let ledger = Ledger::open(&cfg.storage.database_path, cfg.wager.starting_balance).await?;

    info!(
        accounts = ledger.account_count().await?,
        transactions = ledger.transaction_count().await?,
        "Ledger state"
    );

    for record in ledger.recent(10).await? {
        info!(%record, "recent transaction");
    }

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("boonbot=info"));

    let json_logging = std::env::var("BOONBOT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
