use std::{env, fs, path::Path, time::Instant};

use anyhow::{Context, Result};
use stockgym::prelude::*;
use time::macros::format_description;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

// === BEGIN JEMALLOC CONFIG ===
#[cfg(target_os = "linux")]
use tikv_jemallocator::Jemalloc;

#[cfg(target_os = "linux")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;
// === END JEMALLOC CONFIG ===

const EPISODES: usize = 2_000;
const PERIODS: usize = 20;

fn main() -> Result<()> {
    let _guard = init_tracing()?;

    println!("Starting training process...");

    let config = StockConfig::from(StockPreset::Default).with_seed(42);
    let mut stock = SimpleStock::new(config.clone()).context("Failed to build stock")?;

    let mut baseline = RandomTrader::for_stock(&config, Some(42));
    let baseline_start = Instant::now();
    let baseline_report = stock.train(&mut baseline, EPISODES, PERIODS)?;
    let baseline_time = baseline_start.elapsed();

    let mut trader = QLearningTrader::new(
        &config,
        QLearningConfig::default()
            .with_alpha(0.1)
            .with_gamma(0.9)
            .with_seed(42),
    )?;
    let train_start = Instant::now();
    let report = stock.train(&mut trader, EPISODES, PERIODS)?;
    let train_time = train_start.elapsed();

    // One more day with the trained table, kept for the journal.
    stock.reset()?;
    let day = stock.simulate_trading_day(PERIODS, &mut trader)?;
    let journal = Journal::from_history(stock.history())?;

    // One directory per market configuration.
    let out = Path::new("demos/reports/q_learning").join(config.hash()?);
    report.to_csv(&out, None, None)?;
    journal.to_csv(&out, None, None)?;

    let tail = |r: &TrainingReport| {
        r.reward_moving_average(100)
            .last()
            .copied()
            .unwrap_or_default()
    };

    println!("\n--- Training Summary ---");
    println!("1. Random baseline ({baseline_time:?}):");
    println!(
        "   mean reward {:.2}, last 100 {:.2}",
        baseline_report.mean_reward().unwrap_or_default(),
        tail(&baseline_report)
    );
    println!("2. Q-learning ({train_time:?}):");
    println!(
        "   mean reward {:.2}, last 100 {:.2}",
        report.mean_reward().unwrap_or_default(),
        tail(&report)
    );
    println!(
        "3. Evaluation day: reward {}, cashflow {}",
        day.total_reward, day.total_cashflow
    );
    println!("\n{}", journal.stats()?);
    println!("Reports written to {}", out.display());

    drop(_guard);
    Ok(())
}

// ================================================================================================
// Tracing Configuration
// ================================================================================================

fn init_tracing() -> Result<Option<WorkerGuard>> {
    let app_name = "stockgym";

    let in_container =
        env::var("CONTAINER").is_ok() || std::path::Path::new("/.dockerenv").exists();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if in_container {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_current_span(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .init();

        info!("Logging to stdout (container mode)");
        Ok(None)
    } else {
        let log_dir = dirs::state_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
            .context("Failed to find a state or home directory")?
            .join(app_name)
            .join("logs");
        fs::create_dir_all(&log_dir)?;

        let timestamp = time::OffsetDateTime::now_utc()
            .format(&format_description!(
                "[year][month][day]-[hour][minute][second]"
            ))
            .context("Failed to format timestamp")?;
        let file_name = format!("{app_name}-{timestamp}.log");

        let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(non_blocking)
            .with_current_span(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .init();

        info!(log_file = %log_dir.join(&file_name).display(), "Logging to file (local mode)");
        Ok(Some(guard))
    }
}
