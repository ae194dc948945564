use anyhow::Result;
use stockgym::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = StockConfig::default().with_seed(7);
    let mut stock = SimpleStock::new(config.clone())?;
    let mut trader = RandomTrader::for_stock(&config, Some(7));

    let summary = stock.simulate_trading_day(50, &mut trader)?;
    let journal = Journal::from_history(stock.history())?;

    println!("{}", journal.as_df());
    println!("{}", journal.stats()?);
    println!(
        "periods {}, reward {}, cashflow {}, open position {} (unrealized {})",
        summary.periods,
        summary.total_reward,
        summary.total_cashflow,
        summary.final_position,
        summary.unrealized
    );
    Ok(())
}
