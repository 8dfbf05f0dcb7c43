use huobix::core::config::ExchangeConfig;
use huobix::core::traits::{MarketDataSource, MarketStream};
use huobix::{CurrencyPair, HuobiBuilder, KlinePeriod, Ticker};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Public data only unless HUOBI_API_KEY / HUOBI_SECRET_KEY are set
    let config =
        ExchangeConfig::from_env("HUOBI").unwrap_or_else(|_| ExchangeConfig::read_only());
    let authenticated = config.has_credentials();
    let builder = HuobiBuilder::new().with_config(config);
    let huobi = if authenticated {
        builder.build_spot().await?
    } else {
        builder.build()?
    };

    let pair = CurrencyPair::new("btc", "usdt")?;

    let ticker = huobi.get_ticker(&pair).await?;
    info!(
        "{} last={} bid={} ask={} vol={}",
        ticker.pair, ticker.last, ticker.buy, ticker.sell, ticker.vol
    );

    let depth = huobi.get_depth(5, &pair).await?;
    for level in &depth.ask_list {
        info!("ask {} x {}", level.price, level.amount);
    }
    for level in &depth.bid_list {
        info!("bid {} x {}", level.price, level.amount);
    }

    let klines = huobi
        .get_kline_records(&pair, KlinePeriod::Min60, 3)
        .await?;
    info!("fetched {} hourly candles", klines.len());

    if authenticated {
        match huobi.get_account_info(huobix::AccountType::Spot).await {
            Ok(account) => info!("spot account {} is {}", account.id, account.state),
            Err(e) => warn!("account lookup failed: {}", e),
        }
    }

    huobi
        .subscribe_ticker(
            &pair,
            Box::new(|ticker: Ticker| info!("push {} last={}", ticker.pair, ticker.last)),
        )
        .await?;

    tokio::time::sleep(Duration::from_secs(15)).await;
    huobi.close().await?;
    Ok(())
}
