use std::io::Write;

use alloy::primitives::Address;
use alloy::providers::ProviderBuilder;
use amm_pool_analyzer::analyzer::PoolAnalyzer;
use amm_pool_analyzer::config::AnalyzerConfig;
use amm_pool_analyzer::gateway::{DataGateway, OnchainGateway};
use amm_pool_analyzer::types::to_base_units;
use dotenvy::dotenv;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Frequently used BSC token addresses, accepted as shortcuts wherever an
/// address is asked for.
const KNOWN_TOKENS: &[(&str, &str)] = &[
    ("CAKE", "0x0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82"),
    ("BUSD", "0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56"),
    ("USDT", "0x55d398326f99059fF775485246999027B3197955"),
    ("WBNB", "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c"),
    ("BTCB", "0x7130d2A12B9BCbFAe4f2634d864A1Ee1Ce3Ead9c"),
];

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    dotenv().ok();
    let config = AnalyzerConfig::from_env();

    info!("Connecting to {}", config.rpc_url);
    let provider = ProviderBuilder::new().connect_http(config.rpc_url.parse()?);
    let gateway = OnchainGateway::new(provider, config.factory);
    let analyzer = PoolAnalyzer::new(gateway, &config)?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_menu();
        let choice = prompt(&mut input, "Select an option (0-7): ").await?;
        let result = match choice.as_str() {
            "1" => handle_slippage(&analyzer, &mut input).await,
            "2" => handle_price_impact(&analyzer, &mut input).await,
            "3" => handle_monitor(&analyzer, &mut input, &config).await,
            "4" => handle_token_info(&analyzer, &mut input).await,
            "5" => handle_batch(&analyzer, &mut input).await,
            "6" => print_json(&analyzer.cache_stats()),
            "7" => {
                analyzer.clear_cache();
                Ok(())
            }
            "0" => break,
            other => {
                println!("Unknown option: {other}");
                Ok(())
            }
        };
        if let Err(e) = result {
            println!("Error: {e}");
        }
    }

    info!("Shutting down...");
    Ok(())
}

fn print_menu() {
    println!();
    println!("AMM Pool Analyzer");
    println!("================================");
    println!("1. Slippage quote");
    println!("2. Price impact analysis");
    println!("3. Liquidity pool monitor");
    println!("4. Token info");
    println!("5. Batch slippage analysis");
    println!("6. Cache stats");
    println!("7. Clear cache");
    println!("0. Exit");
    println!("================================");
    print!("Known tokens:");
    for (symbol, _) in KNOWN_TOKENS {
        print!(" {symbol}");
    }
    println!();
}

async fn prompt(input: &mut Input, message: &str) -> eyre::Result<String> {
    print!("{message}");
    std::io::stdout().flush()?;
    Ok(input
        .next_line()
        .await?
        .unwrap_or_default()
        .trim()
        .to_string())
}

/// Accepts a known-token symbol or a hex address.
fn parse_token(raw: &str) -> eyre::Result<Address> {
    for (symbol, address) in KNOWN_TOKENS {
        if symbol.eq_ignore_ascii_case(raw) {
            return Ok(address.parse()?);
        }
    }
    Ok(raw.parse()?)
}

async fn prompt_token(input: &mut Input, message: &str) -> eyre::Result<Address> {
    let raw = prompt(input, message).await?;
    parse_token(&raw)
}

/// Optional counter-token: empty input means "pick one for me".
async fn prompt_counter(input: &mut Input) -> eyre::Result<Option<Address>> {
    let raw = prompt(input, "Counter token (empty for automatic): ").await?;
    if raw.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parse_token(&raw)?))
    }
}

fn print_json<T: Serialize>(value: &T) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn handle_slippage<G: DataGateway>(
    analyzer: &PoolAnalyzer<G>,
    input: &mut Input,
) -> eyre::Result<()> {
    let token = prompt_token(input, "Token address or symbol: ").await?;
    let counter = prompt_counter(input).await?;
    let amount: Decimal = prompt(input, "Sell amount (whole tokens): ").await?.parse()?;
    let info = analyzer.token_info(token).await?;
    let base_units = to_base_units(amount, info.decimals)?;
    let report = analyzer.quote_slippage(token, base_units, counter).await?;
    print_json(&report)
}

async fn handle_price_impact<G: DataGateway>(
    analyzer: &PoolAnalyzer<G>,
    input: &mut Input,
) -> eyre::Result<()> {
    let token = prompt_token(input, "Token address or symbol: ").await?;
    let raw = prompt(
        input,
        "Market-cap percentages, comma separated (empty for defaults): ",
    )
    .await?;
    let percentages = parse_decimals(&raw)?;
    let report = analyzer
        .price_impact(token, percentages.as_deref(), None)
        .await?;
    print_json(&report)
}

async fn handle_monitor<G: DataGateway>(
    analyzer: &PoolAnalyzer<G>,
    input: &mut Input,
    config: &AnalyzerConfig,
) -> eyre::Result<()> {
    let token = prompt_token(input, "Token address or symbol: ").await?;
    let counter = prompt_counter(input).await?;
    let watch = prompt(input, "Keep watching? (y/N): ").await?;

    let result = analyzer.poll_pool(token, counter).await?;
    print_json(&result)?;
    if !watch.eq_ignore_ascii_case("y") {
        return Ok(());
    }

    println!(
        "Polling every {:?}; press Ctrl+C to stop.",
        config.monitoring_interval
    );
    let mut ticker = tokio::time::interval(config.monitoring_interval);
    ticker.tick().await; // the first tick fires immediately
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match analyzer.poll_pool(token, counter).await {
                    Ok(result) => print_json(&result)?,
                    Err(e) => println!("Poll failed: {e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Stopped watching.");
                return Ok(());
            }
        }
    }
}

async fn handle_token_info<G: DataGateway>(
    analyzer: &PoolAnalyzer<G>,
    input: &mut Input,
) -> eyre::Result<()> {
    let token = prompt_token(input, "Token address or symbol: ").await?;
    let info = analyzer.token_info(token).await?;
    print_json(&info)?;
    match analyzer.market_cap_info(token, None).await {
        Ok(market_cap) => print_json(&market_cap),
        Err(e) => {
            println!("No market cap available: {e}");
            Ok(())
        }
    }
}

async fn handle_batch<G: DataGateway>(
    analyzer: &PoolAnalyzer<G>,
    input: &mut Input,
) -> eyre::Result<()> {
    let token = prompt_token(input, "Token address or symbol: ").await?;
    let counter = prompt_counter(input).await?;
    let raw = prompt(
        input,
        "Sell amounts in whole tokens, comma separated, ascending: ",
    )
    .await?;
    let amounts = parse_decimals(&raw)?
        .ok_or_else(|| eyre::eyre!("at least one amount is required"))?;
    let report = analyzer.batch_slippage(token, &amounts, counter).await?;
    print_json(&report)
}

fn parse_decimals(raw: &str) -> eyre::Result<Option<Vec<Decimal>>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<Decimal>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(values))
}
