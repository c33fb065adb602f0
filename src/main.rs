use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use ethers::{
    providers::{Http, Provider},
    types::{Address, H256},
};
use log::{info, warn};
use std::sync::Arc;

use token_pricer::{
    chain::{BlockAccess, ProviderBlockAccess},
    config::AppConfig,
    metrics::install_exporter,
    pricing::{
        coingecko::CoingeckoClient, resolver::PriceResolver, token_list::TokenListCache,
    },
    storage::PriceStore,
    utils::setup_logger,
};

#[derive(Parser)]
#[command(name = "token-pricer", about = "Historical token prices at a block")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the price of a token at a block and store it
    Price {
        #[arg(long)]
        block: u64,
        #[arg(long)]
        token: String,
    },
    /// Record a transaction with the tokens it touched, then price each token
    Record {
        #[arg(long)]
        tx: String,
        #[arg(long)]
        block: u64,
        #[arg(long, value_delimiter = ',')]
        tokens: Vec<String>,
    },
    /// Print the most recently recorded transaction
    Checkpoint,
}

struct App {
    blocks: Arc<dyn BlockAccess>,
    resolver: PriceResolver,
    store: PriceStore,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_logger()?;

    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    config.validate_all()?;

    if let Some(port) = config.metrics_port {
        install_exporter(port)?;
        info!("Metrics exporter listening on 127.0.0.1:{}", port);
    }

    let store = PriceStore::open(&config.database_path)?;

    match cli.command {
        Command::Checkpoint => match store.get_latest_checkpoint()? {
            Some(tx) => println!("{} {:?}", "checkpoint".green(), tx),
            None => println!("{}", "no transactions recorded".yellow()),
        },
        Command::Price { block, token } => {
            let token = parse_address(&token)?;
            let app = build_app(&config, store)?;
            price_and_store(&app, block, token).await?;
        }
        Command::Record { tx, block, tokens } => {
            let tx_hash: H256 = tx
                .trim()
                .parse()
                .map_err(|e| anyhow!("Invalid transaction hash {}: {}", tx, e))?;
            let tokens = tokens
                .iter()
                .map(|t| parse_address(t))
                .collect::<Result<Vec<_>>>()?;
            let app = build_app(&config, store)?;
            record_transaction(&app, tx_hash, block, &tokens).await?;
        }
    }

    Ok(())
}

fn build_app(config: &AppConfig, store: PriceStore) -> Result<App> {
    let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
        .with_context(|| format!("Invalid RPC URL: {}", config.rpc_url))?;
    let blocks: Arc<dyn BlockAccess> = Arc::new(ProviderBlockAccess::new(Arc::new(provider)));

    let coingecko = Arc::new(CoingeckoClient::new(
        config.coingecko_api_key.clone(),
        config.chain.vs_currency.clone(),
        config.pricing.http_timeout,
    )?);

    let token_list = Arc::new(TokenListCache::new(
        coingecko.clone(),
        config.chain.platform_id.clone(),
        config.pricing.reload_interval,
    ));

    let resolver = PriceResolver::new(
        blocks.clone(),
        token_list,
        coingecko,
        config.chain.clone(),
        &config.pricing,
    );

    info!(
        "Pricing {} tokens in {} via {}",
        config.chain.chain_name,
        config.chain.vs_currency,
        resolver.source_name()
    );

    Ok(App {
        blocks,
        resolver,
        store,
    })
}

async fn price_and_store(app: &App, block: u64, token: Address) -> Result<()> {
    match app.resolver.get_price_sample(block, token).await? {
        Some(sample) => {
            app.store.write_prices(std::slice::from_ref(&sample))?;
            println!("{:?} @ {}: {}", token, block, sample.price.to_string().green());
        }
        None => println!("{:?} @ {}: {}", token, block, "no price available".yellow()),
    }
    Ok(())
}

async fn record_transaction(
    app: &App,
    tx_hash: H256,
    block: u64,
    tokens: &[Address],
) -> Result<()> {
    let time = app.blocks.get_block_timestamp(block).await?;

    let pairs: Vec<(H256, Address)> = tokens.iter().map(|t| (tx_hash, *t)).collect();
    app.store.write_transaction_tokens(&pairs)?;
    if !app.store.write_transaction_timestamp(tx_hash, time)? {
        warn!("Transaction {:?} was already recorded", tx_hash);
    }

    let mut samples = Vec::with_capacity(tokens.len());
    for token in tokens {
        match app.resolver.get_price_sample(block, *token).await? {
            Some(sample) => samples.push(sample),
            None => warn!("No price for {:?} at block {}", token, block),
        }
    }
    let written = app.store.write_prices(&samples)?;

    println!(
        "{} {:?}: {} tokens, {} prices stored",
        "recorded".green(),
        tx_hash,
        tokens.len(),
        written
    );
    Ok(())
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("Invalid token address {}: {}", raw, e))
}
