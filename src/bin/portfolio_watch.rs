//! Portfolio watcher for a ve(3,3) DEX deployment.
//!
//! Configures a session against the contracts named in the environment,
//! then refreshes balances, pairs and vest positions on an interval,
//! logging every session event as it arrives.

use std::{process::exit, sync::Arc, time::Duration};

use alloy::{
    network::EthereumWallet,
    primitives::Address,
    providers::{DynProvider, ProviderBuilder},
    rpc::client::RpcClient,
    signers::local::PrivateKeySigner,
};
use clap::Parser;
use tracing::{info, warn};
use url::Url;
use vedex_sdk::{
    Chain,
    session::Session,
    types::{Command, Event},
};

/// Environment configuration (connection details, credentials,
/// deployment addresses).
#[derive(Debug, serde::Deserialize)]
struct EnvConfig {
    pub chain_id: u64,

    /// RPC URL for the node
    pub node_rpc_url: String,

    /// Private key for signing transactions
    pub private_key: String,

    pub router_address: String,
    pub factory_address: String,
    pub voter_address: String,
    pub voting_escrow_address: String,
    pub distributor_address: String,
    pub wrapped_native_address: String,
    pub gov_token_address: String,
    pub legacy_token_address: String,
    pub redeemer_address: String,

    /// Comma-separated route asset addresses
    pub route_asset_addresses: Option<String>,

    pub native_symbol: Option<String>,
    pub wrapped_native_symbol: Option<String>,
}

impl EnvConfig {
    fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    fn to_chain(&self) -> Result<Chain, String> {
        let parse = |label: &str, value: &str| -> Result<Address, String> {
            value
                .parse()
                .map_err(|e| format!("invalid {label}: {e}"))
        };

        let route_assets = self
            .route_asset_addresses
            .as_deref()
            .unwrap_or("")
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| parse("route asset address", part.trim()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Chain::custom(
            self.chain_id,
            parse("router address", &self.router_address)?,
            parse("factory address", &self.factory_address)?,
            parse("voter address", &self.voter_address)?,
            parse("voting escrow address", &self.voting_escrow_address)?,
            parse("distributor address", &self.distributor_address)?,
            parse("wrapped native address", &self.wrapped_native_address)?,
            parse("gov token address", &self.gov_token_address)?,
            parse("legacy token address", &self.legacy_token_address)?,
            parse("redeemer address", &self.redeemer_address)?,
            route_assets,
            self.native_symbol.as_deref().unwrap_or("ETH"),
            self.wrapped_native_symbol.as_deref().unwrap_or("WETH"),
        ))
    }
}

/// CLI arguments for the watcher loop.
#[derive(Debug, Parser)]
#[command(name = "portfolio-watch")]
#[command(about = "Portfolio watcher for a ve(3,3) DEX session")]
struct CliConfig {
    /// Seconds between balance refreshes
    #[arg(long, default_value = "30")]
    pub refresh_seconds: u64,

    /// Transaction deadline window in seconds
    #[arg(long, default_value = "600")]
    pub deadline_seconds: u64,
}

#[tokio::main]
async fn main() {
    // Load .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    let env_config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse environment configuration: {}", e);
            exit(1);
        }
    };

    let cli_config = CliConfig::parse();

    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let chain = match env_config.to_chain() {
        Ok(chain) => chain.with_deadline_window(cli_config.deadline_seconds),
        Err(e) => {
            eprintln!("Invalid deployment configuration: {}", e);
            exit(1);
        }
    };

    let private_key: PrivateKeySigner = match env_config.private_key.parse() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Invalid private key: {}", e);
            exit(1);
        }
    };
    let account = private_key.address();
    let wallet = EthereumWallet::new(private_key);

    let node_url = match Url::parse(&env_config.node_rpc_url) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Invalid RPC URL: {}", e);
            exit(1);
        }
    };

    let rpc_client = RpcClient::new_http(node_url);
    let provider = DynProvider::new(
        ProviderBuilder::new()
            .wallet(wallet)
            .connect_client(rpc_client),
    );

    info!(%account, chain_id = chain.chain_id(), "Starting portfolio watcher");

    let session = Arc::new(Session::new(provider, chain, account));
    session.subscribe(log_event);

    session.clone().dispatch(Command::Configure);

    let mut ticker = tokio::time::interval(Duration::from_secs(cli_config.refresh_seconds));
    // First tick fires immediately; Configure already chains a refresh
    ticker.tick().await;
    loop {
        ticker.tick().await;
        session.clone().dispatch(Command::GetBalances);
    }
}

fn log_event(event: &Event) {
    match event {
        Event::Configured => info!("session configured"),
        Event::StoreUpdated => info!("store updated"),
        Event::BaseAssetsUpdated(assets) => {
            for asset in assets {
                info!(symbol = %asset.symbol, balance = %asset.balance, "balance");
            }
        }
        Event::VestNftsReturned(nfts) => {
            for nft in nfts {
                info!(
                    id = nft.id,
                    amount = %nft.lock_amount,
                    value = %nft.lock_value,
                    ends = nft.lock_ends,
                    "vest position"
                );
            }
        }
        Event::Error(message) => warn!(%message, "session error"),
        other => info!(event = ?other, "event"),
    }
}
