use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use curve_bridge::config::{self, Config};
use curve_bridge::domain::sdk::CurveSdk;
use curve_bridge::infrastructure::ethereum::{create_provider, EthereumProvider, ProviderConfig};
use curve_bridge::infrastructure::sdk::ProviderSdk;
use curve_bridge::infrastructure::{CurveApiAdapter, WorkerHandle};

#[derive(Debug, Parser)]
#[command(
    name = "curve-bridge",
    version,
    about = "Run Curve SDK reads on a worker thread over a local provider"
)]
struct Args {
    /// HTTP JSON-RPC endpoint (e.g. http://localhost:8545)
    #[arg(long)]
    rpc: Option<String>,

    /// WebSocket endpoint (e.g. ws://localhost:8546)
    #[arg(long)]
    ws: Option<String>,

    /// IPC path (e.g. ~/.ethereum/geth.ipc). Unix only.
    #[arg(long)]
    ipc: Option<PathBuf>,

    /// Config file (defaults to ~/.config/curve-bridge/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Network constants returned by init
    Constants,
    /// Token balances for one or more holders (signer when omitted)
    Balances {
        #[arg(long, value_delimiter = ',', required = true)]
        coins: Vec<String>,
        #[arg(long)]
        address: Vec<String>,
    },
    /// Allowances granted by `owner` to `spender`
    Allowance {
        #[arg(long, value_delimiter = ',', required = true)]
        coins: Vec<String>,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        spender: String,
    },
    /// Name, symbol and decimals
    Coins {
        #[arg(long, value_delimiter = ',', required = true)]
        coins: Vec<String>,
    },
    /// L2 gas price, plus the L1 base fee on OP-stack chains (gwei)
    Gas,
    /// Raw totalSupply of each token, batched through Multicall3
    Supply {
        #[arg(long, value_delimiter = ',', required = true)]
        coins: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let loaded = match &args.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    let (config, config_error) = match loaded {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    };
    init_tracing(&config);
    if let Some(err) = config_error {
        tracing::warn!(error = format!("{err:#}"), "ignoring invalid config, using defaults");
    }

    let endpoints = endpoints_from_args_and_config(&args, &config)?;
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    let output = rt.block_on(run(args.command, endpoints, &config))?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter.as_deref().unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Command, endpoints: Vec<ProviderConfig>, config: &Config) -> Result<Value> {
    let provider = connect(endpoints).await?;
    let call_timeout = config.bridge.call_timeout();

    let (worker, channels) = WorkerHandle::spawn(
        |rpc| Ok(Arc::new(ProviderSdk::new(rpc)?) as Arc<dyn CurveSdk>),
        call_timeout,
    )?;
    let adapter = CurveApiAdapter::new(channels.port, channels.inbox, provider, call_timeout);

    let constants = adapter.init(config.init_options()).await.context("init failed")?;

    let output = match command {
        Command::Constants => serde_json::to_value(&constants)?,
        Command::Balances { coins, address } => {
            serde_json::to_value(adapter.get_balances(coins, address).await?)?
        }
        Command::Allowance { coins, owner, spender } => {
            serde_json::to_value(adapter.get_allowance(coins, &owner, &spender).await?)?
        }
        Command::Coins { coins } => serde_json::to_value(adapter.get_coins_data(coins).await?)?,
        Command::Gas => {
            let l2 = adapter.get_gas_price_from_l2().await?;
            let l1 = match adapter.get_gas_price_from_l1().await {
                Ok(price) => Some(price),
                Err(err) => {
                    tracing::debug!(error = %err, "no L1 gas price");
                    None
                }
            };
            json!({ "l2": l2, "l1": l1 })
        }
        Command::Supply { coins } => Value::Object(adapter.total_supply(coins).await?),
    };

    drop(adapter);
    tokio::task::spawn_blocking(move || worker.join())
        .await
        .context("worker join task failed")??;
    Ok(output)
}

/// Try each endpoint in order and keep the first that answers
async fn connect(endpoints: Vec<ProviderConfig>) -> Result<Arc<dyn EthereumProvider>> {
    let mut last_error = None;
    for endpoint in endpoints {
        let label = endpoint.display();
        let provider = match create_provider(endpoint).await {
            Ok(provider) => provider,
            Err(err) => {
                tracing::warn!(endpoint = %label, error = %err, "connection failed");
                last_error = Some(err);
                continue;
            }
        };
        match provider.client_version().await {
            Ok(version) => {
                let head = provider.block_number().await.ok();
                tracing::info!(
                    endpoint = %provider.endpoint_name(),
                    node = %detect_node_kind(&version),
                    ?head,
                    "connected"
                );
                return Ok(Arc::from(provider));
            }
            Err(err) => {
                tracing::warn!(endpoint = %label, error = %err, "endpoint not responding");
                last_error = Some(err);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no endpoints configured")))
}

/// Detect node kind from client version string
fn detect_node_kind(version: &str) -> String {
    let lower = version.to_lowercase();
    if lower.contains("anvil") {
        "anvil".to_string()
    } else if lower.contains("reth") {
        "reth".to_string()
    } else if lower.contains("geth") || lower.contains("go-ethereum") {
        "geth".to_string()
    } else {
        version.to_string()
    }
}

fn endpoints_from_args_and_config(args: &Args, config: &Config) -> Result<Vec<ProviderConfig>> {
    use std::collections::BTreeSet;

    fn push_endpoint(
        endpoints: &mut Vec<ProviderConfig>,
        seen: &mut BTreeSet<String>,
        endpoint: ProviderConfig,
    ) {
        let key = endpoint.display().to_lowercase();
        if seen.insert(key) {
            endpoints.push(endpoint);
        }
    }

    let mut endpoints = Vec::new();
    let mut seen = BTreeSet::<String>::new();

    // CLI arguments take precedence
    if let Some(ipc) = args.ipc.clone() {
        #[cfg(unix)]
        {
            push_endpoint(&mut endpoints, &mut seen, ProviderConfig::Ipc(ipc));
        }
        #[cfg(not(unix))]
        {
            let _ = ipc;
            return Err(anyhow::anyhow!("IPC is not supported on this platform"));
        }
    } else if let Some(ws) = args.ws.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        push_endpoint(&mut endpoints, &mut seen, ProviderConfig::WebSocket(ws.to_string()));
    } else if let Some(rpc) = args.rpc.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        push_endpoint(
            &mut endpoints,
            &mut seen,
            ProviderConfig::Http(normalize_http_endpoint(rpc)),
        );
    }

    // Config file endpoints
    for entry in &config.endpoints {
        if let Some(rpc) = entry.rpc.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            push_endpoint(
                &mut endpoints,
                &mut seen,
                ProviderConfig::Http(normalize_http_endpoint(rpc)),
            );
            continue;
        }
        if let Some(ws) = entry.ws.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            push_endpoint(&mut endpoints, &mut seen, ProviderConfig::WebSocket(ws.to_string()));
            continue;
        }
        #[cfg(unix)]
        {
            if let Some(ipc) = entry.ipc.as_deref().and_then(expand_path) {
                push_endpoint(&mut endpoints, &mut seen, ProviderConfig::Ipc(ipc));
            }
        }
    }

    // Default fallback
    if endpoints.is_empty() {
        push_endpoint(
            &mut endpoints,
            &mut seen,
            ProviderConfig::Http(normalize_http_endpoint("localhost:8545")),
        );
    }

    Ok(endpoints)
}

fn normalize_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

#[cfg_attr(not(unix), allow(dead_code))]
fn expand_path(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
            return Some(home.join(rest));
        }
    }

    let mut buf = PathBuf::from(trimmed);
    if buf.is_relative() {
        if let Ok(cwd) = std::env::current_dir() {
            buf = cwd.join(buf);
        }
    }
    Some(buf)
}
