use alloy_primitives::U256;
use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use loadbot::config::Config;
use loadbot::connection::{RpcConnectionFactory, TransferKind};
use loadbot::dispatch::{DispatchError, Dispatcher, RunConfig};
use loadbot::{load_environment, shutdown};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Rate-controlled transfer load generator
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding env.json (defaults to the current directory)
    envdir: Option<PathBuf>,

    /// Aggregate transactions per second
    #[arg(long)]
    tps: Option<u32>,

    /// Amount per transfer, in the smallest unit
    #[arg(long, value_parser = parse_amount)]
    amount: Option<U256>,

    /// JSON-RPC endpoint; repeat to spread connections across nodes
    #[arg(long = "endpoint")]
    endpoints: Vec<String>,

    /// Token contract address, or `native` for plain value transfers
    #[arg(long, value_parser = parse_transfer_kind)]
    token: Option<TransferKind>,

    /// Seed for recipient selection
    #[arg(long)]
    seed: Option<u64>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Layer command line flags over `config`
    fn apply(&self, config: &mut Config) {
        if let Some(tps) = self.tps {
            config.target_rate = tps;
        }
        if let Some(amount) = self.amount {
            config.amount = amount;
        }
        if !self.endpoints.is_empty() {
            config.endpoints = self.endpoints.clone();
        }
        if let Some(transfer) = self.token {
            config.transfer = transfer;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
    }

    fn default_filter(&self) -> &'static str {
        match self.verbose {
            0 => "loadbot=info",
            1 => "loadbot=debug",
            _ => "loadbot=trace",
        }
    }
}

fn parse_amount(s: &str) -> Result<U256, String> {
    s.trim()
        .parse::<U256>()
        .map_err(|e| format!("invalid amount {s:?}: {e}"))
}

fn parse_transfer_kind(s: &str) -> Result<TransferKind, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.default_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment, then command line
    let mut config = Config::from_env();
    args.apply(&mut config);
    info!(
        "Loaded configuration: tps={}, amount={}, transfer={:?}",
        config.target_rate, config.amount, config.transfer
    );

    if let Some(addr) = config.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Serving metrics at: http://{}", addr);
    }

    let envdir = match args.envdir {
        Some(ref dir) => dir.clone(),
        None => {
            info!("Using current directory as workdir");
            std::env::current_dir().context("Failed to resolve current directory")?
        }
    };
    let environment = load_environment(&envdir)
        .with_context(|| format!("Failed to load environment from {}", envdir.display()))?;

    let endpoints = if config.endpoints.is_empty() {
        environment.endpoints
    } else {
        config.endpoints.clone()
    };
    if endpoints.is_empty() {
        bail!("No endpoints configured: set LOADBOT_ENDPOINTS, pass --endpoint, or list them in env.json");
    }
    info!(
        accounts = environment.accounts.len(),
        endpoints = endpoints.len(),
        "Environment loaded"
    );

    let factory = RpcConnectionFactory::new(
        endpoints,
        config.transfer,
        config.receipt_poll_interval,
    )
    .context("Failed to configure connections")?;

    let mut run_config = RunConfig::new(
        environment.accounts,
        config.amount,
        config.target_rate,
        Arc::new(factory),
    );
    if let Some(seed) = config.seed {
        run_config = run_config.with_seed(seed);
    }

    let dispatcher = Dispatcher::new(run_config);
    let stats = dispatcher.stats();

    let cancel = CancellationToken::new();
    let signal = tokio::spawn(shutdown::cancel_on_signal(cancel.clone()));

    let started = Instant::now();
    let result = dispatcher.run(&cancel).await;
    let signalled = cancel.is_cancelled();
    cancel.cancel();
    signal.abort();

    let elapsed = started.elapsed();
    let submitted = stats.submitted();
    info!(
        submitted,
        included = stats.included(),
        failed = stats.failed(),
        elapsed_secs = elapsed.as_secs(),
        achieved_tps = %format!("{:.2}", submitted as f64 / elapsed.as_secs_f64().max(1e-9)),
        "Run finished"
    );

    match result {
        Ok(()) => Ok(()),
        Err(DispatchError::Cancelled) if signalled => Ok(()),
        Err(e) => {
            error!("Load generation stopped: {}", e);
            Err(e).context("Load generation failed")
        }
    }
}
