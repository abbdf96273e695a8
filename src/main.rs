use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tvgate::config::{AppConfig, LoggingConfig};
use tvgate::coordinator::ExecutionCoordinator;
use tvgate::domain::TradeIntent;
use tvgate::exchange::BitgetClient;
use tvgate::ingest::AlertIngestor;
use tvgate::notify::{LogOnlyNotifier, UserAlertNotifier, WebhookNotifier};
use tvgate::scheduler::{PeriodicScheduler, PeriodicTradePass};
use tvgate::services::{
    build_router, serve, AppState, IpAllowlist, RateLimitConfig, RateLimitState,
};
use tvgate::storage::EventStore;

#[derive(Parser, Debug)]
#[command(
    name = "tvgate",
    about = "TradingView webhook gateway for Bitget USDT-futures execution"
)]
struct Args {
    /// Configuration directory
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Override the configured server port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load_from(&args.config_dir)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_logging(&config.logging);

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("Config error: {}", e);
        }
        anyhow::bail!("invalid configuration ({} errors)", errors.len());
    }

    let notifier: Arc<dyn UserAlertNotifier> = match &config.alerting.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => {
            warn!("No alert webhook configured, operational alerts go to the log only");
            Arc::new(LogOnlyNotifier)
        }
    };

    let coordinator = Arc::new(ExecutionCoordinator::new());
    let exchange = Arc::new(BitgetClient::new(
        &config.exchange,
        notifier.clone(),
        config.instance.clone(),
    )?);
    let ingestor = AlertIngestor::new(config.webhook.shared_key.clone(), coordinator.clone());

    let store = match &config.database.url {
        Some(url) => match EventStore::connect(url, config.database.max_connections).await {
            Ok(store) => {
                store.init().await?;
                info!("Audit store connected");
                Some(Arc::new(store))
            }
            Err(e) => {
                warn!("Audit store unavailable, continuing without persistence: {}", e);
                None
            }
        },
        None => {
            warn!("DATABASE_URL not set, audit persistence disabled");
            None
        }
    };

    let rate_limit = match &config.rate_limit.redis_url {
        Some(url) => {
            let rl_config =
                RateLimitConfig::new(config.rate_limit.limit, config.rate_limit.window_secs);
            match RateLimitState::connect(url, rl_config).await {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!("Rate limiting is disabled due to Redis connection issues: {}", e);
                    None
                }
            }
        }
        None => {
            warn!("Rate limiting is disabled (no Redis URL configured)");
            None
        }
    };

    let allowlist = IpAllowlist::from_config(&config.webhook.allowed_ips);
    if allowlist.is_none() {
        warn!("IP allowlist empty, accepting requests from any address");
    }

    // Only the main instance runs scheduled passes; the others just relay
    // webhooks.
    let scheduler_handle = if config.main_api {
        let trade = &config.scheduler.trade;
        let intent = TradeIntent::new(
            trade.symbol.clone(),
            trade.side,
            trade.trade_side,
            trade.size,
            trade.price,
            trade.product_type.clone(),
            trade.trade_name.clone(),
        )?;
        let pass = Arc::new(PeriodicTradePass::new(exchange.clone(), intent));
        let scheduler = Arc::new(PeriodicScheduler::new(
            coordinator.clone(),
            pass,
            Duration::from_secs(config.scheduler.interval_secs),
            Duration::from_millis(config.scheduler.tick_ms),
            config.scheduler.delay_ticks,
        ));
        info!(
            "Periodic scheduler enabled: every {}s with a {}-tick delay window",
            config.scheduler.interval_secs, config.scheduler.delay_ticks
        );
        Some(tokio::spawn(scheduler.run()))
    } else {
        info!("Periodic scheduler disabled (not the main instance)");
        None
    };

    let state = Arc::new(AppState {
        ingestor,
        exchange,
        store,
    });
    let router = build_router(state, rate_limit, allowlist);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {e}"))?;

    serve(router, addr, shutdown_signal()).await?;

    if let Some(handle) = scheduler_handle {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tvgate=debug", config.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
