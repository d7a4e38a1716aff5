//! FLIPSCAN — Trader Flip Scanner
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores the snapshot cache and user preferences from disk, and runs
//! the tick loop: countdown updates, restock detection with silent
//! refresh, and opportunity re-evaluation, with graceful shutdown.

use anyhow::{Context, Result};
use chrono::Utc;
use std::time::Duration;
use tracing::{error, info, warn};

use flipscan::config::AppConfig;
use flipscan::engine::Evaluator;
use flipscan::market::client::{ApiClient, SnapshotSource};
use flipscan::market::MarketContext;
use flipscan::scheduler::{countdown, ResetScheduler};
use flipscan::storage::{self, CachedSnapshot};
use flipscan::types::{EvalParams, Prefs};

const BANNER: &str = r#"
 _____ _     ___ ____  ____   ____    _    _   _
|  ___| |   |_ _|  _ \/ ___| / ___|  / \  | \ | |
| |_  | |    | || |_) \___ \| |     / _ \ |  \| |
|  _| | |___ | ||  __/ ___) | |___ / ___ \| |\  |
|_|   |_____|___|_|   |____/ \____/_/   \_\_| \_|

  Trader Flip Scanner
  v0.1.0
"#;

/// How often to log the full trader countdown table.
const COUNTDOWN_LOG_EVERY_TICKS: u64 = 60;
/// How many ranked opportunities to log after each evaluation.
const TOP_RESULTS: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = AppConfig::load_or_default("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        api_url = %cfg.api.url,
        cache_ttl_secs = cfg.cache.ttl_secs,
        tick_interval_secs = cfg.scheduler.tick_interval_secs,
        "FLIPSCAN starting up"
    );

    // -- Restore persisted state ------------------------------------------

    let prefs = storage::load_prefs(Some(&cfg.prefs.path))?;

    let source = ApiClient::new(&cfg.api.url, Duration::from_secs(cfg.api.timeout_secs))?;

    let params = eval_params(&cfg)?;

    let mut app = App {
        source: Box::new(source),
        cache_path: cfg.cache.path.clone(),
        cache_ttl: Duration::from_secs(cfg.cache.ttl_secs),
        ctx: MarketContext::default(),
        prefs,
        params,
    };

    // First snapshot: cache if fresh, network otherwise. A dead API at
    // startup is fatal only when there is no cache to fall back on.
    app.refresh_if_stale().await;
    if app.ctx.ingested_at.is_none() {
        anyhow::bail!("No market data available: API unreachable and no usable cache");
    }
    app.evaluate_and_log();

    // -- Main loop ---------------------------------------------------------

    let mut scheduler = ResetScheduler::new(Duration::from_secs(cfg.scheduler.refresh_debounce_secs));
    let mut interval =
        tokio::time::interval(Duration::from_secs(cfg.scheduler.tick_interval_secs.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        tick_interval_secs = cfg.scheduler.tick_interval_secs,
        "Entering tick loop. Press Ctrl+C to stop."
    );

    let mut ticks: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                ticks += 1;
                let now = Utc::now();

                if ticks % COUNTDOWN_LOG_EVERY_TICKS == 0 {
                    log_countdowns(&app.ctx, now);
                }

                if scheduler.tick(&app.ctx.reset_table, now) {
                    match app.refresh().await {
                        Ok(()) => app.evaluate_and_log(),
                        Err(e) => warn!(error = %e, "Silent refresh failed, keeping current snapshot"),
                    }
                } else if !app.is_fresh(now) {
                    app.refresh_if_stale().await;
                    app.evaluate_and_log();
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    storage::save_prefs(&app.prefs, Some(&cfg.prefs.path))?;
    info!("FLIPSCAN shut down cleanly.");

    Ok(())
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

struct App {
    source: Box<dyn SnapshotSource>,
    cache_path: String,
    cache_ttl: Duration,
    ctx: MarketContext,
    prefs: Prefs,
    params: EvalParams,
}

impl App {
    fn is_fresh(&self, now: chrono::DateTime<Utc>) -> bool {
        match self.ctx.ingested_at {
            Some(at) => match chrono::Duration::from_std(self.cache_ttl) {
                Ok(ttl) => now - at < ttl,
                Err(_) => false,
            },
            None => false,
        }
    }

    /// Forced refresh: always hits the API and replaces the context.
    /// Errors surface to the caller; the current context stays intact.
    async fn refresh(&mut self) -> Result<()> {
        let snapshot = self
            .source
            .fetch_snapshot()
            .await
            .context("Snapshot fetch failed")?;

        let cached = CachedSnapshot::new(snapshot);
        if let Err(e) = storage::save_cache(&cached, Some(&self.cache_path)) {
            warn!(error = %e, "Failed to persist snapshot cache");
        }

        self.ctx = MarketContext::ingest(&cached.snapshot, self.ctx.rates);
        Ok(())
    }

    /// Staleness-driven refresh: serves the cache while it is fresh,
    /// otherwise fetches. Fire-and-forget — failures are logged and the
    /// previous context (or stale cache) remains in use.
    async fn refresh_if_stale(&mut self) {
        let now = Utc::now();

        match storage::load_cache(Some(&self.cache_path)) {
            Ok(Some(cached)) if cached.is_fresh(self.cache_ttl, now) => {
                info!(fetched_at = %cached.fetched_at, "Serving snapshot from cache");
                self.ctx = MarketContext::ingest(&cached.snapshot, self.ctx.rates);
                return;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Cache unavailable"),
        }

        if let Err(e) = self.refresh().await {
            error!(error = %e, "Refresh failed");
            // Last resort: a stale cache beats no data at all.
            if self.ctx.ingested_at.is_none() {
                if let Ok(Some(cached)) = storage::load_cache(Some(&self.cache_path)) {
                    warn!(fetched_at = %cached.fetched_at, "Falling back to stale cache");
                    self.ctx = MarketContext::ingest(&cached.snapshot, self.ctx.rates);
                }
            }
        }
    }

    fn evaluate_and_log(&self) {
        let opportunities = Evaluator::new(&self.ctx, &self.prefs).evaluate(&self.params);
        for opp in opportunities.iter().take(TOP_RESULTS) {
            info!("{opp}");
        }
        if opportunities.len() > TOP_RESULTS {
            info!(shown = TOP_RESULTS, total = opportunities.len(), "More results available");
        }
    }
}

/// Build evaluation parameters from configuration.
fn eval_params(cfg: &AppConfig) -> Result<EvalParams> {
    Ok(EvalParams {
        player_level: cfg.evaluation.player_level,
        trader: cfg.evaluation.trader.clone(),
        min_profit: cfg.evaluation.min_profit,
        sort: cfg.evaluation.sort.parse()?,
        ..EvalParams::default()
    })
}

/// Log the countdown table for every tracked trader.
fn log_countdowns(ctx: &MarketContext, now: chrono::DateTime<Utc>) {
    let mut traders: Vec<_> = ctx.reset_table.iter().collect();
    traders.sort_by(|a, b| a.0.cmp(b.0));
    for (name, reset) in traders {
        let c = countdown(Some(*reset), now);
        info!(trader = %name, urgency = ?c.urgency, "Restock in {}", c.label);
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("flipscan=info"));

    let json_logging = std::env::var("FLIPSCAN_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
