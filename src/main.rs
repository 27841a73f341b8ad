mod config;
mod domain;
mod engine;
mod gateway;

use config::{Config, MonitorConfig};
use engine::{RiskEngine, RiskParameters};
use gateway::SimulatedGateway;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

fn parse_config_path() -> String {
    for arg in env::args().skip(1) {
        if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
    }
    DEFAULT_CONFIG_PATH.to_string()
}

fn init_tracing(log_level: Option<&str>) {
    let level = match log_level {
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("warn") | Some("warning") => Level::WARN,
        Some("error") => Level::ERROR,
        Some("trace") => Level::TRACE,
        _ => Level::INFO,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config_path = parse_config_path();
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return;
        }
    };

    init_tracing(config.app.log_level.as_deref());

    let params = match RiskParameters::from_config(config.risk.as_ref()) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "Invalid risk parameters");
            return;
        }
    };

    // Live exchange connectivity is provided by an external gateway crate;
    // this binary only runs against the simulated gateway.
    if !config.app.dry_run {
        error!("Live trading is not available in this build, set app.dry_run: true");
        return;
    }

    let marks: HashMap<String, Decimal> = config
        .symbols
        .iter()
        .map(|s| (s.clone(), default_mark(s)))
        .collect();
    let gw = Arc::new(SimulatedGateway::new(dec!(10000), marks));

    let engine = match RiskEngine::connect(gw, params).await {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "Failed to initialize risk engine");
            return;
        }
    };

    info!(
        config = %config_path,
        env = %config.app.env,
        symbols = ?config.symbols,
        "Risk engine ready (dry run)"
    );

    let monitor = config.monitor.clone().unwrap_or_default();
    run(&engine, &monitor).await;
}

async fn run(engine: &RiskEngine, monitor: &MonitorConfig) {
    tokio::select! {
        _ = engine.run_monitor(
            monitor.update_interval_or_default(),
            monitor.funding_refresh_or_default(),
        ) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    let summary = engine.get_risk_summary().await;
    info!(
        daily_pnl = %summary.account_risk.daily_pnl,
        trades = summary.daily_stats.trades,
        positions = summary.positions.count,
        "Final risk status"
    );
}

/// Placeholder mark prices for the simulated gateway.
fn default_mark(symbol: &str) -> Decimal {
    match symbol {
        "BTCUSDT" => dec!(50000),
        "ETHUSDT" => dec!(3000),
        _ => dec!(100),
    }
}
