mod commands;
mod server;
mod terminal;

use anyhow::Context;
use commands::CommandLine;
use server::MetricsServer;
use tracing::{info, warn};
use wrtmon_common::config::{Config, ProbeConfig};
use wrtmon_core::registry::CollectorRegistry;

use crate::terminal::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(&commands.log_level);

    let probe: ProbeConfig = ProbeConfig::from_env();
    let cfg: Config = Config::new(&commands.listen_address, &commands.metrics_path, probe)
        .context("invalid command line")?;

    info!("starting openwrt exporter on {}", cfg.listen_address);
    if cfg.probe.privileged && !is_root::is_root() {
        warn!("raw ICMP probing usually needs root; set PING_PRIVILEGED=false to time TCP handshakes instead");
    }
    if cfg.probe.targets.is_empty() {
        info!("no ping targets configured, latency metrics disabled");
    } else {
        info!(
            "probing {} target(s), {} at a time",
            cfg.probe.targets.len(),
            cfg.probe.concurrency
        );
    }

    let registry: CollectorRegistry = CollectorRegistry::from_config(&cfg);
    let listener = MetricsServer::bind(&cfg.listen_address).await?;
    info!(
        "listening on {}, exposing metrics on {}",
        cfg.listen_address, cfg.metrics_path
    );

    let server = MetricsServer::new(registry, &cfg.metrics_path);
    tokio::select! {
        _ = server.run(listener) => {}
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }

    Ok(())
}
