use clap::Parser;
use wrtmon_common::config::{DEFAULT_LISTEN_ADDRESS, DEFAULT_METRICS_PATH};

#[derive(Parser, Debug)]
#[command(name = "wrtmon")]
#[command(about = "Prometheus exporter for OpenWRT routers.")]
#[command(version)]
pub struct CommandLine {
    /// Address to listen on for metrics
    #[arg(long, default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen_address: String,

    /// Path under which to expose metrics
    #[arg(long, default_value = DEFAULT_METRICS_PATH)]
    pub metrics_path: String,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_usual_exporter_port() {
        let cli = CommandLine::try_parse_from(["wrtmon"]).unwrap();
        assert_eq!(cli.listen_address, ":9101");
        assert_eq!(cli.metrics_path, "/metrics");
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn flags_override_defaults() {
        let cli = CommandLine::try_parse_from([
            "wrtmon",
            "--listen-address",
            "127.0.0.1:9200",
            "--metrics-path",
            "/probe",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.listen_address, "127.0.0.1:9200");
        assert_eq!(cli.metrics_path, "/probe");
        assert_eq!(cli.log_level, "debug");
    }
}
