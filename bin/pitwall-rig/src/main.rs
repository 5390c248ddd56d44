//! ---
//! rig_section: "04-binaries"
//! rig_subsection: "binary"
//! rig_type: "source"
//! rig_scope: "code"
//! rig_description: "Binary entrypoint for the telemetry rig."
//! rig_version: "v0.1.0"
//! rig_owner: "tbd"
//! ---
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use pitwall_common::{init_tracing, LogFormat, RigConfig};
use pitwall_net::{HttpSink, SenderLoop};
use pitwall_sim::{SignalGenerator, TelemetryReading};
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Stream synthetic race-car telemetry to a pit wall endpoint",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        env = "PITWALL_ENDPOINT",
        value_name = "URL",
        help = "Endpoint receiving one POST per reading"
    )]
    endpoint: Option<String>,

    #[arg(long, help = "Milliseconds between readings")]
    interval_ms: Option<u64>,

    #[arg(long, value_name = "STEP", help = "Step at which the vibration anomaly starts")]
    crash_start: Option<u64>,

    #[arg(long, help = "Random seed for signal jitter")]
    seed: Option<u64>,

    #[arg(long, help = "Per-request timeout in milliseconds (transport default when unset)")]
    request_timeout_ms: Option<u64>,

    #[arg(long, value_name = "FORMAT", help = "Console log format (pretty, json)")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Stream readings until interrupted (default)")]
    Run,
    #[command(about = "Generate readings offline and print them as JSON")]
    Preview {
        /// Number of readings to generate, starting at step 0
        #[arg(long, default_value_t = 45)]
        steps: u64,

        /// Output file path. Use '-' for stdout.
        #[arg(long, default_value = "-")]
        output: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        if !path.exists() {
            return Err(anyhow!("config file {} does not exist", path.display()));
        }
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("pitwall.toml"));

    let loaded = RigConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    apply_overrides(&cli, &mut config);
    config.validate()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            // Dropped at the end of this arm, flushing the stop banner.
            let _guard = init_tracing("pitwall-rig", &config.logging)?;
            match &loaded.source {
                Some(path) => info!(config_path = %path.display(), "configuration loaded"),
                None => info!("no configuration file found; using defaults"),
            }
            run_rig(config).await
        }
        Commands::Preview { steps, output } => preview(&config, steps, &output),
    }
}

fn apply_overrides(cli: &Cli, config: &mut RigConfig) {
    if let Some(endpoint) = &cli.endpoint {
        config.rig.endpoint = Some(endpoint.clone());
    }
    if let Some(ms) = cli.interval_ms {
        config.rig.send_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = cli.request_timeout_ms {
        config.rig.request_timeout = Some(Duration::from_millis(ms));
    }
    if let Some(seed) = cli.seed {
        config.rig.random_seed = Some(seed);
    }
    if let Some(frame) = cli.crash_start {
        config.signal.crash_start_frame = frame;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
}

fn build_generator(config: &RigConfig) -> SignalGenerator {
    match config.rig.random_seed {
        Some(seed) => SignalGenerator::new(config.signal.clone(), seed),
        None => SignalGenerator::from_entropy(config.signal.clone()),
    }
}

async fn run_rig(config: RigConfig) -> Result<()> {
    let endpoint = config.rig.endpoint_url()?;
    let sink = HttpSink::new(endpoint, config.rig.request_timeout)
        .context("failed to build http client")?;
    let sender = SenderLoop::new(build_generator(&config), sink, config.rig.send_interval);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("ctrl-c received; stopping after the current iteration");
                let _ = shutdown_tx.send(true);
            }
            Err(err) => {
                warn!(error = %err, "unable to listen for ctrl-c; rig must be killed externally");
                // Keep the sender alive; dropping it stops the loop.
                let _keep = shutdown_tx;
                std::future::pending::<()>().await;
            }
        }
    });

    sender.run(shutdown_rx).await;
    Ok(())
}

fn preview(config: &RigConfig, steps: u64, output: &Path) -> Result<()> {
    if steps == 0 {
        return Err(anyhow!("steps must be greater than zero"));
    }
    let readings = generate_readings(config, steps);
    if output.as_os_str() == "-" {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &readings)?;
        stdout.write_all(b"\n")?;
    } else {
        let file = File::create(output)
            .with_context(|| format!("failed to create output file {}", output.display()))?;
        serde_json::to_writer_pretty(file, &readings)?;
        eprintln!("generated {} readings -> {}", steps, output.display());
    }
    Ok(())
}

fn generate_readings(config: &RigConfig, steps: u64) -> Vec<TelemetryReading> {
    let mut generator = build_generator(config);
    (0..steps).map(|step| generator.reading(step)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn base_cli() -> Cli {
        Cli {
            config: None,
            endpoint: None,
            interval_ms: None,
            crash_start: None,
            seed: None,
            request_timeout_ms: None,
            log_format: None,
            command: None,
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_preview_subcommand() {
        let cli = Cli::try_parse_from([
            "pitwall-rig",
            "--seed",
            "3",
            "preview",
            "--steps",
            "10",
        ])
        .unwrap();
        assert_eq!(cli.seed, Some(3));
        match cli.command {
            Some(Commands::Preview { steps, output }) => {
                assert_eq!(steps, 10);
                assert_eq!(output, PathBuf::from("-"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_log_format_flag() {
        let cli = Cli::try_parse_from(["pitwall-rig", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, Some(LogFormat::StructuredJson));
        let cli = Cli::try_parse_from(["pitwall-rig", "--log-format", "structured-json"]).unwrap();
        assert_eq!(cli.log_format, Some(LogFormat::StructuredJson));
        assert!(Cli::try_parse_from(["pitwall-rig", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut cli = base_cli();
        cli.endpoint = Some("http://127.0.0.1:9000/hook".into());
        cli.interval_ms = Some(1000);
        cli.request_timeout_ms = Some(250);
        cli.seed = Some(99);
        cli.crash_start = Some(30);
        cli.log_format = Some(LogFormat::StructuredJson);

        let mut config = RigConfig::default();
        apply_overrides(&cli, &mut config);
        config.validate().unwrap();

        assert_eq!(config.rig.endpoint.as_deref(), Some("http://127.0.0.1:9000/hook"));
        assert_eq!(config.rig.send_interval, Duration::from_secs(1));
        assert_eq!(config.rig.request_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.rig.random_seed, Some(99));
        assert_eq!(config.signal.crash_start_frame, 30);
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
    }

    #[test]
    fn absent_overrides_keep_defaults() {
        let mut config = RigConfig::default();
        apply_overrides(&base_cli(), &mut config);
        assert!(config.rig.endpoint.is_none());
        assert_eq!(config.rig.send_interval, Duration::from_millis(500));
        assert_eq!(config.signal.crash_start_frame, 15);
    }

    #[test]
    fn zero_interval_override_fails_validation() {
        let mut cli = base_cli();
        cli.interval_ms = Some(0);
        let mut config = RigConfig::default();
        apply_overrides(&cli, &mut config);
        assert!(config.validate().is_err());
    }

    #[test]
    fn seeded_preview_is_reproducible() {
        let mut config = RigConfig::default();
        config.rig.random_seed = Some(5);
        let first = generate_readings(&config, 20);
        let second = generate_readings(&config, 20);
        assert_eq!(first.len(), 20);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.vibration, b.vibration);
            assert_eq!(a.temperature, b.temperature);
        }
    }

    #[test]
    fn preview_writes_json_file() {
        let mut config = RigConfig::default();
        config.rig.random_seed = Some(1);
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        preview(&config, 16, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let readings: Vec<TelemetryReading> = serde_json::from_str(&raw).unwrap();
        assert_eq!(readings.len(), 16);
        assert!(readings[15].vibration > 52.0);
    }

    #[test]
    fn preview_rejects_zero_steps() {
        let config = RigConfig::default();
        assert!(preview(&config, 0, Path::new("-")).is_err());
    }
}
