use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use netsnoop::MonitorConfig;

/// Universal process monitor with spawn-burst anomaly detection.
#[derive(Parser, Debug)]
#[command(name = "netsnoop", version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log file path
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Trailing burst window in seconds
    #[arg(long, value_name = "SECONDS")]
    burst_window: Option<u64>,

    /// Spawn count that must be exceeded within the window
    #[arg(long, value_name = "COUNT")]
    burst_threshold: Option<usize>,

    /// Grouped-alert flush interval in seconds
    #[arg(long, value_name = "SECONDS")]
    flush_interval: Option<u64>,

    /// Poll cadence in seconds
    #[arg(long, value_name = "SECONDS")]
    poll_interval: Option<u64>,

    /// Verbose debug output (console echo of log records plus trace logs)
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut MonitorConfig) {
        if let Some(path) = &self.log_file {
            config.log_path = path.clone();
        }
        if let Some(window) = self.burst_window {
            config.burst_window_secs = window;
        }
        if let Some(threshold) = self.burst_threshold {
            config.burst_threshold = threshold;
        }
        if let Some(interval) = self.flush_interval {
            config.flush_interval_secs = interval;
        }
        if let Some(interval) = self.poll_interval {
            config.poll_interval_secs = interval;
        }
        if self.debug {
            config.debug = true;
        }
    }
}

fn init_logger(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if debug {
        EnvFilter::new("info,netsnoop=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(unix)]
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(unix)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = MonitorConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    tracing::info!(
        log = %config.log_path.display(),
        window_secs = config.burst_window_secs,
        threshold = config.burst_threshold,
        "starting process monitor"
    );

    let mut monitor = netsnoop::Monitor::new(netsnoop::ProcfsDirectory, config);
    monitor.run().await?;
    Ok(())
}

#[cfg(not(unix))]
fn main() -> ExitCode {
    eprintln!("netsnoop only supports unix hosts with a /proc filesystem");
    ExitCode::from(1)
}
