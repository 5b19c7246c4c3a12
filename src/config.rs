use std::time::Duration;

use clap::Parser;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "HTTP-controlled synthetic CPU load generator", long_about = None)]
pub struct Opts {
    /// Address to bind the HTTP server to
    #[arg(long, env = "STRESS_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(short, long, env = "STRESS_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Workers per run. Defaults to one per logical core
    #[arg(short, long, env = "STRESS_WORKERS")]
    pub workers: Option<usize>,

    /// Seconds to wait for workers to exit on shutdown
    #[arg(long, env = "STRESS_SHUTDOWN_GRACE_SECS", default_value_t = 5)]
    pub shutdown_grace_secs: u64,

    /// Log filter used when RUST_LOG is unset. Examples: ["info", "debug,actix_web=warn"]
    #[arg(short, long, env = "STRESS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Opts {
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// `RUST_LOG` if set, else `--log-level`, else `info`.
    pub fn log_filter(&self) -> EnvFilter {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }

        EnvFilter::try_new(&self.log_level).unwrap_or_else(|e| {
            eprintln!("ignoring log level {:?} ({}), using info", self.log_level, e);
            EnvFilter::new("info")
        })
    }
}
