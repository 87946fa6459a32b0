//! Command-line options layered on top of the configuration file
//!
//! The gateway password is deliberately not accepted here; it would be
//! visible in process listings. Use `GRIDLOG_PASSWORD` instead.

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "gridlog",
    about = "Poll a home battery gateway and log its power flows",
    version = env!("APP_VERSION")
)]
pub struct Cli {
    /// Config file path (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Gateway hostname or IP address
    #[arg(long)]
    pub hostname: Option<String>,

    /// Polling period in seconds
    #[arg(short, long)]
    pub period: Option<u64>,

    /// Append timeseries lines to this file instead of stdout
    #[arg(short, long)]
    pub outfile: Option<PathBuf>,

    /// Publish the latest sample as JSON at this path
    #[arg(short, long)]
    pub statefile: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Take a single sample and exit
    #[arg(long)]
    pub once: bool,
}

impl Cli {
    /// Overlay explicitly given options onto `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(hostname) = &self.hostname {
            config.gateway.hostname = hostname.trim().to_string();
        }
        if let Some(period) = self.period {
            config.poll_interval_secs = period;
        }
        if let Some(outfile) = &self.outfile {
            config.output.outfile = Some(outfile.clone());
        }
        if let Some(statefile) = &self.statefile {
            config.output.statefile = Some(statefile.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}
