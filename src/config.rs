use clap::Parser;
use std::time::Duration;

use crate::routes::DEFAULT_ROUTES;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "edge-gateway")]
#[command(about = "Prefix-routing reverse proxy with rate limiting and request deadlines")]
pub struct Args {
    // Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 3333)]
    pub port: u16,

    // Routes as PREFIX=TARGET, first match wins
    // Example: "/auth=localhost:3333/auth"
    #[arg(
        short,
        long = "route",
        value_name = "PREFIX=TARGET",
        env = "GATEWAY_ROUTES",
        value_delimiter = ',',
        default_values_t = DEFAULT_ROUTES.iter().map(|s| s.to_string()).collect::<Vec<_>>()
    )]
    pub routes: Vec<String>,

    // Rate limit max requests per client per window
    #[arg(long, default_value_t = 20)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    // Empty windows before a client's counter is dropped
    #[arg(long, default_value_t = 10)]
    pub idle_windows: u32,

    // Per-request deadline in milliseconds
    #[arg(long, default_value_t = 15_000)]
    pub request_timeout_ms: u64,

    // Serve Prometheus metrics on this port (disabled when unset)
    #[arg(long)]
    pub metrics_port: Option<u16>,
}

impl Args {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
