mod dispatch;
mod metrics;

pub use dispatch::dispatch_handler;
pub use metrics::metrics_handler;
