use std::sync::Arc;
use std::time::Duration;
use crate::proxy::Forwarder;
use crate::rate_limit::RateLimiter;
use crate::routes::RouteTable;
// app's shared state

pub struct AppState {
    pub forwarder: Forwarder,
    pub routes: RouteTable,
    pub rate_limiter: Arc<RateLimiter>, // shared with the reset task
    pub request_timeout: Duration,      // deadline per proxied request
}
