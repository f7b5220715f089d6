use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Deadline for one request.
///
/// When the timer runs out the token is cancelled. Everything working on the
/// request watches that token and gives up. The guard is disarmed explicitly
/// when the request completes, or implicitly when it is dropped.
#[derive(Debug)]
pub struct TimeoutGuard {
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl TimeoutGuard {
    pub fn arm(duration: Duration) -> Self {
        let token = CancellationToken::new();
        let fire = token.clone();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            warn!("request deadline of {:?} elapsed", duration);
            fire.cancel();
        });

        Self { token, timer }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn has_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    // Resolves once the deadline has passed
    pub async fn expired(&self) {
        self.token.cancelled().await;
    }

    /// Stops the timer. No-op if it already fired or was already disarmed.
    pub fn disarm(&self) {
        self.timer.abort();
    }
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        self.timer.abort();
    }
}
