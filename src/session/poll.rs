//! Retry-until-condition-or-deadline

use std::future::Future;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

/// Run `query` on a fixed interval until `accept` holds or `limit` elapses
///
/// The first attempt starts immediately. Returns the accepted value, or
/// `None` exactly when `limit` runs out (an attempt in flight is dropped).
pub async fn poll_until<T, F, Fut, A>(
    limit: Duration,
    interval: Duration,
    mut query: F,
    accept: A,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
    A: Fn(&T) -> bool,
{
    // tokio intervals cannot be zero
    let mut ticker = time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let attempts = async {
        loop {
            ticker.tick().await;
            if let Some(value) = query().await {
                if accept(&value) {
                    return value;
                }
            }
        }
    };

    time::timeout(limit, attempts).await.ok()
}
