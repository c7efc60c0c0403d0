use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::mirror::CourseMirror;

/// `tokio::time::interval` rejects a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Live subscription to the remote course collection.
/// Dropping the handle tears the subscription down.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl CourseMirror {
    /// Polls the remote collection every `interval`, starting immediately,
    /// and replaces local state with each snapshot.
    pub fn subscribe(self: &Arc<Self>, interval: Duration) -> Subscription {
        let interval = interval.max(MIN_INTERVAL);
        info!("Starting course subscription (interval: {:?})", interval);
        let mirror = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                mirror.refresh().await;
            }
        });

        Subscription { handle }
    }
}
