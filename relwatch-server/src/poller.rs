//! Background release poller
//!
//! Periodically refreshes every tracked repository so new releases show up
//! without a manual refresh. Stops when the shutdown channel flips to `true`.

use std::sync::Arc;
use std::time::Duration;

use relwatch_core::Tracker;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct Poller {
    tracker: Arc<Tracker>,
    every: Duration,
}

impl Poller {
    pub fn new(tracker: Arc<Tracker>, every: Duration) -> Self {
        Self { tracker, every }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Refresh immediately, then once per interval until shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(every_secs = self.every.as_secs(), "release poller started");

        let mut ticker = tokio::time::interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tracker.refresh_all().await {
                        Ok(summary) => tracing::debug!(
                            refreshed = summary.refreshed,
                            failed = summary.failed,
                            "poll complete"
                        ),
                        Err(e) => tracing::error!(error = %e, "poll failed"),
                    }
                }
                changed = shutdown.changed() => {
                    // a dropped sender also ends polling
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("release poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relwatch_core::provider::MockProvider;
    use relwatch_core::store::MemoryStore;

    #[tokio::test(start_paused = true)]
    async fn polls_on_interval_until_shutdown() {
        let provider = Arc::new(MockProvider::new());
        provider.add_repo("foo", "bar", None);
        let tracker = Arc::new(Tracker::new(Arc::new(MemoryStore::new()), provider.clone()));
        tracker
            .add_repository(&tracker.context(None), "https://github.com/foo/bar")
            .await
            .unwrap();
        let after_add = provider.call_count();

        let (tx, rx) = watch::channel(false);
        let handle = Poller::new(Arc::clone(&tracker), Duration::from_secs(60)).spawn(rx);

        // ticks at 0s, 60s and 120s
        tokio::time::sleep(Duration::from_secs(150)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(provider.call_count(), after_add + 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_stops_poller() {
        let tracker = Arc::new(Tracker::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MockProvider::new()),
        ));
        let (tx, rx) = watch::channel(false);
        let handle = Poller::new(tracker, Duration::from_secs(3600)).spawn(rx);

        drop(tx);
        handle.await.unwrap();
    }
}
