use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};

pub type TickFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type TickFn = Arc<dyn Fn() -> TickFuture + Send + Sync>;

struct ActiveTask {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

/// A periodic task that can be armed and disarmed. Each tick runs to
/// completion before the next one is scheduled, and `stop` waits for an
/// in-flight tick so nothing fires after it returns.
#[derive(Clone, Default)]
pub struct Ticker {
    active: Arc<Mutex<Option<ActiveTask>>>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Returns `false` when a task is already running.
    pub fn start(&self, period: Duration, tick: TickFn) -> bool {
        let mut active = self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if active.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            return false;
        }

        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(run_loop(period, tick, shutdown.clone()));
        *active = Some(ActiveTask { shutdown, handle });
        tracing::debug!(period_ms = period.as_millis() as u64, "ticker armed");
        true
    }

    /// Returns `false` when nothing was running.
    pub async fn stop(&self) -> bool {
        let task = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(task) = task else {
            return false;
        };

        task.shutdown.notify_one();
        if let Err(error) = task.handle.await {
            if !error.is_cancelled() {
                tracing::warn!(error = %error, "ticker task ended abnormally");
            }
        }
        tracing::debug!("ticker disarmed");
        true
    }

    /// Synchronous teardown for drop paths; an in-flight tick is cancelled
    /// at its next await point.
    pub fn abort(&self) {
        let task = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task {
            task.handle.abort();
        }
    }
}

async fn run_loop(period: Duration, tick: TickFn, shutdown: Arc<Notify>) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; live updates start one period in.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = interval.tick() => tick().await,
        }
    }
}
