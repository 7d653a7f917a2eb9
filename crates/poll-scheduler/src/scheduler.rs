use crate::{SchedulerError, SchedulerResult};
use std::future::Future;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Poll period used when the configuration does not override it.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

struct Armed {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Owns the single repeating poll timer.
///
/// Ticks that are missed while a trigger is still running are skipped, not
/// replayed. Dropping the scheduler cancels the timer.
pub struct PollScheduler {
    period: Duration,
    run_immediately: bool,
    armed: Option<Armed>,
}

impl PollScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            run_immediately: false,
            armed: None,
        }
    }

    /// Fire once right after arming instead of waiting a full period first.
    pub fn run_immediately(mut self, enabled: bool) -> Self {
        self.run_immediately = enabled;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_armed(&self) -> bool {
        self.armed
            .as_ref()
            .is_some_and(|armed| !armed.task.is_finished())
    }

    /// Start calling `trigger` every period.
    ///
    /// Any previously armed timer is cancelled first, so arming is
    /// idempotent. Must be called from within a tokio runtime.
    pub fn arm<F, Fut>(&mut self, mut trigger: F) -> SchedulerResult<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.period.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;

        if self.cancel() {
            debug!("Replacing existing poll timer");
        }

        let period = self.period;
        let start = if self.run_immediately {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let (stop, mut stopped) = oneshot::channel::<()>();

        let task = runtime.spawn(async move {
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stopped => break,
                    _ = ticker.tick() => trigger().await,
                }
            }

            debug!("Poll timer stopped");
        });

        info!(interval_ms = period.as_millis() as u64, "Poll timer armed");
        self.armed = Some(Armed { stop, task });
        Ok(())
    }

    /// Stop the timer. Returns whether one was armed.
    ///
    /// A trigger already in flight finishes in the background; use
    /// [`shutdown`](Self::shutdown) to wait for it.
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some(armed) => {
                let _ = armed.stop.send(());
                true
            }
            None => false,
        }
    }

    /// Stop the timer and wait for an in-flight trigger to finish.
    pub async fn shutdown(&mut self) {
        let Some(armed) = self.armed.take() else {
            return;
        };
        let _ = armed.stop.send(());
        if let Err(err) = armed.task.await {
            warn!(error = %err, "Poll timer task ended abnormally");
        }
        info!("Poll timer shut down");
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    type Trigger = Box<dyn FnMut() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

    fn counting(count: &Arc<AtomicUsize>) -> Trigger {
        let count = count.clone();
        Box::new(move || {
            let count = count.clone();
            Box::pin(async move {
                count.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    fn fired(count: &Arc<AtomicUsize>) -> usize {
        count.load(Ordering::SeqCst)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scheduler = PollScheduler::new(Duration::from_secs(10));
        scheduler.arm(counting(&count)).unwrap();

        sleep(Duration::from_secs(5)).await;
        assert_eq!(fired(&count), 0);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(fired(&count), 3);
        assert!(scheduler.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn run_immediately_fires_on_arm() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scheduler = PollScheduler::new(Duration::from_secs(10)).run_immediately(true);
        scheduler.arm(counting(&count)).unwrap();

        sleep(Duration::from_secs(1)).await;
        assert_eq!(fired(&count), 1);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(fired(&count), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_previous_timer() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut scheduler = PollScheduler::new(Duration::from_secs(10));

        scheduler.arm(counting(&first)).unwrap();
        scheduler.arm(counting(&second)).unwrap();
        scheduler.arm(counting(&second)).unwrap();

        sleep(Duration::from_secs(35)).await;
        assert_eq!(fired(&first), 0);
        assert_eq!(fired(&second), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_future_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scheduler = PollScheduler::new(Duration::from_secs(10));
        scheduler.arm(counting(&count)).unwrap();

        sleep(Duration::from_secs(15)).await;
        assert!(scheduler.cancel());
        assert!(!scheduler.is_armed());
        assert!(!scheduler.cancel());

        sleep(Duration::from_secs(30)).await;
        assert_eq!(fired(&count), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let mut scheduler = PollScheduler::new(Duration::from_secs(10));
            scheduler.arm(counting(&count)).unwrap();
        }

        sleep(Duration::from_secs(35)).await;
        assert_eq!(fired(&count), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_in_flight_trigger() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut scheduler = PollScheduler::new(Duration::from_secs(10));
        let flag = done.clone();
        scheduler
            .arm(move || {
                let flag = flag.clone();
                async move {
                    sleep(Duration::from_secs(5)).await;
                    flag.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();

        // First trigger runs from t=10s to t=15s.
        sleep(Duration::from_secs(12)).await;
        assert_eq!(fired(&done), 0);

        scheduler.shutdown().await;
        assert_eq!(fired(&done), 1);
        assert!(!scheduler.is_armed());
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let mut scheduler = PollScheduler::new(Duration::ZERO);
        let result = scheduler.arm(|| async {});
        assert_eq!(result, Err(SchedulerError::ZeroInterval));
    }

    #[test]
    fn arming_outside_a_runtime_is_an_error() {
        let mut scheduler = PollScheduler::new(DEFAULT_POLL_INTERVAL);
        assert_eq!(scheduler.arm(|| async {}), Err(SchedulerError::NoRuntime));
        assert!(!scheduler.is_armed());
    }
}
