use std::{
    future::{self, Future},
    pin::Pin,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use tokio::time::{self, Instant};

/// Resolves with the elapsed time once the time limit is reached.
pub type TimeLimitNotification = Pin<Box<dyn Future<Output = Duration> + Send + 'static>>;

pub trait Stopwatch: Send + Sync {
    /// Starts measuring a new test.
    fn arm(&self) -> TimeLimitNotification;

    /// The limit recorded as the running time of a test that hit it.
    fn limit(&self) -> Duration;
}

fn never() -> TimeLimitNotification {
    Box::pin(future::pending())
}

/// Uses the tokio clock, so a paused test runtime controls it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurableStopwatch {
    tl: Duration,
}

impl ConfigurableStopwatch {
    /// A zero `tl` disables the time limit.
    pub fn new(tl: Duration) -> Self {
        Self { tl }
    }
}

impl Stopwatch for ConfigurableStopwatch {
    fn arm(&self) -> TimeLimitNotification {
        if self.tl.is_zero() {
            return never();
        }
        let started_at = Instant::now();
        let deadline = started_at + self.tl;
        Box::pin(async move {
            time::sleep_until(deadline).await;
            started_at.elapsed()
        })
    }

    fn limit(&self) -> Duration {
        self.tl
    }
}

/// Deterministic stopwatch: the `tl_at_call`-th call to `arm` and every later one fire
/// immediately, earlier ones never fire. A threshold of 0 never fires.
#[derive(Debug, Default)]
pub struct SpyStopwatch {
    pub tl_at_call: usize,
    calls: AtomicUsize,
}

impl SpyStopwatch {
    pub fn new(tl_at_call: usize) -> Self {
        Self {
            tl_at_call,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Stopwatch for SpyStopwatch {
    fn arm(&self) -> TimeLimitNotification {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tl_at_call == 0 || call < self.tl_at_call {
            return never();
        }
        Box::pin(future::ready(self.limit()))
    }

    fn limit(&self) -> Duration {
        Duration::from_nanos(self.tl_at_call as u64)
    }
}

#[cfg(test)]
mod test {
    use tokio::time::{sleep, timeout};

    use super::*;

    const TICK: Duration = Duration::from_millis(1);

    #[tokio::test(start_paused = true)]
    async fn spy_fires_from_the_configured_call() {
        const TOTAL_CALLS: usize = 5;
        let swatch = SpyStopwatch::new(TOTAL_CALLS);

        for i in 0..TOTAL_CALLS - 1 {
            assert!(
                timeout(TICK, swatch.arm()).await.is_err(),
                "got TL at call #{}, want at call #{}",
                i + 1,
                TOTAL_CALLS
            );
        }

        let first = timeout(TICK, swatch.arm()).await.expect("no TL at threshold call");
        let second = timeout(TICK, swatch.arm()).await.expect("no TL after threshold call");

        assert_eq!(first, second);
        assert_eq!(first, Duration::from_nanos(TOTAL_CALLS as u64));
        assert_eq!(swatch.call_count(), TOTAL_CALLS + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn spy_with_zero_threshold_never_fires() {
        let swatch = SpyStopwatch::default();
        for i in 0..10 {
            assert!(
                timeout(TICK, swatch.arm()).await.is_err(),
                "got TL at call #{}, want none",
                i + 1
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn configurable_fires_after_time_limit() {
        let tl = Duration::from_millis(7);
        let step = Duration::from_millis(2);
        let swatch = ConfigurableStopwatch::new(tl);
        let mut notification = swatch.arm();

        for i in 0..3 {
            tokio::select! {
                _ = &mut notification => panic!("got TL at {:?}, want at {:?}", step * i, tl),
                _ = sleep(step) => {}
            }
        }

        let elapsed = timeout(step, notification)
            .await
            .expect("got no TL at the time limit");
        assert!(elapsed >= tl, "fired early: {:?}", elapsed);
        assert!(elapsed - tl <= TICK, "deviates too much: {:?}", elapsed);
        assert_eq!(swatch.limit(), tl);
    }

    #[tokio::test(start_paused = true)]
    async fn configurable_measures_from_arm_time() {
        let swatch = ConfigurableStopwatch::new(Duration::from_secs(3));
        let notification = swatch.arm();
        sleep(Duration::from_secs(2)).await;

        let elapsed = timeout(Duration::from_millis(1001), notification)
            .await
            .expect("time limit should fire one second after polling starts");
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed - Duration::from_secs(3) <= TICK);
    }

    #[tokio::test(start_paused = true)]
    async fn configurable_zero_never_fires() {
        let swatch = ConfigurableStopwatch::new(Duration::ZERO);
        assert!(timeout(Duration::from_secs(3600), swatch.arm()).await.is_err());
        assert_eq!(swatch.limit(), Duration::ZERO);
    }
}
