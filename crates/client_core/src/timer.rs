//! Cancellable one-shot timers and repeating tickers on the tokio runtime.

use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

/// Owned handle to a scheduled callback. Cancels the callback when dropped
/// unless it has been [`detach`](TimerHandle::detach)ed.
#[derive(Debug)]
pub struct TimerHandle {
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Schedules `callback` to run once after `delay`.
    ///
    /// The callback runs synchronously inside the timer task, so once it has
    /// started a later `cancel` cannot interrupt it. Work that must outlive the
    /// timer should be spawned from the callback.
    pub fn start<F>(delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            time::sleep(delay).await;
            callback();
        });
        Self { task: Some(task) }
    }

    pub fn cancel(mut self) {
        self.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Releases the handle without cancelling the task. Used by a timer's own
    /// callback when it clears the slot it lives in.
    pub fn detach(mut self) {
        self.task.take();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Repeating callback, first invoked immediately and then every `period`.
#[derive(Debug)]
pub struct Ticker {
    task: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn start<F>(period: Duration, mut callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                callback();
            }
        });
        Self { task: Some(task) }
    }

    pub fn cancel(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Holds at most one pending timer. Installing a new timer cancels the
/// previous one; dropping the slot cancels whatever is pending.
#[derive(Debug, Default)]
pub struct TimerSlot {
    pending: Option<TimerHandle>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, handle: TimerHandle) {
        if let Some(previous) = self.pending.replace(handle) {
            previous.cancel();
        }
    }

    pub fn start<F>(&mut self, delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.replace(TimerHandle::start(delay, callback));
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let reader = count.clone();
        (count, move || reader.load(Ordering::SeqCst))
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let (count, fired) = counter();
        let _handle = TimerHandle::start(Duration::from_millis(500), move || {
            count.fetch_add(1, Ordering::SeqCst);
        });

        time::sleep(Duration::from_millis(499)).await;
        assert_eq!(fired(), 0);
        time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (count, fired) = counter();
        let handle = TimerHandle::start(Duration::from_millis(100), move || {
            count.fetch_add(1, Ordering::SeqCst);
        });
        handle.cancel();

        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slot_keeps_only_the_latest_timer() {
        let (count, fired) = counter();
        let mut slot = TimerSlot::new();
        for _ in 0..3 {
            let count = count.clone();
            slot.start(Duration::from_millis(100), move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
            time::sleep(Duration::from_millis(50)).await;
        }
        assert!(slot.is_pending());

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired(), 1);
        assert!(!slot.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_slot_cancels_pending_timer() {
        let (count, fired) = counter();
        {
            let mut slot = TimerSlot::new();
            slot.start(Duration::from_millis(100), move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_repeats_until_cancelled() {
        let (count, ticks) = counter();
        let ticker = Ticker::start(Duration::from_millis(10), move || {
            count.fetch_add(1, Ordering::SeqCst);
        });

        time::sleep(Duration::from_millis(35)).await;
        ticker.cancel();
        let seen = ticks();
        assert!(seen >= 3, "expected at least three ticks, saw {seen}");

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ticks(), seen);
    }
}
