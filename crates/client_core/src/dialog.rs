//! Open/auto-dismiss/close lifecycle shared by every transient dialog.
//!
//! A dialog opened with a duration owns two timers: a frequent ticker that
//! refreshes the countdown shown to the operator, and a single close timer set
//! to exactly the duration. The close timer alone decides expiry, so tick
//! drift never shortens or lengthens a dialog.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use tokio::time::Instant;
use tracing::debug;

use crate::timer::{Ticker, TimerHandle};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Closed by an explicit operator action.
    Dismissed,
    /// The close timer reached the dialog's duration.
    Expired,
    /// Another payload was opened in the same dialog.
    Replaced,
}

type OnClosed = Box<dyn FnOnce(CloseReason) + Send>;

/// What a renderer needs to draw an open dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogView<P> {
    pub payload: P,
    /// `remaining / duration`, from 1.0 down to 0.0. Always 1.0 for dialogs
    /// without a duration.
    pub progress: f64,
    /// Whole seconds left before auto-dismiss, rounded up.
    pub remaining_secs: Option<u64>,
}

struct OpenDialog<P> {
    epoch: u64,
    payload: P,
    opened_at: Instant,
    duration: Option<Duration>,
    progress: f64,
    remaining_secs: Option<u64>,
    on_closed: Option<OnClosed>,
    ticker: Option<Ticker>,
    close_timer: Option<TimerHandle>,
}

impl<P> OpenDialog<P> {
    fn refresh_countdown(&mut self) {
        let Some(duration) = self.duration else {
            return;
        };
        let remaining = duration.saturating_sub(self.opened_at.elapsed());
        let ratio = if duration.is_zero() {
            0.0
        } else {
            remaining.as_secs_f64() / duration.as_secs_f64()
        };
        self.progress = self.progress.min(ratio.clamp(0.0, 1.0));
        self.remaining_secs = Some(ceil_secs(remaining));
    }

    /// Stops both timers. `from_close_timer` is set when the close timer's own
    /// task is the caller, which must not abort itself.
    fn stop_timers(&mut self, from_close_timer: bool) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        if let Some(close_timer) = self.close_timer.take() {
            if from_close_timer {
                close_timer.detach();
            } else {
                close_timer.cancel();
            }
        }
    }
}

struct DialogInner<P> {
    open: Option<OpenDialog<P>>,
    next_epoch: u64,
}

/// A single dialog instance. Clones share the same instance.
pub struct Dialog<P> {
    name: &'static str,
    tick_interval: Duration,
    inner: Arc<Mutex<DialogInner<P>>>,
}

impl<P> Clone for Dialog<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tick_interval: self.tick_interval,
            inner: self.inner.clone(),
        }
    }
}

impl<P> std::fmt::Debug for Dialog<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dialog")
            .field("name", &self.name)
            .field("open", &lock(&self.inner).open.is_some())
            .finish()
    }
}

impl<P> Dialog<P>
where
    P: Clone + Send + 'static,
{
    pub fn new(name: &'static str, tick_interval: Duration) -> Self {
        Self {
            name,
            tick_interval,
            inner: Arc::new(Mutex::new(DialogInner {
                open: None,
                next_epoch: 0,
            })),
        }
    }

    /// Opens the dialog with `payload`. With a duration the dialog closes
    /// itself after exactly that long; without one it stays open until
    /// [`close`](Self::close). A payload already showing is closed first with
    /// [`CloseReason::Replaced`].
    pub fn open<F>(&self, payload: P, duration: Option<Duration>, on_closed: F)
    where
        F: FnOnce(CloseReason) + Send + 'static,
    {
        let replaced = {
            let mut inner = lock(&self.inner);
            let replaced = inner.open.take();
            let epoch = inner.next_epoch;
            inner.next_epoch += 1;

            let (ticker, close_timer) = match duration {
                Some(duration) => {
                    let weak = Arc::downgrade(&self.inner);
                    let ticker = Ticker::start(self.tick_interval, move || tick(&weak, epoch));
                    let weak = Arc::downgrade(&self.inner);
                    let name = self.name;
                    let close_timer =
                        TimerHandle::start(duration, move || expire(&weak, epoch, name));
                    (Some(ticker), Some(close_timer))
                }
                None => (None, None),
            };

            inner.open = Some(OpenDialog {
                epoch,
                payload,
                opened_at: Instant::now(),
                duration,
                progress: 1.0,
                remaining_secs: duration.map(ceil_secs),
                on_closed: Some(Box::new(on_closed)),
                ticker,
                close_timer,
            });
            replaced
        };

        debug!(dialog = self.name, ?duration, "dialog opened");
        if let Some(previous) = replaced {
            finish(previous, CloseReason::Replaced, false);
        }
    }

    /// Closes the dialog and runs its completion callback. No-op when closed.
    pub fn close(&self) -> bool {
        let open = lock(&self.inner).open.take();
        match open {
            Some(open) => {
                debug!(dialog = self.name, "dialog dismissed");
                finish(open, CloseReason::Dismissed, false);
                true
            }
            None => false,
        }
    }

    /// Cancels the timers and forgets the payload without running the
    /// completion callback, for when the owner itself is going away.
    pub fn teardown(&self) {
        let open = lock(&self.inner).open.take();
        if let Some(mut open) = open {
            open.stop_timers(false);
            open.on_closed.take();
            debug!(dialog = self.name, "dialog torn down");
        }
    }

    pub fn is_open(&self) -> bool {
        lock(&self.inner).open.is_some()
    }

    pub fn payload(&self) -> Option<P> {
        lock(&self.inner)
            .open
            .as_ref()
            .map(|open| open.payload.clone())
    }

    pub fn view(&self) -> Option<DialogView<P>> {
        lock(&self.inner).open.as_ref().map(|open| DialogView {
            payload: open.payload.clone(),
            progress: open.progress,
            remaining_secs: open.remaining_secs,
        })
    }

    /// Whether either of the dialog's timers is still scheduled.
    pub fn has_live_timers(&self) -> bool {
        lock(&self.inner).open.as_ref().is_some_and(|open| {
            open.ticker.is_some()
                || open
                    .close_timer
                    .as_ref()
                    .is_some_and(|timer| !timer.is_finished())
        })
    }
}

fn tick<P>(inner: &Weak<Mutex<DialogInner<P>>>, epoch: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut guard = lock(&inner);
    if let Some(open) = guard.open.as_mut().filter(|open| open.epoch == epoch) {
        open.refresh_countdown();
    }
}

fn expire<P>(inner: &Weak<Mutex<DialogInner<P>>>, epoch: u64, name: &'static str) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let open = {
        let mut guard = lock(&inner);
        match guard.open.as_ref() {
            Some(open) if open.epoch == epoch => guard.open.take(),
            _ => None,
        }
    };
    if let Some(open) = open {
        debug!(dialog = name, "dialog expired");
        finish(open, CloseReason::Expired, true);
    }
}

fn finish<P>(mut open: OpenDialog<P>, reason: CloseReason, from_close_timer: bool) {
    open.stop_timers(from_close_timer);
    if let Some(on_closed) = open.on_closed.take() {
        on_closed(reason);
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/dialog_tests.rs"]
mod tests;
