//! Debounces query edits into at most one lookup per settle window.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tracing::debug;

use crate::{pipeline::MutationPipeline, timer::TimerSlot};

#[derive(Debug, Default)]
struct SchedulerState {
    pending: TimerSlot,
    last_query: String,
}

#[derive(Clone)]
pub struct SearchScheduler {
    pipeline: MutationPipeline,
    debounce: Duration,
    state: Arc<Mutex<SchedulerState>>,
}

impl SearchScheduler {
    pub fn new(pipeline: MutationPipeline, debounce: Duration) -> Self {
        Self {
            pipeline,
            debounce,
            state: Arc::new(Mutex::new(SchedulerState::default())),
        }
    }

    /// Records `query` as the active query and restarts the settle window.
    /// When the window elapses untouched, an empty query lists the whole
    /// roster and anything else searches for it.
    pub async fn on_query_changed(&self, query: &str) {
        self.pipeline.store().set_active_query(query).await;

        let pipeline = self.pipeline.clone();
        let settled = query.to_string();
        let mut state = lock(&self.state);
        query.clone_into(&mut state.last_query);
        state.pending.start(self.debounce, move || {
            debug!(query = %settled, "search query settled");
            // The lookup outlives the timer.
            tokio::spawn(async move {
                let _ = pipeline.refresh_for_query(&settled).await;
            });
        });
        debug!(
            query,
            debounce_ms = self.debounce.as_millis() as u64,
            "search debounce restarted"
        );
    }

    pub fn last_query(&self) -> String {
        lock(&self.state).last_query.clone()
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.state).pending.is_pending()
    }

    /// Drops a not-yet-fired lookup.
    pub fn cancel(&self) {
        lock(&self.state).pending.cancel();
    }

    /// Drops a not-yet-fired lookup and forgets the last query.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.pending.cancel();
        state.last_query.clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/search_tests.rs"]
mod tests;
