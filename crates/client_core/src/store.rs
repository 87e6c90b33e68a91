//! Roster state shared by the search scheduler and the mutation pipeline.

use std::sync::Arc;

use shared::domain::{UserId, UserRecord};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    config::DialogTimings,
    dialog::{Dialog, DialogView},
    notification::Notification,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterState {
    /// Most recent first.
    pub records: Vec<UserRecord>,
    pub loading: bool,
    pub active_query: String,
    pub searching: bool,
    issued_reads: u64,
}

impl Default for RosterState {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            loading: true,
            active_query: String::new(),
            searching: false,
            issued_reads: 0,
        }
    }
}

/// Read-only copy of the store handed to the render layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterSnapshot {
    pub records: Vec<UserRecord>,
    pub loading: bool,
    pub active_query: String,
    pub searching: bool,
    pub notification: Option<DialogView<Notification>>,
}

/// Generation of a list or search request. Only the newest issued read may
/// replace the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTicket(u64);

#[derive(Clone)]
pub struct RosterStore {
    state: Arc<Mutex<RosterState>>,
    notification: Dialog<Notification>,
    timings: DialogTimings,
}

impl RosterStore {
    pub fn new(timings: DialogTimings) -> Self {
        Self {
            state: Arc::new(Mutex::new(RosterState::default())),
            notification: Dialog::new("roster-notification", timings.tick_interval),
            timings,
        }
    }

    pub fn timings(&self) -> DialogTimings {
        self.timings
    }

    pub async fn snapshot(&self) -> RosterSnapshot {
        let state = self.state.lock().await;
        RosterSnapshot {
            records: state.records.clone(),
            loading: state.loading,
            active_query: state.active_query.clone(),
            searching: state.searching,
            notification: self.notification.view(),
        }
    }

    pub async fn records(&self) -> Vec<UserRecord> {
        self.state.lock().await.records.clone()
    }

    pub async fn find(&self, id: &UserId) -> Option<UserRecord> {
        self.state
            .lock()
            .await
            .records
            .iter()
            .find(|record| &record.id == id)
            .cloned()
    }

    pub async fn begin_read(&self) -> ReadTicket {
        issue_read(&mut *self.state.lock().await, false)
    }

    /// Issues a read and marks a search as in flight until it, or a newer
    /// read, completes.
    pub async fn begin_search(&self) -> ReadTicket {
        issue_read(&mut *self.state.lock().await, true)
    }

    /// Issues the read for a settled `query`. `None` when the active query
    /// has moved on since it was typed, as after a resynchronization.
    pub async fn begin_settled_read(&self, query: &str) -> Option<ReadTicket> {
        let mut state = self.state.lock().await;
        if state.active_query != query {
            debug!(
                settled = query,
                active = %state.active_query,
                "dropping lookup for superseded query"
            );
            return None;
        }
        Some(issue_read(&mut state, !query.is_empty()))
    }

    /// Replaces the records with the result of `ticket`'s read, unless a newer
    /// read has been issued since. Returns whether the result was applied.
    pub async fn apply_read(&self, ticket: ReadTicket, records: Vec<UserRecord>) -> bool {
        let mut state = self.state.lock().await;
        if ticket.0 != state.issued_reads {
            debug!(
                ticket = ticket.0,
                newest = state.issued_reads,
                "discarding stale roster read"
            );
            return false;
        }
        state.records = records;
        state.loading = false;
        state.searching = false;
        true
    }

    /// Ends a read that produced no records. Clears the loading and searching
    /// flags only for the newest read.
    pub async fn finish_failed_read(&self, ticket: ReadTicket) {
        let mut state = self.state.lock().await;
        if ticket.0 == state.issued_reads {
            state.loading = false;
            state.searching = false;
        }
    }

    pub async fn prepend(&self, record: UserRecord) {
        self.state.lock().await.records.insert(0, record);
    }

    pub async fn set_active_query(&self, query: &str) {
        query.clone_into(&mut self.state.lock().await.active_query);
    }

    /// Discards every locally derived value so the next list rebuilds the
    /// roster from scratch. In-flight reads become stale.
    pub async fn force_resync(&self) {
        let mut state = self.state.lock().await;
        state.records.clear();
        state.active_query.clear();
        state.searching = false;
        state.loading = true;
        state.issued_reads += 1;
        info!("roster state discarded for full resynchronization");
    }

    /// Shows `notification` in the roster-level slot, replacing whatever was
    /// showing there.
    pub fn notify(&self, notification: Notification) {
        let duration = notification.duration;
        self.notification.open(notification, duration, |_| {});
    }

    pub fn notify_success(&self, message: impl Into<String>) {
        self.notify(Notification::success(message, self.timings.success));
    }

    pub fn notify_error(&self, message: impl Into<String>) {
        self.notify(Notification::error(message, self.timings.error));
    }

    pub fn notification(&self) -> Option<Notification> {
        self.notification.payload()
    }

    pub fn notification_dialog(&self) -> &Dialog<Notification> {
        &self.notification
    }

    pub fn dismiss_notification(&self) -> bool {
        self.notification.close()
    }

    /// Closes the roster notification only when it reports an error.
    pub fn dismiss_error(&self) {
        if self
            .notification
            .payload()
            .is_some_and(|notification| notification.is_error())
        {
            self.notification.close();
        }
    }

    pub fn teardown(&self) {
        self.notification.teardown();
    }
}

fn issue_read(state: &mut RosterState, searching: bool) -> ReadTicket {
    state.issued_reads += 1;
    state.searching = searching;
    ReadTicket(state.issued_reads)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> UserRecord {
        UserRecord {
            id: UserId::from(id),
            name: "John Doe".into(),
            email: format!("{id}@x.com"),
            mobile: "0123456789".into(),
        }
    }

    #[tokio::test]
    async fn only_newest_read_is_applied() {
        let store = RosterStore::new(DialogTimings::default());
        let older = store.begin_read().await;
        let newer = store.begin_read().await;

        assert!(store.apply_read(newer, vec![record("b")]).await);
        assert!(!store.apply_read(older, vec![record("a")]).await);

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.records, vec![record("b")]);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn force_resync_invalidates_in_flight_reads() {
        let store = RosterStore::new(DialogTimings::default());
        let ticket = store.begin_read().await;
        assert!(store.apply_read(ticket, vec![record("a")]).await);
        store.set_active_query("jo").await;

        let in_flight = store.begin_read().await;
        store.force_resync().await;
        assert!(!store.apply_read(in_flight, vec![record("stale")]).await);

        let snapshot = store.snapshot().await;
        assert!(snapshot.records.is_empty());
        assert!(snapshot.loading);
        assert_eq!(snapshot.active_query, "");
    }

    #[tokio::test]
    async fn searching_tracks_only_the_newest_read() {
        let store = RosterStore::new(DialogTimings::default());
        let older = store.begin_search().await;
        let newer = store.begin_search().await;

        assert!(!store.apply_read(older, vec![record("a")]).await);
        assert!(store.snapshot().await.searching);

        store.finish_failed_read(newer).await;
        assert!(!store.snapshot().await.searching);
    }

    #[tokio::test]
    async fn settled_read_requires_the_query_to_still_be_active() {
        let store = RosterStore::new(DialogTimings::default());
        store.set_active_query("jo").await;
        assert!(store.begin_settled_read("jo").await.is_some());
        assert!(store.snapshot().await.searching);

        store.force_resync().await;
        assert!(store.begin_settled_read("jo").await.is_none());
        assert!(!store.snapshot().await.searching);
        assert!(store.begin_settled_read("").await.is_some());
    }

    #[tokio::test]
    async fn dismiss_error_keeps_success_notifications() {
        let store = RosterStore::new(DialogTimings::default());
        store.notify_success("Successfully deleted 5 users");
        store.dismiss_error();
        assert!(store.notification().is_some());

        store.notify_error("Failed to load users. Please try again later.");
        store.dismiss_error();
        assert!(store.notification().is_none());
    }
}
