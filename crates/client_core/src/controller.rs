//! Operator actions wired onto the store, pipeline, scheduler and form.

use std::sync::Arc;

use shared::domain::UserId;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    config::ClientSettings,
    dialog::{Dialog, DialogView},
    directory::{DirectoryApi, DirectoryError, HttpDirectoryClient, ImportFile},
    form::{FormSession, FormSnapshot, SubmitOutcome},
    notification::Notification,
    pipeline::{ExportArtifact, MutationError, MutationPipeline},
    search::SearchScheduler,
    store::{RosterSnapshot, RosterStore},
    validation::Field,
};

/// Destructive action waiting on the operator's confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    DeleteUser(UserId),
    DeleteAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub notification: Notification,
    pub action: PendingAction,
}

pub struct RosterController {
    store: RosterStore,
    pipeline: MutationPipeline,
    scheduler: SearchScheduler,
    confirmation: Dialog<ConfirmationRequest>,
    form: Mutex<Option<FormSession>>,
}

impl RosterController {
    pub fn new(directory: Arc<dyn DirectoryApi>, settings: &ClientSettings) -> Self {
        let store = RosterStore::new(settings.dialogs);
        let pipeline = MutationPipeline::new(directory, store.clone());
        let scheduler = SearchScheduler::new(pipeline.clone(), settings.search_debounce);
        Self {
            confirmation: Dialog::new("confirmation", settings.dialogs.tick_interval),
            store,
            pipeline,
            scheduler,
            form: Mutex::new(None),
        }
    }

    /// Builds a controller talking to the directory at
    /// `settings.api_base_url`.
    pub fn connect(settings: &ClientSettings) -> Result<Self, DirectoryError> {
        let client = HttpDirectoryClient::new(&settings.api_base_url, settings.request_timeout)?;
        info!(base_url = %client.base_url(), "directory client ready");
        Ok(Self::new(Arc::new(client), settings))
    }

    pub fn store(&self) -> &RosterStore {
        &self.store
    }

    pub async fn start(&self) -> Result<usize, MutationError> {
        self.pipeline.list().await
    }

    pub async fn set_query(&self, query: &str) {
        self.scheduler.on_query_changed(query).await;
    }

    pub async fn snapshot(&self) -> RosterSnapshot {
        self.store.snapshot().await
    }

    pub fn dismiss_notification(&self) -> bool {
        self.store.dismiss_notification()
    }

    /// Asks before deleting `id`. Returns false when the record is not in
    /// the roster.
    pub async fn request_delete(&self, id: &UserId) -> bool {
        let Some(record) = self.store.find(id).await else {
            warn!(%id, "delete requested for unknown user");
            return false;
        };
        let message = format!(
            "Are you sure you want to delete {}? This action cannot be undone.",
            record.name
        );
        self.ask(message, PendingAction::DeleteUser(record.id));
        true
    }

    /// Asks before clearing the roster. Nothing to confirm when it is empty.
    pub async fn request_delete_all(&self) -> bool {
        let count = self.store.records().await.len();
        if count == 0 {
            debug!("delete-all requested on an empty roster");
            return false;
        }
        let message = format!(
            "Are you sure you want to delete all {count} users? This action cannot be undone."
        );
        self.ask(message, PendingAction::DeleteAll);
        true
    }

    fn ask(&self, message: String, action: PendingAction) {
        let request = ConfirmationRequest {
            notification: Notification::confirmation(message),
            action,
        };
        self.confirmation.open(request, None, |_| {});
    }

    pub fn confirmation(&self) -> Option<DialogView<ConfirmationRequest>> {
        self.confirmation.view()
    }

    /// Closes the confirmation and runs its action. `None` when nothing was
    /// awaiting confirmation.
    pub async fn confirm(&self) -> Option<Result<(), MutationError>> {
        let request = self.confirmation.payload()?;
        self.confirmation.close();
        let outcome = match request.action {
            PendingAction::DeleteUser(id) => self.pipeline.delete(&id).await,
            PendingAction::DeleteAll => self.pipeline.delete_all().await.map(|_| ()),
        };
        Some(outcome)
    }

    pub fn cancel_confirmation(&self) -> bool {
        self.confirmation.close()
    }

    pub async fn open_create_form(&self) {
        *self.form.lock().await = Some(FormSession::create(self.store.timings()));
    }

    pub async fn open_edit_form(&self, id: &UserId) -> bool {
        let Some(record) = self.store.find(id).await else {
            warn!(%id, "edit requested for unknown user");
            return false;
        };
        *self.form.lock().await = Some(FormSession::edit(&record, self.store.timings()));
        true
    }

    /// The open form, if any. A form that completed since the last call is
    /// dropped here.
    pub async fn form(&self) -> Option<FormSnapshot> {
        let mut form = self.form.lock().await;
        if form.as_ref().is_some_and(|session| !session.is_open()) {
            form.take();
        }
        form.as_ref().map(FormSession::snapshot)
    }

    pub async fn set_form_field(&self, field: Field, raw: &str) -> bool {
        match self.form.lock().await.as_mut() {
            Some(session) if session.is_open() => {
                session.set_field(field, raw);
                true
            }
            _ => false,
        }
    }

    /// Submits the open form. The form is not locked while the directory
    /// answers. `None` when no form is open.
    pub async fn submit_form(&self) -> Option<SubmitOutcome> {
        let pending = {
            let mut form = self.form.lock().await;
            let session = form.as_mut().filter(|session| session.is_open())?;
            match session.prepare() {
                Ok(pending) => pending,
                Err(outcome) => return Some(outcome),
            }
        };
        let result = pending.send(&self.pipeline).await;

        let mut form = self.form.lock().await;
        match form.as_mut().filter(|session| session.owns(&pending)) {
            Some(session) => Some(session.finish(&pending, result)),
            None => {
                debug!("form closed before its submit was answered");
                Some(pending.outcome(result))
            }
        }
    }

    pub async fn dismiss_form_dialog(&self) -> bool {
        match self.form.lock().await.as_ref() {
            Some(session) => session.dismiss_error() || session.dismiss_success(),
            None => false,
        }
    }

    pub async fn cancel_form(&self) {
        if let Some(session) = self.form.lock().await.take() {
            session.cancel();
        }
    }

    /// Imports `file`. Success resynchronizes the whole client, including
    /// the search input.
    pub async fn import(&self, file: &ImportFile) -> Result<u64, MutationError> {
        let imported = self.pipeline.import(file).await?;
        self.scheduler.reset();
        Ok(imported)
    }

    pub async fn export(&self) -> Result<ExportArtifact, MutationError> {
        self.pipeline.export().await
    }

    /// Cancels every pending timer. Lookups and mutations already sent run to
    /// completion.
    pub async fn teardown(&self) {
        self.scheduler.cancel();
        self.confirmation.teardown();
        self.store.teardown();
        if let Some(session) = self.form.lock().await.take() {
            session.cancel();
        }
        info!("roster controller torn down");
    }
}

impl Drop for RosterController {
    fn drop(&mut self) {
        self.scheduler.cancel();
        self.confirmation.teardown();
        self.store.teardown();
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
