//! Mutations and reads against the directory, reconciled into the roster.
//!
//! Every operation that follows a write with a refetch awaits the write's
//! response before issuing the refetch; the two never overlap.

use std::sync::Arc;

use shared::{
    domain::{UserDraft, UserId, UserRecord},
    error::ApiErrorBody,
    protocol::{EXPORT_FILE_NAME, JSON_CONTENT_TYPE},
};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    directory::{DirectoryApi, DirectoryError, ImportFile},
    notification::{ConflictDetail, Notification},
    store::{ReadTicket, RosterStore},
};

const UNKNOWN_OWNER: &str = "another user";

const LIST_FAILED: &str = "Failed to load users. Please try again later.";
const SEARCH_FAILED: &str = "Failed to search users. Please try again.";
const DELETE_FAILED: &str = "Failed to delete user. Please try again.";
const DELETE_ALL_FAILED: &str = "Failed to delete all users. Please try again.";
const NOT_JSON: &str = "Please upload a JSON file";
const IMPORT_UNREADABLE: &str = "Error importing users. Please check your JSON file format.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("User with email {value} already exists")]
    EmailConflict {
        value: String,
        existing_owner_name: String,
    },
    #[error("User with mobile {value} already exists")]
    MobileConflict {
        value: String,
        existing_owner_name: String,
    },
    #[error("{message}")]
    ImportConflict {
        message: String,
        detail: ConflictDetail,
    },
    #[error("{message}")]
    GenericFailure { message: String },
}

impl MutationError {
    pub fn generic(message: impl Into<String>) -> Self {
        MutationError::GenericFailure {
            message: message.into(),
        }
    }

    /// Structured collision report for error dialogs.
    pub fn conflict_detail(&self) -> Option<ConflictDetail> {
        match self {
            MutationError::EmailConflict {
                value,
                existing_owner_name,
            } => Some(ConflictDetail::existing_email(value, existing_owner_name)),
            MutationError::MobileConflict {
                value,
                existing_owner_name,
            } => Some(ConflictDetail::existing_mobile(value, existing_owner_name)),
            MutationError::ImportConflict { detail, .. } => Some(detail.clone()),
            MutationError::GenericFailure { .. } => None,
        }
    }
}

/// Serialized roster ready to be saved by the download mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct MutationPipeline {
    directory: Arc<dyn DirectoryApi>,
    store: RosterStore,
}

impl MutationPipeline {
    pub fn new(directory: Arc<dyn DirectoryApi>, store: RosterStore) -> Self {
        Self { directory, store }
    }

    pub fn store(&self) -> &RosterStore {
        &self.store
    }

    /// Fetches the whole roster, newest first.
    pub async fn list(&self) -> Result<usize, MutationError> {
        let ticket = self.store.begin_read().await;
        self.list_with(ticket).await
    }

    async fn list_with(&self, ticket: ReadTicket) -> Result<usize, MutationError> {
        match self.directory.list_users().await {
            Ok(mut records) => {
                records.reverse();
                let count = records.len();
                if self.store.apply_read(ticket, records).await {
                    self.store.dismiss_error();
                    info!(count, "roster loaded");
                }
                Ok(count)
            }
            Err(err) => {
                warn!(error = %err, "failed to load roster");
                self.store.finish_failed_read(ticket).await;
                self.store.notify_error(LIST_FAILED);
                Err(MutationError::generic(LIST_FAILED))
            }
        }
    }

    /// Replaces the roster with the directory's matches, in the order it sent
    /// them.
    pub async fn search(&self, query: &str) -> Result<usize, MutationError> {
        let ticket = self.store.begin_search().await;
        self.search_with(query, ticket).await
    }

    async fn search_with(&self, query: &str, ticket: ReadTicket) -> Result<usize, MutationError> {
        match self.directory.search_users(query).await {
            Ok(records) => {
                let count = records.len();
                if self.store.apply_read(ticket, records).await {
                    info!(query, count, "search results applied");
                }
                Ok(count)
            }
            Err(err) => {
                warn!(query, error = %err, "search failed");
                self.store.finish_failed_read(ticket).await;
                self.store.notify_error(SEARCH_FAILED);
                Err(MutationError::generic(message_from(&err, SEARCH_FAILED)))
            }
        }
    }

    /// The debounced effect of a settled query: list when empty, search
    /// otherwise. `None` when `query` is no longer the active query.
    pub async fn refresh_for_query(&self, query: &str) -> Option<Result<usize, MutationError>> {
        let ticket = self.store.begin_settled_read(query).await?;
        let outcome = if query.is_empty() {
            self.list_with(ticket).await
        } else {
            self.search_with(query, ticket).await
        };
        Some(outcome)
    }

    /// Creates a record and prepends it without refetching.
    pub async fn create(&self, draft: &UserDraft) -> Result<UserRecord, MutationError> {
        match self.directory.create_user(draft).await {
            Ok(record) => {
                info!(id = %record.id, "user created");
                self.store.prepend(record.clone()).await;
                Ok(record)
            }
            Err(err) => {
                let classified = classify_create_failure(draft, &err);
                warn!(error = %err, outcome = ?classified, "create rejected");
                Err(classified)
            }
        }
    }

    /// Updates a record, then resynchronizes the whole roster.
    pub async fn update(
        &self,
        id: &UserId,
        draft: &UserDraft,
    ) -> Result<UserRecord, MutationError> {
        let record = self.directory.update_user(id, draft).await.map_err(|err| {
            warn!(%id, error = %err, "update rejected");
            MutationError::generic(message_from(&err, "Failed to update user"))
        })?;
        info!(%id, "user updated");
        // A failed refetch reports itself through the roster notification.
        let _ = self.list().await;
        Ok(record)
    }

    pub async fn delete(&self, id: &UserId) -> Result<(), MutationError> {
        if let Err(err) = self.directory.delete_user(id).await {
            warn!(%id, error = %err, "delete rejected");
            self.store.notify_error(DELETE_FAILED);
            return Err(MutationError::generic(message_from(
                &err,
                "Failed to delete user",
            )));
        }
        info!(%id, "user deleted");
        let _ = self.list().await;
        Ok(())
    }

    /// Removes every record and reports how many the directory deleted.
    pub async fn delete_all(&self) -> Result<u64, MutationError> {
        let deleted = match self.directory.delete_all_users().await {
            Ok(response) => response.deleted_count,
            Err(err) => {
                warn!(error = %err, "delete-all rejected");
                self.store.notify_error(DELETE_ALL_FAILED);
                return Err(MutationError::generic(message_from(
                    &err,
                    "Failed to delete all users",
                )));
            }
        };
        info!(deleted, "all users deleted");
        self.store
            .notify_success(format!("Successfully deleted {deleted} users"));
        let _ = self.list().await;
        Ok(deleted)
    }

    /// Uploads a JSON file of records. A successful import discards all local
    /// state and reloads it.
    pub async fn import(&self, file: &ImportFile) -> Result<u64, MutationError> {
        if !is_json_content_type(&file.content_type) {
            warn!(
                file = %file.file_name,
                content_type = %file.content_type,
                "rejecting non-JSON import"
            );
            self.store.notify_error(NOT_JSON);
            return Err(MutationError::generic(NOT_JSON));
        }

        let imported = match self.directory.import_users(file).await {
            Ok(response) => response.count,
            Err(err) => {
                let classified = classify_import_failure(&err);
                warn!(error = %err, "import rejected");
                let mut notification =
                    Notification::error(classified.to_string(), self.store.timings().error);
                if let Some(detail) = classified.conflict_detail() {
                    notification = notification.with_detail(detail);
                }
                self.store.notify(notification);
                return Err(classified);
            }
        };

        info!(imported, file = %file.file_name, "users imported");
        self.store
            .notify_success(format!("Successfully imported {imported} users"));
        let _ = self.resynchronize().await;
        Ok(imported)
    }

    /// Serializes the in-memory roster verbatim. Touches no network.
    pub async fn export(&self) -> Result<ExportArtifact, MutationError> {
        let records = self.store.records().await;
        let bytes = serde_json::to_vec_pretty(&records).map_err(|err| {
            error!(error = %err, "failed to serialize roster");
            MutationError::generic("Failed to export users")
        })?;
        Ok(ExportArtifact {
            file_name: EXPORT_FILE_NAME,
            content_type: JSON_CONTENT_TYPE,
            bytes,
        })
    }

    /// Drops every locally derived value and rebuilds the roster from the
    /// directory.
    pub async fn resynchronize(&self) -> Result<usize, MutationError> {
        self.store.force_resync().await;
        self.list().await
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE))
}

fn message_from(err: &DirectoryError, fallback: &str) -> String {
    err.body()
        .map(|body| body.message_or(fallback))
        .unwrap_or_else(|| fallback.to_string())
}

fn owner_name(body: &ApiErrorBody) -> String {
    body.existing_user
        .as_ref()
        .map(|user| user.name.clone())
        .unwrap_or_else(|| UNKNOWN_OWNER.to_string())
}

/// Maps a rejected create onto the conflict taxonomy. The directory only
/// distinguishes uniqueness violations through its message text.
fn classify_create_failure(draft: &UserDraft, err: &DirectoryError) -> MutationError {
    let Some(body) = err.body() else {
        return MutationError::generic("Failed to create user");
    };
    let message = body.message.as_deref().unwrap_or_default();

    if message.contains("email already exists") {
        MutationError::EmailConflict {
            value: draft.email.clone(),
            existing_owner_name: owner_name(body),
        }
    } else if message.contains("mobile already exists") {
        MutationError::MobileConflict {
            value: draft.mobile.clone(),
            existing_owner_name: owner_name(body),
        }
    } else {
        MutationError::generic(body.message_or("Failed to create user"))
    }
}

fn classify_import_failure(err: &DirectoryError) -> MutationError {
    match err.body() {
        Some(body) => MutationError::ImportConflict {
            message: body.message_or("Failed to import users"),
            detail: ConflictDetail::from_body(body),
        },
        None => MutationError::generic(IMPORT_UNREADABLE),
    }
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
