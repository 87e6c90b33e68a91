//! Controller for a roster of user records kept in sync with a remote
//! directory service.
//!
//! [`RosterController`] is the entry point: it owns the [`RosterStore`], the
//! [`MutationPipeline`] that talks to the directory, the debouncing
//! [`SearchScheduler`], the delete confirmation and the open [`FormSession`].

pub mod config;
pub mod controller;
pub mod dialog;
pub mod directory;
pub mod form;
pub mod notification;
pub mod pipeline;
pub mod search;
pub mod store;
pub mod theme;
pub mod timer;
pub mod validation;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

pub use config::{load_settings, ClientSettings, DialogTimings};
pub use controller::{ConfirmationRequest, PendingAction, RosterController};
pub use dialog::{CloseReason, Dialog, DialogView};
pub use directory::{DirectoryApi, DirectoryError, HttpDirectoryClient, ImportFile};
pub use form::{FormFields, FormMode, FormSession, FormSnapshot, PendingSubmit, SubmitOutcome};
pub use notification::{ConflictDetail, Notification, NotificationKind};
pub use pipeline::{ExportArtifact, MutationError, MutationPipeline};
pub use search::SearchScheduler;
pub use store::{RosterSnapshot, RosterStore};
pub use theme::{FilePreferenceStore, PreferenceStore, Theme, ThemeService};
