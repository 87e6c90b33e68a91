//! Input state for creating or editing one record.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::domain::{UserDraft, UserId, UserRecord};
use tracing::{debug, info};

use crate::{
    config::DialogTimings,
    dialog::{Dialog, DialogView},
    notification::Notification,
    pipeline::{MutationError, MutationPipeline},
    validation::{
        mobile_error, name_error, normalize_mobile, normalize_name, validate_draft, Field,
        FieldErrors,
    },
};

const CREATED: &str = "User created successfully!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(UserId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub name: String,
    pub email: String,
    pub mobile: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Local validation failed; nothing was sent.
    Invalid(FieldErrors),
    /// An earlier submit of this form has not been answered yet.
    InFlight,
    Created(UserRecord),
    Updated(UserRecord),
    Rejected(MutationError),
}

/// Cloned view of a form for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSnapshot {
    pub mode: FormMode,
    pub fields: FormFields,
    pub errors: FieldErrors,
    pub submitting: bool,
    pub success: Option<DialogView<Notification>>,
    pub error: Option<DialogView<Notification>>,
}

pub struct FormSession {
    mode: FormMode,
    fields: FormFields,
    errors: FieldErrors,
    submitting: bool,
    open: Arc<AtomicBool>,
    success: Dialog<Notification>,
    error: Dialog<Notification>,
    timings: DialogTimings,
}

impl FormSession {
    pub fn create(timings: DialogTimings) -> Self {
        Self::with_fields(FormMode::Create, FormFields::default(), timings)
    }

    /// Opens `record` for editing with its current values prefilled.
    pub fn edit(record: &UserRecord, timings: DialogTimings) -> Self {
        let fields = FormFields {
            name: record.name.clone(),
            email: record.email.clone(),
            mobile: record.mobile.clone(),
        };
        Self::with_fields(FormMode::Edit(record.id.clone()), fields, timings)
    }

    fn with_fields(mode: FormMode, fields: FormFields, timings: DialogTimings) -> Self {
        Self {
            mode,
            fields,
            errors: FieldErrors::default(),
            submitting: false,
            open: Arc::new(AtomicBool::new(true)),
            success: Dialog::new("form-success", timings.tick_interval),
            error: Dialog::new("form-error", timings.tick_interval),
            timings,
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    pub fn errors(&self) -> FieldErrors {
        self.errors
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// False once the form has been completed or cancelled.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn set_name(&mut self, raw: &str) {
        self.fields.name = normalize_name(raw);
        self.errors.name = name_error(&self.fields.name);
    }

    pub fn set_email(&mut self, raw: &str) {
        raw.clone_into(&mut self.fields.email);
        self.errors.email = None;
    }

    pub fn set_mobile(&mut self, raw: &str) {
        self.fields.mobile = normalize_mobile(raw);
        self.errors.mobile = mobile_error(&self.fields.mobile);
    }

    pub fn set_field(&mut self, field: Field, raw: &str) {
        match field {
            Field::Name => self.set_name(raw),
            Field::Email => self.set_email(raw),
            Field::Mobile => self.set_mobile(raw),
        }
    }

    /// Validates the current input and, when it passes, sends it to the
    /// directory. Rejections keep the input so the operator can correct it.
    pub async fn submit(&mut self, pipeline: &MutationPipeline) -> SubmitOutcome {
        let pending = match self.prepare() {
            Ok(pending) => pending,
            Err(outcome) => return outcome,
        };
        let result = pending.send(pipeline).await;
        self.finish(&pending, result)
    }

    /// Validates the current input and detaches it for sending. The form
    /// stays editable and renderable while the request is out.
    pub fn prepare(&mut self) -> Result<PendingSubmit, SubmitOutcome> {
        if self.submitting {
            debug!(mode = ?self.mode, "submit ignored while another is in flight");
            return Err(SubmitOutcome::InFlight);
        }
        let draft = match validate_draft(&self.fields.name, &self.fields.email, &self.fields.mobile)
        {
            Ok(draft) => draft,
            Err(errors) => {
                debug!(%errors, "form submit blocked by validation");
                self.errors = errors;
                return Err(SubmitOutcome::Invalid(errors));
            }
        };
        self.errors = FieldErrors::default();
        self.error.close();
        self.submitting = true;
        Ok(PendingSubmit {
            mode: self.mode.clone(),
            draft,
            session: self.open.clone(),
        })
    }

    /// Whether `pending` was prepared by this session.
    pub fn owns(&self, pending: &PendingSubmit) -> bool {
        Arc::ptr_eq(&self.open, &pending.session)
    }

    /// Applies the directory's answer to `pending` and opens the matching
    /// dialog.
    pub fn finish(
        &mut self,
        pending: &PendingSubmit,
        result: Result<UserRecord, MutationError>,
    ) -> SubmitOutcome {
        self.submitting = false;
        match pending.outcome(result) {
            SubmitOutcome::Created(record) => {
                let open = self.open.clone();
                self.success.open(
                    Notification::success(CREATED, self.timings.success),
                    Some(self.timings.success),
                    move |_| open.store(false, Ordering::SeqCst),
                );
                SubmitOutcome::Created(record)
            }
            SubmitOutcome::Updated(record) => {
                info!(id = %record.id, "edit form completed");
                self.close();
                SubmitOutcome::Updated(record)
            }
            SubmitOutcome::Rejected(err) => self.reject(err),
            other => other,
        }
    }

    fn reject(&mut self, err: MutationError) -> SubmitOutcome {
        let mut notification = Notification::error(err.to_string(), self.timings.error);
        if let Some(detail) = err.conflict_detail() {
            notification = notification.with_detail(detail);
        }
        self.error.open(notification, Some(self.timings.error), |_| {});
        SubmitOutcome::Rejected(err)
    }

    pub fn dismiss_success(&self) -> bool {
        self.success.close()
    }

    pub fn dismiss_error(&self) -> bool {
        self.error.close()
    }

    pub fn success_dialog(&self) -> &Dialog<Notification> {
        &self.success
    }

    pub fn error_dialog(&self) -> &Dialog<Notification> {
        &self.error
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            mode: self.mode.clone(),
            fields: self.fields.clone(),
            errors: self.errors,
            submitting: self.submitting,
            success: self.success.view(),
            error: self.error.view(),
        }
    }

    /// Closes the form and stops both of its dialogs.
    pub fn cancel(&self) {
        debug!(mode = ?self.mode, "form cancelled");
        self.close();
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.success.teardown();
        self.error.teardown();
    }
}

/// Validated input of one submit, sent without holding the session.
#[derive(Debug, Clone)]
pub struct PendingSubmit {
    mode: FormMode,
    draft: UserDraft,
    session: Arc<AtomicBool>,
}

impl PendingSubmit {
    pub async fn send(&self, pipeline: &MutationPipeline) -> Result<UserRecord, MutationError> {
        match &self.mode {
            FormMode::Create => pipeline.create(&self.draft).await,
            FormMode::Edit(id) => pipeline.update(id, &self.draft).await,
        }
    }

    /// Outcome of the answer on its own, for a session that is gone.
    pub fn outcome(&self, result: Result<UserRecord, MutationError>) -> SubmitOutcome {
        match (result, &self.mode) {
            (Ok(record), FormMode::Create) => SubmitOutcome::Created(record),
            (Ok(record), FormMode::Edit(_)) => SubmitOutcome::Updated(record),
            (Err(err), _) => SubmitOutcome::Rejected(err),
        }
    }
}

impl Drop for FormSession {
    fn drop(&mut self) {
        self.success.teardown();
        self.error.teardown();
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
