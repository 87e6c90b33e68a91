//! Notification payloads and the structured conflict report shown in error
//! dialogs.

use std::{fmt, time::Duration};

use shared::error::{
    ApiErrorBody, DuplicateEntry, DuplicatesInFile, ExistingEntry, ExistingInDatabase,
};

pub const SUCCESS_DURATION: Duration = Duration::from_millis(3000);
pub const ERROR_DURATION: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Confirmation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub detail: Option<ConflictDetail>,
    /// Auto-dismiss delay. Confirmations have none.
    pub duration: Option<Duration>,
}

impl Notification {
    pub fn success(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
            detail: None,
            duration: Some(duration),
        }
    }

    pub fn error(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
            detail: None,
            duration: Some(duration),
        }
    }

    pub fn confirmation(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Confirmation,
            message: message.into(),
            detail: None,
            duration: None,
        }
    }

    pub fn with_detail(mut self, detail: ConflictDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFileDuplicate {
    pub value: String,
    pub occurrence_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InFileConflicts {
    pub emails: Vec<InFileDuplicate>,
    pub mobiles: Vec<InFileDuplicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseCollision {
    pub value: String,
    pub existing_owner_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseConflicts {
    pub emails: Vec<DatabaseCollision>,
    pub mobiles: Vec<DatabaseCollision>,
}

/// Uniqueness violations grouped by where the colliding value came from. An
/// import can report both groups at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictDetail {
    pub duplicates_in_file: Option<InFileConflicts>,
    pub existing_in_database: Option<DatabaseConflicts>,
}

/// One titled group of rendered conflict entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictSection {
    pub heading: &'static str,
    pub entries: Vec<String>,
}

impl ConflictDetail {
    pub fn from_body(body: &ApiErrorBody) -> Self {
        Self {
            duplicates_in_file: body.duplicates_in_file.as_ref().map(in_file_conflicts),
            existing_in_database: body.existing_in_database.as_ref().map(database_conflicts),
        }
    }

    /// A single database collision, as reported by a rejected create.
    pub fn existing_email(value: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            duplicates_in_file: None,
            existing_in_database: Some(DatabaseConflicts {
                emails: vec![DatabaseCollision {
                    value: value.into(),
                    existing_owner_name: owner.into(),
                }],
                mobiles: Vec::new(),
            }),
        }
    }

    pub fn existing_mobile(value: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            duplicates_in_file: None,
            existing_in_database: Some(DatabaseConflicts {
                emails: Vec::new(),
                mobiles: vec![DatabaseCollision {
                    value: value.into(),
                    existing_owner_name: owner.into(),
                }],
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections().is_empty()
    }

    /// Non-empty groups in display order: within-file duplicates first, then
    /// database collisions.
    pub fn sections(&self) -> Vec<ConflictSection> {
        let mut sections = Vec::new();

        if let Some(in_file) = &self.duplicates_in_file {
            push_section(
                &mut sections,
                "Duplicate Emails in File:",
                in_file.emails.iter().map(in_file_entry),
            );
            push_section(
                &mut sections,
                "Duplicate Mobile Numbers in File:",
                in_file.mobiles.iter().map(in_file_entry),
            );
        }

        if let Some(in_db) = &self.existing_in_database {
            push_section(
                &mut sections,
                "Existing Emails in Database:",
                in_db.emails.iter().map(database_entry),
            );
            push_section(
                &mut sections,
                "Existing Mobile Numbers in Database:",
                in_db.mobiles.iter().map(database_entry),
            );
        }

        sections
    }
}

impl fmt::Display for ConflictDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, section) in self.sections().iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", section.heading)?;
            for entry in &section.entries {
                writeln!(f, "- {entry}")?;
            }
        }
        Ok(())
    }
}

fn push_section(
    sections: &mut Vec<ConflictSection>,
    heading: &'static str,
    entries: impl Iterator<Item = String>,
) {
    let entries: Vec<String> = entries.collect();
    if !entries.is_empty() {
        sections.push(ConflictSection { heading, entries });
    }
}

fn in_file_entry(duplicate: &InFileDuplicate) -> String {
    format!(
        "{} (Used {} times)",
        duplicate.value, duplicate.occurrence_count
    )
}

fn database_entry(collision: &DatabaseCollision) -> String {
    format!(
        "{} (Used by {})",
        collision.value, collision.existing_owner_name
    )
}

fn in_file_conflicts(wire: &DuplicatesInFile) -> InFileConflicts {
    let convert = |entries: &[DuplicateEntry]| -> Vec<InFileDuplicate> {
        entries
            .iter()
            .map(|entry| InFileDuplicate {
                value: entry.value.clone(),
                occurrence_count: entry.entries.len(),
            })
            .collect()
    };
    InFileConflicts {
        emails: convert(&wire.emails),
        mobiles: convert(&wire.mobiles),
    }
}

fn database_conflicts(wire: &ExistingInDatabase) -> DatabaseConflicts {
    let convert = |entries: &[ExistingEntry]| -> Vec<DatabaseCollision> {
        entries
            .iter()
            .map(|entry| DatabaseCollision {
                value: entry.value.clone(),
                existing_owner_name: entry.existing_user.name.clone(),
            })
            .collect()
    };
    DatabaseConflicts {
        emails: convert(&wire.emails),
        mobiles: convert(&wire.mobiles),
    }
}
