use serde::{Deserialize, Serialize};

/// Failure body returned by the directory service on any non-2xx response.
///
/// Every field is optional: single-record endpoints send `message` and, for
/// uniqueness violations, `existingUser`; the import endpoint adds the two
/// duplicate groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_user: Option<ExistingUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicates_in_file: Option<DuplicatesInFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_in_database: Option<ExistingInDatabase>,
}

impl ApiErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn message_or(&self, fallback: &str) -> String {
        match self.message.as_deref() {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn has_conflict_groups(&self) -> bool {
        self.duplicates_in_file.is_some() || self.existing_in_database.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingUser {
    pub name: String,
}

/// Collisions between rows of a single uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicatesInFile {
    #[serde(default)]
    pub emails: Vec<DuplicateEntry>,
    #[serde(default)]
    pub mobiles: Vec<DuplicateEntry>,
}

/// One duplicated value and the rows that carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateEntry {
    pub value: String,
    #[serde(default)]
    pub entries: Vec<serde_json::Value>,
}

/// Collisions with records already persisted by the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingInDatabase {
    #[serde(default)]
    pub emails: Vec<ExistingEntry>,
    #[serde(default)]
    pub mobiles: Vec<ExistingEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingEntry {
    pub value: String,
    pub existing_user: ExistingUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_import_failure_with_both_groups() {
        let raw = r#"{
            "message": "Duplicate entries found",
            "duplicatesInFile": {
                "emails": [{"value": "a@x.com", "entries": [{"row": 1}, {"row": 4}]}],
                "mobiles": []
            },
            "existingInDatabase": {
                "emails": [],
                "mobiles": [{"value": "5551234567", "existingUser": {"name": "Jane Doe"}}]
            }
        }"#;

        let body: ApiErrorBody = serde_json::from_str(raw).expect("decode");
        let in_file = body.duplicates_in_file.as_ref().expect("in file");
        assert_eq!(in_file.emails[0].entries.len(), 2);
        let in_db = body.existing_in_database.as_ref().expect("in db");
        assert_eq!(in_db.mobiles[0].existing_user.name, "Jane Doe");
        assert!(body.has_conflict_groups());
    }

    #[test]
    fn message_or_falls_back_on_missing_or_blank_message() {
        assert_eq!(ApiErrorBody::default().message_or("fallback"), "fallback");
        assert_eq!(ApiErrorBody::new("").message_or("fallback"), "fallback");
        assert_eq!(ApiErrorBody::new("boom").message_or("fallback"), "boom");
    }
}
