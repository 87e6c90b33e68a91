use serde::{Deserialize, Serialize};

use crate::domain::UserRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllResponse {
    pub deleted_count: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImportResponse {
    pub count: u64,
}

/// Form field name the import endpoint reads the uploaded file from.
pub const IMPORT_FILE_FIELD: &str = "file";

/// Media type of import uploads and export downloads.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Download name used when the roster is exported.
pub const EXPORT_FILE_NAME: &str = "users-data.json";
