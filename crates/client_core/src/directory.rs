//! Transport to the remote user directory.
//!
//! [`DirectoryApi`] is the seam the pipeline talks to; [`HttpDirectoryClient`]
//! implements it over the REST contract served under `{base}/users`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{UserDraft, UserId, UserRecord},
    error::ApiErrorBody,
    protocol::{DeleteAllResponse, ImportResponse, SearchResponse, IMPORT_FILE_FIELD},
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory rejected request ({status}): {}", .body.message_or("no message"))]
    Rejected { status: u16, body: ApiErrorBody },
    #[error("directory request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid directory response: {0}")]
    Decode(String),
    #[error("invalid directory base url '{0}'")]
    InvalidBaseUrl(String),
}

impl DirectoryError {
    /// Failure body sent by the directory, when it answered at all.
    pub fn body(&self) -> Option<&ApiErrorBody> {
        match self {
            DirectoryError::Rejected { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// A file picked for bulk import, as handed over by the file reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImportFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserRecord>, DirectoryError>;
    async fn create_user(&self, draft: &UserDraft) -> Result<UserRecord, DirectoryError>;
    async fn update_user(
        &self,
        id: &UserId,
        draft: &UserDraft,
    ) -> Result<UserRecord, DirectoryError>;
    async fn delete_user(&self, id: &UserId) -> Result<(), DirectoryError>;
    async fn delete_all_users(&self) -> Result<DeleteAllResponse, DirectoryError>;
    async fn search_users(&self, query: &str) -> Result<Vec<UserRecord>, DirectoryError>;
    async fn import_users(&self, file: &ImportFile) -> Result<ImportResponse, DirectoryError>;
}

#[derive(Debug, Clone)]
pub struct HttpDirectoryClient {
    http: Client,
    base_url: Url,
}

impl HttpDirectoryClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, DirectoryError> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Self::with_client(http, base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, DirectoryError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|_| DirectoryError::InvalidBaseUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(DirectoryError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, DirectoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DirectoryError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("users")
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectoryClient {
    async fn list_users(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        let url = self.endpoint(&[])?;
        debug!(%url, "listing users");
        decode(self.http.get(url).send().await?).await
    }

    async fn create_user(&self, draft: &UserDraft) -> Result<UserRecord, DirectoryError> {
        let url = self.endpoint(&[])?;
        debug!(%url, email = %draft.email, "creating user");
        decode(self.http.post(url).json(draft).send().await?).await
    }

    async fn update_user(
        &self,
        id: &UserId,
        draft: &UserDraft,
    ) -> Result<UserRecord, DirectoryError> {
        let url = self.endpoint(&[id.0.as_str()])?;
        debug!(%url, "updating user");
        decode(self.http.put(url).json(draft).send().await?).await
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), DirectoryError> {
        let url = self.endpoint(&[id.0.as_str()])?;
        debug!(%url, "deleting user");
        let response = self.http.delete(url).send().await?;
        ensure_success(response).await.map(|_| ())
    }

    async fn delete_all_users(&self) -> Result<DeleteAllResponse, DirectoryError> {
        let url = self.endpoint(&["delete-all"])?;
        debug!(%url, "deleting all users");
        decode(self.http.delete(url).send().await?).await
    }

    async fn search_users(&self, query: &str) -> Result<Vec<UserRecord>, DirectoryError> {
        let url = self.endpoint(&["search"])?;
        debug!(%url, query, "searching users");
        let response: SearchResponse = decode(
            self.http
                .get(url)
                .query(&[("query", query)])
                .send()
                .await?,
        )
        .await?;
        Ok(response.users)
    }

    async fn import_users(&self, file: &ImportFile) -> Result<ImportResponse, DirectoryError> {
        let url = self.endpoint(&["import"])?;
        debug!(%url, file = %file.file_name, size = file.bytes.len(), "importing users");
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;
        let form = multipart::Form::new().part(IMPORT_FILE_FIELD, part);
        decode(self.http.post(url).multipart(form).send().await?).await
    }
}

async fn ensure_success(response: Response) -> Result<Vec<u8>, DirectoryError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if status.is_success() {
        return Ok(bytes.to_vec());
    }

    let body = serde_json::from_slice::<ApiErrorBody>(&bytes).unwrap_or_default();
    warn!(
        status = status.as_u16(),
        message = body.message.as_deref().unwrap_or_default(),
        "directory rejected request"
    );
    Err(DirectoryError::Rejected {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DirectoryError> {
    let bytes = ensure_success(response).await?;
    serde_json::from_slice(&bytes).map_err(|e| DirectoryError::Decode(e.to_string()))
}

#[cfg(test)]
#[path = "tests/directory_tests.rs"]
mod tests;
