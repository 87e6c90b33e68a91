//! In-memory directory and logging setup shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    domain::{UserDraft, UserId, UserRecord},
    error::ApiErrorBody,
    protocol::{DeleteAllResponse, ImportResponse},
};
use tracing_subscriber::EnvFilter;

use crate::directory::{DirectoryApi, DirectoryError, ImportFile};

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(crate) fn user(id: &str, name: &str, email: &str, mobile: &str) -> UserRecord {
    UserRecord {
        id: UserId::from(id),
        name: name.into(),
        email: email.into(),
        mobile: mobile.into(),
    }
}

pub(crate) fn draft(name: &str, email: &str, mobile: &str) -> UserDraft {
    UserDraft {
        name: name.into(),
        email: email.into(),
        mobile: mobile.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    List,
    Create(UserDraft),
    Update(UserId, UserDraft),
    Delete(UserId),
    DeleteAll,
    Search(String),
    Import(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    List,
    Create,
    Update,
    Delete,
    DeleteAll,
    Search,
    Import,
}

#[derive(Debug, Clone)]
pub(crate) enum Failure {
    Rejected(u16, ApiErrorBody),
    Unreadable,
}

impl Failure {
    fn to_error(&self) -> DirectoryError {
        match self {
            Failure::Rejected(status, body) => DirectoryError::Rejected {
                status: *status,
                body: body.clone(),
            },
            Failure::Unreadable => DirectoryError::Decode("unexpected end of input".into()),
        }
    }
}

/// Directory double holding records in server order. Searches match the
/// query against names, case-insensitively.
#[derive(Default)]
pub(crate) struct FakeDirectory {
    users: Mutex<Vec<UserRecord>>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<Op, Failure>>,
    search_delays: Mutex<HashMap<String, Duration>>,
    create_delay: Mutex<Option<Duration>>,
    next_id: AtomicU64,
}

impl FakeDirectory {
    pub(crate) fn with_users(users: Vec<UserRecord>) -> Self {
        let fake = Self::default();
        *fake.users.lock().expect("lock") = users;
        fake
    }

    pub(crate) fn fail(&self, op: Op, failure: Failure) {
        self.failures.lock().expect("lock").insert(op, failure);
    }

    pub(crate) fn reject(&self, op: Op, status: u16, body: ApiErrorBody) {
        self.fail(op, Failure::Rejected(status, body));
    }

    pub(crate) fn delay_search(&self, query: &str, delay: Duration) {
        self.search_delays
            .lock()
            .expect("lock")
            .insert(query.to_string(), delay);
    }

    pub(crate) fn delay_create(&self, delay: Duration) {
        *self.create_delay.lock().expect("lock") = Some(delay);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    pub(crate) fn users(&self) -> Vec<UserRecord> {
        self.users.lock().expect("lock").clone()
    }

    fn record(&self, op: Op, call: Call) -> Result<(), DirectoryError> {
        self.calls.lock().expect("lock").push(call);
        match self.failures.lock().expect("lock").get(&op) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn assign_id(&self) -> UserId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        UserId(format!("new-{n}"))
    }
}

#[async_trait]
impl DirectoryApi for FakeDirectory {
    async fn list_users(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        self.record(Op::List, Call::List)?;
        Ok(self.users())
    }

    async fn create_user(&self, draft: &UserDraft) -> Result<UserRecord, DirectoryError> {
        self.record(Op::Create, Call::Create(draft.clone()))?;
        let delay = *self.create_delay.lock().expect("lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let record = UserRecord {
            id: self.assign_id(),
            name: draft.name.clone(),
            email: draft.email.clone(),
            mobile: draft.mobile.clone(),
        };
        self.users.lock().expect("lock").push(record.clone());
        Ok(record)
    }

    async fn update_user(
        &self,
        id: &UserId,
        draft: &UserDraft,
    ) -> Result<UserRecord, DirectoryError> {
        self.record(Op::Update, Call::Update(id.clone(), draft.clone()))?;
        let record = UserRecord {
            id: id.clone(),
            name: draft.name.clone(),
            email: draft.email.clone(),
            mobile: draft.mobile.clone(),
        };
        let mut users = self.users.lock().expect("lock");
        if let Some(existing) = users.iter_mut().find(|u| &u.id == id) {
            *existing = record.clone();
        }
        Ok(record)
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), DirectoryError> {
        self.record(Op::Delete, Call::Delete(id.clone()))?;
        self.users.lock().expect("lock").retain(|u| &u.id != id);
        Ok(())
    }

    async fn delete_all_users(&self) -> Result<DeleteAllResponse, DirectoryError> {
        self.record(Op::DeleteAll, Call::DeleteAll)?;
        let mut users = self.users.lock().expect("lock");
        let deleted_count = users.len() as u64;
        users.clear();
        Ok(DeleteAllResponse { deleted_count })
    }

    async fn search_users(&self, query: &str) -> Result<Vec<UserRecord>, DirectoryError> {
        self.record(Op::Search, Call::Search(query.to_string()))?;
        let delay = self.search_delays.lock().expect("lock").get(query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let needle = query.to_lowercase();
        Ok(self
            .users()
            .into_iter()
            .filter(|u| u.name.to_lowercase().contains(&needle))
            .collect())
    }

    async fn import_users(&self, file: &ImportFile) -> Result<ImportResponse, DirectoryError> {
        self.record(Op::Import, Call::Import(file.file_name.clone()))?;
        let drafts: Vec<UserDraft> = serde_json::from_slice(&file.bytes)
            .map_err(|e| DirectoryError::Decode(e.to_string()))?;
        let count = drafts.len() as u64;
        for draft in drafts {
            let record = UserRecord {
                id: self.assign_id(),
                name: draft.name,
                email: draft.email,
                mobile: draft.mobile,
            };
            self.users.lock().expect("lock").push(record);
        }
        Ok(ImportResponse { count })
    }
}

/// Lets spawned tasks that are ready to run make progress.
pub(crate) async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
