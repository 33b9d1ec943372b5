//! In-memory user registry behind the sign-in endpoints.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no user under key {key}")]
    #[diagnostic(code(tambour_oauth::registry_not_found))]
    NotFound { key: u64 },
}

/// A cached user: handle plus the credential forwarded to createSession.
///
/// The password is transient and never persisted to durable storage; `Debug`
/// redacts it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub identifier: String,
    pub password: String,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Concurrency-safe map from numeric key to [`UserRecord`].
///
/// Any number of `get`s may run together; `insert` and `delete` take the
/// lock exclusively. Keys come from a monotonic counter starting at 1 and
/// are never reused, even after deletion. Entries live until explicitly
/// deleted; there is no TTL or eviction.
#[derive(Debug, Default)]
pub struct UserRegistry {
    users: RwLock<HashMap<u64, UserRecord>>,
    next_key: AtomicU64,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record under a freshly assigned key.
    pub fn insert(&self, user: UserRecord) -> u64 {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed) + 1;
        // a poisoned lock still guards a coherent map; recover the guard
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        users.insert(key, user);
        key
    }

    pub fn get(&self, key: u64) -> Result<UserRecord, RegistryError> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        users
            .get(&key)
            .cloned()
            .ok_or(RegistryError::NotFound { key })
    }

    pub fn delete(&self, key: u64) -> Result<(), RegistryError> {
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        users
            .remove(&key)
            .map(|_| ())
            .ok_or(RegistryError::NotFound { key })
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
