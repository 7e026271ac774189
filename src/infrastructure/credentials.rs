//! In-memory credential store.

use crate::domain::service::CredentialStore;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Credential store backed by a fixed name → secret map.
///
/// Tokens are random v4 UUIDs. They are not remembered or validated later;
/// issuing one is the whole of a successful login.
#[derive(Clone, Default)]
pub struct StaticCredentialStore {
    users: HashMap<String, String>,
}

impl StaticCredentialStore {
    /// Create an empty store that rejects every login.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from `(name, secret)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let users = pairs
            .into_iter()
            .map(|(name, secret)| (name.to_string(), secret.to_string()))
            .collect();
        Self { users }
    }

    /// Add or replace a user.
    pub fn insert(&mut self, name: impl Into<String>, secret: impl Into<String>) {
        self.users.insert(name.into(), secret.into());
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

// Secrets stay out of debug output.
impl fmt::Debug for StaticCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.users.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("StaticCredentialStore")
            .field("users", &names)
            .finish()
    }
}

impl CredentialStore for StaticCredentialStore {
    fn verify(&self, name: &str, secret: &str) -> bool {
        self.users
            .get(name)
            .is_some_and(|expected| expected == secret)
    }

    fn issue_token(&self, _name: &str) -> String {
        Uuid::new_v4().to_string()
    }
}
