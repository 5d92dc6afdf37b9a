use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::fs;

use crate::models::User;

/// Token and profile travel as one value, so they can never be half-set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session storage error: {0}")]
    Io(#[from] io::Error),
    #[error("session encoding error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Process-wide session state, backed by a single JSON file so it survives
/// a restart of the client. Hold it behind an `Arc` and hand it to every
/// component that needs the token.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Reads the persisted session synchronously. A missing or corrupt file
    /// loads as logged-out, never as an error.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok());
        Self {
            path,
            current: RwLock::new(current),
        }
    }

    /// Persists the pair and makes it visible to all holders of this store.
    /// A prior session is replaced silently.
    pub fn login(&self, token: impl Into<String>, user: User) -> Result<(), SessionError> {
        let session = Session {
            token: token.into(),
            user,
        };
        self.persist(&session)?;
        *self.current.write().expect("session lock") = Some(session);
        Ok(())
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        *self.current.write().expect("session lock") = None;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.current.read().expect("session lock").clone()
    }

    pub fn token(&self) -> Option<String> {
        self.current
            .read()
            .expect("session lock")
            .as_ref()
            .map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.current
            .read()
            .expect("session lock")
            .as_ref()
            .map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().expect("session lock").is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // write-then-rename so a crash mid-write can't leave a torn session
    fn persist(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(session)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
