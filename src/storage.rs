use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

const ACCESS_KEY: &str = "access-token";
const REFRESH_KEY: &str = "refresh-token";
const USERNAME_KEY: &str = "username";

/// Credential slot held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Access,
    Refresh,
    Username,
}

impl Kind {
    const fn key(self) -> &'static str {
        match self {
            Self::Access => ACCESS_KEY,
            Self::Refresh => REFRESH_KEY,
            Self::Username => USERNAME_KEY,
        }
    }
}

/// File-backed store for the access token, refresh token and username.
///
/// Reads never fail: a missing or unreadable store behaves as an empty one,
/// so callers can treat "no credential" and "empty credential" uniformly.
/// A mutex serializes read-modify-write cycles so the token pair stays
/// consistent when several in-flight requests refresh at once.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CredentialStore {
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored value, or the empty string when absent.
    #[must_use]
    pub fn get(&self, kind: Kind) -> String {
        let _guard = self.guard();
        self.read_map()
            .get(kind.key())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// # Errors
    /// Returns an error if the store file cannot be written.
    pub fn save(&self, kind: Kind, value: &str) -> io::Result<()> {
        let _guard = self.guard();
        let mut map = self.read_map();
        map.insert(kind.key().to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    /// Stores both halves of a token pair in a single write, keeping the
    /// "both present or both absent" invariant.
    /// # Errors
    /// Returns an error if the store file cannot be written.
    pub fn save_tokens(&self, access: &str, refresh: &str) -> io::Result<()> {
        let _guard = self.guard();
        let mut map = self.read_map();
        map.insert(ACCESS_KEY.to_string(), Value::String(access.to_string()));
        map.insert(REFRESH_KEY.to_string(), Value::String(refresh.to_string()));
        self.write_map(&map)
    }

    /// Removes the whole store file. Every key is gone afterwards, so keep
    /// unrelated data out of this file.
    /// # Errors
    /// Returns an error if the store file exists but cannot be removed.
    pub fn clear(&self) -> io::Result<()> {
        let _guard = self.guard();
        debug!("clearing credential store at {}", self.path.display());
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_map(&self) -> Map<String, Value> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn write_map(&self, map: &Map<String, Value>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(map)?)
    }
}
