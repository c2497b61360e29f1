//! Persistence of the session token.
//!
//! The token is the only client state that outlives a [`crate::PostCms`]
//! instance. A client built over a [`FileTokenStore`] that already holds a
//! token starts out authenticated (pending [`crate::PostCms::verify_session`]).

use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::errors::StoreError;

/// Storage key of the session token.
///
/// [`FileTokenStore::in_dir`] uses it as the path relative to its directory.
pub const SESSION_TOKEN_KEY: &str = "postcms/session-token";

/// Where the session token lives between requests and across restarts.
///
/// Treat the stored value as a **bearer secret**: implementations must not log it.
pub trait TokenStore: Send + Sync + Debug {
    /// The stored token, if any.
    ///
    /// # Errors
    /// - [`StoreError`] if the backend cannot be read.
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// Replace the stored token.
    ///
    /// # Errors
    /// - [`StoreError`] if the backend cannot be written.
    fn save(&self, token: &str) -> Result<(), StoreError>;

    /// Forget the stored token. Clearing an empty store succeeds.
    ///
    /// # Errors
    /// - [`StoreError`] if the backend cannot be written.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Process-local token store. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryTokenStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `token`.
    #[must_use]
    pub fn with_token<S: Into<String>>(token: S) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(token.into()))),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

impl Debug for MemoryTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let present = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("MemoryTokenStore")
            .field("token", &if present { "<redacted>" } else { "<none>" })
            .finish()
    }
}

/// Token kept as plain text in a file.
///
/// The file is overwritten on save and removed on clear. On Unix, permissions
/// are set to 600.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store the token at exactly `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Store the token at `<dir>/postcms/session-token`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir.as_ref().join(SESSION_TOKEN_KEY))
    }

    /// Location of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_is_shared_between_clones() {
        let store = MemoryTokenStore::new();
        let other = store.clone();
        store.save("abc").unwrap();
        assert_eq!(other.load().unwrap().as_deref(), Some("abc"));
        other.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn memory_store_debug_redacts_token() {
        let store = MemoryTokenStore::with_token("secret-token");
        assert!(!format!("{store:?}").contains("secret-token"));
    }

    #[test]
    fn file_store_roundtrip_under_key_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::in_dir(dir.path());
        assert_eq!(store.path(), dir.path().join("postcms").join("session-token"));
        assert_eq!(store.load().unwrap(), None);

        store.save("tok-1").unwrap();
        assert_eq!(FileTokenStore::in_dir(dir.path()).load().unwrap().as_deref(), Some("tok-1"));

        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn file_store_ignores_whitespace_only_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));
        std::fs::write(store.path(), "  \n").unwrap();
        assert_eq!(store.load().unwrap(), None);
        std::fs::write(store.path(), "tok-2\n").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("tok-2"));
    }

    #[cfg(unix)]
    #[test]
    fn file_store_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::in_dir(dir.path());
        store.save("tok").unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
