//! Cookie store persisted as a JSON file.

use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use contract::{CookieAccessor, CookieError, CookieName};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Cookie storage persisted as a JSON object on disk.
///
/// The file looks like `{"auth_token": "..."}`. A missing file is an empty
/// store. Writes go to a sibling temporary file which is then renamed over
/// the original, so a reader never sees a half-written map. Each write gets
/// its own temporary file, so separate processes sharing the path never
/// clobber each other's partial writes; the last rename wins.
#[derive(Debug)]
pub struct FileCookieStore {
    path: PathBuf,
    // Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileCookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CookieError {
        CookieError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, CookieError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Cookie file is not a JSON string map");
            CookieError::Corrupt {
                path: self.path.display().to_string(),
                message: e.to_string(),
            }
        })
    }

    async fn store(&self, values: &BTreeMap<String, String>) -> Result<(), CookieError> {
        let text = serde_json::to_string_pretty(values).map_err(|e| CookieError::Corrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, text.as_bytes()))
            .await
            .map_err(|e| self.io_error(std::io::Error::other(e)))?
            .map_err(|e| self.io_error(e))
    }
}

/// Writes `contents` to a uniquely named sibling of `path`, then renames it
/// over `path`.
fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl CookieAccessor for FileCookieStore {
    async fn get(&self, name: &CookieName) -> Result<Option<String>, CookieError> {
        let mut values = self.load().await?;
        Ok(values.remove(name.as_str()).filter(|v| !v.is_empty()))
    }

    async fn set(&self, name: &CookieName, value: String) -> Result<(), CookieError> {
        let _guard = self.write_lock.lock().await;
        let mut values = self.load().await?;
        values.insert(name.as_str().to_owned(), value);
        self.store(&values).await?;
        debug!(cookie = %name, path = %self.path.display(), "Cookie persisted");
        Ok(())
    }

    async fn delete(&self, name: &CookieName) -> Result<(), CookieError> {
        let _guard = self.write_lock.lock().await;
        let mut values = self.load().await?;
        if values.remove(name.as_str()).is_none() {
            return Ok(());
        }
        self.store(&values).await?;
        debug!(cookie = %name, path = %self.path.display(), "Cookie removed");
        Ok(())
    }
}
