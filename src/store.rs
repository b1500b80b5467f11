use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::envelope::Envelope;
use crate::error::{Error, Result};

/// Durable storage for batch-job results, keyed by result identifier.
///
/// The write discipline is last-writer-wins per identifier: after the initial
/// placeholder writes, the poll worker owning the identifier is the only
/// writer. Readers may observe a not-yet-completed placeholder at any time.
pub trait ResultStore: Send + Sync {
    /// Retrieves the envelope stored under `result_id`.
    fn get(&self, result_id: &str) -> Result<Envelope>;

    /// Persists `envelope` under `result_id`, replacing any previous entry.
    fn put(&self, result_id: &str, envelope: &Envelope) -> Result<()>;
}

impl<S: ResultStore + ?Sized> ResultStore for Arc<S> {
    fn get(&self, result_id: &str) -> Result<Envelope> {
        (**self).get(result_id)
    }

    fn put(&self, result_id: &str, envelope: &Envelope) -> Result<()> {
        (**self).put(result_id, envelope)
    }
}

/// File-backed store: one `{identifier}.json` per result in a directory.
///
/// The directory is created on the first write, so merely holding a
/// `FileStore` (a client with the default store included) touches nothing
/// on disk.
#[derive(Debug)]
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    /// A store at `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        FileStore { directory: directory.into() }
    }

    /// The default store, `genesisonline` in the user's home directory.
    pub fn default_location() -> Self {
        let home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
        FileStore::new(home.join("genesisonline"))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_path(&self, result_id: &str) -> PathBuf {
        self.directory.join(format!("{result_id}.json"))
    }
}

impl ResultStore for FileStore {
    fn get(&self, result_id: &str) -> Result<Envelope> {
        let path = self.file_path(result_id);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| Error::Store { path: path.clone(), source: e })?;
        Ok(serde_json::from_str(&text)?)
    }

    fn put(&self, result_id: &str, envelope: &Envelope) -> Result<()> {
        std::fs::create_dir_all(&self.directory)
            .map_err(|e| Error::Store { path: self.directory.clone(), source: e })?;
        let path = self.file_path(result_id);
        log::info!("saving result '{}' to '{}'", result_id, path.display());
        let text = serde_json::to_string(envelope)?;
        std::fs::write(&path, text).map_err(|e| Error::Store { path, source: e })
    }
}

/// In-memory store, mainly useful in tests and short-lived programs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Envelope>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for MemoryStore {
    fn get(&self, result_id: &str) -> Result<Envelope> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(result_id).cloned().ok_or_else(|| Error::Store {
            path: PathBuf::from(result_id),
            source: io::Error::new(io::ErrorKind::NotFound, "no entry for result"),
        })
    }

    fn put(&self, result_id: &str, envelope: &Envelope) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(result_id.to_string(), envelope.clone());
        Ok(())
    }
}
