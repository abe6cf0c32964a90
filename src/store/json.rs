use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    prelude::*,
    store::{StateStore, is_under},
};

struct Entry {
    value: Value,

    /// Written during this run.
    is_fresh: bool,
}

/// State tree kept in memory and persisted as a flat JSON object.
#[derive(Default)]
pub struct JsonStore {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl JsonStore {
    /// Load the previous state, a missing file is an empty state.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let entries: BTreeMap<String, Value> = match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse `{}`", path.display()))?,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!("starting with an empty state");
                BTreeMap::new()
            }
            Err(error) => {
                return Err(error).with_context(|| format!("failed to read `{}`", path.display()));
            }
        };
        debug!(n_entries = entries.len(), "loaded");
        let entries = entries.into_iter().map(|(key, value)| (key, Entry { value, is_fresh: false })).collect();
        Ok(Self { path: Some(path.to_path_buf()), entries: Mutex::new(entries) })
    }

    /// Write the state back to its file, no-op for an in-memory store.
    #[instrument(skip_all)]
    pub fn flush(&self) -> Result {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot: BTreeMap<String, Value> =
            self.lock()?.iter().map(|(key, entry)| (key.clone(), entry.value.clone())).collect();
        fs::write(path, serde_json::to_string_pretty(&snapshot)?)
            .with_context(|| format!("failed to write `{}`", path.display()))?;
        info!(path = %path.display(), n_entries = snapshot.len(), "flushed");
        Ok(())
    }

    #[cfg(test)]
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Entry>>> {
        self.entries.lock().map_err(|_| anyhow!("the state store lock is poisoned"))
    }
}

#[async_trait]
impl StateStore for JsonStore {
    async fn write(&self, key: &str, value: Value) -> Result {
        trace!(key, %value, "write");
        self.lock()?.insert(key.to_string(), Entry { value, is_fresh: true });
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.lock()?.get(key).map(|entry| entry.value.clone()))
    }

    async fn expire(&self, prefix: &str) -> Result {
        let mut n_expired = 0;
        for (_, entry) in self.lock()?.iter_mut().filter(|(key, _)| is_under(key, prefix)) {
            if !entry.is_fresh && !entry.value.is_null() {
                entry.value = Value::Null;
                n_expired += 1;
            }
        }
        debug!(prefix, n_expired, "expired");
        Ok(())
    }

    async fn purge(&self, prefix: &str) -> Result {
        self.lock()?.retain(|key, entry| !(is_under(key, prefix) && entry.value.is_null()));
        Ok(())
    }

    async fn delete(&self, prefix: &str) -> Result {
        self.lock()?.retain(|key, _| !is_under(key, prefix));
        debug!(prefix, "deleted");
        Ok(())
    }
}
