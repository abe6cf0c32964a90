//! Key-value state tree the results are published into.

mod json;

use async_trait::async_trait;
use serde_json::Value;

pub use self::json::JsonStore;
use crate::prelude::*;

/// Dot-separated keys with JSON scalar values.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Set the value and mark the key as fresh in this run.
    async fn write(&self, key: &str, value: Value) -> Result;

    async fn read(&self, key: &str) -> Result<Option<Value>>;

    /// Null every key under the prefix that was not written in this run.
    async fn expire(&self, prefix: &str) -> Result;

    /// Delete keys under the prefix whose value is null.
    async fn purge(&self, prefix: &str) -> Result;

    /// Delete the whole subtree.
    async fn delete(&self, prefix: &str) -> Result;
}

/// Flatten the value into scalar leaves: objects by key, arrays by zero-based index.
#[must_use]
pub fn flatten(prefix: &str, value: &Value) -> Vec<(String, Value)> {
    let mut leaves = Vec::new();
    flatten_into(prefix.to_string(), value, &mut leaves);
    leaves
}

fn flatten_into(key: String, value: &Value, leaves: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(object) => {
            for (name, child) in object {
                flatten_into(format!("{key}.{name}"), child, leaves);
            }
        }
        Value::Array(array) => {
            for (index, child) in array.iter().enumerate() {
                flatten_into(format!("{key}.{index}"), child, leaves);
            }
        }
        scalar => leaves.push((key, scalar.clone())),
    }
}

/// Write every leaf of the value under the prefix.
pub async fn publish_tree<S: StateStore + ?Sized>(store: &S, prefix: &str, value: &Value) -> Result {
    for (key, leaf) in flatten(prefix, value) {
        store.write(&key, leaf).await?;
    }
    Ok(())
}

/// Whether the key is the prefix itself or lies under it.
#[must_use]
pub fn is_under(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix).is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}
