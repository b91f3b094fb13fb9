// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic on-disk persistence for slot → conversation bindings. Writes
//! serialize the full map to a temp file in the same directory as the
//! target, then rename over it so readers never observe a partial write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BindingsFile {
    #[serde(default)]
    bindings: BTreeMap<String, String>,
}

/// Persists `{bindings: {slot: conversation_id}}` to a JSON file. Every
/// write replaces the whole map; the mutex serializes the read-modify-write
/// chain so concurrent writers never race on the temp-file name.
pub struct BindingsStore {
    path: PathBuf,
    write_chain: Mutex<()>,
}

impl BindingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_chain: Mutex::new(()) }
    }

    /// Non-blocking read of the current map. Never waits on the write chain.
    pub async fn load(&self) -> anyhow::Result<BTreeMap<String, String>> {
        Ok(read_file(&self.path).await?.bindings)
    }

    /// Look up a single slot's binding.
    pub async fn get(&self, slot: &str) -> anyhow::Result<Option<String>> {
        Ok(self.load().await?.get(slot).cloned())
    }

    /// Set `slot → conversation_id`, persisting atomically.
    pub async fn set(&self, slot: &str, conversation_id: &str) -> anyhow::Result<()> {
        let _guard = self.write_chain.lock().await;
        let mut file = read_file(&self.path).await?;
        file.bindings.insert(slot.to_owned(), conversation_id.to_owned());
        write_file_atomic(&self.path, &file).await
    }

    /// Remove a slot's binding, if present.
    pub async fn delete(&self, slot: &str) -> anyhow::Result<()> {
        let _guard = self.write_chain.lock().await;
        let mut file = read_file(&self.path).await?;
        file.bindings.remove(slot);
        write_file_atomic(&self.path, &file).await
    }
}

async fn read_file(path: &Path) -> anyhow::Result<BindingsFile> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            if bytes.is_empty() {
                Ok(BindingsFile::default())
            } else {
                Ok(serde_json::from_slice(&bytes)?)
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BindingsFile::default()),
        Err(err) => Err(err.into()),
    }
}

async fn write_file_atomic(path: &Path, file: &BindingsFile) -> anyhow::Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let body = serde_json::to_vec_pretty(file)?;
    let tmp_name = format!(".{}.{}.tmp", file_name(path), std::process::id());
    let tmp_path = dir.join(tmp_name);
    tokio::fs::write(&tmp_path, &body).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("bindings").to_owned()
}

#[cfg(test)]
#[path = "bindings_store_tests.rs"]
mod tests;
