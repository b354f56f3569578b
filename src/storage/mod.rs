//! Item persistence
//!
//! [`ItemSink`] is the last gate before storage: it re-checks content and
//! drops URLs already accepted in the job, then hands the item to an
//! [`ItemStore`]. [`JsonLinesStore`] appends one JSON object per line to
//! `<output_dir>/<site>.jsonl`; [`MemoryStore`] keeps items in memory.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::Item;
use crate::utils::error::StorageError;

/// Why the sink refused an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyContent,
    DuplicateUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOutcome {
    Accepted,
    Rejected(RejectReason),
}

/// Destination for accepted items
pub trait ItemStore {
    /// Persist one item
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the item cannot be serialized or written.
    fn store(&mut self, item: &Item) -> Result<(), StorageError>;
}

/// Append-only JSON Lines file for one site
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    file: File,
}

impl JsonLinesStore {
    /// Open (or create) `<output_dir>/<site>.jsonl` for appending
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory or file cannot be created.
    pub fn open(output_dir: &Path, site: &str) -> Result<Self, StorageError> {
        fs::create_dir_all(output_dir).map_err(|source| StorageError::Io {
            path: output_dir.display().to_string(),
            source,
        })?;

        let path = output_dir.join(format!("{}.jsonl", sanitize_filename(site)));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StorageError::Io {
                path: path.display().to_string(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "Opened item store");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ItemStore for JsonLinesStore {
    fn store(&mut self, item: &Item) -> Result<(), StorageError> {
        let mut line = serde_json::to_string(&item.record())?;
        line.push('\n');

        self.file
            .write_all(line.as_bytes())
            .map_err(|source| StorageError::Io {
                path: self.path.display().to_string(),
                source,
            })
    }
}

/// In-memory store; clones share the same item list
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Arc<Mutex<Vec<Item>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored item, in arrival order
    pub fn items(&self) -> Vec<Item> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ItemStore for MemoryStore {
    fn store(&mut self, item: &Item) -> Result<(), StorageError> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item.clone());
        Ok(())
    }
}

/// Validating front of an [`ItemStore`], scoped to one job
#[derive(Debug)]
pub struct ItemSink<S: ItemStore> {
    store: S,
    accepted: HashSet<String>,
}

impl<S: ItemStore> ItemSink<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            accepted: HashSet::new(),
        }
    }

    /// Persist `item` unless it is empty or its URL was already accepted
    ///
    /// # Errors
    ///
    /// Returns the store's `StorageError`; the URL is then not marked as
    /// accepted.
    pub fn accept(&mut self, item: Item) -> Result<SinkOutcome, StorageError> {
        if item.is_empty() {
            return Ok(SinkOutcome::Rejected(RejectReason::EmptyContent));
        }
        if self.accepted.contains(&item.url) {
            return Ok(SinkOutcome::Rejected(RejectReason::DuplicateUrl));
        }

        self.store.store(&item)?;
        self.accepted.insert(item.url);

        Ok(SinkOutcome::Accepted)
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

/// Make a site id safe for use as a file stem
fn sanitize_filename(s: &str) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "items".to_string()
    } else {
        sanitized.to_lowercase()
    }
}
