//! Durable Block Store (whole-map snapshot + in-memory map).
//!
//! Source of truth for block content. The vector index only ever holds ids
//! and metadata snapshots; hydration always comes back through here.

pub mod error;


pub use error::{StoreError, StoreResult};

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use crate::block::ConversationBlock;

const TEMP_EXTENSION: &str = "tmp";

/// Durable map from block id to [`ConversationBlock`].
///
/// All reads are served from the in-memory map; [`BlockStore::save`] persists
/// the whole map atomically (write-temp-then-rename), so a concurrent loader
/// never observes a half-written snapshot.
#[derive(Debug)]
pub struct BlockStore {
    path: PathBuf,
    blocks: RwLock<HashMap<String, ConversationBlock>>,
}

impl BlockStore {
    /// Creates a store rooted at `path`. No I/O happens until
    /// [`BlockStore::load`] or [`BlockStore::save`].
    pub fn open(path: PathBuf) -> Self {
        Self {
            path,
            blocks: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hydrates the in-memory map from the snapshot, returning the number of
    /// blocks loaded.
    ///
    /// A missing snapshot is an empty store, not an error. Unreadable or
    /// corrupt data is reported as a recoverable error so the caller can
    /// decide to start empty and log.
    pub fn load(&self) -> StoreResult<usize> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No block store snapshot; starting empty");
            let mut blocks = self.blocks.write();
            blocks.clear();
            return Ok(0);
        }

        let bytes = fs::read(&self.path).map_err(|e| StoreError::Unreadable {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let loaded: HashMap<String, ConversationBlock> =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        let count = loaded.len();
        *self.blocks.write() = loaded;
        Ok(count)
    }

    /// Atomically persists the full map.
    ///
    /// Holds the map's read lock for the duration: concurrent `get` calls
    /// proceed, concurrent `upsert` calls wait, so the snapshot on disk is
    /// always some consistent point-in-time state.
    pub fn save(&self) -> StoreResult<()> {
        let blocks = self.blocks.read();

        let bytes = serde_json::to_vec(&*blocks).map_err(|e| StoreError::PersistFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StoreError::PersistFailed {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        }

        let temp_path = self.path.with_extension(TEMP_EXTENSION);

        {
            let mut file = File::create(&temp_path).map_err(|e| StoreError::PersistFailed {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
            file.write_all(&bytes)
                .and_then(|_| file.sync_all())
                .map_err(|e| StoreError::PersistFailed {
                    path: self.path.clone(),
                    message: e.to_string(),
                })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| StoreError::PersistFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        Ok(())
    }

    /// Merges a batch into the in-memory map, last write wins per id.
    /// Does not persist; returns the batch size.
    pub fn upsert(&self, blocks: &[ConversationBlock]) -> usize {
        let mut map = self.blocks.write();
        for block in blocks {
            map.insert(block.block_id.clone(), block.clone());
        }
        blocks.len()
    }

    /// Returns the block for `block_id`, if resident.
    pub fn get(&self, block_id: &str) -> Option<ConversationBlock> {
        self.blocks.read().get(block_id).cloned()
    }

    /// Returns `true` if `block_id` is resident.
    pub fn contains(&self, block_id: &str) -> bool {
        self.blocks.read().contains_key(block_id)
    }

    /// Number of resident blocks.
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// `true` when no blocks are resident.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    /// Snapshot of all resident block ids.
    pub fn block_ids(&self) -> Vec<String> {
        self.blocks.read().keys().cloned().collect()
    }
}
