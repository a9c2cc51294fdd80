//! Unified document interface
//!
//! The `Store` owns everything a presentation layer works with:
//! - the current snapshot of the block mapping
//! - the active-selection context (open page, pending focus)
//! - the configuration that shapes mutations
//!
//! ## Snapshots
//!
//! Each mutation derives a complete new mapping through the
//! [`engine`](crate::engine) and swaps it in with one assignment. A reader
//! holding a previous [`snapshot`](Store::snapshot) keeps seeing the tree as
//! it was; nobody ever observes a half-applied change.
//!
//! ## Usage
//!
//! ```
//! use blocks_core::{BlockType, Store};
//!
//! let mut store = Store::new();
//! let doc = store.create_document()?;
//! store.set_content(&doc, "Doc")?;
//!
//! let para = store.add_block(&doc, BlockType::Paragraph, None)?;
//! store.set_content(&para, "Hello")?;
//!
//! assert_eq!(store.export_text(&doc)?, "Doc\nHello");
//! # Ok::<(), blocks_core::BlockError>(())
//! ```

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::block_id::BlockId;
use crate::config::Config;
use crate::engine;
use crate::error::BlockResult;
use crate::map::BlockMap;
use crate::models::{Block, BlockType, Page};
use crate::query;
use crate::selection::Selection;
use crate::validate::{validate, InvariantViolation};

/// In-memory document store
#[derive(Debug, Clone, Default)]
pub struct Store {
    /// Current published mapping
    current: Arc<BlockMap>,
    /// Open page and focus request
    selection: Selection,
    /// Configuration
    config: Config,
}

impl Store {
    /// Create an empty store with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with a specific configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ==================== Normalized Store ====================

    /// Look up a block in the current snapshot
    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.current.get(id)
    }

    /// The current mapping
    pub fn blocks(&self) -> &BlockMap {
        &self.current
    }

    /// Shared handle to the current snapshot
    ///
    /// The handle stays valid and unchanged across later mutations.
    pub fn snapshot(&self) -> Arc<BlockMap> {
        Arc::clone(&self.current)
    }

    /// Swap in a complete new mapping
    ///
    /// With `strict_validation` the mapping is checked first and rejected
    /// if it breaks a tree invariant; the current snapshot then stays.
    pub fn replace_all(&mut self, map: BlockMap) -> BlockResult<()> {
        if self.config.strict_validation {
            if let Err(violation) = validate(&map) {
                warn!(%violation, "Rejected mapping");
                return Err(violation.into());
            }
        }
        self.current = Arc::new(map);
        Ok(())
    }

    // ==================== Mutations ====================

    /// Create a new root page and open it
    pub fn create_document(&mut self) -> BlockResult<BlockId> {
        let page = Page::blank(None);
        let id = page.id.clone();

        let mut next = (*self.current).clone();
        next.put_page(page);
        self.replace_all(next)?;

        self.selection.set_active_page(Some(id.clone()));
        info!(%id, "Created document");
        Ok(id)
    }

    /// Replace a block's content; absent ids are ignored
    pub fn set_content(&mut self, id: &BlockId, content: impl Into<String>) -> BlockResult<()> {
        if !self.current.contains(id) {
            debug!(%id, "Ignoring content update for absent block");
            return Ok(());
        }
        let next = engine::set_content(&self.current, id, content);
        self.replace_all(next)
    }

    /// Delete a block using the configured delete policy; absent ids are ignored
    pub fn delete_block(&mut self, id: &BlockId) -> BlockResult<()> {
        if !self.current.contains(id) {
            debug!(%id, "Ignoring delete of absent block");
            return Ok(());
        }
        let policy = self.config.delete_policy;
        let next = engine::delete_block(&self.current, id, policy)?;
        self.replace_all(next)?;
        debug!(%id, %policy, "Deleted block");
        Ok(())
    }

    /// Add a blank block to a page and request focus on it
    pub fn add_block(
        &mut self,
        parent_id: &BlockId,
        kind: BlockType,
        predecessor: Option<&BlockId>,
    ) -> BlockResult<BlockId> {
        let (next, id) = engine::add_block(&self.current, parent_id, kind, predecessor)?;
        self.replace_all(next)?;
        self.selection.request_auto_focus(id.clone());
        Ok(id)
    }

    /// Duplicate a subtree next to the original and request focus on the copy
    pub fn duplicate_block(&mut self, id: &BlockId) -> BlockResult<BlockId> {
        let (next, copy) = engine::duplicate_block(&self.current, id)?;
        self.replace_all(next)?;
        self.selection.request_auto_focus(copy.clone());
        Ok(copy)
    }

    /// Move a block under a new parent page relative to an anchor
    pub fn move_block(
        &mut self,
        id: &BlockId,
        new_parent_id: &BlockId,
        anchor: Option<&BlockId>,
        place_before: bool,
    ) -> BlockResult<()> {
        let next = engine::move_block(&self.current, id, new_parent_id, anchor, place_before)?;
        self.replace_all(next)
    }

    /// Drop every block unreachable from a root; returns how many were removed
    pub fn purge_orphans(&mut self) -> BlockResult<usize> {
        let (next, removed) = engine::purge_orphans(&self.current);
        if removed > 0 {
            self.replace_all(next)?;
            info!(removed, "Purged orphaned blocks");
        }
        Ok(removed)
    }

    // ==================== Queries ====================

    /// Pages from `id` up to its root (see [`query::ancestor_chain`])
    pub fn ancestor_chain(&self, id: &BlockId) -> BlockResult<Vec<&Page>> {
        query::ancestor_chain(&self.current, id)
    }

    /// Ancestor chain of the active page, root first
    ///
    /// Empty when no page is open.
    pub fn breadcrumbs(&self) -> BlockResult<Vec<&Page>> {
        let Some(active) = self.selection.active_page() else {
            return Ok(Vec::new());
        };
        let mut chain = query::ancestor_chain(&self.current, active)?;
        chain.reverse();
        Ok(chain)
    }

    /// Flatten a subtree to text, one block per line
    pub fn export_text(&self, id: &BlockId) -> BlockResult<String> {
        query::export_text(&self.current, id)
    }

    /// Flatten a subtree to indented text
    pub fn export_outline(&self, id: &BlockId) -> BlockResult<String> {
        query::export_outline(&self.current, id)
    }

    /// Blocks unreachable from any root
    pub fn orphans(&self) -> Vec<BlockId> {
        query::orphans(&self.current)
    }

    /// Check the current mapping against every tree invariant
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        validate(&self.current)
    }

    // ==================== Selection ====================

    /// The page currently open
    pub fn active_page(&self) -> Option<&BlockId> {
        self.selection.active_page()
    }

    /// Open a page (not checked against the store)
    pub fn set_active_page(&mut self, id: Option<BlockId>) {
        self.selection.set_active_page(id);
    }

    /// Ask the presentation layer to focus a block after the next render
    pub fn request_auto_focus(&mut self, id: BlockId) {
        self.selection.request_auto_focus(id);
    }

    /// Consume the pending focus request
    pub fn take_auto_focus(&mut self) -> Option<BlockId> {
        self.selection.take_auto_focus()
    }
}
