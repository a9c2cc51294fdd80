//! Normalized block mapping
//!
//! The whole document lives in one flat mapping from id to record. Records
//! are reference counted, so cloning a `BlockMap` to derive the next
//! snapshot shares every record; only records an operation touches get
//! replaced.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::block_id::BlockId;
use crate::models::{Block, Page};

/// Flat id-to-block mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockMap {
    blocks: BTreeMap<BlockId, Arc<Block>>,
}

impl BlockMap {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping from block records, keyed by their own ids
    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        Self {
            blocks: blocks
                .into_iter()
                .map(|block| (block.id().clone(), Arc::new(block)))
                .collect(),
        }
    }

    /// Look up a block by id
    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id).map(Arc::as_ref)
    }

    /// Look up a block by id, returning the shared record
    pub fn get_shared(&self, id: &BlockId) -> Option<Arc<Block>> {
        self.blocks.get(id).cloned()
    }

    /// Look up a block that must be a page
    pub fn page(&self, id: &BlockId) -> Option<&Page> {
        self.get(id).and_then(Block::as_page)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate over all blocks in id order
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values().map(Arc::as_ref)
    }

    /// All ids in the mapping
    pub fn ids(&self) -> btree_map::Keys<'_, BlockId, Arc<Block>> {
        self.blocks.keys()
    }

    /// Root pages (no parent)
    pub fn roots(&self) -> impl Iterator<Item = &Page> {
        self.iter()
            .filter_map(Block::as_page)
            .filter(|page| page.is_root())
    }

    /// Insert or replace a record
    pub(crate) fn put(&mut self, block: Block) {
        self.blocks.insert(block.id().clone(), Arc::new(block));
    }

    /// Replace a page record
    pub(crate) fn put_page(&mut self, page: Page) {
        self.put(Block::Page(page));
    }

    /// Remove a record, returning it if it was present
    pub(crate) fn remove(&mut self, id: &BlockId) -> Option<Arc<Block>> {
        self.blocks.remove(id)
    }
}

impl FromIterator<Block> for BlockMap {
    fn from_iter<T: IntoIterator<Item = Block>>(iter: T) -> Self {
        Self::from_blocks(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Paragraph;

    #[test]
    fn test_empty_map() {
        let map = BlockMap::new();
        assert!(map.is_empty());
        assert!(map.get(&BlockId::generate()).is_none());
    }

    #[test]
    fn test_from_blocks_keys_by_id() {
        let page = Page::blank(None);
        let paragraph = Paragraph::blank(page.id.clone());
        let map = BlockMap::from_blocks([Block::from(page.clone()), Block::from(paragraph.clone())]);

        assert_eq!(map.len(), 2);
        assert_eq!(map.page(&page.id), Some(&page));
        assert!(map.page(&paragraph.id).is_none());
        assert_eq!(map.get(&paragraph.id).unwrap().content(), "");
    }

    #[test]
    fn test_roots() {
        let root = Page::blank(None);
        let child = Page::blank(Some(root.id.clone()));
        let map: BlockMap = [Block::Page(root.clone()), Block::Page(child)]
            .into_iter()
            .collect();

        let roots: Vec<_> = map.roots().map(|p| p.id.clone()).collect();
        assert_eq!(roots, vec![root.id]);
    }

    #[test]
    fn test_clone_shares_records() {
        let page = Page::blank(None);
        let id = page.id.clone();
        let map = BlockMap::from_blocks([Block::from(page)]);
        let copy = map.clone();

        let a = map.get_shared(&id).unwrap();
        let b = copy.get_shared(&id).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_put_on_copy_leaves_original() {
        let page = Page::blank(None);
        let id = page.id.clone();
        let map = BlockMap::from_blocks([Block::from(page.clone())]);

        let mut next = map.clone();
        next.put_page(Page {
            content: "Changed".to_string(),
            ..page
        });

        assert_eq!(map.get(&id).unwrap().content(), "");
        assert_eq!(next.get(&id).unwrap().content(), "Changed");
    }
}
