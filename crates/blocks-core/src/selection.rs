//! Active-selection bookkeeping
//!
//! Tracks which page is open and which block should take input focus after
//! the next render. Neither value is validated against the store.

use crate::block_id::BlockId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    active_page: Option<BlockId>,
    auto_focus: Option<BlockId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The page currently being viewed
    pub fn active_page(&self) -> Option<&BlockId> {
        self.active_page.as_ref()
    }

    /// Replace the active page unconditionally
    pub fn set_active_page(&mut self, id: Option<BlockId>) {
        self.active_page = id;
    }

    /// Ask for `id` to be focused; overwrites an unconsumed request
    pub fn request_auto_focus(&mut self, id: BlockId) {
        self.auto_focus = Some(id);
    }

    /// Peek at the pending focus request
    pub fn auto_focus(&self) -> Option<&BlockId> {
        self.auto_focus.as_ref()
    }

    /// Consume the pending focus request
    pub fn take_auto_focus(&mut self) -> Option<BlockId> {
        self.auto_focus.take()
    }
}
