//! Error handling for tree operations
//!
//! Structural errors signal a call that can never succeed against the
//! current tree. They abort the operation before anything is published, so
//! the store is always left exactly as it was.

use thiserror::Error;

use crate::block_id::BlockId;
use crate::validate::InvariantViolation;

/// Errors that can occur during tree mutations and traversals
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// The target parent does not resolve to a page
    #[error("Invalid parent {}: not a page in the store", describe_parent(.parent))]
    InvalidParent { parent: Option<BlockId> },

    /// An ancestor reference is missing or not a page
    #[error("Broken ancestor chain at '{block}': {details}")]
    BrokenChain { block: BlockId, details: String },

    /// The block an operation acts on does not exist
    #[error("Block not found: '{0}'")]
    BlockNotFound(BlockId),

    /// The operation would make a page its own ancestor
    #[error("Cycle detected: '{block}' cannot be placed under '{target}'")]
    CycleDetected { block: BlockId, target: BlockId },

    /// A candidate mapping failed validation
    #[error("Invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl BlockError {
    /// Parent error for a specific id
    pub fn invalid_parent(parent: &BlockId) -> Self {
        BlockError::InvalidParent {
            parent: Some(parent.clone()),
        }
    }

    /// Whether this error indicates a corrupted store rather than a bad call
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            BlockError::BrokenChain { .. } | BlockError::Invariant(_)
        )
    }

    /// Whether this error came from a structural constraint on the tree
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            BlockError::InvalidParent { .. }
                | BlockError::CycleDetected { .. }
                | BlockError::BrokenChain { .. }
                | BlockError::Invariant(_)
        )
    }
}

fn describe_parent(parent: &Option<BlockId>) -> String {
    match parent {
        Some(id) => format!("'{}'", id),
        None => "(none)".to_string(),
    }
}

/// Result type for tree operations
pub type BlockResult<T> = Result<T, BlockError>;
