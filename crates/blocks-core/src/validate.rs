//! Whole-mapping invariant checks
//!
//! Mutations keep the tree consistent one operation at a time; this module
//! checks a complete mapping from scratch. It runs in tests and, with
//! `strict_validation` enabled, before every snapshot swap.
//!
//! Orphans (blocks whose parent chain ends at an id that no longer exists)
//! are left alone here. Shallow deletion produces them on purpose.

use std::collections::HashSet;

use thiserror::Error;

use crate::block_id::BlockId;
use crate::map::BlockMap;
use crate::models::Block;

/// A broken tree invariant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("Page '{page}' lists child '{child}' which is not in the store")]
    MissingChild { page: BlockId, child: BlockId },

    #[error("Child '{child}' of page '{page}' has parent '{actual}'")]
    ParentMismatch {
        page: BlockId,
        child: BlockId,
        actual: BlockId,
    },

    #[error("Page '{page}' lists child '{child}' more than once")]
    DuplicateChild { page: BlockId, child: BlockId },

    #[error("Block '{block}' has parent '{parent}' which is not a page")]
    ParentNotPage { block: BlockId, parent: BlockId },

    #[error("Block '{block}' is part of a parent cycle")]
    Cycle { block: BlockId },

    #[error("Root page '{root}' is listed as a child of '{page}'")]
    RootListedAsChild { page: BlockId, root: BlockId },

    #[error("Block '{block}' is not listed in the children of its parent '{parent}'")]
    NotListedByParent { block: BlockId, parent: BlockId },
}

/// Check every tree invariant over the whole mapping
pub fn validate(map: &BlockMap) -> Result<(), InvariantViolation> {
    for block in map.iter() {
        if let Block::Page(page) = block {
            check_children(map, &page.id, &page.children)?;
        }
    }

    for block in map.iter() {
        check_parent(map, block)?;
        check_acyclic(map, block)?;
    }

    Ok(())
}

fn check_children(
    map: &BlockMap,
    page: &BlockId,
    children: &[BlockId],
) -> Result<(), InvariantViolation> {
    let mut seen = HashSet::with_capacity(children.len());
    for child in children {
        if !seen.insert(child) {
            return Err(InvariantViolation::DuplicateChild {
                page: page.clone(),
                child: child.clone(),
            });
        }

        let Some(child_block) = map.get(child) else {
            return Err(InvariantViolation::MissingChild {
                page: page.clone(),
                child: child.clone(),
            });
        };

        match child_block.parent_id() {
            None => {
                return Err(InvariantViolation::RootListedAsChild {
                    page: page.clone(),
                    root: child.clone(),
                })
            }
            Some(actual) if actual != page => {
                return Err(InvariantViolation::ParentMismatch {
                    page: page.clone(),
                    child: child.clone(),
                    actual: actual.clone(),
                })
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn check_parent(map: &BlockMap, block: &Block) -> Result<(), InvariantViolation> {
    let Some(parent_id) = block.parent_id() else {
        return Ok(());
    };

    match map.get(parent_id) {
        // Orphan: the parent was deleted without purging descendants
        None => Ok(()),
        Some(Block::Paragraph(_)) => Err(InvariantViolation::ParentNotPage {
            block: block.id().clone(),
            parent: parent_id.clone(),
        }),
        Some(Block::Page(parent)) => {
            if parent.child_index(block.id()).is_some() {
                Ok(())
            } else {
                Err(InvariantViolation::NotListedByParent {
                    block: block.id().clone(),
                    parent: parent_id.clone(),
                })
            }
        }
    }
}

fn check_acyclic(map: &BlockMap, block: &Block) -> Result<(), InvariantViolation> {
    let mut current = block;
    let mut steps = 0;
    while let Some(parent_id) = current.parent_id() {
        let Some(parent) = map.get(parent_id) else {
            break;
        };
        steps += 1;
        if steps > map.len() {
            return Err(InvariantViolation::Cycle {
                block: block.id().clone(),
            });
        }
        current = parent;
    }
    Ok(())
}
