//! Mutation engine
//!
//! Every operation reads the current mapping and derives a complete new one.
//! Records are never modified in place: a touched block is cloned, changed
//! and put into the copy. On error nothing is returned, so the caller has
//! nothing to publish and the store keeps its previous snapshot.

use std::collections::HashSet;

use chrono::Utc;
use tracing::debug;

use crate::block_id::BlockId;
use crate::config::DeletePolicy;
use crate::error::{BlockError, BlockResult};
use crate::map::BlockMap;
use crate::models::{Block, BlockType, Page, Paragraph};
use crate::query;

/// Replace the content of a block
///
/// An absent id is a no-op: the returned mapping equals the input.
pub fn set_content(map: &BlockMap, id: &BlockId, content: impl Into<String>) -> BlockMap {
    let mut next = map.clone();
    if let Some(block) = map.get(id) {
        next.put(block.with_content(content));
    }
    next
}

/// Remove a block and detach it from its parent
///
/// An absent id is a no-op. With [`DeletePolicy::Shallow`] descendants of a
/// deleted page stay in the store as orphans; with
/// [`DeletePolicy::Recursive`] they are removed in the same step.
pub fn delete_block(map: &BlockMap, id: &BlockId, policy: DeletePolicy) -> BlockResult<BlockMap> {
    let mut next = map.clone();
    let Some(block) = map.get(id) else {
        return Ok(next);
    };

    if let Some(parent_id) = block.parent_id() {
        match map.get(parent_id) {
            Some(Block::Page(parent)) => {
                let mut parent = parent.clone();
                parent.children.retain(|child| child != id);
                next.put_page(parent);
            }
            Some(Block::Paragraph(_)) => return Err(BlockError::invalid_parent(parent_id)),
            // Already an orphan, nothing to detach from
            None => {}
        }
    }

    if policy == DeletePolicy::Recursive {
        for descendant in query::descendants(map, id) {
            next.remove(&descendant);
        }
    }
    next.remove(id);

    Ok(next)
}

/// Insert a blank block into a page
///
/// The new id goes right after `predecessor` when it is one of the page's
/// children, otherwise at the front. Returns the new mapping and the id of
/// the created block.
pub fn add_block(
    map: &BlockMap,
    parent_id: &BlockId,
    kind: BlockType,
    predecessor: Option<&BlockId>,
) -> BlockResult<(BlockMap, BlockId)> {
    let parent = map
        .page(parent_id)
        .ok_or_else(|| BlockError::invalid_parent(parent_id))?;

    let block = Block::blank(kind, parent_id.clone());
    let new_id = block.id().clone();

    let mut parent = parent.clone();
    let index = predecessor
        .and_then(|pred| parent.child_index(pred))
        .map_or(0, |i| i + 1);
    parent.children.insert(index, new_id.clone());

    let mut next = map.clone();
    next.put(block);
    next.put_page(parent);

    debug!(id = %new_id, parent = %parent_id, %kind, index, "Added block");
    Ok((next, new_id))
}

/// Deep-copy the subtree at `id` and place the copy right after the original
///
/// Every copied block gets a fresh id; parent references inside the copy
/// point at the copied parents. Returns the new mapping and the id of the
/// copied root.
pub fn duplicate_block(map: &BlockMap, id: &BlockId) -> BlockResult<(BlockMap, BlockId)> {
    let source = map
        .get(id)
        .ok_or_else(|| BlockError::BlockNotFound(id.clone()))?;

    let parent_id = source
        .parent_id()
        .ok_or(BlockError::InvalidParent { parent: None })?;
    let parent = map
        .page(parent_id)
        .ok_or_else(|| BlockError::invalid_parent(parent_id))?;

    let mut next = map.clone();
    let copy_id = copy_subtree(map, &mut next, id, parent_id)?;

    let mut parent = parent.clone();
    let index = parent
        .child_index(id)
        .map_or(parent.children.len(), |i| i + 1);
    parent.children.insert(index, copy_id.clone());
    next.put_page(parent);

    debug!(source = %id, copy = %copy_id, "Duplicated block");
    Ok((next, copy_id))
}

/// Pending work while copying a subtree
enum CopyStep {
    /// Write a copy of `source` with the already chosen `copy_id`
    Copy {
        source: BlockId,
        copy_id: BlockId,
        parent_id: BlockId,
    },
    /// Every block below `source` has been copied
    Leave(BlockId),
}

/// Copy the block at `id` under `parent_id`, then everything below it
///
/// Walks with an explicit stack so nesting depth is bounded by memory, not
/// by the call stack. Each copy id is chosen before its children are
/// visited, so a copied page lists its new children in the original order.
fn copy_subtree(
    source: &BlockMap,
    next: &mut BlockMap,
    id: &BlockId,
    parent_id: &BlockId,
) -> BlockResult<BlockId> {
    let root_copy = BlockId::generate();
    let mut visiting = HashSet::new();
    let mut stack = vec![CopyStep::Copy {
        source: id.clone(),
        copy_id: root_copy.clone(),
        parent_id: parent_id.clone(),
    }];

    while let Some(step) = stack.pop() {
        let (source_id, copy_id, parent_id) = match step {
            CopyStep::Leave(done) => {
                visiting.remove(&done);
                continue;
            }
            CopyStep::Copy {
                source,
                copy_id,
                parent_id,
            } => (source, copy_id, parent_id),
        };

        let original = source
            .get(&source_id)
            .ok_or_else(|| BlockError::BlockNotFound(source_id.clone()))?;

        if !visiting.insert(source_id.clone()) {
            return Err(BlockError::CycleDetected {
                block: source_id,
                target: parent_id,
            });
        }

        let copy = match original {
            Block::Paragraph(paragraph) => Block::Paragraph(Paragraph {
                id: copy_id,
                parent_id,
                content: paragraph.content.clone(),
            }),
            Block::Page(page) => {
                let children: Vec<BlockId> =
                    page.children.iter().map(|_| BlockId::generate()).collect();

                stack.push(CopyStep::Leave(source_id.clone()));
                for (child, child_copy) in page.children.iter().zip(&children).rev() {
                    stack.push(CopyStep::Copy {
                        source: child.clone(),
                        copy_id: child_copy.clone(),
                        parent_id: copy_id.clone(),
                    });
                }

                Block::Page(Page {
                    id: copy_id,
                    parent_id: Some(parent_id),
                    content: page.content.clone(),
                    children,
                    created_at: Utc::now(),
                })
            }
        };

        // Pages stay on the path until their `Leave` step
        if !copy.is_page() {
            visiting.remove(&source_id);
        }
        next.put(copy);
    }

    Ok(root_copy)
}

/// Move a block under `new_parent_id`
///
/// The insertion index is the anchor's position in the destination's
/// children (after removing the moved block), plus one unless
/// `place_before` is set. Without an anchor, or with an anchor that is not
/// a child of the destination, the block goes to the front.
pub fn move_block(
    map: &BlockMap,
    id: &BlockId,
    new_parent_id: &BlockId,
    anchor: Option<&BlockId>,
    place_before: bool,
) -> BlockResult<BlockMap> {
    let block = map
        .get(id)
        .ok_or_else(|| BlockError::BlockNotFound(id.clone()))?;
    let destination = map
        .page(new_parent_id)
        .ok_or_else(|| BlockError::invalid_parent(new_parent_id))?;

    if block.is_page() && is_self_or_ancestor(map, id, new_parent_id) {
        return Err(BlockError::CycleDetected {
            block: id.clone(),
            target: new_parent_id.clone(),
        });
    }

    let mut next = map.clone();

    if let Some(old_parent_id) = block.parent_id() {
        if old_parent_id != new_parent_id {
            match map.get(old_parent_id) {
                Some(Block::Page(old_parent)) => {
                    let mut old_parent = old_parent.clone();
                    old_parent.children.retain(|child| child != id);
                    next.put_page(old_parent);
                }
                Some(Block::Paragraph(_)) => {
                    return Err(BlockError::invalid_parent(old_parent_id))
                }
                None => {}
            }
        }
    }

    // Same-parent moves remove and insert on this one list
    let mut destination = destination.clone();
    destination.children.retain(|child| child != id);
    let index = anchor
        .and_then(|anchor| destination.child_index(anchor))
        .map_or(0, |i| if place_before { i } else { i + 1 });
    destination.children.insert(index, id.clone());
    next.put_page(destination);

    next.put(block.with_parent(new_parent_id.clone()));

    debug!(id = %id, parent = %new_parent_id, index, "Moved block");
    Ok(next)
}

/// Whether `id` is `target` or one of its ancestors
fn is_self_or_ancestor(map: &BlockMap, id: &BlockId, target: &BlockId) -> bool {
    let mut current = Some(target);
    let mut steps = 0;
    while let Some(current_id) = current {
        if current_id == id {
            return true;
        }
        steps += 1;
        if steps > map.len() {
            return false;
        }
        current = map.get(current_id).and_then(Block::parent_id);
    }
    false
}

/// Remove every block unreachable from a root
///
/// Returns the new mapping and how many records were dropped.
pub fn purge_orphans(map: &BlockMap) -> (BlockMap, usize) {
    let orphans = query::orphans(map);
    let mut next = map.clone();
    for id in &orphans {
        next.remove(id);
    }
    (next, orphans.len())
}
