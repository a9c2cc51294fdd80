//! Tree traversal queries
//!
//! Read-only walks over a [`BlockMap`]: ancestor chains for breadcrumb
//! navigation, depth-first text export, and reachability (orphans).
//! Nothing here is cached; callers recompute from the current snapshot.

use std::collections::HashSet;

use crate::block_id::BlockId;
use crate::error::{BlockError, BlockResult};
use crate::map::BlockMap;
use crate::models::{Block, Page};

/// Indent used per depth level by [`export_outline`]
const OUTLINE_INDENT: &str = "  ";

/// Pages from `id` up to its root
///
/// Starts with the block itself when it is a page, then every ancestor in
/// order, ending at the root. A missing or non-page ancestor is reported
/// as `BrokenChain` rather than truncating the chain.
pub fn ancestor_chain<'a>(map: &'a BlockMap, id: &BlockId) -> BlockResult<Vec<&'a Page>> {
    let start = map
        .get(id)
        .ok_or_else(|| BlockError::BlockNotFound(id.clone()))?;

    let mut chain = Vec::new();
    if let Block::Page(page) = start {
        chain.push(page);
    }

    let mut current = start;
    while let Some(parent_id) = current.parent_id() {
        if chain.len() > map.len() {
            return Err(BlockError::BrokenChain {
                block: current.id().clone(),
                details: "parent references form a cycle".to_string(),
            });
        }

        let parent = map.get(parent_id).ok_or_else(|| BlockError::BrokenChain {
            block: current.id().clone(),
            details: format!("parent '{}' not found", parent_id),
        })?;
        let Block::Page(page) = parent else {
            return Err(BlockError::BrokenChain {
                block: current.id().clone(),
                details: format!("parent '{}' is not a page", parent_id),
            });
        };

        chain.push(page);
        current = parent;
    }

    Ok(chain)
}

/// Flatten a subtree into text, one block per line, depth first
pub fn export_text(map: &BlockMap, id: &BlockId) -> BlockResult<String> {
    let mut lines = Vec::new();
    collect_lines(map, id, None, &mut lines)?;
    Ok(lines.join("\n"))
}

/// Like [`export_text`], with each line indented by its depth
pub fn export_outline(map: &BlockMap, id: &BlockId) -> BlockResult<String> {
    let mut lines = Vec::new();
    collect_lines(map, id, Some(OUTLINE_INDENT), &mut lines)?;
    Ok(lines.join("\n"))
}

/// Step of the export walk
enum Visit<'a> {
    Enter(&'a BlockId, usize),
    Leave(&'a BlockId),
}

/// Depth-first walk with an explicit stack
///
/// `visiting` holds the ids on the current path; meeting one again means
/// the children lists loop.
fn collect_lines(
    map: &BlockMap,
    id: &BlockId,
    indent: Option<&str>,
    lines: &mut Vec<String>,
) -> BlockResult<()> {
    let mut visiting: HashSet<&BlockId> = HashSet::new();
    let mut stack = vec![Visit::Enter(id, 0)];

    while let Some(visit) = stack.pop() {
        let (current, depth) = match visit {
            Visit::Enter(current, depth) => (current, depth),
            Visit::Leave(current) => {
                visiting.remove(current);
                continue;
            }
        };

        let block = map
            .get(current)
            .ok_or_else(|| BlockError::BlockNotFound(current.clone()))?;

        if !visiting.insert(current) {
            return Err(BlockError::CycleDetected {
                block: current.clone(),
                target: current.clone(),
            });
        }

        match indent {
            Some(unit) => lines.push(format!("{}{}", unit.repeat(depth), block.content())),
            None => lines.push(block.content().to_string()),
        }

        stack.push(Visit::Leave(current));
        stack.extend(
            block
                .children()
                .iter()
                .rev()
                .map(|child| Visit::Enter(child, depth + 1)),
        );
    }

    Ok(())
}

/// Ids below `id` in depth-first pre-order (excluding `id` itself)
///
/// Child ids that do not resolve are skipped.
pub fn descendants(map: &BlockMap, id: &BlockId) -> Vec<BlockId> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<&BlockId> = match map.get(id) {
        Some(block) => block.children().iter().rev().collect(),
        None => return out,
    };
    seen.insert(id.clone());

    while let Some(current) = stack.pop() {
        if !seen.insert(current.clone()) {
            continue;
        }
        let Some(block) = map.get(current) else {
            continue;
        };
        out.push(current.clone());
        stack.extend(block.children().iter().rev());
    }
    out
}

/// Every id reachable from a root page through `children`
pub fn reachable(map: &BlockMap) -> HashSet<BlockId> {
    let mut seen = HashSet::new();
    for root in map.roots() {
        seen.insert(root.id.clone());
        seen.extend(descendants(map, &root.id));
    }
    seen
}

/// Blocks left in the store but unreachable from any root, in id order
pub fn orphans(map: &BlockMap) -> Vec<BlockId> {
    let live = reachable(map);
    map.ids().filter(|id| !live.contains(*id)).cloned().collect()
}
