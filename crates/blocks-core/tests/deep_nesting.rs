//! Very deep documents must not exhaust the call stack

use blocks_core::{Block, BlockId, BlockMap, Config, DeletePolicy, Page, Paragraph, Store};

const DEPTH: usize = 8_000;

/// A root page with `DEPTH` nested pages below it and a paragraph at the bottom
///
/// Returns the store, the root id, the topmost nested page and the paragraph.
fn deep_store(config: Config) -> (Store, BlockId, BlockId, BlockId) {
    let mut pages = vec![Page::blank(None)];
    for level in 0..DEPTH {
        let parent_id = pages[level].id.clone();
        let mut page = Page::blank(Some(parent_id));
        page.content = format!("level {}", level + 1);
        pages[level].children.push(page.id.clone());
        pages.push(page);
    }

    let mut leaf = Paragraph::blank(pages[DEPTH].id.clone());
    leaf.content = "bottom".to_string();
    pages[DEPTH].children.push(leaf.id.clone());

    let root = pages[0].id.clone();
    let top = pages[1].id.clone();
    let leaf_id = leaf.id.clone();

    let mut blocks: Vec<Block> = pages.into_iter().map(Block::from).collect();
    blocks.push(Block::from(leaf));

    let mut store = Store::with_config(config);
    store.replace_all(BlockMap::from_blocks(blocks)).unwrap();
    store.set_active_page(Some(root.clone()));
    (store, root, top, leaf_id)
}

#[test]
fn test_export_deep_document() {
    let (store, root, _, _) = deep_store(Config::default());

    let text = store.export_text(&root).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), DEPTH + 2);
    assert_eq!(lines[1], "level 1");
    assert_eq!(lines[DEPTH + 1], "bottom");

    let outline = store.export_outline(&root).unwrap();
    let last = outline.lines().last().unwrap();
    assert_eq!(last.len(), 2 * (DEPTH + 1) + "bottom".len());
    assert!(last.ends_with("  bottom"));
}

#[test]
fn test_duplicate_deep_subtree() {
    let (mut store, root, top, _) = deep_store(Config::default());
    let before = store.blocks().len();

    let copy = store.duplicate_block(&top).unwrap();

    assert_eq!(store.blocks().len(), 2 * before - 1);
    assert_eq!(store.get(&root).unwrap().children(), &[top.clone(), copy.clone()]);
    assert_eq!(
        store.export_text(&copy).unwrap(),
        store.export_text(&top).unwrap()
    );
}

#[test]
fn test_ancestor_chain_and_delete_deep_document() {
    let (mut store, root, top, leaf) = deep_store(Config {
        delete_policy: DeletePolicy::Recursive,
        ..Config::default()
    });

    let chain = store.ancestor_chain(&leaf).unwrap();
    assert_eq!(chain.len(), DEPTH + 1);
    assert_eq!(chain.last().unwrap().id, root);

    store.delete_block(&top).unwrap();
    assert_eq!(store.blocks().len(), 1);
    assert!(store.orphans().is_empty());
}
