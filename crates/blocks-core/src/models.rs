//! Data models for Blocks
//!
//! A document is a tree of blocks. Pages hold an ordered list of child ids
//! and a title-like `content`; paragraphs are leaves holding free text.
//! Blocks reference each other by id only, the tree itself lives in the
//! flat [`BlockMap`](crate::BlockMap).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block_id::BlockId;

/// The two kinds of block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Page,
    Paragraph,
}

/// Error for an unrecognized block type name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown block type '{0}' (expected 'page' or 'paragraph')")]
pub struct UnknownBlockType(pub String);

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Page => write!(f, "page"),
            BlockType::Paragraph => write!(f, "paragraph"),
        }
    }
}

impl FromStr for BlockType {
    type Err = UnknownBlockType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "page" => Ok(BlockType::Page),
            "paragraph" | "para" | "p" => Ok(BlockType::Paragraph),
            _ => Err(UnknownBlockType(s.to_string())),
        }
    }
}

/// A container block with ordered children
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    /// Unique identifier
    pub id: BlockId,
    /// Containing page, `None` for a document root
    pub parent_id: Option<BlockId>,
    /// Page title
    pub content: String,
    /// Ordered child ids
    pub children: Vec<BlockId>,
    /// When this page was created
    pub created_at: DateTime<Utc>,
}

impl Page {
    /// Create an untitled page with no children and a fresh id
    pub fn blank(parent_id: Option<BlockId>) -> Self {
        Self {
            id: BlockId::generate(),
            parent_id,
            content: String::new(),
            children: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Position of a child id in `children`
    pub fn child_index(&self, id: &BlockId) -> Option<usize> {
        self.children.iter().position(|c| c == id)
    }

    /// Whether this page has no parent
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A leaf block of free text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paragraph {
    /// Unique identifier
    pub id: BlockId,
    /// Containing page (paragraphs are never roots)
    pub parent_id: BlockId,
    /// Text content
    pub content: String,
}

impl Paragraph {
    /// Create an empty paragraph with a fresh id
    pub fn blank(parent_id: BlockId) -> Self {
        Self {
            id: BlockId::generate(),
            parent_id,
            content: String::new(),
        }
    }
}

/// A node in the document tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Page(Page),
    Paragraph(Paragraph),
}

impl Block {
    /// Create a blank block of the given type under `parent_id`
    pub fn blank(kind: BlockType, parent_id: BlockId) -> Self {
        match kind {
            BlockType::Page => Block::Page(Page::blank(Some(parent_id))),
            BlockType::Paragraph => Block::Paragraph(Paragraph::blank(parent_id)),
        }
    }

    pub fn id(&self) -> &BlockId {
        match self {
            Block::Page(page) => &page.id,
            Block::Paragraph(paragraph) => &paragraph.id,
        }
    }

    pub fn parent_id(&self) -> Option<&BlockId> {
        match self {
            Block::Page(page) => page.parent_id.as_ref(),
            Block::Paragraph(paragraph) => Some(&paragraph.parent_id),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Block::Page(page) => &page.content,
            Block::Paragraph(paragraph) => &paragraph.content,
        }
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            Block::Page(_) => BlockType::Page,
            Block::Paragraph(_) => BlockType::Paragraph,
        }
    }

    /// Child ids (always empty for a paragraph)
    pub fn children(&self) -> &[BlockId] {
        match self {
            Block::Page(page) => &page.children,
            Block::Paragraph(_) => &[],
        }
    }

    pub fn as_page(&self) -> Option<&Page> {
        match self {
            Block::Page(page) => Some(page),
            Block::Paragraph(_) => None,
        }
    }

    pub fn is_page(&self) -> bool {
        matches!(self, Block::Page(_))
    }

    /// Copy of this block with `content` replaced
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        let content = content.into();
        match self {
            Block::Page(page) => Block::Page(Page {
                content,
                ..page.clone()
            }),
            Block::Paragraph(paragraph) => Block::Paragraph(Paragraph {
                content,
                ..paragraph.clone()
            }),
        }
    }

    /// Copy of this block attached to a new parent page
    pub fn with_parent(&self, parent_id: BlockId) -> Self {
        match self {
            Block::Page(page) => Block::Page(Page {
                parent_id: Some(parent_id),
                ..page.clone()
            }),
            Block::Paragraph(paragraph) => Block::Paragraph(Paragraph {
                parent_id,
                ..paragraph.clone()
            }),
        }
    }
}

impl From<Page> for Block {
    fn from(page: Page) -> Self {
        Block::Page(page)
    }
}

impl From<Paragraph> for Block {
    fn from(paragraph: Paragraph) -> Self {
        Block::Paragraph(paragraph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_page() {
        let page = Page::blank(None);
        assert!(page.is_root());
        assert!(page.content.is_empty());
        assert!(page.children.is_empty());
    }

    #[test]
    fn test_blank_block_parent() {
        let parent = BlockId::generate();

        let paragraph = Block::blank(BlockType::Paragraph, parent.clone());
        assert_eq!(paragraph.block_type(), BlockType::Paragraph);
        assert_eq!(paragraph.parent_id(), Some(&parent));
        assert!(paragraph.children().is_empty());

        let page = Block::blank(BlockType::Page, parent.clone());
        assert!(page.is_page());
        assert_eq!(page.parent_id(), Some(&parent));
    }

    #[test]
    fn test_blank_ids_differ() {
        let parent = BlockId::generate();
        let a = Paragraph::blank(parent.clone());
        let b = Paragraph::blank(parent);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_with_content_keeps_other_fields() {
        let mut page = Page::blank(None);
        page.children.push(BlockId::generate());
        let block = Block::Page(page.clone());

        let updated = block.with_content("Title");
        let updated_page = updated.as_page().unwrap();
        assert_eq!(updated_page.content, "Title");
        assert_eq!(updated_page.id, page.id);
        assert_eq!(updated_page.children, page.children);
        assert_eq!(updated_page.created_at, page.created_at);
        // Original record is untouched
        assert!(block.content().is_empty());
    }

    #[test]
    fn test_with_parent() {
        let block: Block = Paragraph::blank(BlockId::generate()).into();
        let new_parent = BlockId::generate();
        let moved = block.with_parent(new_parent.clone());
        assert_eq!(moved.parent_id(), Some(&new_parent));
        assert_eq!(moved.id(), block.id());
    }

    #[test]
    fn test_block_type_from_str() {
        assert_eq!("page".parse::<BlockType>().unwrap(), BlockType::Page);
        assert_eq!("Paragraph".parse::<BlockType>().unwrap(), BlockType::Paragraph);
        assert_eq!("p".parse::<BlockType>().unwrap(), BlockType::Paragraph);
        assert!("heading".parse::<BlockType>().is_err());
        assert_eq!(BlockType::Page.to_string(), "page");
    }

    #[test]
    fn test_block_serialization_is_tagged() {
        let block: Block = Paragraph {
            id: BlockId::parse("abc").unwrap(),
            parent_id: BlockId::parse("def").unwrap(),
            content: "Hello".to_string(),
        }
        .into();

        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "paragraph");
        assert_eq!(json["parent_id"], "def");

        let deserialized: Block = serde_json::from_value(json).unwrap();
        assert_eq!(block, deserialized);
    }

    #[test]
    fn test_page_serialization() {
        let mut page = Page::blank(None);
        page.content = "Doc".to_string();
        page.children.push(BlockId::generate());
        let block = Block::Page(page);

        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains("\"type\":\"page\""));
        let deserialized: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(block, deserialized);
    }
}
