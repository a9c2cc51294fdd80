//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::collections::HashSet;

use anyhow::Result;
use serde::Serialize;

use blocks_core::{Block, BlockError, BlockId, BlockMap, Page};

/// Width of the id column in listings
const SHORT_ID: usize = 8;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single block
    pub fn print_block(&self, block: &Block) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", block.id());
                println!("Type:     {}", block.block_type());
                match block.parent_id() {
                    Some(parent) => println!("Parent:   {}", parent),
                    None => println!("Parent:   (root)"),
                }
                println!("Content:  {}", display_content(block));
                if let Some(page) = block.as_page() {
                    println!("Children: {}", page.children.len());
                    println!("Created:  {}", page.created_at.format("%Y-%m-%d %H:%M"));
                }
            }
            OutputFormat::Json => print_json(block)?,
            OutputFormat::Quiet => println!("{}", block.id()),
        }
        Ok(())
    }

    /// Print a page trail, outermost first
    pub fn print_trail(&self, trail: &[&Page]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if trail.is_empty() {
                    println!("No page open.");
                    return Ok(());
                }
                let labels: Vec<String> = trail.iter().map(|p| page_label(p)).collect();
                println!("{}", labels.join(" › "));
            }
            OutputFormat::Json => print_json(&trail)?,
            OutputFormat::Quiet => {
                for page in trail {
                    println!("{}", page.id);
                }
            }
        }
        Ok(())
    }

    /// Print the subtree under `root` with short ids
    pub fn print_tree(&self, map: &BlockMap, root: &BlockId) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                let mut lines = Vec::new();
                tree_lines(map, root, &mut lines);
                for line in lines {
                    println!("{}", line);
                }
            }
            OutputFormat::Json => {
                let blocks: Vec<&Block> = subtree_ids(map, root)
                    .iter()
                    .filter_map(|id| map.get(id))
                    .collect();
                print_json(&blocks)?;
            }
            OutputFormat::Quiet => {
                for id in subtree_ids(map, root) {
                    println!("{}", id);
                }
            }
        }
        Ok(())
    }

    /// Print a list of ids with a one-line summary of each block
    pub fn print_ids(&self, map: &BlockMap, ids: &[BlockId], empty: &str) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if ids.is_empty() {
                    println!("{}", empty);
                    return Ok(());
                }
                for id in ids {
                    match map.get(id) {
                        Some(block) => println!(
                            "{} | {:<9} | {}",
                            id.short(SHORT_ID),
                            block.block_type(),
                            truncate(&display_content(block), 50)
                        ),
                        None => println!("{}", id.short(SHORT_ID)),
                    }
                }
                println!("\n{} block(s)", ids.len());
            }
            OutputFormat::Json => print_json(&ids)?,
            OutputFormat::Quiet => {
                for id in ids {
                    println!("{}", id);
                }
            }
        }
        Ok(())
    }

    /// Print exported text verbatim
    pub fn print_text(&self, text: &str) {
        match self.format {
            OutputFormat::Human | OutputFormat::Quiet => println!("{}", text),
            OutputFormat::Json => println!("{}", serde_json::json!({ "text": text })),
        }
    }

    /// Print an id produced by a command, e.g. a freshly added block
    pub fn print_created(&self, label: &str, id: &BlockId) {
        match self.format {
            OutputFormat::Human => println!("✓ {} {}", label, id),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": label, "id": id})
                );
            }
            OutputFormat::Quiet => println!("{}", id),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Report a failed command without stopping the session
    pub fn error(&self, err: &anyhow::Error) {
        let kind = FailureKind::of(err);
        match self.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "error",
                        "kind": kind.as_str(),
                        "message": format!("{:#}", err)
                    })
                );
            }
            _ => {
                eprintln!("✗ {:#}", err);
                if kind == FailureKind::Corruption {
                    eprintln!("  The document tree is damaged. Run `check` for details, `purge` to drop unreachable blocks.");
                }
            }
        }
    }
}

/// How a failed command should be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The store itself is inconsistent
    Corruption,
    /// The request conflicts with the shape of the tree
    Structural,
    /// Anything else: unknown ids, bad arguments, IO
    Usage,
}

impl FailureKind {
    /// Classify by the first [`BlockError`] in the cause chain
    pub fn of(err: &anyhow::Error) -> Self {
        match err.chain().find_map(|cause| cause.downcast_ref::<BlockError>()) {
            Some(e) if e.is_corruption() => FailureKind::Corruption,
            Some(e) if e.is_structural() => FailureKind::Structural,
            _ => FailureKind::Usage,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Corruption => "corruption",
            FailureKind::Structural => "structural",
            FailureKind::Usage => "usage",
        }
    }
}

/// `root` followed by everything below it
fn subtree_ids(map: &BlockMap, root: &BlockId) -> Vec<BlockId> {
    let mut ids = vec![root.clone()];
    ids.extend(blocks_core::query::descendants(map, root));
    ids
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Content for display, with a placeholder for blank blocks
fn display_content(block: &Block) -> String {
    let first = block.content().lines().next().unwrap_or("");
    if first.is_empty() {
        format!("(untitled {})", block.block_type())
    } else {
        first.to_string()
    }
}

fn page_label(page: &Page) -> String {
    if page.content.is_empty() {
        format!("({})", page.id.short(SHORT_ID))
    } else {
        truncate(&page.content, 30)
    }
}

fn tree_lines(map: &BlockMap, root: &BlockId, out: &mut Vec<String>) {
    let mut seen = HashSet::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((id, depth)) = stack.pop() {
        // A corrupt mapping can list a block twice or loop
        if !seen.insert(id) {
            continue;
        }
        let Some(block) = map.get(id) else {
            out.push(format!("{}{}  (missing)", "  ".repeat(depth), id.short(SHORT_ID)));
            continue;
        };
        let marker = if block.is_page() { "▸" } else { "·" };
        out.push(format!(
            "{}{} {}  {}",
            "  ".repeat(depth),
            marker,
            id.short(SHORT_ID),
            truncate(&display_content(block), 60)
        ));
        stack.extend(block.children().iter().rev().map(|child| (child, depth + 1)));
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
