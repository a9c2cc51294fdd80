//! Blocks Core Library
//!
//! This crate provides the document model for Blocks, an outliner where a
//! document is a tree of pages and paragraphs.
//!
//! # Architecture
//!
//! - **Normalized storage**: one flat id-to-block mapping, no nested objects
//! - **Snapshots**: every mutation derives a full new mapping and swaps it in
//!
//! The presentation layer holds a [`Store`] and calls into it; rendering,
//! input handling and clipboard access live outside this crate.
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::new();
//! let doc = store.create_document()?;
//!
//! // Add a paragraph and type into it
//! let para = store.add_block(&doc, BlockType::Paragraph, None)?;
//! store.set_content(&para, "Hello")?;
//!
//! // Flatten to text
//! let text = store.export_text(&doc)?;
//! ```
//!
//! # Modules
//!
//! - `store`: Unified document interface (main entry point)
//! - `models`: Block records (pages and paragraphs)
//! - `block_id`: Random opaque block identifiers
//! - `map`: The normalized id-to-block mapping
//! - `engine`: Pure mutation operations over a mapping
//! - `query`: Ancestor chains, text export, reachability
//! - `selection`: Active page and focus requests
//! - `validate`: Whole-mapping invariant checks
//! - `config`: Application configuration

pub mod block_id;
pub mod config;
pub mod engine;
pub mod error;
pub mod map;
pub mod models;
pub mod query;
pub mod selection;
pub mod store;
pub mod validate;

pub use block_id::{BlockId, BlockIdError};
pub use config::{Config, DeletePolicy};
pub use error::{BlockError, BlockResult};
pub use map::BlockMap;
pub use models::{Block, BlockType, Page, Paragraph, UnknownBlockType};
pub use selection::Selection;
pub use store::Store;
pub use validate::{validate, InvariantViolation};
