//! Line-oriented sessions over an in-memory store
//!
//! Each input line is one command (`add @ paragraph`, `set _ Hello`, ...).
//! Lines come from stdin for `blocks shell` or from a file for
//! `blocks run`. Blank lines and lines starting with `#` are skipped.
//!
//! Block arguments accept a full id, a unique id prefix, `@` for the open
//! page or `_` for the block that last received focus.

use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tracing::debug;

use blocks_core::{BlockError, BlockId, BlockMap, BlockType, Store};

use crate::output::Output;

#[derive(Parser, Debug)]
#[command(name = "blocks", no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// Create a new document and open it
    New,
    /// Add a blank block to a page
    Add {
        /// Parent page
        parent: String,
        /// Block type (page or paragraph)
        kind: BlockType,
        /// Insert after this sibling (first position if omitted)
        #[arg(long)]
        after: Option<String>,
    },
    /// Replace the content of a block
    Set {
        /// Block to edit
        id: String,
        /// New content (words are joined with spaces)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Delete a block
    #[command(alias = "rm")]
    Delete {
        /// Block to delete
        id: String,
    },
    /// Duplicate a block and everything below it
    #[command(alias = "dup")]
    Duplicate {
        /// Block to copy
        id: String,
    },
    /// Move a block under another page
    #[command(alias = "mv")]
    Move {
        /// Block to move
        id: String,
        /// Destination page
        parent: String,
        /// Sibling to position against (first position if omitted)
        #[arg(long)]
        anchor: Option<String>,
        /// Place before the anchor instead of after it
        #[arg(long, requires = "anchor")]
        before: bool,
    },
    /// Open a page
    Open {
        /// Page to open
        id: String,
    },
    /// Show the path from the document root to the open page
    #[command(alias = "crumbs")]
    Breadcrumbs,
    /// Show block details
    Show {
        /// Block to show
        #[arg(default_value = "@")]
        id: String,
    },
    /// Flatten a subtree to text
    Export {
        /// Subtree root
        #[arg(default_value = "@")]
        id: String,
        /// Indent nested blocks
        #[arg(long)]
        outline: bool,
    },
    /// Show a subtree with ids
    Tree {
        /// Subtree root
        #[arg(default_value = "@")]
        id: String,
    },
    /// Check the whole store for structural problems
    Check,
    /// List blocks unreachable from any document
    Orphans,
    /// Remove blocks unreachable from any document
    Purge,
    /// Show the block that last received focus
    Focus,
    /// End the session
    #[command(alias = "quit")]
    Exit,
}

/// Whether the session keeps reading lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// A store plus the focus state a renderer would keep
pub struct Session<'a> {
    store: Store,
    output: &'a Output,
    /// Last consumed auto-focus request
    focused: Option<BlockId>,
}

impl<'a> Session<'a> {
    pub fn new(store: Store, output: &'a Output) -> Self {
        Self {
            store,
            output,
            focused: None,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn focused(&self) -> Option<&BlockId> {
        self.focused.as_ref()
    }

    /// Parse and run one command line
    pub fn execute(&mut self, line: &str) -> Result<Flow> {
        let words = split_words(line)?;
        if words.is_empty() {
            return Ok(Flow::Continue);
        }

        let parsed = match Line::try_parse_from(&words) {
            Ok(parsed) => parsed,
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::DisplayHelp
                        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) =>
            {
                self.output.message(e.render().to_string().trim_end());
                return Ok(Flow::Continue);
            }
            Err(e) => bail!("{}", e.render().to_string().trim_end()),
        };
        debug!(command = ?parsed.command, "Executing");

        let flow = self.dispatch(parsed.command)?;

        // Consume the focus request the way a renderer does after a frame
        if let Some(id) = self.store.take_auto_focus() {
            self.focused = Some(id);
        }
        Ok(flow)
    }

    fn dispatch(&mut self, command: ShellCommand) -> Result<Flow> {
        let output = self.output;
        match command {
            ShellCommand::New => {
                let id = self.store.create_document()?;
                output.print_created("Created document", &id);
            }
            ShellCommand::Add {
                parent,
                kind,
                after,
            } => {
                let parent = self.resolve(&parent)?;
                let after = after.map(|a| self.resolve(&a)).transpose()?;
                let id = self.store.add_block(&parent, kind, after.as_ref())?;
                output.print_created(&format!("Added {}", kind), &id);
            }
            ShellCommand::Set { id, text } => {
                let id = self.resolve(&id)?;
                self.store.set_content(&id, text.join(" "))?;
                output.success(&format!("Updated {}", id.short(8)));
            }
            ShellCommand::Delete { id } => {
                let id = self.resolve(&id)?;
                self.store.delete_block(&id)?;
                if self.focused.as_ref() == Some(&id) {
                    self.focused = None;
                }
                output.success(&format!("Deleted {}", id.short(8)));
            }
            ShellCommand::Duplicate { id } => {
                let id = self.resolve(&id)?;
                let copy = self.store.duplicate_block(&id)?;
                output.print_created("Duplicated as", &copy);
            }
            ShellCommand::Move {
                id,
                parent,
                anchor,
                before,
            } => {
                let id = self.resolve(&id)?;
                let parent = self.resolve(&parent)?;
                let anchor = anchor.map(|a| self.resolve(&a)).transpose()?;
                self.store
                    .move_block(&id, &parent, anchor.as_ref(), before)?;
                output.success(&format!("Moved {} into {}", id.short(8), parent.short(8)));
            }
            ShellCommand::Open { id } => {
                let id = self.resolve(&id)?;
                if !self.store.get(&id).is_some_and(|b| b.is_page()) {
                    bail!("{} is not a page", id);
                }
                self.store.set_active_page(Some(id.clone()));
                output.success(&format!("Opened {}", id.short(8)));
            }
            ShellCommand::Breadcrumbs => {
                let trail = self.store.breadcrumbs()?;
                output.print_trail(&trail)?;
            }
            ShellCommand::Show { id } => {
                let id = self.resolve(&id)?;
                let block = self
                    .store
                    .get(&id)
                    .ok_or_else(|| anyhow!("Block not found: {}", id))?;
                output.print_block(block)?;
            }
            ShellCommand::Export { id, outline } => {
                let id = self.resolve(&id)?;
                let text = if outline {
                    self.store.export_outline(&id)?
                } else {
                    self.store.export_text(&id)?
                };
                output.print_text(&text);
            }
            ShellCommand::Tree { id } => {
                let id = self.resolve(&id)?;
                output.print_tree(self.store.blocks(), &id)?;
            }
            ShellCommand::Check => {
                self.store
                    .validate()
                    .map_err(BlockError::from)
                    .context("Store is inconsistent")?;
                output.success(&format!(
                    "{} block(s), no structural problems",
                    self.store.blocks().len()
                ));
            }
            ShellCommand::Orphans => {
                let orphans = self.store.orphans();
                output.print_ids(self.store.blocks(), &orphans, "No orphaned blocks.")?;
            }
            ShellCommand::Purge => {
                let removed = self.store.purge_orphans()?;
                output.success(&format!("Removed {} orphaned block(s)", removed));
            }
            ShellCommand::Focus => match &self.focused {
                Some(id) => output.print_created("Focused", id),
                None => output.message("Nothing focused."),
            },
            ShellCommand::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    /// Turn a command argument into a block id
    fn resolve(&self, token: &str) -> Result<BlockId> {
        match token {
            "@" => self
                .store
                .active_page()
                .cloned()
                .ok_or_else(|| anyhow!("No page open. Use `new` or `open <id>` first.")),
            "_" => self
                .focused
                .clone()
                .ok_or_else(|| anyhow!("Nothing focused yet.")),
            _ => resolve_id(self.store.blocks(), token),
        }
    }
}

/// Match a full id or a unique prefix
fn resolve_id(map: &BlockMap, token: &str) -> Result<BlockId> {
    if let Ok(id) = BlockId::parse(token) {
        if map.contains(&id) {
            return Ok(id);
        }
    }

    let matches: Vec<&BlockId> = map
        .ids()
        .filter(|id| id.as_str().starts_with(token))
        .collect();

    match matches.as_slice() {
        [] => bail!("No block found matching: {}", token),
        [id] => Ok((*id).clone()),
        _ => {
            eprintln!("Multiple blocks match '{}':", token);
            for id in &matches {
                let content = map.get(id).map(|b| b.content()).unwrap_or_default();
                eprintln!("  {} - {}", id, content);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

/// Split a line into words, honouring single and double quotes
fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') => match chars.next() {
                Some(next) => current.push(next),
                None => bail!("Trailing backslash in: {}", line),
            },
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        bail!("Unterminated quote in: {}", line);
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Read commands from stdin until EOF or `exit`
pub fn interactive(store: Store, output: &Output) -> Result<()> {
    let stdin = io::stdin();
    let prompt = stdin.is_terminal() && !output.is_quiet();
    if prompt {
        output.message("Blocks shell. Type `help` for commands, `exit` to leave.");
    }
    let mut session = Session::new(store, output);
    run_lines(&mut session, stdin.lock(), prompt, true)
}

/// Run every command in a script file, stopping at the first failure
pub fn script(store: Store, path: &Path, output: &Output) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("Failed to open script: {}", path.display()))?;
    let mut session = Session::new(store, output);
    run_lines(&mut session, BufReader::new(file), false, false)
}

fn run_lines<R: BufRead>(
    session: &mut Session<'_>,
    reader: R,
    prompt: bool,
    keep_going: bool,
) -> Result<()> {
    let mut lines = reader.lines();
    let mut number = 0;

    loop {
        if prompt {
            print!("> ");
            io::stdout().flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        number += 1;

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match session.execute(trimmed) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(e) if keep_going => session.output.error(&e),
            Err(e) => return Err(e.context(format!("line {}: {}", number, trimmed))),
        }
    }

    Ok(())
}
