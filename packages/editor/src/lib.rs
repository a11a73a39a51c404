//! # Treebank Editor
//!
//! Session layer for editing an annotated corpus.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ command: text protocol → Command            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ session: one open document                  │
//! │  - Navigation and search                    │
//! │  - Edits checked against the client counter │
//! │  - Undo/redo history for one sentence       │
//! │  - Save policy and durable save             │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ response: sentence view → JSON              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Document is source of truth**: trees and scores are derived views
//! 2. **Optimistic concurrency**: clients send the counter they last saw
//! 3. **Atomic edits**: a rejected command leaves the document untouched
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use treebank_editor::{EditorConfig, Request, Session};
//!
//! let config = Arc::new(EditorConfig::default());
//! let mut session = Session::open(config, "fr_gsd-ud-dev.conllu")?;
//!
//! let response = session.process(&Request::new("read 0", 0));
//! let modification = response.view.as_ref().map(|v| v.modification).unwrap_or(0);
//!
//! let response = session.process(&Request::new("mod 3 1 obj", 0).observed(modification));
//! println!("{}", response.to_json());
//! ```

mod command;
mod config;
mod errors;
mod history;
mod persist;
mod response;
mod search;
mod session;

pub use command::{Command, Mutation, ReadTarget};
pub use config::{EditorConfig, SavePolicy};
pub use errors::{EditorError, ErrorKind};
pub use history::{History, Snapshot, DEFAULT_CAPACITY};
pub use persist::{BackupFile, DurableSave, InPlace, MemorySink};
pub use response::{EdgeView, MultiwordView, NodeView, Response, SentenceView, ViewContext};
pub use search::{scan, Hit, Search, SearchKind};
pub use session::{Request, Session, SharedSession};
