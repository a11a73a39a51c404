//! # Treebank Pattern
//!
//! Structural search over dependency trees: graph pattern requests and
//! tabular subtree fragments.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ lexer (logos) → parser → Request            │
//! │  - pattern / without / global blocks        │
//! │  - declaration checks                       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ matcher: GraphPattern                       │
//! │  - numbered variables, staged checks        │
//! │  - injective backtracking                   │
//! └─────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────┐
//! │ subtree: rows → SubtreePattern, extraction  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use treebank_pattern::{matched_ids, GraphPattern};
//!
//! let pattern = GraphPattern::parse("pattern { N [upos=NOUN]; N -[nummod]-> M }")?;
//! let matches = pattern.find(&sentence);
//! let highlight = matched_ids(&matches);
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod matcher;
pub mod parser;
pub mod subtree;

pub use ast::{Block, Clause, FeatureConstraint, FeatureTest, GlobalCheck, LabelSet, NodeField, Request};
pub use error::{SubtreeError, SubtreeResult};
pub use matcher::{matched_ids, GraphPattern, Match};
pub use parser::{parse_request, Parser};
pub use subtree::{extract_subtree, SubtreePattern, SUBTREE_COLUMNS};
