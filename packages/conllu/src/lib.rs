//! # Treebank CoNLL-U
//!
//! Sentence model, tabular reader/writer and structural editor for
//! dependency-annotated sentences.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ reader: CoNLL-U / CoNLL-U Plus text → Corpus│
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ Sentence: tokens, empty nodes, multiwords   │
//! │  - Derived tree view (never cached)         │
//! │  - Structural edits with dense renumbering  │
//! │  - Validation counts, gold scores           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ writer: Corpus → canonical text             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use treebank_conllu::{parse_corpus, TokenRef};
//!
//! let mut corpus = parse_corpus(&source)?;
//! let sentence = corpus.get_mut(0).unwrap();
//! sentence.reattach(TokenRef::Ordinary(3), TokenRef::Ordinary(1), Some("obj"))?;
//! let text = corpus.to_conllu();
//! ```

pub mod compare;
pub mod corpus;
pub mod edit;
pub mod error;
pub mod reader;
pub mod schema;
pub mod sentence;
pub mod token;
pub mod validate;
pub mod writer;

pub use compare::Scores;
pub use corpus::Corpus;
pub use edit::{MarkerEdit, MetadataEdit, OrphanPolicy};
pub use error::{EditError, EditResult, FormatError, FormatResult};
pub use reader::{parse_corpus, parse_sentence, parse_sentence_with};
pub use schema::{Column, ColumnSchema};
pub use sentence::{Metadata, Sentence, TextSpan, TreeView};
pub use token::{
    EnhancedDep, FeatureMap, Field, Highlight, InvalidTokenRef, Multiword, Token, TokenRef, EMPTY,
};
pub use validate::{TagSets, ValidationCounts};
pub use writer::{sentence_to_string, write_corpus};
