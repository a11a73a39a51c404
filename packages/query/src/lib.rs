//! # Treebank Query
//!
//! Condition language for selecting tokens, and the replacement language
//! used to rewrite them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ lexer (logos): condition / replacement      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ parser: recursive descent → Condition AST   │
//! │  - char offsets in every ParseError         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ eval / replace / rules                      │
//! │  - match tokens, rewrite fields             │
//! │  - batch rule files with line numbers       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use treebank_query::{apply_rule, parse_rule};
//!
//! let rule = parse_rule("Upos:ADP and Deprel:case > xpos:prep")?;
//! let mut warnings = Vec::new();
//! let changed = apply_rule(&mut sentence, &rule, &mut warnings);
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod replace;
pub mod rules;

pub use ast::{Assignment, CompareOp, Condition, Pattern, Predicate, RefField, Relation, Target, ValueExpr, ValueRef};
#[cfg(feature = "pretty-errors")]
pub use error::render_error;
pub use error::{char_offset, EvalError, ParseError, ParseResult};
pub use eval::matching_tokens;
pub use parser::{parse_condition, parse_replacement, Parser, ReplacementParser};
pub use replace::apply_assignments;
pub use rules::{apply_rule, apply_rules, parse_rule, parse_rules, Rule, RuleReport};
