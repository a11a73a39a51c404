pub mod edit;
pub mod replace;
pub mod search;
pub mod validate;

pub use edit::{edit, EditArgs};
pub use replace::{replace, ReplaceArgs};
pub use search::{search, SearchArgs};
pub use validate::{validate, ValidateArgs};

use anyhow::{Context, Result};
use std::path::Path;
use treebank_conllu::{parse_corpus, Corpus};

/// Reads and parses a corpus file
pub(crate) fn load_corpus(path: &Path) -> Result<Corpus> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    parse_corpus(&source).with_context(|| format!("cannot parse {}", path.display()))
}

/// Sentence label for human output
pub(crate) fn sentence_label(corpus: &Corpus, index: usize) -> String {
    corpus
        .get(index)
        .and_then(|s| s.sent_id())
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", index + 1))
}
