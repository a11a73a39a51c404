//! An open file: the column schema and its sentences.

use crate::error::{EditError, EditResult};
use crate::schema::ColumnSchema;
use crate::sentence::Sentence;
use crate::token::{EnhancedDep, Multiword, Token, TokenRef};
use crate::writer;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    schema: Arc<ColumnSchema>,
    sentences: Vec<Sentence>,
}

impl Corpus {
    pub fn new(schema: ColumnSchema) -> Self {
        Self::from_parts(Arc::new(schema), Vec::new())
    }

    pub(crate) fn from_parts(schema: Arc<ColumnSchema>, sentences: Vec<Sentence>) -> Self {
        Self { schema, sentences }
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn sentences_mut(&mut self) -> &mut [Sentence] {
        &mut self.sentences
    }

    pub fn get(&self, index: usize) -> Option<&Sentence> {
        self.sentences.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Sentence> {
        self.sentences.get_mut(index)
    }

    /// Swaps in a sentence, returning the old one.
    pub fn replace(&mut self, index: usize, sentence: Sentence) -> Option<Sentence> {
        let slot = self.sentences.get_mut(index)?;
        Some(std::mem::replace(slot, sentence))
    }

    /// Replaces the `count` sentences starting at `index` with `sentences`.
    /// Returns the removed ones.
    pub fn splice(&mut self, index: usize, count: usize, sentences: Vec<Sentence>) -> Vec<Sentence> {
        let start = index.min(self.sentences.len());
        let end = (start + count).min(self.sentences.len());
        self.sentences.splice(start..end, sentences).collect()
    }

    pub fn push(&mut self, sentence: Sentence) {
        self.sentences.push(sentence);
    }

    pub fn to_conllu(&self) -> String {
        writer::write_corpus(self)
    }

    /// Index of the sentence holding 1-based line `line` of the serialized
    /// file. Lines of the trailing blank count for the sentence before.
    pub fn sentence_at_line(&self, line: usize) -> Option<usize> {
        let mut last = if self.schema.is_default() { 0 } else { 1 };
        for (index, sentence) in self.sentences.iter().enumerate() {
            last += writer::line_count(sentence);
            if line <= last {
                return Some(index);
            }
        }
        None
    }

    /// Moves tokens `id..N` of sentence `index` into a new sentence right
    /// after it.
    pub fn split_sentence(&mut self, index: usize, id: u32) -> EditResult<()> {
        let sentence = self
            .sentences
            .get(index)
            .ok_or_else(|| EditError::invalid_id(index))?;
        if id < 2 || id as usize > sentence.len() {
            return Err(EditError::InvalidSplit(id));
        }
        if sentence
            .multiwords()
            .any(|m| m.start < id && id <= m.end)
        {
            return Err(EditError::InvalidSplit(id));
        }

        let (mut first, mut second) = split_at(sentence, id);
        let counter = sentence.modification() + 1;
        first.modification = counter;
        second.modification = counter;
        if first.meta.text.is_some() {
            first.meta.text = Some(first.text());
            second.meta.text = Some(second.text());
        }
        debug!(index, id, "split sentence");
        self.sentences[index] = first;
        self.sentences.insert(index + 1, second);
        Ok(())
    }

    /// Appends sentence `index + 1` to sentence `index`.
    pub fn join_sentence(&mut self, index: usize) -> EditResult<()> {
        if index + 1 >= self.sentences.len() {
            return Err(EditError::NoNextSentence);
        }
        let next = self.sentences.remove(index + 1);
        let current = &mut self.sentences[index];
        let offset = current.len() as u32;
        let base = current.empty_nodes_at(offset).count() as u32;
        let shift = |r: TokenRef| match r {
            TokenRef::Ordinary(0) => TokenRef::Ordinary(0),
            TokenRef::Ordinary(h) => TokenRef::Ordinary(h + offset),
            TokenRef::Enhanced(0, s) => TokenRef::Enhanced(offset, s + base),
            TokenRef::Enhanced(a, s) => TokenRef::Enhanced(a + offset, s),
        };
        let moved = |token: &Token| -> Token {
            let mut token = token.clone();
            token.id = shift(token.id);
            token.head = token.head.map(|h| if h == 0 { 0 } else { h + offset });
            token.deps = token
                .deps
                .iter()
                .map(|d| EnhancedDep::new(shift(d.head), d.label.clone()))
                .collect();
            token
        };

        for token in next.tokens() {
            current.tokens.push_back(moved(token));
        }
        for node in next.empty_nodes() {
            current.empty_nodes.push_back(moved(node));
        }
        for span in next.multiwords() {
            let mut span: Multiword = span.clone();
            span.start += offset;
            span.end += offset;
            current.multiwords.push_back(span);
        }
        current.sort_empty_nodes();
        if current.meta.text.is_some() {
            current.meta.text = Some(current.text());
        }
        current.touch();
        debug!(index, appended = next.len(), "joined sentences");
        Ok(())
    }
}

fn split_at(sentence: &Sentence, id: u32) -> (Sentence, Sentence) {
    let offset = id - 1;
    let in_first = |r: TokenRef| r.anchor() < id;

    let mut first = Sentence::new(sentence.schema_arc());
    first.meta = sentence.meta.clone();
    let mut second = Sentence::new(sentence.schema_arc());
    second.meta.sent_id = sentence.meta.sent_id.as_ref().map(|s| format!("{}-bis", s));

    let keep_first = |token: &Token| -> Token {
        let mut token = token.clone();
        if token.head.is_some_and(|h| h >= id) {
            token.head = Some(0);
            token.deprel = "root".to_string();
        }
        token
            .deps
            .retain(|d| d.head == TokenRef::Ordinary(0) || in_first(d.head));
        token
    };
    let shift = |r: TokenRef| match r {
        TokenRef::Ordinary(h) => TokenRef::Ordinary(h - offset),
        TokenRef::Enhanced(a, s) => TokenRef::Enhanced(a - offset, s),
    };
    let keep_second = |token: &Token| -> Token {
        let mut token = token.clone();
        token.id = shift(token.id);
        match token.head {
            Some(h) if h >= id => token.head = Some(h - offset),
            Some(h) if h > 0 => {
                token.head = Some(0);
                token.deprel = "root".to_string();
            }
            _ => {}
        }
        token.deps = token
            .deps
            .iter()
            .filter_map(|d| match d.head {
                TokenRef::Ordinary(0) => Some(d.clone()),
                head if in_first(head) => None,
                head => Some(EnhancedDep::new(shift(head), d.label.clone())),
            })
            .collect();
        token
    };

    for token in sentence.tokens() {
        if token.ordinary_id() < id {
            first.tokens.push_back(keep_first(token));
        } else {
            second.tokens.push_back(keep_second(token));
        }
    }
    for node in sentence.empty_nodes() {
        if in_first(node.id) {
            first.empty_nodes.push_back(keep_first(node));
        } else {
            second.empty_nodes.push_back(keep_second(node));
        }
    }
    for span in sentence.multiwords() {
        if span.end < id {
            first.multiwords.push_back(span.clone());
        } else {
            let mut span = span.clone();
            span.start -= offset;
            span.end -= offset;
            second.multiwords.push_back(span);
        }
    }
    (first, second)
}
