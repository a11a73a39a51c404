//! Canonical serialization. Reading the output back yields the same text.

use crate::corpus::Corpus;
use crate::schema::Column;
use crate::sentence::Sentence;
use crate::token::{format_feature_map, Multiword, Token, EMPTY};

pub fn write_corpus(corpus: &Corpus) -> String {
    let mut out = String::new();
    if !corpus.schema().is_default() {
        out.push_str(&corpus.schema().header());
        out.push('\n');
    }
    for sentence in corpus.sentences() {
        write_sentence(sentence, &mut out);
    }
    out
}

/// Appends one sentence and its trailing blank line.
pub fn write_sentence(sentence: &Sentence, out: &mut String) {
    for line in sentence.meta.lines() {
        out.push_str(&line);
        out.push('\n');
    }
    for token in sentence.empty_nodes_at(0) {
        write_token(sentence, token, out);
    }
    for token in sentence.tokens() {
        let id = token.ordinary_id();
        if let Some(span) = sentence.multiword_at(id) {
            write_multiword(sentence, span, out);
        }
        write_token(sentence, token, out);
        for empty in sentence.empty_nodes_at(id) {
            write_token(sentence, empty, out);
        }
    }
    out.push('\n');
}

pub fn sentence_to_string(sentence: &Sentence) -> String {
    let mut out = String::new();
    write_sentence(sentence, &mut out);
    out
}

/// Number of lines `write_sentence` produces, blank line included.
pub fn line_count(sentence: &Sentence) -> usize {
    sentence.meta.lines().len()
        + sentence.len()
        + sentence.empty_nodes().count()
        + sentence.multiwords().count()
        + 1
}

fn write_token(sentence: &Sentence, token: &Token, out: &mut String) {
    let mut extra = token.extra.iter();
    let cells: Vec<String> = sentence
        .schema()
        .columns()
        .iter()
        .map(|column| match column {
            Column::Id => token.id.to_string(),
            Column::Form => token.form.clone(),
            Column::Lemma => token.lemma.clone(),
            Column::Upos => token.upos.clone(),
            Column::Xpos => token.xpos.clone(),
            Column::Feats => token.feats_string(),
            Column::Head => token
                .head
                .map(|h| h.to_string())
                .unwrap_or_else(|| EMPTY.to_string()),
            Column::Deprel => token.deprel.clone(),
            Column::Deps => token.deps_string(),
            Column::Misc => token.misc_string(),
            Column::Extra(_) => extra
                .next()
                .cloned()
                .unwrap_or_else(|| EMPTY.to_string()),
        })
        .collect();
    out.push_str(&cells.join("\t"));
    out.push('\n');
}

fn write_multiword(sentence: &Sentence, span: &Multiword, out: &mut String) {
    let cells: Vec<String> = sentence
        .schema()
        .columns()
        .iter()
        .map(|column| match column {
            Column::Id => format!("{}-{}", span.start, span.end),
            Column::Form => span.form.clone(),
            Column::Misc => format_feature_map(&span.misc),
            _ => EMPTY.to_string(),
        })
        .collect();
    out.push_str(&cells.join("\t"));
    out.push('\n');
}
