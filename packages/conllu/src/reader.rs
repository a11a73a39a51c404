//! Line-oriented reader for CoNLL-U and CoNLL-U Plus files.

use crate::corpus::Corpus;
use crate::error::{FormatError, FormatResult};
use crate::schema::{Column, ColumnSchema};
use crate::sentence::Sentence;
use crate::token::{parse_deps, parse_feature_map, Multiword, Token, TokenRef, EMPTY};
use std::sync::Arc;
use tracing::debug;

/// Parses a whole file. A `# global.columns` header on the first line sets
/// the schema for every sentence.
pub fn parse_corpus(source: &str) -> FormatResult<Corpus> {
    let mut lines = source.lines().enumerate().peekable();
    let schema = match lines.peek() {
        Some((_, first)) => match ColumnSchema::parse_header(first) {
            Some(schema) => {
                lines.next();
                schema?
            }
            None => ColumnSchema::conllu(),
        },
        None => ColumnSchema::conllu(),
    };
    let schema = Arc::new(schema);

    let mut sentences = Vec::new();
    let mut builder = SentenceBuilder::new(Arc::clone(&schema));
    for (index, line) in lines {
        let line_number = index + 1;
        if line.trim().is_empty() {
            if !builder.is_blank() {
                sentences.push(builder.finish()?);
                builder = SentenceBuilder::new(Arc::clone(&schema));
            }
            continue;
        }
        builder.line(line_number, line)?;
    }
    if !builder.is_blank() {
        sentences.push(builder.finish()?);
    }

    debug!(sentences = sentences.len(), columns = schema.len(), "parsed corpus");
    Ok(Corpus::from_parts(schema, sentences))
}

/// Parses a single sentence in the standard ten-column layout.
pub fn parse_sentence(source: &str) -> FormatResult<Sentence> {
    parse_sentence_with(source, Arc::new(ColumnSchema::conllu()))
}

pub fn parse_sentence_with(source: &str, schema: Arc<ColumnSchema>) -> FormatResult<Sentence> {
    let mut builder = SentenceBuilder::new(schema);
    for (index, line) in source.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        builder.line(index + 1, line)?;
    }
    builder.finish()
}

fn column_value<'a>(schema: &ColumnSchema, cells: &[&'a str], column: &Column) -> &'a str {
    schema
        .columns()
        .iter()
        .position(|c| c == column)
        .map(|i| cells[i])
        .unwrap_or(EMPTY)
}

struct SentenceBuilder {
    sentence: Sentence,
    seen_lines: bool,
}

impl SentenceBuilder {
    fn new(schema: Arc<ColumnSchema>) -> Self {
        Self {
            sentence: Sentence::new(schema),
            seen_lines: false,
        }
    }

    fn is_blank(&self) -> bool {
        !self.seen_lines
    }

    fn line(&mut self, number: usize, line: &str) -> FormatResult<()> {
        self.seen_lines = true;
        if line.starts_with('#') {
            self.sentence.meta.absorb(line);
            return Ok(());
        }
        self.token_line(number, line)
    }

    fn token_line(&mut self, number: usize, line: &str) -> FormatResult<()> {
        let schema = self.sentence.schema_arc();
        let cells: Vec<&str> = line.split('\t').collect();
        if cells.len() != schema.len() {
            return Err(FormatError::invalid_line(number, line));
        }
        for (value, column) in cells.iter().zip(schema.columns()) {
            if value.trim().is_empty() {
                return Err(FormatError::empty_column(number, column.name()));
            }
        }
        let cell = |column: Column| column_value(&schema, &cells, &column);

        let id = cell(Column::Id);
        if let Some((start, end)) = id.split_once('-') {
            return self.multiword_line(number, &schema, &cells, start, end, id);
        }

        let token_ref: TokenRef = id
            .parse()
            .map_err(|_| FormatError::invalid_id(number, id))?;
        let next = self.sentence.len() as u32;
        match token_ref {
            TokenRef::Ordinary(n) if n != next + 1 => {
                return Err(FormatError::NonContiguous {
                    line: number,
                    value: id.to_string(),
                    expected: (next + 1).to_string(),
                })
            }
            TokenRef::Enhanced(anchor, sub) => {
                let expected_sub = self.sentence.empty_nodes_at(anchor).count() as u32 + 1;
                if anchor != next || sub != expected_sub {
                    return Err(FormatError::NonContiguous {
                        line: number,
                        value: id.to_string(),
                        expected: format!("{}.{}", next, expected_sub),
                    });
                }
            }
            _ => {}
        }

        let mut token = Token::new(token_ref, cell(Column::Form));
        token.lemma = cell(Column::Lemma).to_string();
        token.upos = cell(Column::Upos).to_string();
        token.xpos = cell(Column::Xpos).to_string();
        token.feats = parse_feature_map(cell(Column::Feats));
        token.deprel = cell(Column::Deprel).to_string();
        token.misc = parse_feature_map(cell(Column::Misc));
        token.deps = parse_deps(cell(Column::Deps)).map_err(|value| {
            FormatError::InvalidEnhancedDep {
                line: number,
                value,
            }
        })?;
        token.head = match cell(Column::Head) {
            EMPTY => None,
            head => {
                let head: u32 = head
                    .parse()
                    .map_err(|_| FormatError::InvalidHead { line: number })?;
                if TokenRef::Ordinary(head) == token_ref {
                    return Err(FormatError::SelfHead { line: number });
                }
                Some(head)
            }
        };
        token.extra = schema
            .columns()
            .iter()
            .zip(&cells)
            .filter(|(c, _)| matches!(c, Column::Extra(_)))
            .map(|(_, v)| v.to_string())
            .collect();

        match token_ref {
            TokenRef::Ordinary(_) => self.sentence.tokens.push_back(token),
            TokenRef::Enhanced(..) => self.sentence.empty_nodes.push_back(token),
        }
        Ok(())
    }

    fn multiword_line(
        &mut self,
        number: usize,
        schema: &ColumnSchema,
        cells: &[&str],
        start: &str,
        end: &str,
        id: &str,
    ) -> FormatResult<()> {
        let bounds = (start.parse::<u32>(), end.parse::<u32>());
        let (start, end) = match bounds {
            (Ok(s), Ok(e)) if s >= 1 && s < e => (s, e),
            _ => {
                return Err(FormatError::InvalidRange {
                    line: number,
                    value: id.to_string(),
                })
            }
        };
        let next = self.sentence.len() as u32 + 1;
        if start != next {
            return Err(FormatError::NonContiguous {
                line: number,
                value: id.to_string(),
                expected: next.to_string(),
            });
        }

        let mut form = EMPTY;
        let mut misc = EMPTY;
        for (column, value) in schema.columns().iter().zip(cells) {
            match column {
                Column::Id => {}
                Column::Form => form = *value,
                Column::Misc => misc = *value,
                _ if *value != EMPTY => {
                    return Err(FormatError::MultiwordColumns { line: number })
                }
                _ => {}
            }
        }
        let mut span = Multiword::new(start, end, form);
        span.misc = parse_feature_map(misc);
        self.sentence.multiwords.push_back(span);
        Ok(())
    }

    fn finish(self) -> FormatResult<Sentence> {
        let sentence = self.sentence;
        let len = sentence.len();
        for token in sentence.tokens().chain(sentence.empty_nodes()) {
            if let Some(head) = token.head {
                if head as usize > len {
                    return Err(FormatError::HeadOutOfRange { head, len });
                }
            }
        }
        for span in sentence.multiwords() {
            if span.end as usize > len {
                return Err(FormatError::InvalidRange {
                    line: 0,
                    value: format!("{}-{}", span.start, span.end),
                });
            }
        }
        Ok(sentence)
    }
}
