//! `condition > replacement` rules, singly and in batch files.

use crate::ast::{Assignment, Condition};
use crate::error::{char_offset, EvalError, ParseError, ParseResult};
use crate::eval::matching_tokens;
use crate::lexer::rule_separator;
use crate::parser::{parse_condition, parse_replacement};
use crate::replace::apply_assignments;
use serde::Serialize;
use tracing::{debug, info};
use treebank_conllu::{Corpus, Sentence};

/// A conditional replacement rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub condition: Condition,
    pub replacement: Vec<Assignment>,
    source: String,
}

impl Rule {
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Outcome of applying rules to a corpus
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleReport {
    /// Indices of the sentences that changed, ascending
    pub changed_sentences: Vec<usize>,
    pub changed_tokens: usize,
}

/// Parse `condition > replacement`. Error positions refer to the whole
/// line.
pub fn parse_rule(line: &str) -> ParseResult<Rule> {
    let Some(separator) = rule_separator(line) else {
        return Err(ParseError::unexpected_eof(
            char_offset(line, line.trim_end().len()),
            "'>' followed by replacements",
        ));
    };
    let condition = parse_condition(&line[..separator])?;
    let rest = separator + 1;
    let replacement =
        parse_replacement(&line[rest..]).map_err(|e| e.shifted(char_offset(line, rest)))?;
    Ok(Rule {
        condition,
        replacement,
        source: line.trim().to_string(),
    })
}

/// Parse a rule file. Blank lines and `#` comments are skipped; the first
/// malformed line fails the whole batch.
pub fn parse_rules(text: &str) -> ParseResult<Vec<Rule>> {
    let mut rules = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        rules.push(parse_rule(line).map_err(|e| e.at_line(index + 1))?);
    }
    debug!(count = rules.len(), "parsed rules");
    Ok(rules)
}

/// Applies one rule to every matching token and empty node. Matches are
/// collected before any write. Returns the number of modified tokens.
pub fn apply_rule(sentence: &mut Sentence, rule: &Rule, warnings: &mut Vec<EvalError>) -> usize {
    let matched = matching_tokens(sentence, &rule.condition);
    matched
        .into_iter()
        .filter(|id| apply_assignments(sentence, *id, &rule.replacement, warnings))
        .count()
}

/// Applies `rules` in order to every sentence of `corpus`.
pub fn apply_rules(corpus: &mut Corpus, rules: &[Rule], warnings: &mut Vec<EvalError>) -> RuleReport {
    let mut report = RuleReport::default();
    for (index, sentence) in corpus.sentences_mut().iter_mut().enumerate() {
        let changed: usize = rules
            .iter()
            .map(|rule| apply_rule(sentence, rule, warnings))
            .sum();
        if changed > 0 {
            report.changed_sentences.push(index);
            report.changed_tokens += changed;
        }
    }
    info!(
        sentences = report.changed_sentences.len(),
        tokens = report.changed_tokens,
        "applied rules"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replacement_errors_use_line_offsets() {
        let err = parse_rule("Upos:X > lemma:upper(").unwrap_err();
        assert_eq!(err, ParseError::unexpected_eof(21, "value"));
    }

    #[test]
    fn test_missing_separator() {
        assert!(matches!(
            parse_rule("Upos:X").unwrap_err(),
            ParseError::UnexpectedEof { pos: 6, .. }
        ));
    }

    #[test]
    fn test_separator_without_spaces() {
        let rule = parse_rule("Upos:ADP>xpos:prep").unwrap();
        assert_eq!(rule.replacement.len(), 1);
        assert_eq!(rule.source(), "Upos:ADP>xpos:prep");
    }

    #[test]
    fn test_batch_reports_line() {
        let err = parse_rules("# comment\n\nUpos:X > upos:Y\nUpos:( > upos:Z\n").unwrap_err();
        assert!(err.to_string().starts_with("Line 4: "), "{}", err);
    }
}
