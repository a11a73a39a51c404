//! # Sentence Search
//!
//! The `find*` commands. Each search is compiled once, then tried sentence
//! by sentence starting next to the current one, without wrapping.
//!
//! Sequence searches (`findlemma`, `findupos`, `findmulti`, ...) take
//! `/`-separated regular expressions that must match consecutive tokens.
//! Every regular expression must match a whole value.

use crate::errors::EditorError;
use regex::Regex;
use std::collections::BTreeSet;
use treebank_conllu::{Field, Sentence, Token, TokenRef};
use treebank_pattern::SubtreePattern;
use treebank_query::{matching_tokens, parse_condition, Condition, Pattern};

/// The `find<kind>` command family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    SentId,
    Comment,
    Word,
    Lemma,
    Feat,
    Upos,
    Xpos,
    Multi,
    Deprel,
    Subtree,
    Expression,
    Highlight,
}

impl SearchKind {
    /// Resolves a command word such as `findlemma`.
    pub fn from_command(word: &str) -> Option<Self> {
        Some(match word.strip_prefix("find")? {
            "sentid" => SearchKind::SentId,
            "comment" => SearchKind::Comment,
            "word" => SearchKind::Word,
            "lemma" => SearchKind::Lemma,
            "feat" => SearchKind::Feat,
            "upos" => SearchKind::Upos,
            "xpos" => SearchKind::Xpos,
            "multi" => SearchKind::Multi,
            "deprel" => SearchKind::Deprel,
            "subtree" => SearchKind::Subtree,
            "expression" => SearchKind::Expression,
            "highlight" => SearchKind::Highlight,
            _ => return None,
        })
    }

    /// Whether the pattern is a single word (no blanks allowed).
    pub fn single_word(&self) -> bool {
        matches!(
            self,
            SearchKind::Lemma
                | SearchKind::Feat
                | SearchKind::Upos
                | SearchKind::Xpos
                | SearchKind::Multi
                | SearchKind::Deprel
        )
    }
}

/// Direction of a deprel chain step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// A child of the current token
    Child,
    /// The head of the current token
    Head,
    /// Another child of the current token's head
    Sibling,
}

#[derive(Debug, Clone)]
enum Matcher {
    SentId(Regex),
    Comment(String),
    Word(String),
    Sequence(Vec<(Field, Pattern)>),
    /// Like `Sequence`, but over empty nodes too
    Multi(Vec<(Field, Pattern)>),
    Deprel {
        first: Pattern,
        chain: Vec<(Step, Pattern)>,
    },
    Subtree(SubtreePattern),
    Expression(Condition),
}

/// A compiled search
#[derive(Debug, Clone)]
pub struct Search {
    matcher: Matcher,
    not_found: String,
}

/// Where a search succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub index: usize,
    pub highlight: Vec<TokenRef>,
}

impl Search {
    /// Compiles the pattern of a search. `command` is the full command text,
    /// used in syntax errors. Graph pattern highlighting is handled by the
    /// session and is rejected here.
    pub fn compile(kind: SearchKind, pattern: &str, command: &str) -> Result<Self, EditorError> {
        let syntax = || EditorError::validation(format!("INVALID syntax '{}'", command));
        let (matcher, not_found) = match kind {
            SearchKind::SentId => (
                Matcher::SentId(Regex::new(pattern)?),
                format!("Sentence id not found '{}'", pattern),
            ),
            SearchKind::Comment => {
                let text = unquote(pattern);
                (
                    Matcher::Comment(text.to_string()),
                    format!("Comment not found '{}'", text),
                )
            }
            SearchKind::Word => {
                let text = unquote(pattern);
                (
                    Matcher::Word(text.to_string()),
                    format!("Word not found '{}'", text),
                )
            }
            SearchKind::Lemma | SearchKind::Feat | SearchKind::Upos | SearchKind::Xpos => {
                let field = match kind {
                    SearchKind::Lemma => Field::Lemma,
                    SearchKind::Feat => Field::Feats,
                    SearchKind::Upos => Field::Upos,
                    _ => Field::Xpos,
                };
                let steps = pattern
                    .split('/')
                    .map(|p| Ok((field.clone(), Pattern::full(p)?)))
                    .collect::<Result<Vec<_>, regex::Error>>()?;
                (
                    Matcher::Sequence(steps),
                    format!("{} not found '{}'", field, pattern),
                )
            }
            SearchKind::Multi => {
                let mut steps = Vec::new();
                for element in pattern.split('/') {
                    let (prefix, regex) = element.split_once(':').ok_or_else(syntax)?;
                    steps.push((multi_field(prefix), Pattern::full(regex)?));
                }
                (Matcher::Multi(steps), format!("not found '{}'", pattern))
            }
            SearchKind::Deprel => {
                let (first, chain) = parse_deprel_chain(pattern).ok_or_else(syntax)?;
                (
                    Matcher::Deprel { first, chain },
                    format!("DepRel not found {}", pattern),
                )
            }
            SearchKind::Subtree => (
                Matcher::Subtree(SubtreePattern::parse(pattern)?),
                "Subtree not found".to_string(),
            ),
            SearchKind::Expression => (
                Matcher::Expression(parse_condition(pattern)?),
                format!("Expression not found '{}'", pattern),
            ),
            SearchKind::Highlight => return Err(syntax()),
        };
        Ok(Self { matcher, not_found })
    }

    /// Message reported when no sentence matches
    pub fn not_found(&self) -> &str {
        &self.not_found
    }

    /// Tokens to highlight when `sentence` matches.
    pub fn matches(&self, sentence: &Sentence) -> Option<Vec<TokenRef>> {
        match &self.matcher {
            Matcher::SentId(regex) => sentence
                .sent_id()
                .filter(|id| regex.is_match(id))
                .map(|_| vec![]),
            Matcher::Comment(text) => sentence
                .comments_string()
                .contains(text.as_str())
                .then(Vec::new),
            Matcher::Word(text) => word_tokens(sentence, text),
            Matcher::Sequence(steps) => {
                let tokens: Vec<&Token> = sentence.tokens().collect();
                find_sequence(&tokens, steps)
            }
            Matcher::Multi(steps) => find_sequence(&sentence.all_tokens(), steps),
            Matcher::Deprel { first, chain } => sentence.tokens().find_map(|token| {
                if !first.is_match(&token.deprel) {
                    return None;
                }
                let mut found = BTreeSet::new();
                chain_matches(sentence, token.ordinary_id(), chain, &mut found)
                    .then(|| found.into_iter().map(TokenRef::Ordinary).collect())
            }),
            Matcher::Subtree(pattern) => {
                let ids = pattern.find(sentence);
                (!ids.is_empty()).then(|| ids.into_iter().map(TokenRef::Ordinary).collect())
            }
            Matcher::Expression(condition) => {
                let ids = matching_tokens(sentence, condition);
                (!ids.is_empty()).then_some(ids)
            }
        }
    }
}

/// Tries sentences next to `from` in the given direction, without wrapping.
pub fn scan(
    sentences: &[Sentence],
    from: usize,
    backwards: bool,
    mut accept: impl FnMut(&Sentence) -> Option<Vec<TokenRef>>,
) -> Option<Hit> {
    let order: Box<dyn Iterator<Item = usize>> = if backwards {
        Box::new((0..from.min(sentences.len())).rev())
    } else {
        Box::new(from + 1..sentences.len())
    };
    for index in order {
        if let Some(highlight) = accept(&sentences[index]) {
            return Some(Hit { index, highlight });
        }
    }
    None
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

fn multi_field(prefix: &str) -> Field {
    match prefix.chars().next() {
        Some('l') => Field::Lemma,
        Some('u') => Field::Upos,
        Some('x') => Field::Xpos,
        Some('d') => Field::Deprel,
        Some('e') => Field::Deps,
        Some('f') => Field::Feats,
        _ => Field::Form,
    }
}

fn field_matches(token: &Token, field: &Field, pattern: &Pattern) -> bool {
    match field {
        // Features match one `Key=Value` pair at a time.
        Field::Feats => token.feats.iter().any(|(key, value)| match value {
            Some(value) => pattern.is_match(&format!("{}={}", key, value)),
            None => pattern.is_match(key),
        }),
        other => pattern.is_match(&token.field(other)),
    }
}

fn find_sequence(tokens: &[&Token], steps: &[(Field, Pattern)]) -> Option<Vec<TokenRef>> {
    if steps.is_empty() || steps.len() > tokens.len() {
        return None;
    }
    tokens.windows(steps.len()).find_map(|window| {
        window
            .iter()
            .zip(steps)
            .all(|(token, (field, pattern))| field_matches(token, field, pattern))
            .then(|| window.iter().map(|t| t.id).collect())
    })
}

/// Tokens covered by the first occurrence of `needle` in the sentence text.
fn word_tokens(sentence: &Sentence, needle: &str) -> Option<Vec<TokenRef>> {
    if needle.is_empty() {
        return None;
    }
    let (text, spans) = sentence.text_with_spans();
    let byte = text.find(needle)?;
    let mut start = text[..byte].chars().count();
    let mut end = start + needle.chars().count();
    if needle.starts_with(' ') {
        start += 1;
    }
    if needle.ends_with(' ') {
        end -= 1;
    }
    let first = spans.iter().filter(|s| s.offset <= start).last()?;
    let last = spans.iter().filter(|s| s.offset < end).last()?;
    Some((first.first..=last.last).map(TokenRef::Ordinary).collect())
}

/// Splits `rel<rel>rel=rel` into the first label and the following steps.
fn parse_deprel_chain(text: &str) -> Option<(Pattern, Vec<(Step, Pattern)>)> {
    let mut labels = Vec::new();
    let mut steps = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        let step = match c {
            '<' => Step::Child,
            '>' => Step::Head,
            '=' => Step::Sibling,
            _ => {
                current.push(c);
                continue;
            }
        };
        labels.push(std::mem::take(&mut current));
        steps.push(step);
    }
    labels.push(current);
    if labels.iter().any(String::is_empty) {
        return None;
    }
    let mut patterns = labels.iter().map(|l| Pattern::full(l).ok());
    let first = patterns.next()??;
    let chain = steps
        .into_iter()
        .zip(patterns)
        .map(|(step, pattern)| pattern.map(|p| (step, p)))
        .collect::<Option<Vec<_>>>()?;
    Some((first, chain))
}

fn chain_matches(
    sentence: &Sentence,
    id: u32,
    chain: &[(Step, Pattern)],
    found: &mut BTreeSet<u32>,
) -> bool {
    let Some(((step, pattern), rest)) = chain.split_first() else {
        found.insert(id);
        return true;
    };
    let head = sentence.token(id).and_then(|t| t.head).filter(|h| *h != 0);
    let candidates: Vec<u32> = match step {
        Step::Head => head.into_iter().collect(),
        Step::Child => sentence.children(id),
        Step::Sibling => head
            .map(|h| sentence.children(h))
            .unwrap_or_default()
            .into_iter()
            .filter(|c| *c != id)
            .collect(),
    };
    let mut ok = false;
    for candidate in candidates {
        let matches = sentence
            .token(candidate)
            .is_some_and(|t| pattern.is_match(&t.deprel));
        if matches && chain_matches(sentence, candidate, rest, found) {
            ok = true;
        }
    }
    if ok {
        found.insert(id);
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use treebank_conllu::parse_corpus;

    const CORPUS: &str = "# sent_id = s1\n\
# note: first\n\
1\tLe\tle\tDET\t_\tDefinite=Def\t2\tdet\t_\t_\n\
2\tchat\tchat\tNOUN\t_\tNumber=Sing\t3\tnsubj\t_\t_\n\
3\tdort\tdormir\tVERB\t_\t_\t0\troot\t_\tSpaceAfter=No\n\
4\t.\t.\tPUNCT\t_\t_\t3\tpunct\t_\t_\n\
\n\
# sent_id = s2\n\
1\tLes\tle\tDET\t_\tDefinite=Def\t2\tdet\t_\t_\n\
2\tchiens\tchien\tNOUN\t_\tNumber=Plur\t3\tnsubj\t_\t_\n\
3\taboient\taboyer\tVERB\t_\t_\t0\troot\t_\t_\n\
\n";

    fn search(kind: SearchKind, pattern: &str) -> Search {
        Search::compile(kind, pattern, "find").unwrap()
    }

    #[test]
    fn test_scan_starts_next_to_current() {
        let corpus = parse_corpus(CORPUS).unwrap();
        let s = search(SearchKind::Lemma, "le");
        let hit = scan(corpus.sentences(), 0, false, |sent| s.matches(sent)).unwrap();
        assert_eq!(hit.index, 1);
        assert_eq!(hit.highlight, vec![TokenRef::Ordinary(1)]);

        // No wrapping past either end.
        assert!(scan(corpus.sentences(), 1, false, |sent| s.matches(sent)).is_none());
        let back = scan(corpus.sentences(), 1, true, |sent| s.matches(sent)).unwrap();
        assert_eq!(back.index, 0);
    }

    #[test]
    fn test_sequence_search() {
        let corpus = parse_corpus(CORPUS).unwrap();
        let s = search(SearchKind::Upos, "NOUN/VERB");
        assert_eq!(
            s.matches(&corpus.sentences()[0]),
            Some(vec![TokenRef::Ordinary(2), TokenRef::Ordinary(3)])
        );
        let s = search(SearchKind::Feat, "Number=Plur");
        assert!(s.matches(&corpus.sentences()[0]).is_none());
        assert_eq!(s.not_found(), "FEATURE not found 'Number=Plur'");
    }

    #[test]
    fn test_multi_search() {
        let corpus = parse_corpus(CORPUS).unwrap();
        let s = search(SearchKind::Multi, "u:DET/l:chien");
        assert!(s.matches(&corpus.sentences()[0]).is_none());
        assert!(s.matches(&corpus.sentences()[1]).is_some());
        assert!(Search::compile(SearchKind::Multi, "DET", "findmulti false DET").is_err());
    }

    #[test]
    fn test_word_search_highlights_covered_tokens() {
        let corpus = parse_corpus(CORPUS).unwrap();
        let s = search(SearchKind::Word, "\"chat dort\"");
        assert_eq!(
            s.matches(&corpus.sentences()[0]),
            Some(vec![TokenRef::Ordinary(2), TokenRef::Ordinary(3)])
        );
        assert_eq!(s.not_found(), "Word not found 'chat dort'");
    }

    #[test]
    fn test_deprel_chain() {
        let corpus = parse_corpus(CORPUS).unwrap();
        let sentence = &corpus.sentences()[0];
        let s = search(SearchKind::Deprel, "det>nsubj>root");
        assert_eq!(
            s.matches(sentence),
            Some(vec![
                TokenRef::Ordinary(1),
                TokenRef::Ordinary(2),
                TokenRef::Ordinary(3)
            ])
        );
        let s = search(SearchKind::Deprel, "nsubj=punct");
        assert_eq!(
            s.matches(sentence),
            Some(vec![TokenRef::Ordinary(2), TokenRef::Ordinary(4)])
        );
        assert!(search(SearchKind::Deprel, "nsubj<punct").matches(sentence).is_none());
    }

    #[test]
    fn test_sent_id_and_comment() {
        let corpus = parse_corpus(CORPUS).unwrap();
        assert!(search(SearchKind::SentId, "2$").matches(&corpus.sentences()[1]).is_some());
        assert!(search(SearchKind::Comment, "note").matches(&corpus.sentences()[0]).is_some());
        assert!(matches!(
            Search::compile(SearchKind::SentId, "(", "findsentid false ("),
            Err(EditorError::Regex(_))
        ));
    }
}
