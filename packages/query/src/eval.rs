//! Evaluation of conditions against the tokens of a sentence.

use crate::ast::*;
use treebank_conllu::{Sentence, Token, TokenRef, EMPTY};

impl Condition {
    /// Whether `token` of `sentence` satisfies the condition.
    pub fn matches(&self, sentence: &Sentence, token: &Token) -> bool {
        match self {
            Condition::Predicate(predicate) => predicate.matches(sentence, token),
            Condition::Relation(Relation::Child, inner) => {
                children(sentence, token).any(|child| inner.matches(sentence, child))
            }
            Condition::Relation(relation, inner) => neighbour(sentence, token, *relation)
                .is_some_and(|other| inner.matches(sentence, other)),
            Condition::Not(inner) => !inner.matches(sentence, token),
            Condition::And(left, right) => {
                left.matches(sentence, token) && right.matches(sentence, token)
            }
            Condition::Or(left, right) => {
                left.matches(sentence, token) || right.matches(sentence, token)
            }
            Condition::Compare { left, op, right } => {
                let left = left.resolve(sentence, token);
                let right = right.resolve(sentence, token);
                match op {
                    CompareOp::Equal => matches!((left, right), (Some(l), Some(r)) if l == r),
                    CompareOp::Compatible => match (left, right) {
                        (Some(l), Some(r)) if l != EMPTY && r != EMPTY => {
                            l.to_lowercase() == r.to_lowercase()
                        }
                        _ => true,
                    },
                }
            }
        }
    }
}

impl Predicate {
    pub fn matches(&self, sentence: &Sentence, token: &Token) -> bool {
        match self {
            Predicate::Column(column, pattern) => pattern.is_match(match column {
                Column::Form => &token.form,
                Column::Lemma => &token.lemma,
                Column::Upos => &token.upos,
                Column::Xpos => &token.xpos,
                Column::Deprel => &token.deprel,
            }),
            Predicate::Feat(Some(key), pattern) => {
                token.feature(key).is_some_and(|v| pattern.is_match(v))
            }
            Predicate::Feat(None, pattern) => pattern.is_match(&token.feats_string()),
            Predicate::Misc(Some(key), pattern) => {
                token.misc_value(key).is_some_and(|v| pattern.is_match(v))
            }
            Predicate::Misc(None, pattern) => pattern.is_match(&token.misc_string()),
            Predicate::Id(id) => token.id == *id,
            Predicate::HeadId(HeadId::Absolute(head)) => token.head == Some(*head),
            Predicate::HeadId(HeadId::Relative(offset)) => match (token.id, token.head) {
                (TokenRef::Ordinary(id), Some(head)) => {
                    (id as i64).checked_add(*offset) == Some(head as i64)
                }
                _ => false,
            },
            Predicate::Eud { head, label } => {
                let wanted = match head {
                    EudHead::Absolute(head) => Some(*head),
                    EudHead::Relative(offset) => {
                        (token.id.anchor() as i64)
                            .checked_add(*offset)
                            .and_then(|target| u32::try_from(target).ok())
                            .map(TokenRef::Ordinary)
                    }
                };
                let Some(wanted) = wanted else {
                    return false;
                };
                token.deps.iter().any(|dep| {
                    dep.head == wanted && label.as_ref().map_or(true, |l| l.is_match(&dep.label))
                })
            }
            Predicate::IsEmpty => token.is_empty_node(),
            Predicate::IsMwt => token
                .id
                .ordinary()
                .is_some_and(|id| sentence.multiword_covering(id).is_some()),
            Predicate::MwtLen(length) => token
                .id
                .ordinary()
                .and_then(|id| sentence.multiword_at(id))
                .is_some_and(|span| span.len() == *length),
        }
    }
}

impl ValueRef {
    /// The referenced value, `None` when a relation leads nowhere or a
    /// feature is absent.
    pub fn resolve(&self, sentence: &Sentence, token: &Token) -> Option<String> {
        let mut current = token;
        for relation in &self.path {
            current = neighbour(sentence, current, *relation)?;
        }
        self.field.read(current)
    }
}

impl RefField {
    pub fn read(&self, token: &Token) -> Option<String> {
        match self {
            RefField::Form => Some(token.form.clone()),
            RefField::Lemma => Some(token.lemma.clone()),
            RefField::Upos => Some(token.upos.clone()),
            RefField::Xpos => Some(token.xpos.clone()),
            RefField::Deprel => Some(token.deprel.clone()),
            RefField::Feat(key) => token.feature(key).map(str::to_string),
            RefField::Misc(key) => token.misc_value(key).map(str::to_string),
        }
    }
}

/// The token reached through `head`, `prec` or `next`. An empty node's
/// previous token is its anchor.
pub(crate) fn neighbour<'a>(
    sentence: &'a Sentence,
    token: &Token,
    relation: Relation,
) -> Option<&'a Token> {
    match (relation, token.id) {
        (Relation::Head, TokenRef::Ordinary(_)) => {
            token.head.filter(|h| *h > 0).and_then(|h| sentence.token(h))
        }
        (Relation::Prec, TokenRef::Ordinary(id)) => sentence.token(id.saturating_sub(1)),
        (Relation::Prec, TokenRef::Enhanced(anchor, _)) => sentence.token(anchor),
        (Relation::Next, id) => sentence.token(id.anchor() + 1),
        (Relation::Head, TokenRef::Enhanced(..)) | (Relation::Child, _) => None,
    }
}

fn children<'a>(sentence: &'a Sentence, token: &Token) -> impl Iterator<Item = &'a Token> {
    let id = token.id.ordinary();
    sentence
        .tokens()
        .filter(move |t| id.is_some() && t.head == id)
}

/// Ids of all tokens and empty nodes satisfying `condition`, in file order.
pub fn matching_tokens(sentence: &Sentence, condition: &Condition) -> Vec<TokenRef> {
    sentence
        .all_tokens()
        .into_iter()
        .filter(|token| condition.matches(sentence, token))
        .map(|token| token.id)
        .collect()
}
