//! Syntax trees of the condition and replacement languages.

use regex::Regex;
use std::fmt;
use treebank_conllu::TokenRef;

/// A regular expression that must match a whole value.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles `source` anchored at both ends.
    pub fn full(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            regex: Regex::new(&format!("^(?:{})$", source))?,
        })
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Token columns addressable by a plain field predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Form,
    Lemma,
    Upos,
    Xpos,
    Deprel,
}

impl Column {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "form" => Some(Column::Form),
            "lemma" => Some(Column::Lemma),
            "upos" => Some(Column::Upos),
            "xpos" => Some(Column::Xpos),
            "deprel" => Some(Column::Deprel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadId {
    Absolute(u32),
    /// Head is the token's own id plus the offset.
    Relative(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EudHead {
    Absolute(TokenRef),
    Relative(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Column(Column, Pattern),
    /// `Feat:Key=re` when a key is given, otherwise the whole FEATS string.
    Feat(Option<String>, Pattern),
    Misc(Option<String>, Pattern),
    Id(TokenRef),
    HeadId(HeadId),
    Eud { head: EudHead, label: Option<Pattern> },
    IsEmpty,
    IsMwt,
    /// The token starts a multiword span of this many tokens.
    MwtLen(u32),
}

/// Neighbourhood navigation used by `head(...)` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Head,
    Prec,
    Next,
    Child,
}

impl Relation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "head" => Some(Relation::Head),
            "prec" => Some(Relation::Prec),
            "next" => Some(Relation::Next),
            "child" => Some(Relation::Child),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Exact equality, both sides must resolve.
    Equal,
    /// Case-insensitive equality, or either side missing.
    Compatible,
}

/// Field a value reference resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefField {
    Form,
    Lemma,
    Upos,
    Xpos,
    Deprel,
    Feat(String),
    Misc(String),
}

impl RefField {
    /// Parses `Form`, `Feat_Number`, `Misc_SpaceAfter` and so on.
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(column) = Column::from_name(name) {
            return Some(match column {
                Column::Form => RefField::Form,
                Column::Lemma => RefField::Lemma,
                Column::Upos => RefField::Upos,
                Column::Xpos => RefField::Xpos,
                Column::Deprel => RefField::Deprel,
            });
        }
        let (prefix, key) = name.split_once('_')?;
        if key.is_empty() {
            return None;
        }
        match prefix.to_ascii_lowercase().as_str() {
            "feat" => Some(RefField::Feat(key.to_string())),
            "misc" => Some(RefField::Misc(key.to_string())),
            _ => None,
        }
    }
}

/// `@Field` seen through zero or more relations, innermost last:
/// `head(prec(@Upos))` has path `[Head, Prec]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRef {
    pub path: Vec<Relation>,
    pub field: RefField,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Predicate(Predicate),
    Relation(Relation, Box<Condition>),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Compare {
        left: ValueRef,
        op: CompareOp,
        right: ValueRef,
    },
}

/// Left-hand side of an assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Form,
    Lemma,
    Upos,
    Xpos,
    Deprel,
    Feat(String),
    Misc(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Form => write!(f, "form"),
            Target::Lemma => write!(f, "lemma"),
            Target::Upos => write!(f, "upos"),
            Target::Xpos => write!(f, "xpos"),
            Target::Deprel => write!(f, "deprel"),
            Target::Feat(key) => write!(f, "feat:{}", key),
            Target::Misc(key) => write!(f, "misc:{}", key),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ValueExpr {
    Literal(String),
    /// A field of the matched token (`hops == 0`) or of its n-th head.
    Field { hops: usize, field: RefField },
    Concat(Vec<ValueExpr>),
    Upper(Box<ValueExpr>),
    Lower(Box<ValueExpr>),
    Cap(Box<ValueExpr>),
    /// Character range, end exclusive.
    Substring(Box<ValueExpr>, usize, Option<usize>),
    Replace(Box<ValueExpr>, regex::Regex, String),
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub target: Target,
    pub value: ValueExpr,
}
