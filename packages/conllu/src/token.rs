//! Tokens, multiword spans and the reference type used to address them.

use indexmap::IndexMap;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Placeholder for an unset column.
pub const EMPTY: &str = "_";

/// Ordered `key -> value` map used for the FEATS and MISC columns.
///
/// A key without `=` is kept with a `None` value.
pub type FeatureMap = IndexMap<String, Option<String>>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid token id '{0}'")]
pub struct InvalidTokenRef(pub String);

/// Address of a token within a sentence: an ordinary token `N` or an
/// empty node `N.K` anchored after token `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenRef {
    Ordinary(u32),
    Enhanced(u32, u32),
}

impl TokenRef {
    /// The ordinary id, or the anchor of an empty node.
    pub fn anchor(&self) -> u32 {
        match self {
            TokenRef::Ordinary(id) => *id,
            TokenRef::Enhanced(anchor, _) => *anchor,
        }
    }

    pub fn is_empty_node(&self) -> bool {
        matches!(self, TokenRef::Enhanced(..))
    }

    pub fn ordinary(&self) -> Option<u32> {
        match self {
            TokenRef::Ordinary(id) => Some(*id),
            TokenRef::Enhanced(..) => None,
        }
    }

    fn sort_key(&self) -> (u32, u32) {
        match self {
            TokenRef::Ordinary(id) => (*id, 0),
            TokenRef::Enhanced(anchor, sub) => (*anchor, *sub),
        }
    }
}

impl Ord for TokenRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for TokenRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TokenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenRef::Ordinary(id) => write!(f, "{}", id),
            TokenRef::Enhanced(anchor, sub) => write!(f, "{}.{}", anchor, sub),
        }
    }
}

impl FromStr for TokenRef {
    type Err = InvalidTokenRef;

    /// Parses `N` or `N.K`. `0` is accepted since it names the virtual root
    /// in head columns; sub ids start at 1.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidTokenRef(s.to_string());
        let number = |part: &str| -> Result<u32, InvalidTokenRef> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        match s.split_once('.') {
            None => Ok(TokenRef::Ordinary(number(s)?)),
            Some((anchor, sub)) => {
                let sub = number(sub)?;
                if sub == 0 {
                    return Err(invalid());
                }
                Ok(TokenRef::Enhanced(number(anchor)?, sub))
            }
        }
    }
}

/// One edge of the enhanced dependency graph, stored on the dependent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancedDep {
    pub head: TokenRef,
    pub label: String,
}

impl EnhancedDep {
    pub fn new(head: TokenRef, label: impl Into<String>) -> Self {
        Self {
            head,
            label: label.into(),
        }
    }

    /// Parses a single `head:label` item.
    pub fn parse(item: &str) -> Option<Self> {
        let (head, label) = item.split_once(':')?;
        if label.is_empty() {
            return None;
        }
        Some(Self::new(head.parse().ok()?, label))
    }
}

impl fmt::Display for EnhancedDep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.head, self.label)
    }
}

/// Parses a DEPS column. On failure returns the offending item.
pub fn parse_deps(column: &str) -> Result<Vec<EnhancedDep>, String> {
    let column = column.trim();
    if column == EMPTY || column.is_empty() {
        return Ok(Vec::new());
    }
    let mut deps: Vec<EnhancedDep> = Vec::new();
    for item in column.split(['|', '\n']) {
        let dep = EnhancedDep::parse(item).ok_or_else(|| item.to_string())?;
        // one label per head
        deps.retain(|d| d.head != dep.head);
        deps.push(dep);
    }
    Ok(deps)
}

pub fn format_deps(deps: &[EnhancedDep]) -> String {
    if deps.is_empty() {
        return EMPTY.to_string();
    }
    deps.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

/// Parses a FEATS or MISC column.
pub fn parse_feature_map(column: &str) -> FeatureMap {
    let mut map = FeatureMap::new();
    let column = column.trim();
    if column == EMPTY || column.is_empty() {
        return map;
    }
    for item in column.split(['|', '\n']).filter(|i| !i.is_empty()) {
        match item.split_once('=') {
            Some((k, v)) => map.insert(k.to_string(), Some(v.to_string())),
            None => map.insert(item.to_string(), None),
        };
    }
    map
}

pub fn format_feature_map(map: &FeatureMap) -> String {
    if map.is_empty() {
        return EMPTY.to_string();
    }
    map.iter()
        .map(|(k, v)| match v {
            Some(v) => format!("{}={}", k, v),
            None => k.clone(),
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// Returns the separator that follows a surface form, given its MISC map.
pub fn spaces_after(misc: &FeatureMap) -> String {
    if let Some(Some(v)) = misc.get("SpacesAfter") {
        return v
            .replace("\\s", " ")
            .replace("\\t", "\t")
            .replace("\\n", "\n");
    }
    match misc.get("SpaceAfter") {
        Some(Some(v)) if v == "No" => String::new(),
        _ => " ".to_string(),
    }
}

/// Search marks set by pattern highlighting or by the annotator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Highlight {
    pub token: bool,
    pub deprel: bool,
}

impl Highlight {
    pub fn any(&self) -> bool {
        self.token || self.deprel
    }
}

/// A single word line: an ordinary token or an empty node.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub id: TokenRef,
    pub form: String,
    pub lemma: String,
    pub upos: String,
    pub xpos: String,
    pub feats: FeatureMap,
    /// `None` when the column is `_`, `Some(0)` for the root.
    pub head: Option<u32>,
    pub deprel: String,
    pub deps: Vec<EnhancedDep>,
    pub misc: FeatureMap,
    /// Values of the schema's extra columns, in schema order.
    pub extra: Vec<String>,
    pub highlight: Highlight,
}

impl Token {
    pub fn new(id: TokenRef, form: impl Into<String>) -> Self {
        Self {
            id,
            form: form.into(),
            lemma: EMPTY.to_string(),
            upos: EMPTY.to_string(),
            xpos: EMPTY.to_string(),
            feats: FeatureMap::new(),
            head: None,
            deprel: EMPTY.to_string(),
            deps: Vec::new(),
            misc: FeatureMap::new(),
            extra: Vec::new(),
            highlight: Highlight::default(),
        }
    }

    pub fn ordinary_id(&self) -> u32 {
        self.id.anchor()
    }

    pub fn is_empty_node(&self) -> bool {
        self.id.is_empty_node()
    }

    pub fn feats_string(&self) -> String {
        format_feature_map(&self.feats)
    }

    pub fn misc_string(&self) -> String {
        format_feature_map(&self.misc)
    }

    pub fn deps_string(&self) -> String {
        format_deps(&self.deps)
    }

    pub fn feature(&self, name: &str) -> Option<&str> {
        self.feats.get(name).and_then(|v| v.as_deref())
    }

    pub fn misc_value(&self, name: &str) -> Option<&str> {
        self.misc.get(name).and_then(|v| v.as_deref())
    }

    pub fn spaces_after(&self) -> String {
        spaces_after(&self.misc)
    }

    pub fn enhanced_label(&self, head: TokenRef) -> Option<&str> {
        self.deps
            .iter()
            .find(|d| d.head == head)
            .map(|d| d.label.as_str())
    }

    /// Reads a column by field, for searches and comparisons.
    pub fn field(&self, field: &Field) -> String {
        match field {
            Field::Form => self.form.clone(),
            Field::Lemma => self.lemma.clone(),
            Field::Upos => self.upos.clone(),
            Field::Xpos => self.xpos.clone(),
            Field::Feats => self.feats_string(),
            Field::Deprel => self.deprel.clone(),
            Field::Deps => self.deps_string(),
            Field::Misc => self.misc_string(),
            Field::Extra(_) => EMPTY.to_string(),
        }
    }
}

/// Single-valued token columns that can be set directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Form,
    Lemma,
    Upos,
    Xpos,
    Feats,
    Deprel,
    Deps,
    Misc,
    Extra(String),
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Form => write!(f, "FORM"),
            Field::Lemma => write!(f, "LEMMA"),
            Field::Upos => write!(f, "UPOS"),
            Field::Xpos => write!(f, "XPOS"),
            Field::Feats => write!(f, "FEATURE"),
            Field::Deprel => write!(f, "DEPREL"),
            Field::Deps => write!(f, "DEPS"),
            Field::Misc => write!(f, "MISC"),
            Field::Extra(name) => write!(f, "{}", name),
        }
    }
}

/// A contracted surface span covering tokens `start..=end`.
#[derive(Debug, Clone, PartialEq)]
pub struct Multiword {
    pub start: u32,
    pub end: u32,
    pub form: String,
    pub misc: FeatureMap,
}

impl Multiword {
    pub fn new(start: u32, end: u32, form: impl Into<String>) -> Self {
        Self {
            start,
            end,
            form: form.into(),
            misc: FeatureMap::new(),
        }
    }

    pub fn len(&self) -> u32 {
        self.end + 1 - self.start
    }

    pub fn covers(&self, id: u32) -> bool {
        self.start <= id && id <= self.end
    }

    pub fn overlaps(&self, start: u32, end: u32) -> bool {
        self.start <= end && start <= self.end
    }
}
