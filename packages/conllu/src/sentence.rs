//! # Sentence Tree
//!
//! Ordinary tokens live in a persistent vector addressed by `id - 1`, so a
//! clone shares structure with the original and history snapshots stay cheap.
//! Empty nodes and multiword spans are kept in file order next to them.
//! The head/children view is derived on demand and never cached, so no edit
//! can leave it stale.

use crate::schema::ColumnSchema;
use crate::token::{Multiword, Token, TokenRef};
use im::Vector;
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

/// Structured comment lines of a sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub sent_id: Option<String>,
    /// `Some("")` is a bare `# newdoc` marker.
    pub newdoc: Option<String>,
    /// `Some("")` is a bare `# newpar` marker.
    pub newpar: Option<String>,
    pub text: Option<String>,
    pub translit: Option<String>,
    /// `text_LANG` lines keyed by language code.
    pub translations: IndexMap<String, String>,
    pub comments: Vec<String>,
}

impl Metadata {
    /// Absorbs one `#` line.
    pub fn absorb(&mut self, line: &str) {
        let body = line.strip_prefix('#').unwrap_or(line);
        let body = body.strip_prefix(' ').unwrap_or(body);

        if let Some(rest) = body.strip_prefix("newdoc") {
            if let Some(marker) = marker_value(rest) {
                self.newdoc = Some(marker);
                return;
            }
        }
        if let Some(rest) = body.strip_prefix("newpar") {
            if let Some(marker) = marker_value(rest) {
                self.newpar = Some(marker);
                return;
            }
        }
        if let Some(value) = keyed_value(body, "sent_id") {
            self.sent_id = Some(value);
        } else if let Some(rest) = body.strip_prefix("text_") {
            match rest.split_once('=') {
                Some((lang, text)) if !lang.trim().is_empty() => {
                    self.translations
                        .insert(lang.trim().to_string(), text.trim().to_string());
                }
                _ => self.comments.push(body.to_string()),
            }
        } else if let Some(value) = keyed_value(body, "text") {
            self.text = Some(value);
        } else if let Some(value) = keyed_value(body, "translit") {
            self.translit = Some(value);
        } else {
            self.comments.push(body.to_string());
        }
    }

    /// Comment lines in canonical order, without the trailing newline.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(newdoc) = &self.newdoc {
            lines.push(marker_line("newdoc", newdoc));
        }
        if let Some(newpar) = &self.newpar {
            lines.push(marker_line("newpar", newpar));
        }
        if let Some(sent_id) = &self.sent_id {
            lines.push(format!("# sent_id = {}", sent_id));
        }
        if let Some(text) = &self.text {
            lines.push(format!("# text = {}", text));
        }
        if let Some(translit) = &self.translit {
            lines.push(format!("# translit = {}", translit));
        }
        for (lang, text) in &self.translations {
            lines.push(format!("# text_{} = {}", lang, text));
        }
        for comment in &self.comments {
            lines.push(format!("# {}", comment));
        }
        lines
    }
}

fn marker_value(rest: &str) -> Option<String> {
    if rest.trim().is_empty() {
        return Some(String::new());
    }
    let rest = rest.trim_start();
    let rest = rest.strip_prefix("id")?.trim_start();
    let rest = rest.strip_prefix('=')?;
    Some(rest.trim().to_string())
}

fn marker_line(key: &str, value: &str) -> String {
    if value.is_empty() {
        format!("# {}", key)
    } else {
        format!("# {} id = {}", key, value)
    }
}

fn keyed_value(body: &str, key: &str) -> Option<String> {
    let rest = body.strip_prefix(key)?.trim_start();
    let rest = rest.strip_prefix('=')?;
    Some(rest.trim().to_string())
}

/// A surface segment of the reconstructed sentence text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan {
    /// Char offset of the segment in the sentence text.
    pub offset: usize,
    /// Length in chars, separator excluded.
    pub len: usize,
    pub first: u32,
    pub last: u32,
}

/// Head/children view of the basic tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeView {
    pub roots: Vec<u32>,
    /// Tokens whose head column is `_`.
    pub unattached: Vec<u32>,
    children: BTreeMap<u32, Vec<u32>>,
}

impl TreeView {
    pub fn children(&self, id: u32) -> &[u32] {
        self.children.get(&id).map(|c| c.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub(crate) tokens: Vector<Token>,
    pub(crate) empty_nodes: Vector<Token>,
    pub(crate) multiwords: Vector<Multiword>,
    pub meta: Metadata,
    pub(crate) schema: Arc<ColumnSchema>,
    pub(crate) modification: u64,
}

impl Sentence {
    pub fn new(schema: Arc<ColumnSchema>) -> Self {
        Self {
            tokens: Vector::new(),
            empty_nodes: Vector::new(),
            multiwords: Vector::new(),
            meta: Metadata::default(),
            schema,
            modification: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Monotonic counter bumped by every edit that changes the sentence.
    pub fn modification(&self) -> u64 {
        self.modification
    }

    pub fn set_modification(&mut self, value: u64) {
        self.modification = value;
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn schema_arc(&self) -> Arc<ColumnSchema> {
        Arc::clone(&self.schema)
    }

    pub fn sent_id(&self) -> Option<&str> {
        self.meta.sent_id.as_deref()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn token(&self, id: u32) -> Option<&Token> {
        if id == 0 {
            return None;
        }
        self.tokens.get(id as usize - 1)
    }

    pub fn get(&self, target: TokenRef) -> Option<&Token> {
        match target {
            TokenRef::Ordinary(id) => self.token(id),
            TokenRef::Enhanced(..) => self.empty_nodes.iter().find(|t| t.id == target),
        }
    }

    pub(crate) fn get_mut(&mut self, target: TokenRef) -> Option<&mut Token> {
        match target {
            TokenRef::Ordinary(0) => None,
            TokenRef::Ordinary(id) => self.tokens.get_mut(id as usize - 1),
            TokenRef::Enhanced(..) => self.empty_nodes.iter_mut().find(|t| t.id == target),
        }
    }

    pub fn contains(&self, target: TokenRef) -> bool {
        self.get(target).is_some()
    }

    pub fn empty_nodes(&self) -> impl Iterator<Item = &Token> {
        self.empty_nodes.iter()
    }

    pub fn empty_nodes_at(&self, anchor: u32) -> impl Iterator<Item = &Token> {
        self.empty_nodes
            .iter()
            .filter(move |t| t.id.anchor() == anchor)
    }

    pub fn multiwords(&self) -> impl Iterator<Item = &Multiword> {
        self.multiwords.iter()
    }

    pub fn multiword_at(&self, start: u32) -> Option<&Multiword> {
        self.multiwords.iter().find(|m| m.start == start)
    }

    pub fn multiword_covering(&self, id: u32) -> Option<&Multiword> {
        self.multiwords.iter().find(|m| m.covers(id))
    }

    /// Ordinary tokens and empty nodes in file order.
    pub fn all_tokens(&self) -> Vec<&Token> {
        let mut all: Vec<&Token> = self.empty_nodes_at(0).collect();
        for token in self.tokens.iter() {
            all.push(token);
            all.extend(self.empty_nodes_at(token.ordinary_id()));
        }
        all
    }

    /// The basic head of an ordinary token, unless it is the root or unset.
    pub fn head_of(&self, id: u32) -> Option<&Token> {
        match self.token(id)?.head {
            Some(head) if head > 0 => self.token(head),
            _ => None,
        }
    }

    pub fn tree(&self) -> TreeView {
        let mut view = TreeView::default();
        for token in self.tokens.iter() {
            let id = token.ordinary_id();
            match token.head {
                Some(0) => view.roots.push(id),
                Some(head) => view.children.entry(head).or_default().push(id),
                None => view.unattached.push(id),
            }
        }
        view
    }

    pub fn children(&self, id: u32) -> Vec<u32> {
        self.tokens
            .iter()
            .filter(|t| t.head == Some(id) && id > 0)
            .map(|t| t.ordinary_id())
            .collect()
    }

    /// True if `ancestor` is reached by walking heads up from `id`.
    pub fn is_ancestor(&self, ancestor: u32, id: u32) -> bool {
        let mut current = id;
        for _ in 0..self.len() {
            match self.token(current).and_then(|t| t.head) {
                Some(head) if head > 0 => {
                    if head == ancestor {
                        return true;
                    }
                    current = head;
                }
                _ => return false,
            }
        }
        false
    }

    /// Number of arcs between a token and the root, `None` on a cycle or a
    /// dangling head.
    pub fn depth(&self, id: u32) -> Option<usize> {
        let mut current = id;
        for depth in 0..=self.len() {
            match self.token(current)?.head {
                Some(0) => return Some(depth),
                Some(head) => current = head,
                None => return None,
            }
        }
        None
    }

    pub fn descendants(&self, id: u32) -> Vec<u32> {
        let tree = self.tree();
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<u32> = tree.children(id).iter().copied().collect();
        while let Some(next) = queue.pop_front() {
            if next == id || !seen.insert(next) {
                continue;
            }
            queue.extend(tree.children(next).iter().copied());
        }
        seen.into_iter().collect()
    }

    pub fn has_cycle(&self) -> bool {
        self.tokens.iter().any(|t| {
            let id = t.ordinary_id();
            let mut current = id;
            for _ in 0..=self.len() {
                match self.token(current).and_then(|t| t.head) {
                    Some(head) if head > 0 => {
                        if head == id {
                            return true;
                        }
                        current = head;
                    }
                    _ => return false,
                }
            }
            true
        })
    }

    /// Single root, every head set and in range, no cycle.
    pub fn is_tree(&self) -> bool {
        let len = self.len() as u32;
        let tree = self.tree();
        tree.roots.len() == 1
            && tree.unattached.is_empty()
            && self.tokens.iter().all(|t| t.head.is_some_and(|h| h <= len))
            && !self.has_cycle()
    }

    /// No arc crosses another. Only defined for trees.
    pub fn is_projective(&self) -> bool {
        if !self.is_tree() {
            return false;
        }
        self.tokens.iter().all(|t| {
            let dep = t.ordinary_id();
            let head = match t.head {
                Some(h) if h > 0 => h,
                _ => return true,
            };
            let (lo, hi) = (dep.min(head), dep.max(head));
            (lo + 1..hi).all(|k| self.is_ancestor(head, k))
        })
    }

    /// Heights for flat arc rendering: an arc is one level above the highest
    /// arc nested within its span. Keyed by dependent id.
    pub fn arc_heights(&self) -> BTreeMap<u32, u32> {
        let mut arcs: Vec<(u32, u32, u32)> = self
            .tokens
            .iter()
            .filter_map(|t| match t.head {
                Some(h) if h > 0 => {
                    let dep = t.ordinary_id();
                    Some((dep.min(h), dep.max(h), dep))
                }
                _ => None,
            })
            .collect();
        arcs.sort_by_key(|(lo, hi, dep)| (hi - lo, *lo, *dep));

        let mut heights: BTreeMap<u32, u32> = BTreeMap::new();
        let mut placed: Vec<(u32, u32, u32)> = Vec::new();
        for (lo, hi, dep) in arcs {
            let inner = placed
                .iter()
                .filter(|(l, h, _)| *l >= lo && *h <= hi && (*l, *h) != (lo, hi))
                .map(|(_, _, height)| *height)
                .max()
                .unwrap_or(0);
            heights.insert(dep, inner + 1);
            placed.push((lo, hi, inner + 1));
        }
        heights
    }

    /// Surface text rebuilt from forms, multiword forms and spacing markers.
    pub fn text(&self) -> String {
        self.text_with_spans().0
    }

    pub fn text_with_spans(&self) -> (String, Vec<TextSpan>) {
        let mut text = String::new();
        let mut offset = 0;
        let mut spans = Vec::new();
        let mut id = 1;
        while id as usize <= self.len() {
            let (form, separator, last) = match self.multiword_at(id) {
                Some(mw) => (mw.form.clone(), crate::token::spaces_after(&mw.misc), mw.end),
                None => match self.token(id) {
                    Some(token) => (token.form.clone(), token.spaces_after(), id),
                    None => break,
                },
            };
            let len = form.chars().count();
            spans.push(TextSpan {
                offset,
                len,
                first: id,
                last,
            });
            text.push_str(&form);
            text.push_str(&separator);
            offset += len + separator.chars().count();
            id = last + 1;
        }
        let trimmed = text.trim_end().len();
        text.truncate(trimmed);
        (text, spans)
    }

    /// All comment lines as shown in the file, one per line.
    pub fn comments_string(&self) -> String {
        self.meta
            .lines()
            .iter()
            .map(|l| l.trim_start_matches('#').trim_start().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub(crate) fn touch(&mut self) {
        self.modification += 1;
    }

    /// Bumps the counter and keeps an existing `# text` line in sync.
    pub(crate) fn touch_surface(&mut self) {
        if self.meta.text.is_some() {
            self.meta.text = Some(self.text());
        }
        self.touch();
    }

    /// Rewrites ordinary ids from positions.
    pub(crate) fn reindex(&mut self) {
        for (index, token) in self.tokens.iter_mut().enumerate() {
            token.id = TokenRef::Ordinary(index as u32 + 1);
        }
    }

    pub(crate) fn sort_empty_nodes(&mut self) {
        let mut nodes: Vec<Token> = self.empty_nodes.iter().cloned().collect();
        nodes.sort_by_key(|t| t.id);
        self.empty_nodes = nodes.into_iter().collect();
    }

    pub(crate) fn sort_multiwords(&mut self) {
        let mut spans: Vec<Multiword> = self.multiwords.iter().cloned().collect();
        spans.sort_by_key(|m| m.start);
        self.multiwords = spans.into_iter().collect();
    }
}
