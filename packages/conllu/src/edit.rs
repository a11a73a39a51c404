//! # Structural Editor
//!
//! Operations that change a sentence while keeping its numbering invariants.
//!
//! ## Guarantees
//!
//! 1. **Atomic**: every operation validates first and only then applies, so a
//!    rejected edit leaves the sentence exactly as it was
//! 2. **Dense ids**: ordinary ids stay `1..N` and empty-node sub ids stay
//!    `1..K` per anchor
//! 3. **Counted**: the modification counter moves only when something
//!    actually changed
//!
//! ## Renumbering
//!
//! Inserting or removing an ordinary token rewrites every reference at or
//! past that position: basic heads, enhanced heads, empty-node anchors and
//! multiword bounds. A span grows when a token is inserted inside it and
//! shrinks (or disappears) when one of its tokens is removed.

use crate::error::{EditError, EditResult};
use crate::sentence::Sentence;
use crate::token::{
    parse_deps, parse_feature_map, EnhancedDep, FeatureMap, Field, Multiword, Token, TokenRef,
    EMPTY,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SPACING_KEYS: [&str; 2] = ["SpaceAfter", "SpacesAfter"];

/// What happens to the children of a deleted token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrphanPolicy {
    /// Children move to the deleted token's head. Deleting the root promotes
    /// its first child.
    #[default]
    ReattachToHead,
    /// Children are left with an unset head.
    Orphan,
}

/// `newdoc`/`newpar` update: `true` sets a bare marker, `false` or `""`
/// removes it, any other string sets the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkerEdit {
    Flag(bool),
    Id(String),
}

impl MarkerEdit {
    fn resolve(&self) -> Option<String> {
        match self {
            MarkerEdit::Flag(true) => Some(String::new()),
            MarkerEdit::Flag(false) => None,
            MarkerEdit::Id(id) if id.trim().is_empty() => None,
            MarkerEdit::Id(id) => Some(id.trim().to_string()),
        }
    }
}

/// Metadata update. Absent fields are left alone, empty strings clear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataEdit {
    pub sent_id: Option<String>,
    pub newdoc: Option<MarkerEdit>,
    pub newpar: Option<MarkerEdit>,
    pub text: Option<String>,
    pub translit: Option<String>,
    /// One `lang: text` per line. Replaces every translation.
    pub translations: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn shift_ref(target: TokenRef, f: impl Fn(u32) -> u32) -> TokenRef {
    match target {
        TokenRef::Ordinary(id) => TokenRef::Ordinary(f(id)),
        TokenRef::Enhanced(anchor, sub) => TokenRef::Enhanced(f(anchor), sub),
    }
}

fn move_spacing(from: &mut FeatureMap, to: &mut FeatureMap) {
    for key in SPACING_KEYS {
        to.shift_remove(key);
        if let Some(value) = from.shift_remove(key) {
            to.insert(key.to_string(), value);
        }
    }
}

fn split_chars(value: &str, at: usize) -> (String, String) {
    let head: String = value.chars().take(at).collect();
    let tail: String = value.chars().skip(at).collect();
    (head, tail)
}

fn concat_values(left: &str, right: &str) -> String {
    match (left, right) {
        (EMPTY, EMPTY) => EMPTY.to_string(),
        (EMPTY, r) => r.to_string(),
        (l, EMPTY) => l.to_string(),
        (l, r) => format!("{}{}", l, r),
    }
}

impl Sentence {
    /// Reads a column, resolving extra columns through the schema.
    pub fn value(&self, token: &Token, field: &Field) -> String {
        match field {
            Field::Extra(name) => self
                .schema
                .extra_index(name)
                .and_then(|i| token.extra.get(i).cloned())
                .unwrap_or_else(|| EMPTY.to_string()),
            other => token.field(other),
        }
    }

    fn ordinary(&self, id: u32) -> EditResult<&Token> {
        self.token(id).ok_or_else(|| EditError::invalid_id(id))
    }

    fn blank_token(&self, id: TokenRef, form: &str) -> Token {
        let mut token = Token::new(id, form);
        token.extra = vec![EMPTY.to_string(); self.schema.extra_count()];
        token
    }

    /// Rewrites every basic and enhanced head. Enhanced edges mapped to
    /// `None` are dropped, basic heads mapped to `None` become unset.
    pub(crate) fn remap_heads(&mut self, map: impl Fn(TokenRef) -> Option<TokenRef>) {
        let apply = |token: &mut Token| {
            if let Some(head) = token.head.filter(|h| *h > 0) {
                token.head = map(TokenRef::Ordinary(head)).and_then(|r| r.ordinary());
            }
            token.deps = token
                .deps
                .iter()
                .filter_map(|dep| {
                    let head = if dep.head == TokenRef::Ordinary(0) {
                        Some(dep.head)
                    } else {
                        map(dep.head)
                    };
                    head.map(|h| EnhancedDep::new(h, dep.label.clone()))
                })
                .collect();
        };
        self.tokens.iter_mut().for_each(&apply);
        self.empty_nodes.iter_mut().for_each(&apply);
    }

    /// Inserts an ordinary token at position `pos`. The token's own
    /// references must already use the shifted numbering.
    fn insert_at(&mut self, pos: u32, token: Token) {
        let shift = move |x: u32| if x >= pos { x + 1 } else { x };
        self.remap_heads(|r| Some(shift_ref(r, shift)));
        for node in self.empty_nodes.iter_mut() {
            node.id = shift_ref(node.id, shift);
        }
        for span in self.multiwords.iter_mut() {
            span.start = shift(span.start);
            span.end = shift(span.end);
        }
        self.tokens.insert(pos as usize - 1, token);
        self.reindex();
    }

    /// Removes ordinary token `id`. References to it must have been
    /// rewritten by the caller; leftover basic heads become unset.
    fn remove_at(&mut self, id: u32) {
        let base = self.empty_nodes_at(id - 1).count() as u32;
        let lower = move |x: u32| if x > id { x - 1 } else { x };
        let remap = move |r: TokenRef| match r {
            TokenRef::Ordinary(h) if h == id => None,
            TokenRef::Enhanced(a, s) if a == id => Some(TokenRef::Enhanced(id - 1, s + base)),
            other => Some(shift_ref(other, lower)),
        };
        self.remap_heads(remap);
        for node in self.empty_nodes.iter_mut() {
            if let Some(moved) = remap(node.id) {
                node.id = moved;
            }
        }
        for span in self.multiwords.iter_mut() {
            if span.covers(id) {
                span.end -= 1;
            } else if span.start > id {
                span.start -= 1;
                span.end -= 1;
            }
        }
        self.multiwords = self
            .multiwords
            .iter()
            .filter(|span| span.end > span.start)
            .cloned()
            .collect();
        self.tokens.remove(id as usize - 1);
        self.reindex();
        self.sort_empty_nodes();
    }

    /// Sets a single column. Returns whether the value changed.
    pub fn set_field(&mut self, target: TokenRef, field: &Field, value: &str) -> EditResult<bool> {
        if value.is_empty() {
            return Err(EditError::EmptyValue(field.to_string()));
        }
        let extra_index = match field {
            Field::Extra(name) => Some(
                self.schema
                    .extra_index(name)
                    .ok_or_else(|| EditError::InvalidExtraColumn(name.clone()))?,
            ),
            _ => None,
        };
        let deps = match field {
            Field::Deps => Some(parse_deps(value).map_err(EditError::InvalidEnhancedDep)?),
            _ => None,
        };
        let extra_count = self.schema.extra_count();
        let token = self
            .get_mut(target)
            .ok_or_else(|| EditError::invalid_id(target))?;
        let before = token.clone();
        match field {
            Field::Form => token.form = value.to_string(),
            Field::Lemma => token.lemma = value.to_string(),
            Field::Upos => token.upos = value.to_string(),
            Field::Xpos => token.xpos = value.to_string(),
            Field::Deprel => token.deprel = value.to_string(),
            Field::Feats => token.feats = parse_feature_map(value),
            Field::Misc => token.misc = parse_feature_map(value),
            Field::Deps => token.deps = deps.unwrap_or_default(),
            Field::Extra(_) => {
                if token.extra.len() < extra_count {
                    token.extra.resize(extra_count, EMPTY.to_string());
                }
                if let Some(i) = extra_index {
                    token.extra[i] = value.to_string();
                }
            }
        }
        if *token == before {
            return Ok(false);
        }
        debug!(token = %target, field = %field, "set field");
        match field {
            Field::Form | Field::Misc => self.touch_surface(),
            _ => self.touch(),
        }
        Ok(true)
    }

    pub fn set_pos(&mut self, target: TokenRef, upos: &str, xpos: &str) -> EditResult<bool> {
        if upos.is_empty() || xpos.is_empty() {
            return Err(EditError::EmptyValue("POS".to_string()));
        }
        let token = self
            .get_mut(target)
            .ok_or_else(|| EditError::invalid_id(target))?;
        if token.upos == upos && token.xpos == xpos {
            return Ok(false);
        }
        token.upos = upos.to_string();
        token.xpos = xpos.to_string();
        self.touch();
        Ok(true)
    }

    /// Inserts or replaces one feature. `Key=` removes the key.
    pub fn add_feature(&mut self, target: TokenRef, pair: &str) -> EditResult<bool> {
        self.update_map(target, pair, false)
    }

    /// Inserts or replaces one misc entry. `Key=` removes the key.
    pub fn add_misc(&mut self, target: TokenRef, pair: &str) -> EditResult<bool> {
        self.update_map(target, pair, true)
    }

    fn update_map(&mut self, target: TokenRef, pair: &str, misc: bool) -> EditResult<bool> {
        let (key, value) = pair
            .split_once('=')
            .filter(|(k, _)| !k.trim().is_empty())
            .ok_or_else(|| EditError::InvalidFeature(pair.to_string()))?;
        let token = self
            .get_mut(target)
            .ok_or_else(|| EditError::invalid_id(target))?;
        let map = if misc { &mut token.misc } else { &mut token.feats };
        let before = map.clone();
        if value.is_empty() {
            map.shift_remove(key);
        } else {
            map.insert(key.to_string(), Some(value.to_string()));
        }
        if *map == before {
            return Ok(false);
        }
        if misc {
            self.touch_surface();
        } else {
            self.touch();
        }
        Ok(true)
    }

    /// Duplicates token `id` right after itself. With an offset strictly
    /// inside the form, the form (and the lemma when long enough) is cut
    /// there and the halves are glued with `SpaceAfter=No`.
    pub fn split_token(&mut self, id: u32, offset: Option<usize>) -> EditResult<()> {
        let original = self.ordinary(id)?.clone();
        let pos = id + 1;
        let mut first = original.clone();
        let mut copy = original;
        copy.deps.clear();
        copy.highlight = Default::default();
        copy.head = copy.head.map(|h| if h >= pos { h + 1 } else { h });

        if let Some(at) = offset.filter(|at| *at > 0 && *at < first.form.chars().count()) {
            let (left, right) = split_chars(&first.form, at);
            first.form = left;
            copy.form = right;
            if at < first.lemma.chars().count() {
                let (left, right) = split_chars(&first.lemma, at);
                first.lemma = left;
                copy.lemma = right;
            }
            for key in SPACING_KEYS {
                first.misc.shift_remove(key);
            }
            first.misc.insert("SpaceAfter".to_string(), Some("No".to_string()));
        }

        if let Some(slot) = self.tokens.get_mut(id as usize - 1) {
            *slot = first;
        }
        self.insert_at(pos, copy);
        debug!(id, ?offset, "split token");
        self.touch_surface();
        Ok(())
    }

    /// Merges token `id + 1` into token `id`. The token nearer the root
    /// survives and adopts the other's children.
    pub fn join_token(&mut self, id: u32) -> EditResult<()> {
        let len = self.len() as u32;
        if id == len {
            return Err(EditError::JoinLast);
        }
        let left = self.ordinary(id)?.clone();
        let right = self.ordinary(id + 1)?.clone();

        let depth = |t: u32| self.depth(t).unwrap_or(usize::MAX);
        let (kept, removed) = if depth(id + 1) < depth(id) {
            (id + 1, id)
        } else {
            (id, id + 1)
        };
        let removed_head = if removed == id { left.head } else { right.head };

        let mut merged = if kept == id { left.clone() } else { right.clone() };
        merged.form = format!("{}{}", left.form, right.form);
        merged.lemma = concat_values(&left.lemma, &right.lemma);
        let mut right_misc = right.misc.clone();
        move_spacing(&mut right_misc, &mut merged.misc);
        if merged.head == Some(removed) {
            merged.head = removed_head.filter(|h| *h != kept);
        }
        merged.deps.retain(|d| d.head != TokenRef::Ordinary(removed));
        if let Some(slot) = self.tokens.get_mut(kept as usize - 1) {
            *slot = merged;
        }

        for token in self.tokens.iter_mut() {
            if token.head == Some(removed) && token.id != TokenRef::Ordinary(kept) {
                token.head = Some(kept);
            }
        }
        self.remap_heads(|r| match r {
            TokenRef::Ordinary(h) if h == removed => Some(TokenRef::Ordinary(kept)),
            other => Some(other),
        });
        // one label per (dependent, head) pair
        let dedup = |token: &mut Token| {
            let mut seen = Vec::new();
            token.deps.retain(|dep| {
                let fresh = !seen.contains(&dep.head);
                seen.push(dep.head);
                fresh
            });
        };
        self.tokens.iter_mut().for_each(&dedup);
        self.empty_nodes.iter_mut().for_each(&dedup);
        self.remove_at(removed);
        debug!(id, kept, "joined tokens");
        self.touch_surface();
        Ok(())
    }

    pub fn delete_token(&mut self, id: u32, policy: OrphanPolicy) -> EditResult<()> {
        let deleted = self.ordinary(id)?.clone();
        if self.len() == 1 {
            return Err(EditError::DeleteLast);
        }
        let children = self.children(id);
        let mut promoted = None;
        match (policy, deleted.head) {
            (OrphanPolicy::ReattachToHead, Some(0)) => {
                if let Some((&first, rest)) = children.split_first() {
                    promoted = Some(first);
                    if let Some(token) = self.tokens.get_mut(first as usize - 1) {
                        token.head = Some(0);
                        token.deprel = "root".to_string();
                    }
                    for child in rest {
                        if let Some(token) = self.tokens.get_mut(*child as usize - 1) {
                            token.head = Some(first);
                        }
                    }
                }
            }
            (OrphanPolicy::ReattachToHead, head) => {
                for child in &children {
                    if let Some(token) = self.tokens.get_mut(*child as usize - 1) {
                        token.head = head;
                    }
                }
            }
            (OrphanPolicy::Orphan, _) => {
                for child in &children {
                    if let Some(token) = self.tokens.get_mut(*child as usize - 1) {
                        token.head = None;
                    }
                }
            }
        }
        self.remove_at(id);
        debug!(id, ?policy, ?promoted, "deleted token");
        self.touch_surface();
        Ok(())
    }

    /// Wraps tokens `id..id+length-1` into a multiword span.
    pub fn compose_multiword(&mut self, id: u32, length: u32, form: Option<&str>) -> EditResult<()> {
        if length < 2 {
            return Err(EditError::ComposeTooShort);
        }
        self.ordinary(id)?;
        let end = match id.checked_add(length - 1) {
            Some(end) if end as usize <= self.len() => end,
            _ => return Err(EditError::ComposeTooLong),
        };
        if let Some(span) = self.multiwords().find(|m| m.overlaps(id, end)) {
            return Err(EditError::AlreadyInMultiword(span.start.max(id)));
        }

        let form = match form.filter(|f| !f.is_empty()) {
            Some(form) => form.to_string(),
            None => (id..=end)
                .filter_map(|i| self.token(i))
                .map(|t| t.form.as_str())
                .collect(),
        };
        let mut span = Multiword::new(id, end, form);
        if let Some(last) = self.tokens.get_mut(end as usize - 1) {
            move_spacing(&mut last.misc, &mut span.misc);
        }
        self.multiwords.push_back(span);
        self.sort_multiwords();
        self.touch_surface();
        Ok(())
    }

    /// Turns token `id` into the first word of a new span. Following words
    /// are created from `forms[1..]` and attached to it as `fixed`.
    pub fn token_to_multiword(&mut self, id: u32, forms: &[String]) -> EditResult<()> {
        if forms.len() < 2 {
            return Err(EditError::TooFewForms);
        }
        let token = self.ordinary(id)?.clone();
        if self.multiword_covering(id).is_some() {
            return Err(EditError::AlreadyInMultiword(id));
        }

        let end = id + forms.len() as u32 - 1;
        let mut span = Multiword::new(id, end, token.form.clone());
        if let Some(first) = self.tokens.get_mut(id as usize - 1) {
            first.form = forms[0].clone();
            move_spacing(&mut first.misc, &mut span.misc);
        }
        for (offset, form) in forms.iter().enumerate().skip(1) {
            let pos = id + offset as u32;
            let mut word = self.blank_token(TokenRef::Ordinary(pos), form);
            word.head = Some(id);
            word.deprel = "fixed".to_string();
            self.insert_at(pos, word);
        }
        self.multiwords.push_back(span);
        self.sort_multiwords();
        self.touch_surface();
        Ok(())
    }

    /// Edits the span starting at `start`. An `end` of 0 deletes it.
    pub fn edit_multiword_span(
        &mut self,
        start: u32,
        end: u32,
        form: &str,
        space_after: Option<bool>,
        misc: Option<&str>,
    ) -> EditResult<bool> {
        let index = self
            .multiwords
            .iter()
            .position(|m| m.start == start)
            .ok_or(EditError::NoMultiword(start))?;
        if end == 0 {
            self.multiwords.remove(index);
            self.touch_surface();
            return Ok(true);
        }
        if end <= start || end as usize > self.len() {
            return Err(EditError::invalid_id(end));
        }
        if let Some(other) = self
            .multiwords
            .iter()
            .find(|m| m.start != start && m.overlaps(start, end))
        {
            return Err(EditError::AlreadyInMultiword(other.start));
        }
        if form.is_empty() {
            return Err(EditError::EmptyValue("FORM".to_string()));
        }

        let mut span = self.multiwords[index].clone();
        let before = span.clone();
        span.end = end;
        span.form = form.to_string();
        if let Some(misc) = misc {
            span.misc = parse_feature_map(misc);
        }
        match space_after {
            Some(false) => {
                span.misc.insert("SpaceAfter".to_string(), Some("No".to_string()));
            }
            Some(true) => {
                span.misc.shift_remove("SpaceAfter");
            }
            None => {}
        }
        if span == before {
            return Ok(false);
        }
        self.multiwords.set(index, span);
        self.touch_surface();
        Ok(true)
    }

    /// Appends an empty node after `anchor` with the next free sub id.
    pub fn insert_empty_node(
        &mut self,
        anchor: u32,
        form: &str,
        lemma: Option<&str>,
        upos: Option<&str>,
        xpos: Option<&str>,
    ) -> EditResult<TokenRef> {
        if anchor as usize > self.len() {
            return Err(EditError::invalid_id(anchor));
        }
        let sub = self.empty_nodes_at(anchor).count() as u32 + 1;
        let id = TokenRef::Enhanced(anchor, sub);
        let mut node = self.blank_token(id, form);
        node.lemma = lemma.unwrap_or(EMPTY).to_string();
        node.upos = upos.unwrap_or(EMPTY).to_string();
        node.xpos = xpos.unwrap_or(EMPTY).to_string();
        self.empty_nodes.push_back(node);
        self.sort_empty_nodes();
        self.touch();
        Ok(id)
    }

    pub fn delete_empty_node(&mut self, anchor: u32, sub: u32) -> EditResult<()> {
        let target = TokenRef::Enhanced(anchor, sub);
        let index = self
            .empty_nodes
            .iter()
            .position(|t| t.id == target)
            .ok_or_else(|| EditError::invalid_id(target))?;
        self.empty_nodes.remove(index);

        let renumber = move |r: TokenRef| match r {
            TokenRef::Enhanced(a, s) if a == anchor && s == sub => None,
            TokenRef::Enhanced(a, s) if a == anchor && s > sub => Some(TokenRef::Enhanced(a, s - 1)),
            other => Some(other),
        };
        for node in self.empty_nodes.iter_mut() {
            if let Some(moved) = renumber(node.id) {
                node.id = moved;
            }
        }
        self.remap_heads(renumber);
        self.touch();
        Ok(())
    }

    /// Inserts a new unattached token after `id` (0 inserts at the start).
    pub fn insert_token(
        &mut self,
        id: u32,
        form: &str,
        lemma: Option<&str>,
        upos: Option<&str>,
        xpos: Option<&str>,
    ) -> EditResult<u32> {
        if id as usize > self.len() {
            return Err(EditError::invalid_id(id));
        }
        if form.is_empty() {
            return Err(EditError::EmptyValue("FORM".to_string()));
        }
        let pos = id + 1;
        let mut token = self.blank_token(TokenRef::Ordinary(pos), form);
        token.lemma = lemma.unwrap_or(EMPTY).to_string();
        token.upos = upos.unwrap_or(EMPTY).to_string();
        token.xpos = xpos.unwrap_or(EMPTY).to_string();
        self.insert_at(pos, token);
        self.touch_surface();
        Ok(pos)
    }

    /// Changes the basic head of `dep`. Returns whether anything changed.
    pub fn reattach(
        &mut self,
        dep: TokenRef,
        new_head: TokenRef,
        label: Option<&str>,
    ) -> EditResult<bool> {
        let (dep, head) = match (dep, new_head) {
            (TokenRef::Ordinary(d), TokenRef::Ordinary(h)) => (d, h),
            _ => return Err(EditError::EmptyNodeInBasic),
        };
        let current = self.ordinary(dep)?.clone();
        if head as usize > self.len() {
            return Err(EditError::invalid_id(head));
        }
        if head == dep {
            return Err(EditError::SelfHead);
        }
        if head > 0 && self.is_ancestor(dep, head) {
            return Err(EditError::Cycle { head, dep });
        }
        let label = label.filter(|l| !l.is_empty());
        if current.head == Some(head) {
            return match label {
                None => Ok(false),
                Some(l) if l == current.deprel => Ok(false),
                Some(l) => {
                    self.set_deprel(dep, l);
                    Ok(true)
                }
            };
        }

        if let Some(token) = self.tokens.get_mut(dep as usize - 1) {
            token.head = Some(head);
            match label {
                Some(l) => token.deprel = l.to_string(),
                None if head == 0 => token.deprel = "root".to_string(),
                None => {}
            }
        }
        debug!(dep, head, "reattached");
        self.touch();
        Ok(true)
    }

    fn set_deprel(&mut self, id: u32, label: &str) {
        if let Some(token) = self.tokens.get_mut(id as usize - 1) {
            token.deprel = label.to_string();
        }
        self.touch();
    }

    /// Adds an enhanced edge, replacing any label for the same head.
    pub fn add_enhanced_edge(
        &mut self,
        dep: TokenRef,
        head: TokenRef,
        label: &str,
    ) -> EditResult<bool> {
        if label.is_empty() {
            return Err(EditError::EmptyValue("DEPS".to_string()));
        }
        if head != TokenRef::Ordinary(0) && !self.contains(head) {
            return Err(EditError::invalid_id(head));
        }
        if dep == head {
            return Err(EditError::SelfHead);
        }
        let token = self
            .get_mut(dep)
            .ok_or_else(|| EditError::invalid_id(dep))?;
        if token.enhanced_label(head) == Some(label) {
            return Ok(false);
        }
        token.deps.retain(|d| d.head != head);
        token.deps.push(EnhancedDep::new(head, label));
        token.deps.sort_by_key(|d| d.head);
        self.touch();
        Ok(true)
    }

    pub fn remove_enhanced_edge(&mut self, dep: TokenRef, head: TokenRef) -> EditResult<()> {
        let token = self
            .get_mut(dep)
            .ok_or_else(|| EditError::invalid_id(dep))?;
        let before = token.deps.len();
        token.deps.retain(|d| d.head != head);
        if token.deps.len() == before {
            return Err(EditError::NoEnhancedEdge);
        }
        self.touch();
        Ok(())
    }

    pub fn edit_metadata(&mut self, edit: &MetadataEdit) -> EditResult<bool> {
        let translations = match &edit.translations {
            Some(block) => {
                let mut parsed = IndexMap::new();
                for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    match line.split_once(':') {
                        Some((lang, text))
                            if !lang.trim().is_empty()
                                && !lang.trim().contains(char::is_whitespace) =>
                        {
                            parsed.insert(lang.trim().to_string(), text.trim().to_string());
                        }
                        _ => return Err(EditError::InvalidTranslation(line.to_string())),
                    }
                }
                Some(parsed)
            }
            None => None,
        };

        let before = self.meta.clone();
        if let Some(sent_id) = &edit.sent_id {
            self.meta.sent_id = non_empty(sent_id);
        }
        if let Some(newdoc) = &edit.newdoc {
            self.meta.newdoc = newdoc.resolve();
        }
        if let Some(newpar) = &edit.newpar {
            self.meta.newpar = newpar.resolve();
        }
        if let Some(text) = &edit.text {
            self.meta.text = non_empty(text);
        }
        if let Some(translit) = &edit.translit {
            self.meta.translit = non_empty(translit);
        }
        if let Some(translations) = translations {
            self.meta.translations = translations;
        }
        if self.meta == before {
            return Ok(false);
        }
        self.touch();
        Ok(true)
    }

    /// Replaces the free comments, one per line.
    pub fn set_comments(&mut self, text: &str) -> bool {
        let comments: Vec<String> = text
            .lines()
            .map(|l| {
                let l = l.strip_prefix('#').unwrap_or(l);
                l.strip_prefix(' ').unwrap_or(l).trim_end().to_string()
            })
            .filter(|l| !l.is_empty())
            .collect();
        if comments == self.meta.comments {
            return false;
        }
        self.meta.comments = comments;
        self.touch();
        true
    }

    pub fn mark_token(&mut self, target: TokenRef, on: bool) -> EditResult<()> {
        let token = self
            .get_mut(target)
            .ok_or_else(|| EditError::invalid_id(target))?;
        token.highlight.token = on;
        Ok(())
    }

    pub fn mark_deprel(&mut self, target: TokenRef, on: bool) -> EditResult<()> {
        let token = self
            .get_mut(target)
            .ok_or_else(|| EditError::invalid_id(target))?;
        token.highlight.deprel = on;
        Ok(())
    }

    pub fn clear_highlights(&mut self) {
        for token in self.tokens.iter_mut().chain(self.empty_nodes.iter_mut()) {
            token.highlight = Default::default();
        }
    }

    pub fn highlighted(&self) -> Vec<TokenRef> {
        self.all_tokens()
            .into_iter()
            .filter(|t| t.highlight.any())
            .map(|t| t.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parse_sentence;
    use crate::writer::sentence_to_string;
    use pretty_assertions::assert_eq;

    fn sample() -> Sentence {
        parse_sentence(
            "# text = Il mange du pain.\n\
             1\tIl\til\tPRON\t_\t_\t2\tnsubj\t2:nsubj\t_\n\
             2\tmange\tmanger\tVERB\t_\t_\t0\troot\t0:root\t_\n\
             3-4\tdu\t_\t_\t_\t_\t_\t_\t_\t_\n\
             3\tde\tde\tADP\t_\t_\t5\tcase\t5:case\t_\n\
             4\tle\tle\tDET\t_\t_\t5\tdet\t5:det\t_\n\
             5\tpain\tpain\tNOUN\t_\t_\t2\tobj\t2:obj\tSpaceAfter=No\n\
             5.1\tmange\tmanger\tVERB\t_\t_\t_\t_\t2:conj\t_\n\
             6\t.\t.\tPUNCT\t_\t_\t2\tpunct\t2:punct\t_\n",
        )
        .unwrap()
    }

    fn assert_dense(sentence: &Sentence) {
        for (index, token) in sentence.tokens().enumerate() {
            assert_eq!(token.id, TokenRef::Ordinary(index as u32 + 1));
        }
    }

    #[test]
    fn test_set_field_same_value_keeps_counter() {
        let mut sentence = sample();
        assert!(!sentence.set_field(TokenRef::Ordinary(1), &Field::Upos, "PRON").unwrap());
        assert_eq!(sentence.modification(), 0);
        assert!(sentence.set_field(TokenRef::Ordinary(1), &Field::Upos, "X").unwrap());
        assert_eq!(sentence.modification(), 1);
    }

    #[test]
    fn test_set_field_rejects_bad_deps() {
        let mut sentence = sample();
        let before = sentence.clone();
        let err = sentence
            .set_field(TokenRef::Ordinary(1), &Field::Deps, "2nsubj")
            .unwrap_err();
        assert_eq!(err, EditError::InvalidEnhancedDep("2nsubj".into()));
        assert_eq!(sentence, before);
    }

    #[test]
    fn test_unknown_extra_column() {
        let mut sentence = sample();
        let err = sentence
            .set_field(TokenRef::Ordinary(1), &Field::Extra("MWE".into()), "x")
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid extracolumn for this sentence: MWE");
    }

    #[test]
    fn test_split_token_at_offset() {
        let mut sentence = sample();
        sentence.split_token(2, Some(3)).unwrap();
        assert_dense(&sentence);
        assert_eq!(sentence.token(2).unwrap().form, "man");
        assert_eq!(sentence.token(3).unwrap().form, "ge");
        assert_eq!(sentence.token(3).unwrap().lemma, "ger");
        assert!(sentence.token(3).unwrap().deps.is_empty());
        // heads past the insertion point shift
        assert_eq!(sentence.token(6).unwrap().head, Some(2));
        assert_eq!(sentence.token(4).unwrap().head, Some(6));
        assert_eq!(sentence.multiword_at(4).map(|m| m.end), Some(5));
        assert!(sentence.get(TokenRef::Enhanced(6, 1)).is_some());
        assert_eq!(sentence.meta.text.as_deref(), Some("Il mange du pain."));
    }

    #[test]
    fn test_join_keeps_token_nearer_root() {
        let mut sentence = sample();
        sentence.join_token(1).unwrap();
        assert_dense(&sentence);
        let joined = sentence.token(1).unwrap();
        assert_eq!(joined.form, "Ilmange");
        assert_eq!(joined.lemma, "ilmanger");
        assert_eq!(joined.head, Some(0));
        assert_eq!(sentence.token(4).unwrap().head, Some(1));
        assert_eq!(sentence.len(), 5);
    }

    #[test]
    fn test_join_merges_enhanced_edges_to_both_tokens() {
        let mut sentence = parse_sentence(
            "1\ta\ta\tX\t_\t_\t2\tdep\t2:dep\t_\n\
             2\tb\tb\tX\t_\t_\t0\troot\t0:root\t_\n\
             3\tc\tc\tX\t_\t_\t2\tobj\t1:foo|2:obj\t_\n",
        )
        .unwrap();
        sentence.join_token(1).unwrap();
        let deps = &sentence.token(2).unwrap().deps;
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].head, TokenRef::Ordinary(1));
    }

    #[test]
    fn test_join_last_word_rejected() {
        let mut sentence = sample();
        assert_eq!(sentence.join_token(6), Err(EditError::JoinLast));
    }

    #[test]
    fn test_delete_reattaches_children() {
        let mut sentence = sample();
        sentence.delete_token(5, OrphanPolicy::ReattachToHead).unwrap();
        assert_dense(&sentence);
        assert_eq!(sentence.token(3).unwrap().head, Some(2));
        assert_eq!(sentence.token(4).unwrap().head, Some(2));
        // enhanced edges to the deleted token are dropped
        assert!(sentence.token(3).unwrap().deps.is_empty());
        // empty node 5.1 moves to the previous token
        assert!(sentence.get(TokenRef::Enhanced(4, 1)).is_some());
        assert!(sentence.is_tree());
    }

    #[test]
    fn test_delete_root_promotes_first_child() {
        let mut sentence = sample();
        sentence.delete_token(2, OrphanPolicy::ReattachToHead).unwrap();
        assert_eq!(sentence.token(1).unwrap().head, Some(0));
        assert_eq!(sentence.token(1).unwrap().deprel, "root");
        assert_eq!(sentence.token(4).unwrap().head, Some(1));
        assert!(sentence.is_tree());
    }

    #[test]
    fn test_delete_shrinks_multiword() {
        let mut sentence = sample();
        sentence.delete_token(3, OrphanPolicy::Orphan).unwrap();
        assert_eq!(sentence.multiwords().count(), 0);
    }

    #[test]
    fn test_delete_last_word_rejected() {
        let mut sentence = parse_sentence("1\ta\t_\tX\t_\t_\t0\troot\t_\t_\n").unwrap();
        assert_eq!(
            sentence.delete_token(1, OrphanPolicy::default()),
            Err(EditError::DeleteLast)
        );
    }

    #[test]
    fn test_compose_multiword() {
        let mut sentence = sample();
        assert_eq!(
            sentence.compose_multiword(5, 3, None),
            Err(EditError::ComposeTooLong)
        );
        assert_eq!(
            sentence.compose_multiword(4, 2, None),
            Err(EditError::AlreadyInMultiword(4))
        );
        assert_eq!(
            sentence.compose_multiword(1, u32::MAX, None),
            Err(EditError::ComposeTooLong)
        );
        sentence.compose_multiword(5, 2, None).unwrap();
        let span = sentence.multiword_at(5).unwrap();
        assert_eq!(span.form, "pain.");
        assert!(sentence.token(6).unwrap().misc.is_empty());
    }

    #[test]
    fn test_token_to_multiword() {
        let mut sentence = sample();
        sentence
            .token_to_multiword(1, &["I".to_string(), "l".to_string()])
            .unwrap();
        assert_dense(&sentence);
        assert_eq!(sentence.multiword_at(1).map(|m| m.end), Some(2));
        assert_eq!(sentence.token(2).unwrap().deprel, "fixed");
        assert_eq!(sentence.token(2).unwrap().head, Some(1));
        assert_eq!(sentence.token(1).unwrap().head, Some(3));
        assert_eq!(sentence.multiword_at(4).map(|m| m.end), Some(5));
    }

    #[test]
    fn test_edit_multiword_span() {
        let mut sentence = sample();
        assert!(sentence
            .edit_multiword_span(3, 4, "du", Some(false), None)
            .unwrap());
        assert_eq!(sentence.text(), "Il mange dupain.");
        sentence.edit_multiword_span(3, 0, "", None, None).unwrap();
        assert_eq!(sentence.multiwords().count(), 0);
        assert_eq!(
            sentence.edit_multiword_span(3, 4, "du", None, None),
            Err(EditError::NoMultiword(3))
        );
    }

    #[test]
    fn test_empty_node_lifecycle() {
        let mut sentence = sample();
        let id = sentence
            .insert_empty_node(5, "x", None, Some("VERB"), None)
            .unwrap();
        assert_eq!(id, TokenRef::Enhanced(5, 2));
        sentence
            .add_enhanced_edge(TokenRef::Ordinary(6), TokenRef::Enhanced(5, 2), "dep")
            .unwrap();
        sentence.delete_empty_node(5, 1).unwrap();
        assert!(sentence.get(TokenRef::Enhanced(5, 2)).is_none());
        assert_eq!(
            sentence.token(6).unwrap().enhanced_label(TokenRef::Enhanced(5, 1)),
            Some("dep")
        );
    }

    #[test]
    fn test_insert_token_inside_multiword_extends_it() {
        let mut sentence = sample();
        let id = sentence.insert_token(3, "x", None, None, None).unwrap();
        assert_eq!(id, 4);
        assert_dense(&sentence);
        assert_eq!(sentence.multiword_at(3).map(|m| m.end), Some(5));
        assert_eq!(sentence.token(4).unwrap().head, None);
        assert_eq!(sentence.token(6).unwrap().head, Some(2));
    }

    #[test]
    fn test_reattach_rejections() {
        let mut sentence = sample();
        let before = sentence.clone();
        assert_eq!(
            sentence.reattach(TokenRef::Ordinary(2), TokenRef::Ordinary(5), None),
            Err(EditError::Cycle { head: 5, dep: 2 })
        );
        assert_eq!(
            sentence
                .reattach(TokenRef::Ordinary(2), TokenRef::Ordinary(5), None)
                .unwrap_err()
                .to_string(),
            "cannot make 5 head of 2"
        );
        assert_eq!(
            sentence.reattach(TokenRef::Ordinary(3), TokenRef::Ordinary(3), None),
            Err(EditError::SelfHead)
        );
        assert_eq!(
            sentence.reattach(TokenRef::Ordinary(3), TokenRef::Ordinary(5), Some("case")),
            Ok(false)
        );
        assert_eq!(
            sentence.reattach(TokenRef::Enhanced(5, 1), TokenRef::Ordinary(2), None),
            Err(EditError::EmptyNodeInBasic)
        );
        assert_eq!(sentence, before);
        assert!(!sentence
            .reattach(TokenRef::Ordinary(3), TokenRef::Ordinary(5), None)
            .unwrap());
    }

    #[test]
    fn test_reattach_moves_head() {
        let mut sentence = sample();
        assert!(sentence
            .reattach(TokenRef::Ordinary(6), TokenRef::Ordinary(5), Some("punct"))
            .unwrap());
        assert_eq!(sentence.token(6).unwrap().head, Some(5));
        assert_eq!(sentence.modification(), 1);
    }

    #[test]
    fn test_enhanced_edges() {
        let mut sentence = sample();
        sentence
            .add_enhanced_edge(TokenRef::Ordinary(1), TokenRef::Ordinary(2), "nsubj:pass")
            .unwrap();
        assert_eq!(sentence.token(1).unwrap().deps_string(), "2:nsubj:pass");
        assert_eq!(
            sentence.remove_enhanced_edge(TokenRef::Ordinary(1), TokenRef::Ordinary(5)),
            Err(EditError::NoEnhancedEdge)
        );
        sentence
            .remove_enhanced_edge(TokenRef::Ordinary(1), TokenRef::Ordinary(2))
            .unwrap();
        assert_eq!(sentence.token(1).unwrap().deps_string(), "_");
    }

    #[test]
    fn test_edit_metadata() {
        let mut sentence = sample();
        let edit = MetadataEdit {
            sent_id: Some("s2".into()),
            newdoc: Some(MarkerEdit::Flag(true)),
            translations: Some("en: He eats bread.\nde: Er isst Brot.".into()),
            ..Default::default()
        };
        assert!(sentence.edit_metadata(&edit).unwrap());
        let text = sentence_to_string(&sentence);
        assert!(text.starts_with("# newdoc\n# sent_id = s2\n# text = Il mange du pain.\n# text_en = He eats bread.\n# text_de = Er isst Brot.\n"));

        let bad = MetadataEdit {
            translations: Some("no colon here".into()),
            ..Default::default()
        };
        assert_eq!(
            sentence.edit_metadata(&bad),
            Err(EditError::InvalidTranslation("no colon here".into()))
        );
    }

    #[test]
    fn test_add_feature_and_remove() {
        let mut sentence = sample();
        sentence
            .add_feature(TokenRef::Ordinary(5), "Gender=Masc")
            .unwrap();
        sentence
            .add_feature(TokenRef::Ordinary(5), "Number=Sing")
            .unwrap();
        assert_eq!(
            sentence.token(5).unwrap().feats_string(),
            "Gender=Masc|Number=Sing"
        );
        sentence.add_feature(TokenRef::Ordinary(5), "Gender=").unwrap();
        assert_eq!(sentence.token(5).unwrap().feats_string(), "Number=Sing");
        assert_eq!(
            sentence.add_feature(TokenRef::Ordinary(5), "Gender"),
            Err(EditError::InvalidFeature("Gender".into()))
        );
    }
}
