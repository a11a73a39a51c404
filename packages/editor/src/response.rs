//! JSON responses sent back to clients.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use treebank_conllu::{Multiword, Sentence, TagSets, Token, TokenRef, ValidationCounts};

#[derive(Debug, Clone, Default, Serialize)]
pub struct Response {
    pub sentenceid: usize,
    pub maxsentence: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Edits not yet saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<usize>,

    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub view: Option<SentenceView>,
}

impl Response {
    pub fn error(sentenceid: usize, maxsentence: usize, message: impl Into<String>) -> Self {
        Self {
            sentenceid,
            maxsentence,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn message(
        sentenceid: usize,
        maxsentence: usize,
        message: impl Into<String>,
        changes: usize,
    ) -> Self {
        Self {
            sentenceid,
            maxsentence,
            message: Some(message.into()),
            changes: Some(changes),
            ..Default::default()
        }
    }

    pub fn sentence(
        sentenceid: usize,
        maxsentence: usize,
        changes: usize,
        view: SentenceView,
    ) -> Self {
        Self {
            sentenceid,
            maxsentence,
            changes: Some(changes),
            view: Some(view),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

/// Enhanced edge as seen from the dependent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeView {
    pub head: String,
    pub deprel: String,
}

/// One token, with its dependents nested below it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: String,
    pub form: String,
    pub lemma: String,
    pub upos: String,
    pub xpos: String,
    pub feats: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<u32>,
    pub deprel: String,
    pub deps: Vec<EdgeView>,
    pub misc: String,
    #[serde(skip_serializing_if = "is_false")]
    pub highlight: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub highlight_deprel: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeView>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl NodeView {
    fn leaf(token: &Token) -> Self {
        Self {
            id: token.id.to_string(),
            form: token.form.clone(),
            lemma: token.lemma.clone(),
            upos: token.upos.clone(),
            xpos: token.xpos.clone(),
            feats: token.feats_string(),
            head: token.head,
            deprel: token.deprel.clone(),
            deps: token
                .deps
                .iter()
                .map(|d| EdgeView {
                    head: d.head.to_string(),
                    deprel: d.label.clone(),
                })
                .collect(),
            misc: token.misc_string(),
            highlight: token.highlight.token,
            highlight_deprel: token.highlight.deprel,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiwordView {
    pub start: u32,
    pub end: u32,
    pub form: String,
    pub misc: String,
}

impl From<&Multiword> for MultiwordView {
    fn from(span: &Multiword) -> Self {
        Self {
            start: span.start,
            end: span.end,
            form: span.form.clone(),
            misc: treebank_conllu::token::format_feature_map(&span.misc),
        }
    }
}

/// Everything a client needs to display one sentence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentenceView {
    /// Surface text
    pub sentence: String,
    /// Words plus empty nodes
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_id: Option<String>,
    pub modification: u64,
    pub tree: Vec<NodeView>,
    pub emptynodes: Vec<NodeView>,
    pub mwts: Vec<MultiwordView>,
    pub arc_heights: BTreeMap<u32, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationCounts>,
    pub comments: String,
    #[serde(rename = "canUndo")]
    pub can_undo: bool,
    #[serde(rename = "canRedo")]
    pub can_redo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Vec<String>>,
    #[serde(rename = "Lemma", skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
    #[serde(rename = "Features", skip_serializing_if = "Option::is_none")]
    pub features: Option<String>,
    #[serde(rename = "UPOS", skip_serializing_if = "Option::is_none")]
    pub upos: Option<String>,
    #[serde(rename = "XPOS", skip_serializing_if = "Option::is_none")]
    pub xpos: Option<String>,
    #[serde(rename = "LAS", skip_serializing_if = "Option::is_none")]
    pub las: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtree: Option<String>,
}

/// Inputs to a view besides the sentence itself
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewContext<'a> {
    pub tags: Option<&'a TagSets>,
    pub gold: Option<&'a Sentence>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub highlight: Option<&'a [TokenRef]>,
}

impl SentenceView {
    pub fn new(sentence: &Sentence, context: ViewContext<'_>) -> Self {
        let default_tags = TagSets::default();
        let counts = sentence.validation_counts(context.tags.unwrap_or(&default_tags));
        let scores = context.gold.map(|gold| sentence.scores(gold));
        let percent = |value: f64| format!("{:.2}", value);

        Self {
            sentence: sentence.text(),
            length: sentence.len() + sentence.empty_nodes().count(),
            sent_id: sentence.sent_id().map(str::to_string),
            modification: sentence.modification(),
            tree: build_tree(sentence),
            emptynodes: sentence.empty_nodes().map(NodeView::leaf).collect(),
            mwts: sentence.multiwords().map(MultiwordView::from).collect(),
            arc_heights: sentence.arc_heights(),
            errors: (!counts.is_clean()).then_some(counts),
            comments: sentence.comments_string(),
            can_undo: context.can_undo,
            can_redo: context.can_redo,
            highlight: context
                .highlight
                .map(|ids| ids.iter().map(TokenRef::to_string).collect()),
            lemma: scores.map(|s| percent(s.lemma)),
            features: scores.map(|s| percent(s.features)),
            upos: scores.map(|s| percent(s.upos)),
            xpos: scores.map(|s| percent(s.xpos)),
            las: scores.map(|s| percent(s.las)),
            subtree: None,
        }
    }
}

/// Nests tokens under their heads. Roots come first, then tokens without a
/// head, then anything only reachable through a cycle.
fn build_tree(sentence: &Sentence) -> Vec<NodeView> {
    let view = sentence.tree();
    let mut placed = BTreeSet::new();
    let mut nodes = Vec::new();

    fn place(
        sentence: &Sentence,
        view: &treebank_conllu::TreeView,
        id: u32,
        placed: &mut BTreeSet<u32>,
    ) -> Option<NodeView> {
        if !placed.insert(id) {
            return None;
        }
        let mut node = NodeView::leaf(sentence.token(id)?);
        node.children = view
            .children(id)
            .iter()
            .filter_map(|child| place(sentence, view, *child, placed))
            .collect();
        Some(node)
    }

    let starts = view
        .roots
        .iter()
        .chain(view.unattached.iter())
        .copied()
        .chain(1..=sentence.len() as u32)
        .collect::<Vec<_>>();
    for id in starts {
        if let Some(node) = place(sentence, &view, id, &mut placed) {
            nodes.push(node);
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use treebank_conllu::{parse_sentence, TagSets};

    fn sentence() -> Sentence {
        parse_sentence(
            "# sent_id = t1\n\
             1-2\tau\t_\t_\t_\t_\t_\t_\t_\t_\n\
             1\tà\tà\tADP\t_\t_\t3\tcase\t_\t_\n\
             2\tle\tle\tDET\t_\t_\t3\tdet\t_\t_\n\
             3\tmarché\tmarché\tNOUN\t_\t_\t0\troot\t_\t_\n",
        )
        .unwrap()
    }

    #[test]
    fn test_tree_nesting() {
        let view = SentenceView::new(&sentence(), ViewContext::default());
        assert_eq!(view.tree.len(), 1);
        assert_eq!(view.tree[0].id, "3");
        let children: Vec<&str> = view.tree[0].children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(children, vec!["1", "2"]);
        assert_eq!(view.mwts.len(), 1);
        assert_eq!(view.length, 3);
        assert_eq!(view.sentence, "au marché");
    }

    #[test]
    fn test_errors_only_when_present() {
        let clean = SentenceView::new(&sentence(), ViewContext::default());
        assert!(clean.errors.is_none());

        let tags = TagSets::new(vec!["NOUN"], vec![], vec![], vec![]);
        let view = SentenceView::new(
            &sentence(),
            ViewContext {
                tags: Some(&tags),
                ..Default::default()
            },
        );
        assert_eq!(view.errors.unwrap().invalid_upos, 2);
    }

    #[test]
    fn test_scores_formatted() {
        let gold = sentence();
        let view = SentenceView::new(
            &sentence(),
            ViewContext {
                gold: Some(&gold),
                ..Default::default()
            },
        );
        assert_eq!(view.las.as_deref(), Some("100.00"));

        let json = serde_json::to_value(Response::sentence(0, 1, 0, view)).unwrap();
        assert_eq!(json["LAS"], "100.00");
        assert_eq!(json["sentenceid"], 0);
        assert_eq!(json["canUndo"], false);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_error_response() {
        let json = serde_json::to_value(Response::error(4, 10, "invalid command 'x'")).unwrap();
        assert_eq!(json["error"], "invalid command 'x'");
        assert_eq!(json["maxsentence"], 10);
        assert!(json.get("tree").is_none());
    }
}
