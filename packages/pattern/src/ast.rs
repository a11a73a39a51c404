//! Parsed form of a pattern request, before variables are numbered.

use treebank_query::Pattern;

/// A node attribute: one of the token columns, or a feature name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeField {
    Form,
    Lemma,
    Upos,
    Xpos,
    Deprel,
    Feat(String),
}

impl NodeField {
    pub fn from_name(name: &str) -> Self {
        match name {
            "form" => NodeField::Form,
            "lemma" => NodeField::Lemma,
            "upos" => NodeField::Upos,
            "xpos" => NodeField::Xpos,
            "deprel" => NodeField::Deprel,
            other => NodeField::Feat(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NodeField::Form => "form",
            NodeField::Lemma => "lemma",
            NodeField::Upos => "upos",
            NodeField::Xpos => "xpos",
            NodeField::Deprel => "deprel",
            NodeField::Feat(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureTest {
    /// `f=v1|v2`
    OneOf(Vec<String>),
    /// `f<>v1|v2`
    NoneOf(Vec<String>),
    /// `f=re"..."`
    Regex(Pattern),
    /// `f`
    Present,
    /// `!f`
    Absent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConstraint {
    pub field: NodeField,
    pub test: FeatureTest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LabelSet {
    Any,
    OneOf(Vec<String>),
    NoneOf(Vec<String>),
}

impl LabelSet {
    pub fn accepts(&self, label: &str) -> bool {
        match self {
            LabelSet::Any => true,
            LabelSet::OneOf(labels) => labels.iter().any(|l| l == label),
            LabelSet::NoneOf(labels) => labels.iter().all(|l| l != label),
        }
    }
}

/// Relation between two variables, referenced by name
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Edge {
        head: String,
        dep: String,
        labels: LabelSet,
    },
    /// `A < B` when `immediate`, otherwise `A << B`
    Precedes {
        left: String,
        right: String,
        immediate: bool,
    },
    /// `A > B` when `direct`, otherwise `A >> B`
    Dominates {
        head: String,
        dep: String,
        direct: bool,
    },
    Compare {
        left: (String, NodeField),
        right: (String, NodeField),
        equal: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalCheck {
    IsTree,
    IsNotTree,
    IsProjective,
    IsNotProjective,
}

/// Node declarations and clauses of one `pattern` or `without` block.
/// Names keep first-declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub nodes: Vec<(String, Vec<FeatureConstraint>)>,
    pub clauses: Vec<Clause>,
}

impl Block {
    pub fn declares(&self, name: &str) -> bool {
        self.nodes.iter().any(|(n, _)| n == name)
    }

    /// Declares `name` if needed and returns its feature list.
    pub fn node_mut(&mut self, name: &str) -> &mut Vec<FeatureConstraint> {
        let index = match self.nodes.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.nodes.push((name.to_string(), Vec::new()));
                self.nodes.len() - 1
            }
        };
        &mut self.nodes[index].1
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub pattern: Block,
    pub without: Vec<Block>,
    pub global: Vec<GlobalCheck>,
}
