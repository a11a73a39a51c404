//! Backtracking search for pattern requests.
//!
//! Variables are numbered in declaration order and bound to ordinary tokens
//! one at a time. Each constraint is checked as soon as the last variable it
//! mentions is bound, so partial bindings are pruned early.

use crate::ast::*;
use crate::parser::parse_request;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use treebank_conllu::{Corpus, Sentence, Token};
use treebank_query::ParseResult;

/// Variable bindings of one match, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub bindings: Vec<(String, u32)>,
}

impl Match {
    pub fn get(&self, name: &str) -> Option<u32> {
        self.bindings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.bindings.iter().map(|(_, id)| *id)
    }
}

/// Every token id bound by any of `matches`.
pub fn matched_ids(matches: &[Match]) -> BTreeSet<u32> {
    matches.iter().flat_map(|m| m.ids()).collect()
}

#[derive(Debug, Clone)]
enum Check {
    Features(usize, Vec<FeatureConstraint>),
    Edge {
        head: usize,
        dep: usize,
        labels: LabelSet,
    },
    Precedes {
        left: usize,
        right: usize,
        immediate: bool,
    },
    Dominates {
        head: usize,
        dep: usize,
        direct: bool,
    },
    Compare {
        left: (usize, NodeField),
        right: (usize, NodeField),
        equal: bool,
    },
}

impl Check {
    /// Highest variable index the check reads.
    fn ready_at(&self) -> usize {
        match self {
            Check::Features(var, _) => *var,
            Check::Edge { head, dep, .. } | Check::Dominates { head, dep, .. } => *head.max(dep),
            Check::Precedes { left, right, .. } => *left.max(right),
            Check::Compare { left, right, .. } => left.0.max(right.0),
        }
    }

    fn holds(&self, sentence: &Sentence, binding: &[u32]) -> bool {
        let token = |var: usize| sentence.token(binding[var]);
        match self {
            Check::Features(var, constraints) => match token(*var) {
                Some(t) => constraints.iter().all(|c| feature_holds(t, c)),
                None => false,
            },
            Check::Edge { head, dep, labels } => match token(*dep) {
                Some(t) => t.head == Some(binding[*head]) && labels.accepts(&t.deprel),
                None => false,
            },
            Check::Precedes {
                left,
                right,
                immediate,
            } => {
                if *immediate {
                    binding[*left] + 1 == binding[*right]
                } else {
                    binding[*left] < binding[*right]
                }
            }
            Check::Dominates { head, dep, direct } => {
                if *direct {
                    token(*dep).is_some_and(|t| t.head == Some(binding[*head]))
                } else {
                    sentence.is_ancestor(binding[*head], binding[*dep])
                }
            }
            Check::Compare { left, right, equal } => {
                let a = token(left.0).and_then(|t| read_field(t, &left.1));
                let b = token(right.0).and_then(|t| read_field(t, &right.1));
                if *equal {
                    a.is_some() && a == b
                } else {
                    a != b
                }
            }
        }
    }
}

fn read_field<'t>(token: &'t Token, field: &NodeField) -> Option<&'t str> {
    match field {
        NodeField::Form => Some(&token.form),
        NodeField::Lemma => Some(&token.lemma),
        NodeField::Upos => Some(&token.upos),
        NodeField::Xpos => Some(&token.xpos),
        NodeField::Deprel => Some(&token.deprel),
        NodeField::Feat(name) => token.feature(name),
    }
}

fn feature_holds(token: &Token, constraint: &FeatureConstraint) -> bool {
    let value = read_field(token, &constraint.field);
    match &constraint.test {
        FeatureTest::OneOf(values) => value.is_some_and(|v| values.iter().any(|x| x == v)),
        FeatureTest::NoneOf(values) => value.map_or(true, |v| values.iter().all(|x| x != v)),
        FeatureTest::Regex(pattern) => value.is_some_and(|v| pattern.is_match(v)),
        FeatureTest::Present => value.is_some_and(|v| v != "_"),
        FeatureTest::Absent => value.map_or(true, |v| v == "_"),
    }
}

/// Checks grouped by the variable index at which they become decidable.
#[derive(Debug, Clone, Default)]
struct Stage {
    /// Checks that only read variables bound before this block starts.
    upfront: Vec<Check>,
    /// `by_var[k]` holds checks whose highest variable is `first + k`.
    by_var: Vec<Vec<Check>>,
    first: usize,
}

impl Stage {
    fn new(first: usize, count: usize, checks: Vec<Check>) -> Self {
        let mut stage = Stage {
            upfront: Vec::new(),
            by_var: vec![Vec::new(); count],
            first,
        };
        for check in checks {
            let ready = check.ready_at();
            if ready < first {
                stage.upfront.push(check);
            } else {
                stage.by_var[ready - first].push(check);
            }
        }
        stage
    }

    fn count(&self) -> usize {
        self.by_var.len()
    }

    /// Extends `binding` with this stage's variables. `on_match` returns
    /// false to stop the search.
    fn search(
        &self,
        sentence: &Sentence,
        binding: &mut Vec<u32>,
        on_match: &mut dyn FnMut(&[u32]) -> bool,
    ) -> bool {
        if !self.upfront.iter().all(|c| c.holds(sentence, binding)) {
            return true;
        }
        self.extend(sentence, binding, on_match)
    }

    fn extend(
        &self,
        sentence: &Sentence,
        binding: &mut Vec<u32>,
        on_match: &mut dyn FnMut(&[u32]) -> bool,
    ) -> bool {
        let var = binding.len();
        if var == self.first + self.count() {
            return on_match(binding);
        }
        for id in 1..=sentence.len() as u32 {
            if binding.contains(&id) {
                continue;
            }
            binding.push(id);
            let ok = self.by_var[var - self.first]
                .iter()
                .all(|c| c.holds(sentence, binding));
            let keep_going = !ok || self.extend(sentence, binding, on_match);
            binding.pop();
            if !keep_going {
                return false;
            }
        }
        true
    }
}

/// A compiled pattern request
#[derive(Debug, Clone)]
pub struct GraphPattern {
    names: Vec<String>,
    pattern: Stage,
    without: Vec<Stage>,
    global: Vec<GlobalCheck>,
}

impl GraphPattern {
    pub fn parse(source: &str) -> ParseResult<Self> {
        Ok(Self::compile(&parse_request(source)?))
    }

    pub fn compile(request: &Request) -> Self {
        let names: Vec<String> = request.pattern.nodes.iter().map(|(n, _)| n.clone()).collect();
        let index: HashMap<&str, usize> = request
            .pattern
            .nodes
            .iter()
            .enumerate()
            .map(|(i, (n, _))| (n.as_str(), i))
            .collect();
        let pattern = Stage::new(0, names.len(), compile_block(&request.pattern, &index));

        let without = request
            .without
            .iter()
            .map(|block| {
                let mut local = index.clone();
                let mut count = 0;
                for (name, _) in &block.nodes {
                    if !local.contains_key(name.as_str()) {
                        local.insert(name.as_str(), names.len() + count);
                        count += 1;
                    }
                }
                Stage::new(names.len(), count, compile_block(block, &local))
            })
            .collect();

        Self {
            names,
            pattern,
            without,
            global: request.global.clone(),
        }
    }

    pub fn variables(&self) -> &[String] {
        &self.names
    }

    fn global_holds(&self, sentence: &Sentence) -> bool {
        self.global.iter().all(|check| match check {
            GlobalCheck::IsTree => sentence.is_tree(),
            GlobalCheck::IsNotTree => !sentence.is_tree(),
            GlobalCheck::IsProjective => sentence.is_projective(),
            GlobalCheck::IsNotProjective => !sentence.is_projective(),
        })
    }

    /// All matches in `sentence`, ordered by their id vectors.
    pub fn find(&self, sentence: &Sentence) -> Vec<Match> {
        if !self.global_holds(sentence) {
            return Vec::new();
        }

        let mut found: Vec<Vec<u32>> = Vec::new();
        let mut binding = Vec::with_capacity(self.names.len());
        self.pattern.search(sentence, &mut binding, &mut |ids| {
            let excluded = self.without.iter().any(|stage| {
                let mut extended = ids.to_vec();
                let mut hit = false;
                stage.search(sentence, &mut extended, &mut |_| {
                    hit = true;
                    false
                });
                hit
            });
            if !excluded {
                found.push(ids.to_vec());
            }
            true
        });
        found.sort();

        found
            .into_iter()
            .map(|ids| Match {
                bindings: self.names.iter().cloned().zip(ids).collect(),
            })
            .collect()
    }

    /// Matches per sentence index, skipping sentences without any.
    pub fn find_in_corpus(&self, corpus: &Corpus) -> Vec<(usize, Vec<Match>)> {
        let results: Vec<(usize, Vec<Match>)> = corpus
            .sentences()
            .iter()
            .enumerate()
            .filter_map(|(index, sentence)| {
                let matches = self.find(sentence);
                (!matches.is_empty()).then_some((index, matches))
            })
            .collect();
        debug!(
            sentences = results.len(),
            variables = self.names.len(),
            "pattern search finished"
        );
        results
    }
}

fn compile_block(block: &Block, index: &HashMap<&str, usize>) -> Vec<Check> {
    let var = |name: &str| index.get(name).copied().unwrap_or_default();
    let mut checks: Vec<Check> = block
        .nodes
        .iter()
        .filter(|(_, features)| !features.is_empty())
        .map(|(name, features)| Check::Features(var(name), features.clone()))
        .collect();
    checks.extend(block.clauses.iter().map(|clause| match clause {
        Clause::Edge { head, dep, labels } => Check::Edge {
            head: var(head),
            dep: var(dep),
            labels: labels.clone(),
        },
        Clause::Precedes {
            left,
            right,
            immediate,
        } => Check::Precedes {
            left: var(left),
            right: var(right),
            immediate: *immediate,
        },
        Clause::Dominates { head, dep, direct } => Check::Dominates {
            head: var(head),
            dep: var(dep),
            direct: *direct,
        },
        Clause::Compare { left, right, equal } => Check::Compare {
            left: (var(&left.0), left.1.clone()),
            right: (var(&right.0), right.1.clone()),
            equal: *equal,
        },
    }));
    checks
}
