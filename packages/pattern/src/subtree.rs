//! Subtree search: find a fragment of a tree given as tabular rows.
//!
//! Every cell of a pattern row is a regular expression over the matching
//! token's column, `_` leaves the column free. Rows are linked through
//! their HEAD cells and must form a single tree.

use crate::error::{SubtreeError, SubtreeResult};
use std::collections::VecDeque;
use treebank_conllu::schema::COLUMNS_HEADER;
use treebank_conllu::{Column, ColumnSchema, Field, Sentence, Token, EMPTY};
use treebank_query::Pattern;

/// Columns of an extracted subtree when none are requested.
pub const SUBTREE_COLUMNS: [&str; 8] = [
    "ID", "FORM", "LEMMA", "UPOS", "XPOS", "FEATS", "HEAD", "DEPREL",
];

#[derive(Debug, Clone, Default)]
struct Node {
    columns: Vec<(Field, Pattern)>,
    feats: Vec<(String, Pattern)>,
    misc: Vec<(String, Pattern)>,
    deprel: Option<Pattern>,
}

impl Node {
    fn matches(&self, sentence: &Sentence, token: &Token) -> bool {
        self.columns
            .iter()
            .all(|(field, pattern)| pattern.is_match(&sentence.value(token, field)))
            && self
                .feats
                .iter()
                .all(|(key, pattern)| token.feature(key).is_some_and(|v| pattern.is_match(v)))
            && self
                .misc
                .iter()
                .all(|(key, pattern)| token.misc_value(key).is_some_and(|v| pattern.is_match(v)))
            && self
                .deprel
                .as_ref()
                .map_or(true, |pattern| pattern.is_match(&token.deprel))
    }
}

/// A compiled subtree pattern
#[derive(Debug, Clone)]
pub struct SubtreePattern {
    nodes: Vec<Node>,
    parents: Vec<Option<usize>>,
    /// Root first, every row after its parent.
    order: Vec<usize>,
}

impl SubtreePattern {
    pub fn parse(source: &str) -> SubtreeResult<Self> {
        let mut columns = ColumnSchema::conllu().columns().to_vec();
        let mut nodes = Vec::new();
        let mut ids: Vec<Option<&str>> = Vec::new();
        let mut heads: Vec<Option<&str>> = Vec::new();

        for (index, line) in source.lines().enumerate() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix(COLUMNS_HEADER) {
                columns = rest.split_whitespace().map(Column::from_name).collect();
                continue;
            }
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let cells: Vec<&str> = if line.contains('\t') {
                line.split('\t').map(str::trim).collect()
            } else {
                line.split_whitespace().collect()
            };

            let mut node = Node::default();
            let mut id = None;
            let mut head = None;
            for (column, cell) in columns.iter().zip(cells) {
                match column {
                    Column::Id => id = Some(cell),
                    Column::Head => head = Some(cell),
                    _ if cell == EMPTY => {}
                    Column::Feats => node.feats = key_patterns(cell, index + 1)?,
                    Column::Misc => node.misc = key_patterns(cell, index + 1)?,
                    Column::Deprel => node.deprel = Some(compile(cell, index + 1)?),
                    Column::Deps => {}
                    other => {
                        if let Some(field) = field_of(other) {
                            node.columns.push((field, compile(cell, index + 1)?));
                        }
                    }
                }
            }
            // Multiword and empty node rows take no part in the tree.
            if id.is_some_and(|id| id.contains('-') || id.contains('.')) {
                continue;
            }
            nodes.push(node);
            ids.push(id);
            heads.push(head);
        }

        if nodes.is_empty() {
            return Err(SubtreeError::NoSubtree);
        }

        let parents: Vec<Option<usize>> = heads
            .iter()
            .map(|head| {
                let head = (*head).filter(|h| *h != EMPTY && *h != "0")?;
                ids.iter().position(|id| *id == Some(head)).or_else(|| {
                    head.parse::<usize>()
                        .ok()
                        .filter(|n| (1..=nodes.len()).contains(n))
                        .map(|n| n - 1)
                })
            })
            .collect();

        let roots: Vec<usize> = (0..nodes.len()).filter(|&i| parents[i].is_none()).collect();
        let root = match roots.as_slice() {
            [root] => *root,
            [] => return Err(SubtreeError::Cycle),
            _ => return Err(SubtreeError::MultipleRoots),
        };

        let mut order = Vec::with_capacity(nodes.len());
        let mut queue = VecDeque::from([root]);
        while let Some(next) = queue.pop_front() {
            order.push(next);
            queue.extend((0..nodes.len()).filter(|&i| parents[i] == Some(next)));
        }
        if order.len() != nodes.len() {
            return Err(SubtreeError::Cycle);
        }

        if nodes[root]
            .deprel
            .as_ref()
            .is_some_and(|p| p.as_str() == "root")
        {
            nodes[root].deprel = None;
        }

        Ok(Self {
            nodes,
            parents,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sorted ids of the first embedding found, empty when there is none.
    pub fn find(&self, sentence: &Sentence) -> Vec<u32> {
        let root = self.order[0];
        for token in sentence.tokens() {
            if !self.nodes[root].matches(sentence, token) {
                continue;
            }
            let mut assignment = vec![0u32; self.nodes.len()];
            assignment[root] = token.ordinary_id();
            if self.assign(sentence, 1, &mut assignment) {
                assignment.sort_unstable();
                return assignment;
            }
        }
        Vec::new()
    }

    fn assign(&self, sentence: &Sentence, step: usize, assignment: &mut [u32]) -> bool {
        let Some(&node) = self.order.get(step) else {
            return true;
        };
        let Some(parent) = self.parents[node] else {
            return false;
        };
        for child in sentence.children(assignment[parent]) {
            if assignment.contains(&child) {
                continue;
            }
            let Some(token) = sentence.token(child) else {
                continue;
            };
            if !self.nodes[node].matches(sentence, token) {
                continue;
            }
            assignment[node] = child;
            if self.assign(sentence, step + 1, assignment) {
                return true;
            }
            assignment[node] = 0;
        }
        false
    }
}

fn compile(cell: &str, line: usize) -> SubtreeResult<Pattern> {
    Pattern::full(cell).map_err(|e| SubtreeError::invalid_regex(line, &e))
}

/// `Key=regex|Key=regex`; a bare key only requires the key to be present.
fn key_patterns(cell: &str, line: usize) -> SubtreeResult<Vec<(String, Pattern)>> {
    cell.split('|')
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (key, value) = item.split_once('=').unwrap_or((item, ".*"));
            Ok((key.to_string(), compile(value, line)?))
        })
        .collect()
}

fn field_of(column: &Column) -> Option<Field> {
    match column {
        Column::Form => Some(Field::Form),
        Column::Lemma => Some(Field::Lemma),
        Column::Upos => Some(Field::Upos),
        Column::Xpos => Some(Field::Xpos),
        Column::Feats => Some(Field::Feats),
        Column::Deprel => Some(Field::Deprel),
        Column::Misc => Some(Field::Misc),
        Column::Extra(name) => Some(Field::Extra(name.clone())),
        Column::Id | Column::Head | Column::Deps => None,
    }
}

/// Renders the subtree rooted at `id` as a pattern, preceded by its columns
/// header. Rows are renumbered from 1 and the root gets head 0.
pub fn extract_subtree(sentence: &Sentence, id: u32, columns: Option<&[Column]>) -> Option<String> {
    sentence.token(id)?;
    let default: Vec<Column>;
    let columns = match columns {
        Some(columns) => columns,
        None => {
            default = SUBTREE_COLUMNS.iter().map(|n| Column::from_name(n)).collect();
            &default
        }
    };

    let mut members = sentence.descendants(id);
    members.push(id);
    members.sort_unstable();
    members.dedup();
    let renumber = |old: u32| {
        members
            .iter()
            .position(|m| *m == old)
            .map(|p| (p + 1).to_string())
    };

    let names: Vec<&str> = columns.iter().map(|c| c.name()).collect();
    let mut out = format!("{} {}\n", COLUMNS_HEADER, names.join(" "));
    for &member in &members {
        let Some(token) = sentence.token(member) else {
            continue;
        };
        let cells: Vec<String> = columns
            .iter()
            .map(|column| match column {
                Column::Id => renumber(member).unwrap_or_default(),
                Column::Head if member == id => "0".to_string(),
                Column::Head => token
                    .head
                    .and_then(renumber)
                    .unwrap_or_else(|| EMPTY.to_string()),
                other => field_of(other)
                    .map(|field| sentence.value(token, &field))
                    .unwrap_or_else(|| EMPTY.to_string()),
            })
            .collect();
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use treebank_conllu::parse_sentence;

    const SENTENCE: &str = "1\tLe\tle\tDET\t_\tGender=Masc\t2\tdet\t_\t_\n\
2\tchat\tchat\tNOUN\t_\tGender=Masc|Number=Sing\t3\tnsubj\t_\t_\n\
3\tdort\tdormir\tVERB\t_\tTense=Pres\t0\troot\t_\t_\n\
4\tbien\tbien\tADV\t_\t_\t3\tadvmod\t_\t_\n";

    #[test]
    fn test_find_fragment() {
        let sentence = parse_sentence(SENTENCE).unwrap();
        let pattern = SubtreePattern::parse(
            "1\t_\t_\tNOUN\t_\tNumber=Sing\t0\tnsubj\t_\t_\n\
             2\t_\t_\tDET\t_\t_\t1\tdet\t_\t_\n",
        )
        .unwrap();
        assert_eq!(pattern.find(&sentence), vec![1, 2]);
    }

    #[test]
    fn test_root_deprel_is_free() {
        let sentence = parse_sentence(SENTENCE).unwrap();
        let pattern = SubtreePattern::parse(
            "# global.columns = ID UPOS HEAD DEPREL\n1 NOUN 0 root\n2 DET 1 det\n",
        )
        .unwrap();
        assert_eq!(pattern.find(&sentence), vec![1, 2]);
    }

    #[test]
    fn test_children_are_distinct() {
        let sentence = parse_sentence(SENTENCE).unwrap();
        let pattern =
            SubtreePattern::parse("# global.columns = ID UPOS HEAD\n1 VERB _\n2 ADV 1\n3 ADV 1\n")
                .unwrap();
        assert!(pattern.find(&sentence).is_empty());

        let pattern =
            SubtreePattern::parse("# global.columns = ID UPOS HEAD\n1 VERB _\n2 .* 1\n3 .* 1\n")
                .unwrap();
        assert_eq!(pattern.find(&sentence), vec![2, 3, 4]);
    }

    #[test]
    fn test_pattern_errors() {
        assert_eq!(SubtreePattern::parse("\n# c\n").unwrap_err(), SubtreeError::NoSubtree);
        assert_eq!(
            SubtreePattern::parse("# global.columns = ID UPOS HEAD\n1 NOUN 0\n2 DET 0\n")
                .unwrap_err(),
            SubtreeError::MultipleRoots
        );
        assert_eq!(
            SubtreePattern::parse("# global.columns = ID UPOS HEAD\n1 NOUN 2\n2 DET 1\n")
                .unwrap_err(),
            SubtreeError::Cycle
        );
        assert!(matches!(
            SubtreePattern::parse("# global.columns = ID UPOS HEAD\n1 ( 0\n").unwrap_err(),
            SubtreeError::InvalidRegex { line: 2, .. }
        ));
    }

    #[test]
    fn test_extract_subtree() {
        let sentence = parse_sentence(SENTENCE).unwrap();
        assert_eq!(
            extract_subtree(&sentence, 2, None).unwrap(),
            "# global.columns = ID FORM LEMMA UPOS XPOS FEATS HEAD DEPREL\n\
             1\tLe\tle\tDET\t_\tGender=Masc\t2\tdet\n\
             2\tchat\tchat\tNOUN\t_\tGender=Masc|Number=Sing\t0\tnsubj\n"
        );
        assert_eq!(extract_subtree(&sentence, 9, None), None);
    }
}
