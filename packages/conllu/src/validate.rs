//! Tree-shape and tagset checks reported alongside each sentence.

use crate::sentence::Sentence;
use serde::Serialize;
use std::collections::BTreeSet;

/// Allowed tag values. An empty set disables its check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSets {
    pub upos: BTreeSet<String>,
    pub xpos: BTreeSet<String>,
    pub deprels: BTreeSet<String>,
    /// `Key=Value` pairs or bare keys.
    pub features: BTreeSet<String>,
}

impl TagSets {
    pub fn new<I, S>(upos: I, xpos: I, deprels: I, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let collect = |items: I| -> BTreeSet<String> { items.into_iter().map(Into::into).collect() };
        Self {
            upos: collect(upos),
            xpos: collect(xpos),
            deprels: collect(deprels),
            features: collect(features),
        }
    }
}

fn allowed(set: &BTreeSet<String>, value: &str) -> bool {
    set.is_empty() || set.contains(value)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationCounts {
    /// Number of roots, reported when it is not exactly one.
    pub heads: usize,
    /// Roots not labelled `root`, or non-roots labelled `root`.
    pub badroots: usize,
    /// Tokens whose head chain loops.
    pub cycles: usize,
    #[serde(rename = "invalidUPOS")]
    pub invalid_upos: usize,
    #[serde(rename = "invalidXPOS")]
    pub invalid_xpos: usize,
    #[serde(rename = "invalidDeprels")]
    pub invalid_deprels: usize,
    #[serde(rename = "invalidFeatures")]
    pub invalid_features: usize,
}

impl ValidationCounts {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

impl Sentence {
    pub fn validation_counts(&self, tags: &TagSets) -> ValidationCounts {
        let mut counts = ValidationCounts::default();
        let roots = self.tree().roots.len();
        if roots != 1 {
            counts.heads = roots;
        }
        for token in self.tokens() {
            let id = token.ordinary_id();
            let is_root = token.head == Some(0);
            if is_root != (token.deprel == "root") {
                counts.badroots += 1;
            }
            if token.head.is_some() && self.depth(id).is_none() && self.is_ancestor(id, id) {
                counts.cycles += 1;
            }
        }
        for token in self.all_tokens() {
            if !allowed(&tags.upos, &token.upos) {
                counts.invalid_upos += 1;
            }
            if !allowed(&tags.xpos, &token.xpos) {
                counts.invalid_xpos += 1;
            }
            if !token.is_empty_node() && !allowed(&tags.deprels, &token.deprel) {
                let base = token.deprel.split(':').next().unwrap_or_default();
                if !allowed(&tags.deprels, base) {
                    counts.invalid_deprels += 1;
                }
            }
            let bad_feature = token.feats.iter().any(|(key, value)| {
                let pair = match value {
                    Some(value) => format!("{}={}", key, value),
                    None => key.clone(),
                };
                !allowed(&tags.features, &pair) && !allowed(&tags.features, key)
            });
            if bad_feature {
                counts.invalid_features += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parse_sentence;

    #[test]
    fn test_counts_tree_problems() {
        let sentence = parse_sentence(
            "1\ta\t_\tX\t_\t_\t2\tdep\t_\t_\n\
             2\tb\t_\tX\t_\t_\t1\tdep\t_\t_\n\
             3\tc\t_\tX\t_\t_\t0\troot\t_\t_\n\
             4\td\t_\tX\t_\t_\t0\tdep\t_\t_\n",
        )
        .unwrap();
        let counts = sentence.validation_counts(&TagSets::default());
        assert_eq!(counts.heads, 2);
        assert_eq!(counts.badroots, 1);
        assert_eq!(counts.cycles, 2);
        assert!(!counts.is_clean());
    }

    #[test]
    fn test_counts_invalid_tags() {
        let sentence = parse_sentence(
            "1\ta\t_\tNOUN\tnn\tNumber=Sing|Typo=Yes\t2\tnsubj:pass\t_\t_\n\
             2\tb\t_\tVRB\t_\t_\t0\troot\t_\t_\n",
        )
        .unwrap();
        let tags = TagSets::new(
            vec!["NOUN", "VERB"],
            vec![],
            vec!["nsubj", "root"],
            vec!["Number=Sing"],
        );
        let counts = sentence.validation_counts(&tags);
        assert_eq!(counts.invalid_upos, 1);
        assert_eq!(counts.invalid_xpos, 0);
        assert_eq!(counts.invalid_deprels, 0);
        assert_eq!(counts.invalid_features, 1);
        assert_eq!(counts.heads, 0);
    }
}
