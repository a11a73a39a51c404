//! Agreement scores against a gold-standard version of a sentence.

use crate::sentence::Sentence;
use serde::Serialize;

/// Percentages over aligned token positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Scores {
    pub lemma: f64,
    pub features: f64,
    pub upos: f64,
    pub xpos: f64,
    /// Labelled attachment: head and deprel both agree.
    pub las: f64,
}

impl Sentence {
    /// Compares ordinary tokens position by position. Positions past the
    /// shorter sentence count as disagreements.
    pub fn scores(&self, gold: &Sentence) -> Scores {
        let total = self.len().max(gold.len());
        if total == 0 {
            return Scores::default();
        }
        let mut hits = [0usize; 5];
        for (token, reference) in self.tokens().zip(gold.tokens()) {
            let checks = [
                token.lemma == reference.lemma,
                token.feats == reference.feats,
                token.upos == reference.upos,
                token.xpos == reference.xpos,
                token.head == reference.head && token.deprel == reference.deprel,
            ];
            for (hit, ok) in hits.iter_mut().zip(checks) {
                if ok {
                    *hit += 1;
                }
            }
        }
        let percent = |n: usize| 100.0 * n as f64 / total as f64;
        Scores {
            lemma: percent(hits[0]),
            features: percent(hits[1]),
            upos: percent(hits[2]),
            xpos: percent(hits[3]),
            las: percent(hits[4]),
        }
    }
}
