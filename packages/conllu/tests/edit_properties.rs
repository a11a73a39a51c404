//! Property tests for structural edits
//!
//! This tests:
//! - Dense ids after arbitrary insert/split/join/delete sequences
//! - Round-trip stability of edited sentences
//! - Rejected edits leave the sentence untouched

use proptest::prelude::*;
use treebank_conllu::{
    parse_sentence, sentence_to_string, OrphanPolicy, Sentence, TokenRef,
};

const BASE: &str = "# sent_id = p1\n\
# text = Le chat du voisin dort.\n\
1\tLe\tle\tDET\t_\t_\t2\tdet\t2:det\t_\n\
2\tchat\tchat\tNOUN\t_\t_\t6\tnsubj\t6:nsubj\t_\n\
3-4\tdu\t_\t_\t_\t_\t_\t_\t_\t_\n\
3\tde\tde\tADP\t_\t_\t5\tcase\t5:case\t_\n\
4\tle\tle\tDET\t_\t_\t5\tdet\t5:det\t_\n\
5\tvoisin\tvoisin\tNOUN\t_\t_\t2\tnmod\t2:nmod\t_\n\
5.1\tdort\tdormir\tVERB\t_\t_\t_\t_\t5:acl\t_\n\
6\tdort\tdormir\tVERB\t_\t_\t0\troot\t0:root\tSpaceAfter=No\n\
7\t.\t.\tPUNCT\t_\t_\t6\tpunct\t6:punct\t_\n";

#[derive(Debug, Clone)]
enum Op {
    Insert(u32),
    Split(u32, usize),
    Join(u32),
    Delete(u32, bool),
    Reattach(u32, u32),
    EmptyInsert(u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..12).prop_map(Op::Insert),
        (1u32..12, 0usize..4).prop_map(|(id, at)| Op::Split(id, at)),
        (1u32..12).prop_map(Op::Join),
        (1u32..12, any::<bool>()).prop_map(|(id, orphan)| Op::Delete(id, orphan)),
        (1u32..12, 0u32..12).prop_map(|(dep, head)| Op::Reattach(dep, head)),
        (0u32..12).prop_map(Op::EmptyInsert),
    ]
}

fn apply(sentence: &mut Sentence, op: &Op) {
    let _ = match op {
        Op::Insert(id) => sentence.insert_token(*id, "x", None, None, None).map(|_| ()),
        Op::Split(id, at) => sentence.split_token(*id, Some(*at)),
        Op::Join(id) => sentence.join_token(*id),
        Op::Delete(id, orphan) => {
            let policy = if *orphan {
                OrphanPolicy::Orphan
            } else {
                OrphanPolicy::ReattachToHead
            };
            sentence.delete_token(*id, policy)
        }
        Op::Reattach(dep, head) => sentence
            .reattach(TokenRef::Ordinary(*dep), TokenRef::Ordinary(*head), None)
            .map(|_| ()),
        Op::EmptyInsert(anchor) => sentence
            .insert_empty_node(*anchor, "e", None, None, None)
            .map(|_| ()),
    };
}

fn assert_invariants(sentence: &Sentence) {
    let len = sentence.len() as u32;
    for (index, token) in sentence.tokens().enumerate() {
        assert_eq!(token.id, TokenRef::Ordinary(index as u32 + 1));
        if let Some(head) = token.head {
            assert!(head <= len, "head {} out of range {}", head, len);
        }
        for dep in &token.deps {
            assert!(
                dep.head == TokenRef::Ordinary(0) || sentence.contains(dep.head),
                "dangling enhanced head {}",
                dep.head
            );
        }
    }
    for anchor in 0..=len {
        let subs: Vec<u32> = sentence
            .empty_nodes_at(anchor)
            .map(|t| match t.id {
                TokenRef::Enhanced(_, sub) => sub,
                TokenRef::Ordinary(_) => 0,
            })
            .collect();
        let expected: Vec<u32> = (1..=subs.len() as u32).collect();
        assert_eq!(subs, expected);
    }
    let mut covered = std::collections::BTreeSet::new();
    for span in sentence.multiwords() {
        assert!(span.start < span.end && span.end <= len);
        for id in span.start..=span.end {
            assert!(covered.insert(id), "token {} in two spans", id);
        }
    }
}

proptest! {
    #[test]
    fn prop_edits_keep_ids_dense(ops in prop::collection::vec(op(), 1..12)) {
        let mut sentence = parse_sentence(BASE).unwrap();
        for op in &ops {
            apply(&mut sentence, op);
            assert_invariants(&sentence);
        }
    }

    #[test]
    fn prop_edited_sentence_round_trips(ops in prop::collection::vec(op(), 1..8)) {
        let mut sentence = parse_sentence(BASE).unwrap();
        for op in &ops {
            apply(&mut sentence, op);
        }
        let text = sentence_to_string(&sentence);
        let reparsed = parse_sentence(&text).unwrap();
        prop_assert_eq!(sentence_to_string(&reparsed), text);
    }

    #[test]
    fn prop_reattach_never_creates_cycles(dep in 1u32..8, head in 0u32..8) {
        let mut sentence = parse_sentence(BASE).unwrap();
        let _ = sentence.reattach(TokenRef::Ordinary(dep), TokenRef::Ordinary(head), None);
        prop_assert!(!sentence.has_cycle());
    }

    #[test]
    fn prop_rejected_edit_is_noop(id in 8u32..50) {
        let mut sentence = parse_sentence(BASE).unwrap();
        let before = sentence.clone();
        prop_assert!(sentence.delete_token(id, OrphanPolicy::default()).is_err());
        prop_assert!(sentence.split_token(id, None).is_err());
        prop_assert_eq!(sentence, before);
    }
}
