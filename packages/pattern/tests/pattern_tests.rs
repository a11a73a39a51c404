//! Integration tests for structural search
//!
//! This tests:
//! - Graph patterns over a small corpus
//! - Compile-time declaration errors
//! - Extracted subtrees finding their own source

use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use treebank_conllu::parse_corpus;
use treebank_pattern::{extract_subtree, matched_ids, GraphPattern, SubtreePattern};

const CORPUS: &str = "# sent_id = a\n\
1\tJ'\tje\tPRON\t_\tPerson=1\t2\tnsubj\t_\t_\n\
2\tai\tavoir\tVERB\t_\t_\t0\troot\t_\t_\n\
3\ttrois\ttrois\tNUM\t_\t_\t4\tnummod\t_\t_\n\
4\tchats\tchat\tNOUN\t_\tNumber=Plur\t2\tobj\t_\t_\n\
\n\
# sent_id = b\n\
1\tIl\til\tPRON\t_\t_\t2\tnsubj\t_\t_\n\
2\tdort\tdormir\tVERB\t_\t_\t0\troot\t_\t_\n\
\n\
# sent_id = c\n\
1\tDeux\tdeux\tNUM\t_\t_\t2\tnummod\t_\t_\n\
2\tchiens\tchien\tNOUN\t_\tNumber=Plur\t0\troot\t_\t_\n\
\n";

#[test]
fn test_nummod_pattern() -> anyhow::Result<()> {
    let corpus = parse_corpus(CORPUS)?;
    let pattern = GraphPattern::parse("pattern {\n  N [upos=NOUN]\n  N -[nummod]-> M\n}")?;
    assert_eq!(pattern.variables(), ["N".to_string(), "M".to_string()]);

    let results = pattern.find_in_corpus(&corpus);
    let sentences: Vec<usize> = results.iter().map(|(index, _)| *index).collect();
    assert_eq!(sentences, vec![0, 2]);

    let (_, matches) = &results[0];
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].get("N"), Some(4));
    assert_eq!(matches[0].get("M"), Some(3));
    assert_eq!(matched_ids(matches), BTreeSet::from([3, 4]));
    Ok(())
}

#[test]
fn test_without_subject() -> anyhow::Result<()> {
    let corpus = parse_corpus(CORPUS)?;
    let pattern =
        GraphPattern::parse("pattern { V [upos=VERB] }\nwithout { V -[nsubj]-> S }")?;
    // Every verb in the corpus has a subject.
    assert!(pattern.find_in_corpus(&corpus).is_empty());
    Ok(())
}

#[test]
fn test_declaration_errors() {
    assert_eq!(
        GraphPattern::parse("pattern { A [upos=NOUN]; A << B }")
            .unwrap_err()
            .to_string(),
        "Identifier B not found"
    );
    assert_eq!(
        GraphPattern::parse("pattern { A [lemma=chat, lemma=chien] }")
            .unwrap_err()
            .to_string(),
        "Inconsistent declarations for node A: field 'lemma' declared twice"
    );
}

#[test]
fn test_global_projectivity() -> anyhow::Result<()> {
    let corpus = parse_corpus(
        "1\ta\ta\tX\t_\t_\t3\tdep\t_\t_\n\
         2\tb\tb\tX\t_\t_\t4\tdep\t_\t_\n\
         3\tc\tc\tX\t_\t_\t0\troot\t_\t_\n\
         4\td\td\tX\t_\t_\t1\tdep\t_\t_\n\n",
    )?;
    let sentence = &corpus.sentences()[0];
    let projective = GraphPattern::parse("pattern { R [deprel=root] } global { is_projective }")?;
    let crossing = GraphPattern::parse("pattern { R [deprel=root] } global { is_not_projective }")?;
    assert!(projective.find(sentence).is_empty());
    assert_eq!(crossing.find(sentence).len(), 1);
    Ok(())
}

#[test]
fn test_extracted_subtree_finds_itself() -> anyhow::Result<()> {
    let corpus = parse_corpus(CORPUS)?;
    let sentence = &corpus.sentences()[0];
    let text = extract_subtree(sentence, 4, None).expect("token 4 exists");
    let pattern = SubtreePattern::parse(&text)?;
    assert_eq!(pattern.len(), 2);
    assert_eq!(pattern.find(sentence), vec![3, 4]);
    assert!(pattern.find(&corpus.sentences()[1]).is_empty());
    Ok(())
}
