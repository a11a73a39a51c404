use pretty_assertions::assert_eq;
use treebank_conllu::{parse_corpus, write_corpus, FormatError, TokenRef};

const CORPUS: &str = "# newdoc id = news-1\n\
# newpar\n\
# sent_id = news-1-s1\n\
# text = Dogs bark.\n\
# translit = dogs bark\n\
# text_fr = Les chiens aboient.\n\
# reviewed: yes\n\
1\tDogs\tdog\tNOUN\tNNS\tNumber=Plur\t2\tnsubj\t2:nsubj\t_\n\
2\tbark\tbark\tVERB\tVBP\tMood=Ind|Tense=Pres\t0\troot\t0:root\tSpaceAfter=No\n\
3\t.\t.\tPUNCT\t.\t_\t2\tpunct\t2:punct\t_\n\
\n\
# sent_id = news-1-s2\n\
# text = I can't.\n\
1\tI\tI\tPRON\tPRP\t_\t2\tnsubj\t2:nsubj|3:nsubj\t_\n\
2-3\tcan't\t_\t_\t_\t_\t_\t_\t_\tSpaceAfter=No\n\
2\tca\tcan\tAUX\tMD\t_\t0\troot\t0:root\t_\n\
3\tn't\tnot\tPART\tRB\t_\t2\tadvmod\t2:advmod\t_\n\
3.1\tgo\tgo\tVERB\t_\t_\t_\t_\t2:xcomp\t_\n\
4\t.\t.\tPUNCT\t.\t_\t2\tpunct\t2:punct\t_\n\
\n";

#[test]
fn test_corpus_round_trip() {
    let corpus = parse_corpus(CORPUS).unwrap();
    assert_eq!(corpus.len(), 2);
    assert_eq!(write_corpus(&corpus), CORPUS);
}

#[test]
fn test_text_uses_multiword_forms() {
    let corpus = parse_corpus(CORPUS).unwrap();
    let sentence = &corpus.sentences()[1];
    assert_eq!(sentence.text(), "I can't.");
    let (_, spans) = sentence.text_with_spans();
    assert_eq!(spans[1].first, 2);
    assert_eq!(spans[1].last, 3);
    assert_eq!(spans[2].offset, 7);
}

#[test]
fn test_metadata_fields() {
    let corpus = parse_corpus(CORPUS).unwrap();
    let meta = &corpus.sentences()[0].meta;
    assert_eq!(meta.newdoc.as_deref(), Some("news-1"));
    assert_eq!(meta.newpar.as_deref(), Some(""));
    assert_eq!(meta.translit.as_deref(), Some("dogs bark"));
    assert_eq!(meta.translations["fr"], "Les chiens aboient.");
    assert_eq!(meta.comments, vec!["reviewed: yes".to_string()]);
}

#[test]
fn test_empty_node_lookup() {
    let corpus = parse_corpus(CORPUS).unwrap();
    let sentence = &corpus.sentences()[1];
    let node = sentence.get(TokenRef::Enhanced(3, 1)).unwrap();
    assert_eq!(node.form, "go");
    let order: Vec<String> = sentence.all_tokens().iter().map(|t| t.id.to_string()).collect();
    assert_eq!(order, vec!["1", "2", "3", "3.1", "4"]);
}

#[test]
fn test_errors_report_line_numbers() {
    let broken = "# sent_id = x\n1\tword\tword\tX\t_\t_\t0\troot\t1x:dep\t_\n";
    assert_eq!(
        parse_corpus(broken).unwrap_err(),
        FormatError::InvalidEnhancedDep {
            line: 2,
            value: "1x:dep".to_string()
        }
    );
}

#[test]
fn test_missing_trailing_blank_line() {
    let corpus = parse_corpus("1\ta\ta\tX\t_\t_\t0\troot\t_\t_").unwrap();
    assert_eq!(write_corpus(&corpus), "1\ta\ta\tX\t_\t_\t0\troot\t_\t_\n\n");
}
