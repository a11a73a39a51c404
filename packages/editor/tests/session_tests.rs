//! Integration tests for the editing session
//!
//! This tests:
//! - Stale or missing modification counters are rejected without side effects
//! - Sentence splits and joins can be undone
//! - Undo/redo restore exact serializations
//! - Save policies and save failures
//! - Browse mode and command syntax errors
//! - Search, pattern highlighting and corpus-wide replacement

use pretty_assertions::assert_eq;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use treebank_conllu::{parse_corpus, sentence_to_string};
use treebank_editor::{
    DurableSave, EditorConfig, MemorySink, Request, Response, SavePolicy, Session, SharedSession,
};

const CORPUS: &str = "# sent_id = fr-1\n\
# text = Il pense à elle\n\
1\tIl\til\tPRON\t_\t_\t2\tnsubj\t_\t_\n\
2\tpense\tpenser\tVERB\t_\t_\t0\troot\t_\t_\n\
3\tà\tà\tADP\t_\t_\t4\tcase\t_\t_\n\
4\telle\tlui\tPRON\t_\t_\t2\tobl\t_\t_\n\
\n\
# sent_id = fr-2\n\
1\tElle\til\tPRON\t_\t_\t2\tnsubj\t_\t_\n\
2\tdort\tdormir\tVERB\t_\t_\t0\troot\t_\t_\n\
\n\
# sent_id = fr-3\n\
1\tDans\tdans\tADP\t_\t_\t3\tcase\t_\t_\n\
2\tla\tle\tDET\t_\t_\t3\tdet\t_\t_\n\
3\tmaison\tmaison\tNOUN\t_\tNumber=Sing\t0\troot\t_\t_\n\
\n";

/// Records every saved content so tests can inspect it after the session
/// takes ownership of the strategy.
#[derive(Clone, Default)]
struct Recorder {
    saves: Arc<Mutex<Vec<String>>>,
}

impl DurableSave for Recorder {
    fn save(&mut self, path: &Path, content: &str, _message: &str) -> io::Result<PathBuf> {
        self.saves.lock().unwrap().push(content.to_string());
        Ok(path.to_path_buf())
    }
}

fn config(policy: SavePolicy) -> EditorConfig {
    EditorConfig {
        save_policy: Some(policy),
        ..Default::default()
    }
}

fn session_with(config: EditorConfig) -> anyhow::Result<(Session, Recorder)> {
    let recorder = Recorder::default();
    let session = Session::new(
        Arc::new(config),
        parse_corpus(CORPUS)?,
        "fr.conllu",
        Box::new(recorder.clone()),
    );
    Ok((session, recorder))
}

/// Sends a request carrying the counter of the sentence as it is now, as a
/// client that has just read it would.
fn edit(session: &mut Session, command: &str, index: usize) -> Response {
    let observed = session
        .corpus()
        .get(index)
        .map_or(0, |sentence| sentence.modification());
    session.process(&Request::new(command, index).observed(observed))
}

fn serialized(session: &Session, index: usize) -> String {
    sentence_to_string(&session.corpus().sentences()[index])
}

#[test]
fn test_stale_counter_rejected() -> anyhow::Result<()> {
    let (mut session, _) = session_with(config(SavePolicy::AfterEdits(100)))?;

    let response = session.process(&Request::new("mod upos 1 PROPN", 0).observed(0));
    assert!(!response.is_error());
    assert_eq!(session.corpus().sentences()[0].modification(), 1);
    let before = serialized(&session, 0);

    // A client that has not seen the first edit.
    let response = session.process(&Request::new("mod lemma 1 elle", 0).observed(0));
    assert_eq!(
        response.error.as_deref(),
        Some("Sentence has been modified by another client (observed 0, current 1)")
    );
    assert_eq!(response.sentenceid, 0);
    assert_eq!(serialized(&session, 0), before);
    assert_eq!(session.corpus().sentences()[0].modification(), 1);
    assert_eq!(session.pending_changes(), 1);

    // History still holds exactly the first edit.
    edit(&mut session, "mod undo", 0);
    assert!(!session.can_undo(0));

    // Newer or equal counters go through.
    let response = session.process(&Request::new("mod lemma 1 elle", 0).observed(5));
    assert!(!response.is_error());
    Ok(())
}

#[test]
fn test_edit_without_counter_rejected() -> anyhow::Result<()> {
    let (mut session, recorder) = session_with(config(SavePolicy::AfterEdits(0)))?;
    let before = serialized(&session, 0);
    for command in ["mod upos 1 PROPN", "replaceexpression false Upos:ADP > xpos:prep"] {
        let response = session.process(&Request::new(command, 0));
        assert!(response
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("Sentence modification counter missing")));
    }
    assert_eq!(serialized(&session, 0), before);
    assert_eq!(session.pending_changes(), 0);
    assert!(recorder.saves.lock().unwrap().is_empty());
    Ok(())
}

#[test]
fn test_undo_sentence_split() -> anyhow::Result<()> {
    let (mut session, _) = session_with(config(SavePolicy::AfterEdits(100)))?;
    let original = session.corpus().to_conllu();

    let response = edit(&mut session, "mod sentsplit 3", 0);
    assert!(!response.is_error());
    assert_eq!(session.corpus().len(), 4);

    let response = edit(&mut session, "mod undo", 0);
    assert!(!response.is_error());
    assert_eq!(response.maxsentence, 3);
    assert_eq!(session.corpus().to_conllu(), original);

    edit(&mut session, "mod redo", 0);
    assert_eq!(session.corpus().len(), 4);
    assert_eq!(session.corpus().sentences()[1].sent_id(), Some("fr-1-bis"));
    Ok(())
}

#[test]
fn test_undo_redo_restore_serialization() -> anyhow::Result<()> {
    let (mut session, _) = session_with(config(SavePolicy::AfterEdits(100)))?;
    let original = serialized(&session, 0);

    edit(&mut session, "mod 3 2 obl", 0);
    edit(&mut session, "mod delete 1", 0);
    let edited = serialized(&session, 0);
    assert_ne!(edited, original);

    edit(&mut session, "mod undo", 0);
    let response = edit(&mut session, "mod undo", 0);
    assert!(!response.is_error());
    assert_eq!(serialized(&session, 0), original);
    let view = response.view.expect("sentence view");
    assert!(!view.can_undo);
    assert!(view.can_redo);

    let response = edit(&mut session, "mod undo", 0);
    assert_eq!(response.error.as_deref(), Some("No more undo possible"));

    edit(&mut session, "mod redo", 0);
    edit(&mut session, "mod redo", 0);
    assert_eq!(serialized(&session, 0), edited);
    let response = edit(&mut session, "mod redo", 0);
    assert_eq!(response.error.as_deref(), Some("No more redo possible"));
    Ok(())
}

#[test]
fn test_undo_keeps_counter_monotonic() -> anyhow::Result<()> {
    let (mut session, _) = session_with(config(SavePolicy::AfterEdits(100)))?;
    edit(&mut session, "mod lemma 2 croire", 0);
    assert_eq!(session.corpus().sentences()[0].modification(), 1);

    edit(&mut session, "mod undo", 0);
    assert_eq!(session.corpus().sentences()[0].modification(), 2);

    // A client holding the pre-undo counter is now stale.
    let response = session.process(&Request::new("mod lemma 2 croire", 0).observed(1));
    assert!(response.is_error());
    Ok(())
}

#[test]
fn test_save_policies() -> anyhow::Result<()> {
    let (mut session, recorder) = session_with(config(SavePolicy::AfterEdits(2)))?;
    edit(&mut session, "mod upos 1 PROPN", 0);
    assert!(recorder.saves.lock().unwrap().is_empty());
    edit(&mut session, "mod upos 2 AUX", 0);
    assert_eq!(recorder.saves.lock().unwrap().len(), 1);
    assert_eq!(session.pending_changes(), 0);

    let (mut session, recorder) = session_with(config(SavePolicy::OnSentenceChange))?;
    edit(&mut session, "mod upos 1 PROPN", 0);
    assert!(recorder.saves.lock().unwrap().is_empty());
    session.process(&Request::new("next", 0));
    let saves = recorder.saves.lock().unwrap();
    assert_eq!(saves.len(), 1);
    assert!(saves[0].contains("1\tIl\til\tPROPN\t"));
    Ok(())
}

#[test]
fn test_save_command() -> anyhow::Result<()> {
    let (mut session, recorder) = session_with(config(SavePolicy::AfterEdits(100)))?;
    let response = session.process(&Request::new("save", 0));
    assert_eq!(response.error.as_deref(), Some("no changes to be saved"));

    edit(&mut session, "mod form 4 lui", 0);
    let response = session.process(&Request::new("save", 0));
    assert_eq!(response.message.as_deref(), Some("saved 'fr.conllu'"));
    assert_eq!(response.changes, Some(0));
    assert_eq!(recorder.saves.lock().unwrap().len(), 1);
    Ok(())
}

#[test]
fn test_failed_save_keeps_edit() -> anyhow::Result<()> {
    let mut session = Session::new(
        Arc::new(EditorConfig::default()),
        parse_corpus(CORPUS)?,
        "fr.conllu",
        Box::new(MemorySink::failing("disk full")),
    );
    let response = edit(&mut session, "mod upos 1 PROPN", 0);
    assert_eq!(response.error.as_deref(), Some("Cannot save file: disk full"));
    assert_eq!(
        session.corpus().sentences()[0].token(1).map(|t| t.upos.as_str()),
        Some("PROPN")
    );
    assert_eq!(session.pending_changes(), 1);
    Ok(())
}

#[test]
fn test_browse_mode() -> anyhow::Result<()> {
    let (mut session, _) = session_with(EditorConfig {
        read_only: true,
        ..Default::default()
    })?;
    let before = serialized(&session, 0);
    let response = edit(&mut session, "mod upos 1 PROPN", 0);
    assert_eq!(response.error.as_deref(), Some("NO editing in browse mode"));
    let response = edit(&mut session, "replaceexpression false Upos:ADP > xpos:prep", 0);
    assert_eq!(response.error.as_deref(), Some("NO editing in browse mode"));
    assert_eq!(serialized(&session, 0), before);

    // Reading still works.
    assert!(!session.process(&Request::new("read 2", 0)).is_error());
    Ok(())
}

#[test]
fn test_command_errors() -> anyhow::Result<()> {
    let (mut session, _) = session_with(config(SavePolicy::AfterEdits(100)))?;
    let cases = [
        ("mod upos 1", "INVALID command length 'mod upos 1'"),
        ("mod ed foo 1 2", "INVALID ed command 'mod ed foo 1 2'"),
        ("mod upos 12 NOUN", "INVALID id 'mod upos 12 NOUN'"),
        ("read 3", "INVALID sentence number 'read 3'"),
        ("dance", "invalid command 'dance'"),
        ("mod join 2", "Cannot join last word"),
    ];
    for (command, expected) in cases {
        let response = edit(&mut session, command, 1);
        assert_eq!(response.error.as_deref(), Some(expected), "{}", command);
        assert_eq!(response.sentenceid, 1);
    }
    Ok(())
}

#[test]
fn test_searches() -> anyhow::Result<()> {
    let (mut session, _) = session_with(config(SavePolicy::AfterEdits(100)))?;

    let response = session.process(&Request::new("findsentid false 3$", 0));
    assert_eq!(response.sentenceid, 2);

    let response = session.process(&Request::new("findupos false ADP/DET", 0));
    assert_eq!(response.sentenceid, 2);
    let view = response.view.expect("sentence view");
    assert_eq!(view.highlight, Some(vec!["1".to_string(), "2".to_string()]));

    let response = session.process(&Request::new("findlemma true dormir", 2));
    assert_eq!(response.sentenceid, 1);

    let response = session.process(&Request::new("findexpression false Upos:NOUN", 2));
    assert_eq!(response.error.as_deref(), Some("Expression not found 'Upos:NOUN'"));
    assert_eq!(response.sentenceid, 2);

    let response = session.process(&Request::new("findsentid false (", 0));
    assert!(response
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("Bad regular expression")));
    Ok(())
}

#[test]
fn test_pattern_highlighting() -> anyhow::Result<()> {
    let (mut session, _) = session_with(config(SavePolicy::AfterEdits(100)))?;
    let response = session.process(&Request::new(
        "findhighlight false pattern { H [upos=NOUN]; H -[case]-> C }",
        0,
    ));
    assert_eq!(response.sentenceid, 2);
    let view = response.view.expect("sentence view");
    assert_eq!(view.highlight, Some(vec!["1".to_string(), "3".to_string()]));
    // Highlighting is not an edit.
    assert_eq!(session.pending_changes(), 0);

    let response = session.process(&Request::new(
        "findhighlight false pattern { X [upos=INTJ] }",
        0,
    ));
    assert_eq!(response.error.as_deref(), Some("Pattern not found"));
    Ok(())
}

#[test]
fn test_replace_expression() -> anyhow::Result<()> {
    let (mut session, _) = session_with(config(SavePolicy::AfterEdits(100)))?;
    let response = edit(&mut session, "replaceexpression false Upos:ADP > xpos:prep", 1);
    assert!(!response.is_error());
    // Sentence 1 has no ADP; the scan moves on to the next changed one.
    assert_eq!(response.sentenceid, 2);
    assert_eq!(session.pending_changes(), 2);
    let corpus = session.corpus();
    assert_eq!(corpus.sentences()[0].token(3).map(|t| t.xpos.as_str()), Some("prep"));
    assert_eq!(corpus.sentences()[2].token(1).map(|t| t.xpos.as_str()), Some("prep"));
    assert_eq!(corpus.sentences()[2].token(2).map(|t| t.xpos.as_str()), Some("_"));
    Ok(())
}

#[test]
fn test_create_subtree() -> anyhow::Result<()> {
    let (mut session, _) = session_with(config(SavePolicy::AfterEdits(100)))?;
    let response = session.process(&Request::new("createsubtree 4", 0));
    let subtree = response.view.and_then(|v| v.subtree).expect("subtree text");
    assert!(subtree.starts_with("# global.columns = ID FORM LEMMA UPOS XPOS FEATS HEAD DEPREL"));
    assert_eq!(subtree.lines().count(), 3);
    Ok(())
}

#[test]
fn test_shared_session_serializes_edits() -> anyhow::Result<()> {
    let (session, _) = session_with(config(SavePolicy::AfterEdits(1000)))?;
    let shared = SharedSession::new(session);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let shared = shared.clone();
            thread::spawn(move || {
                let value = if i % 2 == 0 { "X" } else { "Y" };
                for _ in 0..10 {
                    let observed = shared.with(|s| s.corpus().sentences()[1].modification());
                    let request = Request::new(format!("mod xpos 1 {}", value), 1).observed(observed);
                    shared.process(&request);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread");
    }

    shared.with(|session| {
        let sentence = &session.corpus().sentences()[1];
        // Only actual changes bump the counter or count as pending.
        assert_eq!(sentence.modification() as usize, session.pending_changes());
        assert!(session.pending_changes() >= 1);
    });
    Ok(())
}
