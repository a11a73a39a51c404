//! # Edit Session Management
//!
//! One open document, edited by any number of clients through a single
//! command loop.
//!
//! ## Design
//!
//! - Every request names the sentence the client is looking at
//! - Editing requests carry the modification counter the client last saw;
//!   a missing or older counter means the client may be out of date and the
//!   request is rejected without touching anything
//! - Successful edits push the previous sentences onto History and count as
//!   one pending change; the save policy decides when pending changes are
//!   written out
//! - Sentence splits and joins are recorded too: a History entry covers as
//!   many sentences as the edited text occupied at that point
//! - Any command outside the `mod` family discards History
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut session = Session::open(Arc::new(EditorConfig::default()), "fr.conllu")?;
//! let response = session.process(&Request::new("mod upos 2 NOUN", 0).observed(0));
//! println!("{}", response.to_json());
//! ```

use crate::command::{Command, Mutation, ReadTarget};
use crate::config::{EditorConfig, SavePolicy};
use crate::errors::EditorError;
use crate::history::{History, Snapshot};
use crate::persist::{BackupFile, DurableSave};
use crate::response::{Response, SentenceView, ViewContext};
use crate::search::{scan, Search, SearchKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};
use treebank_conllu::{
    parse_corpus, Corpus, EditError, EditResult, OrphanPolicy, Sentence, TagSets, TokenRef,
};
use treebank_pattern::{extract_subtree, matched_ids, GraphPattern};
use treebank_query::{apply_rule, parse_rule};

/// One client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: String,

    /// Index of the sentence the client is looking at
    pub sentence_id: usize,

    /// Free text describing the edit, passed on to the save strategy
    pub edit_comment: Option<String>,

    /// Modification counter of the sentence as the client last saw it
    pub observed_modification: Option<u64>,
}

impl Request {
    pub fn new(command: impl Into<String>, sentence_id: usize) -> Self {
        Self {
            command: command.into(),
            sentence_id,
            edit_comment: None,
            observed_modification: None,
        }
    }

    pub fn observed(mut self, modification: u64) -> Self {
        self.observed_modification = Some(modification);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.edit_comment = Some(comment.into());
        self
    }
}

/// The open document and everything needed to edit it
pub struct Session {
    config: Arc<EditorConfig>,
    corpus: Corpus,
    path: PathBuf,

    /// Reference annotation, for agreement scores
    gold: Option<Corpus>,

    history: History,

    /// Sentence the History belongs to
    history_sentence: Option<usize>,

    /// Sentences the live state covers, starting at `history_sentence`
    history_span: usize,

    /// Edits since the last save
    changes: usize,

    saver: Box<dyn DurableSave>,
    tags: TagSets,
}

impl Session {
    pub fn new(
        config: Arc<EditorConfig>,
        corpus: Corpus,
        path: impl Into<PathBuf>,
        saver: Box<dyn DurableSave>,
    ) -> Self {
        Self {
            history: History::new(config.history_capacity),
            tags: config.tag_sets(),
            config,
            corpus,
            path: path.into(),
            gold: None,
            history_sentence: None,
            history_span: 1,
            changes: 0,
            saver,
        }
    }

    /// Loads a file, saving to a backup next to it.
    pub fn open(config: Arc<EditorConfig>, path: impl AsRef<Path>) -> Result<Self, EditorError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let corpus = parse_corpus(&source)?;
        info!(
            path = %path.display(),
            sentences = corpus.len(),
            "loaded corpus"
        );
        let saver = Box::new(BackupFile::new(config.backup_suffix.clone()));
        Ok(Self::new(config, corpus, path, saver))
    }

    pub fn with_gold(mut self, gold: Corpus) -> Self {
        self.gold = Some(gold);
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pending_changes(&self) -> usize {
        self.changes
    }

    pub fn can_undo(&self, index: usize) -> bool {
        self.history_sentence == Some(index) && self.history.can_undo()
    }

    pub fn can_redo(&self, index: usize) -> bool {
        self.history_sentence == Some(index) && self.history.can_redo()
    }

    /// Runs one request. Failures are reported in the response; the document
    /// is left as it was before the failing step.
    pub fn process(&mut self, request: &Request) -> Response {
        let index = self.clamp(request.sentence_id);
        debug!(command = %request.command, sentence = index, "processing");
        match self.execute(request, index) {
            Ok(response) => response,
            Err(error) => {
                debug!(%error, "command failed");
                Response::error(index, self.corpus.len(), error.to_string())
            }
        }
    }

    fn clamp(&self, index: usize) -> usize {
        index.min(self.corpus.len().saturating_sub(1))
    }

    fn execute(&mut self, request: &Request, index: usize) -> Result<Response, EditorError> {
        let text = request.command.trim();
        let command = Command::parse(text)?;
        if self.corpus.is_empty() {
            return Err(EditorError::validation("no sentences loaded"));
        }
        if !command.is_mutation() {
            return self.navigate(command, text, index);
        }

        if self.config.read_only {
            return Err(EditorError::ReadOnly);
        }
        let current = self.sentence(index)?.modification();
        let Some(observed) = request.observed_modification else {
            warn!(sentence = index, current, "rejected edit without counter");
            return Err(EditorError::missing_counter(current));
        };
        if observed < current {
            warn!(sentence = index, observed, current, "rejected stale edit");
            return Err(EditorError::stale(observed, current));
        }
        let message = request.edit_comment.as_deref().unwrap_or(text);
        match command {
            Command::ReplaceExpression { backwards, rule } => {
                self.replace_expression(index, backwards, &rule, message)
            }
            Command::Edit(mutation) => self.edit(index, mutation, text, message),
            _ => Err(EditorError::validation(format!("invalid command '{}'", text))),
        }
    }

    fn sentence(&self, index: usize) -> Result<&Sentence, EditorError> {
        self.corpus
            .get(index)
            .ok_or_else(|| EditorError::validation(format!("INVALID sentence number '{}'", index)))
    }

    fn navigate(
        &mut self,
        command: Command,
        text: &str,
        index: usize,
    ) -> Result<Response, EditorError> {
        self.reset_history(None);
        if self.config.save_policy() == SavePolicy::OnSentenceChange
            && self.changes > 0
            && command != Command::Save
        {
            self.save_now("save on sentence change")?;
        }

        let last = self.corpus.len() - 1;
        match command {
            Command::Next => Ok(self.render(last.min(index + 1), None)),
            Command::Prec => Ok(self.render(index.saturating_sub(1), None)),
            Command::Read(ReadTarget::Last) => Ok(self.render(last, None)),
            Command::Read(ReadTarget::Index(n)) => {
                if n > last {
                    return Err(EditorError::validation(format!(
                        "INVALID sentence number '{}'",
                        text
                    )));
                }
                Ok(self.render(n, None))
            }
            Command::Line(line) => match self.corpus.sentence_at_line(line) {
                Some(found) => Ok(self.render(found, None)),
                None => Err(EditorError::validation(format!(
                    "INVALID line number '{}'",
                    text
                ))),
            },
            Command::Find {
                kind: SearchKind::Highlight,
                backwards,
                pattern,
            } => self.highlight(index, backwards, &pattern),
            Command::Find {
                kind,
                backwards,
                pattern,
            } => {
                let search = Search::compile(kind, &pattern, text)?;
                match scan(self.corpus.sentences(), index, backwards, |s| search.matches(s)) {
                    Some(hit) => Ok(self.render(hit.index, Some(&hit.highlight))),
                    None => Err(EditorError::validation(search.not_found())),
                }
            }
            Command::CreateSubtree { id, columns } => {
                let sentence = self.sentence(index)?;
                let subtree = extract_subtree(sentence, id, columns.as_deref())
                    .ok_or_else(|| EditorError::validation(format!("INVALID id '{}'", text)))?;
                let mut response = self.render(index, None);
                if let Some(view) = response.view.as_mut() {
                    view.subtree = Some(subtree);
                }
                Ok(response)
            }
            Command::Save => {
                if self.changes == 0 {
                    return Err(EditorError::validation("no changes to be saved"));
                }
                let saved = self.save_now("save")?;
                Ok(Response::message(
                    index,
                    self.corpus.len(),
                    format!("saved '{}'", saved.display()),
                    self.changes,
                ))
            }
            Command::ReplaceExpression { .. } | Command::Edit(_) => Err(EditorError::validation(
                format!("invalid command '{}'", text),
            )),
        }
    }

    /// Marks every token bound by a graph pattern, then moves to the next
    /// sentence holding a mark.
    fn highlight(
        &mut self,
        index: usize,
        backwards: bool,
        source: &str,
    ) -> Result<Response, EditorError> {
        let pattern = GraphPattern::parse(source)?;
        for sentence in self.corpus.sentences_mut() {
            sentence.clear_highlights();
        }
        let results = pattern.find_in_corpus(&self.corpus);
        for (found, matches) in &results {
            if let Some(sentence) = self.corpus.get_mut(*found) {
                for id in matched_ids(matches) {
                    sentence.mark_token(TokenRef::Ordinary(id), true)?;
                }
            }
        }
        info!(sentences = results.len(), "highlighted pattern matches");

        let hit = scan(self.corpus.sentences(), index, backwards, |s| {
            let marked = s.highlighted();
            (!marked.is_empty()).then_some(marked)
        });
        match hit {
            Some(hit) => Ok(self.render(hit.index, Some(&hit.highlight))),
            None => Err(EditorError::validation("Pattern not found")),
        }
    }

    fn replace_expression(
        &mut self,
        index: usize,
        backwards: bool,
        source: &str,
        message: &str,
    ) -> Result<Response, EditorError> {
        let rule = parse_rule(source)?;
        let mut warnings = Vec::new();
        let mut changed = Vec::new();
        let mut tokens = 0;
        for (i, sentence) in self.corpus.sentences_mut().iter_mut().enumerate() {
            let n = apply_rule(sentence, &rule, &mut warnings);
            if n > 0 {
                changed.push(i);
                tokens += n;
            }
        }
        for warning in &warnings {
            warn!(%warning, rule = rule.source(), "replacement skipped");
        }
        self.reset_history(None);
        info!(
            rule = rule.source(),
            sentences = changed.len(),
            tokens,
            "applied replacement"
        );

        let target = if changed.contains(&index) {
            index
        } else if backwards {
            changed.iter().rev().find(|i| **i < index).copied().unwrap_or(index)
        } else {
            changed.iter().find(|i| **i > index).copied().unwrap_or(index)
        };
        if tokens > 0 {
            self.changes += tokens;
            self.apply_save_policy(message)?;
        }
        Ok(self.render(target, None))
    }

    fn edit(
        &mut self,
        index: usize,
        mutation: Mutation,
        text: &str,
        message: &str,
    ) -> Result<Response, EditorError> {
        if self.history_sentence != Some(index) {
            self.reset_history(Some(index));
        }
        if mutation.crosses_sentences() {
            return self.edit_sentences(index, mutation, message);
        }
        match mutation {
            Mutation::Undo | Mutation::Redo => {
                let current = self.window(index, self.history_span);
                let counter = current.iter().map(Sentence::modification).max().unwrap_or(0);
                let restored = if mutation == Mutation::Undo {
                    self.history
                        .undo(current)
                        .ok_or_else(|| EditorError::validation("No more undo possible"))?
                } else {
                    self.history
                        .redo(current)
                        .ok_or_else(|| EditorError::validation("No more redo possible"))?
                };
                self.install(index, restored, counter + 1);
                self.record_change(message)?;
            }
            mutation => {
                let policy = self.config.orphan_policy;
                let before = (!mutation.is_marker()).then(|| self.window(index, self.history_span));
                let sentence = self
                    .corpus
                    .get_mut(index)
                    .ok_or_else(|| EditorError::validation(format!("INVALID id '{}'", text)))?;
                let changed = apply_mutation(sentence, &mutation, policy)
                    .map_err(|e| id_error(e, text))?;
                if let (true, Some(before)) = (changed, before) {
                    self.history.push(before);
                    self.record_change(message)?;
                }
            }
        }
        Ok(self.render(index, None))
    }

    /// Sentence split or join. The History entry holds every sentence the
    /// edit touches, so undo puts the old boundaries back.
    fn edit_sentences(
        &mut self,
        index: usize,
        mutation: Mutation,
        message: &str,
    ) -> Result<Response, EditorError> {
        let (covered, after) = match mutation {
            Mutation::SentenceJoin => {
                let covered = self.history_span.max(2);
                (covered, covered - 1)
            }
            _ => (self.history_span, self.history_span + 1),
        };
        let before = self.window(index, covered);
        match mutation {
            Mutation::SentenceSplit { id } => self.corpus.split_sentence(index, id)?,
            _ => self.corpus.join_sentence(index)?,
        }
        self.history.push(before);
        self.history_span = after;
        self.record_change(message)?;
        Ok(self.render(index, None))
    }

    /// Copies of `count` sentences from `index`, fewer at the end of the file
    fn window(&self, index: usize, count: usize) -> Snapshot {
        let sentences = self.corpus.sentences();
        let start = index.min(sentences.len());
        let end = (start + count).min(sentences.len());
        sentences[start..end].to_vec()
    }

    /// Puts a History entry in place of the live window. Every restored
    /// sentence gets `modification`.
    fn install(&mut self, index: usize, mut sentences: Snapshot, modification: u64) {
        for sentence in sentences.iter_mut() {
            sentence.set_modification(modification);
        }
        let covered = std::mem::replace(&mut self.history_span, sentences.len());
        self.corpus.splice(index, covered, sentences);
    }

    fn reset_history(&mut self, sentence: Option<usize>) {
        self.history.clear();
        self.history_sentence = sentence;
        self.history_span = 1;
    }

    fn record_change(&mut self, message: &str) -> Result<(), EditorError> {
        self.changes += 1;
        self.apply_save_policy(message)
    }

    fn apply_save_policy(&mut self, message: &str) -> Result<(), EditorError> {
        match self.config.save_policy() {
            SavePolicy::AfterEdits(n) if self.changes >= n => {
                self.save_now(message)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Writes the whole corpus. Pending changes are kept when the write fails.
    fn save_now(&mut self, message: &str) -> Result<PathBuf, EditorError> {
        let content = self.corpus.to_conllu();
        let saved = self.saver.save(&self.path, &content, message)?;
        info!(path = %saved.display(), changes = self.changes, "saved corpus");
        self.changes = 0;
        Ok(saved)
    }

    fn render(&self, index: usize, highlight: Option<&[TokenRef]>) -> Response {
        let Some(sentence) = self.corpus.get(index) else {
            return Response::error(index, self.corpus.len(), "INVALID sentence number");
        };
        let view = SentenceView::new(
            sentence,
            ViewContext {
                tags: Some(&self.tags),
                gold: self.gold.as_ref().and_then(|gold| gold.get(index)),
                can_undo: self.can_undo(index),
                can_redo: self.can_redo(index),
                highlight,
            },
        );
        Response::sentence(index, self.corpus.len(), self.changes, view)
    }
}

/// Applies a single-sentence edit. Returns whether the sentence changed in a
/// way that History should record.
fn apply_mutation(
    sentence: &mut Sentence,
    mutation: &Mutation,
    policy: OrphanPolicy,
) -> EditResult<bool> {
    match mutation {
        Mutation::SetField {
            target,
            field,
            value,
        } => sentence.set_field(*target, field, value),
        Mutation::SetPos { target, upos, xpos } => sentence.set_pos(*target, upos, xpos),
        Mutation::AddFeature { target, pair } => sentence.add_feature(*target, pair),
        Mutation::AddMisc { target, pair } => sentence.add_misc(*target, pair),
        Mutation::Split { id, offset } => sentence.split_token(*id, *offset).map(|_| true),
        Mutation::Join { id } => sentence.join_token(*id).map(|_| true),
        Mutation::Delete { id } => sentence.delete_token(*id, policy).map(|_| true),
        Mutation::Compose { id, length, form } => sentence
            .compose_multiword(*id, *length, form.as_deref())
            .map(|_| true),
        Mutation::ToMultiword { id, forms } => {
            sentence.token_to_multiword(*id, forms).map(|_| true)
        }
        Mutation::EditMultiword {
            start,
            end,
            form,
            space_after,
            misc,
        } => sentence.edit_multiword_span(*start, *end, form, *space_after, misc.as_deref()),
        Mutation::Insert {
            id,
            form,
            lemma,
            upos,
            xpos,
        } => sentence
            .insert_token(*id, form, lemma.as_deref(), upos.as_deref(), xpos.as_deref())
            .map(|_| true),
        Mutation::InsertEmpty {
            anchor,
            form,
            lemma,
            upos,
            xpos,
        } => sentence
            .insert_empty_node(*anchor, form, lemma.as_deref(), upos.as_deref(), xpos.as_deref())
            .map(|_| true),
        Mutation::DeleteEmpty { anchor, sub } => {
            sentence.delete_empty_node(*anchor, *sub).map(|_| true)
        }
        Mutation::EditMetadata(edit) => sentence.edit_metadata(edit),
        Mutation::AddEnhanced { dep, head, label } => sentence.add_enhanced_edge(*dep, *head, label),
        Mutation::RemoveEnhanced { dep, head } => {
            sentence.remove_enhanced_edge(*dep, *head).map(|_| true)
        }
        Mutation::Reattach { dep, head, label } => {
            sentence.reattach(*dep, *head, label.as_deref())
        }
        Mutation::Comments(text) => Ok(sentence.set_comments(text)),
        Mutation::MarkDeprel { target, on } => sentence.mark_deprel(*target, *on).map(|_| false),
        Mutation::MarkToken { target, on } => sentence.mark_token(*target, *on).map(|_| false),
        // Handled by the session.
        Mutation::Undo | Mutation::Redo | Mutation::SentenceSplit { .. } | Mutation::SentenceJoin => {
            Ok(false)
        }
    }
}

fn id_error(error: EditError, command: &str) -> EditorError {
    match error {
        EditError::InvalidId(_) => EditorError::validation(format!("INVALID id '{}'", command)),
        other => other.into(),
    }
}

/// A session shared between client threads. Commands and saves run one at a
/// time.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn process(&self, request: &Request) -> Response {
        // Edits validate before applying, so a poisoned session is consistent.
        let mut session = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        session.process(request)
    }

    /// Runs `f` with exclusive access to the session.
    pub fn with<T>(&self, f: impl FnOnce(&mut Session) -> T) -> T {
        let mut session = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }
}
