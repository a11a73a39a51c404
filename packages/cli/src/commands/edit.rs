use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::debug;
use treebank_editor::{BackupFile, DurableSave, InPlace, Request, Session};

#[derive(Debug, Args)]
pub struct EditArgs {
    /// CoNLL-U file to edit
    pub file: String,

    /// Reference annotation, for agreement scores
    #[arg(short, long)]
    pub gold: Option<String>,

    /// Reject every editing command
    #[arg(long)]
    pub read_only: bool,

    /// Save once this many edits are pending
    #[arg(long)]
    pub save_after: Option<usize>,

    /// Overwrite the file instead of writing a backup
    #[arg(long)]
    pub in_place: bool,
}

/// Runs one command per stdin line and prints one JSON response per line.
///
/// A line may start with `@<n> ` to address sentence `n` and with `~<m> `
/// to state the modification counter last seen. Without `~<m>`, the counter
/// of the last sentence printed is sent when the line addresses that
/// sentence, so edits need a fresh read of the sentence they change.
pub fn edit(args: EditArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let mut editor = config.editor.clone();
    if args.read_only {
        editor.read_only = true;
    }
    if let Some(count) = args.save_after {
        editor.save_after = count;
        editor.save_policy = None;
    }

    let path = config.resolve(cwd, &args.file);
    let corpus = super::load_corpus(&path)?;
    let saver: Box<dyn DurableSave> = if args.in_place || config.in_place {
        Box::new(InPlace)
    } else {
        Box::new(BackupFile::new(editor.backup_suffix.clone()))
    };
    let mut session = Session::new(Arc::new(editor), corpus, &path, saver);
    if let Some(gold) = args.gold.as_ref().or(config.gold.as_ref()) {
        session = session.with_gold(super::load_corpus(&config.resolve(cwd, gold))?);
    }

    eprintln!(
        "{} {} ({} sentences)",
        "Editing".bright_blue().bold(),
        path.display(),
        session.corpus().len()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let mut current = 0;
    let mut last_seen: Option<(usize, u64)> = None;
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let mut request = parse_request(line, current);
        if request.observed_modification.is_none() {
            if let Some((_, modification)) =
                last_seen.filter(|(index, _)| *index == request.sentence_id)
            {
                request = request.observed(modification);
            }
        }
        debug!(command = %request.command, sentence = request.sentence_id, "request");
        let response = session.process(&request);
        if !response.is_error() {
            current = response.sentenceid;
        }
        if let Some(view) = &response.view {
            last_seen = Some((response.sentenceid, view.modification));
        }
        writeln!(stdout, "{}", response.to_json())?;
        stdout.flush()?;
    }

    if session.pending_changes() > 0 {
        eprintln!(
            "{} {} unsaved changes",
            "⚠️".yellow(),
            session.pending_changes()
        );
    }
    Ok(())
}

fn parse_request(line: &str, current: usize) -> Request {
    let mut rest = line;
    let mut sentence = current;
    let mut observed = None;
    loop {
        let (prefix, tail) = rest.split_once(' ').unwrap_or((rest, ""));
        if let Some(n) = prefix.strip_prefix('@').and_then(|n| n.parse().ok()) {
            sentence = n;
        } else if let Some(m) = prefix.strip_prefix('~').and_then(|m| m.parse().ok()) {
            observed = Some(m);
        } else {
            break;
        }
        rest = tail.trim_start();
    }

    let request = Request::new(rest, sentence);
    match observed {
        Some(modification) => request.observed(modification),
        None => request,
    }
}
