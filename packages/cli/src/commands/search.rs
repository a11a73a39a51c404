use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use treebank_conllu::Corpus;
use treebank_pattern::{GraphPattern, SubtreePattern};
use treebank_query::render_error;

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// CoNLL-U file to search
    pub file: String,

    /// Graph pattern, or subtree rows with --subtree
    pub pattern: String,

    /// Read the pattern from this file
    #[arg(long)]
    pub from_file: bool,

    /// Treat the pattern as CoNLL-U subtree rows
    #[arg(long)]
    pub subtree: bool,

    /// Print matches as JSON lines
    #[arg(long)]
    pub json: bool,
}

pub fn search(args: SearchArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let corpus = super::load_corpus(&config.resolve(cwd, &args.file))?;
    let pattern = if args.from_file {
        fs::read_to_string(config.resolve(cwd, &args.pattern))?
    } else {
        args.pattern.clone()
    };

    let found = if args.subtree {
        search_subtree(&corpus, &pattern, args.json)?
    } else {
        search_graph(&corpus, &pattern, args.json)?
    };

    if !args.json {
        println!();
        if found == 0 {
            println!("{}", "No match".yellow());
        } else {
            println!("{} {} sentences match", "✓".green(), found);
        }
    }
    Ok(())
}

fn search_graph(corpus: &Corpus, source: &str, json: bool) -> Result<usize> {
    let pattern = match GraphPattern::parse(source) {
        Ok(pattern) => pattern,
        Err(err) => {
            eprintln!("{}", render_error(source, "pattern", &err));
            return Err(anyhow!("invalid pattern"));
        }
    };

    let results = pattern.find_in_corpus(corpus);
    for (index, matches) in &results {
        if json {
            let line = serde_json::json!({
                "sentence": index,
                "sentId": corpus.get(*index).and_then(|s| s.sent_id()),
                "matches": matches,
            });
            println!("{}", line);
            continue;
        }
        println!(
            "{} {}",
            super::sentence_label(corpus, *index).bright_white().bold(),
            corpus.get(*index).map(|s| s.text()).unwrap_or_default().dimmed()
        );
        for m in matches {
            let bindings: Vec<String> = m
                .bindings
                .iter()
                .map(|(name, id)| format!("{}={}", name.cyan(), id))
                .collect();
            println!("    {}", bindings.join(" "));
        }
    }
    Ok(results.len())
}

fn search_subtree(corpus: &Corpus, source: &str, json: bool) -> Result<usize> {
    let pattern = SubtreePattern::parse(source)?;
    let mut found = 0;
    for (index, sentence) in corpus.sentences().iter().enumerate() {
        let ids = pattern.find(sentence);
        if ids.is_empty() {
            continue;
        }
        found += 1;
        if json {
            let line = serde_json::json!({
                "sentence": index,
                "sentId": sentence.sent_id(),
                "ids": ids,
            });
            println!("{}", line);
        } else {
            let ids: Vec<String> = ids.iter().map(u32::to_string).collect();
            println!(
                "{} {}",
                super::sentence_label(corpus, index).bright_white().bold(),
                ids.join(",").cyan()
            );
        }
    }
    Ok(found)
}
