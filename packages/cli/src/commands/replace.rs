use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use tracing::warn;
use treebank_conllu::write_corpus;
use treebank_query::{apply_rules, parse_rules, render_error};

#[derive(Debug, Args)]
pub struct ReplaceArgs {
    /// CoNLL-U file to rewrite
    pub file: String,

    /// Rule file, one `condition > replacement` per line
    pub rules: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Report what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

pub fn replace(args: ReplaceArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let path = config.resolve(cwd, &args.file);
    let rules_path = config.resolve(cwd, &args.rules);

    let rules_source = fs::read_to_string(&rules_path)?;
    let rules = match parse_rules(&rules_source) {
        Ok(rules) => rules,
        Err(err) => {
            eprintln!("{}", render_error(&rules_source, &args.rules, &err));
            return Err(anyhow!("invalid rule file {}", rules_path.display()));
        }
    };

    let mut corpus = super::load_corpus(&path)?;
    let mut warnings = Vec::new();
    let report = apply_rules(&mut corpus, &rules, &mut warnings);

    for warning in &warnings {
        warn!(%warning, "rule warning");
        eprintln!("  {} {}", "⚠️".yellow(), warning);
    }

    eprintln!(
        "{} {} rules, {} tokens changed in {} sentences",
        "✓".green(),
        rules.len(),
        report.changed_tokens,
        report.changed_sentences.len()
    );
    for index in &report.changed_sentences {
        eprintln!("    {}", super::sentence_label(&corpus, *index).dimmed());
    }

    if args.dry_run {
        return Ok(());
    }

    let output = write_corpus(&corpus);
    match &args.output {
        Some(out) => {
            let out_path = config.resolve(cwd, out);
            fs::write(&out_path, output)?;
            eprintln!("  {} {}", "→".bright_blue(), out_path.display());
        }
        None => print!("{}", output),
    }
    Ok(())
}
