use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use treebank_conllu::{Corpus, TagSets, ValidationCounts};

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// CoNLL-U files to validate
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Print per-sentence counts as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Exit with an error when any sentence has problems
    #[arg(long)]
    pub strict: bool,
}

pub fn validate(args: ValidateArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let tags = config.editor.tag_sets();

    let mut problems = 0;
    for file in &args.files {
        let path = config.resolve(cwd, file);
        let corpus = match super::load_corpus(&path) {
            Ok(corpus) => corpus,
            Err(e) => {
                problems += 1;
                eprintln!("  {} {} - {}", "✗".red(), file, format!("{:#}", e).red());
                continue;
            }
        };

        let flagged = check_corpus(&corpus, &tags);
        problems += flagged.len();
        if args.json {
            for (index, counts) in &flagged {
                let line = serde_json::json!({
                    "file": file,
                    "sentence": index,
                    "sentId": corpus.get(*index).and_then(|s| s.sent_id()),
                    "errors": counts,
                });
                println!("{}", line);
            }
            continue;
        }

        if flagged.is_empty() {
            println!("  {} {} ({} sentences)", "✓".green(), file, corpus.len());
            continue;
        }
        println!(
            "  {} {} - {} of {} sentences flagged",
            "✗".red(),
            file,
            flagged.len(),
            corpus.len()
        );
        for (index, counts) in &flagged {
            println!(
                "      {} {}",
                super::sentence_label(&corpus, *index).bright_white(),
                describe(counts).yellow()
            );
        }
    }

    if problems > 0 && args.strict {
        return Err(anyhow!("{} problems found", problems));
    }
    Ok(())
}

/// Sentences whose counts are not clean
fn check_corpus(corpus: &Corpus, tags: &TagSets) -> Vec<(usize, ValidationCounts)> {
    corpus
        .sentences()
        .iter()
        .enumerate()
        .map(|(index, sentence)| (index, sentence.validation_counts(tags)))
        .filter(|(_, counts)| !counts.is_clean())
        .collect()
}

fn describe(counts: &ValidationCounts) -> String {
    let parts = [
        ("roots", counts.heads),
        ("bad roots", counts.badroots),
        ("in cycles", counts.cycles),
        ("invalid UPOS", counts.invalid_upos),
        ("invalid XPOS", counts.invalid_xpos),
        ("invalid deprels", counts.invalid_deprels),
        ("invalid features", counts.invalid_features),
    ];
    parts
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(label, n)| format!("{} {}", n, label))
        .collect::<Vec<_>>()
        .join(", ")
}
