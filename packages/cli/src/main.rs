mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    edit, replace, search, validate, EditArgs, ReplaceArgs, SearchArgs, ValidateArgs,
};

/// Treebank CLI - edit, search and check dependency annotations
#[derive(Parser, Debug)]
#[command(name = "treebank")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Edit a file interactively, one command per stdin line
    Edit(EditArgs),

    /// Apply a file of replacement rules to every sentence
    Replace(ReplaceArgs),

    /// Find sentences matching a graph or subtree pattern
    Search(SearchArgs),

    /// Report tree-shape and tagset problems
    Validate(ValidateArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| {
            let cwd = cwd.display().to_string();
            match cli.command {
                Command::Edit(args) => edit(args, &cwd),
                Command::Replace(args) => replace(args, &cwd),
                Command::Search(args) => search(args, &cwd),
                Command::Validate(args) => validate(args, &cwd),
            }
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
