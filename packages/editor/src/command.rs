//! # Editor Commands
//!
//! The textual command protocol, parsed into a closed set of commands.
//!
//! ## Design
//!
//! - Words are separated by runs of blanks
//! - Commands whose last argument is free text (field values, comments,
//!   metadata, search patterns) keep the rest of the line verbatim
//! - Ids are checked for syntax here; whether they exist in the current
//!   sentence is checked when the command runs
//!
//! ## Example
//!
//! ```rust,ignore
//! let command = Command::parse("mod upos 3 NOUN")?;
//! assert!(command.is_mutation());
//! ```

use crate::errors::EditorError;
use crate::search::SearchKind;
use std::fmt::Display;
use std::str::FromStr;
use treebank_conllu::schema::COLUMNS_HEADER;
use treebank_conllu::{Column, Field, MetadataEdit, TokenRef};

/// Which sentence `read` opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadTarget {
    Index(usize),
    Last,
}

/// Operations that change the document
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Set one column of a token
    SetField {
        target: TokenRef,
        field: Field,
        value: String,
    },

    SetPos {
        target: TokenRef,
        upos: String,
        xpos: String,
    },

    /// Insert or replace one `Key=Value` feature
    AddFeature { target: TokenRef, pair: String },

    /// Insert or replace one `Key=Value` misc entry
    AddMisc { target: TokenRef, pair: String },

    /// Duplicate a token, optionally cutting its form at a char offset
    Split { id: u32, offset: Option<usize> },

    /// Merge a token with the next one
    Join { id: u32 },

    Delete { id: u32 },

    /// Create a multiword token over `length` words starting at `id`
    Compose {
        id: u32,
        length: u32,
        form: Option<String>,
    },

    /// Turn a word into a multiword token made of new words
    ToMultiword { id: u32, forms: Vec<String> },

    /// Change (or delete, with `end == 0`) the multiword token at `start`
    EditMultiword {
        start: u32,
        end: u32,
        form: String,
        space_after: Option<bool>,
        misc: Option<String>,
    },

    Insert {
        id: u32,
        form: String,
        lemma: Option<String>,
        upos: Option<String>,
        xpos: Option<String>,
    },

    InsertEmpty {
        anchor: u32,
        form: String,
        lemma: Option<String>,
        upos: Option<String>,
        xpos: Option<String>,
    },

    DeleteEmpty { anchor: u32, sub: u32 },

    /// Split the current sentence before word `id`
    SentenceSplit { id: u32 },

    /// Append the next sentence to the current one
    SentenceJoin,

    EditMetadata(MetadataEdit),

    AddEnhanced {
        dep: TokenRef,
        head: TokenRef,
        label: String,
    },

    RemoveEnhanced { dep: TokenRef, head: TokenRef },

    /// Change the basic head (and optionally the label) of `dep`
    Reattach {
        dep: TokenRef,
        head: TokenRef,
        label: Option<String>,
    },

    Undo,
    Redo,

    /// Replace the free comment lines
    Comments(String),

    MarkDeprel { target: TokenRef, on: bool },
    MarkToken { target: TokenRef, on: bool },
}

impl Mutation {
    /// Whether the edit moves a sentence boundary
    pub fn crosses_sentences(&self) -> bool {
        matches!(self, Mutation::SentenceSplit { .. } | Mutation::SentenceJoin)
    }

    /// Display-only edits that neither bump the counter nor enter History.
    pub fn is_marker(&self) -> bool {
        matches!(
            self,
            Mutation::MarkDeprel { .. } | Mutation::MarkToken { .. }
        )
    }
}

/// One parsed request
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Next,
    Prec,
    Read(ReadTarget),
    /// Open the sentence holding a 1-based line of the file
    Line(usize),
    Find {
        kind: SearchKind,
        backwards: bool,
        pattern: String,
    },
    /// `condition > replacement` over the whole corpus
    ReplaceExpression { backwards: bool, rule: String },
    CreateSubtree {
        id: u32,
        columns: Option<Vec<Column>>,
    },
    Save,
    Edit(Mutation),
}

impl Command {
    pub fn parse(text: &str) -> Result<Self, EditorError> {
        CommandParser { text: text.trim() }.parse()
    }

    /// Mutating commands are rejected in browse mode and checked against the
    /// client's modification counter.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Command::Edit(_) | Command::ReplaceExpression { .. })
    }
}

/// Splits on runs of blanks into at most `limit` parts; the last part keeps
/// the rest of the line.
fn split_limit(text: &str, limit: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = text.trim();
    while parts.len() + 1 < limit {
        match rest.find(' ') {
            Some(i) => {
                parts.push(&rest[..i]);
                rest = rest[i..].trim_start_matches(' ');
            }
            None => break,
        }
    }
    if !rest.is_empty() {
        parts.push(rest);
    }
    parts
}

struct CommandParser<'a> {
    text: &'a str,
}

impl<'a> CommandParser<'a> {
    fn parse(&self) -> Result<Command, EditorError> {
        let words = split_limit(self.text, usize::MAX);
        let Some(&first) = words.first() else {
            return Err(self.invalid_command());
        };
        match first {
            "next" if words.len() == 1 => Ok(Command::Next),
            "prec" if words.len() == 1 => Ok(Command::Prec),
            "save" if words.len() == 1 => Ok(Command::Save),
            "read" => self.parse_read(&words),
            "line" => {
                if words.len() != 2 {
                    return Err(self.length());
                }
                let line = words[1]
                    .parse()
                    .map_err(|_| self.error("INVALID line number"))?;
                Ok(Command::Line(line))
            }
            "replaceexpression" => {
                let parts = split_limit(self.text, 3);
                if parts.len() != 3 {
                    return Err(self.syntax());
                }
                Ok(Command::ReplaceExpression {
                    backwards: parts[1].eq_ignore_ascii_case("true"),
                    rule: parts[2].to_string(),
                })
            }
            "createsubtree" => self.parse_create_subtree(),
            "mod" => self.parse_mod(&words),
            word => match SearchKind::from_command(word) {
                Some(kind) => self.parse_find(kind),
                None => Err(self.invalid_command()),
            },
        }
    }

    fn parse_read(&self, words: &[&str]) -> Result<Command, EditorError> {
        if words.len() != 2 {
            return Err(self.invalid_command());
        }
        if words[1] == "last" {
            return Ok(Command::Read(ReadTarget::Last));
        }
        words[1]
            .parse()
            .map(|n| Command::Read(ReadTarget::Index(n)))
            .map_err(|_| self.error("INVALID sentence number"))
    }

    fn parse_find(&self, kind: SearchKind) -> Result<Command, EditorError> {
        let parts = if kind.single_word() {
            split_limit(self.text, usize::MAX)
        } else {
            split_limit(self.text, 3)
        };
        if parts.len() != 3 {
            return Err(self.syntax());
        }
        Ok(Command::Find {
            kind,
            backwards: parts[1].eq_ignore_ascii_case("true"),
            pattern: parts[2].to_string(),
        })
    }

    fn parse_create_subtree(&self) -> Result<Command, EditorError> {
        let parts = split_limit(self.text, 3);
        if parts.len() < 2 {
            return Err(self.length());
        }
        let id = self.id(parts[1])?;
        let columns = parts.get(2).map(|rest| {
            let names = rest.strip_prefix(COLUMNS_HEADER).unwrap_or(rest);
            names.split_whitespace().map(Column::from_name).collect()
        });
        Ok(Command::CreateSubtree { id, columns })
    }

    fn parse_mod(&self, words: &[&str]) -> Result<Command, EditorError> {
        if words.len() < 2 {
            return Err(self.length());
        }
        let mutation = match words[1] {
            "upos" | "xpos" | "lemma" | "form" | "deprel" | "enhdeps" | "feat" | "feats"
            | "misc" => {
                let parts = self.at_least(4, 4)?;
                let field = match parts[1] {
                    "upos" => Field::Upos,
                    "xpos" => Field::Xpos,
                    "lemma" => Field::Lemma,
                    "form" => Field::Form,
                    "deprel" => Field::Deprel,
                    "enhdeps" => Field::Deps,
                    "misc" => Field::Misc,
                    _ => Field::Feats,
                };
                Mutation::SetField {
                    target: self.token_ref(parts[2])?,
                    field,
                    value: parts[3].to_string(),
                }
            }
            "extracol" => {
                let parts = self.at_least(5, 5)?;
                Mutation::SetField {
                    target: self.token_ref(parts[2])?,
                    field: Field::Extra(parts[3].to_string()),
                    value: parts[4].to_string(),
                }
            }
            "pos" => {
                let parts = self.at_least(5, 5)?;
                Mutation::SetPos {
                    target: self.token_ref(parts[2])?,
                    upos: parts[3].to_string(),
                    xpos: parts[4].to_string(),
                }
            }
            "addfeat" | "addmisc" => {
                let parts = self.at_least(4, 4)?;
                let target = self.token_ref(parts[2])?;
                let pair = parts[3].to_string();
                if parts[1] == "addfeat" {
                    Mutation::AddFeature { target, pair }
                } else {
                    Mutation::AddMisc { target, pair }
                }
            }
            "split" => {
                let parts = self.at_least(3, usize::MAX)?;
                let offset = match parts.get(3) {
                    Some(value) => Some(value.parse::<usize>().map_err(|e| {
                        self.error_with("INVALID splitpos (not an integer)", e)
                    })?),
                    None => None,
                };
                Mutation::Split {
                    id: self.id(parts[2])?,
                    offset,
                }
            }
            "join" => Mutation::Join {
                id: self.id(self.at_least(3, usize::MAX)?[2])?,
            },
            "delete" => Mutation::Delete {
                id: self.id(self.at_least(3, usize::MAX)?[2])?,
            },
            "compose" => {
                let parts = self.at_least(4, 5)?;
                Mutation::Compose {
                    id: self.id(parts[2])?,
                    length: self.id(parts[3])?,
                    form: parts.get(4).map(|f| f.to_string()),
                }
            }
            "tomwt" => {
                let parts = self.at_least(5, usize::MAX)?;
                Mutation::ToMultiword {
                    id: self.id(parts[2])?,
                    forms: parts[3..].iter().map(|f| f.to_string()).collect(),
                }
            }
            "editmwt" | "editmwe" => {
                let parts = self.at_least(5, 7)?;
                let space_after = match parts.get(5) {
                    Some(flag) => Some(self.flag(flag)?),
                    None => None,
                };
                Mutation::EditMultiword {
                    start: self.id(parts[2])?,
                    end: self.id(parts[3])?,
                    form: parts[4].to_string(),
                    space_after,
                    misc: parts.get(6).map(|m| m.to_string()),
                }
            }
            "insert" | "emptyinsert" => {
                let parts = self.at_least(4, usize::MAX)?;
                let optional = |i: usize| parts.get(i).map(|v| v.to_string());
                let id = self.id(parts[2])?;
                let form = parts[3].to_string();
                if parts[1] == "insert" {
                    Mutation::Insert {
                        id,
                        form,
                        lemma: optional(4),
                        upos: optional(5),
                        xpos: optional(6),
                    }
                } else {
                    Mutation::InsertEmpty {
                        anchor: id,
                        form,
                        lemma: optional(4),
                        upos: optional(5),
                        xpos: optional(6),
                    }
                }
            }
            "emptydelete" => {
                let parts = self.at_least(3, usize::MAX)?;
                match self.token_ref(parts[2])? {
                    TokenRef::Enhanced(anchor, sub) => Mutation::DeleteEmpty { anchor, sub },
                    TokenRef::Ordinary(_) => return Err(self.error("INVALID id")),
                }
            }
            "sentsplit" => Mutation::SentenceSplit {
                id: self.id(self.at_least(3, usize::MAX)?[2])?,
            },
            "sentjoin" => Mutation::SentenceJoin,
            "editmetadata" => {
                let parts = self.at_least(3, 3)?;
                let edit: MetadataEdit = serde_json::from_str(parts[2]).map_err(|e| {
                    EditorError::validation(format!("INVALID metadata '{}': {}", self.text, e))
                })?;
                Mutation::EditMetadata(edit)
            }
            "ed" => self.parse_enhanced()?,
            "undo" => Mutation::Undo,
            "redo" => Mutation::Redo,
            "comments" => {
                let parts = self.at_least(3, 3)?;
                Mutation::Comments(parts[2].to_string())
            }
            "checkdeprel" | "checktoken" => {
                let parts = self.at_least(4, 4)?;
                let target = self.token_ref(parts[2])?;
                let on = self.flag(parts[3])?;
                if parts[1] == "checkdeprel" {
                    Mutation::MarkDeprel { target, on }
                } else {
                    Mutation::MarkToken { target, on }
                }
            }
            _ => {
                let parts = self.at_least(3, 4)?;
                Mutation::Reattach {
                    dep: self.token_ref(parts[1])?,
                    head: self.token_ref(parts[2])?,
                    label: parts.get(3).map(|l| l.to_string()),
                }
            }
        };
        Ok(Command::Edit(mutation))
    }

    fn parse_enhanced(&self) -> Result<Mutation, EditorError> {
        let parts = self.at_least(5, 6)?;
        let dep = self.token_ref(parts[3])?;
        let head = self.token_ref(parts[4])?;
        match (parts[2], parts.get(5)) {
            ("add", Some(label)) => Ok(Mutation::AddEnhanced {
                dep,
                head,
                label: label.to_string(),
            }),
            ("add", None) => Err(self.length()),
            ("del", _) => Ok(Mutation::RemoveEnhanced { dep, head }),
            _ => Err(self.error("INVALID ed command")),
        }
    }

    /// Splits into at most `limit` parts and requires at least `min`.
    fn at_least(&self, min: usize, limit: usize) -> Result<Vec<&'a str>, EditorError> {
        let parts = split_limit(self.text, limit);
        if parts.len() < min {
            return Err(self.length());
        }
        Ok(parts)
    }

    fn id(&self, text: &str) -> Result<u32, EditorError> {
        text.parse::<u32>()
            .map_err(|e| self.error_with("INVALID id (not an integer)", e))
    }

    fn token_ref(&self, text: &str) -> Result<TokenRef, EditorError> {
        TokenRef::from_str(text).map_err(|e| self.error_with("INVALID id (not an integer)", e))
    }

    fn flag(&self, text: &str) -> Result<bool, EditorError> {
        match text.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.syntax()),
        }
    }

    fn error(&self, prefix: &str) -> EditorError {
        EditorError::validation(format!("{} '{}'", prefix, self.text))
    }

    fn error_with(&self, prefix: &str, detail: impl Display) -> EditorError {
        EditorError::validation(format!("{} '{}' {}", prefix, self.text, detail))
    }

    fn length(&self) -> EditorError {
        self.error("INVALID command length")
    }

    fn syntax(&self) -> EditorError {
        self.error("INVALID syntax")
    }

    fn invalid_command(&self) -> EditorError {
        self.error("invalid command")
    }
}
