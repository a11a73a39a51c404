//! Column layout of a tabular file (`# global.columns = ...`).

use crate::error::{FormatError, FormatResult};
use std::fmt;

pub const COLUMNS_HEADER: &str = "# global.columns =";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Form,
    Lemma,
    Upos,
    Xpos,
    Feats,
    Head,
    Deprel,
    Deps,
    Misc,
    Extra(String),
}

impl Column {
    pub fn from_name(name: &str) -> Column {
        match name {
            "ID" => Column::Id,
            "FORM" => Column::Form,
            "LEMMA" => Column::Lemma,
            "UPOS" => Column::Upos,
            "XPOS" => Column::Xpos,
            "FEATS" => Column::Feats,
            "HEAD" => Column::Head,
            "DEPREL" => Column::Deprel,
            "DEPS" => Column::Deps,
            "MISC" => Column::Misc,
            other => Column::Extra(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Column::Id => "ID",
            Column::Form => "FORM",
            Column::Lemma => "LEMMA",
            Column::Upos => "UPOS",
            Column::Xpos => "XPOS",
            Column::Feats => "FEATS",
            Column::Head => "HEAD",
            Column::Deprel => "DEPREL",
            Column::Deps => "DEPS",
            Column::Misc => "MISC",
            Column::Extra(name) => name,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered list of declared columns. The standard ten CoNLL-U columns are
/// the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Vec<Column>,
}

impl ColumnSchema {
    pub fn conllu() -> Self {
        Self {
            columns: vec![
                Column::Id,
                Column::Form,
                Column::Lemma,
                Column::Upos,
                Column::Xpos,
                Column::Feats,
                Column::Head,
                Column::Deprel,
                Column::Deps,
                Column::Misc,
            ],
        }
    }

    pub fn from_names<'a, I>(names: I) -> FormatResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut columns: Vec<Column> = Vec::new();
        for name in names {
            let column = Column::from_name(name);
            if columns.contains(&column) {
                return Err(FormatError::InvalidSchema(format!(
                    "column {} declared twice",
                    name
                )));
            }
            columns.push(column);
        }
        if !columns.contains(&Column::Id) {
            return Err(FormatError::InvalidSchema("missing ID column".to_string()));
        }
        Ok(Self { columns })
    }

    /// Parses a `# global.columns = ...` line, returning `None` when the line
    /// is something else.
    pub fn parse_header(line: &str) -> Option<FormatResult<Self>> {
        let rest = line.strip_prefix(COLUMNS_HEADER)?;
        Some(Self::from_names(rest.split_whitespace()))
    }

    pub fn header(&self) -> String {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name()).collect();
        format!("{} {}", COLUMNS_HEADER, names.join(" "))
    }

    pub fn is_default(&self) -> bool {
        *self == Self::conllu()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn has(&self, column: &Column) -> bool {
        self.columns.contains(column)
    }

    pub fn extra_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(|c| match c {
            Column::Extra(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn extra_count(&self) -> usize {
        self.extra_names().count()
    }

    /// Position of an extra column among the extra columns.
    pub fn extra_index(&self, name: &str) -> Option<usize> {
        self.extra_names().position(|n| n == name)
    }
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self::conllu()
    }
}
