use logos::Logos;
use std::fmt;
use std::ops::Range;
use treebank_query::{char_offset, ParseError, ParseResult};

/// Token types of the graph pattern language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r"%[^\n]*")]
pub enum Token<'src> {
    // Keywords
    #[token("pattern")]
    Pattern,

    #[token("without")]
    Without,

    #[token("global")]
    Global,

    // Punctuation
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token("\n")]
    Newline,

    #[token("|")]
    Pipe,

    #[token(".")]
    Dot,

    #[token("!")]
    Bang,

    #[token("^")]
    Caret,

    // Operators
    #[token("=")]
    Equal,

    #[token("<>")]
    NotEqual,

    #[token("<")]
    Less,

    #[token("<<")]
    LessLess,

    #[token(">")]
    Greater,

    #[token(">>")]
    GreaterGreater,

    #[token("->")]
    Arrow,

    #[token("-[")]
    EdgeOpen,

    #[token("]->")]
    EdgeClose,

    // Literals
    #[regex(r#"re"([^"\\]|\\.)*""#, |lex| lex.slice())]
    Regex(&'src str),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    String(&'src str),

    #[regex(r"[\p{L}\p{N}_][\p{L}\p{N}_:]*", |lex| lex.slice())]
    Ident(&'src str),
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Pattern => write!(f, "pattern"),
            Token::Without => write!(f, "without"),
            Token::Global => write!(f, "global"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Newline => write!(f, "newline"),
            Token::Pipe => write!(f, "|"),
            Token::Dot => write!(f, "."),
            Token::Bang => write!(f, "!"),
            Token::Caret => write!(f, "^"),
            Token::Equal => write!(f, "="),
            Token::NotEqual => write!(f, "<>"),
            Token::Less => write!(f, "<"),
            Token::LessLess => write!(f, "<<"),
            Token::Greater => write!(f, ">"),
            Token::GreaterGreater => write!(f, ">>"),
            Token::Arrow => write!(f, "->"),
            Token::EdgeOpen => write!(f, "-["),
            Token::EdgeClose => write!(f, "]->"),
            Token::Regex(s) | Token::String(s) | Token::Ident(s) => write!(f, "{}", s),
        }
    }
}

/// Tokenize a pattern request. Spans are byte ranges.
pub fn tokenize(source: &str) -> ParseResult<Vec<(Token<'_>, Range<usize>)>> {
    Token::lexer(source)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(ParseError::Unrecognized {
                pos: char_offset(source, span.start),
                text: source[span.clone()].to_string(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token<'_>> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_edge_tokens() {
        assert_eq!(
            kinds("V -[^nsubj:pass|obj]-> N"),
            vec![
                Token::Ident("V"),
                Token::EdgeOpen,
                Token::Caret,
                Token::Ident("nsubj:pass"),
                Token::Pipe,
                Token::Ident("obj"),
                Token::EdgeClose,
                Token::Ident("N"),
            ]
        );
    }

    #[test]
    fn test_node_tokens() {
        assert_eq!(
            kinds("N [lemma=re\"ch.*\", Number<>Sing] % comment\n"),
            vec![
                Token::Ident("N"),
                Token::LBracket,
                Token::Ident("lemma"),
                Token::Equal,
                Token::Regex("re\"ch.*\""),
                Token::Comma,
                Token::Ident("Number"),
                Token::NotEqual,
                Token::Ident("Sing"),
                Token::RBracket,
                Token::Newline,
            ]
        );
    }

    #[test]
    fn test_order_tokens() {
        assert_eq!(
            kinds("A << B; A < B; A >> B"),
            vec![
                Token::Ident("A"),
                Token::LessLess,
                Token::Ident("B"),
                Token::Semicolon,
                Token::Ident("A"),
                Token::Less,
                Token::Ident("B"),
                Token::Semicolon,
                Token::Ident("A"),
                Token::GreaterGreater,
                Token::Ident("B"),
            ]
        );
    }
}
