use crate::error::{char_offset, ParseError, ParseResult};
use logos::Logos;
use std::fmt;
use std::ops::Range;

/// Tokens of the condition language
///
/// A field predicate such as `Upos:NOUN|PROPN` or `Lemma:"a b"` is lexed as
/// one token so that regex values need no escaping of the surrounding
/// operators.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token<'src> {
    #[token("and")]
    #[token("AND")]
    And,

    #[token("or")]
    #[token("OR")]
    Or,

    #[token("!")]
    Not,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("=")]
    Equal,

    #[token("~")]
    Tilde,

    /// Separates the condition from the replacement in a rule
    #[token(">")]
    Gt,

    #[token(":")]
    Colon,

    #[regex(r#"[A-Za-z][A-Za-z0-9_]*:("([^"\\]|\\.)*"|[^\s()">]+)"#, |lex| lex.slice())]
    Predicate(&'src str),

    #[regex(r"@[A-Za-z][A-Za-z0-9_]*", |lex| &lex.slice()[1..])]
    Ref(&'src str),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Ident(&'src str),
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "!"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Equal => write!(f, "="),
            Token::Tilde => write!(f, "~"),
            Token::Gt => write!(f, ">"),
            Token::Colon => write!(f, ":"),
            Token::Predicate(s) => write!(f, "{}", s),
            Token::Ref(s) => write!(f, "@{}", s),
            Token::Ident(s) => write!(f, "{}", s),
        }
    }
}

/// Tokens of the replacement language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum ReplaceToken<'src> {
    /// `form:`, `lemma:`, `upos:`, `xpos:` or `deprel:`
    #[regex(r"(form|lemma|upos|xpos|deprel):", |lex| &lex.slice()[..lex.slice().len() - 1])]
    Target(&'src str),

    /// `feat:Key=` or `misc:Key=`
    #[regex(r"(feat|misc):[A-Za-z0-9_\[\]\-]+=", |lex| lex.slice())]
    KeyTarget(&'src str),

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(",")]
    Comma,

    #[token("+")]
    Plus,

    #[token(":")]
    Colon,

    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    String(&'src str),

    #[regex(r"-?[0-9]+", |lex| lex.slice(), priority = 3)]
    Number(&'src str),

    #[regex(r#"[^\s()",+:]+"#, |lex| lex.slice())]
    Word(&'src str),
}

impl<'src> fmt::Display for ReplaceToken<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplaceToken::Target(s) => write!(f, "{}:", s),
            ReplaceToken::KeyTarget(s) => write!(f, "{}", s),
            ReplaceToken::LParen => write!(f, "("),
            ReplaceToken::RParen => write!(f, ")"),
            ReplaceToken::Comma => write!(f, ","),
            ReplaceToken::Plus => write!(f, "+"),
            ReplaceToken::Colon => write!(f, ":"),
            ReplaceToken::String(s) => write!(f, "{}", s),
            ReplaceToken::Number(s) => write!(f, "{}", s),
            ReplaceToken::Word(s) => write!(f, "{}", s),
        }
    }
}

pub type Spanned<T> = (T, Range<usize>);

/// Tokenize a condition. Spans are byte ranges.
pub fn tokenize(source: &str) -> ParseResult<Vec<Spanned<Token<'_>>>> {
    collect(source, Token::lexer(source).spanned())
}

/// Tokenize a replacement list. Spans are byte ranges.
pub fn tokenize_replacement(source: &str) -> ParseResult<Vec<Spanned<ReplaceToken<'_>>>> {
    collect(source, ReplaceToken::lexer(source).spanned())
}

fn collect<T>(
    source: &str,
    tokens: impl Iterator<Item = (Result<T, ()>, Range<usize>)>,
) -> ParseResult<Vec<Spanned<T>>> {
    tokens
        .map(|(result, span)| match result {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(ParseError::Unrecognized {
                pos: char_offset(source, span.start),
                text: source[span.clone()].to_string(),
            }),
        })
        .collect()
}

/// Byte position of the `>` separating condition and replacement, ignoring
/// any `>` nested in parentheses or quoted values.
pub fn rule_separator(source: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(Token::LParen) => depth += 1,
            Ok(Token::RParen) => depth = depth.saturating_sub(1),
            Ok(Token::Gt) if depth == 0 => return Some(span.start),
            _ => {}
        }
    }
    None
}
