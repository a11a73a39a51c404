use crate::ast::*;
use crate::error::{char_offset, ParseError, ParseResult};
use crate::lexer::{tokenize, tokenize_replacement, ReplaceToken, Spanned, Token};
use std::ops::Range;
use treebank_conllu::TokenRef;

const FIELD_NAMES: &[&str] = &[
    "form", "lemma", "upos", "xpos", "deprel", "feat", "misc", "id", "headid", "abseud",
    "releud", "mwt",
];

/// Recursive-descent parser for conditions
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Spanned<Token<'src>>>,
    pos: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
            depth: 0,
        })
    }

    /// Parse a complete condition; trailing tokens are an error
    pub fn parse_condition(&mut self) -> ParseResult<Condition> {
        let condition = self.parse_or_expression()?;
        match self.peek() {
            None => Ok(condition),
            Some((Token::RParen, span)) => Err(ParseError::UnbalancedParenthesis {
                pos: self.offset(span.start),
            }),
            Some((_, span)) => Err(ParseError::MissingOperator {
                pos: self.offset(span.start),
                found: Self::format_token(self.peek()),
            }),
        }
    }

    /// Parse OR expression (lowest precedence)
    fn parse_or_expression(&mut self) -> ParseResult<Condition> {
        let mut left = self.parse_and_expression()?;

        while self.match_token(Token::Or) {
            let right = self.parse_and_expression()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    /// Parse AND expression
    fn parse_and_expression(&mut self) -> ParseResult<Condition> {
        let mut left = self.parse_unary()?;

        while self.match_token(Token::And) {
            let right = self.parse_unary()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Condition> {
        if let Some((Token::Not, span)) = self.peek() {
            let pos = self.offset(span.start);
            self.advance();
            if !self.starts_condition() {
                return Err(ParseError::InvalidNegation { pos });
            }
            let inner = self.parse_unary()?;
            return Ok(Condition::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn starts_condition(&self) -> bool {
        matches!(
            self.peek(),
            Some((
                Token::Not | Token::LParen | Token::Predicate(_) | Token::Ref(_) | Token::Ident(_),
                _
            ))
        )
    }

    fn parse_primary(&mut self) -> ParseResult<Condition> {
        let Some((token, span)) = self.peek().cloned() else {
            return Err(ParseError::unexpected_eof(self.end_pos(), "condition"));
        };
        match token {
            Token::LParen => {
                self.advance();
                self.parse_group(span.start)
            }
            Token::Predicate(text) => {
                self.advance();
                Ok(Condition::Predicate(self.parse_predicate(text, span.start)?))
            }
            Token::Ref(name) => {
                self.advance();
                self.parse_comparison(name, span.start)
            }
            Token::Ident(name) => {
                self.advance();
                self.parse_keyword(name, span)
            }
            Token::RParen if self.depth == 0 => Err(ParseError::UnbalancedParenthesis {
                pos: self.offset(span.start),
            }),
            _ => Err(ParseError::unexpected_token(
                self.offset(span.start),
                "condition",
                Self::format_token(self.peek()),
            )),
        }
    }

    /// Rest of `( condition )`, `open` being the byte position of `(`
    fn parse_group(&mut self, open: usize) -> ParseResult<Condition> {
        self.depth += 1;
        let inner = self.parse_or_expression()?;
        self.depth -= 1;
        match self.peek() {
            Some((Token::RParen, _)) => {
                self.advance();
                Ok(inner)
            }
            None => Err(ParseError::UnbalancedParenthesis {
                pos: self.offset(open),
            }),
            Some((_, span)) => Err(ParseError::MissingOperator {
                pos: self.offset(span.start),
                found: Self::format_token(self.peek()),
            }),
        }
    }

    fn parse_keyword(&mut self, name: &'src str, span: Range<usize>) -> ParseResult<Condition> {
        if let Some(relation) = Relation::from_name(name) {
            let open = match self.peek() {
                Some((Token::LParen, open)) => open.start,
                _ => return Err(self.error_here("'('")),
            };
            self.advance();
            let inner = self.parse_group(open)?;
            return Ok(Condition::Relation(relation, Box::new(inner)));
        }
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "isempty" => Ok(Condition::Predicate(Predicate::IsEmpty)),
            "ismwt" => Ok(Condition::Predicate(Predicate::IsMwt)),
            field if FIELD_NAMES.contains(&field) && self.check(Token::Colon) => {
                self.advance();
                Err(self.error_here("value"))
            }
            _ => Err(ParseError::UnknownField {
                pos: self.offset(span.start),
                name: name.to_string(),
            }),
        }
    }

    fn parse_predicate(&self, text: &str, start: usize) -> ParseResult<Predicate> {
        let (name, raw) = text.split_once(':').unwrap_or((text, ""));
        let (value, quoted) = unquote(raw);
        let value_pos = self.offset(start + name.len() + 1 + quoted as usize);

        if let Some(column) = Column::from_name(name) {
            return Ok(Predicate::Column(column, pattern(&value, value_pos)?));
        }
        match name.to_ascii_lowercase().as_str() {
            kind @ ("feat" | "misc") => {
                let (key, matcher) = match value.split_once('=') {
                    Some((key, re)) if !key.is_empty() => (
                        Some(key.to_string()),
                        pattern(re, value_pos + key.chars().count() + 1)?,
                    ),
                    _ => (None, pattern(&value, value_pos)?),
                };
                Ok(if kind == "feat" {
                    Predicate::Feat(key, matcher)
                } else {
                    Predicate::Misc(key, matcher)
                })
            }
            "id" => value.parse::<TokenRef>().map(Predicate::Id).map_err(|_| {
                ParseError::unexpected_token(value_pos, "token id", format!("'{}'", value))
            }),
            "headid" => {
                if value.starts_with(['+', '-']) {
                    relative(&value)
                        .map(|k| Predicate::HeadId(HeadId::Relative(k)))
                        .ok_or_else(|| ParseError::InvalidRelativeHead {
                            pos: value_pos,
                            value: value.clone(),
                        })
                } else {
                    value
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n >= 1)
                        .map(|n| Predicate::HeadId(HeadId::Absolute(n)))
                        .ok_or_else(|| ParseError::InvalidAbsoluteHead {
                            pos: value_pos,
                            value: value.clone(),
                        })
                }
            }
            kind @ ("abseud" | "releud") => {
                let (head_text, label_text) = match value.split_once(':') {
                    Some((head, label)) => (head, Some(label)),
                    None => (value.as_str(), None),
                };
                let head = if kind == "abseud" {
                    head_text
                        .parse::<TokenRef>()
                        .map(EudHead::Absolute)
                        .map_err(|_| ParseError::InvalidAbsoluteHead {
                            pos: value_pos,
                            value: head_text.to_string(),
                        })?
                } else {
                    relative(head_text).map(EudHead::Relative).ok_or_else(|| {
                        ParseError::InvalidRelativeHead {
                            pos: value_pos,
                            value: head_text.to_string(),
                        }
                    })?
                };
                let label = match label_text.filter(|l| !l.is_empty()) {
                    Some(label) => Some(pattern(
                        label,
                        value_pos + head_text.chars().count() + 1,
                    )?),
                    None => None,
                };
                Ok(Predicate::Eud { head, label })
            }
            "mwt" => value
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= 2)
                .map(Predicate::MwtLen)
                .ok_or_else(|| {
                    ParseError::unexpected_token(value_pos, "span length", format!("'{}'", value))
                }),
            _ => Err(ParseError::UnknownField {
                pos: self.offset(start),
                name: name.to_string(),
            }),
        }
    }

    fn parse_comparison(&mut self, name: &str, start: usize) -> ParseResult<Condition> {
        let field = RefField::from_name(name).ok_or_else(|| ParseError::UnknownField {
            pos: self.offset(start),
            name: name.to_string(),
        })?;
        let op = match self.peek() {
            Some((Token::Equal, _)) => CompareOp::Equal,
            Some((Token::Tilde, _)) => CompareOp::Compatible,
            _ => return Err(self.error_here("'=' or '~'")),
        };
        self.advance();
        let right = self.parse_value_ref()?;
        Ok(Condition::Compare {
            left: ValueRef {
                path: Vec::new(),
                field,
            },
            op,
            right,
        })
    }

    fn parse_value_ref(&mut self) -> ParseResult<ValueRef> {
        match self.peek().cloned() {
            Some((Token::Ref(name), span)) => {
                self.advance();
                let field = RefField::from_name(name).ok_or_else(|| ParseError::UnknownField {
                    pos: self.offset(span.start),
                    name: name.to_string(),
                })?;
                Ok(ValueRef {
                    path: Vec::new(),
                    field,
                })
            }
            Some((Token::Ident(name), _))
                if Relation::from_name(name).is_some_and(|r| r != Relation::Child) =>
            {
                self.advance();
                let open = match self.peek() {
                    Some((Token::LParen, open)) => open.start,
                    _ => return Err(self.error_here("'('")),
                };
                self.advance();
                let mut inner = self.parse_value_ref()?;
                match self.peek() {
                    Some((Token::RParen, _)) => {
                        self.advance();
                    }
                    None => {
                        return Err(ParseError::UnbalancedParenthesis {
                            pos: self.offset(open),
                        })
                    }
                    Some(_) => return Err(self.error_here("')'")),
                }
                if let Some(relation) = Relation::from_name(name) {
                    inner.path.insert(0, relation);
                }
                Ok(inner)
            }
            _ => Err(self.error_here("value reference")),
        }
    }

    // Helper methods

    fn peek(&self) -> Option<&Spanned<Token<'src>>> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Spanned<Token<'src>>> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn check(&self, token: Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(&token)
        } else {
            false
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn offset(&self, byte: usize) -> usize {
        char_offset(self.source, byte)
    }

    /// Character position just after the last token
    fn end_pos(&self) -> usize {
        let end = self.tokens.last().map(|(_, span)| span.end).unwrap_or(0);
        self.offset(end)
    }

    /// Error for the upcoming token, or for a premature end of input
    fn error_here(&self, expected: &str) -> ParseError {
        match self.peek() {
            None => ParseError::unexpected_eof(self.end_pos(), expected),
            Some((_, span)) => ParseError::unexpected_token(
                self.offset(span.start),
                expected,
                Self::format_token(self.peek()),
            ),
        }
    }

    /// Format a token for display in error messages
    fn format_token(token: Option<&Spanned<Token>>) -> String {
        match token {
            None => "end of input".to_string(),
            Some((token, _)) => format!("'{}'", token),
        }
    }
}

/// Parser for replacement lists such as `xpos:prep feat:Case=`
pub struct ReplacementParser<'src> {
    source: &'src str,
    tokens: Vec<Spanned<ReplaceToken<'src>>>,
    pos: usize,
}

impl<'src> ReplacementParser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            source,
            tokens: tokenize_replacement(source)?,
            pos: 0,
        })
    }

    pub fn parse_assignments(&mut self) -> ParseResult<Vec<Assignment>> {
        let mut assignments = Vec::new();
        while self.peek().is_some() {
            assignments.push(self.parse_assignment()?);
        }
        if assignments.is_empty() {
            return Err(ParseError::unexpected_eof(self.end_pos(), "assignment"));
        }
        Ok(assignments)
    }

    fn parse_assignment(&mut self) -> ParseResult<Assignment> {
        match self.peek().cloned() {
            Some((ReplaceToken::Target(name), _)) => {
                self.advance();
                let target = match name {
                    "form" => Target::Form,
                    "lemma" => Target::Lemma,
                    "upos" => Target::Upos,
                    "xpos" => Target::Xpos,
                    _ => Target::Deprel,
                };
                let value = self.parse_expression()?;
                Ok(Assignment { target, value })
            }
            Some((ReplaceToken::KeyTarget(text), _)) => {
                self.advance();
                let spec = text.trim_end_matches('=');
                let (kind, key) = spec.split_once(':').unwrap_or((spec, ""));
                let target = if kind == "feat" {
                    Target::Feat(key.to_string())
                } else {
                    Target::Misc(key.to_string())
                };
                let value = match self.peek() {
                    None
                    | Some((ReplaceToken::Target(_), _))
                    | Some((ReplaceToken::KeyTarget(_), _)) => ValueExpr::Literal(String::new()),
                    Some(_) => self.parse_expression()?,
                };
                Ok(Assignment { target, value })
            }
            _ => Err(self.error_here("assignment target")),
        }
    }

    fn parse_expression(&mut self) -> ParseResult<ValueExpr> {
        let mut parts = vec![self.parse_term()?];
        while let Some((ReplaceToken::Plus, _)) = self.peek() {
            self.advance();
            parts.push(self.parse_term()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            ValueExpr::Concat(parts)
        })
    }

    fn parse_term(&mut self) -> ParseResult<ValueExpr> {
        match self.peek().cloned() {
            Some((ReplaceToken::String(s), _)) => {
                self.advance();
                Ok(ValueExpr::Literal(unquote(s).0))
            }
            Some((ReplaceToken::Word(word), span)) => {
                self.advance();
                let function = word.to_ascii_lowercase();
                let is_call = matches!(self.peek(), Some((ReplaceToken::LParen, _)));
                match function.as_str() {
                    "this" | "head" | "upper" | "lower" | "cap" | "substring" | "replace"
                        if is_call =>
                    {
                        self.parse_call(&function)
                    }
                    _ => Ok(ValueExpr::Literal(self.merge_literal(word, span.end))),
                }
            }
            Some((ReplaceToken::Number(text), span)) => {
                self.advance();
                Ok(ValueExpr::Literal(self.merge_literal(text, span.end)))
            }
            Some((ReplaceToken::Colon, span)) => {
                self.advance();
                Ok(ValueExpr::Literal(self.merge_literal(":", span.end)))
            }
            _ => Err(self.error_here("value")),
        }
    }

    /// Glues tokens written without whitespace, so `nsubj:pass` stays one
    /// literal.
    fn merge_literal(&mut self, first: &str, mut end: usize) -> String {
        let mut text = first.to_string();
        while let Some((token, span)) = self.peek().cloned() {
            if span.start != end {
                break;
            }
            match token {
                ReplaceToken::Word(s) | ReplaceToken::Number(s) => text.push_str(s),
                ReplaceToken::Colon => text.push(':'),
                _ => break,
            }
            end = span.end;
            self.advance();
        }
        text
    }

    fn parse_call(&mut self, function: &str) -> ParseResult<ValueExpr> {
        let open = self.expect_open()?;
        let expression = match function {
            "this" => self.parse_field_ref(0)?,
            "head" => self.parse_field_ref(1)?,
            "upper" => ValueExpr::Upper(Box::new(self.parse_expression()?)),
            "lower" => ValueExpr::Lower(Box::new(self.parse_expression()?)),
            "cap" => ValueExpr::Cap(Box::new(self.parse_expression()?)),
            "substring" => {
                let inner = self.parse_expression()?;
                self.expect_comma()?;
                let start = self.expect_number()?;
                let end = if let Some((ReplaceToken::Comma, _)) = self.peek() {
                    self.advance();
                    Some(self.expect_number()?)
                } else {
                    None
                };
                ValueExpr::Substring(Box::new(inner), start, end)
            }
            _ => {
                let inner = self.parse_expression()?;
                self.expect_comma()?;
                let (source, pos) = self.expect_string()?;
                let regex = regex::Regex::new(&source)
                    .map_err(|e| ParseError::invalid_regex(pos, &e))?;
                self.expect_comma()?;
                let (replacement, _) = self.expect_string()?;
                ValueExpr::Replace(Box::new(inner), regex, replacement)
            }
        };
        self.expect_close(open)?;
        Ok(expression)
    }

    /// Field name inside `this(...)` or `head(...)`, with nested `head(...)`
    /// adding one hop each.
    fn parse_field_ref(&mut self, hops: usize) -> ParseResult<ValueExpr> {
        match self.peek().cloned() {
            Some((ReplaceToken::Word(word), span)) => {
                self.advance();
                if word.eq_ignore_ascii_case("head")
                    && matches!(self.peek(), Some((ReplaceToken::LParen, _)))
                {
                    let open = self.expect_open()?;
                    let inner = self.parse_field_ref(hops + 1)?;
                    self.expect_close(open)?;
                    return Ok(inner);
                }
                let field = RefField::from_name(word).ok_or_else(|| ParseError::UnknownField {
                    pos: self.offset(span.start),
                    name: word.to_string(),
                })?;
                Ok(ValueExpr::Field { hops, field })
            }
            _ => Err(self.error_here("field name")),
        }
    }

    // Helper methods

    fn peek(&self) -> Option<&Spanned<ReplaceToken<'src>>> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Spanned<ReplaceToken<'src>>> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expect_open(&mut self) -> ParseResult<usize> {
        match self.peek() {
            Some((ReplaceToken::LParen, span)) => {
                let start = span.start;
                self.advance();
                Ok(start)
            }
            _ => Err(self.error_here("'('")),
        }
    }

    fn expect_close(&mut self, open: usize) -> ParseResult<()> {
        match self.peek() {
            Some((ReplaceToken::RParen, _)) => {
                self.advance();
                Ok(())
            }
            None => Err(ParseError::UnbalancedParenthesis {
                pos: self.offset(open),
            }),
            Some(_) => Err(self.error_here("')'")),
        }
    }

    fn expect_comma(&mut self) -> ParseResult<()> {
        match self.peek() {
            Some((ReplaceToken::Comma, _)) => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error_here("','")),
        }
    }

    fn expect_number(&mut self) -> ParseResult<usize> {
        match self.peek().cloned() {
            Some((ReplaceToken::Number(text), span)) => {
                let value = text.parse::<usize>().map_err(|_| {
                    ParseError::unexpected_token(
                        self.offset(span.start),
                        "non-negative number",
                        format!("'{}'", text),
                    )
                })?;
                self.advance();
                Ok(value)
            }
            _ => Err(self.error_here("number")),
        }
    }

    /// Returns the unquoted string and the character position of its content
    fn expect_string(&mut self) -> ParseResult<(String, usize)> {
        match self.peek().cloned() {
            Some((ReplaceToken::String(s), span)) => {
                self.advance();
                Ok((unquote(s).0, self.offset(span.start + 1)))
            }
            _ => Err(self.error_here("string literal")),
        }
    }

    fn offset(&self, byte: usize) -> usize {
        char_offset(self.source, byte)
    }

    fn end_pos(&self) -> usize {
        let end = self.tokens.last().map(|(_, span)| span.end).unwrap_or(0);
        self.offset(end)
    }

    fn error_here(&self, expected: &str) -> ParseError {
        match self.peek() {
            None => ParseError::unexpected_eof(self.end_pos(), expected),
            Some((token, span)) => ParseError::unexpected_token(
                self.offset(span.start),
                expected,
                format!("'{}'", token),
            ),
        }
    }
}

fn pattern(source: &str, pos: usize) -> ParseResult<Pattern> {
    Pattern::full(source).map_err(|e| ParseError::invalid_regex(pos, &e))
}

/// `+k` or `-k` with `k != 0`
fn relative(value: &str) -> Option<i64> {
    if !value.starts_with(['+', '-']) {
        return None;
    }
    value.parse::<i64>().ok().filter(|k| *k != 0)
}

/// Strips surrounding double quotes and unescapes `\"`. Other escapes are
/// kept for the regex engine.
fn unquote(raw: &str) -> (String, bool) {
    match raw
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => (inner.replace("\\\"", "\""), true),
        None => (raw.to_string(), false),
    }
}

/// Parse a condition such as `Upos:ADP and head(Upos:VERB)`
pub fn parse_condition(source: &str) -> ParseResult<Condition> {
    Parser::new(source)?.parse_condition()
}

/// Parse a replacement list such as `xpos:prep lemma:lower(this(Form))`
pub fn parse_replacement(source: &str) -> ParseResult<Vec<Assignment>> {
    ReplacementParser::new(source)?.parse_assignments()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let condition = parse_condition("Upos:X or Upos:Y and Lemma:z").unwrap();
        assert!(matches!(condition, Condition::Or(_, ref right) if matches!(**right, Condition::And(..))));
    }

    #[test]
    fn test_operator_in_operand_position() {
        let err = parse_condition("Upos:ADP and or Xpos:prep").unwrap_err();
        assert_eq!(err.offset(), Some(13));
        assert_eq!(
            err.to_string(),
            "Unexpected token at 13: expected condition, found 'or'"
        );
    }

    #[test]
    fn test_parenthesis_errors() {
        assert_eq!(
            parse_condition("Upos:X)").unwrap_err(),
            ParseError::UnbalancedParenthesis { pos: 6 }
        );
        assert_eq!(
            parse_condition("(Upos:X and Lemma:y").unwrap_err(),
            ParseError::UnbalancedParenthesis { pos: 0 }
        );
        assert_eq!(
            parse_condition("head(Upos:X").unwrap_err(),
            ParseError::UnbalancedParenthesis { pos: 4 }
        );
    }

    #[test]
    fn test_missing_operator() {
        assert_eq!(
            parse_condition("Upos:X Lemma:y").unwrap_err(),
            ParseError::MissingOperator {
                pos: 7,
                found: "'Lemma:y'".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_negation() {
        assert_eq!(
            parse_condition("Upos:X and !").unwrap_err(),
            ParseError::InvalidNegation { pos: 11 }
        );
        assert_eq!(
            parse_condition("!and Upos:X").unwrap_err(),
            ParseError::InvalidNegation { pos: 0 }
        );
    }

    #[test]
    fn test_head_ids() {
        assert_eq!(
            parse_condition("HeadId:+2").unwrap(),
            Condition::Predicate(Predicate::HeadId(HeadId::Relative(2)))
        );
        assert_eq!(
            parse_condition("HeadId:0").unwrap_err().to_string(),
            "Invalid absolute head id at 7: '0'"
        );
        assert_eq!(
            parse_condition("HeadId:+0").unwrap_err().to_string(),
            "Invalid relative head id at 7: '+0'"
        );
    }

    #[test]
    fn test_unknown_field_and_regex() {
        assert_eq!(
            parse_condition("Colour:red").unwrap_err(),
            ParseError::UnknownField {
                pos: 0,
                name: "Colour".to_string()
            }
        );
        let err = parse_condition("Upos:X and Lemma:a[").unwrap_err();
        assert!(matches!(err, ParseError::InvalidRegex { pos: 17, .. }));
    }

    #[test]
    fn test_quoted_values() {
        let condition = parse_condition("Form:\"New York\"").unwrap();
        match condition {
            Condition::Predicate(Predicate::Column(Column::Form, pattern)) => {
                assert!(pattern.is_match("New York"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_comparison() {
        let condition = parse_condition("@Upos = head(prec(@Upos))").unwrap();
        assert_eq!(
            condition,
            Condition::Compare {
                left: ValueRef {
                    path: vec![],
                    field: RefField::Upos
                },
                op: CompareOp::Equal,
                right: ValueRef {
                    path: vec![Relation::Head, Relation::Prec],
                    field: RefField::Upos
                },
            }
        );
        assert!(parse_condition("@Upos = child(@Upos)").is_err());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(
            parse_condition("").unwrap_err(),
            ParseError::unexpected_eof(0, "condition")
        );
    }

    #[test]
    fn test_replacement_list() {
        let assignments =
            parse_replacement("deprel:nsubj:pass feat:Number= lemma:head(head(Lemma))").unwrap();
        assert_eq!(assignments.len(), 3);
        assert!(matches!(&assignments[0].value, ValueExpr::Literal(v) if v == "nsubj:pass"));
        assert_eq!(assignments[1].target, Target::Feat("Number".to_string()));
        assert!(matches!(&assignments[1].value, ValueExpr::Literal(v) if v.is_empty()));
        assert!(matches!(
            &assignments[2].value,
            ValueExpr::Field { hops: 2, field: RefField::Lemma }
        ));
    }

    #[test]
    fn test_replacement_errors() {
        assert_eq!(
            parse_replacement("xpos:upper(this(Form)").unwrap_err(),
            ParseError::UnbalancedParenthesis { pos: 10 }
        );
        assert!(matches!(
            parse_replacement("lemma:this(Colour)").unwrap_err(),
            ParseError::UnknownField { pos: 11, .. }
        ));
        assert!(matches!(
            parse_replacement("nothing").unwrap_err(),
            ParseError::UnexpectedToken { pos: 0, .. }
        ));
    }
}
