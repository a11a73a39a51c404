use crate::ast::*;
use crate::lexer::{tokenize, Token};
use std::ops::Range;
use treebank_query::{char_offset, ParseError, ParseResult, Pattern};

/// Parser for pattern requests
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    /// Parse a complete request: one or more `pattern` blocks plus optional
    /// `without` and `global` blocks
    pub fn parse_request(&mut self) -> ParseResult<Request> {
        let mut request = Request::default();
        let mut has_pattern = false;

        loop {
            while self.match_token(Token::Newline) {}
            let Some((token, _)) = self.peek() else {
                break;
            };
            match token {
                Token::Pattern => {
                    self.advance();
                    self.parse_block(&mut request.pattern)?;
                    has_pattern = true;
                }
                Token::Without => {
                    self.advance();
                    let mut block = Block::default();
                    self.parse_block(&mut block)?;
                    request.without.push(block);
                }
                Token::Global => {
                    self.advance();
                    self.parse_global(&mut request.global)?;
                }
                _ => return Err(self.error_here("'pattern', 'without' or 'global'")),
            }
        }

        if !has_pattern {
            return Err(ParseError::unexpected_eof(self.end_pos(), "'pattern'"));
        }
        check_declarations(&request)?;
        Ok(request)
    }

    fn parse_block(&mut self, block: &mut Block) -> ParseResult<()> {
        while self.match_token(Token::Newline) {}
        self.expect(Token::LBrace)?;
        loop {
            self.skip_separators();
            match self.peek() {
                Some((Token::RBrace, _)) => {
                    self.advance();
                    return Ok(());
                }
                None => return Err(ParseError::unexpected_eof(self.end_pos(), "'}'")),
                Some(_) => self.parse_clause(block)?,
            }
            match self.peek() {
                Some((Token::Semicolon | Token::Comma | Token::Newline | Token::RBrace, _)) => {}
                None => return Err(ParseError::unexpected_eof(self.end_pos(), "'}'")),
                Some(_) => return Err(self.error_here("';' or newline")),
            }
        }
    }

    fn parse_clause(&mut self, block: &mut Block) -> ParseResult<()> {
        let name = self.expect_ident()?;
        let Some((token, _)) = self.peek().cloned() else {
            return Err(self.error_here("node features or relation"));
        };
        match token {
            Token::LBracket => {
                self.advance();
                self.parse_features(block, &name)?;
            }
            Token::EdgeOpen => {
                self.advance();
                let negated = self.match_token(Token::Caret);
                let labels = self.parse_alternatives()?;
                self.expect(Token::EdgeClose)?;
                let dep = self.expect_ident()?;
                block.node_mut(&name);
                block.node_mut(&dep);
                block.clauses.push(Clause::Edge {
                    head: name,
                    dep,
                    labels: if negated {
                        LabelSet::NoneOf(labels)
                    } else {
                        LabelSet::OneOf(labels)
                    },
                });
            }
            Token::Arrow => {
                self.advance();
                let dep = self.expect_ident()?;
                block.node_mut(&name);
                block.node_mut(&dep);
                block.clauses.push(Clause::Edge {
                    head: name,
                    dep,
                    labels: LabelSet::Any,
                });
            }
            Token::Less | Token::LessLess => {
                self.advance();
                let right = self.expect_ident()?;
                block.clauses.push(Clause::Precedes {
                    left: name,
                    right,
                    immediate: token == Token::Less,
                });
            }
            Token::Greater | Token::GreaterGreater => {
                self.advance();
                let dep = self.expect_ident()?;
                block.clauses.push(Clause::Dominates {
                    head: name,
                    dep,
                    direct: token == Token::Greater,
                });
            }
            Token::Dot => {
                self.advance();
                let left_field = NodeField::from_name(&self.expect_ident()?);
                let equal = match self.peek() {
                    Some((Token::Equal, _)) => true,
                    Some((Token::NotEqual, _)) => false,
                    _ => return Err(self.error_here("'=' or '<>'")),
                };
                self.advance();
                let other = self.expect_ident()?;
                self.expect(Token::Dot)?;
                let right_field = NodeField::from_name(&self.expect_ident()?);
                block.clauses.push(Clause::Compare {
                    left: (name, left_field),
                    right: (other, right_field),
                    equal,
                });
            }
            _ => return Err(self.error_here("node features or relation")),
        }
        Ok(())
    }

    fn parse_features(&mut self, block: &mut Block, name: &str) -> ParseResult<()> {
        block.node_mut(name);
        loop {
            if self.match_token(Token::RBracket) {
                return Ok(());
            }
            let constraint = if self.match_token(Token::Bang) {
                FeatureConstraint {
                    field: NodeField::from_name(&self.expect_ident()?),
                    test: FeatureTest::Absent,
                }
            } else {
                let field = NodeField::from_name(&self.expect_ident()?);
                let test = match self.peek().cloned() {
                    Some((Token::Equal, _)) => {
                        self.advance();
                        match self.peek().cloned() {
                            Some((Token::Regex(text), span)) => {
                                self.advance();
                                let body = &text[3..text.len() - 1];
                                let pos = self.offset(span.start + 3);
                                FeatureTest::Regex(
                                    Pattern::full(body)
                                        .map_err(|e| ParseError::invalid_regex(pos, &e))?,
                                )
                            }
                            _ => FeatureTest::OneOf(self.parse_alternatives()?),
                        }
                    }
                    Some((Token::NotEqual, _)) => {
                        self.advance();
                        FeatureTest::NoneOf(self.parse_alternatives()?)
                    }
                    _ => FeatureTest::Present,
                };
                FeatureConstraint { field, test }
            };

            let features = block.node_mut(name);
            if features.iter().any(|f| f.field == constraint.field) {
                return Err(ParseError::InconsistentDeclaration {
                    name: name.to_string(),
                    message: format!("field '{}' declared twice", constraint.field.name()),
                });
            }
            features.push(constraint);

            if !self.match_token(Token::Comma) && !self.check(Token::RBracket) {
                return Err(self.error_here("',' or ']'"));
            }
        }
    }

    /// `v1|v2|...` made of identifiers or quoted strings
    fn parse_alternatives(&mut self) -> ParseResult<Vec<String>> {
        let mut values = vec![self.expect_value()?];
        while self.match_token(Token::Pipe) {
            values.push(self.expect_value()?);
        }
        Ok(values)
    }

    fn parse_global(&mut self, checks: &mut Vec<GlobalCheck>) -> ParseResult<()> {
        while self.match_token(Token::Newline) {}
        self.expect(Token::LBrace)?;
        loop {
            self.skip_separators();
            if self.match_token(Token::RBrace) {
                return Ok(());
            }
            let check = match self.peek() {
                Some((Token::Ident("is_tree"), _)) => GlobalCheck::IsTree,
                Some((Token::Ident("is_not_tree"), _)) => GlobalCheck::IsNotTree,
                Some((Token::Ident("is_projective"), _)) => GlobalCheck::IsProjective,
                Some((Token::Ident("is_not_projective"), _)) => GlobalCheck::IsNotProjective,
                _ => return Err(self.error_here("global constraint")),
            };
            self.advance();
            checks.push(check);
        }
    }

    // Helper methods

    fn peek(&self) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&(Token<'src>, Range<usize>)> {
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

    fn skip_separators(&mut self) {
        while self.match_token(Token::Semicolon)
            || self.match_token(Token::Comma)
            || self.match_token(Token::Newline)
        {}
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.check(token.clone()) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(&format!("'{}'", token)))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some((Token::Ident(s), _)) => {
                let value = s.to_string();
                self.advance();
                Ok(value)
            }
            _ => Err(self.error_here("identifier")),
        }
    }

    fn expect_value(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some((Token::Ident(s), _)) => {
                let value = s.to_string();
                self.advance();
                Ok(value)
            }
            Some((Token::String(s), _)) => {
                let value = s.trim_matches('"').to_string();
                self.advance();
                Ok(value)
            }
            _ => Err(self.error_here("value")),
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

/// Order, dominance and comparison clauses may only name declared
/// variables. A `without` block sees its own variables and the pattern's.
fn check_declarations(request: &Request) -> ParseResult<()> {
    let blocks = std::iter::once(&request.pattern).chain(request.without.iter());
    for block in blocks {
        let declared = |name: &str| request.pattern.declares(name) || block.declares(name);
        for clause in &block.clauses {
            let names: Vec<&str> = match clause {
                Clause::Edge { .. } => continue,
                Clause::Precedes { left, right, .. } => vec![left.as_str(), right.as_str()],
                Clause::Dominates { head, dep, .. } => vec![head.as_str(), dep.as_str()],
                Clause::Compare { left, right, .. } => vec![left.0.as_str(), right.0.as_str()],
            };
            if let Some(missing) = names.into_iter().find(|name| !declared(name)) {
                return Err(ParseError::UndeclaredIdentifier {
                    name: missing.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Parse a pattern request
pub fn parse_request(source: &str) -> ParseResult<Request> {
    Parser::new(source)?.parse_request()
}
