use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, Token};
use std::ops::Range;

/// Parser for the compact expression syntax
///
/// ```text
/// expr    := and ('|' and)*
/// and     := primary ('&' primary)*
/// primary := '(' expr ')' | '(' ')' | '(' '|' ')' | leaf | "quoted leaf"
/// ```
pub struct Parser<'src> {
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    source_len: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            source_len: source.len(),
        })
    }

    /// Parse the whole input as one expression
    pub fn parse_expression(&mut self) -> ParseResult<TagsFilter> {
        let expr = self.parse_or()?;

        if let Some((token, span)) = self.peek() {
            return Err(ParseError::unexpected_token(
                span.start,
                "'&', '|' or end of input",
                token.to_string(),
            ));
        }

        Ok(expr)
    }

    fn parse_or(&mut self) -> ParseResult<TagsFilter> {
        let mut children = vec![self.parse_and()?];
        while self.match_token(&Token::Pipe) {
            children.push(self.parse_and()?);
        }

        Ok(collapse(children, TagsFilter::Or))
    }

    fn parse_and(&mut self) -> ParseResult<TagsFilter> {
        let mut children = vec![self.parse_primary()?];
        while self.match_token(&Token::Ampersand) {
            children.push(self.parse_primary()?);
        }

        Ok(collapse(children, TagsFilter::And))
    }

    fn parse_primary(&mut self) -> ParseResult<TagsFilter> {
        let (token, span) = match self.advance() {
            Some(next) => next,
            None => return Err(ParseError::unexpected_eof(self.source_len)),
        };

        match token {
            Token::LParen => {
                // "()" and "(|)" are the empty groups
                if self.match_token(&Token::RParen) {
                    return Ok(TagsFilter::And(vec![]));
                }
                if self.check(&Token::Pipe) && self.check_at(1, &Token::RParen) {
                    self.pos += 2;
                    return Ok(TagsFilter::Or(vec![]));
                }

                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Leaf(text) => parse_leaf(text, span.start),
            Token::Quoted(text) => {
                let unquoted = unescape(&text[1..text.len() - 1]);
                parse_leaf(&unquoted, span.start + 1)
            }
            other => Err(ParseError::unexpected_token(span.start, "a tag or '('", other.to_string())),
        }
    }

    fn peek(&self) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<(Token<'src>, Range<usize>)> {
        let next = self.tokens.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    fn check(&self, expected: &Token<'src>) -> bool {
        self.check_at(0, expected)
    }

    fn check_at(&self, offset: usize, expected: &Token<'src>) -> bool {
        matches!(self.tokens.get(self.pos + offset), Some((token, _)) if token == expected)
    }

    fn match_token(&mut self, expected: &Token<'src>) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token<'src>) -> ParseResult<()> {
        match self.advance() {
            Some((token, _)) if token == expected => Ok(()),
            Some((token, span)) => Err(ParseError::unexpected_token(
                span.start,
                expected.to_string(),
                token.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(self.source_len)),
        }
    }
}

/// Parse a compact expression such as `amenity=bench & (backrest=yes | backrest=)`
pub fn parse(source: &str) -> ParseResult<TagsFilter> {
    Parser::new(source)?.parse_expression()
}

/// Parse a single leaf such as `addr:street:={_street}`
///
/// The operator is the earliest `=`, `~`, `!=`, `!~` or `:=` in the text, so
/// values may contain operator characters.
pub fn parse_tag(text: &str) -> ParseResult<TagsFilter> {
    parse_leaf(text, 0)
}

fn parse_leaf(text: &str, offset: usize) -> ParseResult<TagsFilter> {
    let bytes = text.as_bytes();

    for (i, byte) in bytes.iter().enumerate() {
        let next = bytes.get(i + 1).copied();
        let (op, regex, value_start) = match (*byte, next) {
            (b'=', _) => (TagOperator::Equals, false, i + 1),
            (b'~', _) => (TagOperator::Equals, true, i + 1),
            (b'!', Some(b'=')) => (TagOperator::NotEquals, false, i + 2),
            (b'!', Some(b'~')) => (TagOperator::NotEquals, true, i + 2),
            (b':', Some(b'=')) => (TagOperator::Substitute, false, i + 2),
            _ => continue,
        };

        let key = &text[..i];
        if key.is_empty() {
            return Err(ParseError::invalid_tag(offset, format!("missing key in '{}'", text)));
        }

        let raw_value = &text[value_start..];
        let value = if regex {
            TagValue::Regex(TagRegex::new(raw_value)?)
        } else {
            TagValue::Literal(raw_value.to_string())
        };

        return Ok(TagsFilter::Tag {
            tag: Tag {
                key: key.to_string(),
                value,
            },
            op,
        });
    }

    Err(ParseError::invalid_tag(offset, format!("no operator in '{}'", text)))
}

fn collapse(mut children: Vec<TagsFilter>, group: fn(Vec<TagsFilter>) -> TagsFilter) -> TagsFilter {
    if children.len() == 1 {
        children.remove(0)
    } else {
        group(children)
    }
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}
