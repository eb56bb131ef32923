use crate::error::{ParseError, ParseResult};
use logos::Logos;
use std::fmt;
use std::ops::Range;

/// Tokens of the compact expression syntax
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token<'src> {
    #[token("&")]
    Ampersand,

    #[token("|")]
    Pipe,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    // A whole leaf in quotes, e.g. "name=Café (Bar)"
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    Quoted(&'src str),

    // A bare leaf, e.g. addr:street:={_street}
    #[regex(r#"[^ \t\n\r&|()"]+"#, |lex| lex.slice())]
    Leaf(&'src str),
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ampersand => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Quoted(s) => write!(f, "quoted tag {}", s),
            Token::Leaf(s) => write!(f, "tag '{}'", s),
        }
    }
}

/// Tokenize a compact expression, keeping byte spans for error reporting.
pub fn tokenize(source: &str) -> ParseResult<Vec<(Token<'_>, Range<usize>)>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => return Err(ParseError::lexer_error(lexer.span().start)),
        }
    }

    Ok(tokens)
}
