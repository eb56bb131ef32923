use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Invalid tag at {pos}: {message}")]
    InvalidTag { pos: usize, message: String },

    #[error("Invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("Invalid tag configuration: {message}")]
    InvalidJson { message: String },

    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },
}

impl ParseError {
    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }

    pub fn invalid_tag(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidTag {
            pos,
            message: message.into(),
        }
    }

    pub fn invalid_regex(pattern: impl Into<String>, err: &regex::Error) -> Self {
        Self::InvalidRegex {
            pattern: pattern.into(),
            message: err.to_string(),
        }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::InvalidJson {
            message: err.to_string(),
        }
    }
}

/// Raised when an expression cannot be turned into concrete tags.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Cannot turn '{expression}' into concrete tags: {reason}")]
    Unmaterializable { expression: String, reason: String },
}

impl ExpressionError {
    pub fn unmaterializable(expression: impl ToString, reason: impl Into<String>) -> Self {
        Self::Unmaterializable {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}
