//! # Mapedit Tags
//!
//! Boolean tag expressions used to decide which question or answer applies to
//! a feature, to filter features, and to compute the literal tags that get
//! written back when a user picks an answer.
//!
//! ## Syntax
//!
//! ```text
//! key=value        exact value ("key=" means the key is missing)
//! key!=value       any other value ("key!=" means the key is present)
//! key~regex        whole-string regex match
//! key!~regex       no whole-string regex match
//! key:=template    value after substituting {other_key} from the bag
//! ```
//!
//! Leaves combine with `&` and `|` (and parentheses) in the compact form, or
//! with `{"and": [...]}` / `{"or": [...]}` in the JSON configuration form.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mapedit_tags::parse;
//!
//! let filter = parse("amenity=bench & (backrest=yes | backrest=)")?;
//! assert!(filter.matches(&bag));
//! let to_upload = parse("backrest=yes")?.as_change(&bag)?;
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod json;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use ast::{Tag, TagOperator, TagRegex, TagValue, TagsFilter};
pub use error::{ExpressionError, ParseError, ParseResult};
pub use eval::{substitute, TagBag};
pub use json::TagConfigJson;
pub use parser::{parse, parse_tag, Parser};
pub use tokenizer::{tokenize, Token};
