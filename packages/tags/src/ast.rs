use crate::error::{ParseError, ParseResult};
use crate::json::TagConfigJson;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison applied by a leaf.
///
/// A regex value turns `Equals` into `~` and `NotEquals` into `!~`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagOperator {
    /// `=` / `~`
    Equals,
    /// `!=` / `!~`
    NotEquals,
    /// `:=`, the value is a template filled from the bag
    Substitute,
}

impl TagOperator {
    pub fn symbol(&self, value: &TagValue) -> &'static str {
        match (self, value) {
            (TagOperator::Equals, TagValue::Literal(_)) => "=",
            (TagOperator::Equals, TagValue::Regex(_)) => "~",
            (TagOperator::NotEquals, TagValue::Literal(_)) => "!=",
            (TagOperator::NotEquals, TagValue::Regex(_)) => "!~",
            (TagOperator::Substitute, _) => ":=",
        }
    }
}

/// A compiled pattern that must match the whole value.
#[derive(Clone)]
pub struct TagRegex {
    source: String,
    regex: Regex,
}

impl TagRegex {
    pub fn new(source: &str) -> ParseResult<Self> {
        let regex = Regex::new(&format!("^(?:{})$", source))
            .map_err(|err| ParseError::invalid_regex(source, &err))?;

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for TagRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for TagRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Literal(String),
    Regex(TagRegex),
}

impl TagValue {
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            TagValue::Literal(value) => Some(value),
            TagValue::Regex(_) => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, TagValue::Literal(_))
    }

    /// Test an actual value; a missing key is passed as `""`.
    pub fn matches(&self, actual: &str) -> bool {
        match self {
            TagValue::Literal(expected) => expected == actual,
            TagValue::Regex(regex) => regex.is_match(actual),
        }
    }

    /// Source text, as written after the operator.
    pub fn source(&self) -> &str {
        match self {
            TagValue::Literal(value) => value,
            TagValue::Regex(regex) => regex.as_str(),
        }
    }
}

/// A key together with the value it is compared against.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub key: String,
    pub value: TagValue,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: TagValue::Literal(value.into()),
        }
    }

    pub fn regex(key: impl Into<String>, pattern: &str) -> ParseResult<Self> {
        Ok(Self {
            key: key.into(),
            value: TagValue::Regex(TagRegex::new(pattern)?),
        })
    }
}

/// Boolean expression over tag predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TagConfigJson", into = "TagConfigJson")]
pub enum TagsFilter {
    Tag { tag: Tag, op: TagOperator },
    And(Vec<TagsFilter>),
    Or(Vec<TagsFilter>),
}

impl TagsFilter {
    /// `key=value`
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        TagsFilter::Tag {
            tag: Tag::new(key, value),
            op: TagOperator::Equals,
        }
    }

    /// `key!=value`
    pub fn not_eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        TagsFilter::Tag {
            tag: Tag::new(key, value),
            op: TagOperator::NotEquals,
        }
    }

    /// `key~pattern`
    pub fn matching(key: impl Into<String>, pattern: &str) -> ParseResult<Self> {
        Ok(TagsFilter::Tag {
            tag: Tag::regex(key, pattern)?,
            op: TagOperator::Equals,
        })
    }

    /// `key:=template`
    pub fn substitute(key: impl Into<String>, template: impl Into<String>) -> Self {
        TagsFilter::Tag {
            tag: Tag::new(key, template),
            op: TagOperator::Substitute,
        }
    }

    pub fn and(children: Vec<TagsFilter>) -> Self {
        TagsFilter::And(children)
    }

    pub fn or(children: Vec<TagsFilter>) -> Self {
        TagsFilter::Or(children)
    }

    /// All tags are required, each compared with `=` / `~`.
    pub fn all_of(tags: impl IntoIterator<Item = Tag>) -> Self {
        TagsFilter::And(tags.into_iter().map(TagsFilter::from).collect())
    }
}

impl From<Tag> for TagsFilter {
    fn from(tag: Tag) -> Self {
        TagsFilter::Tag {
            tag,
            op: TagOperator::Equals,
        }
    }
}
