//! JSON configuration form of tag expressions
//!
//! ```json
//! { "and": ["amenity=bench", { "or": ["backrest=yes", "backrest="] }] }
//! ```

use crate::ast::TagsFilter;
use crate::error::{ParseError, ParseResult};
use crate::parser::parse_tag;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagConfigJson {
    Tag(String),
    And { and: Vec<TagConfigJson> },
    Or { or: Vec<TagConfigJson> },
}

impl TryFrom<TagConfigJson> for TagsFilter {
    type Error = ParseError;

    fn try_from(json: TagConfigJson) -> ParseResult<Self> {
        match json {
            TagConfigJson::Tag(text) => parse_tag(&text),
            TagConfigJson::And { and } => Ok(TagsFilter::And(
                and.into_iter().map(TagsFilter::try_from).collect::<ParseResult<_>>()?,
            )),
            TagConfigJson::Or { or } => Ok(TagsFilter::Or(
                or.into_iter().map(TagsFilter::try_from).collect::<ParseResult<_>>()?,
            )),
        }
    }
}

impl From<&TagsFilter> for TagConfigJson {
    fn from(filter: &TagsFilter) -> Self {
        match filter {
            TagsFilter::Tag { tag, op } => {
                TagConfigJson::Tag(format!("{}{}{}", tag.key, op.symbol(&tag.value), tag.value.source()))
            }
            TagsFilter::And(children) => TagConfigJson::And {
                and: children.iter().map(TagConfigJson::from).collect(),
            },
            TagsFilter::Or(children) => TagConfigJson::Or {
                or: children.iter().map(TagConfigJson::from).collect(),
            },
        }
    }
}

impl From<TagsFilter> for TagConfigJson {
    fn from(filter: TagsFilter) -> Self {
        TagConfigJson::from(&filter)
    }
}

impl TagsFilter {
    /// Parse the JSON configuration form
    pub fn from_json_str(source: &str) -> ParseResult<Self> {
        let json: TagConfigJson = serde_json::from_str(source)?;
        TagsFilter::try_from(json)
    }

    pub fn to_json(&self) -> TagConfigJson {
        TagConfigJson::from(self)
    }
}
