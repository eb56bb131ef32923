use crate::ast::*;
use std::fmt;

/// Writes expressions back in the compact syntax accepted by [`crate::parse`].
///
/// Leaves that contain whitespace or grouping characters are quoted; an `or`
/// nested inside an `and` is parenthesized.
impl fmt::Display for TagsFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagsFilter::Tag { tag, op } => write_leaf(f, tag, *op),
            TagsFilter::And(children) if children.is_empty() => write!(f, "()"),
            TagsFilter::Or(children) if children.is_empty() => write!(f, "(|)"),
            TagsFilter::And(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " & ")?;
                    }
                    match child {
                        TagsFilter::Or(grandchildren) if !grandchildren.is_empty() => write!(f, "({})", child)?,
                        _ => write!(f, "{}", child)?,
                    }
                }
                Ok(())
            }
            TagsFilter::Or(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", child)?;
                }
                Ok(())
            }
        }
    }
}

fn write_leaf(f: &mut fmt::Formatter<'_>, tag: &Tag, op: TagOperator) -> fmt::Result {
    let text = format!("{}{}{}", tag.key, op.symbol(&tag.value), tag.value.source());

    if text.chars().any(needs_quotes) {
        write!(f, "\"")?;
        for c in text.chars() {
            if c == '"' || c == '\\' {
                write!(f, "\\")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, "\"")
    } else {
        write!(f, "{}", text)
    }
}

fn needs_quotes(c: char) -> bool {
    c.is_whitespace() || matches!(c, '&' | '|' | '(' | ')' | '"')
}
