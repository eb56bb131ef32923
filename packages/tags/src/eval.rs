//! Evaluation of tag expressions against a property bag.
//!
//! Both entry points are pure: the bag is only read and the expression is
//! never modified, so a shared `TagsFilter` can be evaluated from many threads.

use crate::ast::*;
use crate::error::ExpressionError;
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{BuildHasher, Hash};

/// Read access to the tags of a feature.
pub trait TagBag {
    fn get_tag(&self, key: &str) -> Option<&str>;
}

impl<K, V> TagBag for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: AsRef<str>,
{
    fn get_tag(&self, key: &str) -> Option<&str> {
        self.get(key).map(|v| v.as_ref())
    }
}

impl<K, V, S> TagBag for HashMap<K, V, S>
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<str>,
    S: BuildHasher,
{
    fn get_tag(&self, key: &str) -> Option<&str> {
        self.get(key).map(|v| v.as_ref())
    }
}

impl TagsFilter {
    /// Test the expression against a bag. A missing key reads as `""`.
    pub fn matches<B: TagBag + ?Sized>(&self, bag: &B) -> bool {
        match self {
            TagsFilter::Tag { tag, op } => {
                let actual = bag.get_tag(&tag.key).unwrap_or("");
                match op {
                    TagOperator::Equals => tag.value.matches(actual),
                    TagOperator::NotEquals => !tag.value.matches(actual),
                    TagOperator::Substitute => substitute(tag.value.source(), bag) == actual,
                }
            }
            TagsFilter::And(children) => children.iter().all(|child| child.matches(bag)),
            TagsFilter::Or(children) => children.iter().any(|child| child.matches(bag)),
        }
    }

    /// Compute the literal tags that make the bag satisfy this expression.
    ///
    /// An empty value in the result means the key must be removed.
    pub fn as_change<B: TagBag + ?Sized>(&self, bag: &B) -> Result<BTreeMap<String, String>, ExpressionError> {
        let mut change = BTreeMap::new();
        self.collect_change(bag, &mut change)?;
        Ok(change)
    }

    fn collect_change<B: TagBag + ?Sized>(
        &self,
        bag: &B,
        change: &mut BTreeMap<String, String>,
    ) -> Result<(), ExpressionError> {
        match self {
            TagsFilter::Tag { tag, op } => {
                let value = match (op, &tag.value) {
                    (TagOperator::Equals, TagValue::Literal(value)) => value.clone(),
                    (TagOperator::Substitute, TagValue::Literal(template)) => substitute(template, bag),
                    (TagOperator::NotEquals, _) => {
                        return Err(ExpressionError::unmaterializable(self, "a negation has no single value"));
                    }
                    (_, TagValue::Regex(_)) => {
                        return Err(ExpressionError::unmaterializable(self, "a regex has no literal value"));
                    }
                };
                insert_consistent(self, change, &tag.key, value)
            }
            TagsFilter::And(children) => {
                for child in children {
                    let mut partial = BTreeMap::new();
                    child.collect_change(bag, &mut partial)?;
                    for (key, value) in partial {
                        insert_consistent(self, change, &key, value)?;
                    }
                }
                Ok(())
            }
            TagsFilter::Or(children) => {
                if let [only] = children.as_slice() {
                    return only.collect_change(bag, change);
                }

                let satisfied: Vec<&TagsFilter> = children.iter().filter(|child| child.matches(bag)).collect();
                match satisfied.as_slice() {
                    [branch] => {
                        let mut partial = BTreeMap::new();
                        branch.collect_change(bag, &mut partial)?;
                        for (key, value) in partial {
                            insert_consistent(self, change, &key, value)?;
                        }
                        Ok(())
                    }
                    [] => Err(ExpressionError::unmaterializable(self, "no branch of the 'or' is satisfied")),
                    _ => Err(ExpressionError::unmaterializable(
                        self,
                        format!("{} branches of the 'or' are satisfied", satisfied.len()),
                    )),
                }
            }
        }
    }

    /// Keys mentioned anywhere in the expression, sorted and deduplicated.
    pub fn used_keys(&self) -> Vec<String> {
        let mut keys = BTreeSet::new();
        self.collect_keys(&mut keys);
        keys.into_iter().collect()
    }

    fn collect_keys(&self, keys: &mut BTreeSet<String>) {
        match self {
            TagsFilter::Tag { tag, .. } => {
                keys.insert(tag.key.clone());
            }
            TagsFilter::And(children) | TagsFilter::Or(children) => {
                for child in children {
                    child.collect_keys(keys);
                }
            }
        }
    }

    /// True when `as_change` succeeds for any bag.
    pub fn is_usable_as_answer(&self) -> bool {
        match self {
            TagsFilter::Tag { tag, op } => {
                tag.value.is_literal() && matches!(op, TagOperator::Equals | TagOperator::Substitute)
            }
            TagsFilter::And(children) => {
                children.iter().all(TagsFilter::is_usable_as_answer) && self.as_change(&BTreeMap::<String, String>::new()).is_ok()
            }
            TagsFilter::Or(children) => children.len() == 1 && children[0].is_usable_as_answer(),
        }
    }
}

fn insert_consistent(
    expr: &TagsFilter,
    change: &mut BTreeMap<String, String>,
    key: &str,
    value: String,
) -> Result<(), ExpressionError> {
    match change.get(key) {
        Some(existing) if *existing != value => Err(ExpressionError::unmaterializable(
            expr,
            format!("'{}' would need both '{}' and '{}'", key, existing, value),
        )),
        _ => {
            change.insert(key.to_string(), value);
            Ok(())
        }
    }
}

/// Replace every `{key}` in the template with the bag's value (or nothing).
///
/// An unclosed `{` is kept as text.
pub fn substitute<B: TagBag + ?Sized>(template: &str, bag: &B) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let key = &rest[open + 1..open + close];
        out.push_str(bag.get_tag(key).unwrap_or(""));
        rest = &rest[open + close + 1..];
    }

    out.push_str(rest);
    out
}
