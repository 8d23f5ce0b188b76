#![forbid(unsafe_code)]

//! Tag unpacking.
//!
//! Binds an ordered item list to tag names the way sequence unpacking binds
//! values to targets: fixed tags take items positionally, and an optional
//! overflow tag ("startag") takes whatever is left. A count mismatch is an
//! error, never a silent truncation.
//!
//! | tags | startag | items | result |
//! |---|---|---|---|
//! | `a, b` | | `X, Y` | `a: X, b: Y` |
//! | `a` | `rest` | `X, Y, Z` | `a: X, rest: (Y, Z)` |
//! | `a, b` | | `X` | need more than 1 values to unpack |
//! | `a` | | `X, Y` | too many values to unpack |
//! | | | anything | empty |

use declet_tree::{DeclarativeRef, ObjectDict};

use crate::error::UnpackError;

/// What a tag is bound to.
#[derive(Debug, Clone)]
pub enum Tagged {
    /// A fixed tag's single item.
    Item(DeclarativeRef),
    /// The overflow tag's remaining items (possibly none).
    Rest(Vec<DeclarativeRef>),
}

impl Tagged {
    #[must_use]
    pub fn as_item(&self) -> Option<&DeclarativeRef> {
        match self {
            Self::Item(item) => Some(item),
            Self::Rest(_) => None,
        }
    }

    #[must_use]
    pub fn as_rest(&self) -> Option<&[DeclarativeRef]> {
        match self {
            Self::Item(_) => None,
            Self::Rest(items) => Some(items),
        }
    }
}

impl PartialEq for Tagged {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Item(a), Self::Item(b)) => a.same_node(&**b),
            (Self::Rest(a), Self::Rest(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_node(&**y))
            }
            _ => false,
        }
    }
}

impl Eq for Tagged {}

/// Tag name to tagged item(s), in tag order.
pub type TaggedMap = ObjectDict<Tagged>;

/// Bind `items` to `tags`, with `startag` (if non-empty) taking the rest.
///
/// With no tags and no startag the result is empty whatever the item count.
/// A repeated tag name keeps its first position and its last binding; a
/// startag equal to a fixed tag replaces that tag's binding.
///
/// # Errors
///
/// - [`UnpackError::NotEnough`] when there are more tags than items.
/// - [`UnpackError::TooMany`] when there are more items than tags and no
///   startag.
pub fn unpack_tags<S: AsRef<str>>(
    tags: &[S],
    startag: &str,
    items: &[DeclarativeRef],
) -> Result<TaggedMap, UnpackError> {
    let (k, n) = (tags.len(), items.len());
    if k > 0 && k > n {
        return Err(UnpackError::NotEnough {
            required: k,
            available: n,
        });
    }
    if k > 0 && startag.is_empty() && n > k {
        return Err(UnpackError::TooMany {
            expected: k,
            available: n,
        });
    }

    let mut tagged = TaggedMap::new();
    for (name, item) in tags.iter().zip(items) {
        tagged.insert(name.as_ref(), Tagged::Item(item.clone()));
    }
    if !startag.is_empty() {
        tagged.insert(startag, Tagged::Rest(items[k.min(n)..].to_vec()));
    }
    Ok(tagged)
}
