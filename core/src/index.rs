use crate::error::IndexError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Per-document term counts written by a mapper.
pub type TermFrequencyShard = BTreeMap<String, u32>;

/// term -> (document name -> count), restricted to one [`IndexKey`].
pub type InvertedIndexShard = BTreeMap<String, BTreeMap<String, u32>>;

/// One of the 36 reduce partitions: `a`-`z` then `0`-`9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct IndexKey(char);

impl IndexKey {
    pub const COUNT: usize = 36;

    /// Every key in assignment order.
    pub fn all() -> impl Iterator<Item = IndexKey> {
        ('a'..='z').chain('0'..='9').map(IndexKey)
    }

    pub fn as_char(self) -> char { self.0 }

    /// A term belongs to the key equal to its first character.
    pub fn owns(self, term: &str) -> bool {
        IndexKey::for_term(term) == Some(self)
    }

    /// The key owning `term`, if its first character is in the key alphabet.
    pub fn for_term(term: &str) -> Option<IndexKey> {
        term.chars().next().and_then(|c| IndexKey::try_from(c).ok())
    }
}

impl TryFrom<char> for IndexKey {
    type Error = IndexError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            Ok(IndexKey(c))
        } else {
            Err(IndexError::UnknownKey(c.to_string()))
        }
    }
}

impl From<IndexKey> for char {
    fn from(key: IndexKey) -> char { key.0 }
}

impl FromStr for IndexKey {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => IndexKey::try_from(c),
            _ => Err(IndexError::UnknownKey(s.to_string())),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
