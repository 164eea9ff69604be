//! Extent values
//!
//! An extent describes how much value an Amount carries. Which variant is
//! legal under a brand is decided by that brand's math helpers.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Extent {
    /// A count of fungible units
    Nat(u64),
    /// A set of non-fungible token ids
    Set(BTreeSet<u64>),
    /// A set of named rights
    StrSet(BTreeSet<String>),
}

impl Extent {
    pub fn set(ids: impl IntoIterator<Item = u64>) -> Self {
        Extent::Set(ids.into_iter().collect())
    }

    pub fn str_set<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Extent::StrSet(names.into_iter().map(Into::into).collect())
    }

    /// The count, if this is a nat extent
    pub fn as_nat(&self) -> Option<u64> {
        match self {
            Extent::Nat(n) => Some(*n),
            _ => None,
        }
    }

    pub(crate) fn shape(&self) -> &'static str {
        match self {
            Extent::Nat(_) => "nat",
            Extent::Set(_) => "set",
            Extent::StrSet(_) => "strSet",
        }
    }
}

impl From<u64> for Extent {
    fn from(n: u64) -> Self {
        Extent::Nat(n)
    }
}

impl From<BTreeSet<u64>> for Extent {
    fn from(ids: BTreeSet<u64>) -> Self {
        Extent::Set(ids)
    }
}

impl From<BTreeSet<String>> for Extent {
    fn from(names: BTreeSet<String>) -> Self {
        Extent::StrSet(names)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extent::Nat(n) => write!(f, "{}", n),
            Extent::Set(ids) => {
                let items: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Extent::StrSet(names) => {
                let items: Vec<&str> = names.iter().map(String::as_str).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
        }
    }
}
