#![forbid(unsafe_code)]

//! Dependency vectors: positional cache keys compared by value.
//!
//! A [`DependencyVector`] is an ordered list of nullable scalars (identifiers,
//! filter values). Two vectors are equal iff they have the same length and are
//! pairwise equal at every index. `Null` is an ordinary value: it equals
//! `Null` and nothing else.

use std::fmt;
use std::ops::Deref;

use smallvec::SmallVec;

/// One position of a [`DependencyVector`].
///
/// Ordering (used when sorting query results) ranks kinds first:
/// `Null < Bool < Int < Str`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum DepValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl DepValue {
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for DepValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for DepValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for DepValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for DepValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for DepValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for DepValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&String> for DepValue {
    fn from(v: &String) -> Self {
        Self::Str(v.clone())
    }
}

impl<T: Into<DepValue>> From<Option<T>> for DepValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl fmt::Display for DepValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// Ordered, value-compared cache key.
///
/// Small vectors (up to four entries) are stored inline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DependencyVector {
    values: SmallVec<[DepValue; 4]>,
}

impl DependencyVector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vector from anything convertible into [`DepValue`]s.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<DepValue>,
    {
        values.into_iter().map(Into::into).collect()
    }

    pub fn push(&mut self, value: impl Into<DepValue>) {
        self.values.push(value.into());
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[DepValue] {
        &self.values
    }
}

impl Deref for DependencyVector {
    type Target = [DepValue];

    fn deref(&self) -> &[DepValue] {
        &self.values
    }
}

impl PartialEq<[DepValue]> for DependencyVector {
    fn eq(&self, other: &[DepValue]) -> bool {
        self.values.as_slice() == other
    }
}

impl FromIterator<DepValue> for DependencyVector {
    fn from_iter<I: IntoIterator<Item = DepValue>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl From<&[DepValue]> for DependencyVector {
    fn from(values: &[DepValue]) -> Self {
        Self {
            values: SmallVec::from(values),
        }
    }
}

impl From<Vec<DepValue>> for DependencyVector {
    fn from(values: Vec<DepValue>) -> Self {
        Self {
            values: SmallVec::from_vec(values),
        }
    }
}

impl fmt::Display for DependencyVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}

/// Build a [`DependencyVector`] from a list of values.
///
/// ```
/// use bbui_data::{deps, DepValue};
///
/// let key = deps![1, "linux", None::<i64>];
/// assert_eq!(key.len(), 3);
/// assert_eq!(key[2], DepValue::Null);
/// ```
#[macro_export]
macro_rules! deps {
    () => {
        $crate::DependencyVector::new()
    };
    ($($value:expr),+ $(,)?) => {
        <$crate::DependencyVector as ::core::iter::FromIterator<$crate::DepValue>>::from_iter(
            [$($crate::DepValue::from($value)),+],
        )
    };
}
