//! Identifier types for catalog products and placed orders.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur when parsing a [`ProductId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductIdError {
    /// The input string is empty or whitespace.
    #[error("product id cannot be empty")]
    Empty,
}

/// A product identifier.
///
/// Catalog data identifies books either by a numeric id or by a string slug,
/// so both shapes are accepted. The canonical form of an integer-looking
/// string is [`ProductId::Numeric`], so an id survives a trip through markup
/// attributes or the command line; see [`ProductId::canonical`].
///
/// ```
/// use paperback_core::ProductId;
///
/// let numeric: ProductId = "42".parse().unwrap();
/// assert_eq!(numeric, ProductId::Numeric(42));
///
/// let slug: ProductId = "dune-1965".parse().unwrap();
/// assert_eq!(slug.to_string(), "dune-1965");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    /// Integer id, serialized as a JSON number.
    Numeric(i64),
    /// String id, serialized as a JSON string.
    Text(String),
}

impl ProductId {
    /// Parse a `ProductId`, preferring the numeric form when the input is an integer.
    ///
    /// # Errors
    ///
    /// Returns [`ProductIdError::Empty`] if the input is blank.
    pub fn parse(s: &str) -> Result<Self, ProductIdError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ProductIdError::Empty);
        }
        Ok(trimmed
            .parse::<i64>()
            .map_or_else(|_| Self::Text(trimmed.to_owned()), Self::Numeric))
    }

    /// The form [`ProductId::parse`] would produce for this id's text.
    ///
    /// Blank text ids are returned unchanged.
    #[must_use]
    pub fn canonical(self) -> Self {
        match self {
            Self::Text(text) => Self::parse(&text).unwrap_or(Self::Text(text)),
            numeric @ Self::Numeric(_) => numeric,
        }
    }

    /// Returns `true` for a text id that is empty or whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl std::str::FromStr for ProductId {
    type Err = ProductIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        Self::Numeric(id)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// Identifier assigned to a placed order, e.g. `ORD-3F2A9C1B7D40`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    const PREFIX: &'static str = "ORD-";
    const SUFFIX_LEN: usize = 12;

    /// Generate a fresh random order id.
    #[must_use]
    pub fn generate() -> Self {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .to_uppercase()
            .chars()
            .take(Self::SUFFIX_LEN)
            .collect();
        Self(format!("{}{suffix}", Self::PREFIX))
    }

    /// Returns the order id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
