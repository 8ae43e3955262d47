//! Attribute value decoding.

use std::fmt::Display;
use std::num::ParseIntError;
use std::str::FromStr;

use crate::error::{MapperError, Result};
use crate::xml::{is_xml_whitespace_char, Location};

/// Target kind for [`crate::ExtendedReader::typed_attribute_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind<'a> {
    /// The raw string.
    String,
    /// A 32-bit signed integer.
    Int,
    /// A 64-bit signed integer.
    Long,
    /// One of the given names; decodes to its index.
    Enum(&'a [&'a str]),
    /// The characters of the value.
    Chars,
}

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    Int(i32),
    Long(i64),
    /// Index into the names of [`ValueKind::Enum`].
    Enum(usize),
    Chars(Vec<char>),
}

impl AttributeValue {
    /// The string value, if this is [`AttributeValue::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric value, if this is an integer of either width.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(i64::from(*n)),
            Self::Long(n) => Some(*n),
            _ => None,
        }
    }
}

/// Items of a list-valued attribute, separated by XML whitespace.
pub(crate) fn list_items(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(is_xml_whitespace_char).filter(|item| !item.is_empty())
}

pub(crate) fn parse_integer<N>(raw: &str, location: Location) -> Result<N>
where
    N: FromStr<Err = ParseIntError>,
{
    raw.parse().map_err(|source| MapperError::InvalidNumber {
        value: raw.to_string(),
        location,
        source,
    })
}

pub(crate) fn parse_enum<E>(raw: &str, location: Location) -> Result<E>
where
    E: FromStr,
    E::Err: Display,
{
    raw.parse().map_err(|e: E::Err| MapperError::InvalidEnum {
        value: raw.to_string(),
        reason: e.to_string(),
        location,
    })
}

/// Decode `raw` as `kind`.
pub(crate) fn decode(raw: &str, kind: ValueKind<'_>, location: Location) -> Result<AttributeValue> {
    Ok(match kind {
        ValueKind::String => AttributeValue::String(raw.to_string()),
        ValueKind::Int => AttributeValue::Int(parse_integer(raw, location)?),
        ValueKind::Long => AttributeValue::Long(parse_integer(raw, location)?),
        ValueKind::Enum(names) => {
            let index = names.iter().position(|name| *name == raw).ok_or_else(|| {
                MapperError::InvalidEnum {
                    value: raw.to_string(),
                    reason: format!("expected one of: {}", names.join(", ")),
                    location,
                }
            })?;
            AttributeValue::Enum(index)
        }
        ValueKind::Chars => AttributeValue::Chars(raw.chars().collect()),
    })
}
