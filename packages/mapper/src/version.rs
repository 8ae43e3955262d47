//! Versioned namespace support.
//!
//! Schemas usually evolve through a series of namespace URIs
//! (`urn:foo:1.0`, `urn:foo:1.1`, ...). [`Versioned`] and [`Namespace`] let a
//! handler module describe those generations, and [`IntVersion`] gives them a
//! numeric ordering.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use crate::qname::QName;

/// Delimiter used by [`IntVersion`]'s `Display` implementation.
pub const DEFAULT_DELIMITER: &str = ".";

/// A version made of integer segments, such as `1.2.3`.
///
/// Trailing zero segments are ignored, so `1`, `1.0` and `1.0.0` are equal
/// and hash the same. Ordering compares segment by segment, treating missing
/// segments as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntVersion {
    // Canonical form without trailing zeros; the derived ordering then matches
    // a zero-padded comparison.
    segments: Vec<u32>,
}

impl IntVersion {
    /// Create a version from its segments.
    #[must_use]
    pub fn new(segments: &[u32]) -> Self {
        let length = segments
            .iter()
            .rposition(|&segment| segment != 0)
            .map_or(0, |last| last + 1);
        Self {
            segments: segments[..length].to_vec(),
        }
    }

    /// Segment at `index`, or 0 past the last significant segment.
    #[must_use]
    pub fn segment(&self, index: usize) -> u32 {
        self.segments.get(index).copied().unwrap_or(0)
    }

    /// Number of significant segments (trailing zeros excluded).
    #[must_use]
    pub fn segments(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn major(&self) -> u32 {
        self.segment(0)
    }

    #[must_use]
    pub fn minor(&self) -> u32 {
        self.segment(1)
    }

    #[must_use]
    pub fn micro(&self) -> u32 {
        self.segment(2)
    }

    /// Format exactly `segments` segments, zero padded or truncated.
    ///
    /// # Examples
    /// ```
    /// use xml_mapper::IntVersion;
    ///
    /// assert_eq!(IntVersion::new(&[1]).to_padded_string(3, "."), "1.0.0");
    /// assert_eq!(IntVersion::new(&[1, 2, 3]).to_padded_string(2, "_"), "1_2");
    /// ```
    #[must_use]
    pub fn to_padded_string(&self, segments: usize, delimiter: &str) -> String {
        (0..segments)
            .map(|i| self.segment(i).to_string())
            .collect::<Vec<_>>()
            .join(delimiter)
    }
}

impl fmt::Display for IntVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_padded_string(self.segments.len(), DEFAULT_DELIMITER))
    }
}

impl FromStr for IntVersion {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::default());
        }
        let segments = s
            .split('.')
            .map(str::parse)
            .collect::<Result<Vec<u32>, _>>()?;
        Ok(Self::new(&segments))
    }
}

/// Something that has a version, such as one generation of a schema namespace.
pub trait Versioned {
    /// Version type; ordered so generations can be compared.
    type Version: Ord;

    /// Version of this object.
    fn version(&self) -> Self::Version;

    /// Whether this object's version is greater than or equal to `other`'s.
    fn since(&self, other: &Self) -> bool
    where
        Self: Sized,
    {
        self.version() >= other.version()
    }
}

/// An XML namespace identified by its URI.
pub trait Namespace {
    /// Namespace URI.
    fn uri(&self) -> String;

    /// Qualified name of `local_name` in this namespace.
    fn qname(&self, local_name: &str) -> QName {
        QName::new(self.uri(), local_name)
    }
}
