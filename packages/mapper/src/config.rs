//! Configuration constants and validation functions for the mapper.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{MapperError, Result};

/// Indentation emitted per nesting level by the formatting writer.
pub const INDENT_UNIT: &str = "    ";

/// Prefix for every line of a multi-line comment after the indentation.
///
/// The `~` marks comment continuation lines so they stay recognisable when
/// the document is re-indented.
pub const COMMENT_CONTINUATION: &str = "  ~ ";

/// XML version of the declaration `xml-mapper format --declaration` adds.
pub const DEFAULT_XML_VERSION: &str = "1.0";

/// Unqualified attribute read by [`crate::ExtendedReader::id`].
pub const ID_ATTRIBUTE: &str = "id";

/// XML NCName: a name without a colon.
///
/// Covers the ASCII letters plus the Unicode letter classes; the full XML
/// production allows a few more ranges that do not occur in practice.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NCNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}_][\p{L}\p{N}_.\-\p{Mn}\p{Mc}\u{B7}]*$").expect("valid regex")
});

/// Validate an XML local name used as a registry key.
///
/// # Arguments
/// * `name` - The local name to validate
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(MapperError::InvalidName)` if invalid
///
/// # Examples
/// ```
/// use xml_mapper::config::validate_local_name;
///
/// assert!(validate_local_name("artikel").is_ok());
/// assert!(validate_local_name("p:artikel").is_err());
/// ```
pub fn validate_local_name(name: &str) -> Result<()> {
    if NCNAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(MapperError::InvalidName(name.to_string()))
    }
}

/// Build the indentation for a nesting level.
pub fn indentation(level: usize) -> String {
    INDENT_UNIT.repeat(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_local_name_valid() {
        assert!(validate_local_name("root").is_ok());
        assert!(validate_local_name("_private").is_ok());
        assert!(validate_local_name("item-2.b").is_ok());
        assert!(validate_local_name("één").is_ok());
    }

    #[test]
    fn test_validate_local_name_invalid() {
        assert!(validate_local_name("").is_err());
        assert!(validate_local_name("2items").is_err()); // Starts with digit
        assert!(validate_local_name("a:b").is_err()); // Prefixed
        assert!(validate_local_name("a b").is_err());
        assert!(validate_local_name("-x").is_err());
    }

    #[test]
    fn test_indentation() {
        assert_eq!(indentation(0), "");
        assert_eq!(indentation(2), "        ");
    }
}
