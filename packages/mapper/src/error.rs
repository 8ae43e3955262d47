//! Error types for the mapper.
//!
//! Every failure raised while reading a document carries the [`Location`]
//! reported by the underlying cursor. [`MapperError::kind`] groups the
//! variants into the broad classes callers usually care about.

use std::num::ParseIntError;

use thiserror::Error;

use crate::qname::QName;
use crate::xml::{EventKind, Location};

/// Main error type for the mapper library.
#[derive(Debug, Error)]
pub enum MapperError {
    /// No element handler is registered for the element at the cursor.
    #[error("Unexpected element '{name}' at {location}")]
    UnexpectedElement { name: QName, location: Location },

    /// No attribute handler is registered for the attribute at the cursor.
    #[error("Unexpected attribute '{name}' at {location}")]
    UnexpectedAttribute { name: QName, location: Location },

    /// A read was attempted after the current subtree was fully consumed.
    #[error("Attempt to read past end of element at {location}")]
    ReadPastEnd { location: Location },

    /// The cursor is not on the event an operation requires.
    #[error("Expected {expected} but found {actual}{} at {location}", .detail.as_ref().map(|d| format!(" ({d})")).unwrap_or_default())]
    UnexpectedEvent {
        expected: EventKind,
        actual: EventKind,
        detail: Option<String>,
        location: Location,
    },

    /// Attribute index outside the attributes of the current start tag.
    #[error("Attribute index {index} out of range ({count} attributes) at {location}")]
    AttributeIndex {
        index: usize,
        count: usize,
        location: Location,
    },

    /// Handlers may not close the cursor; the parse driver owns it.
    #[error("Closing the cursor is not allowed from a handler")]
    CloseNotAllowed,

    /// The underlying cursor was already closed.
    #[error("Cursor is closed")]
    CursorClosed,

    /// Numeric attribute value failed to parse.
    #[error("Failed to parse an integer attribute value '{value}' at {location}: {source}")]
    InvalidNumber {
        value: String,
        location: Location,
        #[source]
        source: ParseIntError,
    },

    /// Enumerated attribute value is not one of the accepted names.
    #[error("Invalid enum attribute value '{value}' at {location}: {reason}")]
    InvalidEnum {
        value: String,
        reason: String,
        location: Location,
    },

    /// A name was registered twice.
    #[error("{kind} handler for '{name}' already registered")]
    DuplicateRegistration { kind: &'static str, name: QName },

    /// A name is not a valid XML local name.
    #[error("Invalid XML name: '{0}'")]
    InvalidName(String),

    /// The tokenizer rejected the document.
    #[error("XML syntax error at {location}: {message}")]
    Syntax { message: String, location: Location },

    /// The emitter was driven in an order it cannot express.
    #[error("Invalid write: {0}")]
    InvalidWrite(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad classification of [`MapperError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No handler found for a name that required dispatch.
    UnregisteredName,
    /// Bounded-cursor protocol violated (read past end, wrong position).
    CursorProtocol,
    /// Malformed numeric or enumerated value.
    ValueParse,
    /// Registration-time conflict or invalid registration.
    SetupConflict,
    /// Malformed document or emitter misuse.
    Syntax,
    /// Failure of the underlying stream.
    Io,
}

impl MapperError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnexpectedElement { .. } | Self::UnexpectedAttribute { .. } => {
                ErrorKind::UnregisteredName
            }
            Self::ReadPastEnd { .. }
            | Self::UnexpectedEvent { .. }
            | Self::AttributeIndex { .. }
            | Self::CloseNotAllowed
            | Self::CursorClosed => ErrorKind::CursorProtocol,
            Self::InvalidNumber { .. } | Self::InvalidEnum { .. } => ErrorKind::ValueParse,
            Self::DuplicateRegistration { .. } | Self::InvalidName(_) => ErrorKind::SetupConflict,
            Self::Syntax { .. } | Self::InvalidWrite(_) => ErrorKind::Syntax,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Document location of the failure, when it happened while reading.
    #[must_use]
    pub fn location(&self) -> Option<Location> {
        match self {
            Self::UnexpectedElement { location, .. }
            | Self::UnexpectedAttribute { location, .. }
            | Self::ReadPastEnd { location }
            | Self::UnexpectedEvent { location, .. }
            | Self::AttributeIndex { location, .. }
            | Self::InvalidNumber { location, .. }
            | Self::InvalidEnum { location, .. }
            | Self::Syntax { location, .. } => Some(*location),
            _ => None,
        }
    }
}

/// Result type alias for mapper operations.
pub type Result<T> = std::result::Result<T, MapperError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: u64, column: u64) -> Location {
        Location {
            line,
            column,
            offset: 0,
        }
    }

    #[test]
    fn test_unexpected_element_display() {
        let err = MapperError::UnexpectedElement {
            name: QName::new("urn:t", "child"),
            location: at(1, 20),
        };
        assert_eq!(
            err.to_string(),
            "Unexpected element '{urn:t}child' at line 1, column 20"
        );
        assert_eq!(err.kind(), ErrorKind::UnregisteredName);
        assert_eq!(err.location(), Some(at(1, 20)));
    }

    #[test]
    fn test_unexpected_event_with_detail() {
        let err = MapperError::UnexpectedEvent {
            expected: EventKind::EndElement,
            actual: EventKind::StartElement,
            detail: Some("element text".to_string()),
            location: at(2, 1),
        };
        assert_eq!(
            err.to_string(),
            "Expected END_ELEMENT but found START_ELEMENT (element text) at line 2, column 1"
        );
    }

    #[test]
    fn test_invalid_number_keeps_source() {
        let source = "x".parse::<i32>().unwrap_err();
        let err = MapperError::InvalidNumber {
            value: "x".to_string(),
            location: at(3, 4),
            source,
        };
        assert_eq!(err.kind(), ErrorKind::ValueParse);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_duplicate_registration_has_no_location() {
        let err = MapperError::DuplicateRegistration {
            kind: "Element",
            name: QName::local("root"),
        };
        assert_eq!(err.to_string(), "Element handler for 'root' already registered");
        assert_eq!(err.kind(), ErrorKind::SetupConflict);
        assert_eq!(err.location(), None);
    }
}
