//! Raw XML collaborators: the forward-only cursor and emitter the mapper wraps.

mod cursor;
mod emitter;
mod location;

pub use cursor::{Attribute, EventKind, NamespaceBinding, XmlCursor, XmlReader, XML_NAMESPACE};
pub use emitter::{TagName, XmlEmitter, XmlWriter};
pub use location::{LineTracker, Location};

pub(crate) use cursor::is_xml_whitespace_char;
