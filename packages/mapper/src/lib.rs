//! XML Mapper - extensible streaming XML parsing and pretty-printing.
//!
//! Independent modules register handlers for qualified element and attribute
//! names on an [`XmlMapper`]. Parsing drives a single forward-only cursor
//! through the document; each handler only sees the subtree of the element
//! it was dispatched for and can dispatch nested elements back through the
//! mapper. Writing goes through a [`FormattingWriter`] that indents the
//! output and collapses elements without content.
//!
//! # Example
//!
//! ```
//! use xml_mapper::{ElementReader, EventKind, ExtendedReader, QName, Result, XmlMapper, XmlReader};
//!
//! struct Names;
//!
//! impl ElementReader<Vec<String>> for Names {
//!     fn read_element(
//!         &self,
//!         reader: &mut ExtendedReader<'_, Vec<String>>,
//!         value: &mut Vec<String>,
//!     ) -> Result<()> {
//!         while reader.next_tag()? == EventKind::StartElement {
//!             value.push(reader.element_text()?);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mapper = XmlMapper::new();
//! mapper.register_element(QName::local("names"), Names)?;
//!
//! let mut names = Vec::new();
//! mapper.parse_document(&mut names, XmlReader::from_text("<names><n>a</n><n>b</n></names>"))?;
//! assert_eq!(names, ["a", "b"]);
//! # Ok::<(), xml_mapper::MapperError>(())
//! ```
//!
//! # Architecture
//!
//! - [`qname`]: Qualified names used as registry keys
//! - [`error`]: Error types and Result alias
//! - [`config`]: Formatting constants and name validation
//! - [`xml`]: Raw cursor and emitter traits with quick-xml implementations
//! - [`registry`]: Name registry, handler traits and the mapper
//! - [`reader`]: Subtree-bounded cursor handed to handlers
//! - [`writer`]: Pretty-printing writer
//! - [`version`]: Versioned namespace support
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod qname;
pub mod reader;
pub mod registry;
pub mod version;
pub mod writer;
pub mod xml;

pub use error::{ErrorKind, MapperError, Result};
pub use qname::QName;
pub use reader::{AttributeValue, ExtendedReader, ValueKind};
pub use registry::{AttributeReader, ElementReader, ElementWriter, NameRegistry, XmlMapper};
pub use version::{IntVersion, Namespace, Versioned};
pub use writer::FormattingWriter;
pub use xml::{EventKind, Location, TagName, XmlCursor, XmlEmitter, XmlReader, XmlWriter};
