//! Handler trait definitions.

use crate::error::Result;
use crate::reader::ExtendedReader;
use crate::writer::FormattingWriter;

/// Trait for element handlers.
///
/// A handler is invoked with the reader positioned on the start tag of the
/// element it was registered for. It consumes events up to, and not past,
/// the matching end tag, recursing into children via
/// [`ExtendedReader::handle_nested`] and into attributes via
/// [`ExtendedReader::handle_attribute`].
///
/// Handlers are shared between parses, possibly on several threads, so they
/// must not keep per-document state of their own.
pub trait ElementReader<T: ?Sized>: Send + Sync {
    /// Read the current element into `value`.
    fn read_element(&self, reader: &mut ExtendedReader<'_, T>, value: &mut T) -> Result<()>;
}

/// Trait for attribute handlers.
///
/// Called with the reader on a start tag and the index of the attribute to
/// apply. The reader cannot be advanced from here.
pub trait AttributeReader<T: ?Sized>: Send + Sync {
    /// Apply the attribute at `index` to `value`.
    fn read_attribute(&self, reader: &ExtendedReader<'_, T>, index: usize, value: &mut T) -> Result<()>;
}

/// Trait for content writers used by [`crate::XmlMapper::deparse_document`].
pub trait ElementWriter<T: ?Sized> {
    /// Write `value` as XML.
    fn write_content(&self, writer: &mut FormattingWriter<'_>, value: &T) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::XmlMapper;
    use crate::xml::XmlReader;

    struct CountingHandler;

    impl ElementReader<usize> for CountingHandler {
        fn read_element(&self, reader: &mut ExtendedReader<'_, usize>, value: &mut usize) -> Result<()> {
            *value += reader.attribute_count();
            reader.discard_remainder()
        }
    }

    #[test]
    fn test_handler_trait() {
        let mapper = XmlMapper::new();
        mapper
            .register_element(crate::QName::local("test"), CountingHandler)
            .unwrap();

        let mut count = 0;
        mapper
            .parse_document(&mut count, XmlReader::from_text(r#"<test a="1" b="2"/>"#))
            .unwrap();

        assert_eq!(count, 2);
    }

    #[test]
    fn test_handlers_are_object_safe() {
        let handler: Box<dyn ElementReader<usize>> = Box::new(CountingHandler);
        let _ = &handler;
    }
}
