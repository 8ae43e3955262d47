//! Mapper that dispatches elements and attributes to registered handlers.

use std::fmt;
use std::sync::Arc;

use super::core::NameRegistry;
use super::handler::{AttributeReader, ElementReader, ElementWriter};
use crate::error::{MapperError, Result};
use crate::qname::QName;
use crate::reader::ExtendedReader;
use crate::writer::FormattingWriter;
use crate::xml::{EventKind, XmlCursor, XmlEmitter};

/// Entry point of the mapper: a [`NameRegistry`] plus the parse and deparse
/// drivers built on it.
///
/// `T` is the type handlers read into. One mapper can be shared by any
/// number of concurrent parses; each parse owns its own cursor and
/// [`ExtendedReader`].
pub struct XmlMapper<T: ?Sized> {
    registry: NameRegistry<T>,
}

impl<T: ?Sized> XmlMapper<T> {
    /// Create a mapper with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: NameRegistry::new(),
        }
    }

    /// Get a reference to the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &NameRegistry<T> {
        &self.registry
    }

    /// Register a handler for an element name.
    ///
    /// # Errors
    /// `DuplicateRegistration` if a handler is already registered for `name`.
    pub fn register_element(&self, name: QName, handler: impl ElementReader<T> + 'static) -> Result<()> {
        self.registry.register_element(name, Arc::new(handler))
    }

    /// Register a handler for an element name, constructed on first use in
    /// each parse.
    ///
    /// # Errors
    /// `DuplicateRegistration` if a handler is already registered for `name`.
    pub fn register_element_factory<F, H>(&self, name: QName, factory: F) -> Result<()>
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: ElementReader<T> + 'static,
    {
        self.registry
            .register_element_factory(name, move || Arc::new(factory()) as Arc<dyn ElementReader<T>>)
    }

    /// Register a lazily constructed handler for `local_name` in every given
    /// namespace, typically all generations of a versioned schema.
    ///
    /// # Errors
    /// `DuplicateRegistration` if any of the names is taken; nothing is
    /// registered in that case.
    pub fn register_element_for_namespaces<I, S, F, H>(&self, local_name: &str, namespaces: I, factory: F) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str) -> H + Send + Sync + 'static,
        H: ElementReader<T> + 'static,
    {
        self.registry
            .register_element_for_namespaces(local_name, namespaces, move |ns| {
                Arc::new(factory(ns)) as Arc<dyn ElementReader<T>>
            })
    }

    /// Remove the element handler for `name`. Returns whether one was registered.
    pub fn unregister_element(&self, name: &QName) -> bool {
        self.registry.unregister_element(name)
    }

    /// Register a handler for an attribute name.
    ///
    /// # Errors
    /// `DuplicateRegistration` if a handler is already registered for `name`.
    pub fn register_attribute(&self, name: QName, handler: impl AttributeReader<T> + 'static) -> Result<()> {
        self.registry.register_attribute(name, Arc::new(handler))
    }

    /// Remove the attribute handler for `name`. Returns whether one was registered.
    pub fn unregister_attribute(&self, name: &QName) -> bool {
        self.registry.unregister_attribute(name)
    }

    /// Dispatch the element at the reader's position to its handler.
    ///
    /// # Errors
    /// `UnexpectedElement` if no handler is registered for the element's name,
    /// otherwise whatever the handler returns.
    pub fn process_nested(&self, reader: &mut ExtendedReader<'_, T>, value: &mut T) -> Result<()> {
        reader.require(EventKind::StartElement, None, None)?;
        let name = reader.element_name()?.clone();
        let Some(handler) = self.registry.resolve_element(&name) else {
            return Err(MapperError::UnexpectedElement {
                name,
                location: reader.location(),
            });
        };
        tracing::debug!(element = %name, "Dispatching element");
        handler.read_element(reader, value)
    }

    /// Dispatch the attribute at `index` on the current start tag to its handler.
    ///
    /// # Errors
    /// `UnexpectedAttribute` if no handler is registered for the attribute's
    /// name, otherwise whatever the handler returns.
    pub fn process_attribute(&self, reader: &ExtendedReader<'_, T>, index: usize, value: &mut T) -> Result<()> {
        let name = reader.attribute_name(index)?.clone();
        let Some(handler) = self.registry.resolve_attribute(&name) else {
            return Err(MapperError::UnexpectedAttribute {
                name,
                location: reader.location(),
            });
        };
        tracing::debug!(attribute = %name, "Dispatching attribute");
        handler.read_attribute(reader, index, value)
    }

    /// Parse a whole document into `value`.
    ///
    /// The cursor must be at the start of the document. The root element is
    /// dispatched to its handler, the rest of the document is drained, and
    /// the cursor is closed on every path. Realized handlers are released
    /// afterwards.
    ///
    /// # Errors
    /// Any error of the cursor or the handlers; the cursor is closed first.
    pub fn parse_document<C: XmlCursor>(&self, value: &mut T, mut cursor: C) -> Result<()> {
        let result = self.drive_parse(value, &mut cursor);
        if result.is_err() && !cursor.is_closed() {
            if let Err(e) = cursor.close() {
                tracing::warn!(error = %e, "Failed to close cursor after parse error");
            }
        }
        self.registry.clear_realized();
        result
    }

    fn drive_parse(&self, value: &mut T, cursor: &mut dyn XmlCursor) -> Result<()> {
        cursor.require(EventKind::StartDocument, None, None)?;
        cursor.next_tag()?;
        cursor.require(EventKind::StartElement, None, None)?;

        let mut reader = ExtendedReader::new(self, &mut *cursor);
        self.process_nested(&mut reader, value)?;
        drop(reader);

        while cursor.next()? != EventKind::EndDocument {}
        cursor.close()
    }

    /// Write `value` through `content` to `emitter`, formatted.
    ///
    /// The emitter is closed on every path.
    ///
    /// # Errors
    /// Any error of the content writer or the emitter.
    pub fn deparse_document<W, E>(&self, content: &W, value: &T, emitter: &mut E) -> Result<()>
    where
        W: ElementWriter<T> + ?Sized,
        E: XmlEmitter,
    {
        let result = {
            let mut writer = FormattingWriter::new(&mut *emitter);
            content
                .write_content(&mut writer, value)
                .and_then(|()| writer.commit_pending())
                .and_then(|()| writer.flush())
        };
        match result {
            Ok(()) => emitter.close(),
            Err(e) => {
                if let Err(close_err) = emitter.close() {
                    tracing::warn!(error = %close_err, "Failed to close emitter after write error");
                }
                Err(e)
            }
        }
    }
}

impl<T: ?Sized> Default for XmlMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for XmlMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlMapper")
            .field("registry", &self.registry)
            .finish()
    }
}
