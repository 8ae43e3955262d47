//! Scoped reader handed to element and attribute handlers.
//!
//! [`ExtendedReader`] wraps the raw [`XmlCursor`] of one parse and bounds
//! every handler to the subtree it was dispatched for. Each nested dispatch
//! pushes a depth context whose budget starts at 1 (the start tag the handler
//! is positioned on), grows on every start tag and shrinks on every end tag.
//! Once the budget hits 0 the handler has consumed its end tag, and any
//! further read is refused with [`MapperError::ReadPastEnd`] after closing
//! the raw cursor.

mod values;

use std::fmt::{self, Display};
use std::str::FromStr;

pub use values::{AttributeValue, ValueKind};

use crate::config::ID_ATTRIBUTE;
use crate::error::{MapperError, Result};
use crate::qname::QName;
use crate::registry::XmlMapper;
use crate::xml::{is_xml_whitespace_char, Attribute, EventKind, Location, NamespaceBinding, XmlCursor};

/// Remaining depth budget of one dispatched subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DepthContext {
    budget: usize,
}

impl DepthContext {
    fn new() -> Self {
        Self { budget: 1 }
    }
}

/// Forward-only reader limited to the subtree of the current handler.
pub struct ExtendedReader<'a, T: ?Sized> {
    mapper: &'a XmlMapper<T>,
    raw: &'a mut dyn XmlCursor,
    /// Innermost active subtree.
    current: DepthContext,
    /// Enclosing subtrees, outermost first.
    enclosing: Vec<DepthContext>,
    trim_element_text: bool,
}

impl<'a, T: ?Sized> ExtendedReader<'a, T> {
    /// Wrap a raw cursor positioned on the start tag of the root element.
    pub(crate) fn new(mapper: &'a XmlMapper<T>, raw: &'a mut dyn XmlCursor) -> Self {
        Self {
            mapper,
            raw,
            current: DepthContext::new(),
            enclosing: Vec::new(),
            trim_element_text: true,
        }
    }

    /// The mapper driving this parse.
    #[must_use]
    pub fn xml_mapper(&self) -> &'a XmlMapper<T> {
        self.mapper
    }

    /// Whether [`ExtendedReader::element_text`] trims its result. Defaults to `true`.
    pub fn set_trim_element_text(&mut self, trim: bool) {
        self.trim_element_text = trim;
    }

    /// Remaining depth budget of the current subtree.
    #[must_use]
    pub fn remaining_depth(&self) -> usize {
        self.current.budget
    }

    /// Number of nested dispatches currently active below the root handler.
    #[must_use]
    pub fn nesting(&self) -> usize {
        self.enclosing.len()
    }

    fn safe_close(&mut self) {
        if self.raw.is_closed() {
            return;
        }
        if let Err(e) = self.raw.close() {
            tracing::warn!(error = %e, "Failed to close cursor after reading past end");
        }
    }

    fn past_end(&mut self) -> MapperError {
        let location = self.raw.location();
        self.safe_close();
        MapperError::ReadPastEnd { location }
    }

    fn track(&mut self, kind: EventKind) {
        match kind {
            EventKind::StartElement => self.current.budget += 1,
            EventKind::EndElement => self.current.budget = self.current.budget.saturating_sub(1),
            _ => {}
        }
    }

    /// Advance to the next event of the current subtree.
    ///
    /// # Errors
    /// `ReadPastEnd` once the subtree's end tag has been consumed; the raw
    /// cursor is closed in that case.
    pub fn next(&mut self) -> Result<EventKind> {
        if self.current.budget == 0 {
            return Err(self.past_end());
        }
        let kind = self.raw.next()?;
        self.track(kind);
        Ok(kind)
    }

    /// Advance to the next start or end tag of the current subtree, skipping
    /// whitespace, comments and processing instructions.
    ///
    /// # Errors
    /// `ReadPastEnd` as for [`ExtendedReader::next`]; `UnexpectedEvent` on
    /// non-whitespace text.
    pub fn next_tag(&mut self) -> Result<EventKind> {
        if self.current.budget == 0 {
            return Err(self.past_end());
        }
        let kind = self.raw.next_tag()?;
        self.track(kind);
        Ok(kind)
    }

    /// Whether another event of the current subtree can be read.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.current.budget > 0 && self.raw.has_next()
    }

    /// Dispatch the element at the current start tag to its registered handler.
    ///
    /// On return the cursor is on the element's end tag: content the handler
    /// left unread is discarded. The end tag counts against the caller's
    /// budget like any other.
    ///
    /// # Errors
    /// `UnexpectedEvent` if not on a start tag, `UnexpectedElement` if no
    /// handler is registered, or the handler's error.
    pub fn handle_nested(&mut self, value: &mut T) -> Result<()> {
        self.require(EventKind::StartElement, None, None)?;
        self.enclosing
            .push(std::mem::replace(&mut self.current, DepthContext::new()));

        let mapper = self.mapper;
        let mut result = mapper.process_nested(self, value);
        if result.is_ok() && self.current.budget > 0 {
            tracing::trace!(
                remaining = self.current.budget,
                element = ?self.raw.name(),
                "Discarding content left unread by handler"
            );
            result = self.discard_subtree();
        }

        if let Some(parent) = self.enclosing.pop() {
            self.current = parent;
        }
        result?;
        self.current.budget = self.current.budget.saturating_sub(1);
        Ok(())
    }

    /// Dispatch the attribute at `index` of the current start tag to its
    /// registered handler. Does not move the cursor.
    ///
    /// # Errors
    /// `UnexpectedEvent` if not on a start tag, `UnexpectedAttribute` if no
    /// handler is registered, or the handler's error.
    pub fn handle_attribute(&self, value: &mut T, index: usize) -> Result<()> {
        self.require(EventKind::StartElement, None, None)?;
        self.mapper.process_attribute(self, index, value)
    }

    /// Skip everything up to and including the end tag of the element the
    /// cursor is in, nested elements included.
    ///
    /// # Errors
    /// `ReadPastEnd` if the current subtree is already exhausted.
    pub fn discard_remainder(&mut self) -> Result<()> {
        if self.current.budget == 0 {
            return Err(self.past_end());
        }
        let result = self.skip_to_end_tag();
        self.current.budget -= 1;
        result
    }

    fn discard_subtree(&mut self) -> Result<()> {
        while self.current.budget > 0 {
            self.discard_remainder()?;
        }
        Ok(())
    }

    fn skip_to_end_tag(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.raw.next()? {
                EventKind::StartElement => depth += 1,
                EventKind::EndElement if depth == 0 => return Ok(()),
                EventKind::EndElement => depth -= 1,
                EventKind::EndDocument => {
                    return Err(MapperError::UnexpectedEvent {
                        expected: EventKind::EndElement,
                        actual: EventKind::EndDocument,
                        detail: None,
                        location: self.raw.location(),
                    })
                }
                _ => {}
            }
        }
    }

    /// Read the text content of the current element, leaving the cursor on
    /// its end tag. Trimmed unless disabled with
    /// [`ExtendedReader::set_trim_element_text`].
    ///
    /// # Errors
    /// `UnexpectedEvent` if not on a start tag or the element has children.
    pub fn element_text(&mut self) -> Result<String> {
        if self.current.budget == 0 {
            return Err(self.past_end());
        }
        let text = self.raw.element_text()?;
        self.current.budget -= 1;
        if self.trim_element_text {
            Ok(text.trim_matches(is_xml_whitespace_char).to_string())
        } else {
            Ok(text)
        }
    }

    /// Always fails: the parse driver owns the cursor.
    ///
    /// # Errors
    /// Always `CloseNotAllowed`.
    pub fn close(&mut self) -> Result<()> {
        Err(MapperError::CloseNotAllowed)
    }

    /// Fail unless the current event has the given kind and, when given, name.
    ///
    /// # Errors
    /// `UnexpectedEvent` describing the mismatch.
    pub fn require(&self, kind: EventKind, namespace: Option<&str>, local_name: Option<&str>) -> Result<()> {
        self.raw.require(kind, namespace, local_name)
    }

    #[must_use]
    pub fn event_kind(&self) -> EventKind {
        self.raw.event_kind()
    }

    #[must_use]
    pub fn location(&self) -> Location {
        self.raw.location()
    }

    #[must_use]
    pub fn is_start_element(&self) -> bool {
        self.event_kind() == EventKind::StartElement
    }

    #[must_use]
    pub fn is_end_element(&self) -> bool {
        self.event_kind() == EventKind::EndElement
    }

    #[must_use]
    pub fn is_characters(&self) -> bool {
        self.event_kind() == EventKind::Characters
    }

    #[must_use]
    pub fn is_whitespace(&self) -> bool {
        self.raw.is_whitespace()
    }

    /// Name of the current start or end tag.
    #[must_use]
    pub fn name(&self) -> Option<&QName> {
        self.raw.name()
    }

    /// Name of the current start or end tag, as an error when there is none.
    ///
    /// # Errors
    /// `UnexpectedEvent` when the cursor is not on a tag.
    pub fn element_name(&self) -> Result<&QName> {
        self.raw.name().ok_or_else(|| MapperError::UnexpectedEvent {
            expected: EventKind::StartElement,
            actual: self.event_kind(),
            detail: None,
            location: self.location(),
        })
    }

    #[must_use]
    pub fn local_name(&self) -> Option<&str> {
        self.name().map(QName::local_name)
    }

    #[must_use]
    pub fn namespace_uri(&self) -> Option<&str> {
        self.name().and_then(QName::namespace)
    }

    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.raw.prefix()
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.raw.text()
    }

    #[must_use]
    pub fn pi_target(&self) -> Option<&str> {
        self.raw.pi_target()
    }

    #[must_use]
    pub fn pi_data(&self) -> Option<&str> {
        self.raw.pi_data()
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.raw.version()
    }

    #[must_use]
    pub fn encoding(&self) -> Option<&str> {
        self.raw.encoding()
    }

    #[must_use]
    pub fn standalone(&self) -> Option<bool> {
        self.raw.standalone()
    }

    #[must_use]
    pub fn namespace_count(&self) -> usize {
        self.raw.namespaces().len()
    }

    /// Namespace declarations on the current start tag.
    #[must_use]
    pub fn namespaces(&self) -> &[NamespaceBinding] {
        self.raw.namespaces()
    }

    #[must_use]
    pub fn namespace_uri_for_prefix(&self, prefix: Option<&str>) -> Option<&str> {
        self.raw.namespace_uri_for_prefix(prefix)
    }

    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.raw.attributes().len()
    }

    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        self.raw.attributes()
    }

    /// Attribute at `index` of the current start tag.
    ///
    /// # Errors
    /// `AttributeIndex` if `index` is out of range.
    pub fn attribute(&self, index: usize) -> Result<&Attribute> {
        let attributes = self.raw.attributes();
        attributes.get(index).ok_or_else(|| MapperError::AttributeIndex {
            index,
            count: attributes.len(),
            location: self.location(),
        })
    }

    /// # Errors
    /// `AttributeIndex` if `index` is out of range.
    pub fn attribute_name(&self, index: usize) -> Result<&QName> {
        self.attribute(index).map(Attribute::name)
    }

    /// # Errors
    /// `AttributeIndex` if `index` is out of range.
    pub fn attribute_namespace(&self, index: usize) -> Result<Option<&str>> {
        Ok(self.attribute_name(index)?.namespace())
    }

    /// # Errors
    /// `AttributeIndex` if `index` is out of range.
    pub fn attribute_local_name(&self, index: usize) -> Result<&str> {
        Ok(self.attribute_name(index)?.local_name())
    }

    /// # Errors
    /// `AttributeIndex` if `index` is out of range.
    pub fn attribute_prefix(&self, index: usize) -> Result<Option<&str>> {
        self.attribute(index).map(Attribute::prefix)
    }

    /// # Errors
    /// `AttributeIndex` if `index` is out of range.
    pub fn attribute_value(&self, index: usize) -> Result<&str> {
        self.attribute(index).map(Attribute::value)
    }

    /// Value of the attribute with the given name on the current start tag.
    #[must_use]
    pub fn find_attribute_value(&self, namespace: Option<&str>, local_name: &str) -> Option<&str> {
        self.raw.attribute_value(namespace, local_name)
    }

    /// Value of the unqualified `id` attribute.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.find_attribute_value(None, ID_ATTRIBUTE)
    }

    /// # Errors
    /// `AttributeIndex`, or `InvalidNumber` if the value is not an `i32`.
    pub fn int_attribute_value(&self, index: usize) -> Result<i32> {
        values::parse_integer(self.attribute_value(index)?, self.location())
    }

    /// # Errors
    /// `AttributeIndex`, or `InvalidNumber` if the value is not an `i64`.
    pub fn long_attribute_value(&self, index: usize) -> Result<i64> {
        values::parse_integer(self.attribute_value(index)?, self.location())
    }

    /// Whitespace-separated items of the attribute at `index`.
    ///
    /// # Errors
    /// `AttributeIndex` if `index` is out of range.
    pub fn list_attribute_value(&self, index: usize) -> Result<Vec<String>> {
        Ok(values::list_items(self.attribute_value(index)?)
            .map(str::to_string)
            .collect())
    }

    /// # Errors
    /// `AttributeIndex`, or `InvalidNumber` on the first malformed item.
    pub fn int_list_attribute_value(&self, index: usize) -> Result<Vec<i32>> {
        let location = self.location();
        values::list_items(self.attribute_value(index)?)
            .map(|item| values::parse_integer(item, location))
            .collect()
    }

    /// # Errors
    /// `AttributeIndex`, or `InvalidNumber` on the first malformed item.
    pub fn long_list_attribute_value(&self, index: usize) -> Result<Vec<i64>> {
        let location = self.location();
        values::list_items(self.attribute_value(index)?)
            .map(|item| values::parse_integer(item, location))
            .collect()
    }

    /// Parse the attribute at `index` by name into `E`.
    ///
    /// # Errors
    /// `AttributeIndex`, or `InvalidEnum` carrying `E`'s parse error.
    pub fn enum_attribute_value<E>(&self, index: usize) -> Result<E>
    where
        E: FromStr,
        E::Err: Display,
    {
        values::parse_enum(self.attribute_value(index)?, self.location())
    }

    /// # Errors
    /// `AttributeIndex`, or `InvalidEnum` on the first unknown item.
    pub fn enum_list_attribute_value<E>(&self, index: usize) -> Result<Vec<E>>
    where
        E: FromStr,
        E::Err: Display,
    {
        let location = self.location();
        values::list_items(self.attribute_value(index)?)
            .map(|item| values::parse_enum(item, location))
            .collect()
    }

    /// Decode the attribute at `index` as `kind`.
    ///
    /// # Errors
    /// `AttributeIndex`, or a value-parse error for malformed input.
    pub fn typed_attribute_value(&self, index: usize, kind: ValueKind<'_>) -> Result<AttributeValue> {
        values::decode(self.attribute_value(index)?, kind, self.location())
    }

    /// Decode every whitespace-separated item of the attribute at `index` as `kind`.
    ///
    /// # Errors
    /// `AttributeIndex`, or a value-parse error on the first malformed item.
    pub fn typed_list_attribute_value(&self, index: usize, kind: ValueKind<'_>) -> Result<Vec<AttributeValue>> {
        let location = self.location();
        values::list_items(self.attribute_value(index)?)
            .map(|item| values::decode(item, kind, location))
            .collect()
    }
}

impl<T: ?Sized> fmt::Debug for ExtendedReader<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedReader")
            .field("event", &self.event_kind())
            .field("location", &self.location())
            .field("budget", &self.current.budget)
            .field("nesting", &self.enclosing.len())
            .field("trim_element_text", &self.trim_element_text)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::ElementReader;
    use crate::xml::XmlReader;
    use pretty_assertions::assert_eq;

    type Log = Vec<String>;

    fn with_reader<R>(
        mapper: &XmlMapper<Log>,
        xml: &str,
        f: impl FnOnce(&mut ExtendedReader<'_, Log>) -> R,
    ) -> R {
        let mut raw = XmlReader::from_text(xml);
        raw.next_tag().unwrap();
        let mut reader = ExtendedReader::new(mapper, &mut raw);
        f(&mut reader)
    }

    /// Returns without reading anything.
    struct Lazy;

    impl ElementReader<Log> for Lazy {
        fn read_element(&self, reader: &mut ExtendedReader<'_, Log>, value: &mut Log) -> Result<()> {
            value.push(reader.local_name().unwrap_or_default().to_string());
            Ok(())
        }
    }

    /// Reads element text.
    struct Text;

    impl ElementReader<Log> for Text {
        fn read_element(&self, reader: &mut ExtendedReader<'_, Log>, value: &mut Log) -> Result<()> {
            let text = reader.element_text()?;
            value.push(text);
            Ok(())
        }
    }

    #[test]
    fn test_next_tracks_budget() {
        let mapper = XmlMapper::new();
        with_reader(&mapper, "<a><b/>text<c></c></a>", |reader| {
            use EventKind::*;
            let mut seen = Vec::new();
            while reader.has_next() {
                seen.push((reader.next().unwrap(), reader.remaining_depth()));
            }
            assert_eq!(
                seen,
                vec![
                    (StartElement, 2),
                    (EndElement, 1),
                    (Characters, 1),
                    (StartElement, 2),
                    (EndElement, 1),
                    (EndElement, 0),
                ]
            );
        });
    }

    #[test]
    fn test_read_past_end_closes_cursor() {
        let mapper = XmlMapper::new();
        with_reader(&mapper, "<a/><!-- after -->", |reader| {
            assert_eq!(reader.next_tag().unwrap(), EventKind::EndElement);
            let err = reader.next().unwrap_err();
            assert!(matches!(err, MapperError::ReadPastEnd { .. }));
            assert_eq!(err.kind(), ErrorKind::CursorProtocol);
            assert!(reader.raw.is_closed());
            assert!(!reader.has_next());
        });
    }

    #[test]
    fn test_discard_remainder() {
        let mapper = XmlMapper::new();
        with_reader(&mapper, "<a><b><c/>x<!-- y --></b><d/></a>", |reader| {
            assert_eq!(reader.next_tag().unwrap(), EventKind::StartElement);
            assert_eq!(reader.remaining_depth(), 2);

            reader.discard_remainder().unwrap();
            assert_eq!(reader.remaining_depth(), 1);
            assert!(reader.is_end_element());
            assert_eq!(reader.local_name(), Some("b"));

            assert_eq!(reader.next_tag().unwrap(), EventKind::StartElement);
            assert_eq!(reader.local_name(), Some("d"));
        });
    }

    #[test]
    fn test_discard_remainder_at_zero_budget() {
        let mapper = XmlMapper::new();
        with_reader(&mapper, "<a><b/></a>", |reader| {
            reader.discard_remainder().unwrap();
            assert_eq!(reader.remaining_depth(), 0);
            assert_eq!(reader.local_name(), Some("a"));

            let err = reader.discard_remainder().unwrap_err();
            assert!(matches!(err, MapperError::ReadPastEnd { .. }));
            assert!(reader.raw.is_closed());
        });
    }

    #[test]
    fn test_handle_nested_discards_unread_content() {
        let mapper = XmlMapper::new();
        mapper.register_element(QName::local("b"), Lazy).unwrap();

        let mut log = Vec::new();
        with_reader(&mapper, "<a><b><x/><y>t</y></b><c/></a>", |reader| {
            reader.next_tag().unwrap();
            assert_eq!(reader.remaining_depth(), 2);
            reader.handle_nested(&mut log).unwrap();

            assert_eq!(reader.nesting(), 0);
            assert_eq!(reader.remaining_depth(), 1);
            assert!(reader.is_end_element());
            assert_eq!(reader.local_name(), Some("b"));

            assert_eq!(reader.next_tag().unwrap(), EventKind::StartElement);
            assert_eq!(reader.local_name(), Some("c"));
        });
        assert_eq!(log, vec!["b".to_string()]);
    }

    #[test]
    fn test_handle_nested_with_element_text() {
        let mapper = XmlMapper::new();
        mapper.register_element(QName::local("t"), Text).unwrap();

        let mut log = Vec::new();
        with_reader(&mapper, "<a><t>  one  </t><t>two</t></a>", |reader| {
            while reader.next_tag().unwrap() == EventKind::StartElement {
                reader.handle_nested(&mut log).unwrap();
            }
            assert_eq!(reader.remaining_depth(), 0);
        });
        assert_eq!(log, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_handle_nested_requires_start_tag() {
        let mapper = XmlMapper::new();
        with_reader(&mapper, "<a>text</a>", |reader| {
            reader.next().unwrap();
            let err = reader.handle_nested(&mut Vec::new()).unwrap_err();
            assert!(matches!(err, MapperError::UnexpectedEvent { actual: EventKind::Characters, .. }));
        });
    }

    #[test]
    fn test_handle_nested_unregistered_restores_context() {
        let mapper = XmlMapper::new();
        with_reader(&mapper, "<a>\n  <b/></a>", |reader| {
            reader.next_tag().unwrap();
            let err = reader.handle_nested(&mut Vec::new()).unwrap_err();
            assert!(matches!(err, MapperError::UnexpectedElement { ref name, .. } if name == &QName::local("b")));
            assert_eq!(err.location().map(|l| (l.line, l.column)), Some((2, 3)));
            assert_eq!(reader.nesting(), 0);
            assert_eq!(reader.remaining_depth(), 2);
        });
    }

    #[test]
    fn test_element_text_trimming() {
        let mapper = XmlMapper::new();
        with_reader(&mapper, "<a>\n  value\n</a>", |reader| {
            reader.set_trim_element_text(false);
            assert_eq!(reader.element_text().unwrap(), "\n  value\n");
            assert_eq!(reader.remaining_depth(), 0);
            assert!(matches!(reader.element_text(), Err(MapperError::ReadPastEnd { .. })));
        });
        with_reader(&mapper, "<a>\n  value\n</a>", |reader| {
            assert_eq!(reader.element_text().unwrap(), "value");
        });
    }

    #[test]
    fn test_close_is_not_allowed() {
        let mapper = XmlMapper::new();
        with_reader(&mapper, "<a/>", |reader| {
            assert!(matches!(reader.close(), Err(MapperError::CloseNotAllowed)));
            assert!(!reader.raw.is_closed());
        });
    }

    #[test]
    fn test_attribute_introspection() {
        let mapper = XmlMapper::new();
        let xml = r#"<a xmlns:p="urn:p" id="main" p:kind="x"/>"#;
        with_reader(&mapper, xml, |reader| {
            assert_eq!(reader.attribute_count(), 2);
            assert_eq!(reader.namespace_count(), 1);
            assert_eq!(reader.id(), Some("main"));
            assert_eq!(reader.attribute_local_name(1).unwrap(), "kind");
            assert_eq!(reader.attribute_namespace(1).unwrap(), Some("urn:p"));
            assert_eq!(reader.attribute_prefix(1).unwrap(), Some("p"));
            assert_eq!(reader.find_attribute_value(Some("urn:p"), "kind"), Some("x"));

            let err = reader.attribute_value(2).unwrap_err();
            assert!(matches!(err, MapperError::AttributeIndex { index: 2, count: 2, .. }));
        });
    }

    #[derive(Debug, PartialEq)]
    enum Mode {
        Read,
        Write,
    }

    impl FromStr for Mode {
        type Err = String;

        fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
            match s {
                "read" => Ok(Self::Read),
                "write" => Ok(Self::Write),
                other => Err(format!("unknown mode '{other}'")),
            }
        }
    }

    #[test]
    fn test_typed_accessors() {
        let mapper = XmlMapper::new();
        let xml = r#"<a n="42" big="9000000000" ints="1 2 3" bad="1 x 3" mode="write" modes="read write" words=" a b "/>"#;
        with_reader(&mapper, xml, |reader| {
            assert_eq!(reader.int_attribute_value(0).unwrap(), 42);
            assert_eq!(reader.long_attribute_value(1).unwrap(), 9_000_000_000);
            assert!(reader.int_attribute_value(1).is_err());
            assert_eq!(reader.int_list_attribute_value(2).unwrap(), vec![1, 2, 3]);
            assert_eq!(reader.long_list_attribute_value(2).unwrap(), vec![1, 2, 3]);

            let err = reader.int_list_attribute_value(3).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValueParse);
            assert_eq!(err.location(), Some(reader.location()));

            assert_eq!(reader.enum_attribute_value::<Mode>(4).unwrap(), Mode::Write);
            assert_eq!(
                reader.enum_list_attribute_value::<Mode>(5).unwrap(),
                vec![Mode::Read, Mode::Write]
            );
            let err = reader.enum_attribute_value::<Mode>(0).unwrap_err();
            assert!(err.to_string().contains("unknown mode '42'"));

            assert_eq!(reader.list_attribute_value(6).unwrap(), vec!["a", "b"]);
        });
    }

    #[test]
    fn test_typed_attribute_value() {
        let mapper = XmlMapper::new();
        with_reader(&mapper, r#"<a n="7" list="4 5" mode="read"/>"#, |reader| {
            assert_eq!(reader.typed_attribute_value(0, ValueKind::Int).unwrap(), AttributeValue::Int(7));
            assert_eq!(
                reader.typed_attribute_value(0, ValueKind::String).unwrap(),
                AttributeValue::String("7".to_string())
            );
            assert_eq!(
                reader.typed_list_attribute_value(1, ValueKind::Long).unwrap(),
                vec![AttributeValue::Long(4), AttributeValue::Long(5)]
            );
            assert_eq!(
                reader.typed_attribute_value(2, ValueKind::Enum(&["write", "read"])).unwrap(),
                AttributeValue::Enum(1)
            );
            assert!(reader.typed_attribute_value(2, ValueKind::Int).is_err());
        });
    }
}
