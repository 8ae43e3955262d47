//! Raw forward-only XML event cursor.
//!
//! [`XmlCursor`] is the pull interface the mapper is built on: one current
//! event, advanced with [`XmlCursor::next`], with read-only introspection of
//! whatever that event carries. [`XmlReader`] implements it on top of
//! quick-xml's namespace-aware reader.

use std::fmt;
use std::io::{BufReader, Read};

use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use super::location::{LineTracker, Location};
use crate::error::{MapperError, Result};
use crate::qname::QName;

/// Namespace URI permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Kind of the event the cursor is positioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventKind {
    /// Before the first event; also covers the XML declaration.
    #[default]
    StartDocument,
    /// A start tag. Empty-element tags are reported as start + end.
    StartElement,
    /// An end tag.
    EndElement,
    /// Character data, with entity references already resolved.
    Characters,
    /// A CDATA section.
    CData,
    /// A comment.
    Comment,
    /// A processing instruction.
    ProcessingInstruction,
    /// A document type declaration.
    Dtd,
    /// End of input.
    EndDocument,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StartDocument => "START_DOCUMENT",
            Self::StartElement => "START_ELEMENT",
            Self::EndElement => "END_ELEMENT",
            Self::Characters => "CHARACTERS",
            Self::CData => "CDATA",
            Self::Comment => "COMMENT",
            Self::ProcessingInstruction => "PROCESSING_INSTRUCTION",
            Self::Dtd => "DTD",
            Self::EndDocument => "END_DOCUMENT",
        })
    }
}

/// An attribute of the current start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: QName,
    prefix: Option<String>,
    value: String,
}

impl Attribute {
    /// Create an attribute.
    #[must_use]
    pub fn new(name: QName, prefix: Option<String>, value: impl Into<String>) -> Self {
        Self {
            name,
            prefix,
            value: value.into(),
        }
    }

    /// Resolved attribute name. Unprefixed attributes are in no namespace.
    #[must_use]
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Prefix used in the document, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Unescaped attribute value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A namespace declaration (`xmlns` or `xmlns:prefix`) on a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceBinding {
    prefix: Option<String>,
    uri: String,
}

impl NamespaceBinding {
    /// Create a binding; `None` prefix is the default namespace.
    #[must_use]
    pub fn new(prefix: Option<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix,
            uri: uri.into(),
        }
    }

    /// Declared prefix, `None` for the default namespace.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Bound namespace URI. Empty undeclares the default namespace.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// Forward-only XML event cursor.
///
/// Implementations report empty-element tags as a start/end pair and
/// coalesce adjacent character data, so handlers see one event per logical
/// node.
pub trait XmlCursor {
    /// Advance to the next event and return its kind.
    fn next(&mut self) -> Result<EventKind>;

    /// Kind of the current event.
    fn event_kind(&self) -> EventKind;

    /// Whether another event can be read.
    fn has_next(&self) -> bool;

    /// Location where the current event starts.
    fn location(&self) -> Location;

    /// Name of the current start or end tag.
    fn name(&self) -> Option<&QName>;

    /// Prefix of the current start or end tag as written in the document.
    fn prefix(&self) -> Option<&str>;

    /// Attributes of the current start tag, namespace declarations excluded.
    fn attributes(&self) -> &[Attribute];

    /// Namespace declarations on the current start tag.
    fn namespaces(&self) -> &[NamespaceBinding];

    /// Look up the URI bound to `prefix` (`None` for the default namespace)
    /// in the scope of the current event.
    fn namespace_uri_for_prefix(&self, prefix: Option<&str>) -> Option<&str>;

    /// Text of the current characters, CDATA, comment or DTD event.
    fn text(&self) -> Option<&str>;

    /// Target of the current processing instruction.
    fn pi_target(&self) -> Option<&str>;

    /// Data of the current processing instruction.
    fn pi_data(&self) -> Option<&str>;

    /// Version from the XML declaration.
    fn version(&self) -> Option<&str>;

    /// Encoding from the XML declaration.
    fn encoding(&self) -> Option<&str>;

    /// Standalone flag from the XML declaration.
    fn standalone(&self) -> Option<bool>;

    /// Release the underlying input. Later reads fail.
    fn close(&mut self) -> Result<()>;

    /// Whether [`XmlCursor::close`] was called.
    fn is_closed(&self) -> bool;

    /// Whether the current event is character data made only of XML whitespace.
    fn is_whitespace(&self) -> bool {
        matches!(self.event_kind(), EventKind::Characters | EventKind::CData)
            && self.text().is_some_and(is_xml_whitespace)
    }

    /// Fail unless the current event has the given kind and, when given, name.
    fn require(&self, kind: EventKind, namespace: Option<&str>, local_name: Option<&str>) -> Result<()> {
        let actual = self.event_kind();
        if actual != kind {
            return Err(MapperError::UnexpectedEvent {
                expected: kind,
                actual,
                detail: None,
                location: self.location(),
            });
        }
        if namespace.is_none() && local_name.is_none() {
            return Ok(());
        }
        let name = self.name();
        let namespace_ok = namespace.is_none_or(|ns| name.and_then(QName::namespace) == Some(ns));
        let local_ok = local_name.is_none_or(|local| name.map(QName::local_name) == Some(local));
        if namespace_ok && local_ok {
            Ok(())
        } else {
            Err(MapperError::UnexpectedEvent {
                expected: kind,
                actual,
                detail: name.map(|n| format!("found name '{n}'")),
                location: self.location(),
            })
        }
    }

    /// Skip whitespace, comments and processing instructions up to the next
    /// start or end tag.
    fn next_tag(&mut self) -> Result<EventKind> {
        loop {
            let kind = self.next()?;
            match kind {
                EventKind::StartElement | EventKind::EndElement => return Ok(kind),
                EventKind::Comment | EventKind::ProcessingInstruction => {}
                EventKind::Characters | EventKind::CData if self.is_whitespace() => {}
                other => {
                    return Err(MapperError::UnexpectedEvent {
                        expected: EventKind::StartElement,
                        actual: other,
                        detail: Some("expected a start or end tag".to_string()),
                        location: self.location(),
                    })
                }
            }
        }
    }

    /// Read the text-only content of the current element.
    ///
    /// Must be called on a start tag; leaves the cursor on the matching end tag.
    fn element_text(&mut self) -> Result<String> {
        self.require(EventKind::StartElement, None, None)?;
        let mut content = String::new();
        loop {
            match self.next()? {
                EventKind::Characters | EventKind::CData => {
                    content.push_str(self.text().unwrap_or_default());
                }
                EventKind::Comment | EventKind::ProcessingInstruction => {}
                EventKind::EndElement => return Ok(content),
                other => {
                    return Err(MapperError::UnexpectedEvent {
                        expected: EventKind::EndElement,
                        actual: other,
                        detail: Some("element text must not contain elements".to_string()),
                        location: self.location(),
                    })
                }
            }
        }
    }

    /// Value of the attribute with the given name on the current start tag.
    fn attribute_value(&self, namespace: Option<&str>, local_name: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|attr| attr.name().matches(namespace, local_name))
            .map(Attribute::value)
    }
}

impl<C: XmlCursor + ?Sized> XmlCursor for &mut C {
    fn next(&mut self) -> Result<EventKind> {
        (**self).next()
    }

    fn event_kind(&self) -> EventKind {
        (**self).event_kind()
    }

    fn has_next(&self) -> bool {
        (**self).has_next()
    }

    fn location(&self) -> Location {
        (**self).location()
    }

    fn name(&self) -> Option<&QName> {
        (**self).name()
    }

    fn prefix(&self) -> Option<&str> {
        (**self).prefix()
    }

    fn attributes(&self) -> &[Attribute] {
        (**self).attributes()
    }

    fn namespaces(&self) -> &[NamespaceBinding] {
        (**self).namespaces()
    }

    fn namespace_uri_for_prefix(&self, prefix: Option<&str>) -> Option<&str> {
        (**self).namespace_uri_for_prefix(prefix)
    }

    fn text(&self) -> Option<&str> {
        (**self).text()
    }

    fn pi_target(&self) -> Option<&str> {
        (**self).pi_target()
    }

    fn pi_data(&self) -> Option<&str> {
        (**self).pi_data()
    }

    fn version(&self) -> Option<&str> {
        (**self).version()
    }

    fn encoding(&self) -> Option<&str> {
        (**self).encoding()
    }

    fn standalone(&self) -> Option<bool> {
        (**self).standalone()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

/// XML whitespace: space, tab, carriage return and line feed.
pub(crate) fn is_xml_whitespace_char(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

pub(crate) fn is_xml_whitespace(text: &str) -> bool {
    text.chars().all(is_xml_whitespace_char)
}

/// One tokenizer event, converted to owned data while the namespace
/// resolver still describes it.
#[derive(Debug)]
enum Token {
    Decl {
        version: String,
        encoding: Option<String>,
        standalone: Option<bool>,
    },
    Start {
        name: QName,
        prefix: Option<String>,
        attributes: Vec<Attribute>,
        namespaces: Vec<NamespaceBinding>,
    },
    End {
        name: QName,
        prefix: Option<String>,
    },
    Text(String),
    CData(String),
    Comment(String),
    Pi {
        target: String,
        data: String,
    },
    DocType(String),
    Eof,
}

/// The event the reader is positioned on.
#[derive(Debug, Default)]
struct Current {
    kind: EventKind,
    location: Location,
    name: Option<QName>,
    prefix: Option<String>,
    attributes: Vec<Attribute>,
    namespaces: Vec<NamespaceBinding>,
    text: Option<String>,
    pi_target: Option<String>,
}

impl Current {
    fn of(kind: EventKind, location: Location) -> Self {
        Self {
            kind,
            location,
            ..Self::default()
        }
    }

    fn with_text(kind: EventKind, location: Location, text: String) -> Self {
        Self {
            text: Some(text),
            ..Self::of(kind, location)
        }
    }
}

/// quick-xml backed [`XmlCursor`].
pub struct XmlReader<R: Read> {
    reader: NsReader<BufReader<LineTracker<R>>>,
    buf: Vec<u8>,
    current: Current,
    lookahead: Option<(u64, Token)>,
    /// Namespace declarations per open element, innermost last.
    scopes: Vec<Vec<NamespaceBinding>>,
    leave_scope: bool,
    version: Option<String>,
    encoding: Option<String>,
    standalone: Option<bool>,
    closed: bool,
}

impl<'a> XmlReader<&'a [u8]> {
    /// Create a reader over an in-memory document.
    #[must_use]
    pub fn from_text(input: &'a str) -> Self {
        Self::new(input.as_bytes())
    }
}

impl<R: Read> XmlReader<R> {
    /// Create a reader positioned at the start of the document.
    pub fn new(input: R) -> Self {
        let mut reader = NsReader::from_reader(BufReader::new(LineTracker::new(input)));
        reader.config_mut().expand_empty_elements = true;
        Self {
            reader,
            buf: Vec::new(),
            current: Current::of(EventKind::StartDocument, Location::START),
            lookahead: None,
            scopes: Vec::new(),
            leave_scope: false,
            version: None,
            encoding: None,
            standalone: None,
            closed: false,
        }
    }

    fn locate(&self, offset: u64) -> Location {
        self.reader.get_ref().get_ref().locate(offset)
    }

    fn read_token(&mut self) -> Result<(u64, Token)> {
        if let Some(token) = self.lookahead.take() {
            return Ok(token);
        }
        let offset = self.reader.buffer_position();
        self.reader.get_mut().get_mut().forget_before(offset);
        self.buf.clear();
        let converted = match self.reader.read_resolved_event_into(&mut self.buf) {
            Ok((resolve, event)) => {
                let namespace = resolve_namespace(resolve);
                convert_event(&self.reader, namespace, event)
            }
            Err(err) => Err(err.to_string()),
        };
        match converted {
            Ok(token) => Ok((offset, token)),
            Err(message) => Err(MapperError::Syntax {
                message,
                location: self.locate(self.reader.error_position()),
            }),
        }
    }
}

impl<R: Read> XmlCursor for XmlReader<R> {
    fn next(&mut self) -> Result<EventKind> {
        if self.closed {
            return Err(MapperError::CursorClosed);
        }
        if self.event_kind() == EventKind::EndDocument {
            return Err(MapperError::ReadPastEnd {
                location: self.current.location,
            });
        }
        if self.leave_scope {
            self.scopes.pop();
            self.leave_scope = false;
        }

        loop {
            let (offset, token) = self.read_token()?;
            let location = self.locate(offset);
            self.current = match token {
                Token::Decl {
                    version,
                    encoding,
                    standalone,
                } => {
                    self.version = Some(version);
                    self.encoding = encoding;
                    self.standalone = standalone;
                    continue;
                }
                Token::Start {
                    name,
                    prefix,
                    attributes,
                    namespaces,
                } => {
                    self.scopes.push(namespaces.clone());
                    Current {
                        name: Some(name),
                        prefix,
                        attributes,
                        namespaces,
                        ..Current::of(EventKind::StartElement, location)
                    }
                }
                Token::End { name, prefix } => {
                    self.leave_scope = true;
                    Current {
                        name: Some(name),
                        prefix,
                        ..Current::of(EventKind::EndElement, location)
                    }
                }
                Token::Text(mut text) => {
                    loop {
                        match self.read_token()? {
                            (_, Token::Text(more)) => text.push_str(&more),
                            other => {
                                self.lookahead = Some(other);
                                break;
                            }
                        }
                    }
                    Current::with_text(EventKind::Characters, location, text)
                }
                Token::CData(text) => Current::with_text(EventKind::CData, location, text),
                Token::Comment(text) => Current::with_text(EventKind::Comment, location, text),
                Token::Pi { target, data } => Current {
                    pi_target: Some(target),
                    ..Current::with_text(EventKind::ProcessingInstruction, location, data)
                },
                Token::DocType(text) => Current::with_text(EventKind::Dtd, location, text),
                Token::Eof if !self.scopes.is_empty() => {
                    return Err(MapperError::Syntax {
                        message: format!("unexpected end of document, {} element(s) still open", self.scopes.len()),
                        location,
                    });
                }
                Token::Eof => Current::of(EventKind::EndDocument, location),
            };
            return Ok(self.event_kind());
        }
    }

    fn event_kind(&self) -> EventKind {
        self.current.kind
    }

    fn has_next(&self) -> bool {
        !self.closed && self.event_kind() != EventKind::EndDocument
    }

    fn location(&self) -> Location {
        self.current.location
    }

    fn name(&self) -> Option<&QName> {
        self.current.name.as_ref()
    }

    fn prefix(&self) -> Option<&str> {
        self.current.prefix.as_deref()
    }

    fn attributes(&self) -> &[Attribute] {
        &self.current.attributes
    }

    fn namespaces(&self) -> &[NamespaceBinding] {
        &self.current.namespaces
    }

    fn namespace_uri_for_prefix(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|binding| binding.prefix() == prefix)
            .map(NamespaceBinding::uri)
            .filter(|uri| !uri.is_empty())
    }

    fn text(&self) -> Option<&str> {
        match self.event_kind() {
            EventKind::ProcessingInstruction => None,
            _ => self.current.text.as_deref(),
        }
    }

    fn pi_target(&self) -> Option<&str> {
        self.current.pi_target.as_deref()
    }

    fn pi_data(&self) -> Option<&str> {
        match self.event_kind() {
            EventKind::ProcessingInstruction => self.current.text.as_deref(),
            _ => None,
        }
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    fn standalone(&self) -> Option<bool> {
        self.standalone
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.lookahead = None;
        self.buf = Vec::new();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<R: Read> fmt::Debug for XmlReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlReader")
            .field("event", &self.event_kind())
            .field("location", &self.current.location)
            .field("depth", &self.scopes.len())
            .field("closed", &self.closed)
            .finish()
    }
}

fn resolve_namespace(resolve: ResolveResult<'_>) -> Option<String> {
    match resolve {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
    }
}

fn utf8(bytes: &[u8]) -> std::result::Result<&str, String> {
    std::str::from_utf8(bytes).map_err(|e| e.to_string())
}

fn convert_event<B>(
    reader: &NsReader<B>,
    namespace: Option<String>,
    event: Event<'_>,
) -> std::result::Result<Token, String> {
    let token = match event {
        Event::Start(e) | Event::Empty(e) => {
            let local = utf8(e.local_name().as_ref())?.to_string();
            let prefix = match e.name().prefix() {
                Some(p) => Some(utf8(p.as_ref())?.to_string()),
                None => None,
            };
            let mut attributes = Vec::new();
            let mut namespaces = Vec::new();
            for attr in e.attributes() {
                let attr = attr.map_err(|err| err.to_string())?;
                let value = attr
                    .decode_and_unescape_value(reader.decoder())
                    .map_err(|err| err.to_string())?
                    .into_owned();
                let key = attr.key;
                if key.as_ref() == b"xmlns" {
                    namespaces.push(NamespaceBinding::new(None, value));
                    continue;
                }
                let attr_prefix = match key.prefix() {
                    Some(p) => Some(utf8(p.as_ref())?.to_string()),
                    None => None,
                };
                let attr_local = utf8(key.local_name().as_ref())?.to_string();
                if attr_prefix.as_deref() == Some("xmlns") {
                    namespaces.push(NamespaceBinding::new(Some(attr_local), value));
                    continue;
                }
                let (attr_resolve, _) = reader.resolver().resolve_attribute(key);
                let attr_name = match resolve_namespace(attr_resolve) {
                    Some(ns) => QName::new(ns, attr_local),
                    None => QName::local(attr_local),
                };
                attributes.push(Attribute::new(attr_name, attr_prefix, value));
            }
            Token::Start {
                name: qualified(namespace, local),
                prefix,
                attributes,
                namespaces,
            }
        }
        Event::End(e) => {
            let local = utf8(e.local_name().as_ref())?.to_string();
            let prefix = match e.name().prefix() {
                Some(p) => Some(utf8(p.as_ref())?.to_string()),
                None => None,
            };
            Token::End {
                name: qualified(namespace, local),
                prefix,
            }
        }
        Event::Text(e) => Token::Text(e.decode().map_err(|err| err.to_string())?.into_owned()),
        Event::GeneralRef(e) => {
            let raw = e.decode().map_err(|err| err.to_string())?;
            Token::Text(resolve_entity(&raw)?)
        }
        Event::CData(e) => Token::CData(utf8(e.as_ref())?.to_string()),
        Event::Comment(e) => Token::Comment(e.decode().map_err(|err| err.to_string())?.into_owned()),
        Event::PI(e) => Token::Pi {
            target: utf8(e.target())?.to_string(),
            data: utf8(e.content())?.trim_start().to_string(),
        },
        Event::Decl(e) => {
            let version = e.version().map_err(|err| err.to_string())?;
            Token::Decl {
                version: utf8(&version)?.to_string(),
                encoding: e
                    .encoding()
                    .and_then(|enc| enc.ok())
                    .map(|enc| String::from_utf8_lossy(&enc).into_owned()),
                standalone: e
                    .standalone()
                    .and_then(|sa| sa.ok())
                    .map(|sa| sa.as_ref() == b"yes"),
            }
        }
        Event::DocType(e) => {
            let content = e.decode().map_err(|err| err.to_string())?;
            Token::DocType(format!("<!DOCTYPE {}>", content.trim()))
        }
        Event::Eof => Token::Eof,
    };
    Ok(token)
}

fn qualified(namespace: Option<String>, local: String) -> QName {
    match namespace {
        Some(ns) => QName::new(ns, local),
        None => QName::local(local),
    }
}

/// Resolve a general entity reference (`lt`, `#10`, `#x9`, ...) to its text.
fn resolve_entity(raw: &str) -> std::result::Result<String, String> {
    if let Some(resolved) = resolve_xml_entity(raw) {
        return Ok(resolved.into());
    }
    if let Some(rest) = raw.strip_prefix('#') {
        let code = match rest.strip_prefix('x').or_else(|| rest.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => rest.parse::<u32>(),
        }
        .map_err(|_| format!("Invalid numeric character reference: &#{rest};"))?;
        let ch = char::from_u32(code).ok_or_else(|| format!("Invalid Unicode code point: {code}"))?;
        return Ok(ch.to_string());
    }
    Err(format!("Unknown entity reference: &{raw};"))
}
