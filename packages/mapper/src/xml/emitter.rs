//! Raw forward-only XML event emitter.
//!
//! [`XmlEmitter`] mirrors a streaming writer API: a start tag stays open for
//! attributes and namespace declarations until the next content call.
//! [`XmlWriter`] implements it on top of quick-xml's [`Writer`].

use std::fmt;
use std::io::Write;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::XML_NAMESPACE;
use crate::error::{MapperError, Result};

/// Name of an element or attribute to be written.
///
/// `namespace` without `prefix` lets the emitter pick the prefix bound to the
/// namespace; no namespace writes the bare local name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagName {
    prefix: Option<String>,
    namespace: Option<String>,
    local_name: String,
}

impl TagName {
    /// A name in no namespace.
    #[must_use]
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            prefix: None,
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// A name in `namespace`, with the prefix chosen by the emitter.
    #[must_use]
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            prefix: None,
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// A name in `namespace` written with an explicit prefix.
    #[must_use]
    pub fn prefixed(
        prefix: impl Into<String>,
        namespace: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Self {
        Self {
            prefix: Some(prefix.into()),
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Explicit prefix, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Namespace URI, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local part of the name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) if !prefix.is_empty() => write!(f, "{prefix}:{}", self.local_name),
            _ => f.write_str(&self.local_name),
        }
    }
}

/// Forward-only XML emitter.
pub trait XmlEmitter {
    /// Write the XML declaration.
    fn write_start_document(&mut self, version: &str, encoding: Option<&str>) -> Result<()>;

    /// Open an element; it accepts attributes until the next content call.
    fn write_start_element(&mut self, name: &TagName) -> Result<()>;

    /// Write a self-closing element; it accepts attributes until the next call.
    fn write_empty_element(&mut self, name: &TagName) -> Result<()>;

    /// Add an attribute to the open start tag.
    fn write_attribute(&mut self, name: &TagName, value: &str) -> Result<()>;

    /// Declare `prefix` on the open start tag.
    fn write_namespace(&mut self, prefix: &str, uri: &str) -> Result<()>;

    /// Declare the default namespace on the open start tag.
    fn write_default_namespace(&mut self, uri: &str) -> Result<()>;

    /// Bind `prefix` in the current scope without writing a declaration.
    fn set_prefix(&mut self, prefix: &str, uri: &str) -> Result<()>;

    /// Bind the default namespace in the current scope without writing a declaration.
    fn set_default_namespace(&mut self, uri: &str) -> Result<()>;

    /// Prefix currently bound to `uri` (empty for the default namespace).
    fn prefix_for(&self, uri: &str) -> Option<&str>;

    /// Close the innermost open element.
    fn write_end_element(&mut self) -> Result<()>;

    /// Write escaped character data.
    fn write_characters(&mut self, text: &str) -> Result<()>;

    /// Write a CDATA section.
    fn write_cdata(&mut self, data: &str) -> Result<()>;

    /// Write a comment.
    fn write_comment(&mut self, data: &str) -> Result<()>;

    /// Write a processing instruction.
    fn write_processing_instruction(&mut self, target: &str, data: Option<&str>) -> Result<()>;

    /// Write a complete document type declaration verbatim.
    fn write_dtd(&mut self, dtd: &str) -> Result<()>;

    /// Write an entity reference `&name;`.
    fn write_entity_ref(&mut self, name: &str) -> Result<()>;

    /// Close every open element.
    fn write_end_document(&mut self) -> Result<()>;

    /// Flush the underlying output.
    fn flush(&mut self) -> Result<()>;

    /// Finish pending output and refuse further writes.
    fn close(&mut self) -> Result<()>;
}

/// Namespace scope of one open element. Prefix `""` is the default namespace.
#[derive(Debug, Default)]
struct Scope {
    name: String,
    bindings: Vec<(String, String)>,
}

#[derive(Debug)]
struct PendingTag {
    start: BytesStart<'static>,
    empty: bool,
}

/// quick-xml backed [`XmlEmitter`].
///
/// Namespaced names without an in-scope binding get a declaration on the tag
/// they appear in: the default namespace for elements, a generated `nsN`
/// prefix for attributes. The `xml` prefix is always bound.
pub struct XmlWriter<W: Write> {
    writer: Writer<W>,
    pending: Option<PendingTag>,
    open: Vec<Scope>,
    root_bindings: Vec<(String, String)>,
    generated_prefixes: usize,
    closed: bool,
}

impl<W: Write> XmlWriter<W> {
    /// Create an emitter writing to `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
            pending: None,
            open: Vec::new(),
            root_bindings: vec![("xml".to_string(), XML_NAMESPACE.to_string())],
            generated_prefixes: 0,
            closed: false,
        }
    }

    /// Recover the underlying output.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    /// Number of currently open elements.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(MapperError::InvalidWrite("writer is closed".to_string()));
        }
        Ok(())
    }

    /// Commit the pending start tag, if any.
    fn commit(&mut self) -> Result<()> {
        if let Some(tag) = self.pending.take() {
            if tag.empty {
                self.writer.write_event(Event::Empty(tag.start))?;
                self.open.pop();
            } else {
                self.writer.write_event(Event::Start(tag.start))?;
            }
        }
        Ok(())
    }

    fn bindings(&self) -> impl Iterator<Item = &(String, String)> {
        self.open
            .iter()
            .rev()
            .flat_map(|scope| scope.bindings.iter().rev())
            .chain(self.root_bindings.iter().rev())
    }

    fn bound_uri(&self, prefix: &str) -> Option<&str> {
        self.bindings()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn bound_prefix(&self, uri: &str, allow_default: bool) -> Option<&str> {
        self.bindings()
            .filter(|(p, u)| u == uri && (allow_default || !p.is_empty()))
            .map(|(p, _)| p.as_str())
            .find(|p| self.bound_uri(p) == Some(uri))
    }

    fn pending_tag(&mut self) -> Result<&mut PendingTag> {
        self.pending
            .as_mut()
            .ok_or_else(|| MapperError::InvalidWrite("no start tag is open".to_string()))
    }

    /// Bind and declare `prefix` on the pending tag.
    fn declare(&mut self, prefix: &str, uri: &str) -> Result<()> {
        if let Some(scope) = self.open.last() {
            if let Some((_, existing)) = scope.bindings.iter().find(|(p, _)| p == prefix) {
                if existing == uri {
                    return Ok(());
                }
                return Err(MapperError::InvalidWrite(format!(
                    "prefix '{prefix}' already declared on <{}>",
                    scope.name
                )));
            }
        }
        let attr = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{prefix}")
        };
        self.pending_tag()?.start.push_attribute((attr.as_str(), uri));
        if let Some(scope) = self.open.last_mut() {
            scope.bindings.push((prefix.to_string(), uri.to_string()));
        }
        Ok(())
    }

    fn open_tag(&mut self, name: &TagName, empty: bool) -> Result<()> {
        self.check_open()?;
        self.commit()?;

        let mut declarations = Vec::new();
        let local = name.local_name();
        let qualified = match (name.prefix(), name.namespace()) {
            (Some(prefix), Some(ns)) if !prefix.is_empty() => {
                if self.bound_uri(prefix) != Some(ns) {
                    declarations.push((prefix.to_string(), ns.to_string()));
                }
                format!("{prefix}:{local}")
            }
            (_, Some(ns)) => match self.bound_prefix(ns, true) {
                Some("") => local.to_string(),
                Some(prefix) => format!("{prefix}:{local}"),
                None => {
                    declarations.push((String::new(), ns.to_string()));
                    local.to_string()
                }
            },
            (_, None) => {
                if self.bound_uri("").is_some_and(|uri| !uri.is_empty()) {
                    declarations.push((String::new(), String::new()));
                }
                local.to_string()
            }
        };

        self.open.push(Scope {
            name: qualified.clone(),
            bindings: Vec::new(),
        });
        self.pending = Some(PendingTag {
            start: BytesStart::new(qualified),
            empty,
        });
        for (prefix, uri) in declarations {
            self.declare(&prefix, &uri)?;
        }
        Ok(())
    }

    fn bind(&mut self, prefix: &str, uri: &str) {
        let bindings = match self.open.last_mut() {
            Some(scope) => &mut scope.bindings,
            None => &mut self.root_bindings,
        };
        bindings.retain(|(p, _)| p != prefix);
        bindings.push((prefix.to_string(), uri.to_string()));
    }
}

impl<W: Write> XmlEmitter for XmlWriter<W> {
    fn write_start_document(&mut self, version: &str, encoding: Option<&str>) -> Result<()> {
        self.check_open()?;
        self.writer
            .write_event(Event::Decl(BytesDecl::new(version, encoding, None)))?;
        Ok(())
    }

    fn write_start_element(&mut self, name: &TagName) -> Result<()> {
        self.open_tag(name, false)
    }

    fn write_empty_element(&mut self, name: &TagName) -> Result<()> {
        self.open_tag(name, true)
    }

    fn write_attribute(&mut self, name: &TagName, value: &str) -> Result<()> {
        self.check_open()?;
        self.pending_tag()?;
        let local = name.local_name();
        let qualified = match (name.prefix(), name.namespace()) {
            (Some(prefix), Some(ns)) if !prefix.is_empty() => {
                if self.bound_uri(prefix) != Some(ns) {
                    self.declare(prefix, ns)?;
                }
                format!("{prefix}:{local}")
            }
            (_, Some(ns)) => match self.bound_prefix(ns, false) {
                Some(prefix) => format!("{prefix}:{local}"),
                None => {
                    self.generated_prefixes += 1;
                    let prefix = format!("ns{}", self.generated_prefixes);
                    self.declare(&prefix, ns)?;
                    format!("{prefix}:{local}")
                }
            },
            (_, None) => local.to_string(),
        };
        self.pending_tag()?
            .start
            .push_attribute((qualified.as_str(), value));
        Ok(())
    }

    fn write_namespace(&mut self, prefix: &str, uri: &str) -> Result<()> {
        self.check_open()?;
        self.pending_tag()?;
        self.declare(prefix, uri)
    }

    fn write_default_namespace(&mut self, uri: &str) -> Result<()> {
        self.write_namespace("", uri)
    }

    fn set_prefix(&mut self, prefix: &str, uri: &str) -> Result<()> {
        self.check_open()?;
        self.bind(prefix, uri);
        Ok(())
    }

    fn set_default_namespace(&mut self, uri: &str) -> Result<()> {
        self.set_prefix("", uri)
    }

    fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.bound_prefix(uri, true)
    }

    fn write_end_element(&mut self) -> Result<()> {
        self.check_open()?;
        self.commit()?;
        let scope = self
            .open
            .pop()
            .ok_or_else(|| MapperError::InvalidWrite("no open element to end".to_string()))?;
        self.writer.write_event(Event::End(BytesEnd::new(scope.name)))?;
        Ok(())
    }

    fn write_characters(&mut self, text: &str) -> Result<()> {
        self.check_open()?;
        self.commit()?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    fn write_cdata(&mut self, data: &str) -> Result<()> {
        self.check_open()?;
        self.commit()?;
        self.writer.write_event(Event::CData(BytesCData::new(data)))?;
        Ok(())
    }

    fn write_comment(&mut self, data: &str) -> Result<()> {
        self.check_open()?;
        self.commit()?;
        self.writer
            .write_event(Event::Comment(BytesText::from_escaped(data)))?;
        Ok(())
    }

    fn write_processing_instruction(&mut self, target: &str, data: Option<&str>) -> Result<()> {
        self.check_open()?;
        self.commit()?;
        let content = match data {
            Some(data) => format!("{target} {data}"),
            None => target.to_string(),
        };
        self.writer.write_event(Event::PI(BytesPI::new(content)))?;
        Ok(())
    }

    fn write_dtd(&mut self, dtd: &str) -> Result<()> {
        self.check_open()?;
        self.commit()?;
        self.writer.get_mut().write_all(dtd.as_bytes())?;
        Ok(())
    }

    fn write_entity_ref(&mut self, name: &str) -> Result<()> {
        self.check_open()?;
        self.commit()?;
        write!(self.writer.get_mut(), "&{name};")?;
        Ok(())
    }

    fn write_end_document(&mut self) -> Result<()> {
        self.check_open()?;
        self.commit()?;
        while !self.open.is_empty() {
            self.write_end_element()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.get_mut().flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.commit()?;
        self.flush()?;
        self.closed = true;
        Ok(())
    }
}

impl<W: Write> fmt::Debug for XmlWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlWriter")
            .field("open", &self.open)
            .field("pending", &self.pending.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(build: impl FnOnce(&mut XmlWriter<Vec<u8>>) -> Result<()>) -> String {
        let mut writer = XmlWriter::new(Vec::new());
        build(&mut writer).unwrap();
        writer.close().unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_attributes_stay_on_open_tag() {
        let out = written(|w| {
            w.write_start_element(&TagName::local("a"))?;
            w.write_attribute(&TagName::local("x"), "1")?;
            w.write_empty_element(&TagName::local("b"))?;
            w.write_attribute(&TagName::local("y"), "2")?;
            w.write_end_element()
        });
        assert_eq!(out, r#"<a x="1"><b y="2"/></a>"#);
    }

    #[test]
    fn test_unbound_namespace_declares_default() {
        let out = written(|w| {
            w.write_start_element(&TagName::namespaced("urn:t", "root"))?;
            w.write_empty_element(&TagName::namespaced("urn:t", "child"))?;
            w.write_end_element()
        });
        assert_eq!(out, r#"<root xmlns="urn:t"><child/></root>"#);
    }

    #[test]
    fn test_declared_prefix_is_reused() {
        let out = written(|w| {
            w.write_start_element(&TagName::local("root"))?;
            w.write_namespace("foo", "http://foo")?;
            w.write_empty_element(&TagName::namespaced("http://foo", "c"))?;
            w.write_end_element()
        });
        assert_eq!(out, r#"<root xmlns:foo="http://foo"><foo:c/></root>"#);
    }

    #[test]
    fn test_no_namespace_inside_default_undeclares() {
        let out = written(|w| {
            w.write_start_element(&TagName::namespaced("urn:t", "root"))?;
            w.write_empty_element(&TagName::local("plain"))?;
            w.write_end_element()
        });
        assert_eq!(out, r#"<root xmlns="urn:t"><plain xmlns=""/></root>"#);
    }

    #[test]
    fn test_namespaced_attribute_gets_generated_prefix() {
        let out = written(|w| {
            w.write_empty_element(&TagName::local("a"))?;
            w.write_attribute(&TagName::namespaced("urn:x", "y"), "v")
        });
        assert_eq!(out, r#"<a xmlns:ns1="urn:x" ns1:y="v"/>"#);
    }

    #[test]
    fn test_duplicate_declaration_is_skipped() {
        let out = written(|w| {
            w.write_start_element(&TagName::namespaced("urn:t", "root"))?;
            w.write_default_namespace("urn:t")?;
            w.write_end_element()
        });
        assert_eq!(out, r#"<root xmlns="urn:t"></root>"#);
    }

    #[test]
    fn test_text_is_escaped() {
        let out = written(|w| {
            w.write_start_element(&TagName::local("a"))?;
            w.write_characters("x < y & z")?;
            w.write_end_element()
        });
        assert_eq!(out, "<a>x &lt; y &amp; z</a>");
    }

    #[test]
    fn test_document_level_constructs() {
        let out = written(|w| {
            w.write_start_document("1.0", Some("UTF-8"))?;
            w.write_dtd("<!DOCTYPE a>")?;
            w.write_start_element(&TagName::local("a"))?;
            w.write_comment(" note ")?;
            w.write_processing_instruction("pi", Some("data"))?;
            w.write_cdata("<raw>")?;
            w.write_entity_ref("amp")?;
            w.write_end_document()
        });
        assert_eq!(
            out,
            r#"<?xml version="1.0" encoding="UTF-8"?><!DOCTYPE a><a><!-- note --><?pi data?><![CDATA[<raw>]]>&amp;</a>"#
        );
    }

    #[test]
    fn test_end_without_open_element_fails() {
        let mut writer = XmlWriter::new(Vec::new());
        let err = writer.write_end_element().unwrap_err();
        assert!(matches!(err, MapperError::InvalidWrite(_)));
    }

    #[test]
    fn test_attribute_without_start_tag_fails() {
        let mut writer = XmlWriter::new(Vec::new());
        assert!(writer.write_attribute(&TagName::local("x"), "1").is_err());
    }

    #[test]
    fn test_set_prefix_binds_without_declaring() {
        let mut writer = XmlWriter::new(Vec::new());
        writer.set_prefix("p", "urn:p").unwrap();
        assert_eq!(writer.prefix_for("urn:p"), Some("p"));
        writer
            .write_empty_element(&TagName::namespaced("urn:p", "x"))
            .unwrap();
        writer.close().unwrap();
        assert_eq!(String::from_utf8(writer.into_inner()).unwrap(), "<p:x/>");
    }

    #[test]
    fn test_xml_prefix_is_never_declared() {
        let out = written(|w| {
            w.write_empty_element(&TagName::local("a"))?;
            w.write_attribute(&TagName::prefixed("xml", XML_NAMESPACE, "lang"), "nl")
        });
        assert_eq!(out, r#"<a xml:lang="nl"/>"#);
    }

    #[test]
    fn test_closed_writer_refuses_writes() {
        let mut writer = XmlWriter::new(Vec::new());
        writer.close().unwrap();
        assert!(writer.write_characters("x").is_err());
    }
}
