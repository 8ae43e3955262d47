//! Pretty-printing writer.
//!
//! [`FormattingWriter`] wraps any [`XmlEmitter`] and inserts newlines and
//! indentation around structural tokens. Start tags are held back until the
//! next write shows whether the element has content, so an element closed
//! right after it was opened comes out as `<name/>`.
//!
//! Elements opened by local name only take their namespace from a stack
//! that follows element nesting; see
//! [`FormattingWriter::set_unspecified_element_namespace`].

mod deferred;

use std::fmt;

use tracing::trace;

use crate::config::{indentation, COMMENT_CONTINUATION};
use crate::error::Result;
use crate::xml::{TagName, XmlEmitter};

use deferred::{DeferredOp, DeferredQueue, TagShape};

/// The kind of the last token written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Initial,
    StartDocument,
    StartElement,
    EndElement,
    Characters,
    CData,
    Comment,
    ProcessingInstruction,
    Dtd,
    EndDocument,
}

/// Indenting decorator over an [`XmlEmitter`].
pub struct FormattingWriter<'a> {
    delegate: &'a mut dyn XmlEmitter,
    level: usize,
    state: WriterState,
    indent_end_element: bool,
    queue: DeferredQueue,
    /// One entry for the document plus one per open element.
    unspecified_namespaces: Vec<Option<String>>,
}

impl<'a> FormattingWriter<'a> {
    /// Wrap `delegate`.
    pub fn new(delegate: &'a mut dyn XmlEmitter) -> Self {
        Self {
            delegate,
            level: 0,
            state: WriterState::Initial,
            indent_end_element: false,
            queue: DeferredQueue::default(),
            unspecified_namespaces: vec![None],
        }
    }

    /// Current nesting level.
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    #[must_use]
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Namespace used by [`Self::write_start_element_local`] and
    /// [`Self::write_empty_element_local`] at the current level.
    #[must_use]
    pub fn unspecified_element_namespace(&self) -> Option<&str> {
        self.unspecified_namespaces.last().and_then(Option::as_deref)
    }

    /// Set the namespace of elements opened by local name from here until the
    /// current element closes. Nested elements inherit it.
    pub fn set_unspecified_element_namespace(&mut self, namespace: Option<&str>) {
        if let Some(top) = self.unspecified_namespaces.last_mut() {
            *top = namespace.map(str::to_string);
        }
    }

    /// Open an element in the current unspecified namespace.
    pub fn write_start_element_local(&mut self, local_name: &str) -> Result<()> {
        let name = self.unspecified_name(local_name);
        self.write_start_element(&name)
    }

    /// Write an empty element in the current unspecified namespace.
    pub fn write_empty_element_local(&mut self, local_name: &str) -> Result<()> {
        let name = self.unspecified_name(local_name);
        self.write_empty_element(&name)
    }

    /// Write an attribute whose value is `values` joined by single spaces.
    pub fn write_attribute_list<I, S>(&mut self, name: &TagName, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = join_values(values.into_iter().map(Some));
        self.write_attribute(name, &joined)
    }

    /// Like [`Self::write_attribute_list`], skipping absent entries.
    pub fn write_attribute_values(&mut self, name: &TagName, values: &[Option<&str>]) -> Result<()> {
        let joined = join_values(values.iter().copied());
        self.write_attribute(name, &joined)
    }

    /// Commit held-back start tags, attributes and declarations to the
    /// delegate. An element still open is committed as a start tag.
    ///
    /// # Errors
    /// Any error of the delegate.
    pub fn commit_pending(&mut self) -> Result<()> {
        self.flush_queue(TagShape::Start)
    }

    fn unspecified_name(&self, local_name: &str) -> TagName {
        match self.unspecified_element_namespace() {
            Some(namespace) => TagName::namespaced(namespace, local_name),
            None => TagName::local(local_name),
        }
    }

    fn flush_queue(&mut self, shape: TagShape) -> Result<()> {
        self.queue.flush(&mut *self.delegate, shape)
    }

    /// Enqueue `op` behind a pending start tag, or run it right away.
    fn defer(&mut self, op: DeferredOp) -> Result<()> {
        if self.queue.is_empty() {
            op.apply(&mut *self.delegate, TagShape::Start)
        } else {
            self.queue.push(op);
            Ok(())
        }
    }

    /// Whether a structural token gets its own line.
    fn indents(&self) -> bool {
        match self.state {
            WriterState::Initial => false,
            WriterState::Characters => self.indent_end_element,
            _ => true,
        }
    }

    fn newline(&mut self) -> Result<()> {
        self.delegate
            .write_characters(&format!("\n{}", indentation(self.level)))
    }

    fn queue_tag(&mut self, op: DeferredOp) -> Result<()> {
        self.flush_queue(TagShape::Start)?;
        if self.indents() {
            self.queue.push(DeferredOp::Indent(self.level));
        }
        self.queue.push(op);
        Ok(())
    }
}

fn join_values<I, S>(values: I) -> String
where
    I: Iterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for value in values.flatten() {
        if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(value.as_ref());
    }
    joined
}

fn multi_line_comment(data: &str, level: usize) -> String {
    let indent = indentation(level);
    let mut out = String::new();
    for line in data.split('\n') {
        out.push('\n');
        out.push_str(&indent);
        out.push_str(COMMENT_CONTINUATION);
        out.push_str(line.strip_suffix('\r').unwrap_or(line));
    }
    out.push('\n');
    out.push_str(&indent);
    out.push_str("  ");
    out
}

impl XmlEmitter for FormattingWriter<'_> {
    fn write_start_document(&mut self, version: &str, encoding: Option<&str>) -> Result<()> {
        self.delegate.write_start_document(version, encoding)?;
        self.state = WriterState::StartDocument;
        Ok(())
    }

    fn write_start_element(&mut self, name: &TagName) -> Result<()> {
        self.queue_tag(DeferredOp::Open(name.clone()))?;
        trace!(element = %name, level = self.level, "Deferred start tag");

        let inherited = self.unspecified_namespaces.last().cloned().flatten();
        self.unspecified_namespaces.push(inherited);
        self.level += 1;
        self.state = WriterState::StartElement;
        self.indent_end_element = false;
        Ok(())
    }

    fn write_empty_element(&mut self, name: &TagName) -> Result<()> {
        self.queue_tag(DeferredOp::Empty(name.clone()))?;
        self.state = WriterState::EndElement;
        Ok(())
    }

    fn write_attribute(&mut self, name: &TagName, value: &str) -> Result<()> {
        self.defer(DeferredOp::Attribute(name.clone(), value.to_string()))
    }

    fn write_namespace(&mut self, prefix: &str, uri: &str) -> Result<()> {
        self.defer(DeferredOp::Namespace(prefix.to_string(), uri.to_string()))
    }

    fn write_default_namespace(&mut self, uri: &str) -> Result<()> {
        self.defer(DeferredOp::DefaultNamespace(uri.to_string()))
    }

    fn set_prefix(&mut self, prefix: &str, uri: &str) -> Result<()> {
        self.defer(DeferredOp::SetPrefix(prefix.to_string(), uri.to_string()))
    }

    fn set_default_namespace(&mut self, uri: &str) -> Result<()> {
        self.defer(DeferredOp::SetDefaultNamespace(uri.to_string()))
    }

    fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.delegate.prefix_for(uri)
    }

    fn write_end_element(&mut self) -> Result<()> {
        self.level = self.level.saturating_sub(1);
        if self.state == WriterState::StartElement {
            self.flush_queue(TagShape::Empty)?;
        } else {
            self.flush_queue(TagShape::Start)?;
            if self.state != WriterState::Characters || self.indent_end_element {
                self.newline()?;
                self.indent_end_element = false;
            }
            self.delegate.write_end_element()?;
        }
        if self.unspecified_namespaces.len() > 1 {
            self.unspecified_namespaces.pop();
        }
        self.state = WriterState::EndElement;
        Ok(())
    }

    fn write_characters(&mut self, text: &str) -> Result<()> {
        self.flush_queue(TagShape::Start)?;
        if !text.contains('\n') {
            self.delegate.write_characters(text)?;
            self.state = WriterState::Characters;
            return Ok(());
        }

        if self.state != WriterState::Characters {
            self.newline()?;
        }
        let mut lines = text.split('\n').peekable();
        while let Some(line) = lines.next() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if !line.is_empty() {
                self.delegate.write_characters(line)?;
            }
            if lines.peek().is_some() {
                self.newline()?;
            }
        }
        self.state = WriterState::Characters;
        self.indent_end_element = true;
        Ok(())
    }

    fn write_cdata(&mut self, data: &str) -> Result<()> {
        self.flush_queue(TagShape::Start)?;
        self.delegate.write_cdata(data)?;
        self.state = WriterState::CData;
        Ok(())
    }

    fn write_comment(&mut self, data: &str) -> Result<()> {
        self.flush_queue(TagShape::Start)?;
        if self.indents() {
            self.newline()?;
        }
        if data.contains('\n') {
            let body = multi_line_comment(data, self.level);
            self.delegate.write_comment(&body)?;
        } else {
            self.delegate.write_comment(&format!(" {data} "))?;
        }
        self.state = WriterState::Comment;
        Ok(())
    }

    fn write_processing_instruction(&mut self, target: &str, data: Option<&str>) -> Result<()> {
        self.flush_queue(TagShape::Start)?;
        if self.indents() {
            self.newline()?;
        }
        self.delegate.write_processing_instruction(target, data)?;
        self.state = WriterState::ProcessingInstruction;
        Ok(())
    }

    fn write_dtd(&mut self, dtd: &str) -> Result<()> {
        self.flush_queue(TagShape::Start)?;
        if self.indents() {
            self.newline()?;
        }
        self.delegate.write_dtd(dtd)?;
        self.state = WriterState::Dtd;
        Ok(())
    }

    fn write_entity_ref(&mut self, name: &str) -> Result<()> {
        self.flush_queue(TagShape::Start)?;
        self.delegate.write_entity_ref(name)?;
        self.state = WriterState::Characters;
        Ok(())
    }

    fn write_end_document(&mut self) -> Result<()> {
        self.flush_queue(TagShape::Start)?;
        self.delegate.write_end_document()?;
        self.level = 0;
        self.unspecified_namespaces.truncate(1);
        self.state = WriterState::EndDocument;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.delegate.flush()
    }

    fn close(&mut self) -> Result<()> {
        self.commit_pending()?;
        self.delegate.close()?;
        self.state = WriterState::EndDocument;
        Ok(())
    }
}

impl fmt::Debug for FormattingWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormattingWriter")
            .field("level", &self.level)
            .field("state", &self.state)
            .field("indent_end_element", &self.indent_end_element)
            .field("queue", &self.queue)
            .field("unspecified_namespaces", &self.unspecified_namespaces)
            .finish_non_exhaustive()
    }
}
