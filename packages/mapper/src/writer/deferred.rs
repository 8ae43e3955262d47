//! Operations held back until the shape of the open element is known.

use std::collections::VecDeque;

use crate::config::indentation;
use crate::error::Result;
use crate::xml::{TagName, XmlEmitter};

/// How the pending start tag is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagShape {
    /// `<a ...>`, content follows.
    Start,
    /// `<a .../>`, the element closed without content.
    Empty,
}

/// A write captured for the pending start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeferredOp {
    /// Newline plus indentation for `level`.
    Indent(usize),
    /// Start tag whose shape is decided at flush time.
    Open(TagName),
    /// Start tag that is always empty.
    Empty(TagName),
    Attribute(TagName, String),
    Namespace(String, String),
    DefaultNamespace(String),
    SetPrefix(String, String),
    SetDefaultNamespace(String),
}

impl DeferredOp {
    pub(crate) fn apply(self, emitter: &mut dyn XmlEmitter, shape: TagShape) -> Result<()> {
        match self {
            Self::Indent(level) => emitter.write_characters(&format!("\n{}", indentation(level))),
            Self::Open(name) => match shape {
                TagShape::Start => emitter.write_start_element(&name),
                TagShape::Empty => emitter.write_empty_element(&name),
            },
            Self::Empty(name) => emitter.write_empty_element(&name),
            Self::Attribute(name, value) => emitter.write_attribute(&name, &value),
            Self::Namespace(prefix, uri) => emitter.write_namespace(&prefix, &uri),
            Self::DefaultNamespace(uri) => emitter.write_default_namespace(&uri),
            Self::SetPrefix(prefix, uri) => emitter.set_prefix(&prefix, &uri),
            Self::SetDefaultNamespace(uri) => emitter.set_default_namespace(&uri),
        }
    }
}

/// FIFO of deferred operations for the most recently opened element.
#[derive(Debug, Default)]
pub(crate) struct DeferredQueue {
    ops: VecDeque<DeferredOp>,
}

impl DeferredQueue {
    pub(crate) fn push(&mut self, op: DeferredOp) {
        self.ops.push_back(op);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Run every queued operation in order, committing the start tag as `shape`.
    ///
    /// The queue is empty afterwards, also when an operation fails.
    pub(crate) fn flush(&mut self, emitter: &mut dyn XmlEmitter, shape: TagShape) -> Result<()> {
        while let Some(op) = self.ops.pop_front() {
            if let Err(e) = op.apply(emitter, shape) {
                self.ops.clear();
                return Err(e);
            }
        }
        Ok(())
    }
}
