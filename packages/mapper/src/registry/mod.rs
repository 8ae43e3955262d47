//! Handler registry and dispatch.
//!
//! Handlers are registered per qualified name on an [`XmlMapper`]. During a
//! parse the mapper looks up the handler for the element under the cursor and
//! hands it a scoped reader bounded to that element's subtree.

mod core;
mod engine;
mod handler;

pub use core::{NameRegistry, SharedAttributeReader, SharedElementReader};
pub use engine::XmlMapper;
pub use handler::{AttributeReader, ElementReader, ElementWriter};
