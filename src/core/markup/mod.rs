//! Markup tree
//!
//! A small arena-backed element tree read from and written back to an
//! HTML-flavoured markup string. Only what the grid editor needs is modelled:
//! elements with ordered attributes, escaped text, and verbatim comments and
//! declarations, so an unmodified document serializes back byte for byte.
//!
//! ```text
//! markup string -> parser (quick-xml events) -> Document arena -> to_markup()
//! ```

mod parser;
mod tree;

pub use tree::{Document, Element, NodeId, NodeKind, TagForm};
