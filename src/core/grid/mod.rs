//! Logical Grid System
//!
//! Reconciles a table's rows and spanning cells into per-coordinate ownership.
//!
//! ```text
//! <tr><td rowspan=2>A</td><td>B</td></tr>      A | B
//! <tr><td>C</td></tr>                    ->    A | C
//! ```
//!
//! The grid is an index over the markup tree, never a copy of it: cell
//! handles point back into the [`Document`](crate::core::markup::Document)
//! and the grid is rebuilt after every structural change.

mod cell;
mod model;


pub use cell::{parse_span, CellMeta, Position, MAX_COLSPAN};
pub use model::GridModel;
