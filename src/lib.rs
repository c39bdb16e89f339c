//! # gridedit
//!
//! In-place table editing engine for HTML-flavoured table markup.
//!
//! ## Features
//!
//! - **Span-aware grid**: reconstructs the logical matrix of tables with `rowspan`/`colspan`
//! - **Drag selection**: rectangular selection over logical coordinates
//! - **Cell merging**: merges a selection into one spanning cell, growing over partial spans
//! - **Inline editing**: single-cell edit sessions with commit and cancel-with-revert
//! - **Numeric display**: reversible thousands grouping for plain numbers
//! - **WASM Support**: Compiles to WebAssembly for browser usage
//!
//! ## Usage Examples
//!
//! ### Preparing markup
//!
//! ```rust
//! use gridedit::{normalize_markup, prepare_for_storage};
//!
//! let shown = normalize_markup("<table><tr><td>1234567</td></tr></table>").unwrap();
//! assert!(shown.contains("1,234,567"));
//!
//! let stored = prepare_for_storage(&shown).unwrap();
//! assert_eq!(stored, "<table><tr><td>1234567</td></tr></table>");
//! ```
//!
//! ### Merging a range
//!
//! ```rust
//! use gridedit::{merge_range, Position};
//!
//! let out = merge_range(
//!     "<table><tr><td>A</td><td>B</td></tr></table>",
//!     0,
//!     Position::new(0, 0),
//!     Position::new(0, 1),
//! )
//! .unwrap();
//! assert_eq!(out, r#"<table><tr><td rowspan="1" colspan="2">A B</td></tr></table>"#);
//! ```

/// Core editing engine
pub mod core;

/// Feature modules - numeric display, records, export
pub mod features;

/// Utility modules
pub mod utils;

/// WASM bindings (feature-gated)
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export the editor contract
pub use core::controller::{EditorController, EditorMode, EditorOptions, Highlight};
pub use core::edit::{BeginOutcome, Key, KeyDisposition, Modifiers};
pub use core::grid::{CellMeta, GridModel, Position};
pub use core::markup::{Document, NodeId};
pub use core::merge::MergeOutcome;
pub use core::selection::{SelectionRect, SelectionState};

// Re-export feature modules
pub use features::numeric;
pub use features::numeric::{format_for_display, strip_for_storage, NumericOptions};
pub use features::records;
pub use features::records::{MemoryRecordStore, Record, RecordEditor, RecordStore};

#[cfg(feature = "export")]
pub use features::export;

// Re-export utilities
pub use utils::error::{EditorError, EditorResult, MergeError};

/// Load markup and return its display form (numbers grouped)
pub fn normalize_markup(markup: &str) -> EditorResult<String> {
    normalize_markup_with_options(markup, EditorOptions::default())
}

/// Load markup with custom options and return its display form
pub fn normalize_markup_with_options(markup: &str, options: EditorOptions) -> EditorResult<String> {
    Ok(EditorController::with_markup(markup, options)?.markup())
}

/// Markup ready for persistence: display formatting stripped
pub fn prepare_for_storage(markup: &str) -> EditorResult<String> {
    let mut editor = EditorController::with_markup(markup, EditorOptions::plain())?;
    Ok(editor.save())
}

/// Merge the cells between two coordinates of the `table`-th table
pub fn merge_range(
    markup: &str,
    table: usize,
    from: Position,
    to: Position,
) -> EditorResult<String> {
    let mut doc = Document::parse(markup)?;
    let table_node = *doc
        .tables()
        .get(table)
        .ok_or(EditorError::NoTable(table))?;
    let grid = GridModel::build(&doc, table_node)?;
    core::merge::merge(&mut doc, &grid, &SelectionRect::new(from, to))?;
    Ok(doc.to_markup())
}

/// Crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
