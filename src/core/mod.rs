//! Core editing engine
//!
//! This module contains the grid editing engine, leaves first:
//! - `markup`: arena-backed markup tree
//! - `grid`: logical row/column matrix of a table
//! - `selection`: pointer-driven rectangular selection
//! - `merge`: merging a selection into one spanning cell
//! - `edit`: single-cell inline edit lifecycle
//! - `controller`: orchestration and the public editor contract

pub mod controller;
pub mod edit;
pub mod grid;
pub mod markup;
pub mod merge;
pub mod selection;

// Re-export main types
pub use controller::{EditorController, EditorMode, EditorOptions, Highlight};
pub use edit::{BeginOutcome, EditSession, EditState, Key, KeyDisposition, Modifiers};
pub use grid::{CellMeta, GridModel, Position};
pub use markup::{Document, NodeId};
pub use merge::{merge, merge_with_formatter, MergeOutcome};
pub use selection::{
    Activation, ActivationTracker, Bounds, SelectionController, SelectionRect, SelectionState,
};
