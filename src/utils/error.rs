//! Error handling for gridedit
//!
//! Each layer reports its own error type; `EditorError` is the umbrella
//! surfaced by [`crate::EditorController`] and the record layer. Every
//! failure leaves the editor usable: errors are returned before the first
//! mutation of the markup tree.

use thiserror::Error;

use crate::core::markup::NodeId;

/// Markup could not be read into a tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed markup at byte {position}: {message}")]
pub struct MarkupError {
    pub message: String,
    pub position: usize,
}

impl MarkupError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// A `rowspan`/`colspan` attribute value that cannot be used as a span
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    #[error("span value '{0}' is not a number")]
    NotNumeric(String),
    #[error("span value '{0}' must be at least 1")]
    NonPositive(String),
}

/// Failure to build a logical grid for a table element
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("node {0:?} is not a table element")]
    NotATable(NodeId),
    #[error("table {0:?} has no row elements")]
    MissingRows(NodeId),
}

/// Failure to merge a selection; no mutation has happened when one is returned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("select at least two cells to merge ({distinct} selected)")]
    InsufficientSelection { distinct: usize },
    #[error("no cell owns coordinate ({row}, {col}); the selection cannot be interpreted")]
    UnresolvedRegion { row: usize, col: usize },
    #[error("no selected cell anchors the merge region at ({row}, {col})")]
    AnchorNotFound { row: usize, col: usize },
    #[error("grid was built before the last structural change; rebuild it first")]
    StaleGrid,
}

/// Failure reported by a record store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record '{0}' not found")]
    NotFound(String),
    #[error("record content must not be blank")]
    InvalidContent,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failure to build or merge JSONL exports
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("select at least two JSONL sources to merge ({count} given)")]
    TooFewSources { count: usize },
    /// `file` and `line` are 1-based
    #[error("source {file}, line {line} is not valid JSON: {message}")]
    InvalidLine {
        file: usize,
        line: usize,
        message: String,
    },
}

/// Umbrella error for editor operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    /// Table structure could not be parsed; the previous state is retained
    #[error("malformed markup: {message}")]
    MalformedMarkup { message: String },
    /// Merge-time failure; selection is left unchanged
    #[error(transparent)]
    Merge(#[from] MergeError),
    /// Persistence collaborator refused or failed a load
    #[error("load failed: {message}")]
    LoadFailed { message: String },
    /// Persistence collaborator refused or failed a save
    #[error("save failed: {message}")]
    SaveFailed { message: String },
    /// A save is already outstanding for this editor
    #[error("a save is already in progress")]
    SaveInProgress,
    /// The requested table index does not exist
    #[error("no table at index {0}")]
    NoTable(usize),
}

impl From<MarkupError> for EditorError {
    fn from(err: MarkupError) -> Self {
        EditorError::MalformedMarkup {
            message: err.to_string(),
        }
    }
}

impl From<GridError> for EditorError {
    fn from(err: GridError) -> Self {
        EditorError::MalformedMarkup {
            message: err.to_string(),
        }
    }
}

// Convenience constructors for errors
impl EditorError {
    pub fn malformed(message: impl Into<String>) -> Self {
        EditorError::MalformedMarkup {
            message: message.into(),
        }
    }

    pub fn load_failed(message: impl Into<String>) -> Self {
        EditorError::LoadFailed {
            message: message.into(),
        }
    }

    pub fn save_failed(message: impl Into<String>) -> Self {
        EditorError::SaveFailed {
            message: message.into(),
        }
    }
}

/// Result type for editor operations
pub type EditorResult<T> = Result<T, EditorError>;

/// Non-fatal issue found while building a grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanWarning {
    /// Offending cell
    pub cell: NodeId,
    /// Attribute name (`rowspan` or `colspan`), or `span` for overlaps
    pub attribute: &'static str,
    pub message: String,
}

impl std::fmt::Display for SpanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Warning on {:?} {}: {}", self.cell, self.attribute, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_error_display() {
        let err = MarkupError::new("unexpected end", 42);
        let msg = err.to_string();
        assert!(msg.contains("byte 42"));
        assert!(msg.contains("unexpected end"));
    }

    #[test]
    fn test_markup_error_converts_to_malformed() {
        let err: EditorError = MarkupError::new("bad attribute", 3).into();
        assert!(matches!(err, EditorError::MalformedMarkup { .. }));
        assert!(err.to_string().contains("bad attribute"));
    }

    #[test]
    fn test_merge_error_is_transparent() {
        let err: EditorError = MergeError::InsufficientSelection { distinct: 1 }.into();
        assert_eq!(
            err.to_string(),
            "select at least two cells to merge (1 selected)"
        );
    }

    #[test]
    fn test_convenience_constructors() {
        assert!(matches!(
            EditorError::save_failed("503"),
            EditorError::SaveFailed { .. }
        ));
        assert!(EditorError::load_failed("gone").to_string().contains("gone"));
    }
}
