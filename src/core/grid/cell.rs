//! Cell coordinates, span metadata and span attribute parsing

use crate::utils::error::SpanError;

/// HTML caps `colspan` at this value
pub const MAX_COLSPAN: usize = 1000;

/// A logical matrix coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(usize, usize)> for Position {
    fn from((row, col): (usize, usize)) -> Self {
        Position { row, col }
    }
}

/// Anchor coordinate and span of a cell, derived per grid build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMeta {
    pub row: usize,
    pub col: usize,
    pub rowspan: usize,
    pub colspan: usize,
}

impl CellMeta {
    pub fn anchor(&self) -> Position {
        Position::new(self.row, self.col)
    }

    /// Last covered row (inclusive)
    pub fn last_row(&self) -> usize {
        self.row + self.rowspan - 1
    }

    /// Last covered column (inclusive)
    pub fn last_col(&self) -> usize {
        self.col + self.colspan - 1
    }
}

/// Parse a span attribute value
///
/// A missing attribute is a span of 1. Anything that is not a positive
/// integer is an error; callers fall back to 1.
pub fn parse_span(value: Option<&str>) -> Result<usize, SpanError> {
    let Some(raw) = value else {
        return Ok(1);
    };
    let trimmed = raw.trim();
    match trimmed.parse::<i64>() {
        Ok(n) if n >= 1 => Ok(n as usize),
        Ok(_) => Err(SpanError::NonPositive(raw.to_string())),
        Err(_) => Err(SpanError::NotNumeric(raw.to_string())),
    }
}
