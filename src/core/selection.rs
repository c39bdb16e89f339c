//! Pointer-driven rectangular selection
//!
//! ```text
//!            pointer_down            pointer_up
//!   Idle ───────────────▶ Dragging ────────────▶ Selected
//!    ▲                    │  ▲ pointer_move        │
//!    │ clear               └──┘                    │ pointer_down (restart)
//!    └──────────────────────────── Dragging ◀──────┘
//! ```
//!
//! The selected region is always the full inclusive coordinate box between
//! the drag anchor and the current pointer coordinate, not the cells the
//! pointer happened to cross. A selection never leaves the table it started in.

use fxhash::FxHashSet;
use web_time::{Duration, Instant};

use crate::core::grid::{GridModel, Position};
use crate::core::markup::NodeId;

/// Default double-activation window
pub const DEFAULT_ACTIVATION_WINDOW: Duration = Duration::from_millis(400);

/// Selection state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Dragging,
    Selected,
}

/// Inclusive coordinate box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_row: usize,
    pub max_row: usize,
    pub min_col: usize,
    pub max_col: usize,
}

impl Bounds {
    /// Box covering a single coordinate
    pub fn at(pos: Position) -> Self {
        Self {
            min_row: pos.row,
            max_row: pos.row,
            min_col: pos.col,
            max_col: pos.col,
        }
    }

    pub fn height(&self) -> usize {
        self.max_row.saturating_sub(self.min_row).saturating_add(1)
    }

    pub fn width(&self) -> usize {
        self.max_col.saturating_sub(self.min_col).saturating_add(1)
    }

    /// Number of coordinates in the box, saturating
    pub fn area(&self) -> usize {
        self.height().saturating_mul(self.width())
    }

    pub fn top_left(&self) -> Position {
        Position::new(self.min_row, self.min_col)
    }

    pub fn contains(&self, pos: Position) -> bool {
        (self.min_row..=self.max_row).contains(&pos.row)
            && (self.min_col..=self.max_col).contains(&pos.col)
    }

    /// Whether the two boxes share at least one coordinate
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_row <= other.max_row
            && other.min_row <= self.max_row
            && self.min_col <= other.max_col
            && other.min_col <= self.max_col
    }

    /// Smallest box covering both
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_row: self.min_row.min(other.min_row),
            max_row: self.max_row.max(other.max_row),
            min_col: self.min_col.min(other.min_col),
            max_col: self.max_col.max(other.max_col),
        }
    }

    /// Every coordinate in the box, row-major
    pub fn positions(&self) -> Vec<Position> {
        let (min_col, max_col) = (self.min_col, self.max_col);
        (self.min_row..=self.max_row)
            .flat_map(|row| (min_col..=max_col).map(move |col| Position::new(row, col)))
            .collect()
    }
}

/// Drag anchor plus current pointer coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRect {
    pub anchor_row: usize,
    pub anchor_col: usize,
    pub row: usize,
    pub col: usize,
}

impl SelectionRect {
    pub fn new(anchor: Position, current: Position) -> Self {
        Self {
            anchor_row: anchor.row,
            anchor_col: anchor.col,
            row: current.row,
            col: current.col,
        }
    }

    /// Single-coordinate selection
    pub fn single(pos: Position) -> Self {
        Self::new(pos, pos)
    }

    pub fn anchor(&self) -> Position {
        Position::new(self.anchor_row, self.anchor_col)
    }

    pub fn current(&self) -> Position {
        Position::new(self.row, self.col)
    }

    /// Normalized inclusive bounds; independent of drag direction
    pub fn bounds(&self) -> Bounds {
        Bounds {
            min_row: self.anchor_row.min(self.row),
            max_row: self.anchor_row.max(self.row),
            min_col: self.anchor_col.min(self.col),
            max_col: self.anchor_col.max(self.col),
        }
    }

    pub fn positions(&self) -> Vec<Position> {
        self.bounds().positions()
    }
}

/// Tracks the drag selection over one table's grid
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    state: SelectionState,
    table: Option<NodeId>,
    rect: Option<SelectionRect>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Table the current selection lives in
    pub fn table(&self) -> Option<NodeId> {
        self.table
    }

    pub fn rect(&self) -> Option<SelectionRect> {
        self.rect
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.rect.map(|r| r.bounds())
    }

    /// Whether anything is selected
    pub fn is_active(&self) -> bool {
        self.state != SelectionState::Idle && self.rect.is_some()
    }

    /// Start (or restart) a drag on `cell`
    ///
    /// Returns false when `cell` is not part of `grid`.
    pub fn pointer_down(&mut self, grid: &GridModel, cell: NodeId) -> bool {
        let Some(pos) = grid.position_of(cell) else {
            return false;
        };
        self.state = SelectionState::Dragging;
        self.table = Some(grid.table());
        self.rect = Some(SelectionRect::single(pos));
        tracing::debug!(
            target: "gridedit::selection",
            row = pos.row,
            col = pos.col,
            "drag started"
        );
        true
    }

    /// Extend the drag rectangle to `cell`
    ///
    /// Ignored unless dragging, and ignored for cells of another table.
    /// Returns whether the rectangle changed.
    pub fn pointer_move(&mut self, grid: &GridModel, cell: NodeId) -> bool {
        if self.state != SelectionState::Dragging || self.table != Some(grid.table()) {
            return false;
        }
        let Some(pos) = grid.position_of(cell) else {
            return false;
        };
        let Some(rect) = self.rect.as_mut() else {
            return false;
        };
        if rect.current() == pos {
            return false;
        }
        rect.row = pos.row;
        rect.col = pos.col;
        tracing::trace!(
            target: "gridedit::selection",
            row = pos.row,
            col = pos.col,
            "drag extended"
        );
        true
    }

    /// Finish the drag; a no-op unless dragging
    pub fn pointer_up(&mut self) {
        if self.state == SelectionState::Dragging {
            self.state = SelectionState::Selected;
            tracing::debug!(target: "gridedit::selection", bounds = ?self.bounds(), "drag finished");
        }
    }

    /// Drop the selection and return to idle
    pub fn clear(&mut self) {
        if self.state != SelectionState::Idle {
            tracing::debug!(target: "gridedit::selection", "selection cleared");
        }
        self.state = SelectionState::Idle;
        self.table = None;
        self.rect = None;
    }

    /// Selected coordinates, row-major
    pub fn selected_positions(&self) -> Vec<Position> {
        match self.rect {
            Some(rect) if self.state != SelectionState::Idle => rect.positions(),
            _ => Vec::new(),
        }
    }

    /// Distinct cells backing the selected coordinates, row-major
    ///
    /// Empty when `grid` belongs to a different table than the selection.
    pub fn selected_cells(&self, grid: &GridModel) -> Vec<NodeId> {
        if self.table != Some(grid.table()) {
            return Vec::new();
        }
        let mut seen = FxHashSet::default();
        self.selected_positions()
            .into_iter()
            .filter_map(|pos| grid.cell_at_position(pos))
            .filter(|cell| seen.insert(*cell))
            .collect()
    }
}

/// Result of registering one activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Single,
    /// Second activation of the same cell inside the window
    Double,
}

/// Coalesces two single activations of one cell into a double activation
///
/// Keeps only the last activation's time and target.
#[derive(Debug, Clone)]
pub struct ActivationTracker {
    window: Duration,
    last: Option<(Instant, NodeId)>,
}

impl Default for ActivationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVATION_WINDOW)
    }
}

impl ActivationTracker {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Register an activation of `cell` at `at`
    ///
    /// A double activation resets the tracker, so a third rapid activation
    /// counts as a new single one.
    pub fn track(&mut self, cell: NodeId, at: Instant) -> Activation {
        let is_double = match self.last {
            Some((when, last_cell)) => {
                last_cell == cell && at.checked_duration_since(when).is_some_and(|d| d < self.window)
            }
            None => false,
        };
        if is_double {
            self.last = None;
            Activation::Double
        } else {
            self.last = Some((at, cell));
            Activation::Single
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
