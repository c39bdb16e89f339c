//! Editor orchestration
//!
//! [`EditorController`] owns the working markup tree, one grid per table,
//! the selection, the edit session and all presentation state. Event methods
//! take any node inside a cell as their target and resolve it to the
//! enclosing cell.
//!
//! ## Example
//!
//! ```rust
//! use gridedit::{EditorController, EditorOptions};
//!
//! let mut editor = EditorController::new(EditorOptions::default());
//! editor.load("<table><tr><td>1234</td><td>B</td></tr></table>").unwrap();
//! assert_eq!(
//!     editor.markup(),
//!     r#"<table><tr><td data-auto-format="1234">1,234</td><td>B</td></tr></table>"#
//! );
//! assert_eq!(editor.save(), "<table><tr><td>1234</td><td>B</td></tr></table>");
//! ```

use web_time::{Duration, Instant};

use crate::core::edit::{BeginOutcome, EditSession, Key, KeyDisposition, Modifiers};
use crate::core::grid::GridModel;
use crate::core::markup::{Document, NodeId};
use crate::core::merge::{self, MergeOutcome};
use crate::core::selection::{
    Activation, ActivationTracker, SelectionController, DEFAULT_ACTIVATION_WINDOW,
};
use crate::features::numeric::{NumericFormatter, NumericOptions};
use crate::utils::error::{EditorError, EditorResult, MergeError};

/// Class added to selected cells by [`EditorController::render_markup`]
pub const SELECTED_CLASS: &str = "cell-selected";
/// Class added to the edited cell by [`EditorController::render_markup`]
pub const EDITING_CLASS: &str = "cell-editing";
/// Attribute carrying a cell's handle in rendered markup
pub const CELL_HANDLE_ATTR: &str = "data-cell";

/// Editor configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    any(feature = "wasm", feature = "export"),
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct EditorOptions {
    /// Group plain numbers for display on load and strip them on save
    /// Default: true
    pub auto_format: bool,

    /// Separators used by the numeric formatter
    pub numeric: NumericOptions,

    /// Two activations of one cell inside this window start an edit
    /// Default: 400ms
    pub double_activation_window: Duration,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            auto_format: true,
            numeric: NumericOptions::default(),
            double_activation_window: DEFAULT_ACTIVATION_WINDOW,
        }
    }
}

impl EditorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// No numeric display formatting
    pub fn plain() -> Self {
        Self {
            auto_format: false,
            ..Self::default()
        }
    }

    /// `1.234,5` numeric display
    pub fn european() -> Self {
        Self {
            numeric: NumericOptions::european(),
            ..Self::default()
        }
    }
}

/// Whether the editor accepts pointer, key and input events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    Preview,
    Edit,
}

/// Presentation state of one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    None,
    Selected,
    Editing,
}

#[derive(Debug, Clone)]
pub struct EditorController {
    options: EditorOptions,
    formatter: NumericFormatter,
    doc: Document,
    /// Markup most recently loaded
    baseline: String,
    grids: Vec<GridModel>,
    selection: SelectionController,
    session: EditSession,
    activations: ActivationTracker,
    mode: EditorMode,
}

impl Default for EditorController {
    fn default() -> Self {
        Self::new(EditorOptions::default())
    }
}

impl EditorController {
    pub fn new(options: EditorOptions) -> Self {
        Self {
            formatter: NumericFormatter::new(options.numeric.clone()),
            activations: ActivationTracker::new(options.double_activation_window),
            options,
            doc: Document::new(),
            baseline: String::new(),
            grids: Vec::new(),
            selection: SelectionController::new(),
            session: EditSession::default(),
            mode: EditorMode::Preview,
        }
    }

    /// Create an editor and load `markup`
    pub fn with_markup(markup: &str, options: EditorOptions) -> EditorResult<Self> {
        let mut editor = Self::new(options);
        editor.load(markup)?;
        Ok(editor)
    }

    /// Replace the working tree with `markup`
    ///
    /// Formats eligible numeric cells, rebuilds every grid, clears the
    /// selection and the edit session, and returns to preview. On failure
    /// the previous state is kept.
    pub fn load(&mut self, markup: &str) -> EditorResult<()> {
        let mut doc = Document::parse(markup)?;
        if self.options.auto_format {
            self.formatter.apply(&mut doc);
        }
        let grids = build_grids(&doc)?;

        tracing::debug!(
            target: "gridedit::edit",
            tables = grids.len(),
            bytes = markup.len(),
            "loaded markup"
        );

        self.session.reset(doc.to_markup());
        self.doc = doc;
        self.grids = grids;
        self.baseline = markup.to_string();
        self.selection.clear();
        self.activations.reset();
        self.mode = EditorMode::Preview;
        Ok(())
    }

    /// Switch to edit mode; clears the selection
    pub fn enter_edit_mode(&mut self) {
        self.selection.clear();
        if self.mode != EditorMode::Edit {
            tracing::debug!(target: "gridedit::edit", "entered edit mode");
        }
        self.mode = EditorMode::Edit;
    }

    /// Press on `target`
    ///
    /// Starts a drag, or starts an edit when it is the second activation of
    /// the same cell inside the double-activation window. A press on the
    /// cell being edited does nothing. Returns whether anything changed.
    pub fn pointer_down(&mut self, target: NodeId, at: Instant) -> bool {
        if self.mode != EditorMode::Edit {
            return false;
        }
        let Some(cell) = self.resolve_cell(target) else {
            return false;
        };
        if self.session.editing_cell() == Some(cell) {
            return false;
        }
        if self.activations.track(cell, at) == Activation::Double {
            return matches!(self.begin_edit(cell), BeginOutcome::Started { .. });
        }
        if self.session.is_editing() {
            self.session.commit(&self.doc);
        }
        self.refresh_grids();
        let Some(grid) = self.grids.iter().find(|g| g.contains(cell)) else {
            return false;
        };
        self.selection.pointer_down(grid, cell)
    }

    /// Pointer moved over `target` while the button is held
    pub fn pointer_move(&mut self, target: NodeId) -> bool {
        if self.mode != EditorMode::Edit || self.session.is_editing() {
            return false;
        }
        let Some(cell) = self.resolve_cell(target) else {
            return false;
        };
        self.refresh_grids();
        let Some(grid) = self.grids.iter().find(|g| g.contains(cell)) else {
            return false;
        };
        self.selection.pointer_move(grid, cell)
    }

    /// Button released anywhere
    pub fn pointer_up(&mut self) {
        if self.mode == EditorMode::Edit {
            self.selection.pointer_up();
        }
    }

    /// Dedicated double-activation event on `target`
    pub fn double_activate(&mut self, target: NodeId) -> BeginOutcome {
        self.begin_edit(target)
    }

    /// Start editing the cell enclosing `target`
    ///
    /// A cell already being edited elsewhere is committed first. The
    /// selection is cleared.
    pub fn begin_edit(&mut self, target: NodeId) -> BeginOutcome {
        if self.mode != EditorMode::Edit {
            return BeginOutcome::Inactive;
        }
        let Some(cell) = self.resolve_cell(target) else {
            return BeginOutcome::NotACell;
        };
        let outcome = self.session.begin(&self.doc, cell);
        if matches!(outcome, BeginOutcome::Started { .. }) {
            self.selection.clear();
        }
        outcome
    }

    /// Key press routed to the edit session
    pub fn key_down(&mut self, key: &Key, modifiers: Modifiers) -> KeyDisposition {
        if self.mode != EditorMode::Edit {
            return KeyDisposition::PassThrough;
        }
        self.session.key_down(&mut self.doc, key, modifiers)
    }

    /// Focus left `target`; commits when it is the cell being edited
    pub fn blur(&mut self, target: NodeId) -> bool {
        let Some(cell) = self.resolve_cell(target) else {
            return false;
        };
        if self.session.editing_cell() != Some(cell) {
            return false;
        }
        self.session.commit(&self.doc).is_some()
    }

    /// Typed content for the cell enclosing `target`
    ///
    /// Ignored (`Ok(false)`) unless that cell is being edited.
    pub fn input(&mut self, target: NodeId, inner_markup: &str) -> EditorResult<bool> {
        if self.mode != EditorMode::Edit {
            return Ok(false);
        }
        let Some(cell) = self.resolve_cell(target) else {
            return Ok(false);
        };
        Ok(self.session.input(&mut self.doc, cell, inner_markup)?)
    }

    /// Merge the selected cells
    ///
    /// On success the grids are rebuilt, the selection is cleared and the
    /// snapshot refreshed. On failure nothing changes.
    pub fn merge_selection(&mut self) -> Result<MergeOutcome, MergeError> {
        let (Some(rect), Some(table)) = (self.selection.rect(), self.selection.table()) else {
            return Err(MergeError::InsufficientSelection { distinct: 0 });
        };
        if !self.selection.is_active() {
            return Err(MergeError::InsufficientSelection { distinct: 0 });
        }
        self.refresh_grids();
        let Some(grid) = self.grids.iter().find(|g| g.table() == table) else {
            return Err(MergeError::StaleGrid);
        };

        let outcome = merge::merge_with_formatter(&mut self.doc, grid, &rect, &self.formatter)?;
        self.refresh_grids();
        self.selection.clear();
        self.session.refresh_snapshot(&self.doc);
        Ok(outcome)
    }

    /// Markup ready for persistence
    ///
    /// Commits a pending edit, strips numeric display formatting from a copy
    /// of the tree and clears the selection. The live tree keeps its display
    /// form.
    pub fn save(&mut self) -> String {
        self.session.commit(&self.doc);
        self.selection.clear();
        let mut copy = self.doc.clone();
        self.formatter.strip(&mut copy);
        copy.to_markup()
    }

    /// Discard all changes since the last load and return to preview
    pub fn revert_to_snapshot(&mut self) -> EditorResult<()> {
        let baseline = std::mem::take(&mut self.baseline);
        let result = self.load(&baseline);
        if result.is_err() {
            self.baseline = baseline;
        }
        tracing::debug!(target: "gridedit::edit", "reverted to baseline");
        result
    }

    /// Live markup in display form
    pub fn markup(&self) -> String {
        self.doc.to_markup()
    }

    /// Markup as of the last load, commit or merge
    pub fn stored_content(&self) -> &str {
        self.session.snapshot()
    }

    /// Markup most recently loaded
    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn editing_cell(&self) -> Option<NodeId> {
        self.session.editing_cell()
    }

    pub fn table_count(&self) -> usize {
        self.grids.len()
    }

    /// Grid of the table at `index`, rebuilt if the tree changed since
    pub fn grid(&mut self, index: usize) -> EditorResult<&GridModel> {
        self.refresh_grids();
        self.grids.get(index).ok_or(EditorError::NoTable(index))
    }

    /// Distinct selected cells, row-major
    pub fn selected_cells(&self) -> Vec<NodeId> {
        let Some(table) = self.selection.table() else {
            return Vec::new();
        };
        self.grids
            .iter()
            .find(|g| g.table() == table && g.is_fresh(&self.doc))
            .map(|grid| self.selection.selected_cells(grid))
            .unwrap_or_default()
    }

    /// Presentation state of `cell`; the edited cell is never marked selected
    pub fn highlight(&self, cell: NodeId) -> Highlight {
        if self.session.editing_cell() == Some(cell) {
            Highlight::Editing
        } else if self.selected_cells().contains(&cell) {
            Highlight::Selected
        } else {
            Highlight::None
        }
    }

    /// Live markup with cell handles and highlight classes for a UI layer
    pub fn render_markup(&self) -> String {
        let selected = self.selected_cells();
        let editing = self.session.editing_cell();
        self.doc.to_markup_with(&|id| {
            if !self.doc.is_cell(id) {
                return Vec::new();
            }
            let mut extra = vec![(CELL_HANDLE_ATTR.to_string(), id.raw().to_string())];
            if editing == Some(id) {
                extra.push(("class".to_string(), EDITING_CLASS.to_string()));
                extra.push(("contenteditable".to_string(), "true".to_string()));
            } else if selected.contains(&id) {
                extra.push(("class".to_string(), SELECTED_CLASS.to_string()));
            }
            extra
        })
    }

    fn resolve_cell(&self, target: NodeId) -> Option<NodeId> {
        if !self.doc.contains(target) {
            return None;
        }
        self.doc.enclosing_cell(target)
    }

    /// Rebuild every grid when the tree changed since they were built
    fn refresh_grids(&mut self) {
        if self.grids.iter().all(|g| g.is_fresh(&self.doc)) {
            return;
        }
        match build_grids(&self.doc) {
            Ok(grids) => self.grids = grids,
            Err(err) => {
                tracing::warn!(target: "gridedit::grid", error = %err, "grid rebuild failed");
                self.grids.clear();
            }
        }
    }
}

fn build_grids(doc: &Document) -> Result<Vec<GridModel>, crate::utils::error::GridError> {
    doc.tables()
        .into_iter()
        .map(|table| GridModel::build(doc, table))
        .collect()
}
