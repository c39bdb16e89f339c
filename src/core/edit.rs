//! Inline cell editing
//!
//! At most one cell is edited at a time. The session also owns the
//! last-known-good snapshot: the serialized document as of the most recent
//! load, commit or merge. Cancelling an edit copies the cell's content back
//! from that snapshot, located by the cell's logical coordinates.

use crate::core::grid::{GridModel, Position};
use crate::core::markup::{Document, NodeId};
use crate::utils::error::MarkupError;

/// Edit session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    NotEditing,
    Editing {
        cell: NodeId,
        /// Caret offset in characters, placed at the end of the content on entry
        caret: usize,
    },
}

/// Keys the session distinguishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    Home,
    End,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Char(char),
    Other(String),
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value
    pub fn from_dom(key: &str) -> Self {
        match key {
            "Enter" => Key::Enter,
            "Escape" | "Esc" => Key::Escape,
            "Tab" => Key::Tab,
            "Backspace" => Key::Backspace,
            "Delete" | "Del" => Key::Delete,
            "Home" => Key::Home,
            "End" => Key::End,
            "ArrowUp" | "Up" => Key::ArrowUp,
            "ArrowDown" | "Down" => Key::ArrowDown,
            "ArrowLeft" | "Left" => Key::ArrowLeft,
            "ArrowRight" | "Right" => Key::ArrowRight,
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => Key::Other(key.to_string()),
                }
            }
        }
    }
}

/// Modifier keys held during a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// What a key press means to an open edit session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    Commit,
    Cancel,
    /// Ordinary editing key; left to the text input
    PassThrough,
}

/// Result of a begin-edit gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    /// `cell` is now being edited; `committed` is the previously edited cell, if any
    Started { committed: Option<NodeId> },
    /// The cell is already being edited
    AlreadyEditing,
    /// The target left the tree before the edit could start
    Detached,
    /// The target is not a cell
    NotACell,
    /// The editor is not accepting edits (preview mode)
    Inactive,
}

#[derive(Debug, Clone, Default)]
pub struct EditSession {
    state: EditState,
    snapshot: String,
}

impl EditSession {
    pub fn new(snapshot: impl Into<String>) -> Self {
        Self {
            state: EditState::NotEditing,
            snapshot: snapshot.into(),
        }
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn editing_cell(&self) -> Option<NodeId> {
        match self.state {
            EditState::Editing { cell, .. } => Some(cell),
            EditState::NotEditing => None,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing_cell().is_some()
    }

    /// Last known good markup
    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    /// Drop any open session and replace the snapshot
    pub fn reset(&mut self, snapshot: impl Into<String>) {
        self.state = EditState::NotEditing;
        self.snapshot = snapshot.into();
    }

    /// Record the document's current markup as the snapshot
    pub fn refresh_snapshot(&mut self, doc: &Document) {
        self.snapshot = doc.to_markup();
    }

    /// Start editing `cell`, committing another cell being edited first
    pub fn begin(&mut self, doc: &Document, cell: NodeId) -> BeginOutcome {
        if !doc.is_attached(cell) {
            tracing::debug!(target: "gridedit::edit", cell = cell.raw(), "edit target detached; ignored");
            return BeginOutcome::Detached;
        }
        if !doc.is_cell(cell) {
            return BeginOutcome::NotACell;
        }
        if self.editing_cell() == Some(cell) {
            return BeginOutcome::AlreadyEditing;
        }

        let committed = self.commit(doc);
        let caret = doc.text_content(cell).chars().count();
        self.state = EditState::Editing { cell, caret };
        tracing::debug!(target: "gridedit::edit", cell = cell.raw(), caret, "edit started");
        BeginOutcome::Started { committed }
    }

    /// Close the session, serializing the document into the snapshot
    ///
    /// Returns the cell that was being edited.
    pub fn commit(&mut self, doc: &Document) -> Option<NodeId> {
        let cell = self.editing_cell()?;
        self.snapshot = doc.to_markup();
        self.state = EditState::NotEditing;
        tracing::debug!(target: "gridedit::edit", cell = cell.raw(), "edit committed");
        Some(cell)
    }

    /// Close the session, restoring the cell's content from the snapshot
    ///
    /// The snapshot itself is left as it was. Returns the cell that was
    /// being edited.
    pub fn cancel(&mut self, doc: &mut Document) -> Option<NodeId> {
        let cell = self.editing_cell()?;
        if !restore_from_snapshot(doc, cell, &self.snapshot) {
            tracing::debug!(
                target: "gridedit::edit",
                cell = cell.raw(),
                "no snapshot counterpart; content left as is"
            );
        }
        self.state = EditState::NotEditing;
        tracing::debug!(target: "gridedit::edit", cell = cell.raw(), "edit cancelled");
        Some(cell)
    }

    /// Replace the edited cell's content with typed input
    ///
    /// Input for any other cell is ignored and reported as `Ok(false)`.
    pub fn input(
        &mut self,
        doc: &mut Document,
        cell: NodeId,
        inner_markup: &str,
    ) -> Result<bool, MarkupError> {
        let EditState::Editing { cell: editing, .. } = self.state else {
            return Ok(false);
        };
        if editing != cell {
            return Ok(false);
        }
        doc.set_inner_markup(cell, inner_markup)?;
        let caret = doc.text_content(cell).chars().count();
        self.state = EditState::Editing { cell, caret };
        tracing::trace!(target: "gridedit::edit", cell = cell.raw(), "input");
        Ok(true)
    }

    /// What `key` means while editing
    pub fn classify(key: &Key, modifiers: Modifiers) -> KeyDisposition {
        match key {
            Key::Enter if !modifiers.any() => KeyDisposition::Commit,
            Key::Escape => KeyDisposition::Cancel,
            _ => KeyDisposition::PassThrough,
        }
    }

    /// Handle a key press; a no-op pass-through when not editing
    pub fn key_down(
        &mut self,
        doc: &mut Document,
        key: &Key,
        modifiers: Modifiers,
    ) -> KeyDisposition {
        if !self.is_editing() {
            return KeyDisposition::PassThrough;
        }
        let disposition = Self::classify(key, modifiers);
        match disposition {
            KeyDisposition::Commit => {
                self.commit(doc);
            }
            KeyDisposition::Cancel => {
                self.cancel(doc);
            }
            KeyDisposition::PassThrough => {}
        }
        disposition
    }
}

/// Where a cell sits: index of its outermost table and its anchor coordinate
fn locate(doc: &Document, cell: NodeId) -> Option<(usize, Position)> {
    let owner = doc.enclosing_table(cell)?;
    let index = doc.tables().iter().position(|&t| t == owner)?;
    let grid = GridModel::build(doc, owner).ok()?;
    Some((index, grid.position_of(cell)?))
}

fn restore_from_snapshot(doc: &mut Document, cell: NodeId, snapshot: &str) -> bool {
    let Some((table_index, pos)) = locate(doc, cell) else {
        return false;
    };
    let Ok(original) = Document::parse(snapshot) else {
        return false;
    };
    let Some(&table) = original.tables().get(table_index) else {
        return false;
    };
    let Ok(grid) = GridModel::build(&original, table) else {
        return false;
    };
    let Some(source) = grid.cell_at_position(pos) else {
        return false;
    };
    if grid.position_of(source) != Some(pos) {
        return false;
    }
    doc.replace_children_from(cell, &original, source);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "<table><tr><td>plain</td><td>x <b>bold</b><br/>y</td></tr></table>";

    fn start() -> (Document, EditSession) {
        let doc = Document::parse(SOURCE).unwrap();
        (doc, EditSession::new(SOURCE))
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(Key::from_dom("Enter"), Key::Enter);
        assert_eq!(Key::from_dom("Esc"), Key::Escape);
        assert_eq!(Key::from_dom("a"), Key::Char('a'));
        assert_eq!(Key::from_dom("한"), Key::Char('한'));
        assert_eq!(Key::from_dom("F5"), Key::Other("F5".into()));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            EditSession::classify(&Key::Enter, Modifiers::NONE),
            KeyDisposition::Commit
        );
        assert_eq!(
            EditSession::classify(&Key::Enter, Modifiers::shift()),
            KeyDisposition::PassThrough
        );
        assert_eq!(
            EditSession::classify(&Key::Escape, Modifiers::shift()),
            KeyDisposition::Cancel
        );
        for key in [Key::Backspace, Key::Delete, Key::ArrowLeft, Key::Char('x')] {
            assert_eq!(
                EditSession::classify(&key, Modifiers::NONE),
                KeyDisposition::PassThrough
            );
        }
    }

    #[test]
    fn test_begin_places_caret_at_end() {
        let (doc, mut session) = start();
        let cell = doc.all_cells()[0];
        assert_eq!(
            session.begin(&doc, cell),
            BeginOutcome::Started { committed: None }
        );
        assert_eq!(session.state(), EditState::Editing { cell, caret: 5 });
        assert_eq!(session.begin(&doc, cell), BeginOutcome::AlreadyEditing);
    }

    #[test]
    fn test_cancel_restores_nested_markup_byte_for_byte() {
        let (mut doc, mut session) = start();
        let cell = doc.all_cells()[1];
        session.begin(&doc, cell);
        session.input(&mut doc, cell, "scribble").unwrap();
        assert_eq!(doc.inner_markup(cell), "scribble");

        assert_eq!(
            session.key_down(&mut doc, &Key::Escape, Modifiers::NONE),
            KeyDisposition::Cancel
        );
        assert!(!session.is_editing());
        assert_eq!(doc.inner_markup(cell), "x <b>bold</b><br/>y");
        assert_eq!(doc.to_markup(), SOURCE);
        assert_eq!(session.snapshot(), SOURCE);
    }

    #[test]
    fn test_commit_updates_snapshot() {
        let (mut doc, mut session) = start();
        let cell = doc.all_cells()[0];
        session.begin(&doc, cell);
        session.input(&mut doc, cell, "changed").unwrap();
        assert_eq!(
            session.key_down(&mut doc, &Key::Enter, Modifiers::NONE),
            KeyDisposition::Commit
        );
        assert!(session.snapshot().contains("<td>changed</td>"));

        // a later cancel goes back to the committed text, not the original
        session.begin(&doc, cell);
        session.input(&mut doc, cell, "again").unwrap();
        session.cancel(&mut doc);
        assert_eq!(doc.inner_markup(cell), "changed");
    }

    #[test]
    fn test_switching_cells_commits_the_prior_edit() {
        let (mut doc, mut session) = start();
        let cells = doc.all_cells();
        session.begin(&doc, cells[0]);
        session.input(&mut doc, cells[0], "first").unwrap();

        assert_eq!(
            session.begin(&doc, cells[1]),
            BeginOutcome::Started {
                committed: Some(cells[0])
            }
        );
        assert_eq!(session.editing_cell(), Some(cells[1]));
        assert!(session.snapshot().contains("<td>first</td>"));
    }

    #[test]
    fn test_begin_on_detached_cell_is_ignored() {
        let (mut doc, mut session) = start();
        let cells = doc.all_cells();
        session.begin(&doc, cells[0]);
        doc.detach(cells[1]);
        assert_eq!(session.begin(&doc, cells[1]), BeginOutcome::Detached);
        assert_eq!(session.editing_cell(), Some(cells[0]));
    }

    #[test]
    fn test_input_for_other_cell_is_ignored() {
        let (mut doc, mut session) = start();
        let cells = doc.all_cells();
        assert_eq!(session.input(&mut doc, cells[0], "nope"), Ok(false));
        session.begin(&doc, cells[0]);
        assert_eq!(session.input(&mut doc, cells[1], "nope"), Ok(false));
        assert_eq!(doc.to_markup(), SOURCE);
    }

    #[test]
    fn test_cancel_locates_cell_by_logical_coordinates() {
        let source = "<table>\
            <tr><td rowspan=\"2\">A</td><td>B</td></tr>\
            <tr><td><i>C</i></td></tr>\
            </table>";
        let mut doc = Document::parse(source).unwrap();
        let mut session = EditSession::new(source);
        let c = doc.all_cells()[2];
        session.begin(&doc, c);
        session.input(&mut doc, c, "zzz").unwrap();
        session.cancel(&mut doc);
        assert_eq!(doc.to_markup(), source);
    }

    #[test]
    fn test_keys_pass_through_when_idle() {
        let (mut doc, mut session) = start();
        assert_eq!(
            session.key_down(&mut doc, &Key::Escape, Modifiers::NONE),
            KeyDisposition::PassThrough
        );
    }
}
