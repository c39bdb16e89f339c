//! Integration tests for gridedit table editing

use gridedit::{
    format_for_display, merge_range, normalize_markup, prepare_for_storage, strip_for_storage,
    BeginOutcome, Document, EditorController, EditorError, EditorMode, EditorOptions, GridModel,
    Key, KeyDisposition, MergeError, Modifiers, NodeId, Position,
};
use pretty_assertions::assert_eq;
use web_time::{Duration, Instant};

const PLAIN_3X3: &str = "<table>\
    <tr><td>a</td><td>b</td><td>c</td></tr>\
    <tr><td>d</td><td>e</td><td>f</td></tr>\
    <tr><td>g</td><td>h</td><td>i</td></tr>\
    </table>";

const BLOCK_3X3: &str = "<table>\
    <tr><td rowspan=\"2\" colspan=\"2\">X</td><td>c</td></tr>\
    <tr><td>f</td></tr>\
    <tr><td>g</td><td>h</td><td>i</td></tr>\
    </table>";

fn editing(markup: &str) -> EditorController {
    let mut editor = EditorController::with_markup(markup, EditorOptions::plain()).unwrap();
    editor.enter_edit_mode();
    editor
}

fn cell(editor: &mut EditorController, row: usize, col: usize) -> NodeId {
    editor.grid(0).unwrap().cell_at(row, col).unwrap()
}

fn drag(editor: &mut EditorController, from: (usize, usize), to: (usize, usize)) {
    let start = cell(editor, from.0, from.1);
    let end = cell(editor, to.0, to.1);
    assert!(editor.pointer_down(start, Instant::now()));
    editor.pointer_move(end);
    editor.pointer_up();
}

// ============================================================================
// Logical Grid Tests
// ============================================================================

mod grid_model {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_well_formed(markup: &str) {
        let doc = Document::parse(markup).unwrap();
        let grid = GridModel::build(&doc, doc.tables()[0]).unwrap();
        assert!(grid.warnings().is_empty(), "unexpected warnings for {}", markup);

        for row in 0..grid.row_count() {
            for col in 0..grid.col_count() {
                assert!(
                    grid.cell_at(row, col).is_some(),
                    "hole at ({}, {}) in {}",
                    row,
                    col,
                    markup
                );
            }
        }

        let mut claimed = 0;
        for &cell in grid.cells() {
            let meta = grid.meta(cell).unwrap();
            let covered = grid.covered_positions(cell);
            assert_eq!(covered.len(), meta.rowspan * meta.colspan);
            for pos in covered {
                assert_eq!(grid.cell_at_position(pos), Some(cell));
            }
            claimed += meta.rowspan * meta.colspan;
        }
        assert_eq!(claimed, grid.row_count() * grid.col_count());
    }

    #[test]
    fn test_spans_cover_matrix_exactly() {
        assert_well_formed(PLAIN_3X3);
        assert_well_formed(BLOCK_3X3);
        assert_well_formed(
            "<table><tr><td rowspan=\"2\">a</td><td>b</td><td>c</td></tr>\
             <tr><td colspan=\"2\">d</td></tr></table>",
        );
        assert_well_formed(
            "<table><thead><tr><th colspan=\"3\">Head</th></tr></thead>\
             <tbody><tr><td>1</td><td rowspan=\"2\">2</td><td>3</td></tr>\
             <tr><td>4</td><td>6</td></tr></tbody></table>",
        );
    }

    #[test]
    fn test_rowspan_pushes_later_cells_right() {
        let doc = Document::parse(BLOCK_3X3).unwrap();
        let grid = GridModel::build(&doc, doc.tables()[0]).unwrap();
        let f = grid.cell_at(1, 2).unwrap();
        assert_eq!(doc.text_content(f), "f");
        assert_eq!(grid.position_of(f), Some(Position::new(1, 2)));
    }

    #[test]
    fn test_grid_goes_stale_after_merge() {
        let mut doc = Document::parse(PLAIN_3X3).unwrap();
        let grid = GridModel::build(&doc, doc.tables()[0]).unwrap();
        assert!(grid.is_fresh(&doc));
        let rect = gridedit::SelectionRect::new(Position::new(0, 0), Position::new(0, 1));
        gridedit::core::merge::merge(&mut doc, &grid, &rect).unwrap();
        assert!(!grid.is_fresh(&doc));
        assert_eq!(
            gridedit::core::merge::merge(&mut doc, &grid, &rect),
            Err(MergeError::StaleGrid)
        );
    }
}

// ============================================================================
// Selection Tests
// ============================================================================

mod selection {
    use super::*;
    use pretty_assertions::assert_eq;

    fn selected(editor: &EditorController) -> Vec<Position> {
        let mut positions = editor.selection().selected_positions();
        positions.sort();
        positions
    }

    #[test]
    fn test_drag_rectangle_independent_of_direction() {
        let expected = vec![
            Position::new(0, 0),
            Position::new(0, 1),
            Position::new(1, 0),
            Position::new(1, 1),
        ];

        let mut forward = editing(PLAIN_3X3);
        drag(&mut forward, (0, 0), (1, 1));
        assert_eq!(selected(&forward), expected);

        let mut backward = editing(PLAIN_3X3);
        drag(&mut backward, (1, 1), (0, 0));
        assert_eq!(selected(&backward), expected);

        let mut anti = editing(PLAIN_3X3);
        drag(&mut anti, (0, 1), (1, 0));
        assert_eq!(selected(&anti), expected);
        assert_eq!(anti.selected_cells().len(), 4);
    }

    #[test]
    fn test_spanning_cell_counted_once() {
        let mut editor = editing(BLOCK_3X3);
        drag(&mut editor, (0, 0), (2, 0));
        assert_eq!(editor.selection().selected_positions().len(), 3);
        assert_eq!(editor.selected_cells().len(), 2);
    }

    #[test]
    fn test_double_activation_starts_edit() {
        let mut editor = editing(PLAIN_3X3);
        let b = cell(&mut editor, 0, 1);
        let t0 = Instant::now();
        editor.pointer_down(b, t0);
        editor.pointer_up();
        assert_eq!(editor.editing_cell(), None);
        assert!(editor.pointer_down(b, t0 + Duration::from_millis(150)));
        assert_eq!(editor.editing_cell(), Some(b));
        assert!(editor.selected_cells().is_empty());
    }

    #[test]
    fn test_slow_second_activation_is_a_new_click() {
        let mut editor = editing(PLAIN_3X3);
        let b = cell(&mut editor, 0, 1);
        let t0 = Instant::now();
        editor.pointer_down(b, t0);
        editor.pointer_up();
        editor.pointer_down(b, t0 + Duration::from_secs(2));
        assert_eq!(editor.editing_cell(), None);
    }

    #[test]
    fn test_preview_mode_ignores_pointer() {
        let mut editor = EditorController::with_markup(PLAIN_3X3, EditorOptions::plain()).unwrap();
        assert_eq!(editor.mode(), EditorMode::Preview);
        let a = cell(&mut editor, 0, 0);
        assert!(!editor.pointer_down(a, Instant::now()));
        assert!(editor.selected_cells().is_empty());
    }
}

// ============================================================================
// Merge Tests
// ============================================================================

mod merge {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_two_cells() {
        let mut editor = editing("<table><tr><td>A</td><td>B</td></tr></table>");
        drag(&mut editor, (0, 0), (0, 1));
        let outcome = editor.merge_selection().unwrap();
        assert_eq!(outcome.rowspan(), 1);
        assert_eq!(outcome.colspan(), 2);
        assert_eq!(outcome.removed.len(), 1);
        assert!(editor.selected_cells().is_empty());
        assert_eq!(
            editor.save(),
            r#"<table><tr><td rowspan="1" colspan="2">A B</td></tr></table>"#
        );
    }

    #[test]
    fn test_merge_expands_over_partial_span() {
        let out = merge_range(BLOCK_3X3, 0, Position::new(1, 1), Position::new(1, 2)).unwrap();
        assert!(out.contains(r#"<td rowspan="2" colspan="3">X c f</td>"#));
        assert!(!out.contains("<td>c</td>"));
        assert!(!out.contains("<td>f</td>"));

        let doc = Document::parse(&out).unwrap();
        let grid = GridModel::build(&doc, doc.tables()[0]).unwrap();
        let anchor = grid.cell_at(0, 0).unwrap();
        assert_eq!(grid.cell_at(1, 2), Some(anchor));
        assert_eq!(doc.text_content(grid.cell_at(2, 2).unwrap()), "i");
    }

    #[test]
    fn test_merge_rebuilds_grid() {
        let mut editor = editing(PLAIN_3X3);
        drag(&mut editor, (0, 0), (1, 0));
        editor.merge_selection().unwrap();
        let merged = cell(&mut editor, 0, 0);
        assert_eq!(cell(&mut editor, 1, 0), merged);
        assert_eq!(editor.document().text_content(merged), "a d");
    }

    #[test]
    fn test_failed_merge_changes_nothing() {
        let mut editor = editing(BLOCK_3X3);
        let before = editor.markup();
        drag(&mut editor, (0, 0), (0, 0));
        assert_eq!(
            editor.merge_selection(),
            Err(MergeError::InsufficientSelection { distinct: 1 })
        );
        assert_eq!(editor.markup(), before);
        assert_eq!(editor.selected_cells().len(), 1);
    }

    #[test]
    fn test_merge_inside_one_span_is_insufficient() {
        assert_eq!(
            merge_range(BLOCK_3X3, 0, Position::new(0, 0), Position::new(1, 1)),
            Err(EditorError::Merge(MergeError::InsufficientSelection {
                distinct: 1
            }))
        );
    }

    #[test]
    fn test_merge_without_selection() {
        let mut editor = editing(PLAIN_3X3);
        assert!(matches!(
            editor.merge_selection(),
            Err(MergeError::InsufficientSelection { .. })
        ));
    }

    #[test]
    fn test_merge_range_rejects_ragged_hole() {
        let ragged = "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td></tr></table>";
        assert_eq!(
            merge_range(ragged, 0, Position::new(0, 0), Position::new(1, 1)),
            Err(EditorError::Merge(MergeError::UnresolvedRegion { row: 1, col: 1 }))
        );
    }

    #[test]
    fn test_merge_range_rejects_rect_past_the_grid() {
        let table = "<table><tr><td>A</td><td>B</td></tr></table>";
        assert_eq!(
            merge_range(table, 0, Position::new(0, 0), Position::new(usize::MAX, 1)),
            Err(EditorError::Merge(MergeError::UnresolvedRegion { row: 1, col: 0 }))
        );
        assert_eq!(
            merge_range(table, 0, Position::new(0, 0), Position::new(100_000, 100_000)),
            Err(EditorError::Merge(MergeError::UnresolvedRegion { row: 0, col: 2 }))
        );
    }
}

// ============================================================================
// Edit Session Tests
// ============================================================================

mod edit_session {
    use super::*;
    use pretty_assertions::assert_eq;

    const NESTED: &str = "<table><tr>\
        <td><b>bold</b> &amp; <i class=\"x\">it</i><br/>tail</td><td>B</td>\
        </tr></table>";

    #[test]
    fn test_cancel_restores_nested_markup_exactly() {
        let mut editor = editing(NESTED);
        let target = cell(&mut editor, 0, 0);
        assert!(matches!(
            editor.begin_edit(target),
            BeginOutcome::Started { committed: None }
        ));
        assert!(editor.input(target, "scribble").unwrap());
        assert!(editor.markup().contains("<td>scribble</td>"));

        assert_eq!(
            editor.key_down(&Key::Escape, Modifiers::NONE),
            KeyDisposition::Cancel
        );
        assert_eq!(editor.markup(), NESTED);
        assert_eq!(editor.editing_cell(), None);
    }

    #[test]
    fn test_switching_cells_commits_previous_edit() {
        let mut editor = editing(NESTED);
        let x = cell(&mut editor, 0, 0);
        let y = cell(&mut editor, 0, 1);

        editor.begin_edit(y);
        editor.input(y, "typed").unwrap();
        assert_eq!(
            editor.begin_edit(x),
            BeginOutcome::Started { committed: Some(y) }
        );
        assert!(editor.stored_content().contains("<td>typed</td>"));

        // cancelling the new session keeps the committed content
        editor.input(x, "gone").unwrap();
        editor.key_down(&Key::Escape, Modifiers::NONE);
        assert!(editor.markup().contains("<td>typed</td>"));
        assert!(editor.markup().contains("<b>bold</b>"));
    }

    #[test]
    fn test_enter_commits_and_shift_enter_passes_through() {
        let mut editor = editing(NESTED);
        let y = cell(&mut editor, 0, 1);
        editor.begin_edit(y);
        editor.input(y, "line").unwrap();
        assert_eq!(
            editor.key_down(&Key::Enter, Modifiers::shift()),
            KeyDisposition::PassThrough
        );
        assert_eq!(editor.editing_cell(), Some(y));
        assert_eq!(
            editor.key_down(&Key::Enter, Modifiers::NONE),
            KeyDisposition::Commit
        );
        assert_eq!(editor.editing_cell(), None);
        assert!(editor.stored_content().contains("<td>line</td>"));
    }

    #[test]
    fn test_blur_commits() {
        let mut editor = editing(NESTED);
        let y = cell(&mut editor, 0, 1);
        editor.begin_edit(y);
        editor.input(y, "blurred").unwrap();
        assert!(editor.blur(y));
        assert_eq!(editor.editing_cell(), None);
        assert!(editor.stored_content().contains("<td>blurred</td>"));
    }

    #[test]
    fn test_input_for_other_cell_ignored() {
        let mut editor = editing(NESTED);
        let x = cell(&mut editor, 0, 0);
        let y = cell(&mut editor, 0, 1);
        editor.begin_edit(y);
        assert!(!editor.input(x, "nope").unwrap());
        assert_eq!(editor.markup(), NESTED);
    }

    #[test]
    fn test_revert_discards_committed_edits() {
        let mut editor = editing(NESTED);
        let y = cell(&mut editor, 0, 1);
        editor.begin_edit(y);
        editor.input(y, "changed").unwrap();
        editor.key_down(&Key::Enter, Modifiers::NONE);
        editor.revert_to_snapshot().unwrap();
        assert_eq!(editor.markup(), NESTED);
        assert_eq!(editor.mode(), EditorMode::Preview);
    }
}

// ============================================================================
// Numeric Display Tests
// ============================================================================

mod numeric_display {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_and_strip() {
        assert_eq!(format_for_display("1234567"), "1,234,567");
        assert_eq!(strip_for_storage("1,234,567"), "1234567");
        assert_eq!(strip_for_storage(&format_for_display("1234567")), "1234567");
        assert_eq!(format_for_display("-1234.56"), "-1,234.56");
    }

    #[test]
    fn test_identifier_guards() {
        assert_eq!(format_for_display("0001234"), "0001234");
        assert_eq!(format_for_display("12345678901234567"), "12345678901234567");
        assert_eq!(format_for_display("12a34"), "12a34");
    }

    #[test]
    fn test_editor_round_trip() {
        let source = "<table><tr><td>1234567</td><td>0001234</td><td>x</td></tr></table>";
        let shown = normalize_markup(source).unwrap();
        assert!(shown.contains(">1,234,567</td>"));
        assert_eq!(prepare_for_storage(&shown).unwrap(), source);
    }

    #[test]
    fn test_edited_number_is_stripped_on_save() {
        let mut editor = EditorController::with_markup(
            "<table><tr><td>1000</td></tr></table>",
            EditorOptions::default(),
        )
        .unwrap();
        editor.enter_edit_mode();
        let c = cell(&mut editor, 0, 0);
        editor.begin_edit(c);
        editor.input(c, "2,500,000").unwrap();
        editor.key_down(&Key::Enter, Modifiers::NONE);
        assert_eq!(editor.save(), "<table><tr><td>2500000</td></tr></table>");
    }

    fn formatted(markup: &str) -> EditorController {
        let mut editor = EditorController::with_markup(markup, EditorOptions::default()).unwrap();
        editor.enter_edit_mode();
        editor
    }

    #[test]
    fn test_merged_numbers_are_saved_without_separators() {
        let mut editor = formatted("<table><tr><td>A</td><td>1234</td></tr></table>");
        assert!(editor.markup().contains(">1,234</td>"));
        drag(&mut editor, (0, 0), (0, 1));
        editor.merge_selection().unwrap();
        assert_eq!(
            editor.save(),
            r#"<table><tr><td rowspan="1" colspan="2">A 1234</td></tr></table>"#
        );
    }

    #[test]
    fn test_merged_number_keeps_display_grouping() {
        let mut editor = formatted("<table><tr><td>1234</td><td></td></tr></table>");
        drag(&mut editor, (0, 0), (0, 1));
        editor.merge_selection().unwrap();
        assert!(editor.markup().contains(">1,234</td>"));
        assert_eq!(
            editor.save(),
            r#"<table><tr><td rowspan="1" colspan="2">1234</td></tr></table>"#
        );
    }
}

// ============================================================================
// Records and Export Tests
// ============================================================================

mod records {
    use super::*;
    use pretty_assertions::assert_eq;
    use gridedit::records::NewRecord;
    use gridedit::{MemoryRecordStore, RecordEditor, RecordStore};

    #[test]
    fn test_edit_and_save_through_store() {
        let mut store = MemoryRecordStore::new();
        let record = store
            .create_record(NewRecord::new(
                "sales.xlsx",
                "<table><tr><td>A</td><td>B</td></tr></table>",
            ))
            .unwrap();

        let mut session =
            RecordEditor::open(&store, &record.id, EditorOptions::default()).unwrap();
        let editor = session.editor_mut();
        editor.enter_edit_mode();
        drag(editor, (0, 0), (0, 1));
        editor.merge_selection().unwrap();

        session.save_to(&mut store).unwrap();
        assert_eq!(
            store.fetch_record(&record.id).unwrap().content,
            r#"<table><tr><td rowspan="1" colspan="2">A B</td></tr></table>"#
        );
        assert_eq!(session.editor().mode(), EditorMode::Preview);
    }

    #[test]
    fn test_open_unknown_record() {
        let store = MemoryRecordStore::new();
        assert!(matches!(
            RecordEditor::open(&store, "missing", EditorOptions::default()),
            Err(EditorError::LoadFailed { .. })
        ));
    }

    #[test]
    fn test_export_and_merge_jsonl() {
        use gridedit::export::{export_record, jsonl_file_name, merge_jsonl};

        let mut store = MemoryRecordStore::new();
        let first = store
            .create_record(NewRecord::new("a.csv", "<table><tr><td>1</td></tr></table>"))
            .unwrap();
        let second = store
            .create_record(NewRecord::new("b.csv", "<table><tr><td>2</td></tr></table>"))
            .unwrap();

        let merged = merge_jsonl(&[export_record(&first), export_record(&second)]).unwrap();
        assert_eq!(merged.lines().count(), 2);
        assert!(merged.ends_with('\n'));
        assert_eq!(jsonl_file_name(&first.file_name), "a.jsonl");
    }
}

// ============================================================================
// Rendering Tests
// ============================================================================

mod rendering {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_marks_selection_and_handles() {
        let mut editor = editing(PLAIN_3X3);
        drag(&mut editor, (0, 0), (0, 1));
        let rendered = editor.render_markup();
        assert_eq!(rendered.matches("class=\"cell-selected\"").count(), 2);
        assert_eq!(rendered.matches("data-cell=").count(), 9);
        // presentation never reaches the stored markup
        assert!(!editor.markup().contains("cell-selected"));
        assert!(!editor.save().contains("data-cell"));
    }

    #[test]
    fn test_render_marks_editing_cell() {
        let mut editor = editing(PLAIN_3X3);
        let e = cell(&mut editor, 1, 1);
        editor.begin_edit(e);
        let rendered = editor.render_markup();
        assert_eq!(rendered.matches("class=\"cell-editing\"").count(), 1);
        assert!(rendered.contains("contenteditable=\"true\""));
    }
}
