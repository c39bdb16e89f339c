//! Cell merging
//!
//! Merges the cells under a selection rectangle into the top-left cell of
//! the region they cover. The region grows until no cell straddles its
//! border:
//!
//! ```text
//! drag (0,1)-(1,1) over      A A B        region (0,0)-(1,1)
//!                            C D E   ->   anchor A, rowspan 2, colspan 2
//! ```
//!
//! Every check runs before the first mutation, so a failed merge leaves the
//! document untouched. A successful merge invalidates the grid it used.
//!
//! Numbers shown with display grouping are merged in their stored form; the
//! anchor is formatted again afterwards, so saving never persists separators
//! the formatter added.

use fxhash::FxHashSet;

use crate::core::grid::{GridModel, Position};
use crate::core::markup::{Document, NodeId};
use crate::core::selection::{Bounds, SelectionRect};
use crate::features::numeric::{NumericFormatter, AUTO_FORMAT_ATTR};
use crate::utils::error::MergeError;

/// What a successful merge did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The surviving cell
    pub anchor: NodeId,
    /// Final merged region
    pub region: Bounds,
    /// Cells removed from the tree, row-major
    pub removed: Vec<NodeId>,
}

impl MergeOutcome {
    pub fn rowspan(&self) -> usize {
        self.region.height()
    }

    pub fn colspan(&self) -> usize {
        self.region.width()
    }
}

/// Merge the cells selected by `rect` in `grid`'s table
///
/// Formatted numbers are read back with the default separators.
pub fn merge(
    doc: &mut Document,
    grid: &GridModel,
    rect: &SelectionRect,
) -> Result<MergeOutcome, MergeError> {
    merge_with_formatter(doc, grid, rect, &NumericFormatter::default())
}

/// [`merge`] with the formatter that produced the document's display numbers
pub fn merge_with_formatter(
    doc: &mut Document,
    grid: &GridModel,
    rect: &SelectionRect,
    formatter: &NumericFormatter,
) -> Result<MergeOutcome, MergeError> {
    let plan = plan(doc, grid, rect, formatter)?;
    Ok(apply(doc, plan, formatter))
}

/// A validated merge, ready to be applied
struct MergePlan {
    anchor: NodeId,
    region: Bounds,
    /// Region cells in row-major order of first appearance
    cells: Vec<NodeId>,
    content: Document,
    /// Some region cell carried display formatting
    reformat: bool,
}

fn plan(
    doc: &Document,
    grid: &GridModel,
    rect: &SelectionRect,
    formatter: &NumericFormatter,
) -> Result<MergePlan, MergeError> {
    if !grid.is_fresh(doc) {
        return Err(MergeError::StaleGrid);
    }

    let selected = rect.bounds();
    if selected.area() < 2 {
        return Err(MergeError::InsufficientSelection {
            distinct: selected.area(),
        });
    }
    check_in_grid(grid, &selected)?;

    let mut seen = FxHashSet::default();
    let mut distinct = Vec::new();
    for pos in selected.positions() {
        let cell = resolve(grid, pos)?;
        if seen.insert(cell) {
            distinct.push(cell);
        }
    }
    if distinct.len() < 2 {
        return Err(MergeError::InsufficientSelection {
            distinct: distinct.len(),
        });
    }

    // Grow the region over every cell that overlaps it until it is stable
    let mut region = selected;
    loop {
        let mut grown = region;
        for pos in region.positions() {
            let cell = resolve(grid, pos)?;
            if let Some(meta) = grid.meta(cell) {
                grown = grown.union(&Bounds {
                    min_row: meta.row,
                    max_row: meta.last_row(),
                    min_col: meta.col,
                    max_col: meta.last_col(),
                });
            }
        }
        if grown == region {
            break;
        }
        check_in_grid(grid, &grown)?;
        region = grown;
    }

    let mut seen = FxHashSet::default();
    let mut cells = Vec::new();
    for pos in region.positions() {
        let cell = resolve(grid, pos)?;
        if seen.insert(cell) {
            cells.push(cell);
        }
    }

    // Every built cell owns its anchor coordinate and the region covers each
    // member's full span, so the top-left owner is anchored there. Grids
    // that break this are rejected rather than merged into a wrong cell.
    let top_left = region.top_left();
    let anchor = grid
        .cell_at_position(top_left)
        .filter(|cell| grid.meta(*cell).map(|m| m.anchor()) == Some(top_left))
        .ok_or(MergeError::AnchorNotFound {
            row: top_left.row,
            col: top_left.col,
        })?;

    let mut reformat = false;
    let mut pieces = Vec::new();
    for &cell in &cells {
        let piece = match formatter.stored_text(doc, cell) {
            Some(stored) => {
                reformat = true;
                stored
            }
            None => doc.inner_markup(cell),
        };
        let piece = piece.trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
    }
    let content = Document::parse(&pieces.join(" ")).map_err(|_| MergeError::UnresolvedRegion {
        row: top_left.row,
        col: top_left.col,
    })?;

    Ok(MergePlan {
        anchor,
        region,
        cells,
        content,
        reformat,
    })
}

/// Reject boxes reaching past the grid before enumerating their coordinates
///
/// Reports the first missing coordinate in row-major order.
fn check_in_grid(grid: &GridModel, bounds: &Bounds) -> Result<(), MergeError> {
    let (rows, cols) = (grid.row_count(), grid.col_count());
    if bounds.max_row < rows && bounds.max_col < cols {
        return Ok(());
    }
    let (row, col) = if bounds.min_row >= rows || bounds.min_col >= cols {
        (bounds.min_row, bounds.min_col)
    } else if bounds.max_col >= cols {
        (bounds.min_row, cols)
    } else {
        (rows, bounds.min_col)
    };
    Err(MergeError::UnresolvedRegion { row, col })
}

fn resolve(grid: &GridModel, pos: Position) -> Result<NodeId, MergeError> {
    grid.cell_at_position(pos)
        .ok_or(MergeError::UnresolvedRegion {
            row: pos.row,
            col: pos.col,
        })
}

fn apply(doc: &mut Document, plan: MergePlan, formatter: &NumericFormatter) -> MergeOutcome {
    let MergePlan {
        anchor,
        region,
        cells,
        content,
        reformat,
    } = plan;

    let removed: Vec<NodeId> = cells.into_iter().filter(|&c| c != anchor).collect();
    for &cell in &removed {
        doc.detach(cell);
    }

    doc.set_attribute(anchor, "rowspan", region.height().to_string());
    doc.set_attribute(anchor, "colspan", region.width().to_string());
    if !content.children(content.root()).is_empty() {
        doc.remove_attribute(anchor, AUTO_FORMAT_ATTR);
        doc.replace_children(anchor, &content);
    }
    if reformat {
        formatter.format_cell(doc, anchor);
    }

    tracing::debug!(
        target: "gridedit::merge",
        anchor = anchor.raw(),
        rowspan = region.height(),
        colspan = region.width(),
        removed = removed.len(),
        "merged cells"
    );

    MergeOutcome {
        anchor,
        region,
        removed,
    }
}
