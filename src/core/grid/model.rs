//! Logical grid built from a table element

use fxhash::FxHashMap;

use super::cell::{parse_span, CellMeta, Position, MAX_COLSPAN};
use crate::core::markup::{Document, NodeId};
use crate::utils::error::{GridError, SpanWarning};

/// Dense row/column view of one table
///
/// A spanning cell appears at every coordinate it covers. The grid records
/// the document revision it was built from; any structural change to the
/// document makes it stale.
#[derive(Debug, Clone)]
pub struct GridModel {
    table: NodeId,
    revision: u64,
    rows: Vec<NodeId>,
    matrix: Vec<Vec<Option<NodeId>>>,
    meta: FxHashMap<NodeId, CellMeta>,
    /// Cells in document order
    cells: Vec<NodeId>,
    warnings: Vec<SpanWarning>,
}

impl GridModel {
    /// Build the grid of `table`
    ///
    /// Rows are walked top to bottom and cells left to right; the column
    /// cursor skips slots already claimed by a span from a previous row.
    pub fn build(doc: &Document, table: NodeId) -> Result<Self, GridError> {
        if !doc.is_element(table, "table") {
            return Err(GridError::NotATable(table));
        }
        let rows = doc.rows_of(table);
        if rows.is_empty() {
            return Err(GridError::MissingRows(table));
        }

        let row_count = rows.len();
        let mut matrix: Vec<Vec<Option<NodeId>>> = vec![Vec::new(); row_count];
        let mut meta = FxHashMap::default();
        let mut cells = Vec::new();
        let mut warnings = Vec::new();

        for (row_idx, &row) in rows.iter().enumerate() {
            let mut col = 0;
            for cell in doc.cells_of(row) {
                while matrix[row_idx].get(col).copied().flatten().is_some() {
                    col += 1;
                }

                let mut rowspan = span_or_default(doc, cell, "rowspan", &mut warnings);
                let mut colspan = span_or_default(doc, cell, "colspan", &mut warnings);

                if colspan > MAX_COLSPAN {
                    push_warning(
                        &mut warnings,
                        cell,
                        "colspan",
                        format!("clamped {} to {}", colspan, MAX_COLSPAN),
                    );
                    colspan = MAX_COLSPAN;
                }
                let remaining = row_count - row_idx;
                if rowspan > remaining {
                    push_warning(
                        &mut warnings,
                        cell,
                        "rowspan",
                        format!("clipped {} to the {} remaining rows", rowspan, remaining),
                    );
                    rowspan = remaining;
                }

                let mut overlapped = false;
                for r in row_idx..row_idx + rowspan {
                    let line = &mut matrix[r];
                    if line.len() < col + colspan {
                        line.resize(col + colspan, None);
                    }
                    for slot in &mut line[col..col + colspan] {
                        if slot.is_none() {
                            *slot = Some(cell);
                        } else {
                            overlapped = true;
                        }
                    }
                }
                if overlapped {
                    push_warning(
                        &mut warnings,
                        cell,
                        "span",
                        "overlaps a cell placed earlier; only free coordinates were claimed"
                            .to_string(),
                    );
                }

                meta.insert(
                    cell,
                    CellMeta {
                        row: row_idx,
                        col,
                        rowspan,
                        colspan,
                    },
                );
                cells.push(cell);
                col += colspan;
            }
        }

        let width = matrix.iter().map(Vec::len).max().unwrap_or(0);
        for line in &mut matrix {
            line.resize(width, None);
        }

        tracing::debug!(
            target: "gridedit::grid",
            table = table.raw(),
            rows = row_count,
            cols = width,
            cells = cells.len(),
            "built grid"
        );

        Ok(GridModel {
            table,
            revision: doc.revision(),
            rows,
            matrix,
            meta,
            cells,
            warnings,
        })
    }

    pub fn table(&self) -> NodeId {
        self.table
    }

    /// Revision of the document this grid was built from
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether no structural change happened since the build
    pub fn is_fresh(&self, doc: &Document) -> bool {
        self.revision == doc.revision()
    }

    pub fn row_count(&self) -> usize {
        self.matrix.len()
    }

    pub fn col_count(&self) -> usize {
        self.matrix.first().map_or(0, Vec::len)
    }

    /// Row elements in order
    pub fn rows(&self) -> &[NodeId] {
        &self.rows
    }

    /// Cells in document order
    pub fn cells(&self) -> &[NodeId] {
        &self.cells
    }

    pub fn warnings(&self) -> &[SpanWarning] {
        &self.warnings
    }

    /// Owner of a coordinate; `None` out of bounds or in a hole of a ragged table
    pub fn cell_at(&self, row: usize, col: usize) -> Option<NodeId> {
        self.matrix.get(row)?.get(col).copied().flatten()
    }

    pub fn cell_at_position(&self, pos: Position) -> Option<NodeId> {
        self.cell_at(pos.row, pos.col)
    }

    pub fn meta(&self, cell: NodeId) -> Option<CellMeta> {
        self.meta.get(&cell).copied()
    }

    pub fn contains(&self, cell: NodeId) -> bool {
        self.meta.contains_key(&cell)
    }

    /// Coordinate of a cell found by scanning the matrix for its identity
    ///
    /// Row-major scan, so the first hit is the cell's anchor.
    pub fn position_of(&self, cell: NodeId) -> Option<Position> {
        self.matrix.iter().enumerate().find_map(|(row, line)| {
            line.iter()
                .position(|slot| *slot == Some(cell))
                .map(|col| Position::new(row, col))
        })
    }

    /// Every coordinate owned by `cell`, row-major
    pub fn covered_positions(&self, cell: NodeId) -> Vec<Position> {
        let mut out = Vec::new();
        for (row, line) in self.matrix.iter().enumerate() {
            for (col, slot) in line.iter().enumerate() {
                if *slot == Some(cell) {
                    out.push(Position::new(row, col));
                }
            }
        }
        out
    }

    /// Render the ownership matrix with one label per cell, for diagnostics
    pub fn describe(&self, label: &dyn Fn(NodeId) -> String) -> String {
        let mut out = String::new();
        for line in &self.matrix {
            let labels: Vec<String> = line
                .iter()
                .map(|slot| match slot {
                    Some(cell) => label(*cell),
                    None => "·".to_string(),
                })
                .collect();
            out.push_str(&labels.join(" | "));
            out.push('\n');
        }
        out
    }
}

fn span_or_default(
    doc: &Document,
    cell: NodeId,
    attribute: &'static str,
    warnings: &mut Vec<SpanWarning>,
) -> usize {
    parse_span(doc.attribute(cell, attribute)).unwrap_or_else(|err| {
        push_warning(warnings, cell, attribute, format!("{}; using 1", err));
        1
    })
}

fn push_warning(
    warnings: &mut Vec<SpanWarning>,
    cell: NodeId,
    attribute: &'static str,
    message: String,
) {
    tracing::warn!(
        target: "gridedit::grid",
        cell = cell.raw(),
        attribute,
        "{}",
        message
    );
    warnings.push(SpanWarning {
        cell,
        attribute,
        message,
    });
}
