//! Tile grid generation.
//!
//! Only whole boards strictly inside the target area are placed. Columns
//! step by the board width while `x + width < target_width`, rows likewise
//! by height. The origin cell is occupied by the original artwork and is
//! never produced as a tile.

use serde::Serialize;

use crate::core::PanelizerError;

/// Offset of one duplicated board. `index` starts at 1 and follows
/// row-major order (rows outer, columns inner).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileOffset {
    pub x_offset: f64,
    pub y_offset: f64,
    pub index: usize,
}

impl TileOffset {
    /// Suffix appended to names and references in this tile.
    pub fn suffix(&self) -> String {
        format!("_{}", self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    board_width: f64,
    board_height: f64,
    columns: usize,
    rows: usize,
}

/// Number of whole steps that fit strictly inside `target`.
fn fitting_steps(step: f64, target: f64) -> usize {
    let mut n = 0usize;
    while (n as f64) * step + step < target {
        n += 1;
    }
    n
}

impl TileGrid {
    pub fn new(
        board_width: f64,
        board_height: f64,
        target_width: f64,
        target_height: f64,
    ) -> Result<Self, PanelizerError> {
        if !(board_width > 0.0 && board_height > 0.0)
            || !board_width.is_finite()
            || !board_height.is_finite()
        {
            return Err(PanelizerError::DegenerateOutline {
                width: board_width,
                height: board_height,
            });
        }
        Ok(Self {
            board_width,
            board_height,
            columns: fitting_steps(board_width, target_width),
            rows: fitting_steps(board_height, target_height),
        })
    }

    pub fn board_width(&self) -> f64 {
        self.board_width
    }

    pub fn board_height(&self) -> f64 {
        self.board_height
    }

    /// Board copies per row, the original included.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Board copies per column, the original included.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of tiles [`TileGrid::iter`] yields.
    pub fn tile_count(&self) -> usize {
        (self.columns * self.rows).saturating_sub(1)
    }

    /// Fresh iterator over the tiles; the grid can be iterated any number
    /// of times.
    pub fn iter(&self) -> TileOffsets {
        TileOffsets {
            grid: *self,
            row: 0,
            column: 0,
            next_index: 1,
        }
    }

    /// Y offsets of internal row boundaries (between adjacent rows).
    /// Empty when no column fits, since no copy borders those rows.
    pub fn row_boundaries(&self) -> impl Iterator<Item = f64> + '_ {
        let rows = if self.columns == 0 { 0 } else { self.rows };
        (1..rows).map(move |k| k as f64 * self.board_height)
    }

    /// X offsets of internal column boundaries. Empty when no row fits.
    pub fn column_boundaries(&self) -> impl Iterator<Item = f64> + '_ {
        let columns = if self.rows == 0 { 0 } else { self.columns };
        (1..columns).map(move |k| k as f64 * self.board_width)
    }
}

impl IntoIterator for &TileGrid {
    type Item = TileOffset;
    type IntoIter = TileOffsets;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct TileOffsets {
    grid: TileGrid,
    row: usize,
    column: usize,
    next_index: usize,
}

impl Iterator for TileOffsets {
    type Item = TileOffset;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.row >= self.grid.rows {
                return None;
            }
            if self.column >= self.grid.columns {
                self.row += 1;
                self.column = 0;
                continue;
            }
            let (row, column) = (self.row, self.column);
            self.column += 1;
            if row == 0 && column == 0 {
                continue;
            }
            let tile = TileOffset {
                x_offset: column as f64 * self.grid.board_width,
                y_offset: row as f64 * self.grid.board_height,
                index: self.next_index,
            };
            self.next_index += 1;
            return Some(tile);
        }
    }
}
