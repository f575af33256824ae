//! Sprite-sheet grid arithmetic.
//!
//! A sheet is a `cols × rows` grid of equally sized cells, indexed row-major
//! from the top-left. Cell extents are floored, so any remainder pixels on the
//! right and bottom edges belong to no cell.

use serde::Serialize;
use thiserror::Error;

/// Number of grid cells addressable by the two trailing digits of a `CardID`.
pub const MAX_CELLS_PER_SHEET: u64 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("grid has no cells ({cols}x{rows})")]
    EmptyGrid { cols: u32, rows: u32 },
    #[error("cell index {index} outside {cols}x{rows} grid")]
    IndexOutOfGrid { index: u32, cols: u32, rows: u32 },
    #[error("sheet {width}x{height} is smaller than its {cols}x{rows} grid")]
    SheetTooSmall {
        width: u32,
        height: u32,
        cols: u32,
        rows: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridSpec {
    pub cols: u32,
    pub rows: u32,
}

impl GridSpec {
    pub fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    pub fn cells(&self) -> u32 {
        self.cols.saturating_mul(self.rows)
    }
}

/// A rectangle in sheet pixel coordinates, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CellRect {
    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn intersects(&self, other: &CellRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Grid index encoded in a `CardID`: its two least-significant decimal digits.
///
/// The leading digits name the sheet (the `CustomDeck` key), so an index
/// never exceeds 99.
pub fn grid_index(card_id: u64) -> u32 {
    (card_id % MAX_CELLS_PER_SHEET) as u32
}

/// Deck id encoded in a `CardID`: everything but the last two digits.
pub fn deck_id(card_id: u64) -> u64 {
    card_id / MAX_CELLS_PER_SHEET
}

/// Pixel rectangle of cell `index` in a `sheet_width × sheet_height` sheet.
pub fn cell_rect(
    sheet_width: u32,
    sheet_height: u32,
    grid: GridSpec,
    index: u32,
) -> Result<CellRect, GeometryError> {
    let GridSpec { cols, rows } = grid;
    if cols == 0 || rows == 0 {
        return Err(GeometryError::EmptyGrid { cols, rows });
    }
    if u64::from(index) >= u64::from(cols) * u64::from(rows) {
        return Err(GeometryError::IndexOutOfGrid { index, cols, rows });
    }
    let width = sheet_width / cols;
    let height = sheet_height / rows;
    if width == 0 || height == 0 {
        return Err(GeometryError::SheetTooSmall {
            width: sheet_width,
            height: sheet_height,
            cols,
            rows,
        });
    }
    Ok(CellRect {
        x: (index % cols) * width,
        y: (index / cols) * height,
        width,
        height,
    })
}
