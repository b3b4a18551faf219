//! Packed tile coordinates.
//!
//! A tile within a location is addressed by a 16-bit value laid out as four
//! nibbles `YXyx`: screen row, screen column, tile row within the screen and
//! tile column within the screen. Screens are 16 tiles wide but only 15 tiles
//! tall, so the tile row nibble never exceeds `0xe`.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};

pub const SCREEN_TILE_COLS: usize = 16;
pub const SCREEN_TILE_ROWS: usize = 15;
pub const TILES_PER_SCREEN: usize = SCREEN_TILE_COLS * SCREEN_TILE_ROWS; // 0xf0
pub const MAX_SCREEN_DIM: usize = 16;

const LAST_TILE_ROW: u16 = (SCREEN_TILE_ROWS - 1) as u16;
const LAST_TILE_COL: u16 = (SCREEN_TILE_COLS - 1) as u16;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TileCoord(pub u16);

impl TileCoord {
    /// Combines a packed screen (`yx`) and a packed intra-screen tile (`yx`).
    pub fn new(screen: u8, tile: u8) -> Self {
        TileCoord((screen as u16) << 8 | tile as u16)
    }

    pub fn from_parts(screen_row: usize, screen_col: usize, tile_row: usize, tile_col: usize) -> Self {
        debug_assert!(screen_row < MAX_SCREEN_DIM && screen_col < MAX_SCREEN_DIM);
        debug_assert!(tile_row < SCREEN_TILE_ROWS && tile_col < SCREEN_TILE_COLS);
        TileCoord(
            (screen_row as u16) << 12
                | (screen_col as u16) << 8
                | (tile_row as u16) << 4
                | tile_col as u16,
        )
    }

    pub fn screen(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn tile(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    pub fn screen_row(self) -> usize {
        (self.0 >> 12) as usize
    }

    pub fn screen_col(self) -> usize {
        ((self.0 >> 8) & 0xf) as usize
    }

    pub fn tile_row(self) -> usize {
        ((self.0 >> 4) & 0xf) as usize
    }

    pub fn tile_col(self) -> usize {
        (self.0 & 0xf) as usize
    }

    /// Map-wide tile position `(x, y)`. Rows use a stride of 16 per screen
    /// (not 15), matching how entrance pixel coordinates divide down to tiles.
    pub fn flat(self) -> (i32, i32) {
        let x = (self.screen_col() * SCREEN_TILE_COLS + self.tile_col()) as i32;
        let y = (self.screen_row() * 16 + self.tile_row()) as i32;
        (x, y)
    }

    pub fn from_flat(x: i32, y: i32) -> Self {
        let screen = ((y & 0xf0) | (x & 0xf0) >> 4) as u8;
        let tile = ((y & 0x0f) << 4 | (x & 0x0f)) as u8;
        TileCoord::new(screen, tile)
    }

    /// Tile to the east, crossing into the next screen column after column 15.
    pub fn right(self) -> Option<TileCoord> {
        if (self.0 & 0xf) < LAST_TILE_COL {
            Some(TileCoord(self.0 + 1))
        } else if self.screen_col() + 1 < MAX_SCREEN_DIM {
            Some(TileCoord((self.0 & !0x000f) + 0x0100))
        } else {
            None
        }
    }

    /// Tile to the west, crossing into the previous screen column before column 0.
    pub fn left(self) -> Option<TileCoord> {
        if (self.0 & 0xf) > 0 {
            Some(TileCoord(self.0 - 1))
        } else if self.screen_col() > 0 {
            Some(TileCoord((self.0 | LAST_TILE_COL) - 0x0100))
        } else {
            None
        }
    }

    /// Tile to the south, crossing into the next screen row after tile row 14.
    pub fn below(self) -> Option<TileCoord> {
        if ((self.0 >> 4) & 0xf) < LAST_TILE_ROW {
            Some(TileCoord(self.0 + 0x10))
        } else if self.screen_row() + 1 < MAX_SCREEN_DIM {
            Some(TileCoord((self.0 & !0x00f0) + 0x1000))
        } else {
            None
        }
    }

    /// Tile to the north, crossing into the previous screen row before tile row 0.
    pub fn above(self) -> Option<TileCoord> {
        if ((self.0 >> 4) & 0xf) > 0 {
            Some(TileCoord(self.0 - 0x10))
        } else if self.screen_row() > 0 {
            Some(TileCoord((self.0 | LAST_TILE_ROW << 4) - 0x1000))
        } else {
            None
        }
    }

    /// 4-connected neighbors that stay within a `width` x `height` screen grid,
    /// in the order below, above, right, left.
    pub fn neighbors(self, width: usize, height: usize) -> Vec<TileCoord> {
        let mut out = Vec::with_capacity(4);
        let at_bottom =
            self.screen_row() + 1 >= height && self.tile_row() >= LAST_TILE_ROW as usize;
        if !at_bottom {
            out.extend(self.below());
        }
        if self.screen_row() > 0 || self.tile_row() > 0 {
            out.extend(self.above());
        }
        let at_right = self.screen_col() + 1 >= width && self.tile_col() >= LAST_TILE_COL as usize;
        if !at_right {
            out.extend(self.right());
        }
        if self.screen_col() > 0 || self.tile_col() > 0 {
            out.extend(self.left());
        }
        out
    }
}

impl From<u16> for TileCoord {
    fn from(x: u16) -> Self {
        TileCoord(x)
    }
}

impl Display for TileCoord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

impl Debug for TileCoord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "TileCoord({:04x})", self.0)
    }
}
