//! Small synthetic ROM images for unit tests.

use crysmap_game::{Entrance, LocationData, LocationId, ScreenId};

use super::Location;
use crate::patch::Rom;
use crate::tables::{screen_addr, tile_effects_addr, tileset_alternates_addr, SCREEN_SIZE};

pub const FLOOR: u8 = 0x00;
pub const WALL: u8 = 0x01; // opens up to FLOOR when its screen is flagged
pub const WATER: u8 = 0x02; // blocks walking only
pub const ROCK: u8 = 0x03; // blocks everything, no alternate
pub const SLOPE: u8 = 0x04; // passable, but not a normal monster spot

pub fn blank_rom() -> Rom {
    let mut rom = Rom::new(vec![0; 0x40000]);
    let alternates: Vec<u8> = (0..0x20)
        .map(|t| if t == WALL { FLOOR } else { t })
        .collect();
    rom.write_n(tileset_alternates_addr(0x80), &alternates)
        .unwrap();
    let effects = tile_effects_addr(0xb3);
    rom.write_u8(effects + WALL as usize, 0x06).unwrap();
    rom.write_u8(effects + WATER as usize, 0x02).unwrap();
    rom.write_u8(effects + ROCK as usize, 0x06).unwrap();
    rom.write_u8(effects + SLOPE as usize, 0x20).unwrap();
    rom
}

/// Fills screen `id` with `tile(row, col)`.
pub fn write_screen(rom: &mut Rom, id: ScreenId, tile: impl Fn(usize, usize) -> u8) {
    let tiles: Vec<u8> = (0..SCREEN_SIZE).map(|t| tile(t >> 4, t & 0xf)).collect();
    rom.write_n(screen_addr(id), &tiles).unwrap();
}

/// A used location whose grid is `screens`, with one entrance at pixel (x, y).
pub fn location(id: LocationId, screens: Vec<Vec<ScreenId>>, x: u16, y: u16) -> Location {
    let mut loc = Location::unused(
        id,
        LocationData {
            name: format!("Test {id:02x}"),
            ..Default::default()
        },
    );
    loc.used = true;
    loc.set_height(screens.len());
    loc.set_width(screens[0].len());
    loc.screens = screens;
    loc.entrances.push(Entrance::from_xy(x, y));
    loc
}
