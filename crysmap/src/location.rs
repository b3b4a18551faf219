pub mod codec;
#[cfg(test)]
mod fixtures;
pub mod placement;
pub mod reachability;
pub mod topology;

use anyhow::Result;
use crysmap_game::{
    BossIdx, Entrance, Exit, Flag, LocationData, LocationId, PcAddr, Pit, ScreenId, Spawn,
    TileEffectsId, TilesetId, DOLPHIN_LOCATIONS, NUM_BOSSES, NUM_LOCATIONS,
};
use hashbrown::HashSet;
use thiserror::Error;

use crate::patch::Rom;
use crate::tables::GraphicsTables;

pub const MAP_DATA_TABLE: PcAddr = 0x14300;
pub const MAP_DATA_ADDEND: PcAddr = 0xc000;
pub const NPC_DATA_TABLE: PcAddr = 0x19201;
pub const NPC_DATA_ADDEND: PcAddr = 0x10000;
pub const SAVE_FLAGS_TABLE: PcAddr = 0x2ff00;

pub const UNUSED_TILE_PALETTES: [u8; 3] = [0x24, 0x01, 0x26];
pub const UNUSED_TILESET: TilesetId = 0x80;
pub const UNUSED_TILE_EFFECTS: TileEffectsId = 0xb3;
pub const UNUSED_TILE_PATTERNS: [u8; 2] = [2, 4];

/// Exits within this many pixels of an entrance (on both axes) lead back out of it.
const ENTRANCE_EXIT_RADIUS: u16 = 24;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("no ROM record for location {0}")]
    InvalidLocation(LocationId),

    #[error("expected spawn ${slot:02x} in location ${location:02x}")]
    MissingSpawn { location: LocationId, slot: usize },

    #[error("no entrance {location:02x}:{entrance}")]
    MissingEntrance {
        location: LocationId,
        entrance: usize,
    },

    #[error("no exit found near {location:02x}:{entrance}")]
    NoExitNearEntrance {
        location: LocationId,
        entrance: usize,
    },

    #[error("non-unique screen page in location {location:02x}: {pages:x?}")]
    NonUniqueScreenPage {
        location: LocationId,
        pages: Vec<u16>,
    },

    #[error("screen {0:03x} has no connection data")]
    UnknownConnectionScreen(ScreenId),

    #[error("location {location:02x} has {count} entrances, at most 31 fit")]
    TooManyEntrances { location: LocationId, count: usize },

    #[error("unknown tileset {0:02x}")]
    UnknownTileset(TilesetId),

    #[error("unknown tile effects {0:02x}")]
    UnknownTileEffects(TileEffectsId),
}

/// One map: a grid of screens plus the objects placed on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub id: LocationId,
    pub used: bool,
    pub data: LocationData,

    pub bgm: u8,
    pub original_bgm: u8,
    pub layout_width: u8,  // width - 1
    pub layout_height: u8, // height - 1
    pub animation: u8,
    pub screens: Vec<Vec<ScreenId>>, // [row][col]

    pub tile_palettes: [u8; 3],
    pub original_tile_palettes: [u8; 3],
    pub tileset: TilesetId,
    pub tile_effects: TileEffectsId,
    pub tile_patterns: [u8; 2],

    pub entrances: Vec<Entrance>,
    pub exits: Vec<Exit>,
    pub flags: Vec<Flag>,
    pub pits: Vec<Pit>,

    pub sprite_palettes: [u8; 2],
    pub sprite_patterns: [u8; 2],
    pub spawns: Vec<Spawn>,

    pub checkpoint: bool,
    pub saveable: bool,
}

impl Location {
    /// The canonical state of a location with no map data.
    pub fn unused(id: LocationId, data: LocationData) -> Self {
        Location {
            id,
            used: false,
            data,
            bgm: 0,
            original_bgm: 0,
            layout_width: 0,
            layout_height: 0,
            animation: 0,
            screens: vec![vec![0]],
            tile_palettes: UNUSED_TILE_PALETTES,
            original_tile_palettes: UNUSED_TILE_PALETTES,
            tileset: UNUSED_TILESET,
            tile_effects: UNUSED_TILE_EFFECTS,
            tile_patterns: UNUSED_TILE_PATTERNS,
            entrances: vec![],
            exits: vec![],
            flags: vec![],
            pits: vec![],
            sprite_palettes: [0, 0],
            sprite_patterns: [0, 0],
            spawns: vec![],
            checkpoint: false,
            saveable: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn width(&self) -> usize {
        self.layout_width as usize + 1
    }

    pub fn set_width(&mut self, width: usize) {
        self.layout_width = (width - 1) as u8;
    }

    pub fn height(&self) -> usize {
        self.layout_height as usize + 1
    }

    pub fn set_height(&mut self, height: usize) {
        self.layout_height = (height - 1) as u8;
    }

    fn rom_index(&self) -> Result<usize> {
        if self.id < 0 || self.id as usize >= NUM_LOCATIONS {
            return Err(LocationError::InvalidLocation(self.id).into());
        }
        Ok(self.id as usize)
    }

    /// Address of this location's entry in the map data pointer table.
    pub fn map_data_pointer(&self) -> Result<PcAddr> {
        Ok(MAP_DATA_TABLE + (self.rom_index()? << 1))
    }

    /// Address of this location's entry in the NPC data pointer table.
    pub fn npc_data_pointer(&self) -> Result<PcAddr> {
        Ok(NPC_DATA_TABLE + (self.rom_index()? << 1))
    }

    pub fn save_flags_addr(&self) -> Result<PcAddr> {
        Ok(SAVE_FLAGS_TABLE | self.rom_index()?)
    }

    /// Screen id at packed grid position `pos` (yx), if it lies inside the grid.
    pub fn screen_at(&self, pos: u8) -> Option<ScreenId> {
        let y = (pos >> 4) as usize;
        let x = (pos & 0xf) as usize;
        self.screens.get(y)?.get(x).copied()
    }

    /// The single screen bank (high byte of the screen ids) used by every cell.
    pub fn screen_page(&self) -> Result<u16> {
        let mut pages: Vec<u16> = self.screens.iter().flatten().map(|&s| s >> 8).collect();
        pages.sort();
        pages.dedup();
        if pages.len() != 1 {
            return Err(LocationError::NonUniqueScreenPage {
                location: self.id,
                pages,
            }
            .into());
        }
        Ok(pages[0])
    }

    /// Distinct screen ids used anywhere in the layout.
    pub fn all_screens(&self) -> HashSet<ScreenId> {
        self.screens.iter().flatten().copied().collect()
    }

    pub fn has_dolphin(&self) -> bool {
        DOLPHIN_LOCATIONS.contains(&self.id)
    }

    /// Index of the boss fought here, per the ROM's boss location table.
    pub fn boss_id(&self, rom: &Rom) -> Result<Option<BossIdx>> {
        let tables = GraphicsTables::new(rom);
        for i in 0..NUM_BOSSES {
            if tables.boss_location(i)? as LocationId == self.id {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Spawns are referenced by slot number, which starts at $0d.
    pub fn spawn(&self, slot: usize) -> Result<&Spawn> {
        slot.checked_sub(0x0d)
            .and_then(|i| self.spawns.get(i))
            .ok_or_else(|| {
                LocationError::MissingSpawn {
                    location: self.id,
                    slot,
                }
                .into()
            })
    }

    pub fn find_or_add_entrance(&mut self, screen: u8, coord: u16) -> usize {
        if let Some(i) = self
            .entrances
            .iter()
            .position(|e| e.screen() == screen && e.coord() == coord)
        {
            return i;
        }
        self.entrances
            .push(Entrance::from_screen_coord(screen, coord));
        self.entrances.len() - 1
    }

    /// Destination of the exit sitting next to the given entrance.
    pub fn neighbor_for_entrance(&self, entrance: usize) -> Result<u8> {
        let e = self
            .entrances
            .get(entrance)
            .ok_or(LocationError::MissingEntrance {
                location: self.id,
                entrance,
            })?;
        for exit in &self.exits {
            if exit.screen() != e.screen() {
                continue;
            }
            let dx = exit.x().abs_diff(e.x());
            let dy = exit.y().abs_diff(e.y());
            if dx < ENTRANCE_EXIT_RADIUS && dy < ENTRANCE_EXIT_RADIUS {
                return Ok(exit.dest());
            }
        }
        Err(LocationError::NoExitNearEntrance {
            location: self.id,
            entrance,
        }
        .into())
    }
}
