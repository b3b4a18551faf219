//! Read-only views over the graphics and boss tables stored in the ROM.

use anyhow::Result;
use crysmap_game::{BossIdx, PcAddr, ScreenId, TileEffectsId, TilesetId, NUM_BOSSES};

use crate::location::LocationError;
use crate::patch::Rom;

pub const TILESET_MIN: TilesetId = 0x80;
pub const TILESET_MAX: TilesetId = 0xac;
pub const TILE_EFFECTS_MIN: TileEffectsId = 0xb3;
pub const TILE_EFFECTS_MAX: TileEffectsId = 0xbd;

pub const SCREEN_SIZE: usize = 0xf0;
pub const TILE_EFFECTS_SIZE: usize = 0x100;
pub const ALTERNATES_SIZE: usize = 0x20;

const TILESET_ALTERNATES_BASE: PcAddr = 0x13e00;
const TILE_EFFECTS_BASE: PcAddr = 0x12000;

pub const BOSS_LOCATION_TABLE: PcAddr = 0x1f95d;
pub const BOSS_KILL_TABLE: PcAddr = 0x1f96b;
pub const BOSS_KILL_BANK_OFFSET: PcAddr = 0x14000; // bank $0f CPU -> PRG
pub const BOSS_KILL_RECORD_SIZE: usize = 21;
pub const BOSS_POST_TABLE: PcAddr = 0x1f7c1;
const BOSS_POST_STRIDE: usize = 5;

pub fn screen_addr(id: ScreenId) -> PcAddr {
    let id = id as PcAddr;
    (if id > 0xff { 0x40 + id } else { id }) << 8
}

pub fn tile_effects_addr(id: TileEffectsId) -> PcAddr {
    ((id as PcAddr) << 8) & 0x1fff | TILE_EFFECTS_BASE
}

pub fn tileset_alternates_addr(id: TilesetId) -> PcAddr {
    TILESET_ALTERNATES_BASE | ((id as PcAddr) & 0x3f) << 3
}

pub fn is_valid_tileset(id: TilesetId) -> bool {
    (TILESET_MIN..=TILESET_MAX).contains(&id) && id & 3 == 0
}

pub fn is_valid_tile_effects(id: TileEffectsId) -> bool {
    (TILE_EFFECTS_MIN..=TILE_EFFECTS_MAX).contains(&id)
}

#[derive(Copy, Clone, Debug)]
pub struct Tileset<'a> {
    pub id: TilesetId,
    /// Replacement tile for each of the first 32 tile indices when the
    /// screen's flag is set. A tile with no alternate maps to itself.
    alternates: &'a [u8],
}

impl<'a> Tileset<'a> {
    /// The distinct alternate for `tile`, if it has one.
    pub fn alternate(&self, tile: u8) -> Option<u8> {
        let alt = *self.alternates.get(tile as usize)?;
        (alt != tile).then_some(alt)
    }
}

#[derive(Copy, Clone)]
pub struct GraphicsTables<'a> {
    rom: &'a Rom,
}

impl<'a> GraphicsTables<'a> {
    pub fn new(rom: &'a Rom) -> Self {
        GraphicsTables { rom }
    }

    /// The 15x16 tile ids making up a screen.
    pub fn screen_tiles(&self, id: ScreenId) -> Result<&'a [u8]> {
        self.rom.read_n(screen_addr(id), SCREEN_SIZE)
    }

    pub fn tileset(&self, id: TilesetId) -> Result<Tileset<'a>> {
        if !is_valid_tileset(id) {
            return Err(LocationError::UnknownTileset(id).into());
        }
        let alternates = self
            .rom
            .read_n(tileset_alternates_addr(id), ALTERNATES_SIZE)?;
        Ok(Tileset { id, alternates })
    }

    /// Terrain effect byte for each of the 256 tile ids.
    pub fn tile_effects(&self, id: TileEffectsId) -> Result<&'a [u8]> {
        if !is_valid_tile_effects(id) {
            return Err(LocationError::UnknownTileEffects(id).into());
        }
        self.rom.read_n(tile_effects_addr(id), TILE_EFFECTS_SIZE)
    }

    pub fn boss_location(&self, boss: BossIdx) -> Result<u8> {
        anyhow::ensure!(boss < NUM_BOSSES, "boss index out of range: {boss}");
        self.rom.read_u8(BOSS_LOCATION_TABLE + boss)
    }

    /// CPU address of the boss's kill-data record (zero if it has none).
    pub fn boss_kill_base(&self, boss: BossIdx) -> Result<u16> {
        anyhow::ensure!(boss < NUM_BOSSES, "boss index out of range: {boss}");
        self.rom.read_u16(BOSS_KILL_TABLE + 2 * boss)
    }

    pub fn boss_post_addr(boss: BossIdx) -> PcAddr {
        BOSS_POST_TABLE + BOSS_POST_STRIDE * boss
    }
}
