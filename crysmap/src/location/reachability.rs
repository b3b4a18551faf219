use anyhow::Result;
use crysmap_game::coord::TILES_PER_SCREEN;
use crysmap_game::util::sorted_keys;
use crysmap_game::TileCoord;
use hashbrown::{HashMap, HashSet};
use pathfinding::undirected::connected_components::connected_components;

use super::Location;
use crate::patch::Rom;
use crate::tables::GraphicsTables;

pub const EFFECT_BLOCKS_WALKING: u8 = 0x02;
pub const EFFECT_BLOCKS_ALL: u8 = 0x04;

/// Highest tile index that may have a flag-dependent alternate.
const MAX_ALTERNATE_TILE: u8 = 0x20;

pub fn is_blocked(effect: u8, fly: bool) -> bool {
    let mask = if fly {
        EFFECT_BLOCKS_ALL
    } else {
        EFFECT_BLOCKS_WALKING | EFFECT_BLOCKS_ALL
    };
    effect & mask != 0
}

impl Location {
    /// Every tile connected to a used entrance, with its terrain effect byte.
    ///
    /// Flagged screens may swap blocked tiles for their tileset alternate; the
    /// effect reported for such a tile is that of the alternate. Dolphin
    /// locations are always treated as flying.
    pub fn reachable_tiles(&self, rom: &Rom, fly: bool) -> Result<HashMap<TileCoord, u8>> {
        self.screen_page()?;
        let fly = fly || self.has_dolphin();
        let tables = GraphicsTables::new(rom);
        let tileset = tables.tileset(self.tileset)?;
        let effects = tables.tile_effects(self.tile_effects)?;

        let exits: HashSet<TileCoord> = self
            .exits
            .iter()
            .map(|e| TileCoord::new(e.screen(), e.tile()))
            .collect();

        let mut passable: HashMap<TileCoord, u8> = HashMap::new();
        for y in 0..self.height() {
            for x in 0..self.width() {
                let pos = (y << 4 | x) as u8;
                let tiles = tables.screen_tiles(self.screens[y][x])?;
                let flagged = self.flags.iter().any(|f| f.screen() == pos);
                for t in 0..TILES_PER_SCREEN {
                    let coord = TileCoord::new(pos, t as u8);
                    if exits.contains(&coord) {
                        continue;
                    }
                    let tile = tiles[t];
                    let mut effect = effects[tile as usize];
                    if flagged && is_blocked(effect, fly) && tile < MAX_ALTERNATE_TILE {
                        if let Some(alt) = tileset.alternate(tile) {
                            effect = effects[alt as usize];
                        }
                    }
                    if !is_blocked(effect, fly) {
                        passable.insert(coord, effect);
                    }
                }
            }
        }

        let tiles = sorted_keys(&passable);
        let components = connected_components(&tiles, |t: &TileCoord| {
            [t.right(), t.below(), t.left(), t.above()]
                .into_iter()
                .flatten()
                .filter(|n| passable.contains_key(n))
                .collect::<Vec<_>>()
        });

        let starts: Vec<TileCoord> = self
            .entrances
            .iter()
            .filter(|e| e.used())
            .map(|e| TileCoord::new(e.screen(), e.tile()))
            .collect();
        let mut out: HashMap<TileCoord, u8> = HashMap::new();
        for component in components {
            if !starts.iter().any(|t| component.contains(t)) {
                continue;
            }
            for t in component {
                out.insert(t, passable[&t]);
            }
        }
        Ok(out)
    }
}
