use anyhow::Result;
use crysmap_game::util::sorted_keys;
use crysmap_game::{
    LocationId, Monster, Placement, TileCoord, LOCATION_SWAMP, SWAMP_PLANT_TILE,
};
use hashbrown::HashMap;
use log::debug;
use pathfinding::directed::dijkstra::dijkstra_all;
use rand::Rng;

use super::Location;
use crate::patch::Rom;
use crate::tables::GraphicsTables;

const NORMAL_TERRAIN_MASK: u8 = 0x27;
const DOLPHIN_NORMAL_TERRAIN_MASK: u8 = 0x25;

/// Placement session for one location: candidate tiles bucketed by distance
/// from the reachable area, plus the monsters placed so far.
pub struct MonsterPlacer<R: Rng> {
    rng: R,
    location: LocationId,
    normal: Vec<TileCoord>,
    moth: Vec<TileCoord>,
    bird: Vec<TileCoord>,
    plant: Vec<TileCoord>,
    entrances: Vec<(i64, i64)>, // used entrances, in tile units
    placed: Vec<(i64, i64, i64)>, // x, y, clearance
}

impl Location {
    pub fn monster_placer<R: Rng>(&self, rom: &Rom, rng: R) -> Result<MonsterPlacer<R>> {
        let reachable = self.reachable_tiles(rom, false)?;
        let tables = GraphicsTables::new(rom);
        let mask = if self.has_dolphin() {
            DOLPHIN_NORMAL_TERRAIN_MASK
        } else {
            NORMAL_TERRAIN_MASK
        };
        let (width, height) = (self.width(), self.height());

        let mut placer = MonsterPlacer {
            rng,
            location: self.id,
            normal: vec![],
            moth: vec![],
            bird: vec![],
            plant: vec![],
            entrances: self
                .entrances
                .iter()
                .filter(|e| e.used())
                .map(|e| ((e.x() >> 4) as i64, (e.y() >> 4) as i64))
                .collect(),
            placed: vec![],
        };

        // Distances from the reachable area, as shortest paths from a virtual
        // source one step away from every reachable tile. Boss screens are
        // entered but never crossed.
        let sources = sorted_keys(&reachable);
        let successors = |node: &Option<TileCoord>| -> Vec<(Option<TileCoord>, u32)> {
            let Some(t) = *node else {
                return sources.iter().map(|&t| (Some(t), 1)).collect();
            };
            let screen = self.screens[t.screen_row()][t.screen_col()];
            if self.data.boss_screen == Some(screen) {
                return vec![];
            }
            t.neighbors(width, height)
                .into_iter()
                .map(|n| (Some(n), 1))
                .collect()
        };
        let distance: HashMap<TileCoord, u32> = dijkstra_all(&None, successors)
            .into_iter()
            .filter_map(|(node, (_, cost))| Some((node?, cost - 1)))
            .collect();

        for t in sorted_keys(&distance) {
            let d = distance[&t];
            let screen = self.screens[t.screen_row()][t.screen_col()];
            if self.data.boss_screen == Some(screen) {
                continue;
            }
            let effect = reachable.get(&t).copied().unwrap_or(0);
            if d == 0 && effect & mask == 0 {
                placer.normal.push(t);
            }
            if self.id == LOCATION_SWAMP {
                if tables.screen_tiles(screen)?[t.tile() as usize] == SWAMP_PLANT_TILE {
                    placer.plant.push(t);
                }
            } else if (2..=4).contains(&d) {
                placer.plant.push(t);
            }
            if (3..=7).contains(&d) {
                placer.moth.push(t);
            }
            if d >= 12 {
                placer.bird.push(t);
            }
        }
        debug!(
            "Location {:02x} placement pools: {} normal, {} moth, {} bird, {} plant",
            self.id,
            placer.normal.len(),
            placer.moth.len(),
            placer.bird.len(),
            placer.plant.len()
        );
        Ok(placer)
    }
}

impl<R: Rng> MonsterPlacer<R> {
    pub fn pool(&self, placement: Placement) -> &[TileCoord] {
        match placement {
            Placement::Normal => &self.normal,
            Placement::Moth => &self.moth,
            Placement::Bird => &self.bird,
            Placement::Plant => &self.plant,
        }
    }

    /// Coordinates (in tiles) and clearance of every monster placed so far.
    pub fn placed(&self) -> &[(i64, i64, i64)] {
        &self.placed
    }

    /// Picks a random tile for `monster`, at least its clearance away from
    /// every used entrance and from every monster already placed.
    pub fn place<M: Monster + ?Sized>(&mut self, monster: &M) -> Option<TileCoord> {
        let placement = monster.placement();
        let mut pool = self.pool(placement).to_vec();
        let r = monster.clearance() as i64;
        'pool: while !pool.is_empty() {
            let i = self.rng.gen_range(0..pool.len());
            let pos = pool.remove(i);
            let (x, y) = pos.flat();
            let (x, y) = (x as i64, y as i64);
            for &(x1, y1, r1) in &self.placed {
                if (x - x1).pow(2) + (y - y1).pow(2) < (r + r1).pow(2) {
                    continue 'pool;
                }
            }
            for &(x1, y1) in &self.entrances {
                if (x - x1).pow(2) + (y - y1).pow(2) < (r + 1).pow(2) {
                    continue 'pool;
                }
            }
            self.placed.push((x, y, r));
            return Some(pos);
        }
        debug!(
            "Location {:02x}: no {placement} placement with clearance {r}",
            self.location
        );
        None
    }
}
