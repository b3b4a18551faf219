use anyhow::Result;
use crysmap::location::Location;
use crysmap::patch::Rom;
use crysmap::tables::{screen_addr, tile_effects_addr, tileset_alternates_addr};
use crysmap_game::{Entrance, Exit, LocationData, MonsterSpec, Placement, TileCoord};
use hashbrown::HashSet;
use rand::rngs::StdRng;
use rand::SeedableRng;

const ROCK: u8 = 0x03;
const WATER: u8 = 0x02;

/// A 2x1 map: screen $11 has a river down column 8, screen $10 a rock wall
/// down column 8.
fn setup() -> (Rom, Location) {
    let mut rom = Rom::new(vec![0; 0x40000]);
    rom.write_u8(tile_effects_addr(0xb3) + ROCK as usize, 0x06).unwrap();
    rom.write_u8(tile_effects_addr(0xb3) + WATER as usize, 0x02).unwrap();
    for t in 0..0x20u8 {
        rom.write_u8(tileset_alternates_addr(0x80) + t as usize, t).unwrap();
    }
    let mut wall = vec![0; 0xf0];
    let mut river = vec![0; 0xf0];
    for row in 0..15 {
        wall[row * 16 + 8] = ROCK;
        river[row * 16 + 8] = WATER;
    }
    rom.write_n(screen_addr(0x10), &wall).unwrap();
    rom.write_n(screen_addr(0x11), &river).unwrap();

    let mut loc = Location::unused(
        0x09,
        LocationData {
            name: "Field".to_string(),
            ..Default::default()
        },
    );
    loc.used = true;
    loc.set_width(2);
    loc.screens = vec![vec![0x11, 0x10]];
    loc.entrances.push(Entrance::from_xy(0x0028, 0x0078));
    loc.exits.push(Exit::new(0x00, 0xe0, 0x0a, 0x00));
    (rom, loc)
}

#[test]
fn test_reachable_region() -> Result<()> {
    let (rom, loc) = setup();
    let walk = loc.reachable_tiles(&rom, false)?;
    let fly = loc.reachable_tiles(&rom, true)?;
    assert!(!walk.is_empty());
    assert!(walk.keys().all(|t| fly.contains_key(t)));
    assert_eq!(walk.len(), 8 * 15 - 1);
    assert!(walk.contains_key(&TileCoord::new(0x00, 0x72)));
    assert!(!walk.contains_key(&TileCoord::new(0x00, 0x79)));
    // The exit tile itself is never reachable.
    assert!(!walk.contains_key(&TileCoord::new(0x00, 0xe0)));
    // Flying crosses the river but not the rock wall.
    assert!(fly.contains_key(&TileCoord::new(0x00, 0x79)));
    assert!(fly.contains_key(&TileCoord::new(0x01, 0x75)));
    assert!(!fly.contains_key(&TileCoord::new(0x01, 0x79)));
    Ok(())
}

#[test]
fn test_placements_respect_pools() -> Result<()> {
    let (rom, loc) = setup();
    let reachable = loc.reachable_tiles(&rom, false)?;
    let mut placer = loc.monster_placer(&rom, StdRng::seed_from_u64(42))?;
    let moth: HashSet<TileCoord> = placer.pool(Placement::Moth).iter().copied().collect();

    let mut placed = vec![];
    for (placement, clearance) in [
        (Placement::Normal, 2),
        (Placement::Moth, 1),
        (Placement::Normal, 3),
        (Placement::Moth, 2),
    ] {
        if let Some(t) = placer.place(&MonsterSpec {
            placement,
            clearance,
        }) {
            placed.push((placement, t));
        }
    }
    assert!(!placed.is_empty());
    for (placement, t) in placed {
        match placement {
            Placement::Normal => assert!(reachable.contains_key(&t)),
            Placement::Moth => {
                assert!(moth.contains(&t));
                assert!(!reachable.contains_key(&t));
            }
            _ => unreachable!(),
        }
    }
    Ok(())
}
