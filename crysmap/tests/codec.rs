use anyhow::Result;
use crysmap::catalog::Catalog;
use crysmap::location::codec::{scan_exits, ExitTerminator};
use crysmap::location::{Location, UNUSED_TILESET};
use crysmap::locations::Locations;
use crysmap::patch::FreeSpace;
use crysmap::tables::{BOSS_KILL_TABLE, BOSS_LOCATION_TABLE, BOSS_POST_TABLE};
use crysmap_game::{Exit, LocationData, Pit, Spawn};

mod common;

use common::{data, legacy_pits_rom, sample_rom, LOC};

fn fresh_space() -> FreeSpace {
    let mut space = FreeSpace::new();
    space.free(0x15000, 0x16000);
    space.free(0x1a000, 0x1b000);
    space
}

#[test]
fn test_decode_sample() -> Result<()> {
    let rom = sample_rom();
    let loc = Location::decode(&rom, LOC as isize, data("Sample"))?;
    assert!(loc.used);
    assert_eq!(loc.bgm, 0x12);
    assert_eq!((loc.width(), loc.height()), (2, 1));
    assert_eq!(loc.animation, 0x03);
    assert_eq!(loc.screens, vec![vec![0x10, 0x11]]);
    assert_eq!(loc.tile_palettes, [0x1a, 0x1b, 0x1c]);
    assert_eq!(loc.tileset, 0x80);
    assert_eq!(loc.tile_effects, 0xb3);
    assert_eq!(loc.entrances.len(), 2);
    assert_eq!(loc.entrances[1].screen(), 0x01);
    assert_eq!(loc.exits, vec![Exit::new(0x01, 0xa7, 0x04, 0x01)]);
    assert_eq!(loc.flags.len(), 1);
    assert!(loc.pits.is_empty());
    assert_eq!(loc.sprite_palettes, [0x21, 0x22]);
    assert_eq!(loc.sprite_patterns, [0x23, 0x24]);
    assert_eq!(loc.spawns, vec![Spawn::from_slice(&[0x04, 0x05, 0x00, 0x50])]);
    assert!(loc.checkpoint);
    assert!(loc.saveable);
    Ok(())
}

#[test]
fn test_legacy_layout_without_pits() -> Result<()> {
    let rom = sample_rom();
    // Layout directly after a 10-byte header; exits end in a plain $ff.
    let scan = scan_exits(&rom, 0x14800 + 10 + 7 + 7 + 8)?;
    assert_eq!(scan.terminator, ExitTerminator::Legacy);
    assert_eq!(scan.exits().len(), 1);
    let loc = Location::decode(&rom, LOC as isize, data("Sample"))?;
    assert!(loc.pits.is_empty());
    // Entrances run up to the exits.
    assert_eq!(loc.entrances.len(), 2);
    Ok(())
}

#[test]
fn test_legacy_layout_with_pits() -> Result<()> {
    let mut rom = legacy_pits_rom();
    let scan = scan_exits(&rom, 0x14800 + 10 + 7 + 7 + 8)?;
    assert_eq!(scan.terminator, ExitTerminator::Legacy);

    let loc = Location::decode(&rom, LOC as isize, data("Sample"))?;
    assert_eq!(loc.pits, vec![Pit::from_slice(&[0x01, 0x11, 0x04, 0x00])]);
    assert_eq!(loc.screens, vec![vec![0x10, 0x11]]);
    assert_eq!(loc.entrances.len(), 2);
    assert_eq!(loc.exits, vec![Exit::new(0x01, 0xa7, 0x04, 0x01)]);
    assert_eq!(loc.flags.len(), 1);

    // Rewriting switches to the tagged terminator and keeps the pit.
    let mut rewritten = loc.clone();
    rewritten.encode(&mut rom, &mut fresh_space())?;
    let scan = scan_exits(&rom, 0x15000 + 7 + 7 + 8)?;
    assert_eq!(
        scan.terminator,
        ExitTerminator::Tagged {
            has_pits: true,
            entrance_count: 2
        }
    );
    assert_eq!(Location::decode(&rom, LOC as isize, data("Sample"))?, loc);
    Ok(())
}

#[test]
fn test_round_trip() -> Result<()> {
    let mut rom = sample_rom();
    let mut loc = Location::decode(&rom, LOC as isize, data("Sample"))?;
    let original = loc.clone();
    loc.encode(&mut rom, &mut fresh_space())?;
    assert_eq!(loc, original);

    // The rewrite uses the tagged terminator: two entrances, no pits.
    let scan = scan_exits(&rom, 0x15000 + 7 + 7 + 8)?;
    assert_eq!(
        scan.terminator,
        ExitTerminator::Tagged {
            has_pits: false,
            entrance_count: 2
        }
    );
    let again = Location::decode(&rom, LOC as isize, data("Sample"))?;
    assert_eq!(again, original);
    Ok(())
}

#[test]
fn test_round_trip_with_pits() -> Result<()> {
    let mut rom = sample_rom();
    let mut loc = Location::decode(&rom, LOC as isize, data("Sample"))?;
    loc.pits.push(Pit::from_slice(&[0x01, 0x11, 0x04, 0x00]));
    loc.saveable = false;
    loc.encode(&mut rom, &mut fresh_space())?;
    let again = Location::decode(&rom, LOC as isize, data("Sample"))?;
    assert_eq!(again.pits, loc.pits);
    assert!(!again.saveable);
    assert_eq!(again, loc);
    Ok(())
}

#[test]
fn test_single_row_clamp() -> Result<()> {
    let mut rom = sample_rom();
    let mut loc = Location::decode(&rom, LOC as isize, data("Sample"))?;
    loc.entrances[0].set_y(0x00d0);
    loc.exits[0].set_yt(0x0e);
    loc.encode(&mut rom, &mut fresh_space())?;
    assert_eq!(loc.entrances[0].y(), 0x00bf);
    assert_eq!(loc.exits[0].yt(), 0x0c);
    let again = Location::decode(&rom, LOC as isize, data("Sample"))?;
    assert_eq!(again.entrances[0].y(), 0x00bf);
    assert_eq!(again.exits[0].yt(), 0x0c);

    // Clamping an already clamped location changes nothing.
    let mut twice = again.clone();
    twice.clamp_single_row();
    assert_eq!(twice, again);
    Ok(())
}

#[test]
fn test_unused_locations() -> Result<()> {
    let rom = sample_rom();
    let unnamed = Location::decode(&rom, LOC as isize, LocationData::default())?;
    assert!(!unnamed.used);
    assert_eq!(unnamed.tileset, UNUSED_TILESET);
    assert!(unnamed.exits.is_empty());

    let no_pointer = Location::decode(&rom, 0x05, data("Empty"))?;
    assert_eq!(no_pointer, Location::unused(0x05, data("Empty")));
    let negative = Location::decode(&rom, -1, data("Negative"))?;
    assert!(!negative.used);

    // Encoding an unused location leaves the ROM untouched.
    let mut rom2 = rom.clone();
    let mut unused = no_pointer.clone();
    unused.encode(&mut rom2, &mut fresh_space())?;
    assert_eq!(rom2.data, rom.data);
    Ok(())
}

#[test]
fn test_boss_restore_patch() -> Result<()> {
    let mut rom = sample_rom();
    // Boss 2 is fought at this location; its kill record sits at CPU $b000.
    rom.write_u8(BOSS_LOCATION_TABLE + 2, LOC as u8)?;
    rom.write_u16(BOSS_KILL_TABLE + 4, 0xb000)?;
    let mut loc = Location::decode(&rom, LOC as isize, data("Sample"))?;
    assert_eq!(loc.boss_id(&rom)?, Some(2));
    loc.encode(&mut rom, &mut fresh_space())?;

    let kill = 0xb000 + 0x14000;
    assert_eq!(rom.read_u8(kill + 3)?, 0x12);
    assert_eq!(rom.read_n(kill + 5, 3)?, &[0x1a, 0x1b, 0x1c]);
    assert_eq!(rom.read_u8(kill + 11)?, 0x21);
    assert_eq!(rom.read_u8(kill + 19)?, 0x03);
    assert_eq!(rom.read_u8(kill + 13)?, 0x00);
    assert_eq!(rom.read_u8(BOSS_POST_TABLE + 2 * 5)?, 0x22);
    Ok(())
}

#[test]
fn test_locations_rewrite_in_place() -> Result<()> {
    let mut rom = sample_rom();
    let catalog = Catalog::from_json(
        r#"[
            {"id": 3, "name": "Sample", "area": "Test", "music": "Test", "palette": 0},
            {"id": 4, "name": "Nowhere", "area": "Test"}
        ]"#,
    )?;
    let mut locations = Locations::load(&rom, &catalog)?;
    assert_eq!(locations.len(), 0x100);
    assert_eq!(locations.used().count(), 1);
    assert!(!locations.get(4)?.used);

    let mut space = locations.reclaim_space();
    let reclaimed = space.remaining();
    // Header, layout, graphics, entrances, exits, flags, NPC data.
    assert_eq!(reclaimed, 10 + 7 + 7 + 8 + 5 + 3 + 10);
    let before = locations.get(3)?.clone();
    locations.write(&mut rom, &mut space)?;
    assert_eq!(space.remaining(), 0);

    let reloaded = Locations::load(&rom, &catalog)?;
    assert_eq!(reloaded.get(3)?, &before);
    Ok(())
}
