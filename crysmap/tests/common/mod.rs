#![allow(dead_code)]

use crysmap::patch::Rom;
use crysmap_game::{Entrance, Exit, Flag, LocationData, Pit, ALWAYS_TRUE_FLAG};

pub const LOC: usize = 0x03;

pub fn data(name: &str) -> LocationData {
    LocationData {
        name: name.to_string(),
        area: "Test".to_string(),
        ..Default::default()
    }
}

pub fn cpu(addr: usize, addend: usize) -> u16 {
    (addr - addend) as u16
}

/// A 2x1 map with two entrances, one exit, one flag and one spawn, stored
/// in the older layout (no tagged terminator).
pub fn sample_rom() -> Rom {
    let mut rom = Rom::new(vec![0; 0x40000]);
    let base = 0x14800;
    let layout = base + 10;
    let graphics = layout + 7;
    let entrances = graphics + 7;
    let exits = entrances + 8;
    let flags = exits + 5;

    rom.write_u16(0x14300 + 2 * LOC, cpu(base, 0xc000)).unwrap();
    for (i, addr) in [layout, graphics, entrances, exits, flags].iter().enumerate() {
        rom.write_u16(base + 2 * i, cpu(*addr, 0xc000)).unwrap();
    }
    rom.write_n(layout, &[0x12, 0x01, 0x00, 0x03, 0x00, 0x10, 0x11])
        .unwrap();
    rom.write_n(graphics, &[0x1a, 0x1b, 0x1c, 0x80, 0xb3, 0x02, 0x04])
        .unwrap();
    rom.write_n(entrances, &Entrance::from_xy(0x0078, 0x0080).data)
        .unwrap();
    rom.write_n(entrances + 4, &Entrance::from_xy(0x0178, 0x0080).data)
        .unwrap();
    rom.write_n(exits, &Exit::new(0x01, 0xa7, 0x04, 0x01).data)
        .unwrap();
    rom.write_u8(exits + 4, 0xff).unwrap();
    rom.write_n(flags, &Flag::new(0x01, ALWAYS_TRUE_FLAG).unwrap().data)
        .unwrap();
    rom.write_u8(flags + 2, 0xff).unwrap();

    let npc = 0x19800;
    rom.write_u16(0x19201 + 2 * LOC, cpu(npc, 0x10000)).unwrap();
    rom.write_n(npc, &[0x00, 0x21, 0x22, 0x23, 0x24, 0x04, 0x05, 0x00, 0x50, 0xff])
        .unwrap();
    rom.write_u8(0x2ff00 + LOC, 0x81).unwrap();
    rom
}

/// The sample location re-pointed at a 12-byte header whose layout follows
/// the pits pointer, as older records with pits were stored. The exit list
/// still ends in a plain $ff.
pub fn legacy_pits_rom() -> Rom {
    let mut rom = sample_rom();
    let old = 0x14800;
    let base = 0x14900;
    let layout = base + 12;
    let pits = layout + 7;

    let layout_bytes = rom.read_n(old + 10, 7).unwrap().to_vec();
    rom.write_n(layout, &layout_bytes).unwrap();
    rom.write_u16(base, cpu(layout, 0xc000)).unwrap();
    for i in 1..5 {
        let ptr = rom.read_u16(old + 2 * i).unwrap();
        rom.write_u16(base + 2 * i, ptr).unwrap();
    }
    rom.write_u16(base + 10, cpu(pits, 0xc000)).unwrap();
    rom.write_n(pits, &Pit::from_slice(&[0x01, 0x11, 0x04, 0x00]).data)
        .unwrap();
    rom.write_u8(pits + 4, 0xff).unwrap();
    rom.write_u16(0x14300 + 2 * LOC, cpu(base, 0xc000)).unwrap();
    rom
}
