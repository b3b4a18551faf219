//! Fixed-size records stored in a location's map and NPC data.
//!
//! Each record keeps its raw bytes; accessors decode bit fields and setters
//! write them back under the same mask, leaving unrelated bits untouched.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Formatter};

pub const ALWAYS_TRUE_FLAG: u16 = 0x2f0;

fn set_bits(byte: &mut u8, mask: u8, value: u8) {
    *byte = (*byte & !mask) | (value & mask);
}

fn copy_record<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut data = [0u8; N];
    data.copy_from_slice(&bytes[..N]);
    data
}

/// A single screen entrance coordinate.
///
/// Byte layout `xlo xhi ylo yhi`, where each low byte is a pixel position
/// within the screen and each high byte is the screen index on that axis.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Entrance {
    pub data: [u8; 4],
}

impl Entrance {
    pub const SIZE: usize = 4;

    pub fn from_slice(bytes: &[u8]) -> Self {
        Entrance {
            data: copy_record(bytes),
        }
    }

    pub fn from_xy(x: u16, y: u16) -> Self {
        let mut e = Entrance::default();
        e.set_x(x);
        e.set_y(y);
        e
    }

    pub fn from_screen_coord(screen: u8, coord: u16) -> Self {
        let mut e = Entrance::default();
        e.set_screen(screen);
        e.set_coord(coord);
        e
    }

    /// Full x-coordinate in pixels.
    pub fn x(&self) -> u16 {
        self.data[0] as u16 | (self.data[1] as u16) << 8
    }

    pub fn set_x(&mut self, x: u16) {
        self.data[0] = (x & 0xff) as u8;
        self.data[1] = (x >> 8) as u8;
    }

    /// Full y-coordinate in pixels.
    pub fn y(&self) -> u16 {
        self.data[2] as u16 | (self.data[3] as u16) << 8
    }

    pub fn set_y(&mut self, y: u16) {
        self.data[2] = (y & 0xff) as u8;
        self.data[3] = (y >> 8) as u8;
    }

    /// Screen (yx).
    pub fn screen(&self) -> u8 {
        (self.data[3] & 0x0f) << 4 | (self.data[1] & 0x0f)
    }

    pub fn set_screen(&mut self, screen: u8) {
        set_bits(&mut self.data[3], 0x0f, screen >> 4);
        set_bits(&mut self.data[1], 0x0f, screen);
    }

    /// Tile within the screen (yx).
    pub fn tile(&self) -> u8 {
        (self.data[2] & 0xf0) | (self.data[0] & 0xf0) >> 4
    }

    pub fn set_tile(&mut self, tile: u8) {
        set_bits(&mut self.data[2], 0xf0, tile);
        set_bits(&mut self.data[0], 0xf0, tile << 4);
    }

    /// Pixel coordinate within the screen (yyxx).
    pub fn coord(&self) -> u16 {
        (self.data[2] as u16) << 8 | self.data[0] as u16
    }

    pub fn set_coord(&mut self, coord: u16) {
        self.data[2] = (coord >> 8) as u8;
        self.data[0] = (coord & 0xff) as u8;
    }

    /// Entrances are disabled by setting their x to `ff__`.
    pub fn used(&self) -> bool {
        self.data[1] < 0x08
    }
}

impl Debug for Entrance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Entrance {:02x?}: ({:04x}, {:04x})",
            self.data,
            self.y(),
            self.x()
        )
    }
}

/// A single screen exit tile.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Exit {
    pub data: [u8; 4],
}

impl Exit {
    pub const SIZE: usize = 4;

    pub fn from_slice(bytes: &[u8]) -> Self {
        Exit {
            data: copy_record(bytes),
        }
    }

    pub fn new(screen: u8, tile: u8, dest: u8, entrance: u8) -> Self {
        let mut e = Exit::default();
        e.set_screen(screen);
        e.set_tile(tile);
        e.set_dest(dest);
        e.set_entrance(entrance);
        e
    }

    /// x-coordinate of the exit tile, in tiles across the whole map.
    pub fn xt(&self) -> u8 {
        self.data[0]
    }

    pub fn set_xt(&mut self, xt: u8) {
        self.data[0] = xt;
    }

    /// y-coordinate of the exit tile (screen nibble, tile nibble).
    pub fn yt(&self) -> u8 {
        self.data[1]
    }

    pub fn set_yt(&mut self, yt: u8) {
        self.data[1] = yt;
    }

    /// x-coordinate of the exit pixel (low 4 bits always zero).
    pub fn x(&self) -> u16 {
        (self.data[0] as u16) << 4
    }

    /// y-coordinate of the exit pixel (low 4 bits always zero).
    pub fn y(&self) -> u16 {
        (self.data[1] as u16) << 4
    }

    pub fn screen(&self) -> u8 {
        (self.data[1] & 0xf0) | (self.data[0] & 0xf0) >> 4
    }

    pub fn set_screen(&mut self, screen: u8) {
        set_bits(&mut self.data[1], 0xf0, screen);
        set_bits(&mut self.data[0], 0xf0, screen << 4);
    }

    pub fn tile(&self) -> u8 {
        (self.data[1] & 0x0f) << 4 | (self.data[0] & 0x0f)
    }

    pub fn set_tile(&mut self, tile: u8) {
        set_bits(&mut self.data[1], 0x0f, tile >> 4);
        set_bits(&mut self.data[0], 0x0f, tile);
    }

    pub fn dest(&self) -> u8 {
        self.data[2]
    }

    pub fn set_dest(&mut self, dest: u8) {
        self.data[2] = dest;
    }

    pub fn entrance(&self) -> u8 {
        self.data[3]
    }

    pub fn set_entrance(&mut self, entrance: u8) {
        self.data[3] = entrance;
    }

    pub fn is_seamless(&self) -> bool {
        self.data[3] & 0x20 != 0
    }
}

impl Debug for Exit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Exit {:02x?}: ({:04x}, {:04x}) => {:02x}:{}",
            self.data,
            self.y(),
            self.x(),
            self.dest(),
            self.entrance()
        )
    }
}

/// Mapping from screen position to flag ID.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Flag {
    pub data: [u8; 2],
}

impl Flag {
    pub const SIZE: usize = 2;

    pub fn from_slice(bytes: &[u8]) -> Self {
        Flag {
            data: copy_record(bytes),
        }
    }

    pub fn new(screen: u8, flag: u16) -> Result<Self> {
        let mut f = Flag::default();
        f.set_screen(screen);
        f.set_flag(flag)?;
        Ok(f)
    }

    /// Mapped flag, always between $200 and $2ff.
    pub fn flag(&self) -> u16 {
        self.data[0] as u16 | 0x200
    }

    pub fn set_flag(&mut self, flag: u16) -> Result<()> {
        ensure!(flag & !0xff == 0x200, "bad flag: {flag:03x}");
        self.data[0] = (flag & 0xff) as u8;
        Ok(())
    }

    pub fn screen(&self) -> u8 {
        self.data[1]
    }

    pub fn set_screen(&mut self, screen: u8) {
        self.data[1] = screen;
    }

    pub fn xs(&self) -> u8 {
        self.data[1] & 0x07
    }

    pub fn set_xs(&mut self, xs: u8) {
        set_bits(&mut self.data[1], 0x07, xs);
    }

    pub fn ys(&self) -> u8 {
        self.data[1] >> 4
    }

    pub fn set_ys(&mut self, ys: u8) {
        set_bits(&mut self.data[1], 0xf0, ys << 4);
    }
}

impl Debug for Flag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Flag {:02x?}: {:02x} @ {:03x}",
            self.data,
            self.screen(),
            self.flag()
        )
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pit {
    pub data: [u8; 4],
}

impl Pit {
    pub const SIZE: usize = 4;

    pub fn from_slice(bytes: &[u8]) -> Self {
        Pit {
            data: copy_record(bytes),
        }
    }

    /// Location ID of destination.
    pub fn dest(&self) -> u8 {
        self.data[0]
    }

    pub fn from_xs(&self) -> u8 {
        (self.data[1] & 0x70) >> 4
    }

    pub fn set_from_xs(&mut self, xs: u8) {
        set_bits(&mut self.data[1], 0x70, xs << 4);
    }

    pub fn to_xs(&self) -> u8 {
        self.data[1] & 0x07
    }

    pub fn from_ys(&self) -> u8 {
        self.data[3] >> 4
    }

    pub fn set_from_ys(&mut self, ys: u8) {
        set_bits(&mut self.data[3], 0xf0, ys << 4);
    }

    pub fn to_ys(&self) -> u8 {
        self.data[3] & 0x0f
    }

    pub fn from_screen(&self) -> u8 {
        self.from_ys() << 4 | self.from_xs()
    }

    pub fn to_screen(&self) -> u8 {
        self.to_ys() << 4 | self.to_xs()
    }
}

impl Debug for Pit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pit {:02x?}: ({:x}, {:x}) => {:02x}:({:x}, {:x})",
            self.data,
            self.from_xs(),
            self.from_ys(),
            self.dest(),
            self.to_xs(),
            self.to_ys()
        )
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Spawn {
    pub data: [u8; 4],
}

impl Spawn {
    pub const SIZE: usize = 4;

    pub fn from_slice(bytes: &[u8]) -> Self {
        Spawn {
            data: copy_record(bytes),
        }
    }

    /// y-coordinate of spawn tile (screen nibble, tile nibble).
    pub fn yt(&self) -> u8 {
        self.data[0]
    }

    pub fn set_yt(&mut self, yt: u8) {
        self.data[0] = yt;
    }

    pub fn y(&self) -> u16 {
        (self.data[0] as u16) << 4
    }

    /// 7-bit x-coordinate of spawn tile.
    pub fn xt(&self) -> u8 {
        self.data[1] & 0x7f
    }

    pub fn set_xt(&mut self, xt: u8) {
        set_bits(&mut self.data[1], 0x7f, xt);
    }

    pub fn x(&self) -> u16 {
        (self.xt() as u16) << 4 | ((self.data[2] & 0x40) >> 3) as u16
    }

    /// Timed respawn, as opposed to initial spawn.
    pub fn timed(&self) -> bool {
        self.data[1] & 0x80 != 0
    }

    pub fn screen(&self) -> u8 {
        (self.data[0] & 0xf0) | (self.data[1] & 0x70) >> 4
    }

    pub fn set_screen(&mut self, screen: u8) {
        set_bits(&mut self.data[0], 0xf0, screen);
        set_bits(&mut self.data[1], 0x70, screen << 4);
    }

    pub fn tile(&self) -> u8 {
        (self.data[0] & 0x0f) << 4 | (self.data[1] & 0x0f)
    }

    pub fn spawn_type(&self) -> u8 {
        self.data[2] & 0x07
    }

    pub fn id(&self) -> u8 {
        self.data[3]
    }

    pub fn pattern_bank(&self) -> u8 {
        self.data[2] >> 7
    }

    /// Inactive spawns are marked by $fe in the first byte.
    pub fn used(&self) -> bool {
        self.data[0] != 0xfe
    }

    pub fn set_used(&mut self, used: bool) {
        self.data[0] = if used { 0 } else { 0xfe };
    }

    /// Serialized form; unused spawns carry no data.
    pub fn bytes(&self) -> [u8; 4] {
        if self.used() {
            self.data
        } else {
            [0xfe, 0, 0, 0]
        }
    }

    /// Object ID of monster spawn (shifted by $50 from ID).
    pub fn monster_id(&self) -> u8 {
        self.id().wrapping_add(0x50)
    }

    pub fn is_chest(&self) -> bool {
        self.spawn_type() == 2 && self.id() < 0x80
    }

    pub fn is_trigger(&self) -> bool {
        self.spawn_type() == 2 && self.id() >= 0x80
    }

    pub fn is_npc(&self) -> bool {
        self.spawn_type() == 1 && self.id() < 0xc0
    }

    pub fn is_boss(&self) -> bool {
        self.spawn_type() == 1 && self.id() >= 0xc0
    }

    pub fn is_monster(&self) -> bool {
        self.spawn_type() == 0
    }

    pub fn is_wall(&self) -> bool {
        self.spawn_type() == 3 && (self.id() < 4 || self.data[2] & 0x20 != 0)
    }
}

impl Debug for Spawn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Spawn {:02x?}: ({:03x}, {:03x}) {} {}:{:02x}",
            self.data,
            self.x(),
            self.y(),
            if self.timed() { "timed" } else { "fixed" },
            self.spawn_type(),
            self.id()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entrance_fields() {
        let e = Entrance::from_slice(&[0x78, 0x02, 0x98, 0x01]);
        assert_eq!(e.x(), 0x0278);
        assert_eq!(e.y(), 0x0198);
        assert_eq!(e.screen(), 0x12);
        assert_eq!(e.tile(), 0x97);
        assert_eq!(e.coord(), 0x9878);
        assert!(e.used());
        assert!(!Entrance::from_slice(&[0, 0xff, 0, 0]).used());

        let e2 = Entrance::from_screen_coord(0x12, 0x9878);
        assert_eq!(e2.screen(), 0x12);
        assert_eq!(e2.tile(), 0x97);
    }

    #[test]
    fn test_exit_fields() {
        let mut e = Exit::from_slice(&[0x27, 0x4c, 0x03, 0x01]);
        assert_eq!(e.screen(), 0x42);
        assert_eq!(e.tile(), 0xc7);
        assert_eq!(e.dest(), 3);
        assert_eq!(e.entrance(), 1);
        e.set_screen(0x13);
        assert_eq!(e.screen(), 0x13);
        assert_eq!(e.tile(), 0xc7);
        assert_eq!(Exit::new(0x13, 0xc7, 3, 1).data, e.data);
    }

    #[test]
    fn test_flag_bounds() {
        let f = Flag::new(0x21, ALWAYS_TRUE_FLAG).unwrap();
        assert_eq!(f.flag(), 0x2f0);
        assert_eq!(f.xs(), 1);
        assert_eq!(f.ys(), 2);
        assert!(Flag::new(0x21, 0x1f0).is_err());
    }

    #[test]
    fn test_spawn_fields() {
        let mut s = Spawn::from_slice(&[0x2a, 0x35, 0x40, 0x10]);
        assert_eq!(s.screen(), 0x23);
        assert_eq!(s.tile(), 0xa5);
        assert_eq!(s.x(), 0x358);
        assert!(s.is_monster());
        s.set_screen(0x01);
        assert_eq!(s.screen(), 0x01);
        assert_eq!(s.tile(), 0xa5);
        s.set_used(false);
        assert_eq!(s.bytes(), [0xfe, 0, 0, 0]);
    }

    #[test]
    fn test_pit_fields() {
        let p = Pit::from_slice(&[0x05, 0x31, 0x00, 0x42]);
        assert_eq!(p.from_xs(), 3);
        assert_eq!(p.to_xs(), 1);
        assert_eq!(p.from_ys(), 4);
        assert_eq!(p.to_ys(), 2);
        assert_eq!(p.from_screen(), 0x43);
        assert_eq!(p.to_screen(), 0x21);
    }
}
