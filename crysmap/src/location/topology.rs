//! Editing a location's screen grid: resizing, bulk screen writes, wiring new
//! connections between locations and moving objects between screens.

use anyhow::{anyhow, ensure, Result};
use crysmap_game::coord::MAX_SCREEN_DIM;
use crysmap_game::{Entrance, Exit, Flag, ScreenId, ALWAYS_TRUE_FLAG};
use hashbrown::HashMap;

use super::{Location, LocationError};

/// Connection data for screens that can hold an edge-of-map doorway:
/// the entrance pixel offset within the screen (yyxx) and the two exit tiles.
pub const SCREEN_EXITS: [(ScreenId, u16, [u8; 2]); 11] = [
    (0x015, 0x90a0, [0x89, 0x8a]),
    (0x019, 0x6090, [0x58, 0x59]),
    (0x096, 0x4030, [0x32, 0x33]),
    (0x097, 0xaf30, [0xb2, 0xb3]),
    (0x098, 0x40d0, [0x3c, 0x3d]),
    (0x099, 0xafd0, [0xbc, 0xbd]),
    (0x09a, 0x1f80, [0x27, 0x28]),
    (0x09e, 0xdf80, [0xe7, 0xe8]),
    (0x0c1, 0x50a0, [0x49, 0x4a]),
    (0x0c2, 0x60b0, [0x5a, 0x5b]),
    (0x19a, 0xd080, [0xc7, 0xc8]),
];

pub fn screen_exits(screen: ScreenId) -> Result<(u16, [u8; 2])> {
    SCREEN_EXITS
        .iter()
        .find(|(s, _, _)| *s == screen)
        .map(|&(_, entrance, exits)| (entrance, exits))
        .ok_or_else(|| LocationError::UnknownConnectionScreen(screen).into())
}

/// One cell of a bulk screen write.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScreenWrite {
    Skip,
    Set(ScreenId),
    /// Set the screen and mark it with an always-true flag, so that its
    /// flag-dependent tiles take their alternate form.
    SetFlagged(ScreenId),
}

impl ScreenWrite {
    /// `None` leaves the cell alone; a negative value is the complement of a
    /// screen to set with a flag.
    pub fn from_raw(raw: Option<i32>) -> Self {
        match raw {
            None => ScreenWrite::Skip,
            Some(s) if s < 0 => ScreenWrite::SetFlagged(!s as ScreenId),
            Some(s) => ScreenWrite::Set(s as ScreenId),
        }
    }
}

/// A screen position (yx) in a location's grid, optionally referring to the
/// alternate (extended bank) form of the screen found there.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScreenPos {
    pub pos: u8,
    pub alternate: bool,
}

impl ScreenPos {
    pub fn new(pos: u8) -> Self {
        ScreenPos {
            pos,
            alternate: false,
        }
    }

    pub fn alternate(pos: u8) -> Self {
        ScreenPos {
            pos,
            alternate: true,
        }
    }

    /// A negative value is the complement of an alternate position.
    pub fn from_raw(raw: i32) -> Self {
        if raw < 0 {
            ScreenPos::alternate(!raw as u8)
        } else {
            ScreenPos::new(raw as u8)
        }
    }

    pub fn row(&self) -> u16 {
        (self.pos >> 4) as u16
    }

    pub fn col(&self) -> u16 {
        (self.pos & 0xf) as u16
    }
}

/// An object on the map that can be moved to another screen.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ScreenObject {
    Spawn(usize),
    Exit(usize),
    Entrance(usize),
}

/// Snapshot of which objects sat on which screen, for moving them later
/// without the moves interfering with each other.
#[derive(Clone, Debug, Default)]
pub struct ScreenMover {
    objects: HashMap<u8, Vec<ScreenObject>>,
}

impl ScreenMover {
    /// Moves the objects that were on `orig` when the snapshot was taken.
    pub fn apply(&self, location: &mut Location, orig: u8, repl: u8) {
        let Some(objects) = self.objects.get(&orig) else {
            return;
        };
        for obj in objects {
            match *obj {
                ScreenObject::Spawn(i) => {
                    if let Some(s) = location.spawns.get_mut(i) {
                        s.set_screen(repl);
                    }
                }
                ScreenObject::Exit(i) => {
                    if let Some(e) = location.exits.get_mut(i) {
                        e.set_screen(repl);
                    }
                }
                ScreenObject::Entrance(i) => {
                    if let Some(e) = location.entrances.get_mut(i) {
                        e.set_screen(repl);
                    }
                }
            }
        }
    }
}

fn shift(value: u8, delta: isize) -> u8 {
    (value as isize + delta) as u8
}

impl Location {
    /// Grows (positive) or shrinks (negative) the grid on each side, filling
    /// new cells with `fill`. Objects keep their place relative to the
    /// screens they were on.
    pub fn resize_screens(
        &mut self,
        top: isize,
        left: isize,
        bottom: isize,
        right: isize,
        fill: ScreenId,
    ) -> Result<()> {
        let new_width = self.width() as isize + left + right;
        let new_height = self.height() as isize + top + bottom;
        let max = MAX_SCREEN_DIM as isize;
        ensure!(
            (1..=max).contains(&new_width) && (1..=max).contains(&new_height),
            "location {:02x} cannot be resized to {new_width}x{new_height}",
            self.id
        );
        let mut screens = vec![vec![fill; new_width as usize]; new_height as usize];
        for (y, row) in screens.iter_mut().enumerate() {
            let old_y = y as isize - top;
            if old_y < 0 || old_y >= self.height() as isize {
                continue;
            }
            for (x, cell) in row.iter_mut().enumerate() {
                let old_x = x as isize - left;
                if old_x < 0 || old_x >= self.width() as isize {
                    continue;
                }
                *cell = self.screens[old_y as usize][old_x as usize];
            }
        }
        self.set_width(new_width as usize);
        self.set_height(new_height as usize);
        self.screens = screens;

        for f in &mut self.flags {
            f.set_xs(shift(f.xs(), left));
            f.set_ys(shift(f.ys(), top));
        }
        for p in &mut self.pits {
            p.set_from_xs(shift(p.from_xs(), left));
            p.set_from_ys(shift(p.from_ys(), top));
        }
        for s in &mut self.spawns {
            s.set_xt(shift(s.xt(), 16 * left));
            s.set_yt(shift(s.yt(), 16 * top));
        }
        for e in &mut self.exits {
            e.set_xt(shift(e.xt(), 16 * left));
            e.set_yt(shift(e.yt(), 16 * top));
        }
        for e in self.entrances.iter_mut().filter(|e| e.used()) {
            e.set_x((e.x() as isize + 256 * left) as u16);
            e.set_y((e.y() as isize + 256 * top) as u16);
        }
        Ok(())
    }

    /// Writes a rectangle of screens with its top-left corner at `start` (yx).
    /// Nothing is written unless every cell fits.
    pub fn write_screens_2d(&mut self, start: u8, data: &[Vec<ScreenWrite>]) -> Result<()> {
        let x0 = (start & 0xf) as usize;
        let y0 = (start >> 4) as usize;
        let mut writes: Vec<(usize, usize, ScreenId, Option<Flag>)> = vec![];
        for (dy, row) in data.iter().enumerate() {
            for (dx, &cell) in row.iter().enumerate() {
                let (screen, flagged) = match cell {
                    ScreenWrite::Skip => continue,
                    ScreenWrite::Set(s) => (s, false),
                    ScreenWrite::SetFlagged(s) => (s, true),
                };
                let (y, x) = (y0 + dy, x0 + dx);
                ensure!(
                    y < self.height() && x < self.width(),
                    "screen write at ({y}, {x}) outside {}x{} location {:02x}",
                    self.height(),
                    self.width(),
                    self.id
                );
                let flag = if flagged {
                    Some(Flag::new((y << 4 | x) as u8, ALWAYS_TRUE_FLAG)?)
                } else {
                    None
                };
                writes.push((y, x, screen, flag));
            }
        }
        for (y, x, screen, flag) in writes {
            self.flags.extend(flag);
            self.screens[y][x] = screen;
        }
        Ok(())
    }

    fn connection_screen(&self, pos: ScreenPos) -> Result<(u16, [u8; 2])> {
        let screen = self.screen_at(pos.pos).ok_or_else(|| {
            anyhow!(
                "screen position {:02x} outside location {:02x}",
                pos.pos,
                self.id
            )
        })?;
        let alt: ScreenId = if pos.alternate { 0x100 } else { 0 };
        screen_exits(alt | screen)
    }

    /// Adds a two-way connection: an entrance and exits on each side, with
    /// each side's exits leading to the other side's new entrance.
    pub fn connect(&mut self, pos: ScreenPos, that: &mut Location, that_pos: ScreenPos) -> Result<()> {
        let this_id = self.rom_index()? as u8;
        let that_id = that.rom_index()? as u8;
        let (this_entrance, this_exits) = self.connection_screen(pos)?;
        let (that_entrance, that_exits) = that.connection_screen(that_pos)?;
        let this_entrance_index = self.entrances.len() as u8;
        let that_entrance_index = that.entrances.len() as u8;

        self.entrances.push(Entrance::from_xy(
            pos.col() << 8 | this_entrance & 0xff,
            pos.row() << 8 | this_entrance >> 8,
        ));
        that.entrances.push(Entrance::from_xy(
            that_pos.col() << 8 | that_entrance & 0xff,
            that_pos.row() << 8 | that_entrance >> 8,
        ));
        for tile in this_exits {
            self.exits
                .push(Exit::new(pos.pos, tile, that_id, that_entrance_index));
        }
        for tile in that_exits {
            that.exits
                .push(Exit::new(that_pos.pos, tile, this_id, this_entrance_index));
        }
        Ok(())
    }

    /// Moves every spawn, exit and entrance on screen `orig` to screen `repl`.
    pub fn move_screen(&mut self, orig: u8, repl: u8) {
        for s in self.spawns.iter_mut().filter(|s| s.screen() == orig) {
            s.set_screen(repl);
        }
        for e in self.exits.iter_mut().filter(|e| e.screen() == orig) {
            e.set_screen(repl);
        }
        for e in self.entrances.iter_mut().filter(|e| e.screen() == orig) {
            e.set_screen(repl);
        }
    }

    pub fn screen_mover(&self) -> ScreenMover {
        let mut objects: HashMap<u8, Vec<ScreenObject>> = HashMap::new();
        for (i, s) in self.spawns.iter().enumerate() {
            objects.entry(s.screen()).or_default().push(ScreenObject::Spawn(i));
        }
        for (i, e) in self.exits.iter().enumerate() {
            objects.entry(e.screen()).or_default().push(ScreenObject::Exit(i));
        }
        for (i, e) in self.entrances.iter().enumerate() {
            objects
                .entry(e.screen())
                .or_default()
                .push(ScreenObject::Entrance(i));
        }
        ScreenMover { objects }
    }
}
