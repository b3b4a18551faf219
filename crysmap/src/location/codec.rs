//! Binary format of a location's map data and NPC data.
//!
//! Map data is a header of little-endian pointers (layout, graphics,
//! entrances, exits, flags and optionally pits) followed by the regions they
//! point at. Whether the pits pointer exists, and how many entrances there
//! are, is recorded in the byte terminating the exits list.

use anyhow::Result;
use crysmap_game::util::hex_bytes;
use crysmap_game::{
    Entrance, Exit, Flag, LocationData, LocationId, PcAddr, Pit, Spawn, LOCATION_CRYPT_DRAYGON2,
    LOCATION_DYNA,
};
use log::debug;

use super::{Location, LocationError, MAP_DATA_ADDEND, NPC_DATA_ADDEND};
use crate::patch::{FreeSpace, Rom, MAP_DATA_WINDOW, NPC_DATA_WINDOW};
use crate::tables::{GraphicsTables, BOSS_KILL_BANK_OFFSET, BOSS_KILL_RECORD_SIZE};

pub type Span = (PcAddr, PcAddr); // [start, end) of PRG bytes read while decoding

const RECORD_TERMINATOR: u8 = 0xff;
const DISABLED_EXIT_DEST: u8 = 0xff;
const MAX_ENTRANCES: usize = 0x1f;
const HEADER_LEN: usize = 10;
const LAYOUT_HEADER_LEN: usize = 5;
const GRAPHICS_LEN: usize = 7;
const NPC_HEADER_LEN: usize = 5;
const SINGLE_ROW_MAX_ENTRANCE_Y: u16 = 0xbf;
const SINGLE_ROW_MAX_EXIT_YT: u8 = 0x0c;

const CRYPT_DRAYGON2_SPRITE_PATTERNS: [u8; 2] = [0x53, 0x50];

/// A record in the exits list as stored in ROM.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitSlot {
    Active(Exit),
    /// Placeholder with destination $ff; takes up space but is not an exit.
    Disabled,
}

impl ExitSlot {
    pub fn from_slice(bytes: &[u8]) -> Self {
        if bytes[2] == DISABLED_EXIT_DEST {
            ExitSlot::Disabled
        } else {
            ExitSlot::Active(Exit::from_slice(bytes))
        }
    }
}

/// The byte ending the exits list.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitTerminator {
    /// Plain $ff: the header layout decides whether there are pits, and the
    /// entrances run up to the exits.
    Legacy,
    Tagged {
        has_pits: bool,
        entrance_count: usize,
    },
}

impl ExitTerminator {
    pub fn from_byte(b: u8) -> Self {
        if b == RECORD_TERMINATOR {
            ExitTerminator::Legacy
        } else {
            ExitTerminator::Tagged {
                has_pits: b & 0x40 != 0,
                entrance_count: (b & 0x1f) as usize,
            }
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            ExitTerminator::Legacy => RECORD_TERMINATOR,
            ExitTerminator::Tagged {
                has_pits,
                entrance_count,
            } => {
                let pits = if has_pits { 0x40 } else { 0 };
                0x80 | pits | (entrance_count as u8 & 0x1f)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExitScan {
    pub slots: Vec<ExitSlot>,
    pub terminator: ExitTerminator,
    pub end: PcAddr, // one past the terminator
}

impl ExitScan {
    pub fn exits(&self) -> Vec<Exit> {
        self.slots
            .iter()
            .filter_map(|s| match s {
                ExitSlot::Active(e) => Some(*e),
                ExitSlot::Disabled => None,
            })
            .collect()
    }
}

/// Reads exit records starting at `addr` until a byte with the top bit set.
pub fn scan_exits(rom: &Rom, addr: PcAddr) -> Result<ExitScan> {
    let mut slots = vec![];
    let mut i = addr;
    while rom.read_u8(i)? & 0x80 == 0 {
        slots.push(ExitSlot::from_slice(rom.read_n(i, Exit::SIZE)?));
        i += Exit::SIZE;
    }
    Ok(ExitScan {
        slots,
        terminator: ExitTerminator::from_byte(rom.read_u8(i)?),
        end: i + 1,
    })
}

/// Reads fixed-size records until a $ff byte. Returns the records and the
/// address one past the terminator.
fn read_terminated<T>(
    rom: &Rom,
    addr: PcAddr,
    size: usize,
    parse: impl Fn(&[u8]) -> T,
) -> Result<(Vec<T>, PcAddr)> {
    let mut out = vec![];
    let mut i = addr;
    while rom.read_u8(i)? != RECORD_TERMINATOR {
        out.push(parse(rom.read_n(i, size)?));
        i += size;
    }
    Ok((out, i + 1))
}

/// A byte of a boss's kill-data record: either restored from this location
/// after the fight, or left as is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RestoreByte {
    Skip,
    Set(u8),
}

impl Location {
    pub fn decode(rom: &Rom, id: LocationId, data: LocationData) -> Result<Location> {
        Ok(Location::decode_with_spans(rom, id, data)?.0)
    }

    /// Decodes a location, also returning every PRG span its records occupy.
    pub fn decode_with_spans(
        rom: &Rom,
        id: LocationId,
        data: LocationData,
    ) -> Result<(Location, Vec<Span>)> {
        if id < 0 {
            return Ok((Location::unused(id, data), vec![]));
        }
        let mut loc = Location::unused(id, data);
        let map_ptr = rom.read_u16(loc.map_data_pointer()?)?;
        if map_ptr == 0 || loc.data.name.is_empty() {
            return Ok((loc, vec![]));
        }
        loc.used = true;
        let mut spans: Vec<Span> = vec![];

        let base = map_ptr as PcAddr + MAP_DATA_ADDEND;
        let read_ptr = |offset: usize| -> Result<PcAddr> {
            Ok(rom.read_u16(base + offset)? as PcAddr + MAP_DATA_ADDEND)
        };
        let layout = read_ptr(0)?;
        let graphics = read_ptr(2)?;
        let entrances = read_ptr(4)?;
        let exits = read_ptr(6)?;
        let flags = read_ptr(8)?;

        let mut has_pits = layout != base + HEADER_LEN;
        let mut entrance_len = exits.saturating_sub(entrances);
        let scan = scan_exits(rom, exits)?;
        if let ExitTerminator::Tagged {
            has_pits: tagged_pits,
            entrance_count,
        } = scan.terminator
        {
            has_pits = tagged_pits;
            entrance_len = entrance_count * Entrance::SIZE;
        }
        loc.exits = scan.exits();
        spans.push((exits, scan.end));
        spans.push((base, base + HEADER_LEN + if has_pits { 2 } else { 0 }));

        let layout_bytes = rom.read_n(layout, LAYOUT_HEADER_LEN)?;
        loc.bgm = layout_bytes[0];
        loc.original_bgm = layout_bytes[0];
        loc.layout_width = layout_bytes[1];
        loc.layout_height = layout_bytes[2];
        loc.animation = layout_bytes[3];
        let extended: u16 = if layout_bytes[4] != 0 { 0x100 } else { 0 };
        let (width, height) = (loc.width(), loc.height());
        let screens = rom.read_n(layout + LAYOUT_HEADER_LEN, width * height)?;
        loc.screens = screens
            .chunks(width)
            .map(|row| row.iter().map(|&s| extended | s as u16).collect())
            .collect();
        spans.push((layout, layout + LAYOUT_HEADER_LEN + width * height));

        let gfx = rom.read_n(graphics, GRAPHICS_LEN)?;
        loc.tile_palettes = [gfx[0], gfx[1], gfx[2]];
        loc.original_tile_palettes = loc.tile_palettes;
        loc.tileset = gfx[3];
        loc.tile_effects = gfx[4];
        loc.tile_patterns = [gfx[5], gfx[6]];
        spans.push((graphics, graphics + GRAPHICS_LEN));

        loc.entrances = rom
            .read_n(entrances, entrance_len)?
            .chunks_exact(Entrance::SIZE)
            .map(Entrance::from_slice)
            .collect();
        spans.push((entrances, entrances + entrance_len));

        let (flag_list, flags_end) = read_terminated(rom, flags, Flag::SIZE, Flag::from_slice)?;
        loc.flags = flag_list;
        spans.push((flags, flags_end));

        if has_pits {
            let pits = read_ptr(HEADER_LEN)?;
            let (pit_list, pits_end) = read_terminated(rom, pits, Pit::SIZE, Pit::from_slice)?;
            loc.pits = pit_list;
            spans.push((pits, pits_end));
        }

        let npc_ptr = rom.read_u16(loc.npc_data_pointer()?)?;
        if npc_ptr != 0 {
            let npc = npc_ptr as PcAddr + NPC_DATA_ADDEND;
            let header = rom.read_n(npc, NPC_HEADER_LEN)?;
            loc.sprite_palettes = [header[1], header[2]];
            loc.sprite_patterns = [header[3], header[4]];
            let (spawns, npc_end) =
                read_terminated(rom, npc + NPC_HEADER_LEN, Spawn::SIZE, Spawn::from_slice)?;
            loc.spawns = spawns;
            spans.push((npc, npc_end));
        }

        let save_flags = rom.read_u8(loc.save_flags_addr()?)?;
        loc.checkpoint = save_flags & 0x80 != 0;
        loc.saveable = save_flags & 0x01 != 0;

        debug!(
            "Decoded location {:02x} ({}): {}x{}, {} entrances, {} exits, {} flags, {} pits, {} spawns",
            id,
            loc.name(),
            width,
            height,
            loc.entrances.len(),
            loc.exits.len(),
            loc.flags.len(),
            loc.pits.len(),
            loc.spawns.len()
        );
        Ok((loc, spans))
    }

    /// Keeps entrances and exits out from under the HUD on single-row maps.
    pub fn clamp_single_row(&mut self) {
        if self.height() != 1 {
            return;
        }
        for entrance in self.entrances.iter_mut().filter(|e| e.used()) {
            if entrance.y() > SINGLE_ROW_MAX_ENTRANCE_Y {
                entrance.set_y(SINGLE_ROW_MAX_ENTRANCE_Y);
            }
        }
        for exit in &mut self.exits {
            if exit.yt() > SINGLE_ROW_MAX_EXIT_YT {
                exit.set_yt(SINGLE_ROW_MAX_EXIT_YT);
            }
        }
    }

    /// Sprite palettes and patterns as written to ROM; locations without
    /// spawns store $ff sentinels.
    pub fn emitted_sprite_data(&self) -> ([u8; 2], [u8; 2]) {
        if self.spawns.is_empty() {
            ([0xff, 0xff], [0xff, 0xff])
        } else {
            (self.sprite_palettes, self.sprite_patterns)
        }
    }

    pub fn exit_terminator(&self) -> ExitTerminator {
        ExitTerminator::Tagged {
            has_pits: !self.pits.is_empty(),
            entrance_count: self.entrances.len(),
        }
    }

    pub fn npc_bytes(&self) -> Vec<u8> {
        let (pal, pat) = self.emitted_sprite_data();
        let mut out = vec![0, pal[0], pal[1], pat[0], pat[1]];
        for spawn in &self.spawns {
            out.extend(spawn.bytes());
        }
        out.push(RECORD_TERMINATOR);
        out
    }

    pub fn layout_bytes(&self) -> Result<Vec<u8>> {
        let page = self.screen_page()?;
        let mut out = vec![
            self.bgm,
            self.layout_width,
            self.layout_height,
            self.animation,
            if page != 0 { 0x80 } else { 0 },
        ];
        out.extend(self.screens.iter().flatten().map(|&s| (s & 0xff) as u8));
        Ok(out)
    }

    pub fn graphics_bytes(&self) -> Vec<u8> {
        let mut out = self.tile_palettes.to_vec();
        out.push(self.tileset);
        out.push(self.tile_effects);
        out.extend(self.tile_patterns);
        out
    }

    /// Restore values for the boss's kill-data record, slot by slot.
    pub fn boss_restore(&self) -> [RestoreByte; BOSS_KILL_RECORD_SIZE] {
        let mut out = [RestoreByte::Skip; BOSS_KILL_RECORD_SIZE];
        let restore_bgm = if self.id == LOCATION_CRYPT_DRAYGON2 {
            0
        } else {
            self.bgm
        };
        out[3] = RestoreByte::Set(restore_bgm);
        for i in 0..3 {
            out[5 + i] = RestoreByte::Set(self.tile_palettes[i]);
        }
        out[11] = RestoreByte::Set(self.sprite_palettes[0]);
        if self.id == LOCATION_CRYPT_DRAYGON2 {
            out[17] = RestoreByte::Set(CRYPT_DRAYGON2_SPRITE_PATTERNS[0]);
            out[18] = RestoreByte::Set(CRYPT_DRAYGON2_SPRITE_PATTERNS[1]);
        }
        out[19] = RestoreByte::Set(self.animation);
        out
    }

    fn write_boss_patch(&self, rom: &mut Rom) -> Result<()> {
        let Some(boss) = self.boss_id(rom)? else {
            return Ok(());
        };
        if self.id == LOCATION_DYNA {
            return Ok(());
        }
        let kill_base = GraphicsTables::new(rom).boss_kill_base(boss)?;
        if kill_base == 0 {
            debug!(
                "Location {:02x}: boss {boss} has no kill data, skipping restore patch",
                self.id
            );
            return Ok(());
        }
        let base = kill_base as PcAddr + BOSS_KILL_BANK_OFFSET;
        for (j, b) in self.boss_restore().iter().enumerate() {
            if let RestoreByte::Set(x) = b {
                rom.write_u8(base + j, *x)?;
            }
        }
        let (sprite_pal, _) = self.emitted_sprite_data();
        rom.write_u8(GraphicsTables::boss_post_addr(boss), sprite_pal[1])?;
        Ok(())
    }

    /// Writes this location's map data, NPC data, save flags and boss restore
    /// patch, allocating from `space`. Unused locations are left alone.
    pub fn encode(&mut self, rom: &mut Rom, space: &mut FreeSpace) -> Result<()> {
        if !self.used {
            return Ok(());
        }
        if self.entrances.len() > MAX_ENTRANCES {
            return Err(LocationError::TooManyEntrances {
                location: self.id,
                count: self.entrances.len(),
            }
            .into());
        }
        let layout = self.layout_bytes()?;
        self.clamp_single_row();

        // Every region is placed before any pointer changes, so running out
        // of space leaves the old record reachable.
        let npc_addr = space.write(rom, &self.npc_bytes(), NPC_DATA_WINDOW)?;

        let mut exits: Vec<u8> = self.exits.iter().flat_map(|e| e.data).collect();
        exits.push(self.exit_terminator().to_byte());
        let mut flags: Vec<u8> = self.flags.iter().flat_map(|f| f.data).collect();
        flags.push(RECORD_TERMINATOR);
        let entrances: Vec<u8> = self.entrances.iter().flat_map(|e| e.data).collect();

        let mut regions = vec![layout, self.graphics_bytes(), entrances, exits, flags];
        if !self.pits.is_empty() {
            let mut pits: Vec<u8> = self.pits.iter().flat_map(|p| p.data).collect();
            pits.push(RECORD_TERMINATOR);
            regions.push(pits);
        }
        let mut header: Vec<u8> = vec![];
        for region in &regions {
            let addr = space.write(rom, region, MAP_DATA_WINDOW)?;
            header.extend(((addr - MAP_DATA_ADDEND) as u16).to_le_bytes());
        }
        let header_addr = space.write(rom, &header, MAP_DATA_WINDOW)?;

        rom.write_u16(
            self.npc_data_pointer()?,
            (npc_addr - NPC_DATA_ADDEND) as u16,
        )?;
        let save_flags = (self.checkpoint as u8) << 7 | self.saveable as u8;
        rom.write_u8(self.save_flags_addr()?, save_flags)?;
        rom.write_u16(
            self.map_data_pointer()?,
            (header_addr - MAP_DATA_ADDEND) as u16,
        )?;
        debug!(
            "Encoded location {:02x} at {:05x} (header {}), npc data at {:05x}",
            self.id,
            header_addr,
            hex_bytes(&header),
            npc_addr
        );

        self.write_boss_patch(rom)
    }
}
