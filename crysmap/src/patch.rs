use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use crysmap_game::PcAddr;
use hashbrown::HashSet;

pub const INES_HEADER_SIZE: usize = 16;
const INES_MAGIC: &[u8; 4] = b"NES\x1a";

/// Bank window for map data (layout, graphics, entrances, exits, flags, pits).
pub const MAP_DATA_WINDOW: (PcAddr, PcAddr) = (0x14000, 0x18000);
/// Bank window for NPC data (sprite palettes, patterns, spawns).
pub const NPC_DATA_WINDOW: (PcAddr, PcAddr) = (0x18000, 0x1c000);

/// PRG image of the cartridge. Offsets used throughout the crate are PRG
/// offsets; the iNES header (if the file had one) is kept aside.
#[derive(Clone)]
pub struct Rom {
    pub data: Vec<u8>,
    header: Option<Vec<u8>>,
    track_touched: bool,
    touched: HashSet<usize>,
}

impl Rom {
    pub fn new(data: Vec<u8>) -> Self {
        Rom {
            data,
            header: None,
            track_touched: false,
            touched: HashSet::new(),
        }
    }

    pub fn enable_tracking(&mut self) {
        self.track_touched = true;
        self.touched.clear();
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut data = std::fs::read(path)
            .with_context(|| format!("Unable to load ROM at path {}", path.display()))?;
        let header = if data.len() >= INES_HEADER_SIZE && data[..4] == INES_MAGIC[..] {
            Some(data.drain(..INES_HEADER_SIZE).collect())
        } else {
            None
        };
        let mut rom = Rom::new(data);
        rom.header = header;
        Ok(rom)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = self.header.clone().unwrap_or_default();
        out.extend_from_slice(&self.data);
        std::fs::write(path, out)
            .with_context(|| format!("Unable to save ROM at path {}", path.display()))?;
        Ok(())
    }

    pub fn read_u8(&self, addr: PcAddr) -> Result<u8> {
        ensure!(
            addr < self.data.len(),
            "read_u8 address out of bounds: {addr:05x}"
        );
        Ok(self.data[addr])
    }

    /// Little-endian word.
    pub fn read_u16(&self, addr: PcAddr) -> Result<u16> {
        ensure!(
            addr + 2 <= self.data.len(),
            "read_u16 address out of bounds: {addr:05x}"
        );
        let b0 = self.data[addr] as u16;
        let b1 = self.data[addr + 1] as u16;
        Ok(b0 | b1 << 8)
    }

    pub fn read_n(&self, addr: PcAddr, n: usize) -> Result<&[u8]> {
        ensure!(
            addr + n <= self.data.len(),
            "read_n address out of bounds: {addr:05x}+{n}"
        );
        Ok(&self.data[addr..(addr + n)])
    }

    pub fn write_u8(&mut self, addr: PcAddr, x: u8) -> Result<()> {
        ensure!(
            addr < self.data.len(),
            "write_u8 address out of bounds: {addr:05x}"
        );
        self.data[addr] = x;
        if self.track_touched {
            self.touched.insert(addr);
        }
        Ok(())
    }

    pub fn write_u16(&mut self, addr: PcAddr, x: u16) -> Result<()> {
        ensure!(
            addr + 2 <= self.data.len(),
            "write_u16 address out of bounds: {addr:05x}"
        );
        self.write_u8(addr, (x & 0xff) as u8)?;
        self.write_u8(addr + 1, (x >> 8) as u8)?;
        Ok(())
    }

    pub fn write_n(&mut self, addr: PcAddr, x: &[u8]) -> Result<()> {
        ensure!(
            addr + x.len() <= self.data.len(),
            "write_n address out of bounds: {addr:05x}+{}",
            x.len()
        );
        for (i, &b) in x.iter().enumerate() {
            self.write_u8(addr + i, b)?;
        }
        Ok(())
    }

    // Returns a list of [start, end) ranges.
    pub fn get_modified_ranges(&self) -> Vec<(usize, usize)> {
        let mut addresses: Vec<usize> = self.touched.iter().copied().collect();
        addresses.sort();
        let mut ranges: Vec<(usize, usize)> = vec![];
        for addr in addresses {
            match ranges.last_mut() {
                Some(last) if last.1 == addr => last.1 = addr + 1,
                _ => ranges.push((addr, addr + 1)),
            }
        }
        ranges
    }
}

/// Disjoint, sorted `[start, end)` ranges of PRG space available for new data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FreeSpace {
    ranges: Vec<(PcAddr, PcAddr)>,
}

impl FreeSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[(PcAddr, PcAddr)] {
        &self.ranges
    }

    /// Marks `[start, end)` as free, merging with any overlapping or adjacent range.
    pub fn free(&mut self, start: PcAddr, end: PcAddr) {
        if start >= end {
            return;
        }
        let mut start = start;
        let mut end = end;
        let mut merged: Vec<(PcAddr, PcAddr)> = Vec::with_capacity(self.ranges.len() + 1);
        for &(s, e) in &self.ranges {
            if e < start || s > end {
                merged.push((s, e));
            } else {
                start = start.min(s);
                end = end.max(e);
            }
        }
        merged.push((start, end));
        merged.sort();
        self.ranges = merged;
    }

    /// First-fit allocation of `len` bytes inside `window`.
    pub fn alloc(&mut self, len: usize, window: (PcAddr, PcAddr)) -> Result<PcAddr> {
        let (lo, hi) = window;
        for i in 0..self.ranges.len() {
            let (s, e) = self.ranges[i];
            let start = s.max(lo);
            let end = e.min(hi);
            if start >= end || end - start < len {
                continue;
            }
            self.ranges.remove(i);
            if s < start {
                self.ranges.push((s, start));
            }
            if start + len < e {
                self.ranges.push((start + len, e));
            }
            self.ranges.sort();
            return Ok(start);
        }
        bail!(
            "No free space for {len} bytes in window {lo:05x}..{hi:05x} ({} bytes free there)",
            self.remaining_in(window)
        );
    }

    pub fn remaining(&self) -> usize {
        self.ranges.iter().map(|(s, e)| e - s).sum()
    }

    pub fn remaining_in(&self, window: (PcAddr, PcAddr)) -> usize {
        self.ranges
            .iter()
            .map(|&(s, e)| {
                let start = s.max(window.0);
                let end = e.min(window.1);
                end.saturating_sub(start)
            })
            .sum()
    }

    /// Allocates room for `data` and writes it, returning its PRG address.
    pub fn write(&mut self, rom: &mut Rom, data: &[u8], window: (PcAddr, PcAddr)) -> Result<PcAddr> {
        let addr = self.alloc(data.len(), window)?;
        rom.write_n(addr, data)?;
        Ok(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rom_access() -> Result<()> {
        let mut rom = Rom::new(vec![0; 0x20]);
        rom.enable_tracking();
        rom.write_u16(0x04, 0x1234)?;
        rom.write_n(0x06, &[0xaa, 0xbb])?;
        rom.write_u8(0x10, 0x01)?;
        assert_eq!(rom.read_u8(0x04)?, 0x34);
        assert_eq!(rom.read_u16(0x04)?, 0x1234);
        assert_eq!(rom.read_n(0x06, 2)?, &[0xaa, 0xbb]);
        assert_eq!(rom.get_modified_ranges(), vec![(0x04, 0x08), (0x10, 0x11)]);
        assert!(rom.read_u16(0x1f).is_err());
        assert!(rom.write_n(0x1f, &[0, 0]).is_err());
        Ok(())
    }

    #[test]
    fn test_free_space_merge() {
        let mut space = FreeSpace::new();
        space.free(0x10, 0x20);
        space.free(0x30, 0x40);
        space.free(0x20, 0x30);
        assert_eq!(space.ranges(), &[(0x10, 0x40)]);
        space.free(0x08, 0x0c);
        assert_eq!(space.ranges(), &[(0x08, 0x0c), (0x10, 0x40)]);
        assert_eq!(space.remaining(), 0x34);
    }

    #[test]
    fn test_free_space_alloc() -> Result<()> {
        let mut space = FreeSpace::new();
        space.free(0x13ff0, 0x14010);
        space.free(0x14100, 0x14200);
        // The window clips the first range to 0x10 bytes.
        assert_eq!(space.alloc(0x08, MAP_DATA_WINDOW)?, 0x14000);
        assert_eq!(space.alloc(0x10, MAP_DATA_WINDOW)?, 0x14100);
        assert_eq!(
            space.ranges(),
            &[(0x13ff0, 0x14000), (0x14008, 0x14010), (0x14110, 0x14200)]
        );
        assert!(space.alloc(0x100, MAP_DATA_WINDOW).is_err());
        assert!(space.alloc(0x01, NPC_DATA_WINDOW).is_err());
        Ok(())
    }
}
