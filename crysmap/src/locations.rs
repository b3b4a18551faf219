use anyhow::{anyhow, bail, ensure, Context, Result};
use crysmap_game::{GroupKey, LocationData, LocationId, ScreenId, NUM_LOCATIONS};
use hashbrown::HashMap;
use log::{debug, info, warn};

use crate::catalog::Catalog;
use crate::location::codec::Span;
use crate::location::topology::ScreenPos;
use crate::location::{Location, LocationError};
use crate::patch::{FreeSpace, Rom};

/// A resolved music or palette group.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Group {
    Tag(String),
    /// Shared with no other location.
    Unique(LocationId),
}

/// Every location ID in the ROM, indexed by ID.
pub struct Locations {
    locations: Vec<Location>,
    spans: Vec<Span>,
    by_screen: HashMap<ScreenId, Vec<LocationId>>,
    music_groups: HashMap<LocationId, Group>,
    color_groups: HashMap<LocationId, Group>,
}

impl Locations {
    pub fn new(locations: Vec<Location>) -> Result<Self> {
        for (i, loc) in locations.iter().enumerate() {
            ensure!(
                loc.id == i as LocationId,
                "location {:02x} stored at index {i:02x}",
                loc.id
            );
        }
        let mut out = Locations {
            locations,
            spans: vec![],
            by_screen: HashMap::new(),
            music_groups: HashMap::new(),
            color_groups: HashMap::new(),
        };
        out.reindex_screens();
        Ok(out)
    }

    pub fn load(rom: &Rom, catalog: &Catalog) -> Result<Self> {
        let mut locations = Vec::with_capacity(NUM_LOCATIONS);
        let mut spans = vec![];
        for id in 0..NUM_LOCATIONS as LocationId {
            let data = catalog.data_for(id);
            let (loc, loc_spans) = Location::decode_with_spans(rom, id, data)
                .with_context(|| format!("Unable to decode location {id:02x}"))?;
            if !loc.used && !loc.name().is_empty() {
                warn!(
                    "Catalog names location {:02x} ({}) but it has no map data",
                    id,
                    loc.name()
                );
            }
            locations.push(loc);
            spans.extend(loc_spans);
        }
        let mut out = Locations::new(locations)?;
        out.spans = spans;
        info!(
            "Loaded {} used locations ({} catalog entries)",
            out.used().count(),
            catalog.len()
        );
        Ok(out)
    }

    fn index(&self, id: LocationId) -> Result<usize> {
        if id < 0 || id as usize >= self.locations.len() {
            return Err(LocationError::InvalidLocation(id).into());
        }
        Ok(id as usize)
    }

    pub fn get(&self, id: LocationId) -> Result<&Location> {
        let i = self.index(id)?;
        Ok(&self.locations[i])
    }

    pub fn get_mut(&mut self, id: LocationId) -> Result<&mut Location> {
        let i = self.index(id)?;
        Ok(&mut self.locations[i])
    }

    /// Two distinct locations, mutably.
    pub fn pair_mut(
        &mut self,
        a: LocationId,
        b: LocationId,
    ) -> Result<(&mut Location, &mut Location)> {
        let ia = self.index(a)?;
        let ib = self.index(b)?;
        ensure!(ia != ib, "location {a:02x} cannot be paired with itself");
        if ia < ib {
            let (lo, hi) = self.locations.split_at_mut(ib);
            Ok((&mut lo[ia], &mut hi[0]))
        } else {
            let (lo, hi) = self.locations.split_at_mut(ia);
            Ok((&mut hi[0], &mut lo[ib]))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn used(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter().filter(|l| l.used)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    fn index_screens(&mut self, id: LocationId) {
        for screen in self.locations[id as usize].all_screens() {
            let ids = self.by_screen.entry(screen).or_default();
            if let Err(i) = ids.binary_search(&id) {
                ids.insert(i, id);
            }
        }
    }

    /// Rebuilds the screen index from every used location's layout.
    pub fn reindex_screens(&mut self) {
        self.by_screen.clear();
        for i in 0..self.locations.len() {
            if self.locations[i].used {
                self.index_screens(i as LocationId);
            }
        }
    }

    /// Used locations whose layout contains `screen`, in ID order.
    pub fn locations_with_screen(&self, screen: ScreenId) -> &[LocationId] {
        self.by_screen
            .get(&screen)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Replaces screen `old` with `new` in every location that uses it.
    pub fn renumber_screen(&mut self, old: ScreenId, new: ScreenId) {
        let Some(ids) = self.by_screen.remove(&old) else {
            return;
        };
        for &id in &ids {
            for s in self.locations[id as usize].screens.iter_mut().flatten() {
                if *s == old {
                    *s = new;
                }
            }
        }
        let entry = self.by_screen.entry(new).or_default();
        entry.extend(ids);
        entry.sort();
        entry.dedup();
        debug!("Renumbered screen {old:02x} to {new:02x}");
    }

    /// Stores `loc` under the first unused ID, skipping IDs below `after`
    /// when given, and indexes its screens.
    pub fn allocate(
        &mut self,
        mut loc: Location,
        after: Option<LocationId>,
    ) -> Result<LocationId> {
        ensure!(!loc.name().is_empty(), "new location needs a name");
        let min = after.unwrap_or(0);
        let Some(slot) = self.locations.iter().position(|l| !l.used && l.id >= min) else {
            bail!("no unused location");
        };
        let id = slot as LocationId;
        loc.id = id;
        loc.used = true;
        debug!("Allocated location {:02x} ({})", id, loc.name());
        self.locations[slot] = loc;
        self.index_screens(id);
        Ok(id)
    }

    pub fn connect(
        &mut self,
        a: LocationId,
        pos_a: ScreenPos,
        b: LocationId,
        pos_b: ScreenPos,
    ) -> Result<()> {
        let (la, lb) = self.pair_mut(a, b)?;
        la.connect(pos_a, lb, pos_b)
    }

    /// The location reached by leaving `id` next to the given entrance.
    pub fn neighbor_for_entrance(&self, id: LocationId, entrance: usize) -> Result<&Location> {
        let dest = self.get(id)?.neighbor_for_entrance(entrance)?;
        self.get(dest as LocationId)
    }

    fn resolve_group(
        &self,
        id: LocationId,
        key: fn(&LocationData) -> &GroupKey,
        memo: &mut HashMap<LocationId, Group>,
        visiting: &mut Vec<LocationId>,
    ) -> Result<Group> {
        if let Some(group) = memo.get(&id) {
            return Ok(group.clone());
        }
        if visiting.contains(&id) {
            bail!("group cycle through locations {:02x?}", visiting);
        }
        let loc = self.get(id)?;
        ensure!(loc.used, "group lookup reached unused location {id:02x}");
        visiting.push(id);
        let group = match key(&loc.data) {
            GroupKey::Tag(tag) => Group::Tag(tag.clone()),
            GroupKey::Unique => Group::Unique(id),
            GroupKey::Exit(i) => {
                let exit = loc
                    .exits
                    .get(*i)
                    .ok_or_else(|| anyhow!("location {id:02x} has no exit {i} to take a group from"))?;
                self.resolve_group(exit.dest() as LocationId, key, memo, visiting)?
            }
        };
        visiting.pop();
        memo.insert(id, group.clone());
        Ok(group)
    }

    fn resolve_all(&self, key: fn(&LocationData) -> &GroupKey) -> Result<HashMap<LocationId, Group>> {
        let mut memo = HashMap::new();
        for loc in self.used() {
            let mut visiting = vec![];
            self.resolve_group(loc.id, key, &mut memo, &mut visiting)?;
        }
        Ok(memo)
    }

    /// Resolves the music and color group of every used location, following
    /// exits where a location takes its group from a neighbor.
    pub fn resolve_groups(&mut self) -> Result<()> {
        self.music_groups = self
            .resolve_all(|d| &d.music)
            .context("Unable to resolve music groups")?;
        self.color_groups = self
            .resolve_all(|d| &d.palette)
            .context("Unable to resolve color groups")?;
        Ok(())
    }

    pub fn music_group(&self, id: LocationId) -> Option<&Group> {
        self.music_groups.get(&id)
    }

    pub fn color_group(&self, id: LocationId) -> Option<&Group> {
        self.color_groups.get(&id)
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Free space made of every region read while loading.
    pub fn reclaim_space(&self) -> FreeSpace {
        let mut space = FreeSpace::new();
        for &(start, end) in &self.spans {
            space.free(start, end);
        }
        debug!(
            "Reclaimed {} bytes in {} ranges",
            space.remaining(),
            space.ranges().len()
        );
        space
    }

    /// Encodes every used location, in ID order.
    pub fn write(&mut self, rom: &mut Rom, space: &mut FreeSpace) -> Result<()> {
        let before = space.remaining();
        for loc in &mut self.locations {
            let id = loc.id;
            loc.encode(rom, space)
                .with_context(|| format!("Unable to write location {id:02x}"))?;
        }
        info!(
            "Wrote {} locations using {} bytes; {} bytes free",
            self.used().count(),
            before - space.remaining(),
            space.remaining()
        );
        Ok(())
    }
}
