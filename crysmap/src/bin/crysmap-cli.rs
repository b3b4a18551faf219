use anyhow::{bail, Context, Result};
use clap::Parser;
use crysmap::catalog::Catalog;
use crysmap::locations::Locations;
use crysmap::patch::Rom;
use crysmap_game::util::sorted_keys;
use crysmap_game::{LocationId, MonsterSpec, Placement};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use strum::VariantNames;

#[derive(Parser)]
struct Args {
    #[arg(long)]
    input_rom: PathBuf,

    #[arg(long)]
    catalog: PathBuf,

    #[arg(long)]
    output_rom: Option<PathBuf>,

    /// Location to analyze instead of rewriting the whole ROM.
    #[arg(long, value_parser = parse_location_id)]
    location: Option<LocationId>,

    #[arg(long)]
    fly: bool,

    #[arg(long)]
    random_seed: Option<u64>,

    /// Monster to place, as `placement:clearance` (e.g. `moth:3`).
    #[arg(long)]
    monster: Vec<String>,

    #[arg(long)]
    output_report: Option<PathBuf>,
}

#[derive(Serialize)]
struct PlacedMonster {
    placement: Placement,
    clearance: u32,
    tile: Option<String>,
}

#[derive(Serialize)]
struct LocationReport {
    location: String,
    name: String,
    fly: bool,
    reachable_tiles: usize,
    reachable: Vec<String>,
    monsters: Vec<PlacedMonster>,
}

fn parse_location_id(s: &str) -> Result<LocationId> {
    let id = match s.strip_prefix("0x").or_else(|| s.strip_prefix('$')) {
        Some(hex) => LocationId::from_str_radix(hex, 16)?,
        None => s.parse()?,
    };
    Ok(id)
}

fn parse_monster(s: &str) -> Result<MonsterSpec> {
    let Some((placement, clearance)) = s.split_once(':') else {
        bail!("monster must be given as placement:clearance, got {s}");
    };
    Ok(MonsterSpec {
        placement: Placement::from_str(placement)
            .with_context(|| {
                format!(
                    "unknown placement {placement}, expected one of {}",
                    Placement::VARIANTS.join(", ")
                )
            })?,
        clearance: clearance
            .parse()
            .with_context(|| format!("bad clearance {clearance}"))?,
    })
}

fn analyze_location(
    args: &Args,
    rom: &Rom,
    locations: &Locations,
    id: LocationId,
) -> Result<LocationReport> {
    let loc = locations.get(id)?;
    if !loc.used {
        bail!("location {id:02x} is unused");
    }
    let reachable = loc.reachable_tiles(rom, args.fly)?;
    info!(
        "Location {:02x} ({}): {} reachable tiles",
        id,
        loc.name(),
        reachable.len()
    );

    let seed = args.random_seed.unwrap_or_else(|| rand::thread_rng().next_u64());
    info!("Placement seed: {seed}");
    let rng = StdRng::seed_from_u64(seed);
    let mut placer = loc.monster_placer(rom, rng)?;
    let mut monsters = vec![];
    for m in &args.monster {
        let spec = parse_monster(m)?;
        let tile = placer.place(&spec);
        match tile {
            Some(t) => info!(
                "Placed {} monster (clearance {}) at {t}",
                spec.placement, spec.clearance
            ),
            None => warn!(
                "No room for {} monster (clearance {})",
                spec.placement, spec.clearance
            ),
        }
        monsters.push(PlacedMonster {
            placement: spec.placement,
            clearance: spec.clearance,
            tile: tile.map(|t| t.to_string()),
        });
    }

    Ok(LocationReport {
        location: format!("{id:02x}"),
        name: loc.name().to_string(),
        fly: args.fly,
        reachable_tiles: reachable.len(),
        reachable: sorted_keys(&reachable).iter().map(|t| t.to_string()).collect(),
        monsters,
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let catalog = Catalog::load(&args.catalog)?;
    let mut rom = Rom::load(&args.input_rom)?;
    rom.enable_tracking();
    let mut locations = Locations::load(&rom, &catalog)?;
    locations.resolve_groups()?;

    if let Some(id) = args.location {
        let report = analyze_location(&args, &rom, &locations, id)?;
        if let Some(output_report_path) = &args.output_report {
            println!("Writing report to {}", output_report_path.display());
            let report_str = serde_json::to_string_pretty(&report)?;
            std::fs::write(output_report_path, report_str)?;
        }
        return Ok(());
    }

    // Rewrite every location into the space their old data occupied:
    let mut space = locations.reclaim_space();
    locations.write(&mut rom, &mut space)?;

    for (start, end) in rom.get_modified_ranges() {
        info!("Modified {start:05x}..{end:05x}");
    }
    if let Some(output_rom_path) = &args.output_rom {
        println!("Writing output ROM to {}", output_rom_path.display());
        rom.save(output_rom_path)?;
    }
    Ok(())
}
