#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Gemfall autoplay session.

mod config_file;
mod layout_transfer;
mod presentation;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use gemfall_core::{Command, Event, GridConfig, GridLayout, Palette, RefillRule, DEFAULT_SEED};
use gemfall_system_analytics::{Analytics, SessionStats};
use gemfall_system_autoplay::{self as autoplay, Autoplay};
use gemfall_world::{self as world, query, World};

use crate::{
    config_file::{ConfigFile, RefillRuleArg},
    presentation::HeadlessPresentation,
};

const DEFAULT_COLUMNS: u32 = 8;
const DEFAULT_ROWS: u32 = 8;
const DEFAULT_ACTIONS: u64 = 1_000;

/// Command-line arguments for the Gemfall autoplay session.
#[derive(Debug, Parser)]
#[command(name = "gemfall", about = "Runs a headless Gemfall autoplay session")]
struct CliArgs {
    /// TOML file providing grid settings; flags override its values.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Number of grid columns.
    #[arg(long, value_name = "N")]
    columns: Option<u32>,
    /// Number of grid rows.
    #[arg(long, value_name = "N")]
    rows: Option<u32>,
    /// Seed shared by the grid generator and the autoplay driver.
    #[arg(long, value_name = "N")]
    seed: Option<u64>,
    /// Undo swaps that do not produce a match.
    #[arg(long)]
    strict_swaps: bool,
    /// Strategy used to keep refilled cells from matching.
    #[arg(long, value_enum, value_name = "RULE")]
    refill_rule: Option<RefillRuleArg>,
    /// Number of swap attempts performed by the autoplay session.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_ACTIONS)]
    actions: u64,
    /// Layout string (as printed by --export-layout) to start from.
    #[arg(long, value_name = "STRING")]
    layout: Option<String>,
    /// Print the final layout as a transfer string.
    #[arg(long)]
    export_layout: bool,
    /// Frames the headless presentation stays busy per animated event.
    #[arg(long, value_name = "N", default_value_t = 0)]
    animation_frames: u32,
}

/// Entry point for the Gemfall command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    let file = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let layout = args
        .layout
        .as_deref()
        .map(layout_transfer::decode)
        .transpose()
        .context("failed to decode --layout")?;
    let config = resolve_config(&args, &file, layout.as_ref())?;
    if u64::from(config.columns()) * u64::from(config.rows()) < 2 {
        bail!("the grid needs at least two slots for swaps");
    }

    let mut world = World::new();
    let mut events = Vec::new();
    let command = match layout {
        Some(layout) => Command::LoadLayout {
            config: config.clone(),
            layout,
        },
        None => Command::ConfigureGrid {
            config: config.clone(),
        },
    };
    world::apply(&mut world, command, &mut events).context("failed to initialize the grid")?;

    let mut autoplay = Autoplay::new(autoplay::Config::new(config.seed(), args.actions));
    let mut analytics = Analytics::new();
    let mut presentation = HeadlessPresentation::new(args.animation_frames);
    let frames = run_session(
        &mut world,
        events,
        &mut autoplay,
        &mut analytics,
        &mut presentation,
    )?;

    println!(
        "gemfall {}x{} seed {} ({} actions, {frames} frames, {} animations)",
        config.columns(),
        config.rows(),
        config.seed(),
        autoplay.actions(),
        presentation.animations(),
    );
    let layout = query::layout(&world).context("failed to export the grid")?;
    for line in layout.to_lines() {
        println!("  {line}");
    }
    print_stats(&analytics.stats());

    if args.export_layout {
        println!("{}", layout_transfer::encode(&layout)?);
    }

    Ok(())
}

/// Merges defaults, the config file and command-line flags, in increasing priority.
fn resolve_config(
    args: &CliArgs,
    file: &ConfigFile,
    layout: Option<&GridLayout>,
) -> Result<GridConfig> {
    let (columns, rows) = match layout {
        Some(layout) => (layout.columns(), layout.rows()),
        None => (
            args.columns.or(file.columns).unwrap_or(DEFAULT_COLUMNS),
            args.rows.or(file.rows).unwrap_or(DEFAULT_ROWS),
        ),
    };
    let palette = file.palette()?.unwrap_or_else(Palette::default);
    let refill_rule = args
        .refill_rule
        .or(file.refill_rule)
        .map_or(RefillRule::default(), RefillRule::from);

    let config = GridConfig::new(columns, rows, palette)
        .with_disallow_loose_swap(args.strict_swaps || file.strict_swaps.unwrap_or(false))
        .with_refill_rule(refill_rule)
        .with_seed(args.seed.or(file.seed).unwrap_or(DEFAULT_SEED));
    config.validate().context("invalid grid configuration")?;
    Ok(config)
}

/// Drives autoplay against the world until the session ends and every animation played.
///
/// Returns the number of frames simulated.
fn run_session(
    world: &mut World,
    mut events: Vec<Event>,
    autoplay: &mut Autoplay,
    analytics: &mut Analytics,
    presentation: &mut HeadlessPresentation,
) -> Result<u64> {
    let mut commands = Vec::new();
    let mut reports: Vec<SessionStats> = Vec::new();
    let mut frames = 0_u64;

    presentation.observe(&events);
    analytics.handle(&events, &mut reports);
    autoplay.start();

    loop {
        autoplay.handle(
            &events,
            &query::grid_view(world),
            presentation.is_busy(),
            &mut commands,
        );
        events.clear();
        for command in commands.drain(..) {
            world::apply(world, command, &mut events)?;
        }
        if events.is_empty() && !presentation.is_busy() && query::awaiting_resume(world) {
            world::apply(world, Command::Resume, &mut events)?;
        }

        presentation.observe(&events);
        analytics.handle(&events, &mut reports);
        reports.clear();

        let idle = events.is_empty()
            && !autoplay.is_running()
            && !presentation.is_busy()
            && !query::awaiting_resume(world);
        if idle {
            return Ok(frames);
        }

        presentation.advance_frame();
        frames += 1;
    }
}

fn print_stats(stats: &SessionStats) {
    println!("resolutions finished: {}", stats.resolutions_finished());
    println!("resolutions cancelled: {}", stats.resolutions_cancelled());
    println!("swaps: {}", stats.swaps());
    println!("swaps reverted: {}", stats.swaps_reverted());
    println!("cells destroyed: {}", stats.cells_destroyed());
    println!("cells refilled: {}", stats.cells_refilled());
    println!("longest cascade: {}", stats.longest_cascade());
}
