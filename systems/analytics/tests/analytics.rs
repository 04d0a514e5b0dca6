use gemfall_core::{CellCoord, CellId, Command, Event, GridConfig, GridLayout, Palette, Rgb};
use gemfall_system_analytics::{Analytics, SessionStats};
use gemfall_world::{self as world, query, World};

fn four_colors() -> Palette {
    Palette::new(vec![
        Rgb::from_rgb(0xe0, 0x3c, 0x31),
        Rgb::from_rgb(0x3c, 0xb0, 0x4a),
        Rgb::from_rgb(0xf2, 0xc9, 0x4c),
        Rgb::from_rgb(0x2d, 0x6c, 0xdf),
    ])
}

fn load(lines: &[&str], strict: bool) -> (World, Vec<Event>) {
    let layout = GridLayout::parse(lines).expect("layout parses");
    let config = GridConfig::new(layout.columns(), layout.rows(), four_colors())
        .with_disallow_loose_swap(strict);
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(&mut world, Command::LoadLayout { config, layout }, &mut events)
        .expect("layout loads");
    (world, events)
}

fn id_at(world: &World, column: u32, row: u32) -> CellId {
    query::cell_at(world, CellCoord::new(column, row))
        .expect("slot is filled")
        .id
}

fn swap(world: &mut World, first: CellId, second: CellId) -> Vec<Event> {
    let mut events = Vec::new();
    for cell in [first, second] {
        world::apply_to_completion(world, Command::Click { cell }, &mut events)
            .expect("click applies");
    }
    events
}

#[test]
fn cascade_report_counts_waves_and_refills() {
    let (mut world, initial) = load(&["DCCB", "AADC", "BCAD"], false);
    let mut analytics = Analytics::new();
    let mut reports = Vec::new();
    analytics.handle(&initial, &mut reports);
    assert!(reports.is_empty(), "initialization publishes nothing");

    let upper = id_at(&world, 2, 1);
    let lower = id_at(&world, 2, 0);
    let events = swap(&mut world, upper, lower);
    analytics.handle(&events, &mut reports);

    assert_eq!(reports.len(), 1);
    let report = reports[0];
    assert_eq!(report.resolutions_finished(), 1);
    assert_eq!(report.swaps(), 1);
    assert_eq!(report.swaps_reverted(), 0);
    assert_eq!(report.cells_destroyed(), 6);
    assert_eq!(report.cells_refilled(), 6);
    assert_eq!(report.longest_cascade(), 2);
    assert_eq!(analytics.stats(), report);
}

#[test]
fn strict_revert_is_reported_separately() {
    let (mut world, initial) = load(
        &["CDABCD", "ABCDAB", "CDBADC", "AABACD", "DCDCBA", "BADBCA"],
        true,
    );
    let mut analytics = Analytics::new();
    let mut reports = Vec::new();
    analytics.handle(&initial, &mut reports);

    let first = id_at(&world, 4, 5);
    let second = id_at(&world, 5, 5);
    let events = swap(&mut world, first, second);
    analytics.handle(&events, &mut reports);

    let report = reports.last().copied().expect("resolution reported");
    assert_eq!(report.swaps(), 1);
    assert_eq!(report.swaps_reverted(), 1);
    assert_eq!(report.cells_destroyed(), 0);
    assert_eq!(report.longest_cascade(), 0);
}

#[test]
fn cancelled_resolution_is_counted_without_report() {
    let (mut world, initial) = load(&["DCCB", "AADC", "BCAD"], false);
    let mut analytics = Analytics::new();
    let mut reports = Vec::new();
    analytics.handle(&initial, &mut reports);

    let mut events = Vec::new();
    for cell in [id_at(&world, 2, 1), id_at(&world, 2, 0)] {
        world::apply(&mut world, Command::Click { cell }, &mut events).expect("click applies");
    }
    world::apply(&mut world, Command::CancelResolution, &mut events).expect("cancel applies");
    analytics.handle(&events, &mut reports);

    assert!(reports.is_empty());
    assert_eq!(analytics.stats().resolutions_cancelled(), 1);
    assert_eq!(analytics.stats().swaps(), 1);
}

#[test]
fn reconfiguring_resets_statistics() {
    let (mut world, initial) = load(&["DCCB", "AADC", "BCAD"], false);
    let mut analytics = Analytics::new();
    let mut reports = Vec::new();
    analytics.handle(&initial, &mut reports);
    let (upper, lower) = (id_at(&world, 2, 1), id_at(&world, 2, 0));
    let events = swap(&mut world, upper, lower);
    analytics.handle(&events, &mut reports);
    assert_ne!(analytics.stats(), SessionStats::default());

    let mut events = Vec::new();
    let config = GridConfig::new(5, 5, Palette::default()).with_seed(9);
    world::apply(&mut world, Command::ConfigureGrid { config }, &mut events)
        .expect("configuration applies");
    analytics.handle(&events, &mut reports);

    assert_eq!(analytics.stats(), SessionStats::default());
}
