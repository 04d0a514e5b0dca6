use gemfall_core::{Command, Event, GridConfig, Palette};
use gemfall_system_autoplay::{Autoplay, Config};
use gemfall_world::{self as world, query, World};

fn configured_world(seed: u64) -> (World, Vec<Event>) {
    let mut world = World::new();
    let mut events = Vec::new();
    let config = GridConfig::new(6, 6, Palette::default()).with_seed(seed);
    world::apply(&mut world, Command::ConfigureGrid { config }, &mut events)
        .expect("configuration applies");
    (world, events)
}

/// Runs one frame: the system reacts to the last events, then the world applies its commands.
fn frame(
    world: &mut World,
    autoplay: &mut Autoplay,
    events: &[Event],
    busy: bool,
) -> (Vec<Command>, Vec<Event>) {
    let mut commands = Vec::new();
    autoplay.handle(events, &query::grid_view(world), busy, &mut commands);

    let mut generated = Vec::new();
    for command in commands.iter().cloned() {
        world::apply_to_completion(world, command, &mut generated).expect("command applies");
    }
    (commands, generated)
}

#[test]
fn stopped_system_emits_nothing() {
    let (mut world, events) = configured_world(1);
    let mut autoplay = Autoplay::new(Config::new(3, 10));

    let (commands, _) = frame(&mut world, &mut autoplay, &events, false);

    assert!(commands.is_empty());
    assert!(!autoplay.is_running());
}

#[test]
fn action_clicks_anchor_then_adjacent_neighbor() {
    let (mut world, events) = configured_world(1);
    let mut autoplay = Autoplay::new(Config::new(3, 10));
    autoplay.start();

    let (anchor_commands, generated) = frame(&mut world, &mut autoplay, &events, false);
    let anchor = match anchor_commands.as_slice() {
        [Command::Click { cell }] => *cell,
        other => panic!("expected a single anchor click, got {other:?}"),
    };
    assert_eq!(query::selection(&world), Some(anchor));
    let neighbors = query::neighbors(&world, anchor);

    let (neighbor_commands, generated) = frame(&mut world, &mut autoplay, &generated, false);
    let neighbor = match neighbor_commands.as_slice() {
        [Command::Click { cell }] => *cell,
        other => panic!("expected a single neighbor click, got {other:?}"),
    };

    assert!(neighbors.contains(&neighbor));
    assert_eq!(autoplay.actions(), 1);
    assert_eq!(query::selection(&world), None);
    assert!(generated
        .iter()
        .any(|event| matches!(event, Event::CellsSwapped { .. })));
    assert_eq!(generated.last(), Some(&Event::ResolutionFinished));
}

#[test]
fn busy_presentation_defers_clicks() {
    let (mut world, events) = configured_world(1);
    let mut autoplay = Autoplay::new(Config::new(3, 10));
    autoplay.start();

    let (commands, _) = frame(&mut world, &mut autoplay, &events, true);
    assert!(commands.is_empty());

    let (commands, _) = frame(&mut world, &mut autoplay, &[], false);
    assert_eq!(commands.len(), 1);
}

#[test]
fn suspended_resolution_defers_clicks() {
    let (mut world, _) = configured_world(1);
    let first = query::cell_at(&world, gemfall_core::CellCoord::new(0, 0))
        .expect("slot filled")
        .id;
    let second = query::cell_at(&world, gemfall_core::CellCoord::new(1, 0))
        .expect("slot filled")
        .id;
    let mut events = Vec::new();
    world::apply(&mut world, Command::Click { cell: first }, &mut events).expect("click applies");
    world::apply(&mut world, Command::Click { cell: second }, &mut events).expect("click applies");
    assert!(query::awaiting_resume(&world));

    let mut autoplay = Autoplay::new(Config::new(3, 10));
    autoplay.start();
    let mut commands = Vec::new();
    autoplay.handle(&[], &query::grid_view(&world), false, &mut commands);

    assert!(commands.is_empty());
}

#[test]
fn stopping_after_anchor_click_deselects() {
    let (mut world, events) = configured_world(2);
    let mut autoplay = Autoplay::new(Config::new(9, 10));
    autoplay.start();

    let (anchor_commands, generated) = frame(&mut world, &mut autoplay, &events, false);
    assert_eq!(anchor_commands.len(), 1);
    assert!(query::selection(&world).is_some());

    autoplay.stop();
    let (commands, _) = frame(&mut world, &mut autoplay, &generated, false);

    assert_eq!(commands, anchor_commands, "stopping clicks the anchor again");
    assert_eq!(query::selection(&world), None);
    assert!(!autoplay.is_running());
}

#[test]
fn session_ends_at_action_cap_with_stable_grid() {
    let (mut world, mut events) = configured_world(3);
    let mut autoplay = Autoplay::new(Config::new(21, 25));
    autoplay.start();

    let mut frames = 0;
    while autoplay.is_running() {
        let (_, generated) = frame(&mut world, &mut autoplay, &events, false);
        events = generated;
        frames += 1;
        assert!(frames < 1_000, "session did not terminate");
    }

    assert_eq!(autoplay.actions(), 25);
    assert!(!query::has_matches(&world));
    assert_eq!(query::cells(&world).len(), 36);
}

#[test]
fn reconfiguring_mid_action_restarts_from_a_fresh_anchor() {
    let (mut world, events) = configured_world(4);
    let mut autoplay = Autoplay::new(Config::new(5, 10));
    autoplay.start();

    let (_, _) = frame(&mut world, &mut autoplay, &events, false);
    let (fresh_world, fresh_events) = configured_world(8);
    world = fresh_world;

    let (commands, _) = frame(&mut world, &mut autoplay, &fresh_events, false);

    assert_eq!(commands.len(), 1);
    assert_eq!(autoplay.actions(), 0, "no swap was completed");
    let Command::Click { cell } = commands[0] else {
        panic!("expected a click");
    };
    assert_eq!(query::selection(&world), Some(cell));
}

#[test]
fn zero_action_cap_ends_without_clicking() {
    let (mut world, events) = configured_world(6);
    let mut autoplay = Autoplay::new(Config::new(5, 0));
    autoplay.start();

    let (commands, _) = frame(&mut world, &mut autoplay, &events, false);

    assert!(commands.is_empty());
    assert!(!autoplay.is_running());
    assert_eq!(autoplay.actions(), 0);
}
