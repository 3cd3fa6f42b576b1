use std::collections::HashMap;

use zombie_survival_core::{EntityId, EntityType, Event, Position, Snapshot};
use zombie_survival_world::Simulation;

const MAP_GENERATION_SEED: u64 = 0x5eed_2b1d_9c4f_0a37;
const GENERATED_MAPS: usize = 64;
const TICKS_PER_RUN: usize = 40;

#[test]
fn deterministic_replay_produces_expected_events() {
    let first = replay(&scripted_map(), 5);
    let second = replay(&scripted_map(), 5);

    assert_eq!(first, second, "replay diverged between runs");

    let (events, final_state) = first;
    let expected = vec![
        Event::TickStarted { tick: 1 },
        Event::ZombieAdvanced {
            zombie: EntityId::new(0),
            from: Position::new(0, 0),
            to: Position::new(1, 0),
        },
        Event::ZombieAdvanced {
            zombie: EntityId::new(2),
            from: Position::new(0, 2),
            to: Position::new(1, 2),
        },
        Event::LandmineTriggered {
            zombie: EntityId::new(2),
            landmine: EntityId::new(3),
            position: Position::new(1, 2),
            damage: 2,
        },
        Event::ZombieKilled {
            zombie: EntityId::new(2),
            position: Position::new(1, 2),
        },
        Event::TickStarted { tick: 2 },
        Event::ZombieAdvanced {
            zombie: EntityId::new(0),
            from: Position::new(1, 0),
            to: Position::new(2, 0),
        },
        Event::TickStarted { tick: 3 },
        Event::PlayerAttacked {
            zombie: EntityId::new(0),
            damage: 1,
            remaining: 1,
        },
        Event::TickStarted { tick: 4 },
        Event::PlayerAttacked {
            zombie: EntityId::new(0),
            damage: 1,
            remaining: 0,
        },
        Event::Finished {
            player_survived: false,
        },
    ];
    assert_eq!(events, expected);

    assert_eq!(final_state.tick(), 4);
    assert!(final_state.finished());
    assert_eq!(
        final_state.rows(),
        vec![
            vec![' ', ' ', 'Z', ' '],
            vec![' ', ' ', ' ', ' '],
            vec![' ', ' ', ' ', ' '],
        ]
    );
}

#[test]
fn generated_maps_replay_identically() {
    let mut rng_state = MAP_GENERATION_SEED;
    for _ in 0..GENERATED_MAPS {
        let map = generate_map(&mut rng_state, 7, 6);
        let first = replay(&map, TICKS_PER_RUN);
        let second = replay(&map, TICKS_PER_RUN);
        assert_eq!(first, second, "replay diverged for map {map:?}");
    }
}

#[test]
fn generated_maps_uphold_tick_invariants() {
    let mut rng_state = MAP_GENERATION_SEED ^ 0xffff;
    for _ in 0..GENERATED_MAPS {
        let map = generate_map(&mut rng_state, 6, 6);
        let mut simulation = Simulation::new(&map).expect("generated maps are valid");
        assert!(!simulation.finished());
        assert_eq!(
            simulation
                .state()
                .iter()
                .filter(|entity| entity.kind == EntityType::Player)
                .count(),
            1
        );

        let mut previous = simulation.state();
        let mut was_finished = false;
        for _ in 0..TICKS_PER_RUN {
            simulation.step();
            let current = simulation.state();

            assert_health_never_increases(&previous, &current);
            assert_single_occupant_per_cell(&current);
            assert_only_mobile_entities_move(&previous, &current);

            if was_finished {
                assert!(simulation.finished(), "termination must be sticky");
                assert_eq!(previous, current, "finished runs must not change");
            }
            was_finished = simulation.finished();
            previous = current;
        }
    }
}

fn replay(map: &[Vec<char>], ticks: usize) -> (Vec<Event>, Snapshot) {
    let mut simulation = Simulation::new(map).expect("valid map");
    let mut log = Vec::new();
    for _ in 0..ticks {
        simulation.step_with_events(&mut log);
    }
    (log, simulation.state())
}

fn scripted_map() -> Vec<Vec<char>> {
    ["Z..P", "....", "ZL.."]
        .iter()
        .map(|row| row.chars().collect())
        .collect()
}

fn assert_health_never_increases(previous: &Snapshot, current: &Snapshot) {
    for entity in current.iter() {
        if let Some(before) = previous.entity(entity.id) {
            assert!(
                entity.health <= before.health,
                "entity {} healed from {} to {}",
                entity.id.get(),
                before.health,
                entity.health
            );
        }
    }
}

fn assert_single_occupant_per_cell(snapshot: &Snapshot) {
    let mut seen: HashMap<Position, EntityId> = HashMap::new();
    for entity in snapshot.iter().filter(|entity| !entity.dead()) {
        if let Some(other) = seen.insert(entity.position, entity.id) {
            panic!(
                "entities {} and {} share {}",
                other.get(),
                entity.id.get(),
                entity.position
            );
        }
    }
}

fn assert_only_mobile_entities_move(previous: &Snapshot, current: &Snapshot) {
    for entity in current.iter() {
        if let Some(before) = previous.entity(entity.id) {
            if before.position != entity.position {
                assert!(entity.kind.is_mobile());
                assert_eq!(before.position.manhattan_distance(entity.position), 1);
            }
        }
    }
}

fn generate_map(rng_state: &mut u64, width: usize, height: usize) -> Vec<Vec<char>> {
    let mut map = vec![vec!['.'; width]; height];
    let cells = width * height;

    let player = next_index(rng_state, cells);
    map[player / width][player % width] = 'P';

    let mut zombies = 0;
    for index in 0..cells {
        if index == player {
            continue;
        }
        let tag = match next_index(rng_state, 10) {
            0 | 1 => 'Z',
            2 => 'R',
            3 => 'B',
            4 => 'L',
            _ => '.',
        };
        if tag == 'Z' {
            zombies += 1;
        }
        map[index / width][index % width] = tag;
    }

    if zombies == 0 {
        let fallback = (player + 1) % cells;
        map[fallback / width][fallback % width] = 'Z';
    }
    map
}

fn next_index(state: &mut u64, bound: usize) -> usize {
    *state = state
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407);
    ((*state >> 33) % bound as u64) as usize
}
