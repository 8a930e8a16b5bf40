use std::time::Duration;

use gridguard_core::{Command, CreepTypeId, Event, GameContent};
use gridguard_rng::SeededRng;
use gridguard_system_waves::{WaveManager, WaveProgress};

const CONTENT: &str = r#"
[map]
width = 6
height = 3
tile_size = 10.0
route = [{ column = 0, row = 1 }, { column = 5, row = 1 }]

[[towers]]
id = "arrow"
name = "Arrow"
cost = 10
damage = 5
range = 30.0
fire_rate = 1.0

[[creeps]]
id = "grunt"
name = "Grunt"
health = 10
speed = 10.0
reward = 1

[[creeps]]
id = "runner"
name = "Runner"
health = 5
speed = 20.0
reward = 1

[[waves]]
groups = [
    { creep = "grunt", count = 3, interval_ms = 1000 },
    { creep = "runner", count = 2, delay_ms = 500, interval_ms = 1000 },
]

[[waves]]
groups = [
    { creep = "grunt", count = 6, interval_ms = 400, jitter_ms = 300, elite_chance = 0.5 },
]

[[waves]]
groups = [
    { creep = "runner", count = 4, interval_ms = 100, elite_chance = 1.0 },
]
"#;

fn content() -> GameContent {
    GameContent::from_toml_str(CONTENT).expect("test content")
}

fn tick(ms: u64) -> Vec<Event> {
    vec![Event::TimeAdvanced {
        dt: Duration::from_millis(ms),
        now: Duration::ZERO,
    }]
}

fn spawned_kinds(commands: &[Command]) -> Vec<&str> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::SpawnCreep { kind, .. } => Some(kind.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn undefined_wave_is_a_no_op() {
    let content = content();
    let mut manager = WaveManager::new();
    let mut events = Vec::new();

    assert!(!manager.start_wave(0, &content, &mut events));
    assert!(!manager.start_wave(4, &content, &mut events));
    assert!(events.is_empty());
    assert!(!manager.is_active());
}

#[test]
fn groups_within_a_wave_run_concurrently() {
    let content = content();
    let mut manager = WaveManager::new();
    let mut rng = SeededRng::new("concurrent");
    let mut events = Vec::new();
    assert!(manager.start_wave(1, &content, &mut events));
    assert_eq!(events, vec![Event::WaveStarted { wave: 1 }]);

    let mut commands = Vec::new();
    manager.handle(&tick(0), &mut rng, &mut commands);
    assert_eq!(spawned_kinds(&commands), vec!["grunt"]);

    commands.clear();
    manager.handle(&tick(500), &mut rng, &mut commands);
    assert_eq!(spawned_kinds(&commands), vec!["runner"]);

    commands.clear();
    manager.handle(&tick(500), &mut rng, &mut commands);
    assert_eq!(spawned_kinds(&commands), vec!["grunt"]);

    commands.clear();
    manager.handle(&tick(5_000), &mut rng, &mut commands);
    assert_eq!(spawned_kinds(&commands), vec!["grunt", "runner"]);

    assert_eq!(
        manager.progress(),
        vec![WaveProgress {
            wave: 1,
            spawned: 5,
            total: 5,
        }]
    );
}

#[test]
fn completion_requires_exhaustion_and_an_empty_field() {
    let content = content();
    let mut manager = WaveManager::new();
    let mut rng = SeededRng::new("complete");
    let mut events = Vec::new();
    assert!(manager.start_wave(1, &content, &mut events));
    events.clear();

    let mut commands = Vec::new();
    manager.handle(&tick(600), &mut rng, &mut commands);
    manager.settle(0, &mut events);
    assert!(events.is_empty(), "groups still have creeps to spawn");

    manager.handle(&tick(10_000), &mut rng, &mut commands);
    manager.settle(3, &mut events);
    assert!(events.is_empty(), "creeps are still alive");
    assert!(manager.is_active());

    manager.settle(0, &mut events);
    assert_eq!(events, vec![Event::WaveCompleted { wave: 1 }]);
    assert!(!manager.is_active());

    manager.settle(0, &mut events);
    assert_eq!(events.len(), 1, "completion fires once");
}

#[test]
fn overlapping_waves_complete_independently() {
    let content = content();
    let mut manager = WaveManager::new();
    let mut rng = SeededRng::new("overlap");
    let mut events = Vec::new();
    assert!(manager.start_wave(1, &content, &mut events));
    assert!(manager.start_wave(3, &content, &mut events));
    events.clear();

    let mut commands = Vec::new();
    manager.handle(&tick(400), &mut rng, &mut commands);
    manager.settle(0, &mut events);

    assert_eq!(events, vec![Event::WaveCompleted { wave: 3 }]);
    assert_eq!(manager.progress().len(), 1);
}

#[test]
fn certain_elite_chance_marks_every_spawn() {
    let content = content();
    let mut manager = WaveManager::new();
    let mut rng = SeededRng::new("elite");
    let mut events = Vec::new();
    assert!(manager.start_wave(3, &content, &mut events));

    let mut commands = Vec::new();
    manager.handle(&tick(1_000), &mut rng, &mut commands);

    assert_eq!(commands.len(), 4);
    assert!(commands
        .iter()
        .all(|command| matches!(command, Command::SpawnCreep { elite: true, wave: 3, .. })));
}

#[test]
fn same_seed_replays_the_same_encounter() {
    fn replay(seed: &str) -> Vec<(u64, CreepTypeId, bool)> {
        let content = content();
        let mut manager = WaveManager::new();
        let mut rng = SeededRng::new(seed);
        let mut events = Vec::new();
        assert!(manager.start_wave(2, &content, &mut events));

        let mut log = Vec::new();
        for step in 0..40u64 {
            let mut commands = Vec::new();
            manager.handle(&tick(100), &mut rng, &mut commands);
            for command in commands {
                if let Command::SpawnCreep { kind, elite, .. } = command {
                    log.push((step, kind, elite));
                }
            }
        }
        log
    }

    let first = replay("abc");
    assert_eq!(first, replay("abc"));
    assert_eq!(first.len(), 6);
}
