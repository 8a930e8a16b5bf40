use std::{cell::RefCell, rc::Rc, time::Duration};

use gridguard_core::{
    CellCoord, ContentError, CreepDefinition, CreepTypeId, EconomyConfig, Event, GameContent,
    MapDefinition, PlacementError, RunSnapshot, SaveError, SaveGame, SpawnGroup,
    TowerDefinition, TowerId, TowerRole, TowerTypeId, UpgradeError, WaveDefinition,
};
use gridguard_engine::{Engine, EngineConfig, EngineObserver};
use gridguard_world::query;

const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct Recording {
    snapshots: Vec<RunSnapshot>,
    game_overs: usize,
}

struct Recorder(Rc<RefCell<Recording>>);

impl EngineObserver for Recorder {
    fn state_changed(&mut self, snapshot: &RunSnapshot) {
        self.0.borrow_mut().snapshots.push(snapshot.clone());
    }

    fn game_over(&mut self, _snapshot: &RunSnapshot) {
        self.0.borrow_mut().game_overs += 1;
    }
}

fn record(engine: &mut Engine) -> Rc<RefCell<Recording>> {
    let recording = Rc::new(RefCell::new(Recording::default()));
    engine.subscribe(Box::new(Recorder(Rc::clone(&recording))));
    recording
}

fn wall() -> TowerDefinition {
    TowerDefinition {
        id: TowerTypeId::new("wall"),
        name: "Wall".to_owned(),
        cost: 15,
        damage: 0,
        range: 0.0,
        fire_rate: 0.0,
        projectile_speed: 300.0,
        splash_radius: None,
        slow: None,
        role: TowerRole::Wall,
        blocks_path: true,
        upgrade_cost: 0,
        max_level: 1,
    }
}

fn runner(damage: u32) -> CreepDefinition {
    CreepDefinition {
        id: CreepTypeId::new("runner"),
        name: "Runner".to_owned(),
        health: 30,
        speed: 100.0,
        armor: 0,
        reward: 4,
        damage,
    }
}

fn wave(count: u32) -> WaveDefinition {
    WaveDefinition {
        groups: vec![SpawnGroup {
            creep: CreepTypeId::new("runner"),
            count,
            delay_ms: 0,
            interval_ms: 100,
            jitter_ms: 0,
            elite_chance: 0.0,
        }],
    }
}

/// Five-cell lane along the top row of a 5x3 grid with 10-unit tiles.
fn lane(economy: EconomyConfig, waves: Vec<WaveDefinition>) -> EngineConfig {
    let path = (0..5).map(|column| CellCoord::new(column, 0)).collect();
    let content = GameContent {
        map: MapDefinition::new(5, 3, 10.0, path),
        economy,
        towers: vec![wall()],
        creeps: vec![runner(1)],
        waves,
    }
    .validated()
    .expect("lane content");
    EngineConfig::new("lane", content)
}

/// 25x18 grid whose only walkable cells are the ten-cell path along row 9
/// and the pocket at (5, 8).
fn corridor() -> EngineConfig {
    let path: Vec<CellCoord> = (0..10).map(|column| CellCoord::new(column, 9)).collect();
    let mut open = path.clone();
    open.push(CellCoord::new(5, 8));

    let mut map = MapDefinition::new(25, 18, 40.0, path);
    map.blocked = (0..18)
        .flat_map(|row| (0..25).map(move |column| CellCoord::new(column, row)))
        .filter(|cell| !open.contains(cell))
        .collect();

    let content = GameContent {
        map,
        economy: EconomyConfig::default(),
        towers: vec![wall()],
        creeps: vec![runner(1)],
        waves: Vec::new(),
    }
    .validated()
    .expect("corridor content");
    EngineConfig::new("abc", content)
}

fn standard(seed: &str) -> Engine {
    Engine::new(EngineConfig::standard(seed).expect("standard content")).expect("engine")
}

fn run_for(engine: &mut Engine, ticks: usize) {
    for _ in 0..ticks {
        engine.update(TICK);
    }
}

#[test]
fn walls_cannot_cut_the_creep_route() {
    let mut engine = Engine::new(corridor()).expect("engine");
    let route = engine.path().to_vec();
    assert_eq!(route.len(), 10);
    let wall = TowerTypeId::new("wall");
    let cash = engine.economy().cash;

    assert!(!engine.can_place_tower(&wall, 5, 9));
    assert_eq!(
        engine.try_place_tower(&wall, 5, 9),
        Err(PlacementError::PathCell)
    );
    assert!(!engine.place_tower(&wall, 5, 9));
    assert_eq!(engine.economy().cash, cash);

    assert!(engine.place_tower(&wall, 5, 8));
    assert_eq!(engine.economy().cash, cash - 15);
    assert!(query::pathfinder(engine.world()).path_exists());
    assert_eq!(engine.path(), route.as_slice());
}

#[test]
fn sparse_path_is_refused_at_load() {
    let mut content = GameContent::standard().expect("standard content");
    content.map.path = vec![CellCoord::new(0, 9), CellCoord::new(9, 9)];
    assert!(matches!(
        Engine::new(EngineConfig::new("sparse", content)),
        Err(ContentError::DisjointPath { .. })
    ));
}

#[test]
fn placement_refusals_leave_state_untouched() {
    let mut engine = standard("refusals");
    let arrow = TowerTypeId::new("arrow");

    assert!(!engine.place_tower(&TowerTypeId::new("laser"), 0, 0));
    assert_eq!(
        engine.try_place_tower(&arrow, 0, 2),
        Err(PlacementError::PathCell)
    );
    assert_eq!(
        engine.try_place_tower(&arrow, 10, 4),
        Err(PlacementError::Blocked)
    );
    assert_eq!(
        engine.try_place_tower(&arrow, 25, 0),
        Err(PlacementError::OutOfBounds)
    );
    assert!(engine.place_tower(&arrow, 0, 0));
    assert_eq!(
        engine.try_place_tower(&arrow, 0, 0),
        Err(PlacementError::Occupied)
    );
    assert_eq!(engine.economy().cash, 600);
    assert_eq!(engine.towers().into_vec().len(), 1);
}

#[test]
fn cash_is_never_overspent() {
    let mut engine = standard("broke");
    let sniper = TowerTypeId::new("sniper");

    assert!(engine.place_tower(&sniper, 0, 0));
    assert!(engine.place_tower(&sniper, 1, 0));
    assert!(engine.place_tower(&sniper, 2, 0));
    assert_eq!(
        engine.try_place_tower(&sniper, 3, 0),
        Err(PlacementError::InsufficientFunds)
    );
    assert_eq!(engine.economy().cash, 50);
}

#[test]
fn selling_refunds_eighty_percent_of_the_cost() {
    let mut engine = standard("refund");
    let arrow = engine
        .try_place_tower(&TowerTypeId::new("arrow"), 0, 0)
        .expect("arrow");
    let cannon = engine
        .try_place_tower(&TowerTypeId::new("cannon"), 1, 0)
        .expect("cannon");

    assert_eq!(engine.sell_tower(arrow), Some(40));
    assert_eq!(engine.sell_tower(cannon), Some(96));
    assert_eq!(engine.sell_tower(cannon), None);
    assert_eq!(engine.economy().cash, 650 - 50 - 120 + 40 + 96);
    assert!(engine.towers().into_vec().is_empty());
}

#[test]
fn upgrades_are_included_in_the_refund() {
    let mut engine = standard("upgrade");
    let arrow = engine
        .try_place_tower(&TowerTypeId::new("arrow"), 0, 0)
        .expect("arrow");

    assert_eq!(engine.upgrade_tower(arrow), Ok(2));
    assert_eq!(engine.upgrade_tower(arrow), Ok(3));
    assert_eq!(engine.upgrade_tower(arrow), Err(UpgradeError::MaxLevel));
    assert_eq!(engine.economy().cash, 650 - 50 - 40 - 80);
    assert_eq!(engine.sell_tower(arrow), Some((50 + 40 + 80) * 8 / 10));
}

#[test]
fn game_over_fires_once_and_freezes_the_run() {
    let economy = EconomyConfig {
        starting_lives: 2,
        ..EconomyConfig::default()
    };
    let mut engine = Engine::new(lane(economy, vec![wave(3)])).expect("engine");
    let recording = record(&mut engine);

    assert!(engine.start_wave());
    run_for(&mut engine, 40);

    assert!(engine.is_game_over());
    assert!(engine.is_paused());
    assert_eq!(engine.economy().lives, 0);
    assert_eq!(recording.borrow().game_overs, 1);

    let frozen = engine.snapshot();
    let clock = query::clock(engine.world());
    let notified = recording.borrow().snapshots.len();
    let _ = engine.take_events();

    engine.set_paused(false);
    run_for(&mut engine, 20);

    assert!(engine.is_paused());
    assert_eq!(engine.snapshot(), frozen);
    assert_eq!(query::clock(engine.world()), clock);
    assert!(!engine
        .take_events()
        .iter()
        .any(|event| matches!(event, Event::TimeAdvanced { .. })));
    assert_eq!(recording.borrow().game_overs, 1);
    assert_eq!(recording.borrow().snapshots.len(), notified);
    assert!(!engine.start_wave());
}

#[test]
fn wave_completes_once_every_creep_is_gone() {
    let economy = EconomyConfig {
        wave_bonus: 10,
        wave_bonus_step: 2,
        ..EconomyConfig::default()
    };
    let mut engine = Engine::new(lane(economy, vec![wave(2)])).expect("engine");

    assert!(engine.start_wave());
    run_for(&mut engine, 4);
    assert!(engine.is_wave_active());
    assert!(!engine.creeps().is_empty());

    run_for(&mut engine, 20);
    assert!(!engine.is_wave_active());
    assert!(engine.creeps().is_empty());

    let events = engine.take_events();
    let last_leak = events
        .iter()
        .rposition(|event| matches!(event, Event::CreepLeaked { .. }))
        .expect("leak");
    let completed = events
        .iter()
        .position(|event| *event == Event::WaveCompleted { wave: 1 })
        .expect("completion");
    assert!(completed > last_leak);
    assert!(events.contains(&Event::WaveBonusGranted {
        wave: 1,
        amount: 12,
    }));
    assert_eq!(engine.economy().lives, 18);
    assert_eq!(engine.economy().cash, 650 + 12);
}

#[test]
fn wave_index_stops_at_the_maximum() {
    let economy = EconomyConfig {
        max_waves: 2,
        ..EconomyConfig::default()
    };
    let mut engine = Engine::new(lane(economy, vec![wave(1), wave(1), wave(1)])).expect("engine");

    assert!(engine.start_wave());
    assert!(engine.start_wave());
    assert!(!engine.start_wave());
    assert_eq!(engine.wave(), 2);
}

#[test]
fn standard_run_refuses_a_twenty_first_wave() {
    let mut engine = standard("marathon");
    for _ in 0..20 {
        assert!(engine.start_wave());
    }
    assert!(!engine.start_wave());
    assert_eq!(engine.snapshot().wave, 20);
}

#[test]
fn undefined_wave_is_a_no_op() {
    let mut engine = Engine::new(lane(EconomyConfig::default(), vec![wave(1)])).expect("engine");
    assert!(engine.start_wave());
    assert!(!engine.start_wave());
    assert_eq!(engine.wave(), 1);
}

#[test]
fn paused_updates_do_nothing() {
    let mut engine = Engine::new(lane(EconomyConfig::default(), vec![wave(3)])).expect("engine");
    assert!(engine.start_wave());
    engine.set_paused(true);
    let _ = engine.take_events();

    run_for(&mut engine, 10);

    assert_eq!(query::clock(engine.world()), Duration::ZERO);
    assert!(engine.creeps().is_empty());
    assert!(engine.take_events().is_empty());

    engine.set_paused(false);
    engine.update(TICK);
    assert_eq!(engine.creeps().len(), 1);
}

#[test]
fn speed_scales_simulated_time() {
    let mut engine = Engine::new(lane(EconomyConfig::default(), Vec::new())).expect("engine");
    engine.set_speed(2.0);
    engine.update(Duration::from_millis(100));
    assert_eq!(query::clock(engine.world()), Duration::from_millis(200));

    engine.set_speed(0.0);
    engine.update(Duration::from_millis(100));
    assert_eq!(query::clock(engine.world()), Duration::from_millis(200));
}

#[test]
fn every_mutation_notifies_observers() {
    let mut engine = standard("observed");
    let recording = record(&mut engine);

    assert!(engine.place_tower(&TowerTypeId::new("arrow"), 0, 0));
    assert!(engine.start_wave());
    engine.set_speed(2.0);
    engine.set_paused(true);
    engine.set_paused(false);
    engine.update(TICK);

    let recording = recording.borrow();
    assert_eq!(recording.snapshots.len(), 6);
    let last = recording.snapshots.last().expect("snapshot");
    assert_eq!(last.wave, 1);
    assert_eq!(last.cash, 600);
    assert_eq!(last.speed, 2.0);
    assert!(!last.is_paused);
}

#[test]
fn session_without_lives_starts_paused() {
    let mut config = lane(EconomyConfig::default(), vec![wave(1)]);
    config.content.economy.starting_lives = 0;
    assert!(config.content.clone().validated().is_err());

    let mut engine = Engine::new(config).expect("engine");
    assert!(engine.is_game_over());
    assert!(engine.is_paused());
    engine.set_paused(false);
    assert!(engine.is_paused());
    assert!(!engine.start_wave());
}

#[test]
fn refused_operations_do_not_notify_observers() {
    let mut engine = standard("quiet");
    let arrow = engine
        .try_place_tower(&TowerTypeId::new("arrow"), 0, 0)
        .expect("arrow");
    let wall = engine
        .try_place_tower(&TowerTypeId::new("wall"), 1, 0)
        .expect("wall");
    let recording = record(&mut engine);

    assert_eq!(
        engine.try_place_tower(&TowerTypeId::new("arrow"), 0, 2),
        Err(PlacementError::PathCell)
    );
    assert_eq!(engine.upgrade_tower(wall), Err(UpgradeError::NotUpgradeable));
    assert_eq!(
        engine.upgrade_tower(TowerId::new(99)),
        Err(UpgradeError::MissingTower)
    );
    assert_eq!(engine.sell_tower(TowerId::new(99)), None);
    assert!(recording.borrow().snapshots.is_empty());

    assert_eq!(engine.upgrade_tower(arrow), Ok(2));
    assert_eq!(recording.borrow().snapshots.len(), 1);
}

#[test]
fn save_restores_towers_and_economy() {
    let mut engine = standard("abc");
    let arrow = engine
        .try_place_tower(&TowerTypeId::new("arrow"), 0, 0)
        .expect("arrow");
    assert_eq!(engine.upgrade_tower(arrow), Ok(2));
    assert!(engine.place_tower(&TowerTypeId::new("wall"), 5, 5));
    assert!(engine.start_wave());

    let save = engine.save(1_700_000_000_000);
    assert_eq!(save.cash, 650 - 50 - 40 - 15);
    let encoded = save.encode().expect("encode");
    let decoded = SaveGame::decode(&encoded).expect("decode");

    let restored = Engine::restore(
        EngineConfig::standard("ignored").expect("content"),
        &decoded,
    )
    .expect("restore");

    assert_eq!(restored.seed(), "abc");
    assert_eq!(restored.wave(), 1);
    assert_eq!(restored.economy(), engine.economy());
    assert_eq!(restored.save(1_700_000_000_000), save);
    assert!(!query::pathfinder(restored.world())
        .grid()
        .is_walkable(CellCoord::new(5, 5)));
}

#[test]
fn restore_rejects_saves_the_content_cannot_rebuild() {
    let mut save = standard("abc").save(0);
    save.towers.push(gridguard_core::SavedTower {
        x: 0,
        y: 0,
        tower_type_id: TowerTypeId::new("laser"),
        level: 1,
    });

    let error = Engine::restore(EngineConfig::standard("abc").expect("content"), &save)
        .expect_err("unknown tower");
    assert!(matches!(error, SaveError::Incompatible(_)));
}
