#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Game engine that orchestrates the world and the pure systems.
//!
//! The engine is the single write authority over a session. Every public
//! operation translates into world commands, pumps the systems in a fixed
//! order and then notifies the registered [`EngineObserver`]s with a fresh
//! [`RunSnapshot`]. Given the same seed and the same sequence of operations
//! and tick deltas, two engines produce identical snapshot sequences.

use std::{fmt, time::Duration};

use gridguard_core::{
    CellCoord, Command, ContentError, CreepView, Event, GameContent, PlacementError, RunSnapshot,
    SaveError, SaveGame, ScoreSubmission, TowerId, TowerTarget, TowerTypeId, TowerView,
    UpgradeError,
};
use gridguard_rng::SeededRng;
use gridguard_system_tower_combat::queue_volley;
use gridguard_system_tower_targeting::TowerTargeting;
use gridguard_system_waves::{WaveManager, WaveProgress};
use gridguard_world::{self as world, query, Economy, ProjectileSnapshot, World};
use tracing::{debug, info, warn};

/// Inputs required to start a session.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Seed of the session RNG.
    pub seed: String,
    /// Validated content tables.
    pub content: GameContent,
}

impl EngineConfig {
    /// Creates a configuration from a seed and content tables.
    #[must_use]
    pub fn new(seed: impl Into<String>, content: GameContent) -> Self {
        Self {
            seed: seed.into(),
            content,
        }
    }

    /// Creates a configuration that uses the bundled reference content.
    pub fn standard(seed: impl Into<String>) -> Result<Self, ContentError> {
        Ok(Self::new(seed, GameContent::standard()?))
    }
}

/// Listener notified by the engine after state changes.
pub trait EngineObserver {
    /// Called after every mutating operation with the resulting snapshot.
    fn state_changed(&mut self, snapshot: &RunSnapshot);

    /// Called exactly once per session, when lives run out.
    fn game_over(&mut self, snapshot: &RunSnapshot) {
        let _ = snapshot;
    }
}

/// Orchestrates a single tower-defense session.
pub struct Engine {
    world: World,
    waves: WaveManager,
    targeting: TowerTargeting,
    rng: SeededRng,
    wave: u32,
    is_paused: bool,
    speed: f32,
    game_over_notified: bool,
    observers: Vec<Box<dyn EngineObserver>>,
    journal: Vec<Event>,
    commands: Vec<Command>,
    targets: Vec<TowerTarget>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("seed", &self.rng.seed())
            .field("wave", &self.wave)
            .field("is_paused", &self.is_paused)
            .field("speed", &self.speed)
            .field("economy", &query::economy(&self.world))
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates a new engine for the provided configuration.
    pub fn new(config: EngineConfig) -> Result<Self, ContentError> {
        let world = World::new(&config.content)?;
        let is_paused = query::is_game_over(&world);
        info!(seed = %config.seed, "session created");
        Ok(Self {
            world,
            waves: WaveManager::new(),
            targeting: TowerTargeting::new(),
            rng: SeededRng::new(&config.seed),
            wave: 0,
            is_paused,
            speed: 1.0,
            game_over_notified: false,
            observers: Vec::new(),
            journal: Vec::new(),
            commands: Vec::new(),
            targets: Vec::new(),
        })
    }

    /// Rebuilds a session from a save taken at a wave boundary.
    ///
    /// Towers are placed free of charge and the economy counters are copied
    /// from the save. The save's seed replaces the configured one.
    pub fn restore(config: EngineConfig, save: &SaveGame) -> Result<Self, SaveError> {
        let max_waves = config.content.economy.max_waves;
        if save.wave > max_waves {
            return Err(SaveError::Incompatible(format!(
                "wave {} exceeds the maximum of {max_waves}",
                save.wave
            )));
        }
        if save.lives <= 0 {
            return Err(SaveError::Incompatible(
                "the saved run already ended".to_owned(),
            ));
        }

        let config = EngineConfig {
            seed: save.seed.clone(),
            ..config
        };
        let mut engine =
            Self::new(config).map_err(|error| SaveError::Incompatible(error.to_string()))?;

        let mut events = Vec::new();
        for tower in &save.towers {
            let cell = CellCoord::new(tower.x, tower.y);
            world::apply(
                &mut engine.world,
                Command::RestoreTower {
                    kind: tower.tower_type_id.clone(),
                    cell,
                    level: tower.level,
                },
                &mut events,
            );
            if let Some(reason) = placement_rejection(&events) {
                return Err(SaveError::Incompatible(format!(
                    "tower `{}` at {cell}: {reason}",
                    tower.tower_type_id
                )));
            }
            engine.journal.append(&mut events);
        }

        world::apply(
            &mut engine.world,
            Command::RestoreEconomy {
                cash: save.cash,
                lives: save.lives,
                score: save.score,
            },
            &mut events,
        );
        engine.journal.append(&mut events);
        engine.wave = save.wave;

        info!(
            wave = save.wave,
            towers = save.towers.len(),
            "session restored"
        );
        Ok(engine)
    }

    /// Registers an observer for state changes and the game-over notification.
    pub fn subscribe(&mut self, observer: Box<dyn EngineObserver>) {
        self.observers.push(observer);
    }

    /// Places a tower, returning whether the placement succeeded.
    pub fn place_tower(&mut self, kind: &TowerTypeId, x: u32, y: u32) -> bool {
        self.try_place_tower(kind, x, y).is_ok()
    }

    /// Places a tower, reporting why a placement was refused.
    pub fn try_place_tower(
        &mut self,
        kind: &TowerTypeId,
        x: u32,
        y: u32,
    ) -> Result<TowerId, PlacementError> {
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::PlaceTower {
                kind: kind.clone(),
                cell: CellCoord::new(x, y),
            },
            &mut events,
        );

        let outcome = events
            .iter()
            .find_map(|event| match event {
                Event::TowerPlaced { tower, .. } => Some(Ok(*tower)),
                Event::TowerPlacementRejected { reason, .. } => Some(Err(*reason)),
                _ => None,
            })
            .unwrap_or(Err(PlacementError::UnknownTower));

        match outcome {
            Ok(tower) => info!(%tower, kind = %kind, x, y, "tower placed"),
            Err(PlacementError::UnknownTower) => warn!(kind = %kind, "unknown tower type"),
            Err(reason) => debug!(kind = %kind, x, y, %reason, "placement refused"),
        }

        self.journal.append(&mut events);
        if outcome.is_ok() {
            self.notify_state_changed();
        }
        outcome
    }

    /// Reports whether a tower could be placed without changing anything.
    pub fn can_place_tower(&mut self, kind: &TowerTypeId, x: u32, y: u32) -> bool {
        self.world
            .check_placement(kind, CellCoord::new(x, y))
            .is_ok()
    }

    /// Sells a tower and returns the refunded cash.
    ///
    /// Returns `None` when the tower does not exist or the run is over.
    pub fn sell_tower(&mut self, tower: TowerId) -> Option<u32> {
        if self.is_game_over() {
            return None;
        }

        let mut events = Vec::new();
        world::apply(&mut self.world, Command::SellTower { tower }, &mut events);
        let refund = events.iter().find_map(|event| match event {
            Event::TowerSold { refund, .. } => Some(*refund),
            _ => None,
        });

        if refund.is_some() {
            self.journal.append(&mut events);
            self.notify_state_changed();
        }
        refund
    }

    /// Raises a tower to its next level, returning the level reached.
    pub fn upgrade_tower(&mut self, tower: TowerId) -> Result<u32, UpgradeError> {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::UpgradeTower { tower }, &mut events);
        let outcome = events
            .iter()
            .find_map(|event| match event {
                Event::TowerUpgraded { level, .. } => Some(Ok(*level)),
                Event::TowerUpgradeRejected { reason, .. } => Some(Err(*reason)),
                _ => None,
            })
            .unwrap_or(Err(UpgradeError::MissingTower));

        self.journal.append(&mut events);
        if outcome.is_ok() {
            self.notify_state_changed();
        }
        outcome
    }

    /// Starts the next wave.
    ///
    /// Refused once the maximum wave is reached, after game over, or when the
    /// content does not define the next wave.
    pub fn start_wave(&mut self) -> bool {
        if self.is_game_over() {
            return false;
        }
        let max_waves = query::content(&self.world).economy.max_waves;
        if self.wave >= max_waves {
            warn!(wave = self.wave, max_waves, "maximum wave reached");
            return false;
        }

        let next = self.wave + 1;
        let mut events = Vec::new();
        if !self
            .waves
            .start_wave(next, query::content(&self.world), &mut events)
        {
            return false;
        }

        self.wave = next;
        self.journal.append(&mut events);
        self.notify_state_changed();
        true
    }

    /// Pauses or resumes the simulation. A finished run stays paused.
    pub fn set_paused(&mut self, paused: bool) {
        if !paused && self.is_game_over() {
            warn!("cannot resume a finished run");
            return;
        }
        if self.is_paused != paused {
            info!(paused, "pause toggled");
        }
        self.is_paused = paused;
        self.notify_state_changed();
    }

    /// Sets the simulation speed multiplier.
    ///
    /// Negative or non-finite multipliers are ignored.
    pub fn set_speed(&mut self, multiplier: f32) {
        if !multiplier.is_finite() || multiplier < 0.0 {
            warn!(multiplier, "ignoring invalid speed multiplier");
            return;
        }
        info!(speed = multiplier, "speed changed");
        self.speed = multiplier;
        self.notify_state_changed();
    }

    /// Advances the simulation by `delta` scaled by the speed multiplier.
    ///
    /// Runs the wave manager, tower targeting and firing, creep motion and
    /// projectile motion, in that order. Does nothing while paused or after
    /// game over.
    pub fn update(&mut self, delta: Duration) {
        if self.is_paused || self.is_game_over() {
            return;
        }

        let dt = Duration::try_from_secs_f64(delta.as_secs_f64() * f64::from(self.speed))
            .unwrap_or(Duration::MAX);
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt }, &mut events);

        self.waves.handle(&events, &mut self.rng, &mut self.commands);
        self.flush_commands(&mut events);

        let towers = query::tower_view(&self.world);
        let creeps = query::creep_view(&self.world);
        self.targeting.handle(&towers, &creeps, &mut self.targets);
        queue_volley(&towers, &self.targets, &mut self.commands);
        self.flush_commands(&mut events);

        world::apply(&mut self.world, Command::AdvanceCreeps { dt }, &mut events);
        world::apply(
            &mut self.world,
            Command::AdvanceProjectiles { dt },
            &mut events,
        );

        if !query::is_game_over(&self.world) {
            let mut completed = Vec::new();
            self.waves
                .settle(query::creeps_alive(&self.world), &mut completed);
            for event in completed {
                if let Event::WaveCompleted { wave } = event {
                    events.push(event);
                    world::apply(&mut self.world, Command::GrantWaveBonus { wave }, &mut events);
                } else {
                    events.push(event);
                }
            }
        }

        let ended = events
            .iter()
            .any(|event| matches!(event, Event::GameOver { .. }));
        self.journal.append(&mut events);

        if ended {
            self.is_paused = true;
        }
        self.notify_state_changed();
        if ended {
            self.notify_game_over();
        }
    }

    /// Captures the run state handed to hosts.
    #[must_use]
    pub fn snapshot(&self) -> RunSnapshot {
        let economy = query::economy(&self.world);
        RunSnapshot {
            wave: self.wave,
            lives: economy.lives,
            cash: economy.cash,
            score: economy.score,
            is_paused: self.is_paused,
            speed: self.speed,
            seed: self.rng.seed().to_owned(),
        }
    }

    /// Captures a save of the current placements and economy.
    ///
    /// Saves are meant to be taken between waves; creeps and projectiles in
    /// flight are not recorded.
    #[must_use]
    pub fn save(&self, timestamp: u64) -> SaveGame {
        let economy = query::economy(&self.world);
        SaveGame {
            wave: self.wave,
            lives: economy.lives,
            cash: economy.cash,
            score: economy.score,
            towers: query::saved_towers(&self.world),
            seed: self.rng.seed().to_owned(),
            timestamp,
        }
    }

    /// Builds the final-score payload for the submission collaborator.
    #[must_use]
    pub fn score_submission(&self, mode: impl Into<String>, duration: Duration) -> ScoreSubmission {
        ScoreSubmission {
            score: query::economy(&self.world).score,
            mode: mode.into(),
            wave: self.wave,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            seed: self.rng.seed().to_owned(),
        }
    }

    /// Drains the events recorded since the previous call.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.journal)
    }

    /// Read-only access to the authoritative world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Highest wave started so far.
    #[must_use]
    pub fn wave(&self) -> u32 {
        self.wave
    }

    /// Session seed.
    #[must_use]
    pub fn seed(&self) -> &str {
        self.rng.seed()
    }

    /// Whether the simulation is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// Active speed multiplier.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Reports whether lives ran out.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        query::is_game_over(&self.world)
    }

    /// Current cash, lives and score.
    #[must_use]
    pub fn economy(&self) -> Economy {
        query::economy(&self.world)
    }

    /// Reports whether any started wave has not completed yet.
    #[must_use]
    pub fn is_wave_active(&self) -> bool {
        self.waves.is_active()
    }

    /// Spawn progress of the waves that have not completed.
    #[must_use]
    pub fn wave_progress(&self) -> Vec<WaveProgress> {
        self.waves.progress()
    }

    /// Read-only view of the placed towers.
    #[must_use]
    pub fn towers(&self) -> TowerView {
        query::tower_view(&self.world)
    }

    /// Read-only view of the creeps on the field.
    #[must_use]
    pub fn creeps(&self) -> CreepView {
        query::creep_view(&self.world)
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> Vec<ProjectileSnapshot> {
        query::projectiles(&self.world)
    }

    /// Path points from spawn to goal.
    #[must_use]
    pub fn path(&self) -> &[CellCoord] {
        query::path(&self.world)
    }

    fn flush_commands(&mut self, events: &mut Vec<Event>) {
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, events);
        }
    }

    fn notify_state_changed(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for observer in &mut self.observers {
            observer.state_changed(&snapshot);
        }
    }

    fn notify_game_over(&mut self) {
        if self.game_over_notified {
            return;
        }
        self.game_over_notified = true;
        let snapshot = self.snapshot();
        info!(wave = snapshot.wave, score = snapshot.score, "game over");
        for observer in &mut self.observers {
            observer.game_over(&snapshot);
        }
    }
}

fn placement_rejection(events: &[Event]) -> Option<PlacementError> {
    events.iter().find_map(|event| match event {
        Event::TowerPlacementRejected { reason, .. } => Some(*reason),
        _ => None,
    })
}
