#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Gridguard simulation.
//!
//! The world owns every tower, creep and projectile together with the
//! economy counters. It only changes through [`apply`], which executes a
//! single [`Command`] and reports what happened as [`Event`] values.

mod creeps;
mod projectiles;
mod towers;

use std::{collections::BTreeSet, time::Duration};

use glam::Vec2;
use gridguard_core::{
    CellCoord, Command, ContentError, CreepId, CreepTypeId, Event, GameContent, PlacementError,
    ProjectileId, TowerId, TowerRole, TowerTypeId, UpgradeError,
};
use gridguard_system_pathfinding::{Grid, Pathfinder};
use tracing::{debug, info, warn};

use creeps::Creep;
use projectiles::{Flight, Projectile};
use towers::TowerRegistry;

pub use projectiles::ProjectileSnapshot;

/// Cash, lives and score of the running session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Economy {
    /// Available cash.
    pub cash: u32,
    /// Remaining lives; the run ends once this drops to zero or below.
    pub lives: i32,
    /// Accumulated score.
    pub score: u64,
}

/// Represents the authoritative Gridguard world state.
#[derive(Debug)]
pub struct World {
    content: GameContent,
    path: Vec<CellCoord>,
    path_cells: BTreeSet<CellCoord>,
    waypoints: Vec<Vec2>,
    terrain: BTreeSet<CellCoord>,
    pathfinder: Pathfinder,
    towers: TowerRegistry,
    creeps: Vec<Creep>,
    next_creep_id: CreepId,
    projectiles: Vec<Projectile>,
    next_projectile_id: ProjectileId,
    economy: Economy,
    game_over: bool,
    clock: Duration,
}

impl World {
    /// Creates a world for the provided content tables.
    ///
    /// Fails when the map has no path, when a path step skips cells or when no
    /// walkable route connects its spawn and goal.
    pub fn new(content: &GameContent) -> Result<Self, ContentError> {
        let map = &content.map;
        let (Some(spawn), Some(goal)) = (map.spawn(), map.goal()) else {
            return Err(ContentError::EmptyPath);
        };
        map.check_path_steps()?;

        let mut grid = Grid::new(map.width, map.height);
        for &cell in &map.blocked {
            let _ = grid.set_walkable(cell, false);
        }
        let pathfinder = Pathfinder::new(grid, spawn, goal);
        if !pathfinder.path_exists() {
            return Err(ContentError::Unreachable { spawn, goal });
        }

        let economy = Economy {
            cash: content.economy.starting_cash,
            lives: content.economy.starting_lives,
            score: 0,
        };

        Ok(Self {
            path: map.path.clone(),
            path_cells: map.path.iter().copied().collect(),
            waypoints: map
                .path
                .iter()
                .map(|cell| cell.center(map.tile_size))
                .collect(),
            terrain: map.blocked.iter().copied().collect(),
            pathfinder,
            towers: TowerRegistry::new(),
            creeps: Vec::new(),
            next_creep_id: CreepId::new(0),
            projectiles: Vec::new(),
            next_projectile_id: ProjectileId::new(0),
            game_over: economy.lives <= 0,
            economy,
            clock: Duration::ZERO,
            content: content.clone(),
        })
    }

    /// Checks whether a tower of `kind` could be bought and placed on `cell`.
    ///
    /// Runs the same validation as `Command::PlaceTower` without mutating
    /// anything: bounds, terrain, path cells, occupancy, cash and, for towers
    /// that block their cell, whether the spawn still reaches the goal.
    pub fn check_placement(
        &mut self,
        kind: &TowerTypeId,
        cell: CellCoord,
    ) -> Result<(), PlacementError> {
        self.validate_placement(kind, cell, true)
    }

    fn validate_placement(
        &mut self,
        kind: &TowerTypeId,
        cell: CellCoord,
        charge: bool,
    ) -> Result<(), PlacementError> {
        if self.game_over {
            return Err(PlacementError::GameOver);
        }
        let definition = self
            .content
            .tower(kind)
            .ok_or(PlacementError::UnknownTower)?;
        if !self.pathfinder.grid().contains(cell) {
            return Err(PlacementError::OutOfBounds);
        }
        if self.terrain.contains(&cell) {
            return Err(PlacementError::Blocked);
        }
        if self.path_cells.contains(&cell) {
            return Err(PlacementError::PathCell);
        }
        if self.towers.at(cell).is_some() {
            return Err(PlacementError::Occupied);
        }
        if charge && definition.cost > self.economy.cash {
            return Err(PlacementError::InsufficientFunds);
        }
        if definition.blocks_path && !self.pathfinder.can_place_tower(cell) {
            return Err(PlacementError::SeversPath);
        }
        Ok(())
    }

    fn build_tower(
        &mut self,
        kind: &TowerTypeId,
        cell: CellCoord,
        level: u32,
        charge: bool,
    ) -> Result<(TowerId, u32), PlacementError> {
        self.validate_placement(kind, cell, charge)?;
        let definition = self
            .content
            .tower(kind)
            .ok_or(PlacementError::UnknownTower)?;

        let level = level.clamp(1, definition.max_level);
        let invested = (1..level).fold(definition.cost, |total, reached| {
            total.saturating_add(definition.upgrade_cost.saturating_mul(reached))
        });
        let spent = if charge { definition.cost } else { 0 };
        let position = cell.center(self.content.map.tile_size);

        self.economy.cash -= spent;
        if definition.blocks_path {
            let _ = self.pathfinder.set_walkable(cell, false);
            debug_assert!(self.pathfinder.path_exists());
        }
        let id = self
            .towers
            .insert(definition, cell, position, level, invested);
        Ok((id, spent))
    }

    fn place_tower(
        &mut self,
        kind: TowerTypeId,
        cell: CellCoord,
        level: u32,
        charge: bool,
        out_events: &mut Vec<Event>,
    ) {
        match self.build_tower(&kind, cell, level, charge) {
            Ok((tower, cost)) => {
                debug!(%tower, kind = %kind, %cell, cost, "tower placed");
                out_events.push(Event::TowerPlaced {
                    tower,
                    kind,
                    cell,
                    cost,
                });
            }
            Err(reason) => {
                debug!(kind = %kind, %cell, %reason, "tower placement rejected");
                out_events.push(Event::TowerPlacementRejected { kind, cell, reason });
            }
        }
    }

    fn sell_tower(&mut self, tower: TowerId, out_events: &mut Vec<Event>) {
        let Some(state) = self.towers.remove(tower) else {
            debug!(%tower, "ignoring sale of missing tower");
            return;
        };
        if state.stats.blocks_path {
            let _ = self.pathfinder.set_walkable(state.cell, true);
        }

        let refund = self.content.economy.refund_for(state.invested);
        self.economy.cash = self.economy.cash.saturating_add(refund);
        debug!(%tower, refund, "tower sold");
        out_events.push(Event::TowerSold {
            tower,
            cell: state.cell,
            refund,
        });
    }

    fn upgrade_tower(&mut self, tower: TowerId, out_events: &mut Vec<Event>) {
        match self.raise_level(tower) {
            Ok((level, cost)) => {
                debug!(%tower, level, cost, "tower upgraded");
                out_events.push(Event::TowerUpgraded { tower, level, cost });
            }
            Err(reason) => {
                debug!(%tower, %reason, "tower upgrade rejected");
                out_events.push(Event::TowerUpgradeRejected { tower, reason });
            }
        }
    }

    fn raise_level(&mut self, tower: TowerId) -> Result<(u32, u32), UpgradeError> {
        let state = self
            .towers
            .get_mut(tower)
            .ok_or(UpgradeError::MissingTower)?;
        if !state.stats.role.fires() {
            return Err(UpgradeError::NotUpgradeable);
        }
        if state.level >= state.stats.max_level {
            return Err(UpgradeError::MaxLevel);
        }
        let price = state.upgrade_price();
        if price > self.economy.cash {
            return Err(UpgradeError::InsufficientFunds);
        }

        self.economy.cash -= price;
        state.level += 1;
        state.invested = state.invested.saturating_add(price);
        Ok((state.level, price))
    }

    fn spawn_creep(
        &mut self,
        kind: CreepTypeId,
        wave: u32,
        elite: bool,
        out_events: &mut Vec<Event>,
    ) {
        if self.game_over {
            return;
        }
        let Some(definition) = self.content.creep(&kind) else {
            warn!(creep = %kind, wave, "ignoring spawn of unknown creep");
            return;
        };
        let Some(&start) = self.waypoints.first() else {
            return;
        };

        let creep = self.next_creep_id;
        self.next_creep_id = creep.next();
        self.creeps
            .push(Creep::spawn(creep, definition, elite, start));
        debug!(%creep, kind = %kind, wave, elite, "creep spawned");
        out_events.push(Event::CreepSpawned {
            creep,
            kind,
            wave,
            elite,
        });
    }

    fn fire_projectile(&mut self, tower: TowerId, target: CreepId, out_events: &mut Vec<Event>) {
        if self.game_over {
            return;
        }
        let now = self.clock;
        let Some(state) = self.towers.get_mut(tower) else {
            debug!(%tower, "ignoring fire from missing tower");
            return;
        };
        if !state.stats.role.fires() || !state.ready_in(now).is_zero() {
            return;
        }
        if !self.creeps.iter().any(|creep| creep.id == target) {
            debug!(%tower, %target, "ignoring fire at missing creep");
            return;
        }

        let projectile = self.next_projectile_id;
        self.next_projectile_id = projectile.next();
        self.projectiles.push(Projectile {
            id: projectile,
            tower,
            target,
            position: state.position,
            damage: state.damage(),
            speed: state.stats.projectile_speed,
            splash_radius: state.stats.splash_radius,
            slow: state.stats.slow,
        });
        state.last_fired = Some(now);
        debug!(%tower, %target, %projectile, "projectile fired");
        out_events.push(Event::ProjectileFired {
            projectile,
            tower,
            target,
        });
    }

    fn advance_creeps(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.game_over {
            return;
        }
        self.pulse_traps(out_events);

        let waypoints = &self.waypoints;
        let mut leaked = Vec::new();
        self.creeps.retain_mut(|creep| {
            if creep.advance(dt, waypoints) {
                leaked.push((creep.id, creep.leak_damage));
                false
            } else {
                true
            }
        });

        for (creep, damage) in leaked {
            let penalty = i32::try_from(damage).unwrap_or(i32::MAX);
            self.economy.lives = self.economy.lives.saturating_sub(penalty);
            debug!(%creep, damage, lives = self.economy.lives, "creep leaked");
            out_events.push(Event::CreepLeaked {
                creep,
                damage,
                lives: self.economy.lives,
            });
        }

        if !self.game_over && self.economy.lives <= 0 {
            self.game_over = true;
            info!(score = self.economy.score, "lives depleted");
            out_events.push(Event::GameOver {
                lives: self.economy.lives,
                score: self.economy.score,
            });
        }
    }

    fn pulse_traps(&mut self, out_events: &mut Vec<Event>) {
        let now = self.clock;
        for trap in self.towers.iter_mut() {
            if trap.stats.role != TowerRole::Trap {
                continue;
            }
            let range = trap.range();
            let damage = trap.damage();
            let pulses = damage > 0 && trap.ready_in(now).is_zero();

            let mut struck = false;
            for creep in &mut self.creeps {
                if creep.position.distance(trap.position) > range {
                    continue;
                }
                if let Some(slow) = trap.stats.slow {
                    creep.apply_slow(slow);
                }
                if pulses {
                    let _ = creep.take_damage(damage);
                    struck = true;
                }
            }
            if struck {
                trap.last_fired = Some(now);
            }
        }
        self.collect_dead(out_events);
    }

    fn advance_projectiles(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.game_over {
            return;
        }

        let in_flight = std::mem::take(&mut self.projectiles);
        let mut remaining = Vec::with_capacity(in_flight.len());
        for mut projectile in in_flight {
            let Some(target) = self
                .creeps
                .iter()
                .find(|creep| creep.id == projectile.target)
                .map(|creep| creep.position)
            else {
                debug!(projectile = %projectile.id, target = %projectile.target, "projectile expired");
                out_events.push(Event::ProjectileExpired {
                    projectile: projectile.id,
                    target: projectile.target,
                });
                continue;
            };

            match projectile.advance(dt, target) {
                Flight::InFlight => remaining.push(projectile),
                Flight::Impact => self.resolve_impact(&projectile, target, out_events),
            }
        }
        self.projectiles = remaining;
    }

    fn resolve_impact(&mut self, projectile: &Projectile, impact: Vec2, out_events: &mut Vec<Event>) {
        let mut victims = 0;
        for creep in &mut self.creeps {
            let struck = match projectile.splash_radius {
                Some(radius) => creep.position.distance(impact) <= radius,
                None => creep.id == projectile.target,
            };
            if !struck {
                continue;
            }
            let _ = creep.take_damage(projectile.damage);
            if let Some(slow) = projectile.slow {
                creep.apply_slow(slow);
            }
            victims += 1;
        }

        out_events.push(Event::ProjectileHit {
            projectile: projectile.id,
            target: projectile.target,
            victims,
        });
        self.collect_dead(out_events);
    }

    fn collect_dead(&mut self, out_events: &mut Vec<Event>) {
        let mut fallen = Vec::new();
        self.creeps.retain(|creep| {
            if creep.is_dead() {
                fallen.push((creep.id, creep.reward));
                false
            } else {
                true
            }
        });

        for (creep, reward) in fallen {
            self.economy.cash = self.economy.cash.saturating_add(reward);
            let points = u64::from(reward).saturating_mul(self.content.economy.score_per_reward);
            self.economy.score = self.economy.score.saturating_add(points);
            debug!(%creep, reward, "creep killed");
            out_events.push(Event::CreepKilled { creep, reward });
        }
    }

    fn grant_wave_bonus(&mut self, wave: u32, out_events: &mut Vec<Event>) {
        let amount = self.content.economy.wave_bonus_for(wave);
        if amount == 0 {
            return;
        }
        self.economy.cash = self.economy.cash.saturating_add(amount);
        info!(wave, amount, "wave bonus granted");
        out_events.push(Event::WaveBonusGranted { wave, amount });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.clock = world.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced {
                dt,
                now: world.clock,
            });
        }
        Command::SpawnCreep { kind, wave, elite } => {
            world.spawn_creep(kind, wave, elite, out_events);
        }
        Command::PlaceTower { kind, cell } => world.place_tower(kind, cell, 1, true, out_events),
        Command::SellTower { tower } => world.sell_tower(tower, out_events),
        Command::UpgradeTower { tower } => world.upgrade_tower(tower, out_events),
        Command::FireProjectile { tower, target } => {
            world.fire_projectile(tower, target, out_events);
        }
        Command::AdvanceCreeps { dt } => world.advance_creeps(dt, out_events),
        Command::AdvanceProjectiles { dt } => world.advance_projectiles(dt, out_events),
        Command::GrantWaveBonus { wave } => world.grant_wave_bonus(wave, out_events),
        Command::RestoreTower { kind, cell, level } => {
            world.place_tower(kind, cell, level, false, out_events);
        }
        Command::RestoreEconomy { cash, lives, score } => {
            world.economy = Economy { cash, lives, score };
            world.game_over = lives <= 0;
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::{Economy, ProjectileSnapshot, World};
    use gridguard_core::{CellCoord, CreepView, GameContent, SavedTower, TowerView};
    use gridguard_system_pathfinding::Pathfinder;

    /// Content tables the world was built from.
    #[must_use]
    pub fn content(world: &World) -> &GameContent {
        &world.content
    }

    /// Path points from spawn to goal.
    #[must_use]
    pub fn path(world: &World) -> &[CellCoord] {
        &world.path
    }

    /// Walkability grid with the spawn and goal it guards.
    #[must_use]
    pub fn pathfinder(world: &World) -> &Pathfinder {
        &world.pathfinder
    }

    /// Current cash, lives and score.
    #[must_use]
    pub fn economy(world: &World) -> Economy {
        world.economy
    }

    /// Reports whether lives ran out.
    #[must_use]
    pub fn is_game_over(world: &World) -> bool {
        world.game_over
    }

    /// Simulation time accumulated through `Command::Tick`.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Number of creeps on the field.
    #[must_use]
    pub fn creeps_alive(world: &World) -> usize {
        world.creeps.len()
    }

    /// Number of placed towers.
    #[must_use]
    pub fn tower_count(world: &World) -> usize {
        world.towers.len()
    }

    /// Captures a read-only view of the placed towers.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        TowerView::from_snapshots(
            world
                .towers
                .iter()
                .map(|tower| tower.snapshot(world.clock))
                .collect(),
        )
    }

    /// Captures a read-only view of the creeps on the field.
    #[must_use]
    pub fn creep_view(world: &World) -> CreepView {
        CreepView::from_snapshots(world.creeps.iter().map(|creep| creep.snapshot()).collect())
    }

    /// Snapshots of the projectiles in flight, in firing order.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .iter()
            .map(ProjectileSnapshot::from)
            .collect()
    }

    /// Tower placements in the shape persisted by saves.
    #[must_use]
    pub fn saved_towers(world: &World) -> Vec<SavedTower> {
        world
            .towers
            .iter()
            .map(|tower| SavedTower {
                x: tower.cell.column(),
                y: tower.cell.row(),
                tower_type_id: tower.kind.clone(),
                level: tower.level,
            })
            .collect()
    }
}
