//! Authoritative tower state management utilities.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use gridguard_core::{
    CellCoord, SlowEffect, TowerDefinition, TowerId, TowerRole, TowerSnapshot, TowerTypeId,
};

const DAMAGE_PER_LEVEL: f32 = 0.25;
const RANGE_PER_LEVEL: f32 = 0.10;

/// Snapshot of a tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct TowerState {
    /// Identifier allocated by the world for the tower.
    pub(crate) id: TowerId,
    /// Content identifier of the tower.
    pub(crate) kind: TowerTypeId,
    /// Cell occupied by the tower.
    pub(crate) cell: CellCoord,
    /// World-space center of the occupied cell.
    pub(crate) position: Vec2,
    /// Stats copied from the definition at placement time.
    pub(crate) stats: TowerStats,
    /// Current level, starting at one.
    pub(crate) level: u32,
    /// Cash spent on the tower so far, including upgrades.
    pub(crate) invested: u32,
    /// Simulation time of the last shot or trap pulse.
    pub(crate) last_fired: Option<Duration>,
}

/// Level-one stats captured from a tower definition.
#[derive(Clone, Debug)]
pub(crate) struct TowerStats {
    pub(crate) role: TowerRole,
    pub(crate) blocks_path: bool,
    pub(crate) damage: u32,
    pub(crate) range: f32,
    pub(crate) cooldown: Duration,
    pub(crate) projectile_speed: f32,
    pub(crate) splash_radius: Option<f32>,
    pub(crate) slow: Option<SlowEffect>,
    pub(crate) upgrade_cost: u32,
    pub(crate) max_level: u32,
}

impl From<&TowerDefinition> for TowerStats {
    fn from(definition: &TowerDefinition) -> Self {
        Self {
            role: definition.role,
            blocks_path: definition.blocks_path,
            damage: definition.damage,
            range: definition.range,
            cooldown: definition.cooldown(),
            projectile_speed: definition.projectile_speed,
            splash_radius: definition.splash_radius,
            slow: definition.slow,
            upgrade_cost: definition.upgrade_cost,
            max_level: definition.max_level,
        }
    }
}

impl TowerState {
    /// Damage dealt per hit at the current level.
    pub(crate) fn damage(&self) -> u32 {
        let scale = 1.0 + DAMAGE_PER_LEVEL * self.bonus_levels();
        (self.stats.damage as f32 * scale).round() as u32
    }

    /// Targeting range at the current level.
    pub(crate) fn range(&self) -> f32 {
        self.stats.range * (1.0 + RANGE_PER_LEVEL * self.bonus_levels())
    }

    /// Price of raising the tower to its next level.
    pub(crate) fn upgrade_price(&self) -> u32 {
        self.stats.upgrade_cost.saturating_mul(self.level)
    }

    /// Remaining cooldown at simulation time `now`; zero means idle.
    pub(crate) fn ready_in(&self, now: Duration) -> Duration {
        let Some(last_fired) = self.last_fired else {
            return Duration::ZERO;
        };
        last_fired
            .checked_add(self.stats.cooldown)
            .map_or(Duration::MAX, |ready_at| ready_at.saturating_sub(now))
    }

    /// Read-only projection handed to systems.
    pub(crate) fn snapshot(&self, now: Duration) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            kind: self.kind.clone(),
            cell: self.cell,
            position: self.position,
            range: self.range(),
            level: self.level,
            fires: self.stats.role.fires(),
            ready_in: self.ready_in(now),
        }
    }

    fn bonus_levels(&self) -> f32 {
        self.level.saturating_sub(1) as f32
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    /// Inserts a tower built from `definition` and returns its identifier.
    pub(crate) fn insert(
        &mut self,
        definition: &TowerDefinition,
        cell: CellCoord,
        position: Vec2,
        level: u32,
        invested: u32,
    ) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = id.next();
        let _ = self.entries.insert(
            id,
            TowerState {
                id,
                kind: definition.id.clone(),
                cell,
                position,
                stats: TowerStats::from(definition),
                level,
                invested,
                last_fired: None,
            },
        );
        id
    }

    pub(crate) fn remove(&mut self, id: TowerId) -> Option<TowerState> {
        self.entries.remove(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&id)
    }

    /// Returns the tower occupying `cell`, if any.
    pub(crate) fn at(&self, cell: CellCoord) -> Option<&TowerState> {
        self.entries.values().find(|tower| tower.cell == cell)
    }

    /// Towers in identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TowerState> {
        self.entries.values_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
