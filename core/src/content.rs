//! Strongly typed content tables consumed as read-only configuration.
//!
//! The tables are deserialised from TOML once at startup, validated, and then
//! shared immutably for the whole session. [`GameContent::standard`] exposes
//! the bundled reference configuration.

use std::{collections::BTreeSet, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CellCoord, CreepTypeId, TowerTypeId};

const STANDARD_CONTENT: &str = include_str!("../content/standard.toml");

const DEFAULT_PROJECTILE_SPEED: f32 = 300.0;
const DEFAULT_MAX_LEVEL: u32 = 3;

/// Errors raised while loading or validating content tables.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The TOML document could not be parsed.
    #[error("failed to parse content tables: {0}")]
    Parse(#[from] toml::de::Error),
    /// Two tower definitions share an identifier.
    #[error("duplicate tower definition `{0}`")]
    DuplicateTower(TowerTypeId),
    /// Two creep definitions share an identifier.
    #[error("duplicate creep definition `{0}`")]
    DuplicateCreep(CreepTypeId),
    /// A tower definition carries nonsensical stats.
    #[error("tower `{id}` is invalid: {reason}")]
    InvalidTower {
        /// Offending tower.
        id: TowerTypeId,
        /// Human readable explanation.
        reason: &'static str,
    },
    /// A creep definition carries nonsensical stats.
    #[error("creep `{id}` is invalid: {reason}")]
    InvalidCreep {
        /// Offending creep.
        id: CreepTypeId,
        /// Human readable explanation.
        reason: &'static str,
    },
    /// A wave references a creep that is not defined.
    #[error("wave {wave} references unknown creep `{creep}`")]
    UnknownCreep {
        /// Wave number, starting at one.
        wave: u32,
        /// Missing creep identifier.
        creep: CreepTypeId,
    },
    /// A spawn group carries nonsensical parameters.
    #[error("wave {wave} has an invalid spawn group: {reason}")]
    InvalidGroup {
        /// Wave number, starting at one.
        wave: u32,
        /// Human readable explanation.
        reason: &'static str,
    },
    /// The economy settings cannot start a session.
    #[error("economy is invalid: {0}")]
    InvalidEconomy(&'static str),
    /// The map dimensions or tile size are unusable.
    #[error("map is invalid: {0}")]
    InvalidMap(&'static str),
    /// Neither an explicit path nor a route was provided.
    #[error("map does not define a path")]
    EmptyPath,
    /// Both an explicit path and a route were provided.
    #[error("map defines both `path` and `route`; pick one")]
    AmbiguousPath,
    /// Two consecutive route corners do not share a row or a column.
    #[error("route segment {from} -> {to} is not axis aligned")]
    DiagonalRoute {
        /// Segment start.
        from: CellCoord,
        /// Segment end.
        to: CellCoord,
    },
    /// Two consecutive path points are not cardinal neighbours.
    #[error("path step {from} -> {to} skips cells; consecutive points must be adjacent")]
    DisjointPath {
        /// Step start.
        from: CellCoord,
        /// Step end.
        to: CellCoord,
    },
    /// A path point lies outside the grid.
    #[error("path point {0} lies outside the grid")]
    PathOutOfBounds(CellCoord),
    /// A path point lies on blocked terrain.
    #[error("path point {0} lies on blocked terrain")]
    PathBlocked(CellCoord),
    /// Spawn and goal are not connected through walkable cells.
    #[error("no walkable route connects spawn {spawn} and goal {goal}")]
    Unreachable {
        /// First path point.
        spawn: CellCoord,
        /// Last path point.
        goal: CellCoord,
    },
}

/// Behavioural variant of a tower.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TowerRole {
    /// Acquires targets and fires projectiles.
    #[default]
    Turret,
    /// Never fires; exists to shape the walkable grid.
    Wall,
    /// Never fires; slows (and optionally hurts) creeps within its range.
    Trap,
}

impl TowerRole {
    /// Reports whether towers with this role ever fire projectiles.
    #[must_use]
    pub const fn fires(self) -> bool {
        matches!(self, Self::Turret)
    }
}

/// Movement penalty applied to creeps.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlowEffect {
    /// Fraction of speed removed, in `[0, 1)`.
    pub amount: f32,
    /// How long the slow lasts, in milliseconds.
    pub duration_ms: u64,
}

impl SlowEffect {
    /// Duration of the slow effect.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Stat table entry for a tower type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerDefinition {
    /// Key used by placement requests and saves.
    pub id: TowerTypeId,
    /// Display name.
    pub name: String,
    /// Purchase price.
    pub cost: u32,
    /// Damage per projectile hit (or per trap pulse).
    #[serde(default)]
    pub damage: u32,
    /// Targeting range in world units.
    #[serde(default)]
    pub range: f32,
    /// Shots per second.
    #[serde(default)]
    pub fire_rate: f32,
    /// Projectile travel speed in world units per second.
    #[serde(default = "default_projectile_speed")]
    pub projectile_speed: f32,
    /// Area damage radius around the impact point.
    #[serde(default)]
    pub splash_radius: Option<f32>,
    /// Slow applied to creeps this tower damages.
    #[serde(default)]
    pub slow: Option<SlowEffect>,
    /// Behavioural variant.
    #[serde(default)]
    pub role: TowerRole,
    /// Whether the tower makes its cell unwalkable.
    #[serde(default)]
    pub blocks_path: bool,
    /// Base price of one upgrade; multiplied by the current level.
    #[serde(default)]
    pub upgrade_cost: u32,
    /// Highest reachable level.
    #[serde(default = "default_max_level")]
    pub max_level: u32,
}

impl TowerDefinition {
    /// Minimum time between two shots, `1000 / fire_rate` milliseconds.
    ///
    /// A fire rate that is not a positive number never becomes ready.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        if !is_positive(self.fire_rate) {
            return Duration::MAX;
        }
        Duration::try_from_secs_f64(1.0 / f64::from(self.fire_rate)).unwrap_or(Duration::MAX)
    }

    fn validate(&self) -> Result<(), ContentError> {
        let invalid = |reason| ContentError::InvalidTower {
            id: self.id.clone(),
            reason,
        };

        if !is_non_negative(self.range) {
            return Err(invalid("range must be a finite, non-negative number"));
        }
        if !is_non_negative(self.fire_rate) {
            return Err(invalid("fire rate must be a finite, non-negative number"));
        }
        if !is_non_negative(self.projectile_speed) {
            return Err(invalid("projectile speed must be a finite, non-negative number"));
        }
        if self.role.fires() {
            if !is_positive(self.fire_rate) {
                return Err(invalid("turrets need a positive fire rate"));
            }
            if Duration::try_from_secs_f64(1.0 / f64::from(self.fire_rate)).is_err() {
                return Err(invalid("fire rate is too low to form a cooldown"));
            }
            if !is_positive(self.projectile_speed) {
                return Err(invalid("turrets need a positive projectile speed"));
            }
            if !is_positive(self.range) {
                return Err(invalid("turrets need a positive range"));
            }
        }
        if matches!(self.splash_radius, Some(radius) if !is_non_negative(radius)) {
            return Err(invalid("splash radius must be a finite, non-negative number"));
        }
        if let Some(slow) = self.slow {
            if !(0.0..1.0).contains(&slow.amount) {
                return Err(invalid("slow amount must lie in [0, 1)"));
            }
        }
        if self.max_level == 0 {
            return Err(invalid("max level must be at least one"));
        }
        Ok(())
    }
}

/// Stat table entry for a creep type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreepDefinition {
    /// Key used by wave definitions.
    pub id: CreepTypeId,
    /// Display name.
    pub name: String,
    /// Health at spawn.
    pub health: u32,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Flat damage reduction per hit.
    #[serde(default)]
    pub armor: u32,
    /// Cash granted on death.
    pub reward: u32,
    /// Lives removed when the creep leaks.
    #[serde(default = "default_leak_damage")]
    pub damage: u32,
}

/// Timed burst of identical creeps inside a wave.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnGroup {
    /// Creep spawned by this group.
    pub creep: CreepTypeId,
    /// Number of creeps to spawn.
    pub count: u32,
    /// Delay before the first spawn, in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,
    /// Gap between consecutive spawns, in milliseconds.
    pub interval_ms: u64,
    /// Upper bound of the random extra gap drawn per spawn, in milliseconds.
    #[serde(default)]
    pub jitter_ms: u32,
    /// Probability that a spawned creep is elite.
    #[serde(default)]
    pub elite_chance: f32,
}

impl SpawnGroup {
    /// Delay before the first spawn.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Gap between consecutive spawns.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Spawn groups that make up a single wave; groups run concurrently.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveDefinition {
    /// Spawn groups of the wave.
    pub groups: Vec<SpawnGroup>,
}

/// Grid dimensions, terrain and the creep path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapDefinition {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Edge length of a cell in world units.
    pub tile_size: f32,
    /// Explicit path points from spawn to goal.
    #[serde(default)]
    pub path: Vec<CellCoord>,
    /// Axis-aligned corners expanded into a cell-by-cell path on load.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route: Vec<CellCoord>,
    /// Impassable terrain cells.
    #[serde(default)]
    pub blocked: Vec<CellCoord>,
}

impl MapDefinition {
    /// Creates a map with an explicit path and no terrain.
    #[must_use]
    pub fn new(width: u32, height: u32, tile_size: f32, path: Vec<CellCoord>) -> Self {
        Self {
            width,
            height,
            tile_size,
            path,
            route: Vec::new(),
            blocked: Vec::new(),
        }
    }

    /// Reports whether the cell lies within the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }

    /// First path point.
    #[must_use]
    pub fn spawn(&self) -> Option<CellCoord> {
        self.path.first().copied()
    }

    /// Last path point.
    #[must_use]
    pub fn goal(&self) -> Option<CellCoord> {
        self.path.last().copied()
    }

    /// Checks that every path step moves exactly one cell in a cardinal
    /// direction.
    pub fn check_path_steps(&self) -> Result<(), ContentError> {
        match self
            .path
            .windows(2)
            .find(|pair| pair[0].manhattan_distance(pair[1]) != 1)
        {
            Some(pair) => Err(ContentError::DisjointPath {
                from: pair[0],
                to: pair[1],
            }),
            None => Ok(()),
        }
    }

    fn normalize(&mut self) -> Result<(), ContentError> {
        if self.width == 0 || self.height == 0 {
            return Err(ContentError::InvalidMap("grid dimensions must be positive"));
        }
        if !is_positive(self.tile_size) {
            return Err(ContentError::InvalidMap("tile size must be positive"));
        }

        match (self.path.is_empty(), self.route.is_empty()) {
            (false, false) => return Err(ContentError::AmbiguousPath),
            (true, true) => return Err(ContentError::EmptyPath),
            (true, false) => {
                self.path = expand_route(&self.route)?;
                self.route.clear();
            }
            (false, true) => {}
        }
        self.check_path_steps()?;

        let blocked: BTreeSet<CellCoord> = self.blocked.iter().copied().collect();
        for &cell in &self.path {
            if !self.contains(cell) {
                return Err(ContentError::PathOutOfBounds(cell));
            }
            if blocked.contains(&cell) {
                return Err(ContentError::PathBlocked(cell));
            }
        }
        if let Some(&cell) = self.blocked.iter().find(|cell| !self.contains(**cell)) {
            return Err(ContentError::PathOutOfBounds(cell));
        }
        Ok(())
    }
}

fn expand_route(route: &[CellCoord]) -> Result<Vec<CellCoord>, ContentError> {
    let mut path = Vec::new();
    let Some(&first) = route.first() else {
        return Err(ContentError::EmptyPath);
    };
    path.push(first);

    for pair in route.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        if from.column() != to.column() && from.row() != to.row() {
            return Err(ContentError::DiagonalRoute { from, to });
        }

        let mut cursor = from;
        while cursor != to {
            cursor = step_toward(cursor, to);
            path.push(cursor);
        }
    }
    Ok(path)
}

fn step_toward(from: CellCoord, to: CellCoord) -> CellCoord {
    let column = match from.column().cmp(&to.column()) {
        std::cmp::Ordering::Less => from.column() + 1,
        std::cmp::Ordering::Greater => from.column() - 1,
        std::cmp::Ordering::Equal => from.column(),
    };
    let row = if column != from.column() {
        from.row()
    } else {
        match from.row().cmp(&to.row()) {
            std::cmp::Ordering::Less => from.row() + 1,
            std::cmp::Ordering::Greater => from.row() - 1,
            std::cmp::Ordering::Equal => from.row(),
        }
    };
    CellCoord::new(column, row)
}

/// Starting resources and payout rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Cash at session start.
    pub starting_cash: u32,
    /// Lives at session start.
    pub starting_lives: i32,
    /// Percentage of the invested cash returned when selling a tower.
    pub refund_percent: u32,
    /// Score granted per unit of kill reward.
    pub score_per_reward: u64,
    /// Highest wave that may be started.
    pub max_waves: u32,
    /// Flat cash granted when a wave completes.
    pub wave_bonus: u32,
    /// Additional completion cash per wave number.
    pub wave_bonus_step: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_cash: 650,
            starting_lives: 20,
            refund_percent: 80,
            score_per_reward: 10,
            max_waves: 20,
            wave_bonus: 0,
            wave_bonus_step: 0,
        }
    }
}

impl EconomyConfig {
    /// Cash returned when selling something that cost `invested`.
    #[must_use]
    pub fn refund_for(&self, invested: u32) -> u32 {
        let refund = u64::from(invested) * u64::from(self.refund_percent) / 100;
        u32::try_from(refund).unwrap_or(u32::MAX)
    }

    /// Cash granted when the provided wave completes.
    #[must_use]
    pub fn wave_bonus_for(&self, wave: u32) -> u32 {
        self.wave_bonus
            .saturating_add(self.wave_bonus_step.saturating_mul(wave))
    }
}

/// Complete set of read-only tables for a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameContent {
    /// Grid, terrain and path.
    pub map: MapDefinition,
    /// Starting resources and payout rules.
    #[serde(default)]
    pub economy: EconomyConfig,
    /// Tower stat table.
    pub towers: Vec<TowerDefinition>,
    /// Creep stat table.
    pub creeps: Vec<CreepDefinition>,
    /// Wave schedule; wave `n` is stored at index `n - 1`.
    #[serde(default)]
    pub waves: Vec<WaveDefinition>,
}

impl GameContent {
    /// Loads the bundled reference configuration.
    pub fn standard() -> Result<Self, ContentError> {
        Self::from_toml_str(STANDARD_CONTENT)
    }

    /// Parses and validates content tables from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ContentError> {
        let content: Self = toml::from_str(source)?;
        content.validated()
    }

    /// Validates the tables and expands route shorthands into explicit paths.
    pub fn validated(mut self) -> Result<Self, ContentError> {
        self.map.normalize()?;
        if self.economy.starting_lives <= 0 {
            return Err(ContentError::InvalidEconomy("starting lives must be positive"));
        }

        let mut tower_ids = BTreeSet::new();
        for tower in &self.towers {
            if !tower_ids.insert(&tower.id) {
                return Err(ContentError::DuplicateTower(tower.id.clone()));
            }
            tower.validate()?;
        }

        let mut creep_ids = BTreeSet::new();
        for creep in &self.creeps {
            if !creep_ids.insert(&creep.id) {
                return Err(ContentError::DuplicateCreep(creep.id.clone()));
            }
            if creep.health == 0 {
                return Err(ContentError::InvalidCreep {
                    id: creep.id.clone(),
                    reason: "health must be positive",
                });
            }
            if !is_positive(creep.speed) {
                return Err(ContentError::InvalidCreep {
                    id: creep.id.clone(),
                    reason: "speed must be positive",
                });
            }
        }

        for (index, wave) in self.waves.iter().enumerate() {
            let number = u32::try_from(index + 1).unwrap_or(u32::MAX);
            for group in &wave.groups {
                if !creep_ids.contains(&group.creep) {
                    return Err(ContentError::UnknownCreep {
                        wave: number,
                        creep: group.creep.clone(),
                    });
                }
                if group.count > 1 && group.interval_ms == 0 {
                    return Err(ContentError::InvalidGroup {
                        wave: number,
                        reason: "groups spawning more than one creep need an interval",
                    });
                }
                if !(0.0..=1.0).contains(&group.elite_chance) {
                    return Err(ContentError::InvalidGroup {
                        wave: number,
                        reason: "elite chance must lie in [0, 1]",
                    });
                }
            }
        }

        Ok(self)
    }

    /// Looks up a tower definition by key.
    #[must_use]
    pub fn tower(&self, id: &TowerTypeId) -> Option<&TowerDefinition> {
        self.towers.iter().find(|tower| &tower.id == id)
    }

    /// Looks up a creep definition by key.
    #[must_use]
    pub fn creep(&self, id: &CreepTypeId) -> Option<&CreepDefinition> {
        self.creeps.iter().find(|creep| &creep.id == id)
    }

    /// Looks up the definition of wave `number`, counting from one.
    #[must_use]
    pub fn wave(&self, number: u32) -> Option<&WaveDefinition> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.waves.get(index)
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn is_non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

fn default_projectile_speed() -> f32 {
    DEFAULT_PROJECTILE_SPEED
}

fn default_max_level() -> u32 {
    DEFAULT_MAX_LEVEL
}

fn default_leak_damage() -> u32 {
    1
}
