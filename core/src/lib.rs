#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Gridguard simulation.
//!
//! This crate defines the message surface that connects the engine, the
//! authoritative world, and pure systems. The engine submits [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.
//!
//! Static content (tower, creep and wave tables) lives in [`content`] and the
//! payloads handed to persistence collaborators live in [`save`].

pub mod content;
pub mod save;

use std::{fmt, time::Duration};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use content::{
    ContentError, CreepDefinition, EconomyConfig, GameContent, MapDefinition, SlowEffect,
    SpawnGroup, TowerDefinition, TowerRole, WaveDefinition,
};
pub use save::{SaveError, SaveGame, SavedTower, ScoreSubmission};

/// Distance below which a projectile counts as having reached its target.
pub const HIT_EPSILON: f32 = 0.5;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Advances the simulation clock by the provided (already speed-scaled) delta.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a creep of the given type enters the path at the spawn cell.
    SpawnCreep {
        /// Content identifier of the creep to spawn.
        kind: CreepTypeId,
        /// Wave that scheduled the spawn.
        wave: u32,
        /// Whether the creep spawns with elite stats.
        elite: bool,
    },
    /// Requests placement of a tower at the provided cell.
    PlaceTower {
        /// Content identifier of the tower to build.
        kind: TowerTypeId,
        /// Cell the tower should occupy.
        cell: CellCoord,
    },
    /// Requests removal of an existing tower in exchange for a refund.
    SellTower {
        /// Identifier of the tower being sold.
        tower: TowerId,
    },
    /// Requests that an existing tower is raised to its next level.
    UpgradeTower {
        /// Identifier of the tower being upgraded.
        tower: TowerId,
    },
    /// Requests that a tower launches a projectile at a creep.
    FireProjectile {
        /// Tower that fires.
        tower: TowerId,
        /// Creep the projectile is bound to.
        target: CreepId,
    },
    /// Moves every creep along the path and resolves trap auras and leaks.
    AdvanceCreeps {
        /// Duration of simulated time to integrate.
        dt: Duration,
    },
    /// Moves every projectile toward its target and resolves hits.
    AdvanceProjectiles {
        /// Duration of simulated time to integrate.
        dt: Duration,
    },
    /// Pays out the completion bonus for a cleared wave.
    GrantWaveBonus {
        /// Wave that was cleared.
        wave: u32,
    },
    /// Rebuilds a tower from a save without charging for it.
    RestoreTower {
        /// Content identifier of the tower.
        kind: TowerTypeId,
        /// Cell the tower occupied.
        cell: CellCoord,
        /// Upgrade level reached.
        level: u32,
    },
    /// Overwrites the economy counters with values read from a save.
    RestoreEconomy {
        /// Available cash.
        cash: u32,
        /// Remaining lives.
        lives: i32,
        /// Accumulated score.
        score: u64,
    },
}

/// Events broadcast after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
        /// Simulation clock after the tick.
        now: Duration,
    },
    /// Confirms that a creep entered the path.
    CreepSpawned {
        /// Identifier assigned to the creep.
        creep: CreepId,
        /// Content identifier of the creep.
        kind: CreepTypeId,
        /// Wave that scheduled the spawn.
        wave: u32,
        /// Whether the creep carries elite stats.
        elite: bool,
    },
    /// Reports that a creep reached the final waypoint.
    CreepLeaked {
        /// Identifier of the creep that leaked.
        creep: CreepId,
        /// Lives removed from the base.
        damage: u32,
        /// Lives left after the leak.
        lives: i32,
    },
    /// Reports that a creep lost all of its health.
    CreepKilled {
        /// Identifier of the creep that died.
        creep: CreepId,
        /// Cash granted for the kill.
        reward: u32,
    },
    /// Confirms that a tower was placed.
    TowerPlaced {
        /// Identifier assigned to the tower.
        tower: TowerId,
        /// Content identifier of the tower.
        kind: TowerTypeId,
        /// Cell occupied by the tower.
        cell: CellCoord,
        /// Cash spent on the tower.
        cost: u32,
    },
    /// Reports that a tower placement request was refused.
    TowerPlacementRejected {
        /// Content identifier requested for placement.
        kind: TowerTypeId,
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a tower was sold.
    TowerSold {
        /// Identifier of the tower that was removed.
        tower: TowerId,
        /// Cell the tower occupied.
        cell: CellCoord,
        /// Cash refunded to the player.
        refund: u32,
    },
    /// Confirms that a tower gained a level.
    TowerUpgraded {
        /// Identifier of the upgraded tower.
        tower: TowerId,
        /// Level reached after the upgrade.
        level: u32,
        /// Cash spent on the upgrade.
        cost: u32,
    },
    /// Reports that an upgrade request was refused.
    TowerUpgradeRejected {
        /// Identifier of the tower targeted by the upgrade.
        tower: TowerId,
        /// Specific reason the upgrade failed.
        reason: UpgradeError,
    },
    /// Confirms that a projectile left a tower.
    ProjectileFired {
        /// Identifier assigned to the projectile.
        projectile: ProjectileId,
        /// Tower that fired.
        tower: TowerId,
        /// Creep the projectile is bound to.
        target: CreepId,
    },
    /// Confirms that a projectile resolved its damage.
    ProjectileHit {
        /// Identifier of the projectile.
        projectile: ProjectileId,
        /// Creep the projectile was bound to.
        target: CreepId,
        /// Number of creeps that took damage.
        victims: u32,
    },
    /// Reports that a projectile vanished because its target no longer exists.
    ProjectileExpired {
        /// Identifier of the projectile.
        projectile: ProjectileId,
        /// Creep the projectile was bound to.
        target: CreepId,
    },
    /// Announces that a wave began spawning.
    WaveStarted {
        /// Wave number, starting at one.
        wave: u32,
    },
    /// Announces that a wave spawned everything and the field is clear.
    WaveCompleted {
        /// Wave number, starting at one.
        wave: u32,
    },
    /// Confirms a wave completion payout.
    WaveBonusGranted {
        /// Wave that was cleared.
        wave: u32,
        /// Cash granted.
        amount: u32,
    },
    /// Terminal transition: lives dropped to zero or below.
    GameOver {
        /// Lives left, zero or below.
        lives: i32,
        /// Final score.
        score: u64,
    },
}

/// Reasons a tower placement request may be refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// The cell lies outside the grid.
    #[error("cell lies outside the grid")]
    OutOfBounds,
    /// The cell belongs to the creep path.
    #[error("cell belongs to the creep path")]
    PathCell,
    /// Another tower already occupies the cell.
    #[error("cell is already occupied by a tower")]
    Occupied,
    /// The cell is impassable terrain.
    #[error("cell is blocked terrain")]
    Blocked,
    /// Blocking the cell would disconnect the spawn from the goal.
    #[error("placing here would sever the path from spawn to goal")]
    SeversPath,
    /// The requested tower type is not defined in the content tables.
    #[error("unknown tower type")]
    UnknownTower,
    /// The player cannot afford the tower.
    #[error("insufficient cash")]
    InsufficientFunds,
    /// The run already ended.
    #[error("the game is over")]
    GameOver,
}

/// Reasons a tower upgrade request may be refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum UpgradeError {
    /// No tower with the provided identifier exists.
    #[error("no such tower")]
    MissingTower,
    /// The tower already reached its maximum level.
    #[error("tower is at its maximum level")]
    MaxLevel,
    /// Walls and traps cannot be upgraded.
    #[error("tower type cannot be upgraded")]
    NotUpgradeable,
    /// The player cannot afford the upgrade.
    #[error("insufficient cash")]
    InsufficientFunds,
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u32 {
                self.0
            }

            /// Returns the identifier that follows this one.
            #[must_use]
            pub const fn next(&self) -> Self {
                Self(self.0.wrapping_add(1))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Unique identifier assigned to a placed tower.
    TowerId
);
numeric_id!(
    /// Unique identifier assigned to a spawned creep.
    CreepId
);
numeric_id!(
    /// Unique identifier assigned to an in-flight projectile.
    ProjectileId
);

macro_rules! content_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a content identifier from its textual key.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Textual key of the identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

content_id!(
    /// Key of a tower definition in the content tables.
    TowerTypeId
);
content_id!(
    /// Key of a creep definition in the content tables.
    CreepTypeId
);

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// World-space center of the cell for the provided tile edge length.
    #[must_use]
    pub fn center(self, tile_size: f32) -> Vec2 {
        Vec2::new(
            (self.column as f32 + 0.5) * tile_size,
            (self.row as f32 + 0.5) * tile_size,
        )
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Immutable representation of a single creep's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct CreepSnapshot {
    /// Unique identifier assigned to the creep.
    pub id: CreepId,
    /// Content identifier of the creep.
    pub kind: CreepTypeId,
    /// World-space position.
    pub position: Vec2,
    /// Remaining health.
    pub health: u32,
    /// Health at spawn.
    pub max_health: u32,
    /// Index of the waypoint the creep is walking toward.
    pub path_index: usize,
    /// Active slow fraction in `[0, 1)`.
    pub slow_amount: f32,
}

/// Read-only snapshot describing all creeps on the field.
#[derive(Clone, Debug, Default)]
pub struct CreepView {
    snapshots: Vec<CreepSnapshot>,
}

impl CreepView {
    /// Creates a new creep view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<CreepSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured creep snapshots in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &CreepSnapshot> {
        self.snapshots.iter()
    }

    /// Number of creeps captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no creeps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<CreepSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Content identifier of the tower.
    pub kind: TowerTypeId,
    /// Cell occupied by the tower.
    pub cell: CellCoord,
    /// World-space center of the tower.
    pub position: Vec2,
    /// Current targeting range in world units.
    pub range: f32,
    /// Current upgrade level, starting at one.
    pub level: u32,
    /// Whether the tower ever fires projectiles.
    pub fires: bool,
    /// Remaining cooldown; zero means the tower may fire or pulse this tick.
    pub ready_in: Duration,
}

/// Read-only snapshot describing all towers placed on the grid.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Target assignment computed for a tower during a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerTarget {
    /// Tower that will fire.
    pub tower: TowerId,
    /// Creep selected as the target.
    pub creep: CreepId,
    /// Euclidean distance between tower and creep in world units.
    pub distance: f32,
}

/// Read-only projection of the run state handed to hosts after every mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Highest wave index started so far.
    pub wave: u32,
    /// Remaining lives.
    pub lives: i32,
    /// Available cash.
    pub cash: u32,
    /// Accumulated score.
    pub score: u64,
    /// Whether the simulation is paused.
    pub is_paused: bool,
    /// Active speed multiplier.
    pub speed: f32,
    /// Session seed.
    pub seed: String,
}
