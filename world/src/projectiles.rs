//! In-flight projectiles bound to a single creep.

use std::time::Duration;

use glam::Vec2;
use gridguard_core::{CreepId, ProjectileId, SlowEffect, TowerId, HIT_EPSILON};

/// Projectile carrying the stats of its tower at the moment it fired.
#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    pub(crate) id: ProjectileId,
    pub(crate) tower: TowerId,
    pub(crate) target: CreepId,
    pub(crate) position: Vec2,
    pub(crate) damage: u32,
    pub(crate) speed: f32,
    pub(crate) splash_radius: Option<f32>,
    pub(crate) slow: Option<SlowEffect>,
}

/// Outcome of moving a projectile for one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Flight {
    /// Still travelling.
    InFlight,
    /// Reached the target position.
    Impact,
}

impl Projectile {
    /// Moves toward `target` for `dt`, snapping onto it when the step covers the gap.
    pub(crate) fn advance(&mut self, dt: Duration, target: Vec2) -> Flight {
        let distance = self.position.distance(target);
        let step = self.speed * dt.as_secs_f32();
        if distance <= HIT_EPSILON || step >= distance {
            self.position = target;
            return Flight::Impact;
        }

        self.position += (target - self.position) / distance * step;
        Flight::InFlight
    }
}

/// Read-only view of a projectile for hosts.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Identifier of the projectile.
    pub id: ProjectileId,
    /// Tower that fired it.
    pub tower: TowerId,
    /// Creep it is bound to.
    pub target: CreepId,
    /// World-space position.
    pub position: Vec2,
    /// Damage resolved on impact.
    pub damage: u32,
    /// Area damage radius, if any.
    pub splash_radius: Option<f32>,
}

impl From<&Projectile> for ProjectileSnapshot {
    fn from(projectile: &Projectile) -> Self {
        Self {
            id: projectile.id,
            tower: projectile.tower,
            target: projectile.target,
            position: projectile.position,
            damage: projectile.damage,
            splash_radius: projectile.splash_radius,
        }
    }
}
