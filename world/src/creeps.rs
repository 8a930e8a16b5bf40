//! Creep state and path-following movement.

use std::time::Duration;

use glam::Vec2;
use gridguard_core::{CreepDefinition, CreepId, CreepSnapshot, CreepTypeId, SlowEffect};

const ELITE_MULTIPLIER: u32 = 2;

/// Creep walking the path, owned by the world.
#[derive(Clone, Debug)]
pub(crate) struct Creep {
    pub(crate) id: CreepId,
    pub(crate) kind: CreepTypeId,
    pub(crate) position: Vec2,
    pub(crate) health: u32,
    pub(crate) max_health: u32,
    pub(crate) speed: f32,
    pub(crate) armor: u32,
    pub(crate) reward: u32,
    pub(crate) leak_damage: u32,
    /// Index of the waypoint the creep walks toward.
    pub(crate) path_index: usize,
    pub(crate) slow_amount: f32,
    pub(crate) slow_remaining: Duration,
}

impl Creep {
    /// Spawns a creep at the first waypoint, heading for the second.
    pub(crate) fn spawn(
        id: CreepId,
        definition: &CreepDefinition,
        elite: bool,
        start: Vec2,
    ) -> Self {
        let multiplier = if elite { ELITE_MULTIPLIER } else { 1 };
        let health = definition.health.saturating_mul(multiplier);
        Self {
            id,
            kind: definition.id.clone(),
            position: start,
            health,
            max_health: health,
            speed: definition.speed,
            armor: definition.armor,
            reward: definition.reward.saturating_mul(multiplier),
            leak_damage: definition.damage,
            path_index: 1,
            slow_amount: 0.0,
            slow_remaining: Duration::ZERO,
        }
    }

    /// Walks along `waypoints` for `dt` and reports whether the final waypoint was reached.
    ///
    /// The slow active at the start of the step applies to the whole step and
    /// then decays.
    pub(crate) fn advance(&mut self, dt: Duration, waypoints: &[Vec2]) -> bool {
        let mut budget = self.effective_speed() * dt.as_secs_f32();

        while let Some(&target) = waypoints.get(self.path_index) {
            let distance = self.position.distance(target);
            if distance <= budget {
                self.position = target;
                budget -= distance;
                self.path_index += 1;
            } else {
                self.position += (target - self.position) / distance * budget;
                break;
            }
        }

        self.slow_remaining = self.slow_remaining.saturating_sub(dt);
        if self.slow_remaining.is_zero() {
            self.slow_amount = 0.0;
        }

        self.path_index >= waypoints.len()
    }

    /// Movement speed after the active slow.
    pub(crate) fn effective_speed(&self) -> f32 {
        self.speed * (1.0 - self.slow_amount)
    }

    /// Applies `damage` reduced by armor, never less than one point.
    ///
    /// Returns the health actually removed.
    pub(crate) fn take_damage(&mut self, damage: u32) -> u32 {
        let applied = damage.saturating_sub(self.armor).max(1);
        let removed = applied.min(self.health);
        self.health -= removed;
        removed
    }

    /// Raises the slow to the stronger of the current and the new effect.
    pub(crate) fn apply_slow(&mut self, effect: SlowEffect) {
        self.slow_amount = self.slow_amount.max(effect.amount);
        self.slow_remaining = self.slow_remaining.max(effect.duration());
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.health == 0
    }

    pub(crate) fn snapshot(&self) -> CreepSnapshot {
        CreepSnapshot {
            id: self.id,
            kind: self.kind.clone(),
            position: self.position,
            health: self.health,
            max_health: self.max_health,
            path_index: self.path_index,
            slow_amount: self.slow_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute(armor: u32) -> CreepDefinition {
        CreepDefinition {
            id: CreepTypeId::new("brute"),
            name: "Brute".to_owned(),
            health: 100,
            speed: 10.0,
            armor,
            reward: 8,
            damage: 2,
        }
    }

    fn straight_line() -> Vec<Vec2> {
        vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0)]
    }

    #[test]
    fn armor_never_prevents_damage() {
        let mut creep = Creep::spawn(CreepId::new(0), &brute(50), false, Vec2::ZERO);
        assert_eq!(creep.take_damage(10), 1);
        assert_eq!(creep.take_damage(0), 1);
        assert_eq!(creep.take_damage(60), 10);
        assert_eq!(creep.health, 88);
    }

    #[test]
    fn damage_is_capped_by_remaining_health() {
        let mut creep = Creep::spawn(CreepId::new(0), &brute(0), false, Vec2::ZERO);
        assert_eq!(creep.take_damage(250), 100);
        assert!(creep.is_dead());
    }

    #[test]
    fn elites_double_health_and_reward() {
        let creep = Creep::spawn(CreepId::new(0), &brute(0), true, Vec2::ZERO);
        assert_eq!(creep.max_health, 200);
        assert_eq!(creep.reward, 16);
        assert_eq!(creep.leak_damage, 2);
    }

    #[test]
    fn movement_carries_over_waypoints() {
        let waypoints = straight_line();
        let mut creep = Creep::spawn(CreepId::new(0), &brute(0), false, waypoints[0]);

        assert!(!creep.advance(Duration::from_millis(1_500), &waypoints));
        assert_eq!(creep.path_index, 2);
        assert!((creep.position.x - 15.0).abs() < 1e-4);

        assert!(creep.advance(Duration::from_millis(500), &waypoints));
    }

    #[test]
    fn slow_takes_the_stronger_effect_and_decays() {
        let mut creep = Creep::spawn(CreepId::new(0), &brute(0), false, Vec2::ZERO);
        creep.apply_slow(SlowEffect {
            amount: 0.5,
            duration_ms: 1_000,
        });
        creep.apply_slow(SlowEffect {
            amount: 0.2,
            duration_ms: 3_000,
        });
        assert!((creep.slow_amount - 0.5).abs() < f32::EPSILON);
        assert_eq!(creep.slow_remaining, Duration::from_secs(3));
        assert!((creep.effective_speed() - 5.0).abs() < 1e-4);

        let waypoints = straight_line();
        let _ = creep.advance(Duration::from_secs(3), &waypoints);
        assert_eq!(creep.slow_amount, 0.0);
        assert!((creep.effective_speed() - 10.0).abs() < 1e-4);
    }
}
