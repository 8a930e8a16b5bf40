#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that computes deterministic tower targets from world snapshots.

use glam::Vec2;
use gridguard_core::{CreepId, CreepView, TowerId, TowerTarget, TowerView};

/// Tower targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    tower_workspace: Vec<TowerWorkspace>,
    creep_workspace: Vec<CreepCandidate>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes tower targets for the provided world snapshot.
    ///
    /// Every firing tower is paired with the closest creep inside its range.
    /// Candidates are scanned in spawn order and only a strictly closer creep
    /// replaces the current best, so the first-found creep wins ties. The
    /// output buffer is cleared before populating it with the latest
    /// assignments.
    pub fn handle(&mut self, towers: &TowerView, creeps: &CreepView, out: &mut Vec<TowerTarget>) {
        out.clear();

        if creeps.is_empty() {
            return;
        }

        self.prepare_tower_workspace(towers);
        if self.tower_workspace.is_empty() {
            return;
        }

        self.prepare_creep_workspace(creeps);

        for tower in &self.tower_workspace {
            let mut best: Option<BestCandidate> = None;

            for candidate in &self.creep_workspace {
                let distance = tower.position.distance(candidate.position);
                if distance > tower.range {
                    continue;
                }

                let replaces = match &best {
                    Some(existing) => distance < existing.distance,
                    None => true,
                };
                if replaces {
                    best = Some(BestCandidate {
                        creep: candidate.id,
                        distance,
                    });
                }
            }

            if let Some(best) = best {
                out.push(TowerTarget {
                    tower: tower.id,
                    creep: best.creep,
                    distance: best.distance,
                });
            }
        }
    }

    fn prepare_tower_workspace(&mut self, towers: &TowerView) {
        self.tower_workspace.clear();
        let (lower, _) = towers.iter().size_hint();
        self.tower_workspace.reserve(lower);

        for snapshot in towers.iter() {
            if !snapshot.fires || snapshot.range <= 0.0 {
                continue;
            }

            self.tower_workspace.push(TowerWorkspace {
                id: snapshot.id,
                position: snapshot.position,
                range: snapshot.range,
            });
        }
    }

    fn prepare_creep_workspace(&mut self, creeps: &CreepView) {
        self.creep_workspace.clear();
        self.creep_workspace.reserve(creeps.len());

        for snapshot in creeps.iter() {
            if snapshot.health == 0 {
                continue;
            }

            self.creep_workspace.push(CreepCandidate {
                id: snapshot.id,
                position: snapshot.position,
            });
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct TowerWorkspace {
    id: TowerId,
    position: Vec2,
    range: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct CreepCandidate {
    id: CreepId,
    position: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct BestCandidate {
    creep: CreepId,
    distance: f32,
}

#[cfg(test)]
mod tests {
    use super::TowerTargeting;
    use std::time::Duration;

    use glam::Vec2;
    use gridguard_core::{
        CellCoord, CreepId, CreepSnapshot, CreepTypeId, CreepView, TowerId, TowerSnapshot,
        TowerTarget, TowerTypeId, TowerView,
    };

    fn tower_snapshot(id: u32, position: (f32, f32), range: f32, fires: bool) -> TowerSnapshot {
        TowerSnapshot {
            id: TowerId::new(id),
            kind: TowerTypeId::new("arrow"),
            cell: CellCoord::new(0, 0),
            position: Vec2::new(position.0, position.1),
            range,
            level: 1,
            fires,
            ready_in: Duration::ZERO,
        }
    }

    fn creep_snapshot(id: u32, position: (f32, f32)) -> CreepSnapshot {
        CreepSnapshot {
            id: CreepId::new(id),
            kind: CreepTypeId::new("grunt"),
            position: Vec2::new(position.0, position.1),
            health: 10,
            max_health: 10,
            path_index: 1,
            slow_amount: 0.0,
        }
    }

    fn run(towers: Vec<TowerSnapshot>, creeps: Vec<CreepSnapshot>) -> Vec<TowerTarget> {
        let mut system = TowerTargeting::new();
        let mut out = Vec::new();
        system.handle(
            &TowerView::from_snapshots(towers),
            &CreepView::from_snapshots(creeps),
            &mut out,
        );
        out
    }

    #[test]
    fn targets_creep_within_range() {
        let out = run(
            vec![tower_snapshot(1, (0.0, 0.0), 50.0, true)],
            vec![creep_snapshot(2, (30.0, 40.0))],
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tower, TowerId::new(1));
        assert_eq!(out[0].creep, CreepId::new(2));
        assert!((out[0].distance - 50.0).abs() < 1e-4);
    }

    #[test]
    fn creep_outside_range_is_ignored() {
        let out = run(
            vec![tower_snapshot(1, (0.0, 0.0), 49.0, true)],
            vec![creep_snapshot(2, (30.0, 40.0))],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn closest_creep_wins() {
        let out = run(
            vec![tower_snapshot(1, (0.0, 0.0), 100.0, true)],
            vec![
                creep_snapshot(1, (60.0, 0.0)),
                creep_snapshot(2, (0.0, 20.0)),
                creep_snapshot(3, (40.0, 0.0)),
            ],
        );
        assert_eq!(out[0].creep, CreepId::new(2));
    }

    #[test]
    fn first_spawned_creep_wins_ties() {
        let out = run(
            vec![tower_snapshot(1, (0.0, 0.0), 100.0, true)],
            vec![creep_snapshot(9, (0.0, -30.0)), creep_snapshot(4, (30.0, 0.0))],
        );
        assert_eq!(out[0].creep, CreepId::new(4));
    }

    #[test]
    fn walls_and_traps_never_target() {
        let out = run(
            vec![tower_snapshot(1, (0.0, 0.0), 100.0, false)],
            vec![creep_snapshot(1, (10.0, 0.0))],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn every_tower_gets_its_own_target() {
        let out = run(
            vec![
                tower_snapshot(2, (100.0, 0.0), 30.0, true),
                tower_snapshot(1, (0.0, 0.0), 30.0, true),
            ],
            vec![creep_snapshot(1, (10.0, 0.0)), creep_snapshot(2, (90.0, 0.0))],
        );

        assert_eq!(
            out.iter().map(|target| (target.tower, target.creep)).collect::<Vec<_>>(),
            vec![
                (TowerId::new(1), CreepId::new(1)),
                (TowerId::new(2), CreepId::new(2)),
            ]
        );
    }

    #[test]
    fn stale_output_is_cleared_when_field_is_empty() {
        let mut system = TowerTargeting::new();
        let mut out = vec![TowerTarget {
            tower: TowerId::new(99),
            creep: CreepId::new(99),
            distance: 0.0,
        }];
        system.handle(
            &TowerView::from_snapshots(vec![tower_snapshot(1, (0.0, 0.0), 10.0, true)]),
            &CreepView::default(),
            &mut out,
        );
        assert!(out.is_empty());
    }
}
