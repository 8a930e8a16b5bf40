#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns tower targets into firing orders.
//!
//! Readiness travels with the tower view: a turret fires when it holds a
//! target and its cooldown reads zero. Walls and traps never fire, and a
//! target naming a tower missing from the view is dropped.

use gridguard_core::{Command, TowerSnapshot, TowerTarget, TowerView};

/// Queues one `Command::FireProjectile` per armed tower with a target.
///
/// `targets` must be ordered by tower identifier, as the targeting system
/// emits them. Both sequences are walked once in lockstep and the orders
/// keep that tower order.
pub fn queue_volley(towers: &TowerView, targets: &[TowerTarget], out: &mut Vec<Command>) {
    let mut armed = towers.iter().filter(|tower| is_armed(tower)).peekable();

    for target in targets {
        while armed.next_if(|tower| tower.id < target.tower).is_some() {}
        if armed.next_if(|tower| tower.id == target.tower).is_some() {
            out.push(Command::FireProjectile {
                tower: target.tower,
                target: target.creep,
            });
        }
    }
}

fn is_armed(tower: &TowerSnapshot) -> bool {
    tower.fires && tower.ready_in.is_zero()
}
