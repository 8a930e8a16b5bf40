#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave manager that turns spawn-group schedules into spawn commands.
//!
//! Every started wave keeps one countdown per spawn group. Groups of the same
//! wave, and groups of overlapping waves, advance concurrently on each
//! `Event::TimeAdvanced`. Interval jitter and elite rolls draw from the
//! session [`SeededRng`], so a seed always yields the same encounter.

use std::time::Duration;

use gridguard_core::{Command, Event, GameContent, SpawnGroup};
use gridguard_rng::SeededRng;
use tracing::{debug, info, warn};

/// Spawn progress of a single wave, exposed to hosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveProgress {
    /// Wave number, starting at one.
    pub wave: u32,
    /// Creeps spawned so far.
    pub spawned: u32,
    /// Creeps the wave spawns in total.
    pub total: u32,
}

impl WaveProgress {
    /// Reports whether every spawn group of the wave ran out.
    #[must_use]
    pub const fn exhausted(&self) -> bool {
        self.spawned >= self.total
    }
}

/// Pure system that schedules creep spawns for started waves.
#[derive(Debug, Default)]
pub struct WaveManager {
    active: Vec<ActiveWave>,
}

impl WaveManager {
    /// Creates a wave manager with no active waves.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts wave `number` using its definition from `content`.
    ///
    /// An undefined wave is a no-op that reports `false`; callers are
    /// responsible for not exceeding the maximum wave count.
    pub fn start_wave(
        &mut self,
        number: u32,
        content: &GameContent,
        out_events: &mut Vec<Event>,
    ) -> bool {
        let Some(definition) = content.wave(number) else {
            warn!(wave = number, "ignoring start of undefined wave");
            return false;
        };

        let groups: Vec<GroupProgress> = definition
            .groups
            .iter()
            .map(GroupProgress::new)
            .collect();
        info!(wave = number, groups = groups.len(), "wave started");
        self.active.push(ActiveWave {
            number,
            groups,
            spawned: 0,
        });
        out_events.push(Event::WaveStarted { wave: number });
        true
    }

    /// Consumes tick events and emits `Command::SpawnCreep` for every due spawn.
    pub fn handle(&mut self, events: &[Event], rng: &mut SeededRng, out: &mut Vec<Command>) {
        if self.active.is_empty() {
            return;
        }

        let mut elapsed = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt, .. } = event {
                elapsed = elapsed.saturating_add(*dt);
            }
        }

        for wave in &mut self.active {
            for group in &mut wave.groups {
                let spawned = group.advance(elapsed, wave.number, rng, out);
                wave.spawned = wave.spawned.saturating_add(spawned);
            }
        }
    }

    /// Retires exhausted waves once the field is clear.
    ///
    /// A wave completes when all of its groups spawned their full count and
    /// `creeps_alive` is zero. Emits `Event::WaveCompleted` once per wave.
    pub fn settle(&mut self, creeps_alive: usize, out_events: &mut Vec<Event>) {
        if creeps_alive > 0 {
            return;
        }

        self.active.retain(|wave| {
            if !wave.exhausted() {
                return true;
            }
            info!(wave = wave.number, "wave completed");
            out_events.push(Event::WaveCompleted { wave: wave.number });
            false
        });
    }

    /// Reports whether any started wave has not completed yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.active.is_empty()
    }

    /// Progress of every wave that has not completed, in start order.
    #[must_use]
    pub fn progress(&self) -> Vec<WaveProgress> {
        self.active
            .iter()
            .map(|wave| WaveProgress {
                wave: wave.number,
                spawned: wave.spawned,
                total: wave.total(),
            })
            .collect()
    }
}

#[derive(Clone, Debug)]
struct ActiveWave {
    number: u32,
    groups: Vec<GroupProgress>,
    spawned: u32,
}

impl ActiveWave {
    fn total(&self) -> u32 {
        self.groups
            .iter()
            .map(|group| group.definition.count)
            .fold(0, u32::saturating_add)
    }

    fn exhausted(&self) -> bool {
        self.groups.iter().all(|group| group.remaining == 0)
    }
}

#[derive(Clone, Debug)]
struct GroupProgress {
    definition: SpawnGroup,
    remaining: u32,
    next_in: Duration,
}

impl GroupProgress {
    fn new(definition: &SpawnGroup) -> Self {
        Self {
            remaining: definition.count,
            next_in: definition.delay(),
            definition: definition.clone(),
        }
    }

    fn advance(
        &mut self,
        elapsed: Duration,
        wave: u32,
        rng: &mut SeededRng,
        out: &mut Vec<Command>,
    ) -> u32 {
        let mut budget = elapsed;
        let mut spawned = 0;

        while self.remaining > 0 {
            if self.next_in > budget {
                self.next_in -= budget;
                break;
            }
            budget -= self.next_in;

            let elite = self.definition.elite_chance > 0.0
                && rng.chance(f64::from(self.definition.elite_chance));
            debug!(wave, creep = %self.definition.creep, elite, "spawn due");
            out.push(Command::SpawnCreep {
                kind: self.definition.creep.clone(),
                wave,
                elite,
            });
            self.remaining -= 1;
            spawned += 1;
            self.next_in = self.next_gap(rng);
        }

        spawned
    }

    fn next_gap(&self, rng: &mut SeededRng) -> Duration {
        let interval = self.definition.interval();
        if self.remaining == 0 || self.definition.jitter_ms == 0 {
            return interval;
        }
        let jitter = rng.next_int(0, i64::from(self.definition.jitter_ms));
        interval + Duration::from_millis(u64::try_from(jitter).unwrap_or(0))
    }
}
