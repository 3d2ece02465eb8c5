//! Face animation model
//!
//! Pure state advanced by the render tick: the blink clock, the drifting
//! sleep particles, and a frame counter for the thinking dots. Rendering
//! lives in [`render`].

pub mod render;

use std::time::Duration;

use rand::Rng;

use crate::wake::{Snapshot, WakeState};

/// Time between blinks
pub const BLINK_INTERVAL: Duration = Duration::from_secs(3);

/// How long a blink keeps the eyes closed
pub const BLINK_DURATION: Duration = Duration::from_millis(300);

/// Interval between sleep particle spawns
pub const Z_SPAWN_INTERVAL: Duration = Duration::from_millis(800);

/// Particle lifetime from spawn to fade-out
pub const Z_LIFETIME: Duration = Duration::from_secs(3);

/// How long a fresh answer stays highlighted
pub const ANSWER_FLASH: Duration = Duration::from_millis(800);

/// One drifting "z" above a sleeping face
#[derive(Debug, Clone)]
pub struct ZParticle {
    /// Horizontal drift in columns over the full lifetime
    pub drift: f32,

    /// Rise height in rows over the full lifetime
    pub rise: f32,

    /// Large glyph instead of the small one
    pub big: bool,

    age: Duration,
}

impl ZParticle {
    fn spawn() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            drift: rng.gen_range(-4.0..4.0),
            rise: rng.gen_range(6.0..10.0),
            big: rng.gen_bool(0.5),
            age: Duration::ZERO,
        }
    }

    /// Lifetime progress in [0, 1]
    #[must_use]
    pub fn progress(&self) -> f32 {
        (self.age.as_secs_f32() / Z_LIFETIME.as_secs_f32()).min(1.0)
    }
}

/// Visual state advanced once per render tick
pub struct FaceModel {
    since_blink: Duration,
    spawn_clock: Duration,
    particles: Vec<ZParticle>,
    ticks: u64,
    flash_left: Duration,
    was_busy: bool,
}

impl FaceModel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            // start with the eyes open, not mid-blink
            since_blink: BLINK_DURATION,
            spawn_clock: Duration::ZERO,
            particles: Vec::new(),
            ticks: 0,
            flash_left: Duration::ZERO,
            was_busy: false,
        }
    }

    /// Advance clocks and particles by `dt`
    pub fn tick(&mut self, dt: Duration, snapshot: &Snapshot) {
        self.ticks = self.ticks.wrapping_add(1);

        // a request that just finished cleanly flashes the answer
        if self.was_busy && !snapshot.busy && snapshot.error.is_none() && snapshot.answer.is_some()
        {
            self.flash_left = ANSWER_FLASH;
        } else {
            self.flash_left = self.flash_left.saturating_sub(dt);
        }
        self.was_busy = snapshot.busy;

        self.since_blink += dt;
        if self.since_blink >= BLINK_INTERVAL {
            self.since_blink = Duration::ZERO;
        }

        if snapshot.state == WakeState::Asleep {
            self.spawn_clock += dt;
            if self.spawn_clock >= Z_SPAWN_INTERVAL {
                self.spawn_clock = Duration::ZERO;
                self.particles.push(ZParticle::spawn());
            }
            for particle in &mut self.particles {
                particle.age += dt;
            }
            self.particles.retain(|p| p.age < Z_LIFETIME);
        } else if !self.particles.is_empty() {
            self.particles.clear();
            self.spawn_clock = Duration::ZERO;
        }
    }

    /// Eyes are closed while asleep and during a blink
    #[must_use]
    pub fn eyes_open(&self, snapshot: &Snapshot) -> bool {
        snapshot.state == WakeState::Awake && self.since_blink >= BLINK_DURATION
    }

    /// The answer is inside its post-success flash window
    #[must_use]
    pub fn answer_flashing(&self) -> bool {
        self.flash_left > Duration::ZERO
    }

    #[must_use]
    pub fn particles(&self) -> &[ZParticle] {
        &self.particles
    }

    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Default for FaceModel {
    fn default() -> Self {
        Self::new()
    }
}
