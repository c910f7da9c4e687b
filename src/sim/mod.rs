// sim/ - Effect entities
//
// Each effect owns its store. Stores are Structure-of-Arrays and compact
// in place while stepping, so removal never skips or revisits a neighbour.

mod particle;
mod ripple;

pub use particle::{step_body, Appearance, Body, Particles};
pub use ripple::{RippleLook, Ripples};

/// Something the animation driver can advance once per frame
pub trait Effect {
    /// Advance every live entity to `now` (ms, host clock) with a slice of `dt` seconds.
    /// Entities whose progress reached 1 are removed.
    fn step(&mut self, now: f64, dt: f32);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entity. Their handles are reported as retired.
    fn clear(&mut self);

    /// Handles removed since the last call
    fn take_retired(&mut self) -> Vec<u32>;
}

pub const DEFAULT_SEED: u32 = 0xDEADBEEF;

// Handles are exposed to JS through f32 buffers, keep them exact.
const HANDLE_MASK: u32 = 0x00FF_FFFF;

/// Visual handle allocator
#[derive(Debug, Default)]
pub(crate) struct Handles {
    next: u32,
}

impl Handles {
    pub fn next(&mut self) -> u32 {
        let h = self.next;
        self.next = (self.next + 1) & HANDLE_MASK;
        h
    }
}

// Random number generator (xorshift32)
#[inline(always)]
pub fn rand(rng: &mut u32) -> f32 {
    *rng ^= *rng << 13;
    *rng ^= *rng >> 17;
    *rng ^= *rng << 5;
    (*rng >> 8) as f32 * (1.0 / 16777216.0)
}

/// xorshift gets stuck on zero
pub fn seed(s: u32) -> u32 {
    if s == 0 { DEFAULT_SEED } else { s }
}

/// Progress of an entity born at `born` with lifetime `duration`, both in ms
#[inline]
pub fn progress(now: f64, born: f64, duration: f64) -> f32 {
    (((now - born) / duration).max(0.0)).min(1.0) as f32
}
