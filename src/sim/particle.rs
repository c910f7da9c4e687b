// particle.rs - Bloom particles
//
// Short-lived dots thrown out from the countdown digits. They drift with
// drag, start falling after a delay, and fade through the palette.

use super::{progress, rand, seed, Effect, Handles, DEFAULT_SEED};
use crate::color::{Palette, Rgb};
use crate::config::{DampingMode, Emission, FxConfig, Physics};

use std::f32::consts::TAU;

// Glow radius at full opacity, px
const GLOW: f32 = 8.0;

/// Kinematic state, px and px/s
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// Advance one body by `dt` seconds, `elapsed` seconds after its spawn.
pub fn step_body(b: &mut Body, elapsed: f32, dt: f32, physics: &Physics) {
    let damping = match physics.damping_mode {
        DampingMode::PerFrame => physics.damping,
        DampingMode::Normalized => physics.damping.powf(dt * 60.0),
    };
    b.vx *= damping;
    b.vy *= damping;

    if elapsed >= physics.gravity_delay {
        if b.vy < 0.0 {
            b.vy *= physics.rise_damping;
            if b.vy > -physics.rise_cutoff {
                b.vy = 0.0;
            }
        }
        b.vy += physics.gravity * dt;
    }

    b.x += b.vx * dt;
    b.y += b.vy * dt;
}

/// Rendered look derived from progress
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Appearance {
    pub opacity: f32,
    pub scale: f32,
    pub color: Rgb,
    pub glow: f32,
}

impl Appearance {
    pub fn at(p: f32, palette: &Palette) -> Self {
        let opacity = 1.0 - p;
        Self {
            opacity,
            scale: 1.0 - 0.5 * p,
            color: palette.sample(p),
            glow: GLOW * opacity,
        }
    }
}

pub struct Particles {
    pub body: Vec<Body>,
    pub born: Vec<f64>,
    pub handle: Vec<u32>,
    pub look: Vec<Appearance>,
    /// Previous positions, newest first
    pub trail: Vec<Vec<[f32; 2]>>,

    physics: Physics,
    emission: Emission,
    palette: Palette,
    cap: Option<usize>,

    handles: Handles,
    retired: Vec<u32>,
    rng: u32,
}

impl Particles {
    pub fn new(config: &FxConfig) -> Self {
        Self {
            body: Vec::new(),
            born: Vec::new(),
            handle: Vec::new(),
            look: Vec::new(),
            trail: Vec::new(),
            physics: config.physics.clone(),
            emission: config.emission.clone(),
            palette: config.palette.clone(),
            cap: config.max_particles,
            handles: Handles::default(),
            retired: Vec::new(),
            rng: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, s: u32) -> Self {
        self.reseed(s);
        self
    }

    pub fn reseed(&mut self, s: u32) {
        self.rng = seed(s);
    }

    pub fn emission(&self) -> &Emission {
        &self.emission
    }

    pub fn trail_len(&self) -> usize {
        self.emission.trail_len
    }

    /// Spawn `per_origin` particles at each origin, born at `now` (ms).
    /// Returns how many were inserted.
    pub fn emit(&mut self, origins: &[[f32; 2]], per_origin: u32, now: f64) -> usize {
        let mut added = 0;
        let mut dropped = 0;

        for &[x, y] in origins {
            for _ in 0..per_origin {
                if self.cap.is_some_and(|cap| self.body.len() >= cap) {
                    dropped += 1;
                    continue;
                }
                let angle = rand(&mut self.rng) * TAU;
                let speed = self.emission.speed_min
                    + rand(&mut self.rng) * (self.emission.speed_max - self.emission.speed_min);
                self.push(Body { x, y, vx: angle.cos() * speed, vy: angle.sin() * speed }, now);
                added += 1;
            }
        }

        if dropped > 0 {
            log::warn!("particle cap reached, dropped {dropped}");
        }
        log::debug!("emitted {added} particles, {} live", self.body.len());
        added
    }

    /// Insert one particle with a known initial state
    pub fn push(&mut self, body: Body, now: f64) -> u32 {
        let h = self.handles.next();
        self.body.push(body);
        self.born.push(now);
        self.handle.push(h);
        self.look.push(Appearance::at(0.0, &self.palette));
        self.trail.push(Vec::with_capacity(self.emission.trail_len));
        h
    }

    fn remember(trail: &mut Vec<[f32; 2]>, len: usize, pos: [f32; 2]) {
        if len == 0 { return; }
        trail.insert(0, pos);
        trail.truncate(len);
    }
}

impl Effect for Particles {
    fn step(&mut self, now: f64, dt: f32) {
        let duration_ms = self.emission.duration as f64 * 1000.0;
        let mut write = 0;

        for read in 0..self.body.len() {
            let p = progress(now, self.born[read], duration_ms);
            if p >= 1.0 {
                self.retired.push(self.handle[read]);
                continue;
            }

            let elapsed = ((now - self.born[read]) / 1000.0) as f32;
            let mut b = self.body[read];
            Self::remember(&mut self.trail[read], self.emission.trail_len, [b.x, b.y]);
            step_body(&mut b, elapsed, dt, &self.physics);

            self.body[write] = b;
            self.born[write] = self.born[read];
            self.handle[write] = self.handle[read];
            self.look[write] = Appearance::at(p, &self.palette);
            self.trail.swap(write, read);
            write += 1;
        }

        self.body.truncate(write);
        self.born.truncate(write);
        self.handle.truncate(write);
        self.look.truncate(write);
        self.trail.truncate(write);
    }

    fn len(&self) -> usize {
        self.body.len()
    }

    fn clear(&mut self) {
        self.retired.append(&mut self.handle);
        self.body.clear();
        self.born.clear();
        self.look.clear();
        self.trail.clear();
    }

    fn take_retired(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.retired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_drag() -> Physics {
        Physics { damping: 1.0, ..Physics::default() }
    }

    #[test]
    fn damping_never_speeds_up_before_gravity() {
        let physics = Physics::default();
        let mut b = Body { x: 0.0, y: 0.0, vx: 120.0, vy: -90.0 };

        for _ in 0..10 {
            let before = b.vx.hypot(b.vy);
            step_body(&mut b, 0.0, 1.0 / 60.0, &physics);
            assert!(b.vx.hypot(b.vy) <= before);
        }
    }

    #[test]
    fn per_frame_damping_ignores_dt() {
        let physics = Physics::default();
        let mut slow = Body { vx: 100.0, ..Body::default() };
        let mut fast = slow;

        step_body(&mut slow, 0.0, 1.0 / 30.0, &physics);
        step_body(&mut fast, 0.0, 1.0 / 120.0, &physics);
        assert!((slow.vx - 98.0).abs() < 1e-4);
        assert!((fast.vx - 98.0).abs() < 1e-4);
    }

    #[test]
    fn normalized_damping_matches_per_frame_at_60fps() {
        let physics = Physics { damping_mode: DampingMode::Normalized, ..Physics::default() };
        let mut b = Body { vx: 100.0, ..Body::default() };

        step_body(&mut b, 0.0, 1.0 / 60.0, &physics);
        assert!((b.vx - 98.0).abs() < 1e-3);

        let mut half = Body { vx: 100.0, ..Body::default() };
        step_body(&mut half, 0.0, 1.0 / 120.0, &physics);
        step_body(&mut half, 0.0, 1.0 / 120.0, &physics);
        assert!((half.vx - b.vx).abs() < 1e-3);
    }

    #[test]
    fn split_steps_integrate_like_one_step() {
        let physics = no_drag();
        let start = Body { x: 10.0, y: 20.0, vx: 30.0, vy: -40.0 };

        let mut split = start;
        step_body(&mut split, 0.0, 0.01, &physics);
        step_body(&mut split, 0.01, 0.03, &physics);

        let mut whole = start;
        step_body(&mut whole, 0.0, 0.04, &physics);

        assert!((split.x - whole.x).abs() < 1e-4);
        assert!((split.y - whole.y).abs() < 1e-4);
    }

    #[test]
    fn gravity_waits_for_delay() {
        let physics = no_drag();
        let mut b = Body::default();

        step_body(&mut b, physics.gravity_delay * 0.5, 0.1, &physics);
        assert_eq!(b.vy, 0.0);

        step_body(&mut b, physics.gravity_delay, 0.1, &physics);
        assert!((b.vy - physics.gravity * 0.1).abs() < 1e-4);
    }

    #[test]
    fn slow_rise_snaps_to_zero_once_gravity_starts() {
        let physics = no_drag();
        let mut b = Body { vy: -2.0, ..Body::default() };

        // -2 * 0.9 = -1.8, above the cutoff
        step_body(&mut b, 1.0, 0.0, &physics);
        assert_eq!(b.vy, 0.0);

        let mut fast = Body { vy: -100.0, ..Body::default() };
        step_body(&mut fast, 1.0, 0.0, &physics);
        assert!((fast.vy + 90.0).abs() < 1e-4);
    }

    #[test]
    fn appearance_fades_and_shrinks() {
        let palette = Palette::bloom();
        let start = Appearance::at(0.0, &palette);
        let half = Appearance::at(0.5, &palette);

        assert_eq!(start.opacity, 1.0);
        assert_eq!(start.scale, 1.0);
        assert_eq!(start.glow, GLOW);
        assert_eq!(half.opacity, 0.5);
        assert_eq!(half.scale, 0.75);
        assert_eq!(half.glow, GLOW * 0.5);
    }

    #[test]
    fn emit_places_particles_at_origin() {
        let mut particles = Particles::new(&FxConfig::default()).with_seed(42);
        let added = particles.emit(&[[100.0, 100.0]], 1, 0.0);

        assert_eq!(added, 1);
        assert_eq!(particles.len(), 1);
        assert_eq!((particles.body[0].x, particles.body[0].y), (100.0, 100.0));

        let speed = particles.body[0].vx.hypot(particles.body[0].vy);
        let e = particles.emission();
        assert!(speed >= e.speed_min - 1e-3 && speed <= e.speed_max + 1e-3);
    }

    #[test]
    fn seeded_emission_is_reproducible() {
        let mut a = Particles::new(&FxConfig::default()).with_seed(9);
        let mut b = Particles::new(&FxConfig::default()).with_seed(9);
        a.emit(&[[0.0, 0.0], [5.0, 5.0]], 4, 0.0);
        b.emit(&[[0.0, 0.0], [5.0, 5.0]], 4, 0.0);

        assert_eq!(a.body, b.body);
    }

    #[test]
    fn cap_drops_overflow() {
        let config = FxConfig { max_particles: Some(5), ..FxConfig::default() };
        let mut particles = Particles::new(&config);

        assert_eq!(particles.emit(&[[0.0, 0.0]], 8, 0.0), 5);
        assert_eq!(particles.len(), 5);
    }

    #[test]
    fn expired_particles_are_removed_and_retired_once() {
        let mut particles = Particles::new(&FxConfig::default());
        particles.push(Body::default(), 0.0);
        particles.push(Body::default(), 1000.0);

        particles.step(1500.0, 0.016);
        assert_eq!(particles.len(), 1);
        assert_eq!(particles.handle, vec![1]);
        assert_eq!(particles.take_retired(), vec![0]);

        particles.step(1600.0, 0.016);
        assert!(particles.take_retired().is_empty());
    }

    #[test]
    fn compaction_keeps_fields_aligned() {
        let mut particles = Particles::new(&FxConfig::default());
        particles.push(Body { x: 1.0, ..Body::default() }, 0.0);
        particles.push(Body { x: 2.0, ..Body::default() }, 900.0);
        particles.push(Body { x: 3.0, ..Body::default() }, 0.0);
        particles.push(Body { x: 4.0, ..Body::default() }, 900.0);

        particles.step(1500.0, 0.0);

        assert_eq!(particles.handle, vec![1, 3]);
        let xs: Vec<f32> = particles.body.iter().map(|b| b.x).collect();
        assert_eq!(xs, vec![2.0, 4.0]);
        assert_eq!(particles.trail[0], vec![[2.0, 0.0]]);
        assert_eq!(particles.trail[1], vec![[4.0, 0.0]]);
    }

    #[test]
    fn trail_keeps_newest_positions() {
        let config = FxConfig::default();
        let mut particles = Particles::new(&config);
        particles.push(Body { vx: 60.0, ..Body::default() }, 0.0);

        for i in 1..=6 {
            particles.step(i as f64 * 10.0, 0.01);
        }

        let trail = &particles.trail[0];
        assert_eq!(trail.len(), config.emission.trail_len);
        assert!(trail[0][0] > trail[1][0]);
    }

    #[test]
    fn clear_retires_everything() {
        let mut particles = Particles::new(&FxConfig::default());
        particles.emit(&[[0.0, 0.0]], 3, 0.0);
        particles.clear();

        assert!(particles.is_empty());
        assert_eq!(particles.take_retired(), vec![0, 1, 2]);
    }
}
