// render.rs - Encode effect state to output buffers
//
// One flat f32 record per live entity, read from JS through
// ptr/len accessors:
//
//   particle: handle, x, y, opacity, scale, r, g, b, glow, trail_n,
//             then trail_len (x, y) pairs, newest first, unused slots 0
//   ripple:   handle, cx, cy, radius, opacity, border
//
// Colour channels are 0-255. Handles fit f32 exactly.

use crate::sim::{Particles, Ripples};

pub const PARTICLE_HEADER: usize = 10;
pub const RIPPLE_STRIDE: usize = 6;

pub fn particle_stride(trail_len: usize) -> usize {
    PARTICLE_HEADER + trail_len * 2
}

#[derive(Debug, Default)]
pub struct Encoder {
    out: Vec<f32>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.out.clear();
    }

    pub fn ptr(&self) -> *const f32 {
        self.out.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.out
    }

    /// Replace the buffer with one record per live particle
    pub fn encode_particles(&mut self, particles: &Particles) {
        let trail_len = particles.trail_len();
        self.out.clear();
        self.out.reserve(particles.body.len() * particle_stride(trail_len));

        for i in 0..particles.body.len() {
            let b = &particles.body[i];
            let look = &particles.look[i];
            let trail = &particles.trail[i];

            self.out.extend_from_slice(&[
                particles.handle[i] as f32,
                b.x,
                b.y,
                look.opacity,
                look.scale,
                look.color.r as f32,
                look.color.g as f32,
                look.color.b as f32,
                look.glow,
                trail.len() as f32,
            ]);
            for slot in 0..trail_len {
                let [x, y] = trail.get(slot).copied().unwrap_or([0.0, 0.0]);
                self.out.push(x);
                self.out.push(y);
            }
        }
    }

    /// Replace the buffer with one record per live ripple
    pub fn encode_ripples(&mut self, ripples: &Ripples) {
        self.out.clear();
        self.out.reserve(ripples.handle.len() * RIPPLE_STRIDE);

        for i in 0..ripples.handle.len() {
            let look = &ripples.look[i];
            self.out.extend_from_slice(&[
                ripples.handle[i] as f32,
                ripples.cx[i],
                ripples.cy[i],
                look.radius,
                look.opacity,
                look.border,
            ]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FxConfig, RippleConfig};
    use crate::sim::{Body, Effect};

    #[test]
    fn particle_records_have_fixed_stride() {
        let config = FxConfig::default();
        let mut particles = Particles::new(&config);
        particles.push(Body { x: 3.0, y: 4.0, ..Body::default() }, 0.0);
        particles.push(Body { x: 5.0, y: 6.0, ..Body::default() }, 0.0);
        particles.step(100.0, 0.0);

        let mut enc = Encoder::new();
        enc.encode_particles(&particles);

        let stride = particle_stride(config.emission.trail_len);
        assert_eq!(enc.len(), 2 * stride);

        let second = &enc.as_slice()[stride..];
        assert_eq!(&second[..3], &[1.0, 5.0, 6.0]);
        // one remembered position, rest zero-padded
        assert_eq!(second[9], 1.0);
        assert_eq!(&second[10..12], &[5.0, 6.0]);
        assert!(second[12..stride].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn ripple_records() {
        let mut ripples = Ripples::new(&RippleConfig::default());
        ripples.spawn(10.0, 20.0, 0.0);
        ripples.step(1000.0, 0.0);

        let mut enc = Encoder::new();
        enc.encode_ripples(&ripples);

        assert_eq!(enc.as_slice(), &[0.0, 10.0, 20.0, 400.0, 0.5, 3.0]);
    }

    #[test]
    fn empty_stores_encode_to_nothing() {
        let mut enc = Encoder::new();
        enc.encode_ripples(&Ripples::new(&RippleConfig::default()));
        assert!(enc.is_empty());
    }
}
