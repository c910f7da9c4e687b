// stage.rs - Everything the countdown page animates
//
// Two independent drivers (particles, ripples) plus the countdown that
// triggers them. Generic over the scheduler so native hosts and tests
// can pump frames by hand.

use crate::config::FxConfig;
use crate::countdown::{Countdown, Remaining};
use crate::driver::{Driver, FrameScheduler, Timing};
use crate::render::{particle_stride, Encoder};
use crate::sim::{Effect, Particles, Ripples};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Particles = 0,
    Ripples = 1,
}

impl Channel {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Channel::Particles),
            1 => Some(Channel::Ripples),
            _ => None,
        }
    }
}

pub struct Stage<S> {
    particles: Driver<Particles, S>,
    ripples: Driver<Ripples, S>,
    countdown: Countdown,
    remaining: Remaining,
    per_origin: u32,

    particle_out: Encoder,
    ripple_out: Encoder,
    particle_retired: Vec<u32>,
    ripple_retired: Vec<u32>,
}

impl<S: FrameScheduler> Stage<S> {
    pub fn new(config: &FxConfig, particle_scheduler: S, ripple_scheduler: S) -> Self {
        let timing = Timing::from(&config.physics);
        Self {
            particles: Driver::new(Particles::new(config), particle_scheduler).with_timing(timing),
            ripples: Driver::new(Ripples::new(&config.ripple), ripple_scheduler).with_timing(timing),
            countdown: Countdown::default(),
            remaining: Remaining::default(),
            per_origin: config.emission.per_origin,
            particle_out: Encoder::new(),
            ripple_out: Encoder::new(),
            particle_retired: Vec::new(),
            ripple_retired: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.particles.effect_mut().reseed(seed);
        self
    }

    pub fn set_target(&mut self, target_ms: i64) {
        self.countdown = Countdown::new(target_ms);
    }

    pub fn remaining(&self) -> Remaining {
        self.remaining
    }

    pub fn target_ms(&self) -> i64 {
        self.countdown.target_ms()
    }

    /// Poll the countdown (wall clock ms). On a minute change, bloom from every
    /// origin and send a ripple out from `center`. `now` is the frame clock.
    pub fn countdown_tick(
        &mut self,
        wall_ms: i64,
        now: f64,
        origins: &[[f32; 2]],
        center: [f32; 2],
    ) -> bool {
        let (remaining, changed) = self.countdown.tick(wall_ms);
        self.remaining = remaining;
        if !changed { return false; }

        log::info!("minute changed, {remaining} left");
        self.emit(origins, self.per_origin, now);
        self.ripple(center, now);
        true
    }

    pub fn emit(&mut self, origins: &[[f32; 2]], per_origin: u32, now: f64) -> usize {
        self.particles.spawn(|p| p.emit(origins, per_origin, now))
    }

    pub fn ripple(&mut self, [cx, cy]: [f32; 2], now: f64) -> u32 {
        self.ripples.spawn(|r| r.spawn(cx, cy, now))
    }

    /// Frame callback for one channel. Buffers are left alone when the
    /// callback is stale, so handles retired by `clear()` survive until read.
    pub fn frame(&mut self, channel: Channel, now: f64) {
        match channel {
            Channel::Particles => {
                if !self.particles.on_frame(now) { return; }
                self.particle_out.encode_particles(self.particles.effect());
                self.particle_retired = self.particles.effect_mut().take_retired();
            }
            Channel::Ripples => {
                if !self.ripples.on_frame(now) { return; }
                self.ripple_out.encode_ripples(self.ripples.effect());
                self.ripple_retired = self.ripples.effect_mut().take_retired();
            }
        }
    }

    /// Cancel pending frames on both channels
    pub fn stop(&mut self) {
        self.particles.stop();
        self.ripples.stop();
    }

    /// Stop and drop everything. Dropped handles show up as retired.
    pub fn clear(&mut self) {
        self.particles.clear();
        self.ripples.clear();
        self.particle_out.clear();
        self.ripple_out.clear();
        self.particle_retired = self.particles.effect_mut().take_retired();
        self.ripple_retired = self.ripples.effect_mut().take_retired();
    }

    pub fn is_running(&self, channel: Channel) -> bool {
        match channel {
            Channel::Particles => self.particles.is_running(),
            Channel::Ripples => self.ripples.is_running(),
        }
    }

    pub fn particles(&self) -> &Driver<Particles, S> {
        &self.particles
    }

    pub fn ripples(&self) -> &Driver<Ripples, S> {
        &self.ripples
    }

    pub fn particles_mut(&mut self) -> &mut Driver<Particles, S> {
        &mut self.particles
    }

    pub fn ripples_mut(&mut self) -> &mut Driver<Ripples, S> {
        &mut self.ripples
    }

    pub fn output(&self, channel: Channel) -> &Encoder {
        match channel {
            Channel::Particles => &self.particle_out,
            Channel::Ripples => &self.ripple_out,
        }
    }

    pub fn retired(&self, channel: Channel) -> &[u32] {
        match channel {
            Channel::Particles => &self.particle_retired,
            Channel::Ripples => &self.ripple_retired,
        }
    }

    pub fn particle_stride(&self) -> usize {
        particle_stride(self.particles.effect().trail_len())
    }
}
