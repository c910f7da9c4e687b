// ripple.rs - Expanding rings
//
// One ring per minute change, centred on the countdown display.
// No physics: every attribute is a function of progress.

use super::{progress, Effect, Handles};
use crate::config::RippleConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RippleLook {
    pub radius: f32,
    pub opacity: f32,
    pub border: f32,
}

impl RippleLook {
    pub fn at(p: f32, config: &RippleConfig) -> Self {
        let thinning = (config.border_start - config.border_end) * p;
        Self {
            radius: p * config.max_radius,
            opacity: 1.0 - p,
            border: (config.border_start - thinning).max(config.border_end),
        }
    }
}

pub struct Ripples {
    pub cx: Vec<f32>,
    pub cy: Vec<f32>,
    pub born: Vec<f64>,
    pub handle: Vec<u32>,
    pub look: Vec<RippleLook>,

    config: RippleConfig,
    handles: Handles,
    retired: Vec<u32>,
}

impl Ripples {
    pub fn new(config: &RippleConfig) -> Self {
        Self {
            cx: Vec::new(),
            cy: Vec::new(),
            born: Vec::new(),
            handle: Vec::new(),
            look: Vec::new(),
            config: config.clone(),
            handles: Handles::default(),
            retired: Vec::new(),
        }
    }

    /// Start a ring at (cx, cy), born at `now` (ms)
    pub fn spawn(&mut self, cx: f32, cy: f32, now: f64) -> u32 {
        let h = self.handles.next();
        self.cx.push(cx);
        self.cy.push(cy);
        self.born.push(now);
        self.handle.push(h);
        self.look.push(RippleLook::at(0.0, &self.config));
        log::debug!("ripple at ({cx}, {cy}), {} live", self.handle.len());
        h
    }
}

impl Effect for Ripples {
    fn step(&mut self, now: f64, _dt: f32) {
        let mut write = 0;

        for read in 0..self.handle.len() {
            let p = progress(now, self.born[read], self.config.duration);
            if p >= 1.0 {
                self.retired.push(self.handle[read]);
                continue;
            }

            self.cx[write] = self.cx[read];
            self.cy[write] = self.cy[read];
            self.born[write] = self.born[read];
            self.handle[write] = self.handle[read];
            self.look[write] = RippleLook::at(p, &self.config);
            write += 1;
        }

        self.cx.truncate(write);
        self.cy.truncate(write);
        self.born.truncate(write);
        self.handle.truncate(write);
        self.look.truncate(write);
    }

    fn len(&self) -> usize {
        self.handle.len()
    }

    fn clear(&mut self) {
        self.retired.append(&mut self.handle);
        self.cx.clear();
        self.cy.clear();
        self.born.clear();
        self.look.clear();
    }

    fn take_retired(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.retired)
    }
}
