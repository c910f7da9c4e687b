// color.rs - Progress to colour mapping
//
// Piecewise linear interpolation across ordered waypoints.
// Pure functions only, shared by particles and the preview tool.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const CYAN: Rgb = Rgb::new(0, 255, 255);
    pub const BLUE: Rgb = Rgb::new(59, 130, 246);
    pub const PURPLE: Rgb = Rgb::new(79, 70, 229);
    pub const MAGENTA: Rgb = Rgb::new(255, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channel-wise lerp, rounded to the nearest integer
    pub fn lerp(self, to: Rgb, t: f32) -> Rgb {
        Rgb {
            r: lerp_channel(self.r, to.r, t),
            g: lerp_channel(self.g, to.g, t),
            b: lerp_channel(self.b, to.b, t),
        }
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Rgb::new(r, g, b)
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(c: Rgb) -> Self {
        [c.r, c.g, c.b]
    }
}

#[inline]
fn lerp_channel(a: u8, b: u8, t: f32) -> u8 {
    let v = a as f32 + (b as f32 - a as f32) * t;
    v.round().clamp(0.0, 255.0) as u8
}

/// A colour waypoint at a given progress threshold
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub at: f32,
    pub color: Rgb,
}

/// Ordered list of waypoints. Thresholds are expected to be ascending.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    stops: Vec<Stop>,
}

impl Palette {
    pub fn new(stops: Vec<Stop>) -> Self {
        Self { stops }
    }

    /// Cyan -> blue -> purple -> magenta
    pub fn bloom() -> Self {
        Self::new(vec![
            Stop { at: 0.0, color: Rgb::CYAN },
            Stop { at: 0.33, color: Rgb::BLUE },
            Stop { at: 0.66, color: Rgb::PURPLE },
            Stop { at: 1.0, color: Rgb::MAGENTA },
        ])
    }

    /// Two-stop cyan -> indigo fade
    pub fn classic() -> Self {
        Self::new(vec![
            Stop { at: 0.0, color: Rgb::CYAN },
            Stop { at: 1.0, color: Rgb::PURPLE },
        ])
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// True if there is at least one stop and thresholds never decrease
    pub fn is_ordered(&self) -> bool {
        !self.stops.is_empty() && self.stops.windows(2).all(|w| w[0].at <= w[1].at)
    }

    /// Colour at progress `p`. Out-of-range and NaN inputs are clamped.
    pub fn sample(&self, p: f32) -> Rgb {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };

        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Rgb::BLACK,
        };
        if p <= first.at { return first.color; }
        if p >= last.at { return last.color; }

        for w in self.stops.windows(2) {
            let (a, b) = (w[0], w[1]);
            if p > b.at { continue; }

            let span = b.at - a.at;
            if span <= 0.0 { return b.color; }
            return a.color.lerp(b.color, (p - a.at) / span);
        }

        last.color
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::bloom()
    }
}
