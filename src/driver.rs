// driver.rs - Frame loop state machine
//
// One driver per effect. Idle until something is spawned, then asks the
// host for a frame, steps the effect, and keeps asking only while the
// effect still has live entities.

use crate::config::Physics;
use crate::sim::Effect;

/// Id returned by the host when a frame is requested
pub type FrameHandle = u32;

/// Host side of "call me on the next display refresh". `None` means the
/// host could not schedule anything.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> Option<FrameHandle>;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running(FrameHandle),
}

/// Frame slice limits, seconds
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    pub first_dt: f32,
    pub max_dt: f32,
}

impl Default for Timing {
    fn default() -> Self {
        Timing::from(&Physics::default())
    }
}

impl From<&Physics> for Timing {
    fn from(p: &Physics) -> Self {
        Self { first_dt: p.first_dt, max_dt: p.max_dt }
    }
}

pub struct Driver<E, S> {
    effect: E,
    scheduler: S,
    state: DriverState,
    timing: Timing,
    last_tick: Option<f64>,
}

impl<E: Effect, S: FrameScheduler> Driver<E, S> {
    pub fn new(effect: E, scheduler: S) -> Self {
        Self {
            effect,
            scheduler,
            state: DriverState::Idle,
            timing: Timing::default(),
            last_tick: None,
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn effect(&self) -> &E { &self.effect }
    pub fn effect_mut(&mut self) -> &mut E { &mut self.effect }
    pub fn scheduler(&self) -> &S { &self.scheduler }
    pub fn scheduler_mut(&mut self) -> &mut S { &mut self.scheduler }
    pub fn state(&self) -> DriverState { self.state }

    pub fn is_running(&self) -> bool {
        matches!(self.state, DriverState::Running(_))
    }

    /// Run `spawn` against the effect, then make sure a frame is pending.
    pub fn spawn<R>(&mut self, spawn: impl FnOnce(&mut E) -> R) -> R {
        let r = spawn(&mut self.effect);
        self.wake();
        r
    }

    /// Idle -> Running if there is anything to animate. No-op while running.
    pub fn wake(&mut self) {
        if self.is_running() || self.effect.is_empty() { return; }

        if self.schedule() {
            log::debug!("driver running, {} live", self.effect.len());
        }
    }

    /// Ask the host for the next frame. Stays Idle when it refuses, so the
    /// next spawn asks again.
    fn schedule(&mut self) -> bool {
        match self.scheduler.request_frame() {
            Some(handle) => {
                self.state = DriverState::Running(handle);
                true
            }
            None => {
                self.state = DriverState::Idle;
                self.last_tick = None;
                log::warn!("frame request refused, {} live entities parked", self.effect.len());
                false
            }
        }
    }

    /// Frame callback. `now` is the host timestamp in ms. Returns false for a
    /// stale callback that stepped nothing.
    pub fn on_frame(&mut self, now: f64) -> bool {
        // Stale callback after stop()
        if !self.is_running() { return false; }
        self.state = DriverState::Idle;

        let dt = match self.last_tick {
            Some(last) => (((now - last) / 1000.0) as f32).clamp(0.0, self.timing.max_dt),
            None => self.timing.first_dt,
        };
        self.last_tick = Some(now);

        self.effect.step(now, dt);

        if self.effect.is_empty() {
            self.last_tick = None;
            log::debug!("driver idle");
        } else {
            self.schedule();
        }
        true
    }

    /// Cancel the pending frame. Live entities stay where they are until
    /// the next spawn wakes the driver again.
    pub fn stop(&mut self) {
        if let DriverState::Running(handle) = self.state {
            self.scheduler.cancel_frame(handle);
            log::debug!("driver stopped");
        }
        self.state = DriverState::Idle;
        self.last_tick = None;
    }

    /// Stop and drop every entity
    pub fn clear(&mut self) {
        self.stop();
        self.effect.clear();
    }
}

/// Scheduler for hosts that pump frames themselves (tests, offline rendering).
/// While `refuse` is set every request is counted and turned down.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: Option<FrameHandle>,
    next: FrameHandle,
    pub requests: usize,
    pub cancels: usize,
    pub refuse: bool,
}

impl ManualScheduler {
    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Consume the pending request, as the host does right before firing it
    pub fn take_pending(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        self.requests += 1;
        if self.refuse { return None; }

        self.next += 1;
        self.pending = Some(self.next);
        self.pending
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
        self.cancels += 1;
    }
}

/// Pump frames `step_ms` apart starting at `start` until the driver idles
/// or `max_frames` have run. Returns the timestamp of the last frame.
pub fn pump<E: Effect>(
    driver: &mut Driver<E, ManualScheduler>,
    start: f64,
    step_ms: f64,
    max_frames: usize,
) -> f64 {
    let mut now = start;
    for _ in 0..max_frames {
        if driver.scheduler_mut().take_pending().is_none() { break; }
        driver.on_frame(now);
        now += step_ms;
    }
    now - step_ms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FxConfig;
    use crate::sim::{Body, Particles};

    fn driver() -> Driver<Particles, ManualScheduler> {
        Driver::new(Particles::new(&FxConfig::default()), ManualScheduler::default())
    }

    #[test]
    fn first_emit_schedules_exactly_one_frame() {
        let mut d = driver();
        assert_eq!(d.state(), DriverState::Idle);

        d.spawn(|p| p.emit(&[[0.0, 0.0]], 2, 0.0));
        assert!(d.is_running());
        assert_eq!(d.scheduler().requests, 1);

        d.spawn(|p| p.emit(&[[5.0, 5.0]], 2, 1.0));
        assert_eq!(d.scheduler().requests, 1);
        assert_eq!(d.effect().len(), 4);
    }

    #[test]
    fn empty_emit_stays_idle() {
        let mut d = driver();
        d.spawn(|p| p.emit(&[], 3, 0.0));

        assert_eq!(d.state(), DriverState::Idle);
        assert_eq!(d.scheduler().requests, 0);
    }

    #[test]
    fn goes_idle_on_the_tick_that_empties_the_store() {
        let mut d = driver();
        d.spawn(|p| p.push(Body::default(), 0.0));

        d.scheduler_mut().take_pending();
        d.on_frame(1000.0);
        assert!(d.is_running());
        assert_eq!(d.scheduler().requests, 2);

        d.scheduler_mut().take_pending();
        d.on_frame(1500.0);
        assert_eq!(d.state(), DriverState::Idle);
        assert!(d.effect().is_empty());
        assert_eq!(d.scheduler().requests, 2);
        assert_eq!(d.scheduler().pending(), None);
    }

    #[test]
    fn expiry_takes_the_whole_duration() {
        let mut d = driver();
        d.spawn(|p| p.emit(&[[100.0, 100.0]], 1, 0.0));

        let last = pump(&mut d, 0.0, 1000.0 / 60.0, 1000);

        assert!(d.effect().is_empty());
        assert!(last >= 1500.0);
        assert!(last < 1500.0 + 1000.0 / 60.0 + 1e-6);
        assert_eq!(d.effect_mut().take_retired(), vec![0]);
    }

    #[test]
    fn stop_cancels_pending_frame() {
        let mut d = driver();
        d.spawn(|p| p.emit(&[[0.0, 0.0]], 1, 0.0));

        d.stop();
        assert_eq!(d.state(), DriverState::Idle);
        assert_eq!(d.scheduler().cancels, 1);
        assert_eq!(d.scheduler().pending(), None);

        // A late callback is ignored
        d.on_frame(16.0);
        assert_eq!(d.scheduler().requests, 1);
        assert_eq!(d.effect().len(), 1);
    }

    #[test]
    fn spawn_after_stop_resumes() {
        let mut d = driver();
        d.spawn(|p| p.emit(&[[0.0, 0.0]], 1, 0.0));
        d.stop();

        d.spawn(|p| p.emit(&[[0.0, 0.0]], 1, 10.0));
        assert!(d.is_running());
        assert_eq!(d.scheduler().requests, 2);
    }

    #[test]
    fn stall_is_clamped_and_first_frame_is_assumed() {
        let timing = Timing { first_dt: 0.5, max_dt: 0.1 };
        let config = FxConfig::default();
        let physics = config.physics.clone();
        let mut d = Driver::new(Particles::new(&config), ManualScheduler::default())
            .with_timing(timing);
        d.spawn(|p| p.push(Body { vx: 100.0, ..Body::default() }, 0.0));

        d.scheduler_mut().take_pending();
        d.on_frame(0.0);
        let after_first = d.effect().body[0].x;
        assert!((after_first - 100.0 * physics.damping * 0.5).abs() < 1e-3);

        d.scheduler_mut().take_pending();
        d.on_frame(1000.0 * 0.2);
        let jump = d.effect().body[0].x - after_first;
        assert!(jump <= 100.0 * 0.1 + 1e-3);
    }

    #[test]
    fn refused_request_stays_idle_and_retries() {
        let mut d = driver();
        d.scheduler_mut().refuse = true;

        d.spawn(|p| p.emit(&[[0.0, 0.0]], 1, 0.0));
        d.spawn(|p| p.emit(&[[0.0, 0.0]], 1, 5.0));
        assert_eq!(d.state(), DriverState::Idle);
        assert_eq!(d.scheduler().requests, 2);
        assert_eq!(d.scheduler().pending(), None);
        assert_eq!(d.effect().len(), 2);

        d.scheduler_mut().refuse = false;
        d.spawn(|p| p.emit(&[[0.0, 0.0]], 1, 10.0));
        assert!(d.is_running());
        assert_eq!(d.scheduler().requests, 3);
        assert_eq!(d.effect().len(), 3);
    }

    #[test]
    fn refused_follow_up_frame_parks_the_driver() {
        let mut d = driver();
        d.spawn(|p| p.emit(&[[0.0, 0.0]], 1, 0.0));

        d.scheduler_mut().take_pending();
        d.scheduler_mut().refuse = true;
        assert!(d.on_frame(16.0));
        assert_eq!(d.state(), DriverState::Idle);
        assert_eq!(d.effect().len(), 1);

        // a late callback after the refusal steps nothing
        assert!(!d.on_frame(32.0));

        d.scheduler_mut().refuse = false;
        d.wake();
        assert!(d.is_running());
    }

    #[test]
    fn clear_empties_and_idles() {
        let mut d = driver();
        d.spawn(|p| p.emit(&[[0.0, 0.0]], 5, 0.0));
        d.clear();

        assert!(d.effect().is_empty());
        assert_eq!(d.state(), DriverState::Idle);
        assert_eq!(d.effect_mut().take_retired().len(), 5);
    }
}
