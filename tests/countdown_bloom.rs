use countdown_fx::config::FxConfig;
use countdown_fx::countdown::{Remaining, DEFAULT_TARGET_MS};
use countdown_fx::driver::{pump, Driver, DriverState, ManualScheduler};
use countdown_fx::sim::{Effect, Particles};
use countdown_fx::stage::{Channel, Stage};

const FRAME_MS: f64 = 1000.0 / 60.0;

#[test]
fn single_particle_lives_exactly_one_duration() {
    let config = FxConfig::default();
    let mut driver = Driver::new(Particles::new(&config).with_seed(1234), ManualScheduler::default());

    assert_eq!(driver.spawn(|p| p.emit(&[[100.0, 100.0]], 1, 0.0)), 1);
    let p = driver.effect();
    assert_eq!((p.body[0].x, p.body[0].y), (100.0, 100.0));

    let last = pump(&mut driver, 0.0, FRAME_MS, 10_000);

    assert!(driver.effect().is_empty());
    assert_eq!(driver.state(), DriverState::Idle);
    assert!(last >= config.emission.duration as f64 * 1000.0);
    assert_eq!(driver.effect_mut().take_retired(), vec![0]);

    // No further frames until the next emit
    let requests = driver.scheduler().requests;
    driver.on_frame(last + FRAME_MS);
    assert_eq!(driver.scheduler().requests, requests);
}

#[test]
fn minute_rollover_blooms_then_settles() {
    let mut stage = Stage::new(
        &FxConfig::default(),
        ManualScheduler::default(),
        ManualScheduler::default(),
    )
    .with_seed(7);
    stage.set_target(DEFAULT_TARGET_MS);

    let dots = [[10.0, 10.0], [12.0, 10.0], [14.0, 10.0]];
    let center = [12.0, 10.0];

    // 00:00:05:00 left, then a second later the minutes drop to 4
    let t0 = DEFAULT_TARGET_MS - 5 * 60_000;
    assert!(!stage.countdown_tick(t0, 0.0, &dots, center));
    assert!(stage.countdown_tick(t0 + 1000, 0.0, &dots, center));
    assert_eq!(stage.remaining().to_string(), "00:00:04:59");

    let mut now = 0.0;
    while stage.is_running(Channel::Particles) || stage.is_running(Channel::Ripples) {
        now += FRAME_MS;
        for ch in [Channel::Particles, Channel::Ripples] {
            if stage.is_running(ch) {
                stage.frame(ch, now);
            }
        }
        assert!(now < 10_000.0, "effects never settled");
    }

    assert!(stage.particles().effect().is_empty());
    assert!(stage.ripples().effect().is_empty());
    assert!(stage.output(Channel::Particles).is_empty());
    // ripples outlive particles
    assert!(now >= 2000.0);
}

#[test]
fn countdown_never_goes_negative() {
    let r = Remaining::until(DEFAULT_TARGET_MS + 1, DEFAULT_TARGET_MS);
    assert_eq!(r.to_string(), "00:00:00:00");
    assert_eq!(r.digits(), [0; 8]);
}
