// fxpreview - Render one countdown trigger to PNG frames
//
// Pipeline:
//   1. Load config (optional JSON), seed the particle RNG
//   2. Fire one minute-change: ring of bloom origins + centre ripple
//   3. Pump both channels at a fixed frame rate
//   4. Rasterize each frame's output buffers to PNG
//
// Usage: cargo run --bin fxpreview -- [--frames N] [--fps F] [--width W]
//        [--height H] [--out DIR] [--config FILE] [--seed S]

mod draw;

use anyhow::Context;
use countdown_fx::config::FxConfig;
use countdown_fx::driver::ManualScheduler;
use countdown_fx::logging;
use countdown_fx::render::RIPPLE_STRIDE;
use countdown_fx::stage::{Channel, Stage};
use image::{Rgba, RgbaImage};
use std::env;
use std::f32::consts::TAU;
use std::fs;
use std::path::PathBuf;

const BACKGROUND: Rgba<u8> = Rgba([10, 10, 15, 255]);
const ORIGIN_COUNT: usize = 24;

struct Args {
    frames: u32,
    fps: f64,
    width: u32,
    height: u32,
    out: PathBuf,
    config: Option<PathBuf>,
    seed: u32,
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        frames: 150,
        fps: 60.0,
        width: 640,
        height: 360,
        out: PathBuf::from("preview"),
        config: None,
        seed: 1,
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--frames" => { parsed.frames = value.and_then(|s| s.parse().ok()).unwrap_or(parsed.frames); i += 2; }
            "--fps" => { parsed.fps = value.and_then(|s| s.parse().ok()).unwrap_or(parsed.fps); i += 2; }
            "--width" => { parsed.width = value.and_then(|s| s.parse().ok()).unwrap_or(parsed.width); i += 2; }
            "--height" => { parsed.height = value.and_then(|s| s.parse().ok()).unwrap_or(parsed.height); i += 2; }
            "--seed" => { parsed.seed = value.and_then(|s| s.parse().ok()).unwrap_or(parsed.seed); i += 2; }
            "--out" => { if let Some(v) = value { parsed.out = PathBuf::from(v); } i += 2; }
            "--config" => { parsed.config = value.map(PathBuf::from); i += 2; }
            other => { log::warn!("ignoring argument {other}"); i += 1; }
        }
    }
    parsed
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<FxConfig> {
    let Some(path) = path else { return Ok(FxConfig::default()) };
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    FxConfig::from_json(&json).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    logging::init(log::LevelFilter::Info);
    let args = parse_args();
    let config = load_config(args.config.as_ref())?;

    log::info!(
        "Rendering {} frames at {} fps ({}x{}) to {}",
        args.frames, args.fps, args.width, args.height, args.out.display()
    );
    fs::create_dir_all(&args.out).with_context(|| format!("creating {}", args.out.display()))?;

    let mut stage = Stage::new(&config, ManualScheduler::default(), ManualScheduler::default())
        .with_seed(args.seed);

    // Stand-in for the lit dots of the digits: a ring around the centre
    let center = [args.width as f32 / 2.0, args.height as f32 / 2.0];
    let origins: Vec<[f32; 2]> = (0..ORIGIN_COUNT)
        .map(|i| {
            let a = i as f32 / ORIGIN_COUNT as f32 * TAU;
            [center[0] + a.cos() * 60.0, center[1] + a.sin() * 30.0]
        })
        .collect();

    let emission = stage.particles().effect().emission().clone();
    let emitted = stage.emit(&origins, emission.per_origin, 0.0);
    stage.ripple(center, 0.0);
    log::info!("  Emitted {emitted} particles");

    let frame_ms = 1000.0 / args.fps;
    let stride = stage.particle_stride();
    let trail_len = emission.trail_len;

    for f in 0..args.frames {
        let now = f as f64 * frame_ms;

        if stage.particles_mut().scheduler_mut().take_pending().is_some() {
            stage.frame(Channel::Particles, now);
        }
        if stage.ripples_mut().scheduler_mut().take_pending().is_some() {
            stage.frame(Channel::Ripples, now);
        }

        let mut img = RgbaImage::from_pixel(args.width, args.height, BACKGROUND);
        draw::ripples(&mut img, stage.output(Channel::Ripples).as_slice(), RIPPLE_STRIDE);
        draw::particles(&mut img, stage.output(Channel::Particles).as_slice(), stride, trail_len);

        let path = args.out.join(format!("frame_{f:04}.png"));
        img.save(&path).with_context(|| format!("writing {}", path.display()))?;

        if !stage.is_running(Channel::Particles) && !stage.is_running(Channel::Ripples) {
            log::info!("  Effects finished after {} frames", f + 1);
            break;
        }
    }

    log::info!("Done!");
    Ok(())
}
