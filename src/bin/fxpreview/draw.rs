// draw.rs - Rasterize encoded effect buffers
//
// Additive blending onto an RGBA canvas. Reads the same records the
// page reads, so the preview matches what JS receives.

use image::RgbaImage;

// Ripple ring tint
const RING: [f32; 3] = [0.0, 255.0, 255.0];
// Core radius at scale 1, px
const CORE: f32 = 2.5;

fn add(img: &mut RgbaImage, x: i32, y: i32, rgb: [f32; 3], a: f32) {
    if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 { return; }
    if a <= 0.0 { return; }

    let px = img.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        px.0[c] = (px.0[c] as f32 + rgb[c] * a).min(255.0) as u8;
    }
}

/// Soft disc: solid core, glow fading linearly to `core + glow`
fn disc(img: &mut RgbaImage, cx: f32, cy: f32, core: f32, glow: f32, rgb: [f32; 3], opacity: f32) {
    let reach = core + glow;
    let (x0, x1) = ((cx - reach).floor() as i32, (cx + reach).ceil() as i32);
    let (y0, y1) = ((cy - reach).floor() as i32, (cy + reach).ceil() as i32);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            let a = if d <= core {
                opacity
            } else if glow > 0.0 && d <= reach {
                opacity * 0.35 * (1.0 - (d - core) / glow)
            } else {
                continue;
            };
            add(img, x, y, rgb, a);
        }
    }
}

pub fn particles(img: &mut RgbaImage, data: &[f32], stride: usize, trail_len: usize) {
    for rec in data.chunks_exact(stride) {
        let (x, y, opacity, scale) = (rec[1], rec[2], rec[3], rec[4]);
        let rgb = [rec[5], rec[6], rec[7]];
        let glow = rec[8];
        let trail_n = (rec[9] as usize).min(trail_len);

        for t in 0..trail_n {
            let (tx, ty) = (rec[10 + t * 2], rec[11 + t * 2]);
            let fade = 1.0 - (t + 1) as f32 / (trail_n + 1) as f32;
            disc(img, tx, ty, CORE * scale * 0.6, 0.0, rgb, opacity * fade * 0.5);
        }
        disc(img, x, y, CORE * scale, glow, rgb, opacity);
    }
}

pub fn ripples(img: &mut RgbaImage, data: &[f32], stride: usize) {
    for rec in data.chunks_exact(stride) {
        let (cx, cy, radius, opacity, border) = (rec[1], rec[2], rec[3], rec[4], rec[5]);
        let reach = radius + border;
        let x0 = (cx - reach).floor().max(0.0) as i32;
        let y0 = (cy - reach).floor().max(0.0) as i32;
        let x1 = ((cx + reach).ceil() as i32).min(img.width() as i32 - 1);
        let y1 = ((cy + reach).ceil() as i32).min(img.height() as i32 - 1);

        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
                if (d - radius).abs() <= border * 0.5 {
                    add(img, x, y, RING, opacity * 0.6);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn disc_lights_its_centre_only() {
        let mut img = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 255]));
        particles(&mut img, &[0.0, 8.0, 8.0, 1.0, 1.0, 255.0, 0.0, 0.0, 0.0, 0.0], 10, 0);

        assert_eq!(img.get_pixel(8, 8).0[0], 255);
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn ring_skips_its_middle() {
        let mut img = RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 255]));
        ripples(&mut img, &[0.0, 16.0, 16.0, 10.0, 1.0, 2.0], 6);

        assert_eq!(img.get_pixel(16, 16).0[1], 0);
        assert!(img.get_pixel(26, 16).0[1] > 0);
    }

    #[test]
    fn offscreen_records_are_ignored() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        particles(&mut img, &[0.0, -50.0, -50.0, 1.0, 1.0, 255.0, 255.0, 255.0, 8.0, 0.0], 10, 0);
        assert!(img.pixels().all(|p| p.0[..3] == [0, 0, 0]));
    }
}
