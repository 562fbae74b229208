use crate::config::{BarConfig, Rgb};
use crate::renderer::{Align, LabelFrame};
use crate::wayland::text::{TextRenderer, family_attrs};
use cosmic_text::{Buffer, Color as CosmicColor, Metrics, Shaping, Wrap};

/// Colors every bar is painted with. Pixels are ARGB8888, premultiplied,
/// stored little-endian (B, G, R, A).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintStyle {
    pub background: Rgb,
    pub opacity: f32,
    pub text: Rgb,
}

impl PaintStyle {
    pub fn from_config(config: &BarConfig) -> Self {
        Self {
            background: config.style.background_rgb(),
            opacity: config.window.clamped_opacity(),
            text: config.style.text_rgb(),
        }
    }
}

fn premultiply(channel: u8, alpha: u8) -> u8 {
    ((channel as u32 * alpha as u32 + 127) / 255) as u8
}

pub fn fill_background(pixels: &mut [u8], color: Rgb, opacity: f32) {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    let px = [
        premultiply(color.b, alpha),
        premultiply(color.g, alpha),
        premultiply(color.r, alpha),
        alpha,
    ];
    for chunk in pixels.chunks_exact_mut(4) {
        chunk.copy_from_slice(&px);
    }
}

/// Source-over of `color` at `coverage` onto one premultiplied pixel.
pub fn blend(pixel: &mut [u8], color: Rgb, coverage: u8) {
    if coverage == 0 {
        return;
    }
    let inv = 255 - coverage as u32;
    let over = |src: u8, dst: u8| -> u8 {
        (premultiply(src, coverage) as u32 + (dst as u32 * inv + 127) / 255).min(255) as u8
    };
    pixel[0] = over(color.b, pixel[0]);
    pixel[1] = over(color.g, pixel[1]);
    pixel[2] = over(color.r, pixel[2]);
    pixel[3] = over(255, pixel[3]);
}

fn cosmic_align(align: Align) -> cosmic_text::Align {
    match align {
        Align::Left => cosmic_text::Align::Left,
        Align::Center => cosmic_text::Align::Center,
        Align::Right => cosmic_text::Align::Right,
    }
}

/// Shapes `text` inside `frame` and blends it into the canvas. Glyphs are
/// clipped to the frame's horizontal extent.
pub fn draw_label(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    frame: &LabelFrame,
    text: &str,
    renderer: &mut TextRenderer,
    color: Rgb,
) {
    if text.is_empty() || frame.rect.width == 0 {
        return;
    }

    let line_height = renderer.line_height;
    let mut buffer = Buffer::new(
        &mut renderer.font_system,
        Metrics::new(renderer.font_size, line_height),
    );
    buffer.set_wrap(&mut renderer.font_system, Wrap::None);
    buffer.set_size(
        &mut renderer.font_system,
        Some(frame.rect.width as f32),
        Some(line_height),
    );
    let attrs = family_attrs(renderer.family.as_deref());
    buffer.set_text(
        &mut renderer.font_system,
        text,
        &attrs,
        Shaping::Advanced,
        Some(cosmic_align(frame.align)),
    );
    buffer.shape_until_scroll(&mut renderer.font_system, false);

    let origin_x = frame.rect.x;
    let origin_y = frame.rect.y + (frame.rect.height as i32 - line_height as i32) / 2;
    let clip_left = frame.rect.x.max(0);
    let clip_right = (frame.rect.x + frame.rect.width as i32).min(width as i32);
    let height_i32 = height as i32;
    let stride = width as usize * 4;

    buffer.draw(
        &mut renderer.font_system,
        &mut renderer.swash_cache,
        CosmicColor::rgb(color.r, color.g, color.b),
        |x, y, w, h, glyph| {
            let coverage = glyph.a();
            if coverage == 0 {
                return;
            }
            for dy in 0..h as i32 {
                let py = origin_y + y + dy;
                if py < 0 || py >= height_i32 {
                    continue;
                }
                for dx in 0..w as i32 {
                    let px = origin_x + x + dx;
                    if px < clip_left || px >= clip_right {
                        continue;
                    }
                    let offset = py as usize * stride + px as usize * 4;
                    if let Some(pixel) = pixels.get_mut(offset..offset + 4) {
                        blend(pixel, color, coverage);
                    }
                }
            }
        },
    );
}
