/// Software rasterizer: paint commands to a scaled RGBA pixmap, encoded as PNG

use crate::rendering::layout::GLYPH_CELL;
use crate::rendering::paint::{PaintCommand, Rgba};
use crate::rendering::Bitmap;
use crate::{Error, Result};
use tiny_skia::{Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

/// Largest canvas the rasterizer will allocate, in device pixels
pub const MAX_RASTER_PIXELS: u64 = 64 * 1024 * 1024;

/// Rasterize `cmds` onto a `width` x `height` CSS-pixel canvas at `scale`
/// device pixels per CSS pixel.
pub fn rasterize(width: u32, height: u32, scale: f32, cmds: &[PaintCommand]) -> Result<Bitmap> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::RenderError(format!("invalid capture scale {}", scale)));
    }
    let px_w = (width as f32 * scale).ceil() as u32;
    let px_h = (height as f32 * scale).ceil() as u32;
    if px_w as u64 * px_h as u64 > MAX_RASTER_PIXELS {
        return Err(Error::RenderError(format!(
            "raster size {}x{} exceeds the {} pixel limit",
            px_w, px_h, MAX_RASTER_PIXELS
        )));
    }
    let mut pixmap = Pixmap::new(px_w, px_h).ok_or_else(|| {
        Error::RenderError(format!("invalid raster size {}x{} at scale {}", px_w, px_h, scale))
    })?;
    let transform = Transform::from_scale(scale, scale);

    for cmd in cmds {
        match cmd {
            PaintCommand::SolidRect { x, y, width, height, rgba } => {
                fill(&mut pixmap, *x as f32, *y as f32, *width as f32, *height as f32, *rgba, transform);
            }
            PaintCommand::StrokeRect { x, y, width, height, rgba } => {
                let Some(rect) = Rect::from_xywh(*x as f32, *y as f32, *width as f32, *height as f32) else {
                    continue;
                };
                let path = PathBuilder::from_rect(rect);
                let stroke = Stroke { width: 1.0, ..Stroke::default() };
                pixmap.stroke_path(&path, &paint_for(*rgba), &stroke, transform, None);
            }
            PaintCommand::Text { x, y, text, scale: text_scale, rgba } => {
                draw_text_blocks(&mut pixmap, *x, *y, text, *text_scale, *rgba, transform);
            }
        }
    }

    let png_data = pixmap
        .encode_png()
        .map_err(|e| Error::RenderError(format!("png encode failed: {e}")))?;
    Ok(Bitmap::new(px_w, px_h, png_data))
}

fn paint_for(rgba: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba.0, rgba.1, rgba.2, rgba.3);
    paint.anti_alias = false;
    paint
}

fn fill(pixmap: &mut Pixmap, x: f32, y: f32, w: f32, h: f32, rgba: Rgba, transform: Transform) {
    if let Some(rect) = Rect::from_xywh(x, y, w, h) {
        pixmap.fill_rect(rect, &paint_for(rgba), transform, None);
    }
}

/// Glyphs are drawn as solid cells on the layout grid; whitespace is skipped.
fn draw_text_blocks(pixmap: &mut Pixmap, x: i32, y: i32, text: &str, scale: u32, rgba: Rgba, transform: Transform) {
    let cell = (GLYPH_CELL * scale.max(1)) as f32;
    for (row, line) in text.lines().enumerate() {
        for (col, ch) in line.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let gx = x as f32 + col as f32 * cell + 1.0;
            let gy = y as f32 + row as f32 * cell + 1.0;
            fill(pixmap, gx, gy, cell - 2.0, cell - 1.0, rgba, transform);
        }
    }
}
