//! PNG export of the canvas.
//!
//! The export is composed off-screen from the scene itself: a white square of
//! `pixel_ratio` times the canvas size, every part resampled from its decoded
//! pixels and laid over it in draw order, then the name. Nothing depends on
//! what is currently on screen.

use std::fmt;
use std::io::Cursor;

use egui::epaint::text::{FontDefinitions, Fonts};
use egui::epaint::AlphaFromCoverage;
use egui::{Color32, FontId, vec2};
use image::imageops::{self, FilterType};
use image::{Pixel as _, Rgba, RgbaImage};

use crate::scene::{self, NameOverlay, Scene};

pub const EXPORT_FILE_NAME: &str = "monster.png";

/// Largest glyph atlas the name renderer may grow.
const FONT_ATLAS_SIDE: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// The canvas has not been laid out yet, or is too small to hold a pixel.
    EmptyCanvas,
    Encode(String),
    Write(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCanvas => f.write_str("the canvas has no size yet"),
            Self::Encode(e) => write!(f, "could not encode PNG: {e}"),
            Self::Write(e) => write!(f, "could not save {EXPORT_FILE_NAME}: {e}"),
        }
    }
}

impl std::error::Error for ExportError {}

/// Draw `scene` into a new image of `pixel_ratio` times the canvas size.
pub fn compose(scene: &Scene, show_name: bool, pixel_ratio: f32) -> Result<RgbaImage, ExportError> {
    let side = (scene.canvas_size() * pixel_ratio).round();
    if side.is_nan() || side < 1.0 {
        return Err(ExportError::EmptyCanvas);
    }
    let side = side as u32;
    let mut out = RgbaImage::from_pixel(side, side, Rgba([255, 255, 255, 255]));

    for (category, node) in scene.nodes() {
        let rect = node.rect();
        let w = (rect.width() * pixel_ratio).round() as u32;
        let h = (rect.height() * pixel_ratio).round() as u32;
        if w == 0 || h == 0 {
            log::debug!("Skipping {category}, too small to export");
            continue;
        }
        let x = (rect.min.x * pixel_ratio).round() as i64;
        let y = (rect.min.y * pixel_ratio).round() as i64;
        if (w, h) == node.pixels.dimensions() {
            imageops::overlay(&mut out, &node.pixels, x, y);
        } else {
            let scaled = imageops::resize(&node.pixels, w, h, FilterType::Lanczos3);
            imageops::overlay(&mut out, &scaled, x, y);
        }
    }

    if show_name && let Some(name) = scene.name() {
        draw_name(&mut out, name, pixel_ratio);
    }
    Ok(out)
}

/// Compose `scene` and encode it as PNG.
pub fn render_png(scene: &Scene, show_name: bool, pixel_ratio: f32) -> Result<Vec<u8>, ExportError> {
    let image = compose(scene, show_name, pixel_ratio)?;
    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, image::ImageOutputFormat::Png)
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    Ok(png.into_inner())
}

/// Rasterise the name with egui's own fonts, laid out the way the canvas paints it.
fn draw_name(out: &mut RgbaImage, name: &NameOverlay, pixel_ratio: f32) {
    let mut fonts = Fonts::new(
        FONT_ATLAS_SIDE,
        AlphaFromCoverage::LIGHT_MODE_DEFAULT,
        FontDefinitions::default(),
    );
    let mut view = fonts.with_pixels_per_point(pixel_ratio);
    let galley = view.layout_no_wrap(
        name.text.clone(),
        FontId::proportional(name.font_size),
        Color32::BLACK,
    );
    let atlas = view.image();
    let origin = scene::name_anchor(name) - vec2(galley.size().x / 2.0, 0.0);

    for row in &galley.rows {
        for glyph in &row.row.glyphs {
            let uv = glyph.uv_rect;
            if uv.is_nothing() {
                continue;
            }
            let left_top = (origin + row.pos.to_vec2() + glyph.pos.to_vec2() + uv.offset) * pixel_ratio;
            let (x0, y0) = (left_top.x.round() as i64, left_top.y.round() as i64);
            for ty in uv.min[1]..uv.max[1] {
                for tx in uv.min[0]..uv.max[0] {
                    let coverage = atlas.pixels[ty as usize * atlas.size[0] + tx as usize].a();
                    let x = x0 + i64::from(tx - uv.min[0]);
                    let y = y0 + i64::from(ty - uv.min[1]);
                    let outside = x < 0
                        || y < 0
                        || x >= i64::from(out.width())
                        || y >= i64::from(out.height());
                    if coverage == 0 || outside {
                        continue;
                    }
                    out.get_pixel_mut(x as u32, y as u32).blend(&Rgba([0, 0, 0, coverage]));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;
    use egui::{Pos2, pos2};
    use pretty_assertions::assert_eq;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn scene(canvas: f32) -> Scene {
        let mut scene = Scene::default();
        scene.resize(canvas, 1.0);
        scene
    }

    fn add(
        scene: &mut Scene,
        ctx: &egui::Context,
        category: Category,
        restore: Option<Pos2>,
        pixels: RgbaImage,
    ) {
        let texture = ctx.load_texture(
            "part",
            egui::ColorImage::from_rgba_unmultiplied([1, 1], &[0, 0, 0, 255]),
            egui::TextureOptions::LINEAR,
        );
        let ticket = scene.begin_load(category, category.key(), restore);
        let load = scene.finish_load(ticket).unwrap();
        scene.place(category, load, texture, pixels, 1.0);
    }

    #[test]
    fn output_is_pixel_ratio_times_canvas() {
        let image = compose(&scene(50.0), false, 2.0).unwrap();
        assert_eq!(image.dimensions(), (100, 100));
        assert!(image.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn part_hanging_off_the_edge_is_clipped() {
        let ctx = egui::Context::default();
        let mut scene = scene(8.0);
        add(&mut scene, &ctx, Category::Body, Some(pos2(-4.0, 0.0)), RgbaImage::from_pixel(8, 8, RED));

        let image = compose(&scene, false, 1.0).unwrap();
        assert_eq!(image.dimensions(), (8, 8));
        for (x, _, pixel) in image.enumerate_pixels() {
            let expected = if x < 4 { RED } else { WHITE };
            assert_eq!(*pixel, expected, "column {x}");
        }
    }

    #[test]
    fn parts_are_upsampled_to_the_pixel_ratio() {
        let ctx = egui::Context::default();
        let mut scene = scene(4.0);
        add(&mut scene, &ctx, Category::Body, None, RgbaImage::from_pixel(4, 4, RED));

        let image = compose(&scene, false, 2.0).unwrap();
        assert_eq!(image.dimensions(), (8, 8));
        for pixel in image.pixels() {
            assert!(pixel.0[0] > 250 && pixel.0[1] < 5 && pixel.0[2] < 5, "{pixel:?}");
        }
    }

    #[test]
    fn later_categories_are_drawn_on_top() {
        let ctx = egui::Context::default();
        let mut scene = scene(10.0);
        // Loaded top-first to show that draw order follows the category.
        add(&mut scene, &ctx, Category::Eyes, Some(pos2(2.0, 2.0)), RgbaImage::from_pixel(2, 2, BLUE));
        add(&mut scene, &ctx, Category::Body, Some(pos2(0.0, 0.0)), RgbaImage::from_pixel(10, 10, RED));

        let image = compose(&scene, false, 1.0).unwrap();
        assert_eq!(*image.get_pixel(2, 2), BLUE);
        assert_eq!(*image.get_pixel(3, 3), BLUE);
        assert_eq!(*image.get_pixel(0, 0), RED);
        assert_eq!(*image.get_pixel(9, 9), RED);
    }

    #[test]
    fn transparent_pixels_show_what_is_below() {
        let ctx = egui::Context::default();
        let mut scene = scene(4.0);
        add(&mut scene, &ctx, Category::Mouth, Some(pos2(0.0, 0.0)), RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 0])));

        let image = compose(&scene, false, 1.0).unwrap();
        assert!(image.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn open_windows_do_not_change_the_export() {
        let ctx = egui::Context::default();
        let mut scene = scene(16.0);
        add(&mut scene, &ctx, Category::Body, None, RgbaImage::from_pixel(8, 8, RED));
        let before = render_png(&scene, false, 2.0).unwrap();

        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::Window::new("Settings").show(ctx, |ui| {
                ui.label("Export density");
            });
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.label("Canvas");
            });
        });

        assert_eq!(render_png(&scene, false, 2.0).unwrap(), before);
    }

    #[test]
    fn name_is_drawn_along_the_top() {
        let mut scene = scene(100.0);
        scene.set_name("Gorp");
        let name = scene.name().unwrap().clone();

        let without = compose(&scene, false, 2.0).unwrap();
        assert!(without.pixels().all(|p| *p == WHITE));

        let image = compose(&scene, true, 2.0).unwrap();
        let text_bottom = ((name.top + name.font_size * 2.0) * 2.0) as u32;
        let dark = |p: &Rgba<u8>| p.0[0] < 128;
        assert!(image.enumerate_pixels().any(|(_, y, p)| y < text_bottom && dark(p)));
        assert!(image.enumerate_pixels().all(|(_, y, p)| y < text_bottom || !dark(p)));
    }

    #[test]
    fn canvas_without_size_is_an_error() {
        assert_eq!(compose(&Scene::default(), true, 2.0), Err(ExportError::EmptyCanvas));
        assert_eq!(render_png(&Scene::default(), false, 2.0), Err(ExportError::EmptyCanvas));
    }
}
