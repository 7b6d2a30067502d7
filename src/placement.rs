//! Scale and position math for parts on the square canvas.
//!
//! All coordinates are canvas points with the origin in the top-left corner.

use egui::{Pos2, Rect, Vec2, pos2, vec2};

/// Uniform scale that fits `natural` into `canvas_size * fit_fraction` without upscaling.
pub fn compute_scale(natural: Vec2, canvas_size: f32, fit_fraction: f32) -> f32 {
    let target = canvas_size * fit_fraction;
    let fit = (target / natural.x).min(target / natural.y);
    if fit.is_nan() { 1.0 } else { fit.min(1.0) }
}

/// Top-left position that centres the scaled image in the canvas.
pub fn centered_position(natural: Vec2, scale: f32, canvas_size: f32) -> Pos2 {
    let size = natural * scale;
    pos2((canvas_size - size.x) / 2.0, (canvas_size - size.y) / 2.0)
}

/// Whether `rect` overlaps the canvas bounds. Rects that merely touch an edge do not.
pub fn is_visible(rect: Rect, canvas_size: f32) -> bool {
    rect.max.x > 0.0 && rect.max.y > 0.0 && rect.min.x < canvas_size && rect.min.y < canvas_size
}

/// Keep a dragged rect of `size` inside the canvas.
pub fn clamp_position(pos: Pos2, size: Vec2, canvas_size: f32) -> Pos2 {
    let max = vec2(canvas_size - size.x, canvas_size - size.y).max(Vec2::ZERO);
    pos2(pos.x.clamp(0.0, max.x), pos.y.clamp(0.0, max.y))
}

/// Scale and top-left position of a part.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub pos: Pos2,
    pub scale: f32,
}

impl Placement {
    /// Fresh placement: fitted and centred.
    pub fn centered(natural: Vec2, canvas_size: f32, fit_fraction: f32) -> Self {
        let scale = compute_scale(natural, canvas_size, fit_fraction);
        Self {
            pos: centered_position(natural, scale, canvas_size),
            scale,
        }
    }

    /// Placement for a restored position, rescued to the centre when it would be off-canvas.
    pub fn restored(pos: Pos2, natural: Vec2, canvas_size: f32, fit_fraction: f32) -> Self {
        let scale = compute_scale(natural, canvas_size, fit_fraction);
        let placement = Self { pos, scale };
        if is_visible(placement.rect(natural), canvas_size) {
            placement
        } else {
            log::debug!("Rescuing off-canvas part at {pos:?}");
            Self::centered(natural, canvas_size, fit_fraction)
        }
    }

    pub fn rect(&self, natural: Vec2) -> Rect {
        Rect::from_min_size(self.pos, natural * self.scale)
    }

    /// Recompute for a new canvas size. The visual centre stays where it was in
    /// canvas points; a part that ends up outside the new canvas is centred.
    pub fn reflow(&self, natural: Vec2, new_canvas: f32, fit_fraction: f32) -> Self {
        let center = self.rect(natural).center();
        let scale = compute_scale(natural, new_canvas, fit_fraction);
        let placed = Self {
            pos: center - natural * scale / 2.0,
            scale,
        };
        if is_visible(placed.rect(natural), new_canvas) {
            placed
        } else {
            log::debug!("Part at {:?} left the {new_canvas}pt canvas, centring", self.pos);
            Self::centered(natural, new_canvas, fit_fraction)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SIZES: [f32; 7] = [1.0, 16.0, 99.5, 400.0, 800.0, 2000.0, 10_000.0];

    #[test]
    fn scale_never_upscales() {
        for w in SIZES {
            for h in SIZES {
                for canvas in SIZES {
                    let scale = compute_scale(vec2(w, h), canvas, 1.5);
                    assert!(scale <= 1.0, "scale {scale} for {w}x{h} on {canvas}");
                    assert!(scale > 0.0, "scale {scale} for {w}x{h} on {canvas}");
                }
            }
        }
    }

    #[test]
    fn wide_image_on_800_canvas() {
        let natural = vec2(2000.0, 1000.0);
        let scale = compute_scale(natural, 800.0, 1.5);
        assert!((scale - 0.6).abs() < 1e-6, "scale was {scale}");
        let pos = centered_position(natural, scale, 800.0);
        assert!((pos.x - -200.0).abs() < 1e-3, "x was {}", pos.x);
        assert!((pos.y - 100.0).abs() < 1e-3, "y was {}", pos.y);
    }

    #[test]
    fn small_image_keeps_natural_size() {
        assert_eq!(compute_scale(vec2(100.0, 50.0), 800.0, 0.5), 1.0);
    }

    #[test]
    fn degenerate_image_scales_to_one() {
        assert_eq!(compute_scale(vec2(0.0, 0.0), 0.0, 1.5), 1.0);
        assert_eq!(compute_scale(vec2(0.0, 0.0), 800.0, 1.5), 1.0);
    }

    #[test]
    fn centered_bounds_are_centered() {
        for w in SIZES {
            for h in SIZES {
                let natural = vec2(w, h);
                let scale = compute_scale(natural, 640.0, 0.8);
                let rect = Placement { pos: centered_position(natural, scale, 640.0), scale }
                    .rect(natural);
                assert!((rect.center().x - 320.0).abs() < 0.01, "{rect:?}");
                assert!((rect.center().y - 320.0).abs() < 0.01, "{rect:?}");
            }
        }
    }

    #[test]
    fn visibility_is_overlap() {
        let canvas = 500.0;
        assert!(is_visible(Rect::from_min_size(pos2(10.0, 10.0), vec2(5.0, 5.0)), canvas));
        assert!(is_visible(Rect::from_min_size(pos2(-50.0, -50.0), vec2(60.0, 60.0)), canvas));
        assert!(is_visible(Rect::from_min_size(pos2(-100.0, -100.0), vec2(800.0, 800.0)), canvas));
        assert!(!is_visible(Rect::from_min_size(pos2(500.0, 10.0), vec2(5.0, 5.0)), canvas));
        assert!(!is_visible(Rect::from_min_size(pos2(-60.0, 10.0), vec2(60.0, 5.0)), canvas));
        assert!(!is_visible(Rect::from_min_size(pos2(10.0, 900.0), vec2(5.0, 5.0)), canvas));
    }

    #[test]
    fn clamp_keeps_rect_inside() {
        let size = vec2(100.0, 50.0);
        assert_eq!(clamp_position(pos2(-20.0, 470.0), size, 500.0), pos2(0.0, 450.0));
        assert_eq!(clamp_position(pos2(30.0, 40.0), size, 500.0), pos2(30.0, 40.0));
        assert_eq!(clamp_position(pos2(30.0, 40.0), vec2(900.0, 900.0), 500.0), pos2(0.0, 0.0));
    }

    #[test]
    fn restore_rescues_off_canvas_parts() {
        let natural = vec2(100.0, 100.0);
        let kept = Placement::restored(pos2(20.0, 30.0), natural, 400.0, 1.0);
        assert_eq!(kept.pos, pos2(20.0, 30.0));

        let rescued = Placement::restored(pos2(1200.0, -700.0), natural, 400.0, 1.0);
        assert_eq!(rescued.pos, pos2(150.0, 150.0));
    }

    #[test]
    fn reflow_keeps_absolute_center() {
        let natural = vec2(200.0, 100.0);
        let before = Placement { pos: pos2(100.0, 100.0), scale: 1.0 };
        let after = before.reflow(natural, 400.0, 0.25);
        assert!((after.scale - 0.5).abs() < 1e-6, "{after:?}");
        assert_eq!(after.rect(natural).center(), pos2(200.0, 150.0));
        assert_eq!(after.pos, pos2(150.0, 125.0));
    }

    #[test]
    fn growing_canvas_does_not_move_parts() {
        let natural = vec2(100.0, 100.0);
        let before = Placement { pos: pos2(150.0, 150.0), scale: 1.0 };
        let after = before.reflow(natural, 800.0, 1.5);
        assert_eq!(after, before);
        assert_eq!(after.rect(natural).center(), pos2(200.0, 200.0));
    }

    #[test]
    fn shrinking_canvas_recentres_parts_left_outside() {
        let natural = vec2(100.0, 100.0);
        let before = Placement { pos: pos2(600.0, 600.0), scale: 1.0 };
        assert!(is_visible(before.rect(natural), 800.0));

        let after = before.reflow(natural, 400.0, 1.0);
        assert_eq!(after, Placement { pos: pos2(150.0, 150.0), scale: 1.0 });
    }

    #[test]
    fn reflow_keeps_visible_parts_visible() {
        let natural = vec2(300.0, 120.0);
        let positions = [pos2(-290.0, 10.0), pos2(790.0, 790.0), pos2(400.0, -110.0), pos2(0.0, 0.0)];
        for pos in positions {
            let before = Placement { pos, scale: 1.0 };
            assert!(is_visible(before.rect(natural), 800.0), "{pos:?}");
            for new_canvas in [120.0, 333.0, 800.0, 1600.0] {
                let after = before.reflow(natural, new_canvas, 1.5);
                assert!(is_visible(after.rect(natural), new_canvas), "{pos:?} -> {after:?}");
            }
        }
    }
}
