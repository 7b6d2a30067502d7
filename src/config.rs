/// Editor settings, persisted with the rest of the app state.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct EditorConfig {
    /// Size the canvas to the available space instead of `canvas_size`.
    pub responsive_canvas: bool,

    /// Canvas side in points when not responsive.
    pub canvas_size: f32,

    /// Largest part size as a multiple of the canvas side.
    pub fit_fraction: f32,

    pub name_overlay: bool,

    /// Keep dragged parts fully inside the canvas.
    pub clamp_drag: bool,

    /// Export density relative to the canvas size in points.
    pub pixel_ratio: f32,

    /// Directory that `images/...` sources are resolved against (native only).
    pub asset_root: String,
}

pub const MIN_CANVAS_SIZE: f32 = 64.0;
pub const MAX_CANVAS_SIZE: f32 = 4096.0;

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            responsive_canvas: true,
            canvas_size: 800.0,
            fit_fraction: 1.5,
            name_overlay: true,
            clamp_drag: false,
            pixel_ratio: 2.0,
            asset_root: "assets".to_owned(),
        }
    }
}

impl EditorConfig {
    /// Canvas side for the given available area.
    pub fn canvas_side(&self, available: egui::Vec2) -> f32 {
        let side = if self.responsive_canvas {
            available.x.min(available.y)
        } else {
            self.canvas_size
        };
        side.clamp(MIN_CANVAS_SIZE, MAX_CANVAS_SIZE).floor()
    }

    /// Repair values a hand-edited or older storage file may carry.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.canvas_size.is_finite() {
            self.canvas_size = defaults.canvas_size;
        }
        self.canvas_size = self.canvas_size.clamp(MIN_CANVAS_SIZE, MAX_CANVAS_SIZE);
        if !(self.fit_fraction.is_finite() && self.fit_fraction > 0.0) {
            self.fit_fraction = defaults.fit_fraction;
        }
        if !(self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0) {
            self.pixel_ratio = defaults.pixel_ratio;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn responsive_canvas_is_square_fit() {
        let config = EditorConfig::default();
        assert_eq!(config.canvas_side(egui::vec2(1024.5, 700.9)), 700.0);
        assert_eq!(config.canvas_side(egui::vec2(10.0, 700.0)), MIN_CANVAS_SIZE);
    }

    #[test]
    fn fixed_canvas_ignores_available_space() {
        let config = EditorConfig {
            responsive_canvas: false,
            canvas_size: 512.0,
            ..Default::default()
        };
        assert_eq!(config.canvas_side(egui::vec2(100.0, 100.0)), 512.0);
    }

    #[test]
    fn old_state_gets_defaults() {
        let config: EditorConfig = serde_json::from_str(r#"{"clamp_drag":true}"#).unwrap();
        assert!(config.clamp_drag);
        assert_eq!(config.fit_fraction, 1.5);
        assert_eq!(config.asset_root, "assets");
    }

    #[test]
    fn sanitize_repairs_bad_numbers() {
        let config = EditorConfig {
            canvas_size: f32::NAN,
            fit_fraction: -1.0,
            pixel_ratio: 0.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(config, EditorConfig::default());
    }
}
