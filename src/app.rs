use std::collections::{BTreeMap, HashMap};

use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, StrokeKind, TextureOptions, Vec2, pos2, vec2};

use crate::catalog::{self, Category};
use crate::config::{self, EditorConfig};
use crate::export::{self, EXPORT_FILE_NAME};
use crate::loader::{ImageLoader, LoadResult, LoadTarget, LoadTicket};
use crate::platform;
use crate::scene::{self, Scene};
use crate::store::{MemoryStorage, PartSelection, SelectionStore};

const THUMBNAIL_SIZE: f32 = 56.0;

enum Thumbnail {
    Loading,
    Ready(egui::TextureHandle),
    Failed,
}

/// We derive Deserialize/Serialize so we can persist the editor settings on shutdown.
/// Part selections and the name are kept separately by [`SelectionStore`].
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct MonsterApp {
    config: EditorConfig,

    #[serde(skip)] // This how you opt-out of serialization of a field
    category: Category,

    #[serde(skip)]
    scene: Scene,

    #[serde(skip)]
    loader: ImageLoader,

    #[serde(skip)]
    thumbnails: HashMap<String, Thumbnail>,

    // Part being dragged, picked when the drag started.
    #[serde(skip)]
    dragging: Option<Category>,

    #[serde(skip)]
    restored: bool,

    // Writes collected during the frame and flushed to storage at its end.
    #[serde(skip)]
    unsaved: Vec<PartSelection>,
    #[serde(skip)]
    unsaved_name: Option<String>,
    #[serde(skip)]
    reset_requested: bool,

    // Used when the platform gives us no persistent storage.
    #[serde(skip)]
    fallback_storage: MemoryStorage,

    #[serde(skip)]
    name_draft: String,
    #[serde(skip)]
    show_name_prompt: bool,
    #[serde(skip)]
    show_settings: bool,

    #[serde(skip)]
    error: Option<String>,
}

impl Default for MonsterApp {
    fn default() -> Self {
        Self {
            config: EditorConfig::default(),
            loader: ImageLoader::default(),
            category: Category::default(),
            scene: Scene::default(),
            thumbnails: HashMap::new(),
            dragging: None,
            restored: false,
            unsaved: Vec::new(),
            unsaved_name: None,
            reset_requested: false,
            fallback_storage: MemoryStorage::default(),
            name_draft: String::new(),
            show_name_prompt: false,
            show_settings: false,
            error: None,
        }
    }
}

impl MonsterApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Load previous app state (if any).
        // Note that you must enable the `persistence` feature for this to work.
        let mut this: Self = if let Some(storage) = cc.storage {
            eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default()
        } else {
            Default::default()
        };

        this.config = this.config.clone().sanitized();
        this.loader.set_asset_root(this.config.asset_root.clone());
        this.category = catalog::category_from_query(&platform::query_string());
        log::info!("Starting with category {}", this.category);

        this
    }

    /// Replay stored selections. Each part is placed once its image has loaded.
    fn restore(
        &mut self,
        ctx: &egui::Context,
        selections: BTreeMap<Category, PartSelection>,
        name: Option<String>,
    ) {
        log::info!("Restoring {} stored part(s)", selections.len());
        for (category, selection) in selections {
            let ticket = self
                .scene
                .begin_load(category, &selection.src, Some(selection.pos));
            self.loader.request(ctx, ticket, &selection.src);
        }
        if let Some(name) = name {
            self.scene.set_name(&name);
            self.name_draft = name;
        }
        self.restored = true;
    }

    fn select_part(&mut self, ctx: &egui::Context, category: Category, option: u8) {
        let Some(src) = category.image_source(option) else {
            log::warn!("No option {option} for {category}");
            return;
        };
        log::info!("Selected {src}");
        let ticket = self.scene.begin_load(category, &src, None);
        self.loader.request(ctx, ticket, &src);
        ctx.request_repaint();
    }

    fn apply_name(&mut self) {
        let text = self.name_draft.trim().to_owned();
        self.scene.set_name(&text);
        self.unsaved_name = Some(text);
    }

    fn reset(&mut self) {
        log::info!("Resetting monster");
        self.scene.clear();
        self.dragging = None;
        self.unsaved.clear();
        self.unsaved_name = None;
        self.name_draft.clear();
        self.reset_requested = true;
    }

    fn apply_loads(&mut self, ctx: &egui::Context) {
        let results = self.loader.poll();
        self.apply_load_results(ctx, results);
    }

    fn apply_load_results(&mut self, ctx: &egui::Context, results: Vec<LoadResult>) {
        for LoadResult { ticket, src, image } in results {
            match ticket.target {
                LoadTarget::Thumbnail => {
                    let thumbnail = match image {
                        Ok(image) => Thumbnail::Ready(ctx.load_texture(
                            format!("thumb:{src}"),
                            image.to_color_image(),
                            TextureOptions::LINEAR,
                        )),
                        Err(e) => {
                            log::error!("Failed to load thumbnail {src}: {e}");
                            Thumbnail::Failed
                        }
                    };
                    self.thumbnails.insert(src, thumbnail);
                }
                LoadTarget::Part(category) => {
                    let Some(load) = self.scene.finish_load(ticket) else {
                        log::debug!("Dropping stale load of {src}");
                        continue;
                    };
                    match image {
                        Ok(image) => {
                            let texture = ctx.load_texture(
                                format!("part:{category}"),
                                image.to_color_image(),
                                TextureOptions::LINEAR,
                            );
                            let selection = self.scene.place(
                                category,
                                load,
                                texture,
                                image.pixels,
                                self.config.fit_fraction,
                            );
                            self.unsaved.push(selection);
                        }
                        Err(e) => log::error!("Failed to load image {src}: {e}"),
                    }
                }
            }
        }
    }

    fn request_thumbnails(&mut self, ctx: &egui::Context) {
        for (_, src) in self.category.options() {
            if self.thumbnails.contains_key(&src) {
                continue;
            }
            let ticket = LoadTicket {
                target: LoadTarget::Thumbnail,
                generation: 0,
            };
            self.loader.request(ctx, ticket, &src);
            self.thumbnails.insert(src, Thumbnail::Loading);
        }
    }

    fn export(&mut self) {
        log::info!("Exporting {EXPORT_FILE_NAME}");
        let result = export::render_png(&self.scene, self.config.name_overlay, self.config.pixel_ratio)
            .and_then(|png| platform::save_png(EXPORT_FILE_NAME, &png));

        match result {
            Ok(()) => self.error = None,
            Err(e) => {
                log::error!("Export failed: {e}");
                let message = format!("Export failed: {e}");
                platform::alert(&message);
                self.error = Some(message);
            }
        }
    }

    /// Flush this frame's writes to `storage`, or to the in-memory fallback
    /// when the platform has none. A reset clears storage before anything
    /// collected after it is written.
    fn flush(&mut self, storage: Option<&mut (dyn eframe::Storage + 'static)>) {
        if !self.reset_requested && self.unsaved.is_empty() && self.unsaved_name.is_none() {
            return;
        }
        let storage: &mut dyn eframe::Storage = match storage {
            Some(storage) => storage,
            None => &mut self.fallback_storage,
        };
        let mut store = SelectionStore::new(storage);
        if std::mem::take(&mut self.reset_requested) {
            store.clear();
        }
        for selection in self.unsaved.drain(..) {
            store.save(&selection);
        }
        if let Some(name) = self.unsaved_name.take() {
            store.save_name(&name);
        }
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui) {
        let side = self.config.canvas_side(ui.available_size());
        let moved = self.scene.resize(side, self.config.fit_fraction);
        if !moved.is_empty() {
            log::debug!("Canvas is now {side}pt, {} part(s) moved", moved.len());
        }
        self.unsaved.extend(moved);
        self.apply_loads(ui.ctx());

        let (response, painter) = ui.allocate_painter(vec2(side, side), Sense::drag());
        let canvas = response.rect;
        let offset = canvas.min.to_vec2();

        painter.rect_filled(canvas, 0.0, Color32::WHITE);
        let clipped = painter.with_clip_rect(canvas);
        let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
        for (_, node) in self.scene.nodes() {
            clipped.image(node.texture.id(), node.rect().translate(offset), uv, Color32::WHITE);
        }
        if self.config.name_overlay
            && let Some(name) = self.scene.name()
        {
            clipped.text(
                scene::name_anchor(name) + offset,
                Align2::CENTER_TOP,
                &name.text,
                FontId::proportional(name.font_size),
                Color32::BLACK,
            );
        }

        // Pick the part under the press, not where the pointer is once the
        // drag threshold has been crossed.
        let press_origin = ui.input(|i| i.pointer.press_origin());
        if response.drag_started() {
            self.dragging = press_origin.and_then(|origin| self.scene.hit_test(origin - offset));
        }
        if response.dragged() && let Some(category) = self.dragging {
            let delta = drag_step(
                response.drag_started(),
                press_origin,
                response.interact_pointer_pos(),
                response.drag_delta(),
            );
            if let Some(selection) = self.scene.drag_by(category, delta, self.config.clamp_drag) {
                self.unsaved.push(selection);
            }
        }
        if response.drag_stopped() {
            self.dragging = None;
        }

        let hovered = self
            .dragging
            .or_else(|| response.hover_pos().and_then(|p| self.scene.hit_test(p - offset)));
        if let Some(node) = hovered.and_then(|c| self.scene.node(c)) {
            clipped.rect_stroke(
                node.rect().translate(offset),
                2.0,
                Stroke::new(1.5, ui.visuals().selection.stroke.color),
                StrokeKind::Outside,
            );
        }
        painter.rect_stroke(
            canvas,
            0.0,
            ui.visuals().widgets.noninteractive.bg_stroke,
            StrokeKind::Outside,
        );
    }

    fn parts_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading(format!("Select {}", self.category.label()));
        ui.separator();

        self.request_thumbnails(ui.ctx());
        let category = self.category;
        let mut picked = None;
        for (option, src) in category.options() {
            let label = format!("{} {option}", category.label());
            let clicked = match self.thumbnails.get(&src) {
                Some(Thumbnail::Ready(texture)) => ui
                    .add(egui::Button::image_and_text(
                        egui::Image::new((texture.id(), vec2(THUMBNAIL_SIZE, THUMBNAIL_SIZE))),
                        label,
                    ))
                    .clicked(),
                Some(Thumbnail::Loading) => ui
                    .horizontal(|ui| {
                        let clicked = ui.button(&label).clicked();
                        ui.spinner();
                        clicked
                    })
                    .inner,
                Some(Thumbnail::Failed) | None => ui.button(label).clicked(),
            };
            if clicked {
                picked = Some(option);
            }
        }
        if let Some(option) = picked {
            self.select_part(ui.ctx(), category, option);
        }

        if self.scene.is_loading(category) {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading…");
            });
        }

        ui.separator();
        ui.label(format!("{} part(s) on the canvas", self.scene.len()));

        if let Some(err) = &self.error {
            ui.colored_label(Color32::RED, err);
        }

        ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
            powered_by_egui_and_eframe(ui);
            egui::warn_if_debug_build(ui);
        });
    }

    fn name_prompt(&mut self, ctx: &egui::Context) {
        let mut open = self.show_name_prompt;
        let mut apply = false;
        egui::Window::new("Name your monster")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                let edit = ui.text_edit_singleline(&mut self.name_draft);
                if edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    apply = true;
                }
                ui.horizontal(|ui| {
                    apply |= ui.button("Apply").clicked();
                    if ui.button("Clear").clicked() {
                        self.name_draft.clear();
                        apply = true;
                    }
                });
            });
        if apply {
            self.apply_name();
            open = false;
        }
        self.show_name_prompt = open;
    }

    fn settings_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        let mut reload = false;
        let fit_before = self.config.fit_fraction;
        egui::Window::new("Settings")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                let settings = &mut self.config;
                ui.checkbox(&mut settings.responsive_canvas, "Fit canvas to window");
                ui.add_enabled_ui(!settings.responsive_canvas, |ui| {
                    ui.horizontal(|ui| {
                        ui.label("Canvas size:");
                        ui.add(
                            egui::DragValue::new(&mut settings.canvas_size)
                                .range(config::MIN_CANVAS_SIZE..=config::MAX_CANVAS_SIZE)
                                .suffix(" pt"),
                        );
                    });
                });
                ui.horizontal(|ui| {
                    ui.label("Largest part:");
                    ui.add(
                        egui::Slider::new(&mut settings.fit_fraction, 0.1..=3.0)
                            .suffix("× canvas"),
                    );
                });
                ui.checkbox(&mut settings.name_overlay, "Show name on canvas");
                ui.checkbox(&mut settings.clamp_drag, "Keep parts inside the canvas");
                ui.horizontal(|ui| {
                    ui.label("Export density:");
                    ui.add(egui::Slider::new(&mut settings.pixel_ratio, 1.0..=4.0).suffix("×"));
                });
                #[cfg(not(target_arch = "wasm32"))]
                ui.horizontal(|ui| {
                    ui.label("Asset folder:");
                    ui.text_edit_singleline(&mut settings.asset_root);
                    reload = ui.button("Reload").clicked();
                });
            });
        self.show_settings = open;

        if (self.config.fit_fraction - fit_before).abs() > f32::EPSILON {
            let moved = self.scene.refit(self.config.fit_fraction);
            self.unsaved.extend(moved);
        }
        if reload {
            log::info!("Reloading parts from {}", self.config.asset_root);
            self.loader.set_asset_root(self.config.asset_root.clone());
            self.thumbnails.clear();
            self.reload_parts(ctx);
        }
    }

    fn reload_parts(&mut self, ctx: &egui::Context) {
        let current: Vec<_> = self
            .scene
            .nodes()
            .map(|(category, node)| (category, node.src.clone(), node.placement.pos))
            .collect();
        for (category, src, pos) in current {
            let ticket = self.scene.begin_load(category, &src, Some(pos));
            self.loader.request(ctx, ticket, &src);
        }
    }
}

impl eframe::App for MonsterApp {
    /// Called by the framework to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        if !self.restored {
            let (selections, name) = {
                let storage: &mut dyn eframe::Storage = match frame.storage_mut() {
                    Some(storage) => storage,
                    None => &mut self.fallback_storage,
                };
                let store = SelectionStore::new(storage);
                (store.load_all(), store.load_name())
            };
            self.restore(ctx, selections, name);
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                // NOTE: no File->Quit on web pages!
                let is_web = cfg!(target_arch = "wasm32");
                if !is_web {
                    ui.menu_button("File", |ui| {
                        if ui.button("Quit").clicked() {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                    ui.add_space(16.0);
                }

                ui.label("Part:");
                egui::ComboBox::from_id_salt("category")
                    .selected_text(self.category.label())
                    .show_ui(ui, |ui| {
                        for category in Category::ALL {
                            ui.selectable_value(&mut self.category, category, category.label());
                        }
                    });

                ui.separator();
                if self.config.name_overlay && ui.button("Name…").clicked() {
                    self.show_name_prompt = true;
                }
                if ui.button("Export PNG").clicked() {
                    self.export();
                }
                if ui.button("Reset").clicked() {
                    self.reset();
                }
                if ui.button("Settings").clicked() {
                    self.show_settings = !self.show_settings;
                }

                ui.separator();
                egui::widgets::global_theme_preference_buttons(ui);
            });
        });

        egui::SidePanel::left("parts_panel")
            .resizable(false)
            .min_width(180.0)
            .show(ctx, |ui| self.parts_ui(ui));

        if self.show_name_prompt {
            self.name_prompt(ctx);
        }
        if self.show_settings {
            self.settings_window(ctx);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| self.canvas_ui(ui));
        });

        self.flush(frame.storage_mut());
    }
}

/// How far to move the dragged part this frame. egui only reports a drag once
/// the pointer has left the press origin by a threshold, so the first frame
/// moves by everything since the press.
fn drag_step(started: bool, press_origin: Option<Pos2>, pointer: Option<Pos2>, frame_delta: Vec2) -> Vec2 {
    match (started, press_origin, pointer) {
        (true, Some(origin), Some(pointer)) => pointer - origin,
        _ => frame_delta,
    }
}

fn powered_by_egui_and_eframe(ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 0.0;
        ui.label("Powered by ");
        ui.hyperlink_to("egui", "https://github.com/emilk/egui");
        ui.label(" and ");
        ui.hyperlink_to(
            "eframe",
            "https://github.com/emilk/egui/tree/master/crates/eframe",
        );
        ui.label(".");
    });
}
