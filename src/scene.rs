//! The canvas contents: one node per category plus the optional name overlay.

use std::collections::BTreeMap;

use egui::{Pos2, Rect, TextureHandle, Vec2, pos2, vec2};
use image::RgbaImage;

use crate::catalog::Category;
use crate::loader::{LoadTarget, LoadTicket};
use crate::placement::{self, Placement};
use crate::store::PartSelection;

/// Name font size relative to the canvas side.
const NAME_FONT_FRACTION: f32 = 0.08;
const NAME_MIN_FONT_SIZE: f32 = 12.0;
/// Gap between the top edge of the canvas and the name.
const NAME_TOP_FRACTION: f32 = 0.03;

/// A placed part on the canvas.
pub struct SceneNode {
    pub src: String,
    pub texture: TextureHandle,
    /// Decoded source pixels, drawn by the PNG export.
    pub pixels: RgbaImage,
    pub natural: Vec2,
    pub placement: Placement,
}

impl SceneNode {
    pub fn rect(&self) -> Rect {
        self.placement.rect(self.natural)
    }
}

/// The monster's name, drawn centred along the top of the canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct NameOverlay {
    pub text: String,
    pub width: f32,
    pub font_size: f32,
    pub top: f32,
}

impl NameOverlay {
    fn fit(&mut self, canvas_size: f32) {
        self.width = canvas_size;
        self.font_size = (canvas_size * NAME_FONT_FRACTION).max(NAME_MIN_FONT_SIZE);
        self.top = canvas_size * NAME_TOP_FRACTION;
    }
}

/// A load that has been requested but not yet applied.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingLoad {
    pub generation: u64,
    pub src: String,
    /// Stored position to restore, or `None` to centre the part.
    pub restore: Option<Pos2>,
}

#[derive(Default)]
pub struct Scene {
    nodes: BTreeMap<Category, SceneNode>,
    pending: BTreeMap<Category, PendingLoad>,
    name: Option<NameOverlay>,
    canvas_size: f32,
    next_generation: u64,
}

impl Scene {
    /// Side of the square canvas in points.
    pub fn canvas_size(&self) -> f32 {
        self.canvas_size
    }

    /// Nodes in draw order (first is drawn at the bottom).
    pub fn nodes(&self) -> impl Iterator<Item = (Category, &SceneNode)> {
        self.nodes.iter().map(|(c, n)| (*c, n))
    }

    pub fn node(&self, category: Category) -> Option<&SceneNode> {
        self.nodes.get(&category)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self) -> Option<&NameOverlay> {
        self.name.as_ref()
    }

    /// Record a new load for `category`, superseding any earlier one.
    pub fn begin_load(&mut self, category: Category, src: &str, restore: Option<Pos2>) -> LoadTicket {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.pending.insert(
            category,
            PendingLoad {
                generation,
                src: src.to_owned(),
                restore,
            },
        );
        LoadTicket {
            target: LoadTarget::Part(category),
            generation,
        }
    }

    /// Whether `ticket` is still the newest load for its category.
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        match ticket.target {
            LoadTarget::Part(category) => self
                .pending
                .get(&category)
                .is_some_and(|p| p.generation == ticket.generation),
            LoadTarget::Thumbnail => false,
        }
    }

    /// Take the pending load for `ticket`. Stale tickets yield `None`.
    pub fn finish_load(&mut self, ticket: LoadTicket) -> Option<PendingLoad> {
        if !self.is_current(ticket) {
            return None;
        }
        match ticket.target {
            LoadTarget::Part(category) => self.pending.remove(&category),
            LoadTarget::Thumbnail => None,
        }
    }

    /// Whether a load for `category` is still outstanding.
    pub fn is_loading(&self, category: Category) -> bool {
        self.pending.contains_key(&category)
    }

    /// Put `node` in the category slot, returning the node it replaced.
    pub fn add_or_replace(&mut self, category: Category, node: SceneNode) -> Option<SceneNode> {
        let old = self.nodes.insert(category, node);
        if let Some(old) = &old {
            log::debug!("Replaced {category} node showing {}", old.src);
        }
        old
    }

    /// Place a freshly loaded image for a finished load and return the selection to persist.
    ///
    /// Restored positions that would be off-canvas are moved back to the centre.
    pub fn place(
        &mut self,
        category: Category,
        load: PendingLoad,
        texture: TextureHandle,
        pixels: RgbaImage,
        fit_fraction: f32,
    ) -> PartSelection {
        let (w, h) = pixels.dimensions();
        let natural = vec2(w as f32, h as f32);
        let placement = match load.restore {
            Some(pos) => Placement::restored(pos, natural, self.canvas_size, fit_fraction),
            None => Placement::centered(natural, self.canvas_size, fit_fraction),
        };
        let selection = PartSelection {
            category,
            src: load.src.clone(),
            pos: placement.pos,
        };
        self.add_or_replace(
            category,
            SceneNode {
                src: load.src,
                texture,
                pixels,
                natural,
                placement,
            },
        );
        selection
    }

    /// Topmost node under `pos`.
    pub fn hit_test(&self, pos: Pos2) -> Option<Category> {
        self.nodes
            .iter()
            .rev()
            .find(|(_, node)| node.rect().contains(pos))
            .map(|(category, _)| *category)
    }

    /// Move a node by `delta`, optionally keeping it inside the canvas.
    pub fn drag_by(&mut self, category: Category, delta: Vec2, clamp: bool) -> Option<PartSelection> {
        let canvas_size = self.canvas_size;
        let node = self.nodes.get_mut(&category)?;
        let mut pos = node.placement.pos + delta;
        if clamp {
            pos = placement::clamp_position(pos, node.rect().size(), canvas_size);
        }
        node.placement.pos = pos;
        Some(PartSelection {
            category,
            src: node.src.clone(),
            pos,
        })
    }

    /// Show `text` as the name, creating the overlay on first use. Blank text removes it.
    pub fn set_name(&mut self, text: &str) {
        if text.trim().is_empty() {
            self.name = None;
            return;
        }
        let canvas_size = self.canvas_size;
        let overlay = self.name.get_or_insert_with(|| NameOverlay {
            text: String::new(),
            width: 0.0,
            font_size: 0.0,
            top: 0.0,
        });
        text.clone_into(&mut overlay.text);
        overlay.fit(canvas_size);
    }

    /// Adopt a new canvas size, reflowing every node and the name.
    ///
    /// Returns the selections whose position changed.
    pub fn resize(&mut self, canvas_size: f32, fit_fraction: f32) -> Vec<PartSelection> {
        if (self.canvas_size - canvas_size).abs() < f32::EPSILON {
            return Vec::new();
        }
        self.canvas_size = canvas_size;
        if let Some(name) = &mut self.name {
            name.fit(canvas_size);
        }

        let mut moved = Vec::new();
        for (category, node) in &mut self.nodes {
            let placement = node.placement.reflow(node.natural, canvas_size, fit_fraction);
            if placement.pos != node.placement.pos {
                moved.push(PartSelection {
                    category: *category,
                    src: node.src.clone(),
                    pos: placement.pos,
                });
            }
            node.placement = placement;
        }
        moved
    }

    /// Recompute every scale after the fit fraction changed, keeping visual centres.
    ///
    /// Returns the selections whose position changed.
    pub fn refit(&mut self, fit_fraction: f32) -> Vec<PartSelection> {
        let canvas_size = self.canvas_size;
        let mut moved = Vec::new();
        for (category, node) in &mut self.nodes {
            let center = node.rect().center();
            let scale = placement::compute_scale(node.natural, canvas_size, fit_fraction);
            let pos = center - node.natural * scale / 2.0;
            if pos != node.placement.pos {
                moved.push(PartSelection {
                    category: *category,
                    src: node.src.clone(),
                    pos,
                });
            }
            node.placement = Placement { pos, scale };
        }
        moved
    }

    /// Drop every node, pending load and the name.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.pending.clear();
        self.name = None;
    }
}

/// Canvas-space origin of the name text's top centre.
pub fn name_anchor(name: &NameOverlay) -> Pos2 {
    pos2(name.width / 2.0, name.top)
}
