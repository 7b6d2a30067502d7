//! Persisted part selections and the monster name.
//!
//! Both live as JSON strings in the app's [`eframe::Storage`], which is
//! `localStorage` on the web and a RON file on native.

use std::collections::BTreeMap;

use egui::{Pos2, pos2};
use serde::{Deserialize, Serialize};

use crate::catalog::Category;

/// Storage key for the category → `{src, x, y}` object.
pub const PARTS_KEY: &str = "monsterParts";

/// Storage key for the `{text}` name object.
pub const NAME_KEY: &str = "monsterName";

/// The chosen image and placement for one category.
#[derive(Clone, Debug, PartialEq)]
pub struct PartSelection {
    pub category: Category,
    pub src: String,
    pub pos: Pos2,
}

#[derive(Serialize, Deserialize)]
struct StoredPart {
    src: String,
    x: f32,
    y: f32,
}

#[derive(Serialize, Deserialize)]
struct StoredName {
    text: String,
}

/// Reads and writes selections. Last write wins per category.
pub struct SelectionStore<'a> {
    storage: &'a mut dyn eframe::Storage,
}

impl<'a> SelectionStore<'a> {
    pub fn new(storage: &'a mut dyn eframe::Storage) -> Self {
        Self { storage }
    }

    pub fn save(&mut self, selection: &PartSelection) {
        let mut parts = self.raw_parts();
        let stored = StoredPart {
            src: selection.src.clone(),
            x: selection.pos.x,
            y: selection.pos.y,
        };
        match serde_json::to_value(stored) {
            Ok(value) => {
                parts.insert(selection.category.key().to_owned(), value);
                self.write_parts(&parts);
            }
            Err(err) => log::error!("Failed to encode {} selection: {err}", selection.category),
        }
    }

    /// Every valid stored selection. Unknown categories and malformed entries are skipped.
    pub fn load_all(&self) -> BTreeMap<Category, PartSelection> {
        let mut selections = BTreeMap::new();
        for (key, value) in self.raw_parts() {
            let category = match key.parse::<Category>() {
                Ok(category) => category,
                Err(err) => {
                    log::warn!("Skipping stored part: {err}");
                    continue;
                }
            };
            match serde_json::from_value::<StoredPart>(value) {
                Ok(part) if part.x.is_finite() && part.y.is_finite() => {
                    selections.insert(
                        category,
                        PartSelection {
                            category,
                            src: part.src,
                            pos: pos2(part.x, part.y),
                        },
                    );
                }
                Ok(_) => log::warn!("Skipping stored {category} part with non-finite position"),
                Err(err) => log::warn!("Skipping malformed stored {category} part: {err}"),
            }
        }
        selections
    }

    /// Store the name. Blank text is stored as an empty value, which reads back as no name.
    pub fn save_name(&mut self, text: &str) {
        if text.trim().is_empty() {
            self.storage.set_string(NAME_KEY, String::new());
            return;
        }
        let stored = StoredName {
            text: text.to_owned(),
        };
        match serde_json::to_string(&stored) {
            Ok(json) => self.storage.set_string(NAME_KEY, json),
            Err(err) => log::error!("Failed to encode monster name: {err}"),
        }
    }

    pub fn load_name(&self) -> Option<String> {
        let raw = self.storage.get_string(NAME_KEY)?;
        if raw.trim().is_empty() {
            return None;
        }
        match serde_json::from_str::<StoredName>(&raw) {
            Ok(name) if !name.text.trim().is_empty() => Some(name.text),
            Ok(_) => None,
            Err(err) => {
                log::warn!("Ignoring malformed stored name: {err}");
                None
            }
        }
    }

    /// Forget every selection and the name.
    pub fn clear(&mut self) {
        self.write_parts(&serde_json::Map::new());
        self.storage.set_string(NAME_KEY, String::new());
    }

    fn raw_parts(&self) -> serde_json::Map<String, serde_json::Value> {
        let Some(raw) = self.storage.get_string(PARTS_KEY) else {
            return serde_json::Map::new();
        };
        if raw.trim().is_empty() {
            return serde_json::Map::new();
        }
        match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(err) => {
                log::warn!("Ignoring malformed stored parts: {err}");
                serde_json::Map::new()
            }
        }
    }

    fn write_parts(&mut self, parts: &serde_json::Map<String, serde_json::Value>) {
        match serde_json::to_string(parts) {
            Ok(json) => self.storage.set_string(PARTS_KEY, json),
            Err(err) => log::error!("Failed to encode stored parts: {err}"),
        }
    }
}

/// In-memory [`eframe::Storage`], used when the platform offers none.
#[derive(Default)]
pub struct MemoryStorage {
    values: BTreeMap<String, String>,
}

impl eframe::Storage for MemoryStorage {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_string(&mut self, key: &str, value: String) {
        self.values.insert(key.to_owned(), value);
    }

    fn flush(&mut self) {}
}
