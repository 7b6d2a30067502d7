//! Asynchronous image loading.
//!
//! Native builds read and decode on a worker thread; web builds `fetch` the
//! image relative to the page. Either way the decoded result is sent back over
//! a channel together with the ticket it was requested under, and the UI is
//! woken up with `request_repaint`.

use std::fmt;
use std::sync::mpsc::{Receiver, Sender, channel};

use crate::catalog::Category;

/// What a load result is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadTarget {
    /// A canvas part for this category.
    Part(Category),
    /// An option button thumbnail.
    Thumbnail,
}

/// Identifies one load request. Part loads are only applied while their
/// generation is still the newest for the category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    pub target: LoadTarget,
    pub generation: u64,
}

/// A decoded RGBA image. The pixels are kept after upload so the canvas can be
/// composed off-screen for export.
pub struct DecodedImage {
    pub pixels: image::RgbaImage,
}

impl DecodedImage {
    pub fn decode(bytes: &[u8]) -> Result<Self, LoadError> {
        let pixels = image::load_from_memory(bytes)
            .map_err(|e| LoadError::Decode(e.to_string()))?
            .to_rgba8();
        Ok(Self { pixels })
    }

    pub fn to_color_image(&self) -> egui::ColorImage {
        let (w, h) = self.pixels.dimensions();
        egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], self.pixels.as_raw())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    Read(String),
    Fetch(String),
    Decode(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(e) => write!(f, "read failed: {e}"),
            Self::Fetch(e) => write!(f, "fetch failed: {e}"),
            Self::Decode(e) => write!(f, "decode failed: {e}"),
        }
    }
}

impl std::error::Error for LoadError {}

pub struct LoadResult {
    pub ticket: LoadTicket,
    pub src: String,
    pub image: Result<DecodedImage, LoadError>,
}

/// Starts loads and collects their results.
pub struct ImageLoader {
    #[cfg_attr(target_arch = "wasm32", expect(dead_code))]
    asset_root: String,
    tx: Sender<LoadResult>,
    rx: Receiver<LoadResult>,
}

impl ImageLoader {
    pub fn new(asset_root: impl Into<String>) -> Self {
        let (tx, rx) = channel();
        Self {
            asset_root: asset_root.into(),
            tx,
            rx,
        }
    }

    pub fn set_asset_root(&mut self, asset_root: impl Into<String>) {
        self.asset_root = asset_root.into();
    }

    /// Start loading `src`. The result shows up in a later [`Self::poll`].
    pub fn request(&self, ctx: &egui::Context, ticket: LoadTicket, src: &str) {
        log::debug!("Loading {src} for {ticket:?}");
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        let src = src.to_owned();

        #[cfg(not(target_arch = "wasm32"))]
        {
            let path = std::path::Path::new(&self.asset_root).join(&src);
            std::thread::spawn(move || {
                let image = std::fs::read(&path)
                    .map_err(|e| LoadError::Read(format!("{}: {e}", path.display())))
                    .and_then(|bytes| DecodedImage::decode(&bytes));
                send(&tx, &ctx, LoadResult { ticket, src, image });
            });
        }

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(async move {
            let image = web::fetch_bytes(&src)
                .await
                .and_then(|bytes| DecodedImage::decode(&bytes));
            send(&tx, &ctx, LoadResult { ticket, src, image });
        });
    }

    /// Completed loads, in completion order.
    pub fn poll(&self) -> Vec<LoadResult> {
        self.rx.try_iter().collect()
    }
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new(crate::config::EditorConfig::default().asset_root)
    }
}

fn send(tx: &Sender<LoadResult>, ctx: &egui::Context, result: LoadResult) {
    // The receiver is gone only when the app is shutting down.
    if tx.send(result).is_ok() {
        ctx.request_repaint();
    }
}

#[cfg(target_arch = "wasm32")]
mod web {
    use wasm_bindgen::JsCast as _;
    use wasm_bindgen_futures::JsFuture;

    use super::LoadError;

    fn js_err(e: wasm_bindgen::JsValue) -> LoadError {
        LoadError::Fetch(format!("{e:?}"))
    }

    pub async fn fetch_bytes(src: &str) -> Result<Vec<u8>, LoadError> {
        let window = web_sys::window().ok_or_else(|| LoadError::Fetch("no window".to_owned()))?;
        let resp: web_sys::Response = JsFuture::from(window.fetch_with_str(src))
            .await
            .map_err(js_err)?
            .dyn_into()
            .map_err(js_err)?;
        if !resp.ok() {
            return Err(LoadError::Fetch(format!("{src}: HTTP {}", resp.status())));
        }
        let buf = JsFuture::from(resp.array_buffer().map_err(js_err)?)
            .await
            .map_err(js_err)?;
        Ok(js_sys::Uint8Array::new(&buf).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png_dimensions() {
        let image = DecodedImage::decode(&png_bytes(3, 2)).unwrap();
        assert_eq!(image.pixels.dimensions(), (3, 2));
        assert_eq!(image.to_color_image().size, [3, 2]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            DecodedImage::decode(b"not an image"),
            Err(LoadError::Decode(_))
        ));
    }

    #[test]
    fn missing_file_reports_read_error() {
        let ctx = egui::Context::default();
        let loader = ImageLoader::new("definitely/not/here");
        let ticket = LoadTicket {
            target: LoadTarget::Part(Category::Eyes),
            generation: 7,
        };
        loader.request(&ctx, ticket, "images/eyes/eyes1.png");

        let result = loader.rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
        assert_eq!(result.ticket, ticket);
        assert_eq!(result.src, "images/eyes/eyes1.png");
        assert!(matches!(result.image, Err(LoadError::Read(_))));
    }
}
