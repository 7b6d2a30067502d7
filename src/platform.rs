// Platform helpers. On wasm these talk to the page (query string, blob download, alert);
// on native they use the command line and rfd dialogs.

#[cfg(not(target_arch = "wasm32"))]
use crate::export::ExportError;

#[cfg(target_arch = "wasm32")]
mod web {
    use wasm_bindgen::JsCast as _;

    use crate::export::ExportError;

    pub fn query_string() -> String {
        web_sys::window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default()
    }

    pub fn save_png(file_name: &str, bytes: &[u8]) -> Result<(), ExportError> {
        let err = |e: wasm_bindgen::JsValue| ExportError::Write(format!("{e:?}"));
        let window = web_sys::window().ok_or_else(|| ExportError::Write("no window".to_owned()))?;
        let document = window
            .document()
            .ok_or_else(|| ExportError::Write("no document".to_owned()))?;

        let parts = js_sys::Array::of1(&js_sys::Uint8Array::from(bytes));
        let options = web_sys::BlobPropertyBag::new();
        options.set_type("image/png");
        let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options).map_err(err)?;
        let url = web_sys::Url::create_object_url_with_blob(&blob).map_err(err)?;

        let anchor: web_sys::HtmlAnchorElement = document
            .create_element("a")
            .map_err(err)?
            .dyn_into()
            .map_err(|_| ExportError::Write("could not create link".to_owned()))?;
        anchor.set_href(&url);
        anchor.set_download(file_name);
        anchor.click();
        web_sys::Url::revoke_object_url(&url).map_err(err)
    }

    pub fn alert(message: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(message);
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::{alert, query_string, save_png};

/// Command line as a query string: `category=eyes` or `--category eyes` become `?category=eyes`.
#[cfg(not(target_arch = "wasm32"))]
pub fn query_string() -> String {
    query_from_args(std::env::args().skip(1))
}

#[cfg_attr(target_arch = "wasm32", expect(dead_code))]
fn query_from_args(args: impl Iterator<Item = String>) -> String {
    let mut pairs = Vec::new();
    let mut args = args.peekable();
    while let Some(arg) = args.next() {
        if let Some(flag) = arg.strip_prefix("--") {
            if let Some((k, v)) = flag.split_once('=') {
                pairs.push(format!("{k}={v}"));
            } else if let Some(value) = args.next_if(|next| !next.starts_with("--")) {
                pairs.push(format!("{flag}={value}"));
            }
        } else if arg.contains('=') {
            pairs.push(arg);
        }
    }
    format!("?{}", pairs.join("&"))
}

#[cfg(all(not(target_arch = "wasm32"), not(target_os = "android")))]
pub fn save_png(file_name: &str, bytes: &[u8]) -> Result<(), ExportError> {
    let Some(path) = rfd::FileDialog::new()
        .add_filter("PNG image", &["png"])
        .set_file_name(file_name)
        .save_file()
    else {
        log::info!("Export cancelled");
        return Ok(());
    };
    std::fs::write(&path, bytes).map_err(|e| ExportError::Write(format!("{}: {e}", path.display())))?;
    log::info!("Saved {}", path.display());
    Ok(())
}

#[cfg(all(not(target_arch = "wasm32"), not(target_os = "android")))]
pub fn alert(message: &str) {
    let _ = rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title("Monster Maker")
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

// No dialogs on Android: write next to the app and log.
#[cfg(target_os = "android")]
pub fn save_png(file_name: &str, bytes: &[u8]) -> Result<(), ExportError> {
    std::fs::write(file_name, bytes).map_err(|e| ExportError::Write(e.to_string()))
}

#[cfg(target_os = "android")]
pub fn alert(message: &str) {
    log::error!("{message}");
}
