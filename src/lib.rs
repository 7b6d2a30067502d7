#![warn(clippy::all, rust_2018_idioms)]
//! Monster Maker: assemble a monster from image parts, name it and export it as PNG.

mod app;
pub mod catalog;
pub mod config;
pub mod export;
pub mod loader;
pub mod placement;
mod platform;
pub mod scene;
pub mod store;

pub use app::MonsterApp;

use eframe::NativeOptions;

#[cfg(target_os = "android")]
use egui_winit::winit;

impl MonsterApp {
    /// Run the app with provided `NativeOptions` (used by Android entrypoint).
    pub fn run(options: NativeOptions) -> Result<(), eframe::Error> {
        eframe::run_native(
            "Monster Maker",
            options,
            Box::new(|cc| Ok(Box::new(MonsterApp::new(cc)))),
        )
    }
}

#[cfg(target_os = "android")]
#[allow(unsafe_code)]
#[unsafe(no_mangle)]
pub extern "C" fn android_main(app: winit::platform::android::activity::AndroidApp) {
    use eframe::Renderer;

    unsafe {
        std::env::set_var("RUST_BACKTRACE", "full");
    }
    android_logger::init_once(
        android_logger::Config::default().with_max_level(log::LevelFilter::Info),
    );

    let options = NativeOptions {
        android_app: Some(app),
        renderer: Renderer::Wgpu,
        ..Default::default()
    };

    if let Err(err) = MonsterApp::run(options) {
        log::error!("Monster Maker exited with an error: {err}");
    }
}
