// GUI-subsystem binary: no console window is ever allocated by Windows.
#![windows_subsystem = "windows"]

use eframe::egui;
use pixelpad::app::PixelPadApp;
use pixelpad::{assets, logger};

fn main() -> Result<(), eframe::Error> {
    // Initialize session log (overwrites previous session log)
    logger::init();

    // Window icon (title bar, taskbar, Alt+Tab), upscaled from the built-in
    // pencil art
    let icon = load_app_icon();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("PixelPad")
            .with_icon(std::sync::Arc::new(icon)),
        ..Default::default()
    };

    eframe::run_native(
        "PixelPad",
        options,
        Box::new(|cc| Box::new(PixelPadApp::new(cc))),
    )
}

fn load_app_icon() -> egui::viewport::IconData {
    let (rgba, width, height) = assets::app_icon_rgba();
    egui::viewport::IconData {
        rgba,
        width,
        height,
    }
}
