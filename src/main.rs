mod app;
mod ui_theme;

use eframe::egui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init(); // Initialize logger

    let app = app::OutpaintApp::new()?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([800.0, 560.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Outpaint Studio",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )?;
    Ok(())
}
