//! Rate Explorer - Historical Rate CSV Analysis & Interactive Chart Viewer
//!
//! A Rust application for exploring Date,Value time-series CSVs: resampling,
//! rolling statistics, histograms, monthly boxplots and summary statistics.

mod data;
mod gui;
mod stats;

use eframe::egui;
use gui::RateExplorerApp;

fn main() -> eframe::Result<()> {
    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([1100.0, 650.0])
            .with_title("Rate Explorer"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Rate Explorer",
        options,
        Box::new(|cc| Ok(Box::new(RateExplorerApp::new(cc)))),
    )
}
