//! Rate Explorer Main Application
//! Main window with control panel and chart viewer. CSV files load in a
//! background thread; every view parameter change triggers one synchronous
//! recomputation pass. When a recomputation fails (empty date range, bad
//! parameter) the previous valid view stays on screen.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::thread;

use anyhow::Context as _;
use egui::SidePanel;

use crate::data::{CsvLoader, LoadedSeries, Series};
use crate::gui::chart_viewer::{ChartViewer, ViewData};
use crate::gui::control_panel::{ControlPanel, ControlPanelAction, UserSettings};
use crate::stats::Aggregator;

/// Bundled sample data, loaded at startup when present.
const DEFAULT_CSV: &str = "HistoricalRateDetail.csv";

/// Matches the fixed bin count of the original explorer.
const HIST_BINS: usize = 30;

/// CSV loading result from the background thread.
enum LoadResult {
    Progress(String),
    Complete(Box<LoadedSeries>, PathBuf),
    Error(String),
}

/// Main application window.
pub struct RateExplorerApp {
    series: Option<Series>,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,

    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,
}

impl RateExplorerApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings: UserSettings = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();

        let mut app = Self {
            series: None,
            control_panel: ControlPanel::new(settings),
            chart_viewer: ChartViewer::new(),
            load_rx: None,
            is_loading: false,
        };

        // Reopen the previous file, or fall back to the bundled sample.
        let startup_path = app
            .control_panel
            .settings
            .csv_path
            .clone()
            .filter(|p| p.exists())
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CSV);
                default.exists().then_some(default)
            });
        if let Some(path) = startup_path {
            app.start_load(path);
        }

        app
    }

    /// Handle CSV file selection.
    fn handle_browse_csv(&mut self) {
        if self.is_loading {
            return;
        }
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            self.start_load(path);
        }
    }

    /// Load and normalize a CSV in a background thread.
    fn start_load(&mut self, path: PathBuf) {
        if self.is_loading {
            return;
        }
        self.is_loading = true;
        self.control_panel.set_status("Loading CSV file...");

        let (tx, rx) = channel();
        self.load_rx = Some(rx);

        let policy = self.control_panel.settings.duplicate_policy;
        thread::spawn(move || {
            let _ = tx.send(LoadResult::Progress("Reading CSV file...".to_string()));
            match CsvLoader::load_path(&path, policy) {
                Ok(loaded) => {
                    let _ = tx.send(LoadResult::Complete(Box::new(loaded), path));
                }
                Err(e) => {
                    let _ = tx.send(LoadResult::Error(e.to_string()));
                }
            }
        });
    }

    /// Check for CSV loading results.
    fn check_load_results(&mut self) {
        let rx = self.load_rx.take();
        if let Some(rx) = rx {
            let mut should_keep_receiver = true;

            while let Ok(result) = rx.try_recv() {
                match result {
                    LoadResult::Progress(status) => {
                        self.control_panel.set_status(&status);
                    }
                    LoadResult::Complete(loaded, path) => {
                        self.control_panel.diagnostics = Some(loaded.diagnostics);
                        self.control_panel.settings.csv_path = Some(path);
                        self.series = Some(loaded.series);
                        self.clamp_date_range();
                        self.is_loading = false;
                        should_keep_receiver = false;
                        self.refresh_view();
                    }
                    LoadResult::Error(error) => {
                        self.control_panel.set_status(&format!("Error: {error}"));
                        self.is_loading = false;
                        should_keep_receiver = false;
                    }
                }
            }

            if should_keep_receiver {
                self.load_rx = Some(rx);
            }
        }
    }

    /// Keep the selected range inside the loaded series; reset to the full
    /// span when the stored range no longer makes sense.
    fn clamp_date_range(&mut self) {
        let Some(series) = &self.series else { return };
        let (Some(first), Some(last)) = (series.first_date(), series.last_date()) else {
            return;
        };

        let settings = &mut self.control_panel.settings;
        let start = settings.date_start.unwrap_or(first).clamp(first, last);
        let end = settings.date_end.unwrap_or(last).clamp(first, last);
        if start <= end {
            settings.date_start = Some(start);
            settings.date_end = Some(end);
        } else {
            settings.date_start = Some(first);
            settings.date_end = Some(last);
        }
    }

    /// One synchronous recomputation pass. On failure the previous view is
    /// retained and only the status line changes.
    fn refresh_view(&mut self) {
        let Some(series) = &self.series else { return };

        if series.is_empty() {
            self.chart_viewer.clear();
            self.control_panel.export_enabled = false;
            self.control_panel
                .set_status("Error: the file contains no valid data rows");
            return;
        }

        match Self::build_view(series, &self.control_panel.settings) {
            Ok(view) => {
                let shown = view.filtered.len();
                self.chart_viewer.set_view(view);
                self.control_panel.export_enabled = true;
                self.control_panel
                    .set_status(&format!("Showing {shown} of {} points", series.len()));
            }
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("No data") {
                    self.control_panel.set_status(&msg);
                } else {
                    self.control_panel.set_status(&format!("Error: {msg}"));
                }
            }
        }
    }

    /// Build all derived views for the current settings.
    fn build_view(series: &Series, settings: &UserSettings) -> anyhow::Result<ViewData> {
        let start = settings
            .date_start
            .or_else(|| series.first_date())
            .context("no data loaded")?;
        let end = settings
            .date_end
            .or_else(|| series.last_date())
            .context("no data loaded")?;

        let filtered = series.filter_range(start, end)?;
        let resampled = Aggregator::resample(filtered.points(), settings.resample);

        let rolling = if settings.show_rolling {
            Some(Aggregator::rolling_mean(
                &resampled.points,
                settings.rolling_window,
            )?)
        } else {
            None
        };

        let values = filtered.values();
        let histogram = if settings.show_hist {
            Some(Aggregator::histogram(&values, HIST_BINS)?)
        } else {
            None
        };
        let months = settings
            .show_box
            .then(|| Aggregator::monthly_groups(filtered.points()));

        let stats = Aggregator::describe(&values)?;

        let points = filtered.points();
        let last_value = points[points.len() - 1].value;
        let change_pct = (points.len() >= 2)
            .then(|| {
                let prev = points[points.len() - 2].value;
                (last_value - prev) / prev * 100.0
            })
            .filter(|c| c.is_finite());

        Ok(ViewData {
            filtered,
            plot_points: resampled.points,
            rolling,
            histogram,
            months,
            stats,
            last_value,
            change_pct,
        })
    }

    /// Handle "Download filtered CSV".
    fn handle_export_csv(&mut self) {
        let Some(view) = &self.chart_viewer.view else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .set_file_name("filtered_rates.csv")
            .save_file()
        else {
            return; // User cancelled
        };

        match Self::write_csv(&view.filtered, &path) {
            Ok(rows) => {
                self.control_panel
                    .set_status(&format!("Saved {rows} rows to {}", path.display()));
            }
            Err(e) => {
                self.control_panel.set_status(&format!("Error: {e:#}"));
            }
        }
    }

    fn write_csv(series: &Series, path: &Path) -> anyhow::Result<usize> {
        let csv = CsvLoader::to_csv(series).context("serializing CSV")?;
        std::fs::write(path, csv).with_context(|| format!("writing {}", path.display()))?;
        Ok(series.len())
    }
}

impl eframe::App for RateExplorerApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.control_panel.settings);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_load_results();

        if self.is_loading {
            ctx.request_repaint();
        }

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::BrowseCsv => self.handle_browse_csv(),
                        ControlPanelAction::SettingsChanged => {
                            self.clamp_date_range();
                            self.refresh_view();
                        }
                        ControlPanelAction::PolicyChanged => {
                            // The policy applies during normalization, so
                            // the source file must be loaded again.
                            if let Some(path) = self.control_panel.settings.csv_path.clone() {
                                self.start_load(path);
                            }
                        }
                        ControlPanelAction::ExportCsv => self.handle_export_csv(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Chart Viewer
        egui::CentralPanel::default().show(ctx, |ui| {
            let settings = self.control_panel.settings.clone();
            self.chart_viewer.show(ui, &settings);
        });
    }
}
