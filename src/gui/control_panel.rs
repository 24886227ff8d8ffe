//! Control Panel Widget
//! Left side panel with all view and plot options.

use chrono::NaiveDate;
use egui::{Color32, ComboBox, RichText};
use egui_extras::DatePickerButton;
use std::path::PathBuf;

use crate::data::{DuplicatePolicy, LoadDiagnostics};
use crate::stats::ResampleFreq;

/// Time-series chart style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum ChartKind {
    #[default]
    Line,
    Area,
    Bar,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [ChartKind::Line, ChartKind::Area, ChartKind::Bar];

    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Line => "Line",
            ChartKind::Area => "Area",
            ChartKind::Bar => "Bar",
        }
    }
}

/// User-selected view options, persisted across sessions.
#[derive(Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserSettings {
    pub csv_path: Option<PathBuf>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub chart_kind: ChartKind,
    pub show_rolling: bool,
    pub rolling_window: usize,
    pub resample: ResampleFreq,
    pub show_hist: bool,
    pub show_box: bool,
    pub show_table: bool,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            csv_path: None,
            date_start: None,
            date_end: None,
            chart_kind: ChartKind::Line,
            show_rolling: false,
            rolling_window: 7,
            resample: ResampleFreq::None,
            show_hist: false,
            show_box: false,
            show_table: true,
            duplicate_policy: DuplicatePolicy::KeepLast,
        }
    }
}

/// Left side control panel with file selection and view options.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub diagnostics: Option<LoadDiagnostics>,
    pub status: String,
    pub export_enabled: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            settings: UserSettings::default(),
            diagnostics: None,
            status: "Ready".to_string(),
            export_enabled: false,
        }
    }
}

impl ControlPanel {
    pub fn new(settings: UserSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Draw the control panel and report what the user did this frame.
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;
        let before = self.settings.clone();

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("📈 Rate Explorer")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Date,Value CSV analysis")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source Section =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let path_text = self
                        .settings
                        .csv_path
                        .as_ref()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "No file selected".to_string());

                    ui.label(RichText::new(&path_text).size(12.0).color(
                        if self.settings.csv_path.is_some() {
                            Color32::WHITE
                        } else {
                            Color32::GRAY
                        },
                    ));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("📂 Browse").clicked() {
                            action = ControlPanelAction::BrowseCsv;
                        }
                    });
                });

                ui.horizontal(|ui| {
                    ui.label(RichText::new("Duplicate dates:").size(12.0));
                    ComboBox::from_id_salt("duplicate_policy")
                        .width(110.0)
                        .selected_text(self.settings.duplicate_policy.label())
                        .show_ui(ui, |ui| {
                            for policy in DuplicatePolicy::ALL {
                                if ui
                                    .selectable_label(
                                        self.settings.duplicate_policy == policy,
                                        policy.label(),
                                    )
                                    .clicked()
                                {
                                    self.settings.duplicate_policy = policy;
                                    action = ControlPanelAction::PolicyChanged;
                                }
                            }
                        });
                });
            });

        if let Some(diag) = self.diagnostics {
            ui.add_space(3.0);
            let text = format!(
                "{} rows read, {} discarded",
                diag.rows_read, diag.rows_discarded
            );
            let color = if diag.rows_discarded > 0 {
                Color32::from_rgb(243, 156, 18)
            } else {
                Color32::GRAY
            };
            ui.label(RichText::new(text).size(11.0).color(color));
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Date Range Section =====
        ui.label(RichText::new("📅 Date Range").size(14.0).strong());
        ui.add_space(5.0);

        match (self.settings.date_start, self.settings.date_end) {
            (Some(mut start), Some(mut end)) => {
                ui.horizontal(|ui| {
                    ui.label("From:");
                    if ui
                        .add(DatePickerButton::new(&mut start).id_salt("date_start"))
                        .changed()
                    {
                        self.settings.date_start = Some(start);
                    }
                });
                ui.horizontal(|ui| {
                    ui.label("To:");
                    if ui
                        .add(DatePickerButton::new(&mut end).id_salt("date_end"))
                        .changed()
                    {
                        self.settings.date_end = Some(end);
                    }
                });
            }
            _ => {
                ui.label(RichText::new("Load a CSV first").size(11.0).color(Color32::GRAY));
            }
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== View & Plot Options =====
        ui.label(RichText::new("⚙ View & Plot Options").size(14.0).strong());
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.label("Chart type:");
            ComboBox::from_id_salt("chart_kind")
                .width(100.0)
                .selected_text(self.settings.chart_kind.label())
                .show_ui(ui, |ui| {
                    for kind in ChartKind::ALL {
                        ui.selectable_value(&mut self.settings.chart_kind, kind, kind.label());
                    }
                });
        });

        ui.add_space(5.0);

        ui.horizontal(|ui| {
            ui.label("Resample:");
            ComboBox::from_id_salt("resample_freq")
                .width(100.0)
                .selected_text(self.settings.resample.label())
                .show_ui(ui, |ui| {
                    for freq in ResampleFreq::ALL {
                        ui.selectable_value(&mut self.settings.resample, freq, freq.label());
                    }
                });
        });

        ui.add_space(5.0);

        ui.checkbox(&mut self.settings.show_rolling, "Show rolling mean");
        if self.settings.show_rolling {
            let mut window = self.settings.rolling_window as u32;
            ui.add(egui::Slider::new(&mut window, 2..=60).text("window (days)"));
            self.settings.rolling_window = window as usize;
        }

        ui.add_space(5.0);

        ui.checkbox(&mut self.settings.show_hist, "Show histogram");
        ui.checkbox(&mut self.settings.show_box, "Show boxplot by month");
        ui.checkbox(&mut self.settings.show_table, "Show raw table");

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Export =====
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.export_enabled, |ui| {
                let button = egui::Button::new(RichText::new("💾 Download filtered CSV").size(14.0))
                    .min_size(egui::vec2(200.0, 30.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::ExportCsv;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Status =====
        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.contains("No data") {
            Color32::from_rgb(243, 156, 18)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        if action == ControlPanelAction::None && self.settings != before {
            action = ControlPanelAction::SettingsChanged;
        }
        action
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPanelAction {
    None,
    BrowseCsv,
    /// Any view parameter changed: recompute the derived views.
    SettingsChanged,
    /// Duplicate policy changed: the CSV must be re-normalized from source.
    PolicyChanged,
    ExportCsv,
}
