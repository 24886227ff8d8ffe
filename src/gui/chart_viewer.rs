//! Chart Viewer Widget
//! Central scrollable panel rendering the interactive charts with egui_plot:
//! time series (with rolling overlay), histogram, monthly boxplot, the
//! summary statistics grid and the raw data table.

use chrono::{Duration, NaiveDate};
use egui::{Color32, RichText, ScrollArea};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoints};

use crate::data::{Series, TimeSeriesPoint};
use crate::gui::control_panel::{ChartKind, UserSettings};
use crate::stats::{Aggregator, HistogramBin, MonthGroup, SummaryStats};

const VALUE_COLOR: Color32 = Color32::from_rgb(52, 152, 219); // Blue
const ROLLING_COLOR: Color32 = Color32::from_rgb(243, 156, 18); // Orange
const HIST_COLOR: Color32 = Color32::from_rgb(26, 188, 156); // Teal
const BOX_COLOR: Color32 = Color32::from_rgb(155, 89, 182); // Purple

const TABLE_ROW_HEIGHT: f32 = 18.0;

/// Everything the viewer needs to draw one valid view. Rebuilt on every
/// parameter change; the previous instance is kept when a rebuild fails.
#[derive(Clone)]
pub struct ViewData {
    /// Date-filtered raw series (table, export, quick stats).
    pub filtered: Series,
    /// Possibly resampled points driving the main chart.
    pub plot_points: Vec<TimeSeriesPoint>,
    pub rolling: Option<Vec<TimeSeriesPoint>>,
    pub histogram: Option<Vec<HistogramBin>>,
    pub months: Option<Vec<MonthGroup>>,
    pub stats: SummaryStats,
    pub last_value: f64,
    /// Percent change of the last point versus the one before it.
    pub change_pct: Option<f64>,
}

/// Scrollable central display area.
#[derive(Default)]
pub struct ChartViewer {
    pub view: Option<ViewData>,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.view = None;
    }

    pub fn set_view(&mut self, view: ViewData) {
        self.view = Some(view);
    }

    pub fn show(&mut self, ui: &mut egui::Ui, settings: &UserSettings) {
        let Some(view) = &self.view else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        };

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.label(RichText::new("Time series").size(16.0).strong());
                Self::draw_time_series(ui, view, settings);
                ui.add_space(10.0);

                Self::draw_quick_stats(ui, view);
                ui.add_space(10.0);

                if settings.show_hist {
                    if let Some(bins) = &view.histogram {
                        ui.separator();
                        ui.label(RichText::new("Distribution").size(16.0).strong());
                        Self::draw_histogram(ui, bins);
                        ui.add_space(10.0);
                    }
                }

                if settings.show_box {
                    if let Some(months) = &view.months {
                        ui.separator();
                        ui.label(RichText::new("Boxplot by month").size(16.0).strong());
                        Self::draw_monthly_boxplot(ui, months);
                        ui.add_space(10.0);
                    }
                }

                if settings.show_table {
                    ui.separator();
                    ui.label(RichText::new("Data").size(16.0).strong());
                    Self::draw_table(ui, &view.filtered);
                }
            });
    }

    /// Main chart: line/area/bar of the (possibly resampled) series, with
    /// an optional rolling-mean overlay.
    fn draw_time_series(ui: &mut egui::Ui, view: &ViewData, settings: &UserSettings) {
        let points: Vec<[f64; 2]> = view
            .plot_points
            .iter()
            .map(|p| [Self::day_x(p.date), p.value])
            .collect();

        Plot::new("time_series")
            .height(320.0)
            .allow_scroll(false)
            .legend(Legend::default())
            .x_axis_label("Date")
            .y_axis_label("Value")
            .x_axis_formatter(|mark, _range| Self::format_day_x(mark.value))
            .show(ui, |plot_ui| {
                match settings.chart_kind {
                    ChartKind::Line => {
                        plot_ui.line(
                            Line::new(PlotPoints::from(points.clone()))
                                .color(VALUE_COLOR)
                                .width(1.5)
                                .name("Value"),
                        );
                    }
                    ChartKind::Area => {
                        plot_ui.line(
                            Line::new(PlotPoints::from(points.clone()))
                                .color(VALUE_COLOR)
                                .width(1.5)
                                .fill(0.0)
                                .name("Value"),
                        );
                    }
                    ChartKind::Bar => {
                        let width = Self::bar_width(&view.plot_points);
                        let bars: Vec<Bar> = points
                            .iter()
                            .map(|&[x, y]| Bar::new(x, y).width(width))
                            .collect();
                        plot_ui.bar_chart(
                            BarChart::new(bars)
                                .color(VALUE_COLOR.gamma_multiply(0.8))
                                .name("Value"),
                        );
                    }
                }

                if let Some(rolling) = &view.rolling {
                    let rolling_points: Vec<[f64; 2]> = rolling
                        .iter()
                        .map(|p| [Self::day_x(p.date), p.value])
                        .collect();
                    plot_ui.line(
                        Line::new(PlotPoints::from(rolling_points))
                            .color(ROLLING_COLOR)
                            .width(2.0)
                            .name(format!("Rolling {}d", settings.rolling_window)),
                    );
                }
            });
    }

    /// Last value, change and the describe()-style statistics row.
    fn draw_quick_stats(ui: &mut egui::Ui, view: &ViewData) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Last value:").strong().size(12.0));
                    ui.label(RichText::new(format!("{:.4}", view.last_value)).size(12.0));
                    if let Some(change) = view.change_pct {
                        let color = if change >= 0.0 {
                            Color32::from_rgb(40, 167, 69)
                        } else {
                            Color32::from_rgb(220, 53, 69)
                        };
                        ui.label(
                            RichText::new(format!("{change:+.2}%"))
                                .size(12.0)
                                .color(color),
                        );
                    }
                });

                ui.add_space(5.0);

                let stats = &view.stats;
                egui::Grid::new("summary_stats")
                    .striped(true)
                    .min_col_width(55.0)
                    .spacing([8.0, 4.0])
                    .show(ui, |ui| {
                        for header in ["Count", "Mean", "Std", "Min", "25%", "50%", "75%", "Max"] {
                            ui.label(RichText::new(header).strong().size(11.0));
                        }
                        ui.end_row();

                        ui.label(RichText::new(stats.count.to_string()).size(11.0));
                        for value in [
                            stats.mean, stats.std, stats.min, stats.q25, stats.median, stats.q75,
                            stats.max,
                        ] {
                            ui.label(RichText::new(format!("{value:.4}")).size(11.0));
                        }
                        ui.end_row();
                    });
            });
    }

    fn draw_histogram(ui: &mut egui::Ui, bins: &[HistogramBin]) {
        let bars: Vec<Bar> = bins
            .iter()
            .map(|b| {
                let width = (b.upper - b.lower).max(f64::EPSILON);
                Bar::new(b.center(), b.count as f64).width(width * 0.95)
            })
            .collect();

        Plot::new("histogram")
            .height(220.0)
            .allow_scroll(false)
            .x_axis_label("Value")
            .y_axis_label("Count")
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(
                    BarChart::new(bars)
                        .color(HIST_COLOR.gamma_multiply(0.8))
                        .name("Values"),
                );
            });
    }

    /// One box per calendar month at x = month index, with the month label
    /// as the axis tick.
    fn draw_monthly_boxplot(ui: &mut egui::Ui, months: &[MonthGroup]) {
        let x_labels: Vec<String> = months.iter().map(|m| m.label()).collect();

        Plot::new("monthly_boxplot")
            .height(260.0)
            .allow_scroll(false)
            .x_axis_label("Month")
            .y_axis_label("Value")
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round() as usize;
                if (mark.value - idx as f64).abs() < 1e-6 && idx < x_labels.len() {
                    x_labels[idx].clone()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                for (i, month) in months.iter().enumerate() {
                    let mut sorted = month.values.clone();
                    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

                    let q1 = Aggregator::percentile(&sorted, 25.0);
                    let median = Aggregator::percentile(&sorted, 50.0);
                    let q3 = Aggregator::percentile(&sorted, 75.0);
                    let iqr = q3 - q1;
                    let whisker_low = sorted
                        .iter()
                        .copied()
                        .find(|&v| v >= q1 - 1.5 * iqr)
                        .unwrap_or(q1);
                    let whisker_high = sorted
                        .iter()
                        .rev()
                        .copied()
                        .find(|&v| v <= q3 + 1.5 * iqr)
                        .unwrap_or(q3);

                    let box_elem = BoxElem::new(
                        i as f64,
                        BoxSpread::new(whisker_low, q1, median, q3, whisker_high),
                    )
                    .box_width(0.5)
                    .fill(BOX_COLOR.gamma_multiply(0.3))
                    .stroke(egui::Stroke::new(1.5, BOX_COLOR));

                    plot_ui.box_plot(BoxPlot::new(vec![box_elem]).name(month.label()));
                }
            });
    }

    fn draw_table(ui: &mut egui::Ui, filtered: &Series) {
        let points = filtered.points();
        ScrollArea::vertical()
            .id_salt("data_table")
            .max_height(300.0)
            .show_rows(ui, TABLE_ROW_HEIGHT, points.len(), |ui, row_range| {
                for i in row_range {
                    let p = points[i];
                    ui.horizontal(|ui| {
                        ui.add_sized(
                            [90.0, TABLE_ROW_HEIGHT],
                            egui::Label::new(
                                RichText::new(p.date.format("%Y-%m-%d").to_string()).size(11.0),
                            ),
                        );
                        ui.label(RichText::new(format!("{:.6}", p.value)).size(11.0));
                    });
                }
            });
    }

    /// X coordinate for a date: days since the Unix epoch.
    fn day_x(date: NaiveDate) -> f64 {
        (date - NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch")).num_days() as f64
    }

    fn format_day_x(x: f64) -> String {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch");
        (epoch + Duration::days(x.round() as i64))
            .format("%Y-%m-%d")
            .to_string()
    }

    /// Bar width from the median gap between consecutive points.
    fn bar_width(points: &[TimeSeriesPoint]) -> f64 {
        let mut gaps: Vec<f64> = points
            .windows(2)
            .map(|w| Self::day_x(w[1].date) - Self::day_x(w[0].date))
            .collect();
        if gaps.is_empty() {
            return 0.8;
        }
        gaps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        gaps[gaps.len() / 2] * 0.8
    }
}
