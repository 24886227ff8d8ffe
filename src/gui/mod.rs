//! GUI module - User interface components

mod app;
mod chart_viewer;
mod control_panel;

pub use app::RateExplorerApp;
pub use chart_viewer::{ChartViewer, ViewData};
pub use control_panel::{ChartKind, ControlPanel, ControlPanelAction, UserSettings};
