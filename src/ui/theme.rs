// FleetSleuth - ui/theme.rs
//
// Colour scheme, status colour mapping, chart palette, and layout constants.
// No dependencies on app state or business logic.

use crate::core::model::{Connectivity, Operability, UpdateStatus, UsageTier};
use egui::Color32;

/// Colour for a connectivity status.
pub fn connectivity_colour(status: &Connectivity) -> Color32 {
    match status {
        Connectivity::Connected => Color32::from_rgb(0, 204, 150), // Green
        Connectivity::Disconnected => Color32::from_rgb(239, 85, 59), // Red
    }
}

/// Colour for an operability status.
pub fn operability_colour(status: &Operability) -> Color32 {
    match status {
        Operability::Enabled => Color32::from_rgb(99, 110, 250), // Indigo
        Operability::Disabled => Color32::from_rgb(171, 99, 250), // Purple
    }
}

/// Colour for a firmware update status.
pub fn update_colour(status: &UpdateStatus) -> Color32 {
    match status {
        UpdateStatus::Updated => Color32::from_rgb(0, 43, 92), // Corporate blue
        UpdateStatus::Outdated => Color32::from_rgb(203, 213, 225), // Slate 300
    }
}

/// Colour for an M2M usage tier (light to dark blues, ascending usage).
pub fn tier_colour(tier: &UsageTier) -> Color32 {
    match tier {
        UsageTier::Inactive => Color32::from_rgb(203, 213, 225), // Slate 300
        UsageTier::Low => Color32::from_rgb(147, 197, 253),      // Blue 300
        UsageTier::Medium => Color32::from_rgb(96, 165, 250),    // Blue 400
        UsageTier::High => Color32::from_rgb(37, 99, 235),       // Blue 600
        UsageTier::Extreme => Color32::from_rgb(30, 58, 138),    // Blue 900
    }
}

/// Qualitative palette for per-category chart colours (models,
/// organisations, rate plans). Assignment is by sorted position so the
/// same category keeps its colour across repaints of the same data.
pub const CHART_PALETTE: &[Color32] = &[
    Color32::from_rgb(44, 160, 44),
    Color32::from_rgb(31, 119, 180),
    Color32::from_rgb(255, 127, 14),
    Color32::from_rgb(214, 39, 40),
    Color32::from_rgb(148, 103, 189),
    Color32::from_rgb(140, 86, 75),
    Color32::from_rgb(227, 119, 194),
    Color32::from_rgb(188, 189, 34),
    Color32::from_rgb(23, 190, 207),
    Color32::from_rgb(174, 199, 232),
    Color32::from_rgb(255, 187, 120),
    Color32::from_rgb(152, 223, 138),
    Color32::from_rgb(255, 152, 150),
    Color32::from_rgb(197, 176, 213),
    Color32::from_rgb(196, 156, 148),
    Color32::from_rgb(247, 182, 210),
    Color32::from_rgb(219, 219, 141),
    Color32::from_rgb(158, 218, 229),
];

/// Palette colour for a category index (wraps around).
pub fn palette_colour(index: usize) -> Color32 {
    CHART_PALETTE[index % CHART_PALETTE.len()]
}

/// High-contrast foreground for table rows.
pub fn row_text_colour(dark_mode: bool) -> Color32 {
    if dark_mode {
        Color32::from_rgb(235, 235, 235)
    } else {
        Color32::from_rgb(25, 25, 25)
    }
}

/// Layout constants.
pub const FILTER_PANEL_WIDTH: f32 = 250.0;
pub const DETAIL_PANE_HEIGHT: f32 = 180.0;
pub const ROW_HEIGHT: f32 = 20.0;
pub const CHART_HEIGHT: f32 = 220.0;
pub const BAR_THICKNESS: f32 = 16.0;
pub const LEGEND_MAX_HEIGHT: f32 = 260.0;
