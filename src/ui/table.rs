// FleetSleuth - ui/table.rs
//
// Virtual-scrolling record table.
//
// Uses egui's `ScrollArea::show_rows` which renders only the rows currently
// visible in the viewport, giving O(1) rendering cost regardless of record
// count. Selection is always valid; row clicks update the passed slot
// directly.

use crate::core::model::DeviceRecord;
use crate::ui::theme;
use egui::text::{LayoutJob, TextFormat};

/// Render a record table over the given filtered view.
///
/// `columns` lists the raw source columns shown after the derived fields
/// (the family schema's `[table] columns`). `selected` is the index into
/// `records` of the highlighted row, updated on click.
pub fn render_records(
    ui: &mut egui::Ui,
    id_salt: &str,
    records: &[&DeviceRecord],
    columns: &[String],
    selected: &mut Option<usize>,
    dark_mode: bool,
) {
    if records.is_empty() {
        ui.centered_and_justified(|ui| {
            ui.label("No hay registros que coincidan con los filtros seleccionados.");
        });
        return;
    }

    // Family-specific derived columns are shown automatically when the
    // records carry them.
    let has_m2m = records.first().is_some_and(|r| r.m2m.is_some());
    let has_firmware = records.first().is_some_and(|r| r.firmware.is_some());

    // Header row.
    ui.horizontal(|ui| {
        header_cell(ui, "Organización", 140.0);
        header_cell(ui, "Modelo", 140.0);
        header_cell(ui, "Estado", 100.0);
        header_cell(ui, "Operatividad", 100.0);
        if has_m2m {
            header_cell(ui, "Plan", 120.0);
            header_cell(ui, "Red", 80.0);
            header_cell(ui, "MB/día", 80.0);
        }
        if has_firmware {
            header_cell(ui, "Versión", 90.0);
            header_cell(ui, "Compilación", 100.0);
            header_cell(ui, "Actualización", 110.0);
        }
        for column in columns {
            header_cell(ui, column, 120.0);
        }
    });
    ui.separator();

    let row_height = theme::ROW_HEIGHT;
    let body_colour = theme::row_text_colour(dark_mode);

    egui::ScrollArea::vertical()
        .id_salt(id_salt)
        .auto_shrink([false; 2])
        .show_rows(ui, row_height, records.len(), |ui, row_range| {
            for row_idx in row_range {
                let Some(record) = records.get(row_idx) else {
                    continue;
                };
                let is_selected = *selected == Some(row_idx);

                let mut job = LayoutJob::default();
                let font = egui::FontId::monospace(12.0);

                // Status cells keep their status hue; identity cells use the
                // high-contrast body colour.
                job.append(
                    &format!(
                        "{:<20} {:<20} ",
                        clip(&record.organization, 19),
                        clip(&record.model, 19)
                    ),
                    0.0,
                    TextFormat {
                        font_id: font.clone(),
                        color: body_colour,
                        ..Default::default()
                    },
                );
                job.append(
                    &format!("{:<14} ", record.connectivity.label()),
                    0.0,
                    TextFormat {
                        font_id: font.clone(),
                        color: theme::connectivity_colour(&record.connectivity),
                        ..Default::default()
                    },
                );
                job.append(
                    &format!("{:<14} ", record.operability.label()),
                    0.0,
                    TextFormat {
                        font_id: font.clone(),
                        color: theme::operability_colour(&record.operability),
                        ..Default::default()
                    },
                );

                if let Some(ref m2m) = record.m2m {
                    job.append(
                        &format!(
                            "{:<18} {:<10} {:<10} ",
                            clip(&m2m.rate_plan, 17),
                            clip(&m2m.network_type, 9),
                            m2m.cons_daily_mb
                                .map(|v| format!("{v:.2}"))
                                .unwrap_or_else(|| "-".to_string()),
                        ),
                        0.0,
                        TextFormat {
                            font_id: font.clone(),
                            color: body_colour,
                            ..Default::default()
                        },
                    );
                }

                if let Some(ref fw) = record.firmware {
                    job.append(
                        &format!(
                            "{:<12} {:<12} ",
                            clip(fw.version.as_deref().unwrap_or("-"), 11),
                            fw.compilation_date
                                .map(|d| d.to_string())
                                .unwrap_or_else(|| "-".to_string()),
                        ),
                        0.0,
                        TextFormat {
                            font_id: font.clone(),
                            color: body_colour,
                            ..Default::default()
                        },
                    );
                    job.append(
                        &format!("{:<14} ", fw.update_status.label()),
                        0.0,
                        TextFormat {
                            font_id: font.clone(),
                            color: theme::update_colour(&fw.update_status),
                            ..Default::default()
                        },
                    );
                }

                let extras: Vec<String> = columns
                    .iter()
                    .map(|c| clip(&record.raw_field(c).unwrap_or_default(), 17))
                    .collect();
                if !extras.is_empty() {
                    job.append(
                        &extras
                            .iter()
                            .map(|v| format!("{v:<18}"))
                            .collect::<String>(),
                        0.0,
                        TextFormat {
                            font_id: font,
                            color: body_colour,
                            ..Default::default()
                        },
                    );
                }

                let response = ui.selectable_label(is_selected, job);
                if response.clicked() {
                    *selected = if is_selected { None } else { Some(row_idx) };
                }
            }
        });
}

fn header_cell(ui: &mut egui::Ui, text: &str, width: f32) {
    ui.add_sized(
        [width, 18.0],
        egui::Label::new(egui::RichText::new(text).strong().size(12.0)),
    );
}

/// Clip a cell value to a fixed width with an ellipsis.
fn clip(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let clipped: String = value.chars().take(max.saturating_sub(1)).collect();
        format!("{clipped}\u{2026}")
    }
}
