// FleetSleuth - ui/panels/summary.rs
//
// Fetch summary modal window.
// Shows overall cycle statistics and a per-resource breakdown table.
// Warnings from the cycle are also listed.

use crate::app::state::AppState;

/// Render the fetch summary dialog (if state.show_summary is true).
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    if !state.show_summary {
        return;
    }

    let mut open = true;
    egui::Window::new("Resumen de Descarga")
        .open(&mut open)
        .collapsible(false)
        .resizable(true)
        .min_width(440.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            if let Some(ref summary) = state.fetch_summary {
                // -----------------------------------------------------------------
                // Overall statistics
                // -----------------------------------------------------------------
                ui.strong("Resumen");
                egui::Grid::new("summary_overview")
                    .num_columns(2)
                    .spacing([16.0, 4.0])
                    .show(ui, |ui| {
                        ui.label("Recursos consultados:");
                        ui.label(summary.resources_attempted.to_string());
                        ui.end_row();

                        ui.label("Recursos cargados:");
                        ui.label(summary.resources_loaded.to_string());
                        ui.end_row();

                        ui.label("Recursos fallidos:");
                        let err_colour = if summary.resources_failed > 0 {
                            egui::Color32::from_rgb(248, 113, 113)
                        } else {
                            ui.style().visuals.text_color()
                        };
                        ui.colored_label(err_colour, summary.resources_failed.to_string());
                        ui.end_row();

                        ui.label("Registros totales:");
                        ui.label(summary.total_records.to_string());
                        ui.end_row();

                        ui.label("Elementos descartados:");
                        let sk_colour = if summary.skipped_records > 0 {
                            egui::Color32::from_rgb(253, 186, 116)
                        } else {
                            ui.style().visuals.text_color()
                        };
                        ui.colored_label(sk_colour, summary.skipped_records.to_string());
                        ui.end_row();

                        ui.label("Duración:");
                        ui.label(format!("{:.2}s", summary.duration.as_secs_f64()));
                        ui.end_row();
                    });

                // -----------------------------------------------------------------
                // Per-resource breakdown table
                // -----------------------------------------------------------------
                if !summary.resource_summaries.is_empty() {
                    ui.add_space(8.0);
                    ui.separator();
                    ui.strong("Por recurso");

                    egui::Grid::new("summary_resource_table")
                        .num_columns(4)
                        .striped(true)
                        .spacing([12.0, 3.0])
                        .show(ui, |ui| {
                            // Header row
                            ui.strong("Recurso");
                            ui.strong("Registros");
                            ui.strong("Descartados");
                            ui.strong("Error");
                            ui.end_row();

                            for rs in &summary.resource_summaries {
                                ui.label(rs.family.label());
                                ui.label(rs.record_count.to_string());
                                ui.label(rs.skipped.to_string());
                                match &rs.failed {
                                    Some(error) => {
                                        ui.colored_label(
                                            egui::Color32::from_rgb(248, 113, 113),
                                            egui::RichText::new(error).size(11.5),
                                        );
                                    }
                                    None => {
                                        ui.label("--");
                                    }
                                }
                                ui.end_row();
                            }
                        });
                }

                // -----------------------------------------------------------------
                // Warnings
                // -----------------------------------------------------------------
                if !state.warnings.is_empty() {
                    ui.add_space(8.0);
                    ui.separator();
                    ui.strong(format!("Avisos ({})", state.warnings.len()));

                    egui::ScrollArea::vertical()
                        .id_salt("summary_warnings")
                        .max_height(120.0)
                        .show(ui, |ui| {
                            for warn in &state.warnings {
                                ui.label(
                                    egui::RichText::new(warn)
                                        .color(egui::Color32::from_rgb(253, 186, 116))
                                        .size(11.5),
                                );
                            }
                        });
                }
            } else {
                ui.label("Todavía no se ha completado ninguna descarga.");
            }

            ui.add_space(8.0);
            ui.separator();
            if ui.button("Cerrar").clicked() {
                state.show_summary = false;
            }
        });

    if !open {
        state.show_summary = false;
    }
}
