// FleetSleuth - ui/panels/detail.rs
//
// Record detail pane showing the derived fields and every preserved
// source column of the selected record in the active view.

use crate::app::state::{AppState, DeviceSubTab, Tab};
use crate::core::model::Family;
use crate::ui::theme;

/// Render the detail pane (bottom panel).
pub fn render(ui: &mut egui::Ui, state: &AppState) {
    let family = match (state.active_tab, state.device_subtab) {
        (Tab::Devices, DeviceSubTab::Boards) => Family::Boards,
        (Tab::Devices, DeviceSubTab::Kiwi) => Family::Kiwi,
        (Tab::M2m, _) => Family::M2m,
        (Tab::Firmware, _) => Family::Firmware,
    };

    let Some(record) = state.table(family).selected_record() else {
        ui.centered_and_justified(|ui| {
            ui.label(
                egui::RichText::new("Selecciona un registro en la tabla para ver el detalle.")
                    .weak(),
            );
        });
        return;
    };

    egui::ScrollArea::vertical()
        .id_salt("detail_scroll")
        .auto_shrink([false; 2])
        .show(ui, |ui| {
            egui::Grid::new("detail_grid")
                .num_columns(2)
                .spacing([8.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Familia:");
                    ui.label(record.family.label());
                    ui.end_row();

                    ui.label("Organización:");
                    ui.label(&record.organization);
                    ui.end_row();

                    ui.label("Modelo:");
                    ui.label(&record.model);
                    ui.end_row();

                    ui.label("Estado:");
                    ui.colored_label(
                        theme::connectivity_colour(&record.connectivity),
                        record.connectivity.label(),
                    );
                    ui.end_row();

                    ui.label("Operatividad:");
                    ui.colored_label(
                        theme::operability_colour(&record.operability),
                        record.operability.label(),
                    );
                    ui.end_row();

                    if let Some(ref m2m) = record.m2m {
                        ui.label("SIM:");
                        ui.label(&m2m.sim_id);
                        ui.end_row();

                        ui.label("Plan:");
                        ui.label(&m2m.rate_plan);
                        ui.end_row();

                        ui.label("Consumo diario:");
                        ui.label(
                            m2m.cons_daily_mb
                                .map(|v| format!("{v:.2} MB ({})", m2m.usage_tier_daily))
                                .unwrap_or_else(|| "--".to_string()),
                        );
                        ui.end_row();
                    }

                    if let Some(ref fw) = record.firmware {
                        ui.label("Versión quiiotd:");
                        ui.label(fw.version.as_deref().unwrap_or("--"));
                        ui.end_row();

                        ui.label("Compilación:");
                        ui.label(
                            fw.compilation_date
                                .map(|d| d.to_string())
                                .unwrap_or_else(|| "--".to_string()),
                        );
                        ui.end_row();

                        ui.label("Actualización:");
                        ui.colored_label(
                            theme::update_colour(&fw.update_status),
                            fw.update_status.label(),
                        );
                        ui.end_row();
                    }
                });

            ui.separator();
            ui.label(egui::RichText::new("Columnas de origen").weak().small());

            egui::Grid::new("detail_raw_grid")
                .num_columns(2)
                .spacing([8.0, 2.0])
                .striped(true)
                .show(ui, |ui| {
                    for (key, value) in &record.raw {
                        ui.label(egui::RichText::new(key).monospace().size(11.5).weak());
                        let rendered = match value {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        ui.label(egui::RichText::new(rendered).monospace().size(11.5));
                        ui.end_row();
                    }
                });
        });
}
