// FleetSleuth - ui/panels/firmware.rs
//
// Firmware/software view: fleet update KPIs, quiiotd version
// distribution, and update-status breakdown over the /boards/info records.

use crate::app::state::AppState;
use crate::core::model::{DeviceRecord, Family, UpdateStatus};
use crate::ui::{charts, table, theme};

/// Render the firmware view.
pub fn render(ui: &mut egui::Ui, state: &mut AppState) {
    let dark_mode = state.dark_mode;
    let columns = state
        .schema(Family::Firmware)
        .map(|s| s.table_columns.clone())
        .unwrap_or_default();
    let fetch_in_progress = state.fetch_in_progress;
    let family_table = &mut state.firmware;

    ui.heading("\u{1f4bd} Información de Software");
    ui.add_space(4.0);

    if family_table.records.is_empty() {
        ui.centered_and_justified(|ui| {
            if fetch_in_progress {
                ui.spinner();
            } else {
                ui.label("No hay datos disponibles.");
            }
        });
        return;
    }

    let filtered: Vec<&DeviceRecord> = family_table
        .filtered_indices
        .iter()
        .filter_map(|&i| family_table.records.get(i))
        .collect();

    // --- KPI row ---
    let updated = filtered
        .iter()
        .filter_map(|r| r.firmware.as_ref())
        .filter(|fw| fw.update_status == UpdateStatus::Updated)
        .count();
    let pct_updated = if filtered.is_empty() {
        0.0
    } else {
        updated as f64 / filtered.len() as f64 * 100.0
    };

    ui.columns(3, |cols| {
        kpi(&mut cols[0], "Total Dispositivos", filtered.len().to_string());
        kpi(&mut cols[1], "Dispositivos Actualizados", updated.to_string());
        kpi(&mut cols[2], "% Flota Actualizada", format!("{pct_updated:.1}%"));
    });

    ui.separator();

    // --- Version distribution + update status ---
    ui.label(egui::RichText::new("\u{1f4bf} Análisis de Versiones Quiiotd").strong());
    ui.add_space(2.0);

    ui.columns(2, |cols| {
        cols[0].label("Distribución de Versiones");
        let version_counts = charts::value_counts(
            filtered
                .iter()
                .filter_map(|r| r.firmware.as_ref())
                .map(|fw| fw.version.as_deref().unwrap_or("Desconocida")),
        );
        let version_colours = charts::colour_map(&version_counts);
        charts::bar_chart(&mut cols[0], "fw_versions", &version_counts, &version_colours);

        cols[1].label("Estado de Actualización");
        cols[1].label(
            egui::RichText::new(format!(
                "Considerado actualizado si fecha \u{2265} {}",
                crate::util::constants::FIRMWARE_UPDATE_CUTOFF
            ))
            .weak()
            .small(),
        );
        charts::proportion_bar(
            &mut cols[1],
            &[
                (
                    UpdateStatus::Updated.label(),
                    updated,
                    theme::update_colour(&UpdateStatus::Updated),
                ),
                (
                    UpdateStatus::Outdated.label(),
                    filtered.len() - updated,
                    theme::update_colour(&UpdateStatus::Outdated),
                ),
            ],
        );
    });

    ui.separator();

    // --- Table (includes extracted version/date/status columns) ---
    let mut selected = family_table.selected_index;
    egui::CollapsingHeader::new(format!(
        "\u{1f4c2} Ver datos detallados ({} registros)",
        filtered.len()
    ))
    .id_salt("fw_table")
    .default_open(false)
    .show(ui, |ui| {
        table::render_records(ui, "fw_table_rows", &filtered, &columns, &mut selected, dark_mode);
    });
    family_table.selected_index = selected;
}

fn kpi(ui: &mut egui::Ui, caption: &str, figure: String) {
    ui.vertical(|ui| {
        ui.label(egui::RichText::new(figure).size(22.0).strong());
        ui.label(egui::RichText::new(caption).weak().size(12.0));
    });
}
