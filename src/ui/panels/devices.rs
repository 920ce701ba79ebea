// FleetSleuth - ui/panels/devices.rs
//
// Device inventory view, shared by the Boards and Kiwi sub-tabs.
//
// Layout mirrors the operators' workflow:
//   A. filters (organisation + model; Kiwi has no organisations)
//   B. per-model distribution chart with click drill-down, next to a
//      context list (organisations of the drilled model, or all models)
//   C. connectivity / operability breakdowns of the current context
//   D. detailed record table
//
// The whole panel is a stateless render of the family table; every
// interaction mutates the filter state and the next frame re-renders.

use crate::app::state::AppState;
use crate::core::model::{Connectivity, Family, Operability};
use crate::ui::{charts, table, theme};
use std::collections::BTreeSet;

/// Render the devices view for one family (Boards or Kiwi).
pub fn render(ui: &mut egui::Ui, state: &mut AppState, family: Family) {
    let dark_mode = state.dark_mode;
    let columns = state
        .schema(family)
        .map(|s| s.table_columns.clone())
        .unwrap_or_default();
    let is_kiwi = family == Family::Kiwi;
    let fetch_in_progress = state.fetch_in_progress;
    let family_table = state.table_mut(family);

    if family_table.records.is_empty() {
        ui.centered_and_justified(|ui| {
            if fetch_in_progress {
                ui.spinner();
            } else {
                ui.label("No hay datos de dispositivos para mostrar.");
            }
        });
        return;
    }

    ui.heading("\u{1f3ed} Inventario de Dispositivos");
    ui.add_space(4.0);

    // =====================================================================
    // A. Filters
    // =====================================================================
    // Owned option lists so the filter closures below can mutate the
    // table's filter state without fighting outstanding borrows.
    let organizations: Vec<String> = family_table
        .records
        .iter()
        .map(|r| r.organization.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let models: Vec<String> = family_table
        .records
        .iter()
        .map(|r| r.model.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut filters_changed = false;

    ui.horizontal(|ui| {
        // Kiwi devices have no organisations (every record carries the
        // sentinel), so the organisation filter is hidden for that family.
        if !is_kiwi {
            let selected = family_table
                .filter_state
                .organization
                .clone()
                .unwrap_or_else(|| "Todas".to_string());
            egui::ComboBox::from_label("\u{1f3e2} Organización")
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    if ui
                        .selectable_label(family_table.filter_state.organization.is_none(), "Todas")
                        .clicked()
                    {
                        family_table.filter_state.organization = None;
                        filters_changed = true;
                    }
                    for org in &organizations {
                        let active =
                            family_table.filter_state.organization.as_deref() == Some(org.as_str());
                        if ui.selectable_label(active, org).clicked() {
                            family_table.filter_state.organization = Some(org.clone());
                            filters_changed = true;
                        }
                    }
                });
        }

        let selected_model = family_table
            .filter_state
            .model
            .clone()
            .unwrap_or_else(|| "Todos".to_string());
        egui::ComboBox::from_label("\u{1f4e6} Modelo")
            .selected_text(selected_model)
            .show_ui(ui, |ui| {
                if ui
                    .selectable_label(family_table.filter_state.model.is_none(), "Todos")
                    .clicked()
                {
                    family_table.filter_state.model = None;
                    filters_changed = true;
                }
                for model in &models {
                    let active = family_table.filter_state.model.as_deref() == Some(model.as_str());
                    if ui.selectable_label(active, model).clicked() {
                        family_table.filter_state.model = Some(model.clone());
                        filters_changed = true;
                    }
                }
            });

        ui.label("Buscar:");
        if ui
            .text_edit_singleline(&mut family_table.filter_state.text_search)
            .changed()
        {
            filters_changed = true;
        }

        if ui.button("Limpiar").clicked() {
            family_table.filter_state = Default::default();
            family_table.drilldown_model = None;
            filters_changed = true;
        }
    });

    if filters_changed {
        family_table.apply_filters();
    }

    if family_table.filtered_indices.is_empty() {
        ui.separator();
        ui.centered_and_justified(|ui| {
            ui.label("No hay registros que coincidan con los filtros seleccionados.");
        });
        return;
    }

    ui.separator();

    // =====================================================================
    // B. Model distribution chart + context list
    // =====================================================================
    let filtered: Vec<&crate::core::model::DeviceRecord> = family_table
        .filtered_indices
        .iter()
        .filter_map(|&i| family_table.records.get(i))
        .collect();

    let model_counts = charts::value_counts(filtered.iter().map(|r| r.model.as_str()));
    let model_colours = charts::colour_map(&model_counts);

    let mut clicked_model: Option<String> = None;

    ui.columns(2, |cols| {
        cols[0].label(egui::RichText::new("Distribución por Modelo").strong());
        clicked_model = charts::bar_chart(
            &mut cols[0],
            "devices_model_chart",
            &model_counts,
            &model_colours,
        );

        // Context list: organisations of the drilled-down model, or the
        // model list when no drill-down is active.
        match family_table.drilldown_model.clone() {
            Some(model) => {
                cols[1].label(
                    egui::RichText::new(format!("\u{1f3e2} En Organizaciones: {model}")).strong(),
                );
                let org_counts = charts::value_counts(
                    filtered
                        .iter()
                        .filter(|r| r.model == model)
                        .map(|r| r.organization.as_str()),
                );
                let org_colours = charts::colour_map(&org_counts);
                charts::legend(&mut cols[1], "devices_org_legend", &org_counts, &org_colours);
                cols[1].label(
                    egui::RichText::new("\u{2139} Pulsa la barra de nuevo para volver.")
                        .weak()
                        .small(),
                );
            }
            None => {
                cols[1].label(egui::RichText::new("Lista de Modelos").strong());
                charts::legend(
                    &mut cols[1],
                    "devices_model_legend",
                    &model_counts,
                    &model_colours,
                );
            }
        }
    });

    // Bar click toggles the drill-down.
    if let Some(model) = clicked_model {
        if family_table.drilldown_model.as_deref() == Some(model.as_str()) {
            family_table.drilldown_model = None;
        } else {
            family_table.drilldown_model = Some(model);
        }
    }

    ui.separator();

    // =====================================================================
    // C. Status breakdowns over the current context
    // =====================================================================
    let context = family_table.context_records();
    let context_title = match &family_table.drilldown_model {
        Some(model) => format!("\u{1f50e} {model}"),
        None => "\u{1fa7a} Estado General".to_string(),
    };
    ui.label(egui::RichText::new(context_title).strong());
    ui.add_space(2.0);

    ui.columns(2, |cols| {
        cols[0].label("Conectividad");
        let connected = context
            .iter()
            .filter(|r| r.connectivity == Connectivity::Connected)
            .count();
        charts::proportion_bar(
            &mut cols[0],
            &[
                (
                    Connectivity::Connected.label(),
                    connected,
                    theme::connectivity_colour(&Connectivity::Connected),
                ),
                (
                    Connectivity::Disconnected.label(),
                    context.len() - connected,
                    theme::connectivity_colour(&Connectivity::Disconnected),
                ),
            ],
        );

        cols[1].label("Operatividad");
        let enabled = context
            .iter()
            .filter(|r| r.operability == Operability::Enabled)
            .count();
        charts::proportion_bar(
            &mut cols[1],
            &[
                (
                    Operability::Enabled.label(),
                    enabled,
                    theme::operability_colour(&Operability::Enabled),
                ),
                (
                    Operability::Disabled.label(),
                    context.len() - enabled,
                    theme::operability_colour(&Operability::Disabled),
                ),
            ],
        );
    });

    ui.separator();

    // =====================================================================
    // D. Record table
    // =====================================================================
    let label = match &family_table.drilldown_model {
        Some(model) => format!(
            "\u{1f4c2} Ver Listado Detallado ({} registros, filtrado por {model})",
            context.len()
        ),
        None => format!("\u{1f4c2} Ver Listado Detallado ({} registros)", context.len()),
    };

    let mut selected = family_table.selected_index;
    egui::CollapsingHeader::new(label)
        .id_salt("devices_table")
        .default_open(false)
        .show(ui, |ui| {
            table::render_records(
                ui,
                "devices_table_rows",
                &context,
                &columns,
                &mut selected,
                dark_mode,
            );
        });
    family_table.selected_index = selected;
}
