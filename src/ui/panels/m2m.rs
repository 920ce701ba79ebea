// FleetSleuth - ui/panels/m2m.rs
//
// M2M SIM communications view: KPI row, status/network breakdowns,
// rate-plan and country legends, and daily/monthly consumption analysis
// with per-tier SIM previews.

use crate::app::state::AppState;
use crate::core::model::{Connectivity, DeviceRecord, UsageTier};
use crate::ui::{charts, table, theme};
use crate::util::constants;

/// Render the M2M communications view.
pub fn render(ui: &mut egui::Ui, state: &mut AppState) {
    let dark_mode = state.dark_mode;
    let columns = state
        .schema(crate::core::model::Family::M2m)
        .map(|s| s.table_columns.clone())
        .unwrap_or_default();
    let fetch_in_progress = state.fetch_in_progress;
    let family_table = &mut state.m2m;

    ui.heading("\u{1f4e1} Gestión de Comunicaciones (M2M)");
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

    // --- Organisation filter ---
    let organizations: Vec<String> = family_table
        .records
        .iter()
        .map(|r| r.organization.clone())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut filters_changed = false;
    ui.horizontal(|ui| {
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
    });
    if filters_changed {
        family_table.apply_filters();
    }

    let filtered: Vec<&DeviceRecord> = family_table
        .filtered_indices
        .iter()
        .filter_map(|&i| family_table.records.get(i))
        .collect();

    if filtered.is_empty() {
        ui.separator();
        ui.centered_and_justified(|ui| {
            ui.label("No hay registros que coincidan con los filtros seleccionados.");
        });
        return;
    }

    ui.separator();

    // --- KPI row ---
    let total_alarms: u64 = filtered
        .iter()
        .filter_map(|r| r.m2m.as_ref())
        .map(|m| m.alarm_count)
        .sum();
    let sims_with_alarms = filtered
        .iter()
        .filter_map(|r| r.m2m.as_ref())
        .filter(|m| m.alarm_count > 0)
        .count();

    ui.columns(3, |cols| {
        kpi(&mut cols[0], "Total SIMs", filtered.len().to_string());
        kpi(&mut cols[1], "Alarmas Totales", total_alarms.to_string());
        kpi(&mut cols[2], "SIMs con Alertas", sims_with_alarms.to_string());
    });

    ui.separator();

    // --- Status and network breakdowns ---
    ui.columns(2, |cols| {
        cols[0].label(egui::RichText::new("\u{1f7e2} Estado").strong());
        let connected = filtered
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
                    filtered.len() - connected,
                    theme::connectivity_colour(&Connectivity::Disconnected),
                ),
            ],
        );

        cols[1].label(egui::RichText::new("\u{1f4e1} Red").strong());
        let network_counts = charts::value_counts(
            filtered
                .iter()
                .filter_map(|r| r.m2m.as_ref())
                .map(|m| m.network_type.as_str()),
        );
        let network_colours = charts::colour_map(&network_counts);
        charts::legend(&mut cols[1], "m2m_network", &network_counts, &network_colours);
    });

    ui.separator();

    // --- Country distribution (only when the column exists upstream) ---
    let country_counts = charts::value_counts(
        filtered
            .iter()
            .filter_map(|r| r.raw_field("country_code")),
    );
    if !country_counts.is_empty() {
        ui.label(egui::RichText::new("\u{1f30d} Distribución Geográfica").strong());
        let country_colours = charts::colour_map(&country_counts);
        charts::legend(ui, "m2m_country", &country_counts, &country_colours);
        ui.separator();
    }

    // --- Rate plans ---
    ui.label(egui::RichText::new("\u{1f4b3} Planes de Servicio").strong());
    let plan_counts = charts::value_counts(
        filtered
            .iter()
            .filter_map(|r| r.m2m.as_ref())
            .map(|m| m.rate_plan.as_str()),
    );
    let plan_colours = charts::colour_map(&plan_counts);
    charts::legend(ui, "m2m_plans", &plan_counts, &plan_colours);

    ui.separator();

    // --- Consumption analysis ---
    ui.label(egui::RichText::new("\u{1f4ca} Análisis de Consumo de Datos").strong());

    egui::CollapsingHeader::new("\u{1f4c5} Consumo Diario")
        .id_salt("m2m_daily")
        .default_open(true)
        .show(ui, |ui| {
            consumption_section(ui, &filtered, true);
        });

    egui::CollapsingHeader::new("\u{1f5d3} Consumo Mensual")
        .id_salt("m2m_monthly")
        .default_open(false)
        .show(ui, |ui| {
            consumption_section(ui, &filtered, false);
        });

    ui.separator();

    // --- Raw table ---
    let mut selected = family_table.selected_index;
    egui::CollapsingHeader::new(format!("\u{1f4c2} Ver datos crudos ({} SIMs)", filtered.len()))
        .id_salt("m2m_table")
        .default_open(false)
        .show(ui, |ui| {
            table::render_records(ui, "m2m_table_rows", &filtered, &columns, &mut selected, dark_mode);
        });
    family_table.selected_index = selected;
}

/// One KPI cell: big figure over a muted caption.
fn kpi(ui: &mut egui::Ui, caption: &str, figure: String) {
    ui.vertical(|ui| {
        ui.label(egui::RichText::new(figure).size(22.0).strong());
        ui.label(egui::RichText::new(caption).weak().size(12.0));
    });
}

/// Consumption KPIs + usage-tier breakdown for the daily or monthly axis.
fn consumption_section(ui: &mut egui::Ui, records: &[&DeviceRecord], daily: bool) {
    let figures: Vec<f64> = records
        .iter()
        .filter_map(|r| r.m2m.as_ref())
        .filter_map(|m| if daily { m.cons_daily_mb } else { m.cons_month_mb })
        .collect();

    if figures.is_empty() {
        ui.weak("Faltan datos de consumo.");
        return;
    }

    let total: f64 = figures.iter().sum();
    let avg = total / figures.len() as f64;
    let max = figures.iter().copied().fold(f64::MIN, f64::max);

    ui.columns(3, |cols| {
        kpi(&mut cols[0], "Promedio", format!("{avg:.2} MB"));
        kpi(&mut cols[1], "Máximo", format!("{max:.2} MB"));
        kpi(&mut cols[2], "Tráfico Total", format!("{:.2} GB", total / 1024.0));
    });

    ui.add_space(4.0);

    // Tier breakdown with a SIM-id preview per tier.
    let mut tier_sims: Vec<(UsageTier, Vec<&str>)> = UsageTier::all()
        .iter()
        .map(|&tier| (tier, Vec::new()))
        .collect();
    for record in records {
        let Some(m2m) = record.m2m.as_ref() else {
            continue;
        };
        let tier = if daily {
            m2m.usage_tier_daily
        } else {
            m2m.usage_tier_month
        };
        if let Some(slot) = tier_sims.iter_mut().find(|(t, _)| *t == tier) {
            slot.1.push(m2m.sim_id.as_str());
        }
    }

    let max_count = tier_sims.iter().map(|(_, s)| s.len()).max().unwrap_or(1).max(1);

    for (tier, sims) in &tier_sims {
        if sims.is_empty() {
            continue;
        }
        ui.horizontal(|ui| {
            ui.add_sized(
                [150.0, theme::BAR_THICKNESS],
                egui::Label::new(egui::RichText::new(tier.label()).size(12.0)),
            );
            let available = ui.available_width() - 48.0;
            let width = (available * sims.len() as f32 / max_count as f32).max(2.0);
            let (rect, response) = ui.allocate_exact_size(
                egui::vec2(width, theme::BAR_THICKNESS),
                egui::Sense::hover(),
            );
            ui.painter().rect_filled(rect, 2.0, theme::tier_colour(tier));

            // Tooltip previews the first few SIM ids in the tier.
            let preview: Vec<&str> = sims
                .iter()
                .copied()
                .take(constants::MAX_TIER_PREVIEW_IDS)
                .collect();
            let mut tooltip = preview.join("\n");
            if sims.len() > preview.len() {
                tooltip.push_str(&format!("\n... y {} más", sims.len() - preview.len()));
            }
            response.on_hover_text(tooltip);

            ui.label(egui::RichText::new(sims.len().to_string()).size(12.0).weak());
        });
    }
}
