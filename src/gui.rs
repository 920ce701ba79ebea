// FleetSleuth - gui.rs
//
// Top-level eframe::App implementation.
// Wires together all UI panels and manages the fetch lifecycle.

use crate::app::fetch::{FetchManager, FetchParams, FetchProgress};
use crate::app::state::{AppState, DeviceSubTab, Tab};
use crate::core::model::Family;
use crate::platform::config;
use crate::ui;
use std::time::Duration;

/// The FleetSleuth application.
pub struct FleetSleuthApp {
    pub state: AppState,
    pub fetch_manager: FetchManager,
}

impl FleetSleuthApp {
    /// Create a new application instance with the given state.
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            fetch_manager: FetchManager::new(),
        }
    }

    /// Kick off a fetch cycle with the current config and session.
    fn start_fetch(&mut self) {
        let state = &mut self.state;
        state.warnings.clear();
        state.fetch_in_progress = true;
        state.status_message = "Descargando datos de la flota\u{2026}".to_string();

        let params = FetchParams {
            base_url: state.config.base_url.clone(),
            tenant_uuid: state.config.tenant_uuid.clone(),
            timeout: Duration::from_secs(state.config.timeout_secs),
            session: state.session.clone(),
            credentials: config::resolve_credentials(&state.config),
            schemas: state.schemas.clone(),
            dump_raw: state.config.dump_raw,
            dump_dir: state.data_dir.join("dumps"),
        };
        self.fetch_manager.start_fetch(params);
    }

    /// The family whose table backs the active view.
    fn active_family(&self) -> Family {
        match (self.state.active_tab, self.state.device_subtab) {
            (Tab::Devices, DeviceSubTab::Boards) => Family::Boards,
            (Tab::Devices, DeviceSubTab::Kiwi) => Family::Kiwi,
            (Tab::M2m, _) => Family::M2m,
            (Tab::Firmware, _) => Family::Firmware,
        }
    }

    /// Export the active view's filtered records via a save dialog.
    fn export_active_view(&mut self, as_json: bool) {
        let family = self.active_family();
        let table = self.state.table(family);
        let filtered: Vec<_> = table
            .filtered_indices
            .iter()
            .filter_map(|&i| table.records.get(i))
            .cloned()
            .collect();

        let (extension, default_name) = if as_json {
            ("json", format!("{}.json", family.schema_id()))
        } else {
            ("csv", format!("{}.csv", family.schema_id()))
        };

        let Some(dest) = rfd::FileDialog::new()
            .add_filter(extension.to_uppercase(), &[extension])
            .set_file_name(default_name)
            .save_file()
        else {
            return;
        };

        let result = std::fs::File::create(&dest)
            .map_err(|e| format!("Cannot create file: {e}"))
            .and_then(|f| {
                if as_json {
                    crate::core::export::export_json(&filtered, f, &dest)
                        .map_err(|e| e.to_string())
                } else {
                    crate::core::export::export_csv(&filtered, f, &dest)
                        .map_err(|e| e.to_string())
                }
            });

        self.state.status_message = match result {
            Ok(n) => format!("Exportados {n} registros a {}.", dest.display()),
            Err(e) => format!("Error de exportación: {e}"),
        };
    }

    /// Apply one progress message from the fetch thread to the app state.
    fn apply_progress(&mut self, msg: FetchProgress) {
        let state = &mut self.state;
        match msg {
            FetchProgress::Started => {
                state.fetch_in_progress = true;
                state.status_message = "Descargando datos de la flota\u{2026}".to_string();
            }
            FetchProgress::SignedIn { session } => {
                state.session = Some(session);
                state.login_error = None;
                state.status_message = "\u{1f7e2} Conectado".to_string();
            }
            FetchProgress::ResourceStarted { family } => {
                state.status_message = format!("Descargando {family}\u{2026}");
            }
            FetchProgress::TableLoaded {
                family,
                records,
                raw_count,
                skipped,
            } => {
                if skipped > 0 {
                    state.push_warning(format!(
                        "{family}: {skipped} de {raw_count} elementos no eran registros y se descartaron"
                    ));
                }
                state.table_mut(family).load(records, skipped);
            }
            FetchProgress::ResourceFailed { family, error } => {
                // Graceful degradation: the table empties, the dashboard renders.
                state.table_mut(family).clear();
                state.push_warning(format!("{family}: {error}"));
            }
            FetchProgress::Warning { message } => {
                state.push_warning(message);
            }
            FetchProgress::Completed { summary } => {
                state.status_message = format!(
                    "Descarga completa: {} registros de {} recursos en {:.2}s",
                    summary.total_records,
                    summary.resources_loaded,
                    summary.duration.as_secs_f64()
                );
                state.fetch_summary = Some(summary);
                state.fetch_in_progress = false;
                state.save_session();
            }
            FetchProgress::Failed { error } => {
                state.fetch_in_progress = false;
                if state.session.is_none() {
                    // Still on the login gate: surface the failure there.
                    state.login_error = Some(error.clone());
                }
                state.status_message = format!("Error de conexión: {error}");
            }
            FetchProgress::Cancelled => {
                state.status_message = "Descarga cancelada.".to_string();
                state.fetch_in_progress = false;
            }
        }
    }
}

impl eframe::App for FleetSleuthApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Poll for fetch progress
        let messages = self.fetch_manager.poll_progress();
        let had_messages = !messages.is_empty();
        for msg in messages {
            self.apply_progress(msg);
        }
        // Repaint while a fetch is active so progress updates appear promptly.
        if had_messages || self.state.fetch_in_progress {
            ctx.request_repaint();
        }

        // ---- Handle flags set by panels ----
        if self.state.pending_refresh {
            self.state.pending_refresh = false;
            self.start_fetch();
        }
        if self.state.request_cancel {
            self.state.request_cancel = false;
            self.fetch_manager.cancel_fetch();
        }
        if self.state.pending_logout {
            self.state.pending_logout = false;
            self.fetch_manager.cancel_fetch();
            self.state.logout();
        }

        // ---- Login gate ----
        if self.state.session.is_none() {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui::panels::login::render(ui, &mut self.state);
            });
            return;
        }

        // ---- Menu bar ----
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("Archivo", |ui| {
                    let fetching = self.state.fetch_in_progress;
                    if ui
                        .add_enabled(!fetching, egui::Button::new("Actualizar datos"))
                        .clicked()
                    {
                        self.state.pending_refresh = true;
                        ui.close_menu();
                    }
                    ui.separator();

                    // Export sub-menu -- enabled only when the active view has records
                    let family = self.active_family();
                    let has_records = !self.state.table(family).filtered_indices.is_empty();
                    ui.add_enabled_ui(has_records, |ui| {
                        ui.menu_button("Exportar", |ui| {
                            if ui.button("Exportar CSV\u{2026}").clicked() {
                                self.export_active_view(false);
                                ui.close_menu();
                            }
                            if ui.button("Exportar JSON\u{2026}").clicked() {
                                self.export_active_view(true);
                                ui.close_menu();
                            }
                        });
                    });

                    ui.separator();
                    if ui.button("Cerrar Sesión").clicked() {
                        self.state.pending_logout = true;
                        ui.close_menu();
                    }
                    if ui.button("Salir").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button("Ver", |ui| {
                    if ui.button("Resumen de Descarga").clicked() {
                        self.state.show_summary = true;
                        ui.close_menu();
                    }
                    if ui.button("Acerca de\u{2026}").clicked() {
                        self.state.show_about = true;
                        ui.close_menu();
                    }
                });
            });
        });

        // ---- Status bar ----
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(" \u{25cf} ")
                        .color(egui::Color32::from_rgb(34, 197, 94)),
                );
                ui.label(&self.state.status_message);
                // Cancel button visible only while a fetch is running
                if self.state.fetch_in_progress && ui.small_button("Cancelar").clicked() {
                    self.fetch_manager.cancel_fetch();
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let family = self.active_family();
                    let table = self.state.table(family);
                    let total = table.records.len();
                    let filtered = table.filtered_indices.len();
                    if total > 0 {
                        ui.label(format!("{filtered}/{total} registros"));
                    }
                });
            });
        });

        // ---- Detail pane (bottom) ----
        egui::TopBottomPanel::bottom("detail_pane")
            .resizable(true)
            .default_height(ui::theme::DETAIL_PANE_HEIGHT)
            .show(ctx, |ui| {
                ui::panels::detail::render(ui, &self.state);
            });

        // ---- Central panel: tabs + active view ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                for (tab, label) in [
                    (Tab::Devices, "\u{1f4e1} Dispositivos"),
                    (Tab::M2m, "\u{1f4f6} Comunicaciones M2M"),
                    (Tab::Firmware, "\u{1f4bd} Información de Software"),
                ] {
                    if ui
                        .selectable_label(self.state.active_tab == tab, label)
                        .clicked()
                    {
                        self.state.active_tab = tab;
                    }
                }
            });
            ui.separator();

            match self.state.active_tab {
                Tab::Devices => {
                    ui.horizontal(|ui| {
                        for (subtab, label) in
                            [(DeviceSubTab::Boards, "Boards"), (DeviceSubTab::Kiwi, "Kiwi")]
                        {
                            if ui
                                .selectable_label(self.state.device_subtab == subtab, label)
                                .clicked()
                            {
                                self.state.device_subtab = subtab;
                            }
                        }
                    });
                    ui.separator();
                    let family = match self.state.device_subtab {
                        DeviceSubTab::Boards => Family::Boards,
                        DeviceSubTab::Kiwi => Family::Kiwi,
                    };
                    ui::panels::devices::render(ui, &mut self.state, family);
                }
                Tab::M2m => ui::panels::m2m::render(ui, &mut self.state),
                Tab::Firmware => ui::panels::firmware::render(ui, &mut self.state),
            }
        });

        // ---- Dialogs (modal-ish) ----
        ui::panels::summary::render(ctx, &mut self.state);
        ui::panels::about::render(ctx, &mut self.state);
    }

    /// Called by eframe when the application window is about to close.
    ///
    /// Saves the view state so the next launch can restore it.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.state.save_session();
    }
}
