// FleetSleuth - ui/panels/login.rs
//
// Sign-in gate: shown instead of the dashboard until a session exists.
// The actual sign-in happens inside the fetch cycle on the background
// thread; this panel only requests one and reports the outcome.

use crate::app::state::AppState;
use crate::util::constants;

/// Render the centred login panel.
pub fn render(ui: &mut egui::Ui, state: &mut AppState) {
    ui.vertical_centered(|ui| {
        ui.add_space(ui.available_height() * 0.25);

        ui.label(egui::RichText::new("\u{1f510}  Login Core").size(26.0).strong());
        ui.add_space(4.0);
        ui.label(
            egui::RichText::new(format!("Servidor: {}", state.config.base_url))
                .weak()
                .size(12.0),
        );

        ui.add_space(16.0);

        if state.fetch_in_progress {
            ui.spinner();
            ui.add_space(4.0);
            ui.label("Autenticando\u{2026}");
        } else if ui
            .add_sized([220.0, 32.0], egui::Button::new("Conectar con Credenciales"))
            .clicked()
        {
            state.login_error = None;
            state.pending_refresh = true;
        }

        if let Some(ref error) = state.login_error {
            ui.add_space(12.0);
            ui.colored_label(egui::Color32::from_rgb(239, 85, 59), error);
            ui.add_space(4.0);
            ui.label(
                egui::RichText::new(format!(
                    "Credenciales: variables {} / {} o [api] username en config.toml",
                    constants::ENV_USERNAME,
                    constants::ENV_PASSWORD
                ))
                .weak()
                .size(11.5),
            );
        }
    });
}
