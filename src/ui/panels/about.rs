// FleetSleuth - ui/panels/about.rs
//
// About dialog: shown when the user clicks the ⓘ button in the menu bar.
// Rendered as a centred, non-resizable, non-collapsible modal window.

use crate::app::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const REPO_URL: &str = "https://github.com/swatto86/FleetSleuth";

/// Render the About dialog (if `state.show_about` is true).
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    if !state.show_about {
        return;
    }

    let mut open = true;
    egui::Window::new("About FleetSleuth")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .min_width(360.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.add_space(8.0);

            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new("\u{1f4ca}  FleetSleuth").size(28.0).strong());
                ui.add_space(4.0);
                ui.label(egui::RichText::new(format!("v{VERSION}")).size(14.0).weak());
            });

            ui.add_space(12.0);
            ui.separator();
            ui.add_space(8.0);

            ui.label("Cross-platform device-fleet dashboard with extensible record-family schemas.");
            ui.add_space(8.0);
            ui.hyperlink(REPO_URL);

            ui.add_space(12.0);
            ui.separator();
            if ui.button("Close").clicked() {
                state.show_about = false;
            }
        });

    if !open {
        state.show_about = false;
    }
}
