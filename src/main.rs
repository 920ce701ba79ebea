// FleetSleuth - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. Logging initialisation (debug mode support)
// 3. Config and family schema loading (built-in + user-defined)
// 4. eframe GUI launch

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod gui;

// Re-export modules from the library crate so that `gui.rs` and other
// binary-side code can still use `crate::app::...`, `crate::core::...` etc.
pub use fleetsleuth::api;
pub use fleetsleuth::app;
pub use fleetsleuth::core;
pub use fleetsleuth::platform;
pub use fleetsleuth::ui;
pub use fleetsleuth::util;

use clap::Parser;
use std::path::PathBuf;

/// FleetSleuth - Cross-platform device-fleet dashboard.
///
/// Signs in to the management API, downloads the board / Kiwi / M2M /
/// firmware inventories, and renders them as filterable charts and tables.
#[derive(Parser, Debug)]
#[command(name = "FleetSleuth", version, about)]
struct Cli {
    /// Additional directory containing user-defined family schemas.
    #[arg(short = 's', long = "schema-dir")]
    schema_dir: Option<PathBuf>,

    /// Tenant UUID override for tenant-scoped endpoints.
    #[arg(short = 't', long = "tenant")]
    tenant: Option<String>,

    /// Base URL override for the management API.
    #[arg(long = "base-url")]
    base_url: Option<String>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    // Resolve platform paths and load config before logging init so the
    // configured level can participate in the priority chain.
    let platform_paths = platform::config::PlatformPaths::resolve();
    let (mut config, config_warnings) = platform::config::load_config(&platform_paths.config_dir);

    // Initialise logging subsystem
    util::logging::init(
        cli.debug,
        config.log_level.as_deref(),
        config.log_file.as_deref(),
    );

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        "FleetSleuth starting"
    );

    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    // CLI overrides beat config.toml.
    if let Some(tenant) = cli.tenant {
        config.tenant_uuid = tenant;
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }

    // Determine schema directory: CLI override > platform default
    let user_schema_dir = cli
        .schema_dir
        .as_deref()
        .unwrap_or(&platform_paths.user_schemas_dir);

    // Load family schemas
    let (schemas, schema_errors) = app::schema_mgr::load_all_schemas(Some(user_schema_dir));

    if !schema_errors.is_empty() {
        for err in &schema_errors {
            tracing::warn!(error = %err, "Schema loading warning");
        }
    }

    tracing::info!(schemas = schemas.len(), "Ready to launch GUI");

    // Create application state and restore the previous view session.
    let dark_mode = config.dark_mode;
    let font_size = config.font_size;
    let mut state = app::state::AppState::new(
        schemas,
        config,
        platform_paths.data_dir.clone(),
        cli.debug,
    );
    state.restore_session();

    // Launch the GUI
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(format!(
                "{} v{}",
                util::constants::APP_NAME,
                util::constants::APP_VERSION
            ))
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        util::constants::APP_NAME,
        native_options,
        Box::new(move |cc| {
            configure_style(&cc.egui_ctx, dark_mode, font_size);
            Ok(Box::new(gui::FleetSleuthApp::new(state)))
        }),
    );

    if let Err(e) = result {
        tracing::error!(error = %e, "Failed to launch GUI");
        eprintln!("Error: Failed to launch FleetSleuth GUI: {e}");
        std::process::exit(1);
    }
}

/// Apply the configured theme and font size to the egui context.
fn configure_style(ctx: &egui::Context, dark_mode: bool, font_size: f32) {
    ctx.set_visuals(if dark_mode {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    });

    ctx.style_mut(|style| {
        use egui::{FontId, TextStyle};
        style
            .text_styles
            .insert(TextStyle::Body, FontId::proportional(font_size));
        style
            .text_styles
            .insert(TextStyle::Button, FontId::proportional(font_size));
        style
            .text_styles
            .insert(TextStyle::Monospace, FontId::monospace(font_size - 2.0));
    });
}
