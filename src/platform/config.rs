// FleetSleuth - platform/config.rs
//
// Platform-specific configuration, data directory resolution, and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::api::client::Credentials;
use crate::util::constants;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for FleetSleuth data and configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/fleetsleuth/ or %APPDATA%\FleetSleuth\)
    pub config_dir: PathBuf,

    /// User schema directory (e.g. ~/.config/fleetsleuth/schemas/)
    pub user_schemas_dir: PathBuf,

    /// Data directory for session state and raw dumps.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            // Schemas live one level above config/ so the user-visible path is
            // %APPDATA%\FleetSleuth\schemas\ rather than the deeper
            // %APPDATA%\FleetSleuth\config\schemas\.
            let user_schemas_dir = config_dir
                .parent()
                .unwrap_or(&config_dir)
                .join(constants::SCHEMAS_DIR_NAME);
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                schemas = %user_schemas_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                user_schemas_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                config_dir: fallback.clone(),
                user_schemas_dir: fallback.join(constants::SCHEMAS_DIR_NAME),
                data_dir: fallback,
            }
        }
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility -- a newer
/// config file can be used with an older binary without crashing.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[api]` section.
    pub api: ApiSection,
    /// `[ui]` section.
    pub ui: UiSection,
    /// `[export]` section.
    pub export: ExportSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[api]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Base URL of the management API.
    pub base_url: Option<String>,
    /// Tenant UUID appended to tenant-scoped endpoints.
    pub tenant_uuid: Option<String>,
    /// HTTP request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// API username (CORE_USERNAME env var takes priority).
    pub username: Option<String>,
}

/// `[ui]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct UiSection {
    /// Theme: "dark" or "light".
    pub theme: Option<String>,
    /// Body font size in points.
    pub font_size: Option<f32>,
}

/// `[export]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ExportSection {
    /// Dump each fetched raw resource to a CSV in the data directory.
    pub dump_raw: Option<bool>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// All values are validated against named constants at load time.
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- API --
    /// Base URL of the management API.
    pub base_url: String,
    /// Tenant UUID for tenant-scoped endpoints (empty = server default).
    pub tenant_uuid: String,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
    /// API username from config (env var takes priority at resolve time).
    pub username: Option<String>,

    // -- UI --
    /// Dark mode (true) or light mode (false).
    pub dark_mode: bool,
    /// Body font size in points.
    pub font_size: f32,

    // -- Export --
    /// Dump each fetched raw resource to CSV.
    pub dump_raw: bool,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    /// Log file path.
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_BASE_URL.to_string(),
            tenant_uuid: String::new(),
            timeout_secs: constants::DEFAULT_API_TIMEOUT_SECS,
            username: None,
            dark_mode: true,
            font_size: constants::DEFAULT_FONT_SIZE,
            dump_raw: false,
            log_level: None,
            log_file: None,
        }
    }
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first-run).
/// If the file is unparseable, returns defaults with an error warning --
/// the application still starts but the user is informed.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir
        .parent()
        .unwrap_or(config_dir)
        .join(constants::CONFIG_FILE_NAME);

    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!(
                "Could not read config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    // Validate each field against named constants, accumulating all errors.
    let mut config = AppConfig::default();

    // -- API: base_url --
    if let Some(ref url) = raw.api.base_url {
        let trimmed = url.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            config.base_url = trimmed.trim_end_matches('/').to_string();
        } else {
            warnings.push(format!(
                "[api] base_url = \"{url}\" is not an http(s) URL. Using default ({}).",
                constants::DEFAULT_BASE_URL,
            ));
        }
    }

    // -- API: tenant_uuid --
    if let Some(ref tenant) = raw.api.tenant_uuid {
        config.tenant_uuid = tenant.trim().to_string();
    }

    // -- API: timeout_secs --
    if let Some(secs) = raw.api.timeout_secs {
        if (constants::MIN_API_TIMEOUT_SECS..=constants::MAX_API_TIMEOUT_SECS).contains(&secs) {
            config.timeout_secs = secs;
        } else {
            warnings.push(format!(
                "[api] timeout_secs = {secs} is out of range ({}-{}). Using default ({}).",
                constants::MIN_API_TIMEOUT_SECS,
                constants::MAX_API_TIMEOUT_SECS,
                constants::DEFAULT_API_TIMEOUT_SECS,
            ));
        }
    }

    // -- API: username --
    if let Some(ref username) = raw.api.username {
        if !username.trim().is_empty() {
            config.username = Some(username.trim().to_string());
        }
    }

    // -- UI: theme --
    if let Some(ref theme) = raw.ui.theme {
        match theme.to_lowercase().as_str() {
            "dark" => config.dark_mode = true,
            "light" => config.dark_mode = false,
            other => {
                warnings.push(format!(
                    "[ui] theme = \"{other}\" is not recognised. Expected \"dark\" or \"light\". Using default (dark).",
                ));
            }
        }
    }

    // -- UI: font_size --
    if let Some(size) = raw.ui.font_size {
        if (constants::MIN_FONT_SIZE..=constants::MAX_FONT_SIZE).contains(&size) {
            config.font_size = size;
        } else {
            warnings.push(format!(
                "[ui] font_size = {size} is out of range ({}-{}). Using default ({}).",
                constants::MIN_FONT_SIZE,
                constants::MAX_FONT_SIZE,
                constants::DEFAULT_FONT_SIZE,
            ));
        }
    }

    // -- Export: dump_raw --
    if let Some(dump) = raw.export.dump_raw {
        config.dump_raw = dump;
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.clone());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Logging: file --
    if let Some(ref file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(file.clone());
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }

    (config, warnings)
}

// =============================================================================
// Credential resolution
// =============================================================================

/// Resolve API credentials: environment variables beat config.toml.
///
/// The password is env-only (never read from or written to disk).
/// Returns `None` when either half is missing; the login panel reports
/// which one so the user knows what to set.
pub fn resolve_credentials(config: &AppConfig) -> Option<Credentials> {
    let username = std::env::var(constants::ENV_USERNAME)
        .ok()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| config.username.clone())?;

    let password = std::env::var(constants::ENV_PASSWORD)
        .ok()
        .filter(|p| !p.is_empty())?;

    Some(Credentials { username, password })
}

// =============================================================================
// Tests
// =============================================================================
