// FleetSleuth - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "FleetSleuth";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "FleetSleuth";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// API limits
// =============================================================================

/// Default base URL of the device-management API.
pub const DEFAULT_BASE_URL: &str = "https://core.kiconex.com/api";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 15;

/// Minimum configurable request timeout (seconds).
pub const MIN_API_TIMEOUT_SECS: u64 = 1;

/// Maximum configurable request timeout (seconds).
/// Beyond this the fetch thread holds the "refreshing" state for so long
/// that the dashboard is effectively hung from the user's point of view.
pub const MAX_API_TIMEOUT_SECS: u64 = 120;

/// Maximum HTTP response body size in bytes accepted from any endpoint.
/// Fleet listings are at most a few MB; a response larger than this is
/// either a misconfigured base URL (an HTML portal page, a tarball) or a
/// runaway endpoint, and decoding it would stall the fetch thread.
pub const MAX_RESPONSE_BYTES: u64 = 32 * 1024 * 1024; // 32 MB

/// Maximum number of records accepted from a single resource fetch.
/// Caps memory when an endpoint misbehaves; the excess is dropped with a
/// warning so the dashboard still renders the retained prefix.
pub const MAX_RECORDS_PER_RESOURCE: usize = 200_000;

/// User-Agent header sent with every API request.
pub const API_USER_AGENT: &str = concat!("FleetSleuth/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Family schema limits
// =============================================================================

/// Maximum number of family schemas that can be loaded (built-in + user).
pub const MAX_SCHEMAS: usize = 50;

/// Maximum size of a schema TOML file in bytes.
pub const MAX_SCHEMA_FILE_SIZE: u64 = 64 * 1024; // 64 KB

/// Maximum number of candidate field names per resolution rule.
pub const MAX_FIELD_CANDIDATES: usize = 16;

// =============================================================================
// Normalisation
// =============================================================================

/// Compilation date on or after which a firmware build counts as updated.
pub const FIRMWARE_UPDATE_CUTOFF: &str = "2025-06-01";

/// Maximum nested-info payload length (bytes) the firmware extractor will
/// attempt to repair and parse.  Anything longer is treated as opaque.
pub const MAX_INFO_PAYLOAD_BYTES: usize = 16 * 1024; // 16 KB

// =============================================================================
// Per-frame UI message budgets
// =============================================================================

/// Maximum number of fetch-progress messages processed by the UI update loop
/// per frame.  Any remaining messages are left in the channel and processed
/// on subsequent frames, preventing a burst from stalling the render loop.
pub const MAX_FETCH_MESSAGES_PER_FRAME: usize = 100;

/// Maximum number of non-fatal warnings accumulated across a single fetch
/// cycle.  Prevents the warnings Vec from growing without bound when every
/// record in a large resource is malformed.
pub const MAX_WARNINGS: usize = 500;

// =============================================================================
// UI defaults
// =============================================================================

/// Default UI body font size in points.
pub const DEFAULT_FONT_SIZE: f32 = 14.5;

/// Minimum user-configurable UI font size (points).
pub const MIN_FONT_SIZE: f32 = 10.0;

/// Maximum user-configurable UI font size (points).
pub const MAX_FONT_SIZE: f32 = 24.0;

/// Maximum category rows shown in a chart legend before scrolling.
pub const MAX_LEGEND_ROWS: usize = 200;

/// Maximum record identifiers listed in a usage-tier tooltip preview.
pub const MAX_TIER_PREVIEW_IDS: usize = 10;

// =============================================================================
// Export
// =============================================================================

/// Maximum number of records that can be exported in a single operation.
pub const MAX_EXPORT_RECORDS: usize = 1_000_000;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Session persistence file name (stored in the platform data directory).
pub const SESSION_FILE_NAME: &str = "session.json";

/// User schema subdirectory name.
pub const SCHEMAS_DIR_NAME: &str = "schemas";

/// Environment variable holding the API username (overrides config.toml).
pub const ENV_USERNAME: &str = "CORE_USERNAME";

/// Environment variable holding the API password (never stored in config).
pub const ENV_PASSWORD: &str = "CORE_PASSWORD";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
