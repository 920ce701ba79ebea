// FleetSleuth - core/model.rs
//
// Core data model types. Pure data definitions with no I/O, no UI,
// no platform dependencies (Atlas Layer Rule: Core depends on std only).
//
// These types are the shared vocabulary across all layers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A raw record as returned by the management API: one JSON object,
/// field names untouched. The normaliser derives the fixed schema from
/// this and keeps it alongside so no source column is ever lost.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Record families
// =============================================================================

/// The record families served by the management API.
///
/// Each family has its own native field schema; a `FamilySchema` maps it
/// onto the fixed output schema below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// Board controllers (the original product line).
    Boards,
    /// Kiwi wireless devices.
    Kiwi,
    /// M2M SIM / cellular connectivity records.
    M2m,
    /// Firmware info records for boards.
    Firmware,
}

impl Family {
    /// Returns all families in fetch/display order.
    pub fn all() -> &'static [Family] {
        &[Family::Boards, Family::Kiwi, Family::M2m, Family::Firmware]
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Family::Boards => "Boards",
            Family::Kiwi => "Kiwi",
            Family::M2m => "M2M",
            Family::Firmware => "Firmware",
        }
    }

    /// ID of the built-in schema covering this family.
    pub fn schema_id(&self) -> &'static str {
        match self {
            Family::Boards => "boards",
            Family::Kiwi => "kiwi",
            Family::M2m => "m2m",
            Family::Firmware => "firmware",
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Derived status enums
// =============================================================================

/// Normalised connectivity status.
///
/// All raw status forms (`true`, `"online"`, `"TERMINADO"`, `"connected"`,
/// numbers, etc.) are mapped to one of these two variants via the family
/// schema's connected-token set. Anything outside the set is Disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Connectivity {
    Connected,
    #[default]
    Disconnected,
}

impl Connectivity {
    /// Returns both variants in display order (positive first).
    pub fn all() -> &'static [Connectivity] {
        &[Connectivity::Connected, Connectivity::Disconnected]
    }

    /// Dashboard display label (the fleet operators work in Spanish).
    pub fn label(&self) -> &'static str {
        match self {
            Connectivity::Connected => "Conectado",
            Connectivity::Disconnected => "Desconectado",
        }
    }
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalised operational status, derived from the same raw status value
/// as `Connectivity` but against a different token set (a board can be
/// enabled in the fleet while currently disconnected, and vice versa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Operability {
    Enabled,
    #[default]
    Disabled,
}

impl Operability {
    /// Returns both variants in display order (positive first).
    pub fn all() -> &'static [Operability] {
        &[Operability::Enabled, Operability::Disabled]
    }

    /// Dashboard display label.
    pub fn label(&self) -> &'static str {
        match self {
            Operability::Enabled => "Habilitado",
            Operability::Disabled => "Deshabilitado",
        }
    }
}

impl std::fmt::Display for Operability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// M2M usage tiers
// =============================================================================

/// Consumption bucket for an M2M SIM, derived from the MB figure of the
/// daily or monthly consumption column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum UsageTier {
    #[default]
    Inactive,
    Low,
    Medium,
    High,
    Extreme,
}

impl UsageTier {
    /// Returns all tiers in ascending consumption order.
    pub fn all() -> &'static [UsageTier] {
        &[
            UsageTier::Inactive,
            UsageTier::Low,
            UsageTier::Medium,
            UsageTier::High,
            UsageTier::Extreme,
        ]
    }

    /// Dashboard display label, including the MB range.
    pub fn label(&self) -> &'static str {
        match self {
            UsageTier::Inactive => "Inactivo (0 MB)",
            UsageTier::Low => "Bajo (< 1 MB)",
            UsageTier::Medium => "Medio (1 - 10 MB)",
            UsageTier::High => "Alto (10 - 100 MB)",
            UsageTier::Extreme => "Extremo (> 100 MB)",
        }
    }

    /// Bucket a consumption figure in MB.
    pub fn from_mb(mb: f64) -> UsageTier {
        if mb <= 0.0 {
            UsageTier::Inactive
        } else if mb < 1.0 {
            UsageTier::Low
        } else if mb < 10.0 {
            UsageTier::Medium
        } else if mb < 100.0 {
            UsageTier::High
        } else {
            UsageTier::Extreme
        }
    }
}

impl std::fmt::Display for UsageTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Firmware update status
// =============================================================================

/// Whether a board's firmware build is recent enough to count as updated.
/// Unknown or unparseable compilation dates count as Outdated so stale
/// fleets are never over-reported as current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UpdateStatus {
    Updated,
    #[default]
    Outdated,
}

impl UpdateStatus {
    /// Dashboard display label.
    pub fn label(&self) -> &'static str {
        match self {
            UpdateStatus::Updated => "Actualizado",
            UpdateStatus::Outdated => "Desactualizado",
        }
    }
}

impl std::fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Device Record (normalised output)
// =============================================================================

/// M2M-specific derived columns (SIM identity, plan, network, consumption).
#[derive(Debug, Clone, Default, Serialize)]
pub struct M2mInfo {
    /// SIM identifier, auto-detected from the first present of the schema's
    /// id candidates (icc, iccid, msisdn, ...). Row index string when none.
    pub sim_id: String,

    /// Service pack / rate plan name.
    pub rate_plan: String,

    /// Radio access technology (ratType).
    pub network_type: String,

    /// Daily consumption in MB, when the source column parsed.
    pub cons_daily_mb: Option<f64>,

    /// Monthly consumption in MB, when the source column parsed.
    pub cons_month_mb: Option<f64>,

    /// Consumption bucket for the daily figure (Inactive when unparsed).
    pub usage_tier_daily: UsageTier,

    /// Consumption bucket for the monthly figure (Inactive when unparsed).
    pub usage_tier_month: UsageTier,

    /// Number of active alarms on this SIM.
    pub alarm_count: u64,
}

/// Firmware-specific derived columns, extracted from the nested `info`
/// payload of a `/boards/info` record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FirmwareInfo {
    /// quiiotd daemon version string, when present.
    pub version: Option<String>,

    /// Firmware compilation date, when it parsed.
    pub compilation_date: Option<NaiveDate>,

    /// Updated/Outdated classification against the update cutoff.
    pub update_status: UpdateStatus,
}

/// A single normalised device record.
///
/// This is the core data unit that flows through filtering, display, and
/// export. Every family schema produces these regardless of the source
/// record's native field names, and every derived field is always
/// populated (sentinel when the source lacks the column); no partial
/// record ever reaches a panel.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceRecord {
    /// Monotonically increasing unique ID within the fetch cycle.
    pub id: u64,

    /// Source family of this record.
    pub family: Family,

    /// Owning organisation, or the family's sentinel when unassigned.
    pub organization: String,

    /// Device model, or the family's sentinel when unknown.
    pub model: String,

    /// Normalised connectivity status.
    pub connectivity: Connectivity,

    /// Normalised operational status.
    pub operability: Operability,

    /// M2M enrichment (Some only for the M2M family).
    pub m2m: Option<M2mInfo>,

    /// Firmware enrichment (Some only for the Firmware family).
    pub firmware: Option<FirmwareInfo>,

    /// The original record with all source columns preserved.
    pub raw: RawRecord,
}

impl DeviceRecord {
    /// Fetch a raw source column as display text.
    ///
    /// Strings come back unquoted; other scalars use their JSON rendering;
    /// nested values are rendered compactly. `None` when the column is
    /// absent or null.
    pub fn raw_field(&self, key: &str) -> Option<String> {
        match self.raw.get(key) {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

// =============================================================================
// Family Schema (runtime representation)
// =============================================================================

/// Runtime representation of a family schema after TOML parsing and
/// validation. This is what the normaliser uses at fetch time.
///
/// Built from `SchemaDefinition` (the raw TOML structure) via validation.
#[derive(Debug, Clone)]
pub struct FamilySchema {
    /// Unique schema identifier (e.g. "boards").
    pub id: String,

    /// Human-readable name (e.g. "Board controllers").
    pub name: String,

    /// Record family this schema normalises.
    pub family: Family,

    /// Schema format version.
    pub version: String,

    /// Description of what this schema covers.
    pub description: String,

    /// Ordered candidate source fields for `organization`; the first field
    /// present in a record wins. Empty list means "always the sentinel".
    pub organization_fields: Vec<String>,

    /// Fallback when no organisation candidate is present or non-null.
    pub organization_sentinel: String,

    /// Ordered candidate source fields for `model`.
    pub model_fields: Vec<String>,

    /// Fallback when no model candidate is present or non-null.
    pub model_sentinel: String,

    /// Ordered candidate source fields for the raw status value.
    pub status_fields: Vec<String>,

    /// Lowercased tokens whose presence means Connected.
    pub connected_tokens: Vec<String>,

    /// Lowercased tokens whose presence means Enabled.
    pub enabled_tokens: Vec<String>,

    /// Source columns the record table shows ahead of the derived ones.
    pub table_columns: Vec<String>,

    /// M2M enrichment rules (present only on the M2M schema).
    pub m2m: Option<M2mRules>,

    /// Firmware enrichment rules (present only on the firmware schema).
    pub firmware: Option<FirmwareRules>,

    /// Whether this is a built-in schema (true) or user-defined (false).
    pub is_builtin: bool,
}

/// Enrichment rules for the M2M family.
#[derive(Debug, Clone)]
pub struct M2mRules {
    /// Ordered candidate source fields for the SIM identifier.
    pub id_fields: Vec<String>,

    /// Source field for the rate plan, with its sentinel.
    pub rate_plan_field: String,
    pub rate_plan_sentinel: String,

    /// Source field for the network type, with its sentinel.
    pub network_field: String,
    pub network_sentinel: String,

    /// Source fields for daily and monthly consumption.
    pub daily_consumption_field: String,
    pub monthly_consumption_field: String,

    /// Source field for the alarm count.
    pub alarm_field: String,
}

/// Enrichment rules for the firmware family.
#[derive(Debug, Clone)]
pub struct FirmwareRules {
    /// Source column holding the nested info payload (object or JSON string).
    pub info_field: String,

    /// Key of the firmware version inside the info payload.
    pub version_key: String,

    /// Key of the compilation date inside the info payload.
    pub date_key: String,
}

impl FamilySchema {
    /// Classify a raw status value as connected or disconnected.
    ///
    /// Comparison is on the lowercased string form so `true`, `"true"`,
    /// and `"TRUE"` classify identically. Values outside the token set
    /// map to Disconnected.
    pub fn classify_connectivity(&self, raw_status: &str) -> Connectivity {
        let raw_lower = raw_status.to_lowercase();
        if self.connected_tokens.iter().any(|t| *t == raw_lower) {
            Connectivity::Connected
        } else {
            Connectivity::Disconnected
        }
    }

    /// Classify a raw status value as enabled or disabled.
    ///
    /// Same lowercased-string comparison as `classify_connectivity`, but
    /// against the enabled-token set; the two classifications are
    /// independent reads of the same raw value.
    pub fn classify_operability(&self, raw_status: &str) -> Operability {
        let raw_lower = raw_status.to_lowercase();
        if self.enabled_tokens.iter().any(|t| *t == raw_lower) {
            Operability::Enabled
        } else {
            Operability::Disabled
        }
    }
}

// =============================================================================
// Fetch Summary
// =============================================================================

/// Summary statistics for a completed fetch cycle.
#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    /// Resources attempted this cycle.
    pub resources_attempted: usize,

    /// Resources that loaded (possibly with zero records).
    pub resources_loaded: usize,

    /// Resources that failed at the transport/decode boundary.
    pub resources_failed: usize,

    /// Total normalised records across all resources.
    pub total_records: usize,

    /// Raw items skipped because they were not JSON objects.
    pub skipped_records: usize,

    /// Per-resource breakdown.
    pub resource_summaries: Vec<ResourceSummary>,

    /// Wall-clock cycle duration.
    pub duration: Duration,
}

/// Per-resource fetch statistics.
#[derive(Debug, Clone)]
pub struct ResourceSummary {
    /// Family fetched.
    pub family: Family,

    /// Normalised records produced.
    pub record_count: usize,

    /// Raw items skipped (non-object entries).
    pub skipped: usize,

    /// Failure message when the resource could not be fetched.
    pub failed: Option<String>,
}
