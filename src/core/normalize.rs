// FleetSleuth - core/normalize.rs
//
// Record normalisation using family schemas.
// Core layer: accepts already-decoded JSON, never touches the network.
//
// Normalisation is total: every branch has a sentinel fallback and no
// input shape can produce an error. Bad input degrades to an empty table
// or to skipped rows; the dashboard renders regardless.

use crate::core::model::{
    DeviceRecord, FamilySchema, FirmwareInfo, FirmwareRules, M2mInfo, M2mRules, UpdateStatus,
    UsageTier,
};
use crate::util::constants;
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::OnceLock;

/// Result of normalising one resource payload.
#[derive(Debug)]
pub struct NormalizeResult {
    /// Successfully normalised records.
    pub records: Vec<DeviceRecord>,
    /// Raw items skipped because they were not JSON objects.
    pub skipped: usize,
}

/// Normalise a raw resource payload against a family schema.
///
/// The payload is expected to be a JSON array of objects (the api layer
/// has already unwrapped single-list response envelopes). Anything else
/// (null, a scalar, an object) yields an empty table. Non-object items
/// inside the array are counted in `skipped` and dropped.
///
/// # Arguments
/// * `input` - Decoded response payload
/// * `schema` - The family schema to normalise against
/// * `id_start` - Starting ID for records (for global uniqueness across resources)
pub fn normalize_records(input: &Value, schema: &FamilySchema, id_start: u64) -> NormalizeResult {
    let items = match input {
        Value::Array(items) => items,
        Value::Null => {
            return NormalizeResult {
                records: Vec::new(),
                skipped: 0,
            }
        }
        other => {
            tracing::debug!(
                schema_id = %schema.id,
                found = json_type_name(other),
                "Payload is not a record list; producing empty table"
            );
            return NormalizeResult {
                records: Vec::new(),
                skipped: 0,
            };
        }
    };

    let mut records = Vec::with_capacity(items.len());
    let mut skipped = 0usize;

    for item in items {
        let raw = match item {
            Value::Object(map) => map.clone(),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let id = id_start + records.len() as u64;
        let row_index = records.len();

        // Derived schema fields: ordered candidate walk, sentinel fallback.
        let organization = resolve_field(
            &raw,
            &schema.organization_fields,
            &schema.organization_sentinel,
        );
        let model = resolve_field(&raw, &schema.model_fields, &schema.model_sentinel);

        // Status classification: the first *present* status column is read
        // for both classifications; a null value or an absent column yields
        // the negative label on each axis.
        let (connectivity, operability) = match raw_status_value(&raw, &schema.status_fields) {
            Some(status) => (
                schema.classify_connectivity(&status),
                schema.classify_operability(&status),
            ),
            None => (Default::default(), Default::default()),
        };

        let m2m = schema
            .m2m
            .as_ref()
            .map(|rules| enrich_m2m(&raw, rules, row_index));

        let firmware = schema
            .firmware
            .as_ref()
            .map(|rules| extract_firmware(&raw, rules));

        records.push(DeviceRecord {
            id,
            family: schema.family,
            organization,
            model,
            connectivity,
            operability,
            m2m,
            firmware,
            raw,
        });
    }

    if skipped > 0 {
        tracing::debug!(
            schema_id = %schema.id,
            skipped,
            kept = records.len(),
            "Skipped non-object items in record list"
        );
    }

    NormalizeResult { records, skipped }
}

// =============================================================================
// Field resolution
// =============================================================================

/// Walk an ordered candidate list and resolve the first present field.
///
/// Mirrors column semantics: the first *key* present in the record selects
/// the source column, and only then is the value inspected. A selected
/// value that is null, empty, or composite fills with the sentinel rather
/// than falling through to the next candidate; later candidates only
/// apply when the column itself is absent.
fn resolve_field(
    raw: &serde_json::Map<String, Value>,
    candidates: &[String],
    sentinel: &str,
) -> String {
    for candidate in candidates {
        if let Some(value) = raw.get(candidate) {
            return scalar_display(value).unwrap_or_else(|| sentinel.to_string());
        }
    }
    sentinel.to_string()
}

/// Read the raw status value from the first present status column.
///
/// Returns `None` when no status column is present or the present one is
/// null; the caller maps that to the negative label on both axes.
fn raw_status_value(raw: &serde_json::Map<String, Value>, candidates: &[String]) -> Option<String> {
    for candidate in candidates {
        if let Some(value) = raw.get(candidate) {
            return scalar_display(value);
        }
    }
    None
}

/// Render a scalar JSON value for classification/display.
///
/// Booleans and numbers use their JSON text form, so `true`, `"true"`, and
/// `"TRUE"` all classify identically after lowercasing. Null, empty and
/// whitespace-only strings, arrays, and objects yield `None`.
fn scalar_display(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// M2M enrichment
// =============================================================================

/// Derive the M2M columns (SIM id, plan, network, consumption tiers).
fn enrich_m2m(raw: &serde_json::Map<String, Value>, rules: &M2mRules, row_index: usize) -> M2mInfo {
    let sim_id = rules
        .id_fields
        .iter()
        .find_map(|field| raw.get(field).and_then(scalar_display))
        .unwrap_or_else(|| row_index.to_string());

    let rate_plan = raw
        .get(&rules.rate_plan_field)
        .and_then(scalar_display)
        .unwrap_or_else(|| rules.rate_plan_sentinel.clone());

    let network_type = raw
        .get(&rules.network_field)
        .and_then(scalar_display)
        .unwrap_or_else(|| rules.network_sentinel.clone());

    let cons_daily_mb = raw
        .get(&rules.daily_consumption_field)
        .and_then(parse_consumption_mb);
    let cons_month_mb = raw
        .get(&rules.monthly_consumption_field)
        .and_then(parse_consumption_mb);

    let alarm_count = raw
        .get(&rules.alarm_field)
        .map(parse_count)
        .unwrap_or_default();

    M2mInfo {
        sim_id,
        rate_plan,
        network_type,
        cons_daily_mb,
        cons_month_mb,
        usage_tier_daily: UsageTier::from_mb(cons_daily_mb.unwrap_or(0.0)),
        usage_tier_month: UsageTier::from_mb(cons_month_mb.unwrap_or(0.0)),
        alarm_count,
    }
}

/// Parse a consumption value into MB.
///
/// The API is inconsistent here: numbers and bare numeric strings are
/// already MB, while some tenants return formatted strings like
/// `"0 bytes"`, `"512 KB"`, or `"1.5 GB"`. Unparseable values yield `None`
/// (rendered as inactive rather than an error).
fn parse_consumption_mb(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            // Split "<number> <unit>"; a missing unit means MB.
            let (num_part, unit) = match s.find(|c: char| c.is_alphabetic()) {
                Some(pos) => (s[..pos].trim(), s[pos..].trim().to_lowercase()),
                None => (s, String::new()),
            };
            let figure: f64 = num_part.replace(',', ".").parse().ok()?;
            let mb = match unit.as_str() {
                "" | "mb" => figure,
                "b" | "byte" | "bytes" => figure / (1024.0 * 1024.0),
                "kb" => figure / 1024.0,
                "gb" => figure * 1024.0,
                _ => return None,
            };
            Some(mb)
        }
        _ => None,
    }
}

/// Parse a count column (alarms) from a number or numeric string.
fn parse_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

// =============================================================================
// Firmware extraction
// =============================================================================

/// Extract the firmware version and build date from the nested info payload.
fn extract_firmware(raw: &serde_json::Map<String, Value>, rules: &FirmwareRules) -> FirmwareInfo {
    let info = match raw.get(&rules.info_field) {
        Some(Value::Object(map)) => Some(map.clone()),
        Some(Value::String(s)) => parse_info_payload(s),
        _ => None,
    };

    let Some(info) = info else {
        return FirmwareInfo::default();
    };

    let version = info.get(&rules.version_key).and_then(scalar_display);
    let compilation_date = info
        .get(&rules.date_key)
        .and_then(scalar_display)
        .and_then(|s| parse_compilation_date(&s));

    let update_status = match compilation_date {
        Some(date) if date >= update_cutoff() => UpdateStatus::Updated,
        _ => UpdateStatus::Outdated,
    };

    FirmwareInfo {
        version,
        compilation_date,
        update_status,
    }
}

/// Parse a nested info payload delivered as a string.
///
/// Some firmware builds emit the payload with single quotes; those are
/// repaired to double quotes before parsing, matching what the exporter
/// that produced them accepts. Anything that still fails to parse, or that
/// exceeds the size bound, is treated as opaque.
fn parse_info_payload(s: &str) -> Option<serde_json::Map<String, Value>> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed.len() > constants::MAX_INFO_PAYLOAD_BYTES {
        return None;
    }

    let attempt = |text: &str| -> Option<serde_json::Map<String, Value>> {
        match serde_json::from_str(text) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    };

    attempt(trimmed).or_else(|| attempt(&trimmed.replace('\'', "\"")))
}

/// Parse a compilation date in the formats the firmware builds have used.
fn parse_compilation_date(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Compilation-date cutoff for the Updated classification.
///
/// Parsed once from the named constant; a malformed constant degrades to
/// `NaiveDate::MAX` so nothing is over-reported as updated.
fn update_cutoff() -> NaiveDate {
    static CUTOFF: OnceLock<NaiveDate> = OnceLock::new();
    *CUTOFF.get_or_init(|| {
        NaiveDate::parse_from_str(constants::FIRMWARE_UPDATE_CUTOFF, "%Y-%m-%d")
            .unwrap_or(NaiveDate::MAX)
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Connectivity, Family, Operability};
    use crate::core::schema::load_builtin_schemas;
    use serde_json::json;

    fn schema_for(family: Family) -> FamilySchema {
        load_builtin_schemas()
            .into_iter()
            .find(|s| s.family == family)
            .expect("built-in schema present")
    }

    #[test]
    fn test_boards_example_row() {
        let schema = schema_for(Family::Boards);
        let input = json!([{"name": "RouterX", "state": "online"}]);
        let result = normalize_records(&input, &schema, 0);

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.skipped, 0);
        let rec = &result.records[0];
        assert_eq!(rec.model, "RouterX");
        assert_eq!(rec.organization, "Sin Asignar");
        assert_eq!(rec.connectivity, Connectivity::Connected);
        assert_eq!(rec.connectivity.label(), "Conectado");
        // "online" is a connected token but not an enabled token.
        assert_eq!(rec.operability, Operability::Disabled);
        assert_eq!(rec.operability.label(), "Deshabilitado");
    }

    #[test]
    fn test_kiwi_example_row() {
        let schema = schema_for(Family::Kiwi);
        let input = json!([{"ssid": "KiwiNet", "status": "FABRICADO"}]);
        let result = normalize_records(&input, &schema, 0);

        let rec = &result.records[0];
        assert_eq!(rec.model, "KiwiNet");
        assert_eq!(rec.organization, "Sin Asignar");
        // "fabricado" is an enabled token but not a connected token.
        assert_eq!(rec.connectivity, Connectivity::Disconnected);
        assert_eq!(rec.operability, Operability::Enabled);
    }

    #[test]
    fn test_missing_status_column_is_negative_on_both_axes() {
        let schema = schema_for(Family::Boards);
        let input = json!([{"name": "Silent"}]);
        let result = normalize_records(&input, &schema, 0);

        let rec = &result.records[0];
        assert_eq!(rec.connectivity, Connectivity::Disconnected);
        assert_eq!(rec.operability, Operability::Disabled);
    }

    #[test]
    fn test_boolean_and_string_status_classify_identically() {
        let schema = schema_for(Family::Boards);
        let input = json!([
            {"name": "a", "state": true},
            {"name": "b", "state": "true"},
            {"name": "c", "state": "TRUE"},
        ]);
        let result = normalize_records(&input, &schema, 0);

        for rec in &result.records {
            assert_eq!(rec.connectivity, Connectivity::Connected, "record {}", rec.model);
            assert_eq!(rec.operability, Operability::Enabled, "record {}", rec.model);
        }
    }

    #[test]
    fn test_unknown_status_token_is_negative() {
        let schema = schema_for(Family::Boards);
        let input = json!([{"name": "x", "state": "hibernating"}]);
        let rec = &normalize_records(&input, &schema, 0).records[0];
        assert_eq!(rec.connectivity, Connectivity::Disconnected);
        assert_eq!(rec.operability, Operability::Disabled);
    }

    #[test]
    fn test_state_preferred_over_status() {
        let schema = schema_for(Family::Boards);
        let input = json!([{"name": "x", "state": "online", "status": "whatever"}]);
        let rec = &normalize_records(&input, &schema, 0).records[0];
        assert_eq!(rec.connectivity, Connectivity::Connected);
    }

    #[test]
    fn test_empty_and_bad_inputs_yield_empty_tables() {
        let schema = schema_for(Family::Boards);
        for input in [
            json!([]),
            json!(null),
            json!("not a list"),
            json!(42),
            json!({"boards": "not unwrapped here"}),
        ] {
            let result = normalize_records(&input, &schema, 0);
            assert!(result.records.is_empty(), "input {input} should be empty");
        }
    }

    #[test]
    fn test_non_object_items_are_skipped_and_counted() {
        let schema = schema_for(Family::Boards);
        let input = json!([{"name": "ok"}, 17, "junk", {"name": "ok2"}]);
        let result = normalize_records(&input, &schema, 0);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.skipped, 2);
        // IDs stay contiguous over kept records.
        assert_eq!(result.records[0].id, 0);
        assert_eq!(result.records[1].id, 1);
    }

    #[test]
    fn test_organization_candidate_priority() {
        let schema = schema_for(Family::Boards);
        let input = json!([
            {"final_client": "Acme", "tenant_uuid": "t-1"},
            {"tenant_uuid": "t-2"},
            {},
        ]);
        let recs = normalize_records(&input, &schema, 0).records;
        assert_eq!(recs[0].organization, "Acme");
        assert_eq!(recs[1].organization, "t-2");
        assert_eq!(recs[2].organization, "Sin Asignar");
    }

    #[test]
    fn test_present_but_null_candidate_fills_sentinel() {
        // A present column with a null value fills with the sentinel rather
        // than falling through to a lower-priority candidate.
        let schema = schema_for(Family::Boards);
        let input = json!([{"name": null, "ki_id": "KI-7"}]);
        let rec = &normalize_records(&input, &schema, 0).records[0];
        assert_eq!(rec.model, "Genérico");
    }

    #[test]
    fn test_source_columns_preserved() {
        let schema = schema_for(Family::Boards);
        let input = json!([{"name": "RouterX", "state": "online", "uuid": "u-1", "extra": 5}]);
        let rec = &normalize_records(&input, &schema, 0).records[0];
        assert_eq!(rec.raw_field("uuid").as_deref(), Some("u-1"));
        assert_eq!(rec.raw_field("extra").as_deref(), Some("5"));
        assert_eq!(rec.raw_field("missing"), None);
    }

    #[test]
    fn test_idempotent_over_same_input() {
        let schema = schema_for(Family::Boards);
        let input = json!([
            {"name": "a", "state": "online", "final_client": "Acme"},
            {"ki_id": "KI-1", "status": "terminado"},
        ]);
        let first = normalize_records(&input, &schema, 0).records;
        let second = normalize_records(&input, &schema, 0).records;

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.organization, b.organization);
            assert_eq!(a.model, b.model);
            assert_eq!(a.connectivity, b.connectivity);
            assert_eq!(a.operability, b.operability);
            assert_eq!(a.raw, b.raw);
        }
    }

    // -------------------------------------------------------------------------
    // M2M enrichment
    // -------------------------------------------------------------------------

    #[test]
    fn test_m2m_enrichment() {
        let schema = schema_for(Family::M2m);
        let input = json!([{
            "icc": "8934567890",
            "lifeCycleStatus": "ASIGNADO",
            "servicePack": "Plan 10MB",
            "ratType": "LTE",
            "consumptionDaily": 2.5,
            "consumptionMonthly": "150 MB",
            "alarm_count": 3,
            "commercialGroupId": 77
        }]);
        let rec = &normalize_records(&input, &schema, 0).records[0];

        assert_eq!(rec.organization, "77");
        assert_eq!(rec.connectivity, Connectivity::Disconnected);
        assert_eq!(rec.operability, Operability::Enabled);

        let m2m = rec.m2m.as_ref().expect("m2m enrichment present");
        assert_eq!(m2m.sim_id, "8934567890");
        assert_eq!(m2m.rate_plan, "Plan 10MB");
        assert_eq!(m2m.network_type, "LTE");
        assert_eq!(m2m.cons_daily_mb, Some(2.5));
        assert_eq!(m2m.usage_tier_daily, UsageTier::Medium);
        assert_eq!(m2m.cons_month_mb, Some(150.0));
        assert_eq!(m2m.usage_tier_month, UsageTier::Extreme);
        assert_eq!(m2m.alarm_count, 3);
    }

    #[test]
    fn test_m2m_defaults_when_columns_absent() {
        let schema = schema_for(Family::M2m);
        let input = json!([{}]);
        let rec = &normalize_records(&input, &schema, 0).records[0];

        assert_eq!(rec.organization, "General");
        assert_eq!(rec.model, "Genérico");
        let m2m = rec.m2m.as_ref().unwrap();
        // No id candidate: the row index stands in.
        assert_eq!(m2m.sim_id, "0");
        assert_eq!(m2m.rate_plan, "Sin Plan");
        assert_eq!(m2m.network_type, "N/A");
        assert_eq!(m2m.cons_daily_mb, None);
        assert_eq!(m2m.usage_tier_daily, UsageTier::Inactive);
        assert_eq!(m2m.alarm_count, 0);
    }

    #[test]
    fn test_consumption_parsing_forms() {
        assert_eq!(parse_consumption_mb(&json!(5)), Some(5.0));
        assert_eq!(parse_consumption_mb(&json!("5")), Some(5.0));
        assert_eq!(parse_consumption_mb(&json!("0 bytes")), Some(0.0));
        assert_eq!(parse_consumption_mb(&json!("2048 KB")), Some(2.0));
        assert_eq!(parse_consumption_mb(&json!("1.5 GB")), Some(1536.0));
        assert_eq!(parse_consumption_mb(&json!("1,5 MB")), Some(1.5));
        assert_eq!(parse_consumption_mb(&json!("lots")), None);
        assert_eq!(parse_consumption_mb(&json!(null)), None);
    }

    #[test]
    fn test_usage_tier_boundaries() {
        assert_eq!(UsageTier::from_mb(0.0), UsageTier::Inactive);
        assert_eq!(UsageTier::from_mb(0.5), UsageTier::Low);
        assert_eq!(UsageTier::from_mb(1.0), UsageTier::Medium);
        assert_eq!(UsageTier::from_mb(10.0), UsageTier::High);
        assert_eq!(UsageTier::from_mb(100.0), UsageTier::Extreme);
    }

    // -------------------------------------------------------------------------
    // Firmware extraction
    // -------------------------------------------------------------------------

    #[test]
    fn test_firmware_info_as_object() {
        let schema = schema_for(Family::Firmware);
        let input = json!([{
            "name": "board-1",
            "info": {"quiiotd_version": "3.2.1", "compilation_date": "2025-07-15"}
        }]);
        let rec = &normalize_records(&input, &schema, 0).records[0];
        let fw = rec.firmware.as_ref().expect("firmware extraction present");
        assert_eq!(fw.version.as_deref(), Some("3.2.1"));
        assert_eq!(fw.compilation_date, NaiveDate::from_ymd_opt(2025, 7, 15));
        assert_eq!(fw.update_status, UpdateStatus::Updated);
    }

    #[test]
    fn test_firmware_info_as_single_quoted_string() {
        let schema = schema_for(Family::Firmware);
        let input = json!([{
            "info": "{'quiiotd_version': '2.9.0', 'compilation_date': '2024-11-02 08:30:00'}"
        }]);
        let rec = &normalize_records(&input, &schema, 0).records[0];
        let fw = rec.firmware.as_ref().unwrap();
        assert_eq!(fw.version.as_deref(), Some("2.9.0"));
        assert_eq!(fw.compilation_date, NaiveDate::from_ymd_opt(2024, 11, 2));
        // Built before the cutoff.
        assert_eq!(fw.update_status, UpdateStatus::Outdated);
    }

    #[test]
    fn test_firmware_info_missing_or_garbled() {
        let schema = schema_for(Family::Firmware);
        let input = json!([
            {"name": "no-info"},
            {"info": "{{{{not json"},
            {"info": {"quiiotd_version": "1.0"}},
        ]);
        let recs = normalize_records(&input, &schema, 0).records;

        let fw0 = recs[0].firmware.as_ref().unwrap();
        assert_eq!(fw0.version, None);
        assert_eq!(fw0.update_status, UpdateStatus::Outdated);

        let fw1 = recs[1].firmware.as_ref().unwrap();
        assert_eq!(fw1.version, None);

        // Version without a date: version survives, status stays Outdated.
        let fw2 = recs[2].firmware.as_ref().unwrap();
        assert_eq!(fw2.version.as_deref(), Some("1.0"));
        assert_eq!(fw2.update_status, UpdateStatus::Outdated);
    }

    #[test]
    fn test_update_cutoff_is_june_2025() {
        assert_eq!(update_cutoff(), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    }

    #[test]
    fn test_compilation_date_formats() {
        assert_eq!(
            parse_compilation_date("2025-06-02T10:00:00Z"),
            NaiveDate::from_ymd_opt(2025, 6, 2)
        );
        assert_eq!(
            parse_compilation_date("2025-06-02 10:00:00"),
            NaiveDate::from_ymd_opt(2025, 6, 2)
        );
        assert_eq!(
            parse_compilation_date("2025-06-02"),
            NaiveDate::from_ymd_opt(2025, 6, 2)
        );
        assert_eq!(parse_compilation_date("June 2nd"), None);
    }
}
