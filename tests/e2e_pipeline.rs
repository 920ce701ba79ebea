// FleetSleuth - tests/e2e_pipeline.rs
//
// End-to-end tests for the fetch-and-normalise pipeline.
//
// These tests exercise real fixture payloads from disk through the real
// schema loading, response unwrapping, normalisation, filtering, and
// export code — no mocks, no stubs. The fixtures reproduce the shapes the
// management API actually serves, including an enveloped list, a
// non-object list entry, and a single-quoted nested info payload.

use fleetsleuth::api::client::unwrap_records;
use fleetsleuth::core::filter::{apply_filters, FilterState};
use fleetsleuth::core::model::{
    Connectivity, Family, FamilySchema, Operability, UpdateStatus, UsageTier,
};
use fleetsleuth::core::normalize::normalize_records;
use fleetsleuth::core::schema::load_builtin_schemas;
use std::path::PathBuf;

// =============================================================================
// Helpers
// =============================================================================

/// Absolute path to the on-disk fixture files.
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Load a fixture payload, unwrap its response shape, and normalise it
/// with the family's built-in schema — the exact path a fetch cycle runs.
fn normalize_fixture(name: &str, family: Family) -> Vec<fleetsleuth::core::model::DeviceRecord> {
    let content = std::fs::read_to_string(fixture(name)).expect("fixture readable");
    let value: serde_json::Value = serde_json::from_str(&content).expect("fixture is JSON");
    let items = unwrap_records(value, name).expect("fixture unwraps");

    let schema = schema_for(family);
    normalize_records(&serde_json::Value::Array(items), &schema, 0).records
}

fn schema_for(family: Family) -> FamilySchema {
    load_builtin_schemas()
        .into_iter()
        .find(|s| s.family == family)
        .expect("built-in schema present")
}

// =============================================================================
// Boards E2E
// =============================================================================

/// The boards fixture normalises with every derived field populated.
#[test]
fn e2e_boards_fixture_normalises_fully() {
    let records = normalize_fixture("boards.json", Family::Boards);
    assert_eq!(records.len(), 4);

    // Row 0: TERMINADO is positive on both axes; final_client resolves.
    assert_eq!(records[0].model, "MCX-Frio-01");
    assert_eq!(records[0].organization, "Frigorificos Sur");
    assert_eq!(records[0].connectivity, Connectivity::Connected);
    assert_eq!(records[0].operability, Operability::Enabled);

    // Row 1: "offline" is in neither token set.
    assert_eq!(records[1].connectivity, Connectivity::Disconnected);
    assert_eq!(records[1].operability, Operability::Disabled);

    // Row 2: null name fills the model sentinel; boolean true status is
    // positive on both axes; tenant_uuid is the organisation fallback.
    assert_eq!(records[2].model, "Genérico");
    assert_eq!(records[2].organization, "t-200");
    assert_eq!(records[2].connectivity, Connectivity::Connected);

    // Row 3: no name/ki_id at all, no final_client/tenant, only "status".
    assert_eq!(records[3].model, "Genérico");
    assert_eq!(records[3].organization, "Sin Asignar");
    assert_eq!(records[3].connectivity, Connectivity::Connected);
    assert_eq!(records[3].operability, Operability::Disabled);

    // Invariant: every record keeps its source columns.
    assert!(records[0].raw_field("uuid").is_some());
}

/// Normalising the same fixture twice yields identical output.
#[test]
fn e2e_normalisation_is_idempotent() {
    let first = normalize_fixture("boards.json", Family::Boards);
    let second = normalize_fixture("boards.json", Family::Boards);

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.organization, b.organization);
        assert_eq!(a.model, b.model);
        assert_eq!(a.connectivity, b.connectivity);
        assert_eq!(a.operability, b.operability);
        assert_eq!(a.raw, b.raw);
    }
}

// =============================================================================
// Kiwi E2E (enveloped response)
// =============================================================================

/// The kiwi fixture is an object wrapping one list; it unwraps and
/// normalises like a plain list.
#[test]
fn e2e_kiwi_envelope_unwraps_and_normalises() {
    let records = normalize_fixture("kiwi.json", Family::Kiwi);
    assert_eq!(records.len(), 3);

    // Kiwi has no organisations: every record carries the sentinel.
    assert!(records.iter().all(|r| r.organization == "Sin Asignar"));

    // FABRICADO is enabled-only.
    assert_eq!(records[0].model, "KiwiNet-Alpha");
    assert_eq!(records[0].connectivity, Connectivity::Disconnected);
    assert_eq!(records[0].operability, Operability::Enabled);

    // "connected" is connected-only.
    assert_eq!(records[1].connectivity, Connectivity::Connected);
    assert_eq!(records[1].operability, Operability::Disabled);

    // Null ssid fills the model sentinel.
    assert_eq!(records[2].model, "Genérico");
}

// =============================================================================
// M2M E2E
// =============================================================================

/// The m2m fixture exercises enrichment: mixed consumption encodings,
/// id-candidate fallback, and a corrupted (non-object) entry.
#[test]
fn e2e_m2m_fixture_enrichment() {
    let content = std::fs::read_to_string(fixture("m2m.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    let items = unwrap_records(value, "m2m.json").unwrap();

    let schema = schema_for(Family::M2m);
    let result = normalize_records(&serde_json::Value::Array(items), &schema, 0);

    // The "corrupted-entry" string is skipped, not an error.
    assert_eq!(result.records.len(), 4);
    assert_eq!(result.skipped, 1);

    let records = result.records;

    // Row 0: icc id, numeric MB figure, formatted monthly figure.
    let m0 = records[0].m2m.as_ref().unwrap();
    assert_eq!(m0.sim_id, "8934075551234567890");
    assert_eq!(m0.usage_tier_daily, UsageTier::Low);
    assert_eq!(m0.cons_month_mb, Some(48.0));
    assert_eq!(m0.usage_tier_month, UsageTier::High);
    assert_eq!(records[0].organization, "4217");
    assert_eq!(records[0].connectivity, Connectivity::Connected);

    // Row 1: iccid fallback id; "0 bytes" parses to zero (Inactive).
    let m1 = records[1].m2m.as_ref().unwrap();
    assert_eq!(m1.sim_id, "8934075559876543210");
    assert_eq!(m1.cons_daily_mb, Some(0.0));
    assert_eq!(m1.usage_tier_daily, UsageTier::Inactive);
    assert_eq!(m1.alarm_count, 2);
    assert_eq!(records[1].connectivity, Connectivity::Disconnected);

    // Row 2: KB and GB unit conversion; missing servicePack → sentinel.
    let m2 = records[2].m2m.as_ref().unwrap();
    assert_eq!(m2.cons_daily_mb, Some(0.5));
    assert_eq!(m2.usage_tier_month, UsageTier::Extreme);
    assert_eq!(m2.rate_plan, "Sin Plan");
    assert_eq!(records[2].operability, Operability::Enabled);

    // Row 3: alias id candidate; missing organisation → M2M sentinel.
    let m3 = records[3].m2m.as_ref().unwrap();
    assert_eq!(m3.sim_id, "sim-backup");
    assert_eq!(m3.usage_tier_daily, UsageTier::Extreme);
    assert_eq!(records[3].organization, "General");
}

// =============================================================================
// Firmware E2E
// =============================================================================

/// The firmware fixture exercises both nested-info encodings and the
/// update cutoff.
#[test]
fn e2e_firmware_fixture_extraction() {
    let records = normalize_fixture("firmware.json", Family::Firmware);
    assert_eq!(records.len(), 4);

    // Object payload, built after the cutoff.
    let fw0 = records[0].firmware.as_ref().unwrap();
    assert_eq!(fw0.version.as_deref(), Some("3.4.0"));
    assert_eq!(fw0.update_status, UpdateStatus::Updated);

    // Single-quoted string payload, built before the cutoff.
    let fw1 = records[1].firmware.as_ref().unwrap();
    assert_eq!(fw1.version.as_deref(), Some("3.1.2"));
    assert_eq!(fw1.update_status, UpdateStatus::Outdated);

    // Empty and missing payloads degrade to Outdated, never an error.
    for record in &records[2..] {
        let fw = record.firmware.as_ref().unwrap();
        assert_eq!(fw.version, None);
        assert_eq!(fw.compilation_date, None);
        assert_eq!(fw.update_status, UpdateStatus::Outdated);
    }
}

// =============================================================================
// Filter + export E2E
// =============================================================================

/// Filtering the normalised boards by organisation and exporting the
/// result produces a CSV with exactly the filtered rows.
#[test]
fn e2e_filter_and_export_roundtrip() {
    let records = normalize_fixture("boards.json", Family::Boards);

    let filter = FilterState::for_organization("Frigorificos Sur");
    let indices = apply_filters(&records, &filter);
    assert_eq!(indices, vec![0, 1]);

    let filtered: Vec<_> = indices.iter().map(|&i| records[i].clone()).collect();
    let mut buf = Vec::new();
    let count = fleetsleuth::core::export::export_csv(
        &filtered,
        &mut buf,
        &PathBuf::from("boards.csv"),
    )
    .unwrap();
    assert_eq!(count, 2);

    let output = String::from_utf8(buf).unwrap();
    assert!(output.contains("MCX-Frio-01"));
    assert!(output.contains("MCX-Frio-02"));
    assert!(!output.contains("KI-1003"));
}

/// The combined connectivity + text filters narrow the fixture correctly.
#[test]
fn e2e_combined_filters() {
    let records = normalize_fixture("boards.json", Family::Boards);

    let mut filter = FilterState::default();
    filter.connectivity.insert(Connectivity::Connected);
    filter.text_search = "ki-100".to_string();

    let indices = apply_filters(&records, &filter);
    // Rows 0 (TERMINADO) and 2 (true) are connected AND carry a KI id;
    // row 3 is connected but has no KI id column.
    assert_eq!(indices, vec![0, 2]);
}

/// An empty payload flows through the whole pipeline as an empty table.
#[test]
fn e2e_empty_payload_yields_empty_table() {
    let schema = schema_for(Family::Boards);
    for payload in [
        serde_json::json!([]),
        serde_json::json!(null),
        serde_json::json!({"boards": []}),
    ] {
        let items = unwrap_records(payload, "empty").unwrap();
        let result = normalize_records(&serde_json::Value::Array(items), &schema, 0);
        assert!(result.records.is_empty());

        let indices = apply_filters(&result.records, &FilterState::default());
        assert!(indices.is_empty());
    }
}
