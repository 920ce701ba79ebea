// FleetSleuth - core/schema.rs
//
// Family schema loading and validation.
// Core layer: accepts TOML strings, never touches the filesystem.
// I/O is handled by the app::schema_mgr which feeds content here.

use crate::core::model::{Family, FamilySchema, FirmwareRules, M2mRules};
use crate::util::constants;
use crate::util::error::SchemaError;
use serde::Deserialize;
use std::path::PathBuf;

// =============================================================================
// TOML deserialization structures (raw input)
// =============================================================================

/// Raw TOML schema definition as deserialized from a .toml file.
/// This is validated and compiled into a `FamilySchema` for runtime use.
#[derive(Debug, Deserialize)]
pub struct SchemaDefinition {
    pub schema: SchemaMeta,
    pub resolution: ResolutionDef,
    pub status_tokens: StatusTokensDef,
    #[serde(default)]
    pub table: TableDef,
    pub m2m: Option<M2mDef>,
    pub firmware: Option<FirmwareDef>,
}

#[derive(Debug, Deserialize)]
pub struct SchemaMeta {
    pub id: String,
    pub name: String,
    pub family: Family,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// `[resolution]` section: the ordered field-resolution rules.
#[derive(Debug, Deserialize)]
pub struct ResolutionDef {
    #[serde(default)]
    pub organization_fields: Vec<String>,
    pub organization_sentinel: String,
    #[serde(default)]
    pub model_fields: Vec<String>,
    pub model_sentinel: String,
    #[serde(default)]
    pub status_fields: Vec<String>,
}

/// `[status_tokens]` section: the fixed positive-token sets.
#[derive(Debug, Deserialize)]
pub struct StatusTokensDef {
    pub connected: Vec<String>,
    pub enabled: Vec<String>,
}

/// `[table]` section: which source columns the record table leads with.
#[derive(Debug, Deserialize, Default)]
pub struct TableDef {
    #[serde(default)]
    pub columns: Vec<String>,
}

/// `[m2m]` section: enrichment rules for the M2M family.
#[derive(Debug, Deserialize)]
pub struct M2mDef {
    pub id_fields: Vec<String>,
    pub rate_plan_field: String,
    #[serde(default = "default_rate_plan_sentinel")]
    pub rate_plan_sentinel: String,
    pub network_field: String,
    #[serde(default = "default_network_sentinel")]
    pub network_sentinel: String,
    pub daily_consumption_field: String,
    pub monthly_consumption_field: String,
    pub alarm_field: String,
}

fn default_rate_plan_sentinel() -> String {
    "Sin Plan".to_string()
}

fn default_network_sentinel() -> String {
    "N/A".to_string()
}

/// `[firmware]` section: enrichment rules for the firmware family.
#[derive(Debug, Deserialize)]
pub struct FirmwareDef {
    pub info_field: String,
    pub version_key: String,
    pub date_key: String,
}

// =============================================================================
// Schema validation and compilation
// =============================================================================

/// Parse a TOML string into a `SchemaDefinition`.
///
/// `source_path` is used for error messages only (not for I/O).
pub fn parse_schema_toml(
    toml_content: &str,
    source_path: &PathBuf,
) -> Result<SchemaDefinition, SchemaError> {
    toml::from_str(toml_content).map_err(|e| SchemaError::TomlParse {
        path: source_path.clone(),
        source: e,
    })
}

/// Validate a `SchemaDefinition` and compile it into a runtime `FamilySchema`.
///
/// Validates:
/// - Required fields are present and non-empty
/// - Candidate-field lists are within size limits
/// - Token sets are non-empty
///
/// Token sets are lowercased here, once, so classification at fetch time is
/// a plain equality scan.
pub fn validate_and_compile(
    def: SchemaDefinition,
    _source_path: &PathBuf,
    is_builtin: bool,
) -> Result<FamilySchema, SchemaError> {
    let id = &def.schema.id;

    // Validate required fields
    if id.is_empty() {
        return Err(SchemaError::MissingField {
            schema_id: "(empty)".to_string(),
            field: "schema.id",
        });
    }
    if def.schema.name.is_empty() {
        return Err(SchemaError::MissingField {
            schema_id: id.clone(),
            field: "schema.name",
        });
    }
    if def.resolution.organization_sentinel.is_empty() {
        return Err(SchemaError::MissingField {
            schema_id: id.clone(),
            field: "resolution.organization_sentinel",
        });
    }
    if def.resolution.model_sentinel.is_empty() {
        return Err(SchemaError::MissingField {
            schema_id: id.clone(),
            field: "resolution.model_sentinel",
        });
    }
    if def.status_tokens.connected.is_empty() {
        return Err(SchemaError::MissingField {
            schema_id: id.clone(),
            field: "status_tokens.connected",
        });
    }
    if def.status_tokens.enabled.is_empty() {
        return Err(SchemaError::MissingField {
            schema_id: id.clone(),
            field: "status_tokens.enabled",
        });
    }

    // Validate candidate-list bounds
    check_candidates(id, "resolution.organization_fields", &def.resolution.organization_fields)?;
    check_candidates(id, "resolution.model_fields", &def.resolution.model_fields)?;
    check_candidates(id, "resolution.status_fields", &def.resolution.status_fields)?;
    if let Some(ref m2m) = def.m2m {
        check_candidates(id, "m2m.id_fields", &m2m.id_fields)?;
    }

    let m2m = def.m2m.map(|m| M2mRules {
        id_fields: m.id_fields,
        rate_plan_field: m.rate_plan_field,
        rate_plan_sentinel: m.rate_plan_sentinel,
        network_field: m.network_field,
        network_sentinel: m.network_sentinel,
        daily_consumption_field: m.daily_consumption_field,
        monthly_consumption_field: m.monthly_consumption_field,
        alarm_field: m.alarm_field,
    });

    let firmware = def.firmware.map(|fw| FirmwareRules {
        info_field: fw.info_field,
        version_key: fw.version_key,
        date_key: fw.date_key,
    });

    Ok(FamilySchema {
        id: id.clone(),
        name: def.schema.name,
        family: def.schema.family,
        version: def.schema.version,
        description: def.schema.description,
        organization_fields: def.resolution.organization_fields,
        organization_sentinel: def.resolution.organization_sentinel,
        model_fields: def.resolution.model_fields,
        model_sentinel: def.resolution.model_sentinel,
        status_fields: def.resolution.status_fields,
        connected_tokens: lowercase_all(def.status_tokens.connected),
        enabled_tokens: lowercase_all(def.status_tokens.enabled),
        table_columns: def.table.columns,
        m2m,
        firmware,
        is_builtin,
    })
}

/// Enforce the candidate-list length bound.
fn check_candidates(
    schema_id: &str,
    field: &'static str,
    candidates: &[String],
) -> Result<(), SchemaError> {
    if candidates.len() > constants::MAX_FIELD_CANDIDATES {
        return Err(SchemaError::TooManyCandidates {
            schema_id: schema_id.to_string(),
            field,
            count: candidates.len(),
            max: constants::MAX_FIELD_CANDIDATES,
        });
    }
    Ok(())
}

fn lowercase_all(tokens: Vec<String>) -> Vec<String> {
    tokens.into_iter().map(|t| t.to_lowercase()).collect()
}

// =============================================================================
// Built-in schemas (embedded at compile time)
// =============================================================================

/// Embedded TOML content for built-in family schemas.
/// Each tuple is (filename, TOML content).
pub fn builtin_schema_sources() -> Vec<(&'static str, &'static str)> {
    vec![
        ("boards.toml", include_str!("../../schemas/boards.toml")),
        ("kiwi.toml", include_str!("../../schemas/kiwi.toml")),
        ("m2m.toml", include_str!("../../schemas/m2m.toml")),
        ("firmware.toml", include_str!("../../schemas/firmware.toml")),
    ]
}

/// Load and validate all built-in schemas.
///
/// Invalid schemas are logged as warnings and skipped (non-fatal).
/// Returns the successfully loaded schemas.
pub fn load_builtin_schemas() -> Vec<FamilySchema> {
    let mut schemas = Vec::new();
    let mut errors = Vec::new();

    for (filename, content) in builtin_schema_sources() {
        let path = PathBuf::from(format!("<builtin>/{filename}"));
        match parse_schema_toml(content, &path)
            .and_then(|def| validate_and_compile(def, &path, true))
        {
            Ok(schema) => {
                tracing::debug!(schema_id = %schema.id, "Loaded built-in schema");
                schemas.push(schema);
            }
            Err(e) => {
                // Built-in schema failures are bugs, but we still degrade gracefully
                tracing::error!(file = filename, error = %e, "Failed to load built-in schema");
                errors.push(e);
            }
        }
    }

    if !errors.is_empty() {
        tracing::warn!(count = errors.len(), "Some built-in schemas failed to load");
    }

    schemas
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Connectivity, Operability};

    const VALID_SCHEMA_TOML: &str = r#"
[schema]
id = "test-family"
name = "Test Family"
family = "boards"
version = "1.0"
description = "A test schema"

[resolution]
organization_fields = ["organization", "final_client"]
organization_sentinel = "Sin Asignar"
model_fields = ["name", "model"]
model_sentinel = "Genérico"
status_fields = ["state", "status"]

[status_tokens]
connected = ["Terminado", "online", "connected", "true"]
enabled = ["terminado", "asignado", "fabricado", "true", "enabled"]

[table]
columns = ["uuid", "name"]
"#;

    #[test]
    fn test_parse_valid_schema() {
        let path = PathBuf::from("test.toml");
        let def = parse_schema_toml(VALID_SCHEMA_TOML, &path).unwrap();
        assert_eq!(def.schema.id, "test-family");
        assert_eq!(def.schema.name, "Test Family");
        assert_eq!(def.resolution.status_fields, vec!["state", "status"]);
    }

    #[test]
    fn test_compile_valid_schema() {
        let path = PathBuf::from("test.toml");
        let def = parse_schema_toml(VALID_SCHEMA_TOML, &path).unwrap();
        let schema = validate_and_compile(def, &path, false).unwrap();

        assert_eq!(schema.id, "test-family");
        assert!(!schema.is_builtin);
        assert_eq!(schema.family, Family::Boards);
        // Token sets are lowercased at compile time.
        assert!(schema.connected_tokens.contains(&"terminado".to_string()));
    }

    #[test]
    fn test_token_classification_case_insensitive() {
        let path = PathBuf::from("test.toml");
        let def = parse_schema_toml(VALID_SCHEMA_TOML, &path).unwrap();
        let schema = validate_and_compile(def, &path, false).unwrap();

        assert_eq!(schema.classify_connectivity("online"), Connectivity::Connected);
        assert_eq!(schema.classify_connectivity("ONLINE"), Connectivity::Connected);
        assert_eq!(schema.classify_connectivity("TERMINADO"), Connectivity::Connected);
        assert_eq!(schema.classify_connectivity("offline"), Connectivity::Disconnected);

        assert_eq!(schema.classify_operability("FABRICADO"), Operability::Enabled);
        assert_eq!(schema.classify_operability("online"), Operability::Disabled);
    }

    #[test]
    fn test_missing_required_field() {
        let toml = r#"
[schema]
id = ""
name = "Empty ID"
family = "kiwi"

[resolution]
organization_sentinel = "Sin Asignar"
model_sentinel = "Genérico"

[status_tokens]
connected = ["true"]
enabled = ["true"]
"#;
        let path = PathBuf::from("bad.toml");
        let def = parse_schema_toml(toml, &path).unwrap();
        let result = validate_and_compile(def, &path, false);
        assert!(result.is_err());
        match result.unwrap_err() {
            SchemaError::MissingField { field, .. } => assert_eq!(field, "schema.id"),
            other => panic!("Expected MissingField, got: {other:?}"),
        }
    }

    #[test]
    fn test_empty_token_set_rejected() {
        let toml = r#"
[schema]
id = "no-tokens"
name = "No Tokens"
family = "kiwi"

[resolution]
organization_sentinel = "Sin Asignar"
model_sentinel = "Genérico"

[status_tokens]
connected = []
enabled = ["true"]
"#;
        let path = PathBuf::from("bad.toml");
        let def = parse_schema_toml(toml, &path).unwrap();
        let result = validate_and_compile(def, &path, false);
        assert!(matches!(
            result.unwrap_err(),
            SchemaError::MissingField {
                field: "status_tokens.connected",
                ..
            }
        ));
    }

    #[test]
    fn test_too_many_candidates() {
        let fields: Vec<String> = (0..constants::MAX_FIELD_CANDIDATES + 1)
            .map(|i| format!("\"f{i}\""))
            .collect();
        let toml = format!(
            r#"
[schema]
id = "wide"
name = "Wide"
family = "boards"

[resolution]
organization_fields = [{}]
organization_sentinel = "Sin Asignar"
model_sentinel = "Genérico"

[status_tokens]
connected = ["true"]
enabled = ["true"]
"#,
            fields.join(", ")
        );
        let path = PathBuf::from("wide.toml");
        let def = parse_schema_toml(&toml, &path).unwrap();
        let result = validate_and_compile(def, &path, false);
        assert!(matches!(
            result.unwrap_err(),
            SchemaError::TooManyCandidates { .. }
        ));
    }

    #[test]
    fn test_load_builtin_schemas() {
        let schemas = load_builtin_schemas();
        // All built-in schemas should load successfully
        assert_eq!(schemas.len(), 4, "expected all built-in schemas to load");
        for family in Family::all() {
            assert!(
                schemas.iter().any(|s| s.id == family.schema_id()),
                "missing built-in schema for {family}"
            );
        }
        // All should be marked as built-in
        assert!(schemas.iter().all(|s| s.is_builtin));
        // The M2M schema must carry its enrichment rules
        let m2m = schemas.iter().find(|s| s.family == Family::M2m).unwrap();
        assert!(m2m.m2m.is_some());
        // The firmware schema must carry its extraction rules
        let fw = schemas.iter().find(|s| s.family == Family::Firmware).unwrap();
        assert!(fw.firmware.is_some());
    }
}
