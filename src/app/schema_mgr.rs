// FleetSleuth - app/schema_mgr.rs
//
// Manages loading of family schemas from both built-in sources
// (embedded in the binary) and user-defined TOML files on disk.
// User schemas override built-in schemas with the same ID.

use crate::core::model::FamilySchema;
use crate::core::schema;
use crate::util::constants;
use crate::util::error::SchemaError;
use std::path::Path;

/// Load all available schemas: built-in first, then user-defined overrides.
///
/// User schemas with the same ID as a built-in schema replace the built-in.
/// Invalid schemas are logged and skipped (non-fatal).
///
/// Returns the merged list and any non-fatal errors encountered.
pub fn load_all_schemas(user_schema_dir: Option<&Path>) -> (Vec<FamilySchema>, Vec<SchemaError>) {
    let mut schemas = schema::load_builtin_schemas();
    let mut errors = Vec::new();

    tracing::info!(builtin_count = schemas.len(), "Loaded built-in schemas");

    // Load user-defined schemas if the directory exists
    if let Some(dir) = user_schema_dir {
        if dir.is_dir() {
            let (user_schemas, user_errors) = load_user_schemas(dir);
            errors.extend(user_errors);

            // Override built-in schemas with matching user schemas
            for user_schema in user_schemas {
                if let Some(pos) = schemas.iter().position(|s| s.id == user_schema.id) {
                    tracing::info!(
                        schema_id = %user_schema.id,
                        "User schema overrides built-in"
                    );
                    schemas[pos] = user_schema;
                } else {
                    tracing::info!(
                        schema_id = %user_schema.id,
                        "Loaded user-defined schema"
                    );
                    schemas.push(user_schema);
                }
            }
        } else {
            tracing::debug!(
                dir = %dir.display(),
                "User schema directory does not exist (skipping)"
            );
        }
    }

    // Enforce maximum schema count
    if schemas.len() > constants::MAX_SCHEMAS {
        tracing::warn!(
            count = schemas.len(),
            max = constants::MAX_SCHEMAS,
            "Too many schemas loaded, truncating"
        );
        errors.push(SchemaError::TooManySchemas {
            count: schemas.len(),
            max: constants::MAX_SCHEMAS,
        });
        schemas.truncate(constants::MAX_SCHEMAS);
    }

    tracing::info!(total = schemas.len(), "Schema loading complete");

    (schemas, errors)
}

/// Load user-defined schemas from a directory.
fn load_user_schemas(dir: &Path) -> (Vec<FamilySchema>, Vec<SchemaError>) {
    let mut schemas = Vec::new();
    let mut errors = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            errors.push(SchemaError::Io {
                path: dir.to_path_buf(),
                source: e,
            });
            return (schemas, errors);
        }
    };

    for entry_result in entries {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                errors.push(SchemaError::Io {
                    path: dir.to_path_buf(),
                    source: e,
                });
                continue;
            }
        };

        let path = entry.path();

        // Only process .toml files
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }

        // Check file size
        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                errors.push(SchemaError::Io {
                    path: path.clone(),
                    source: e,
                });
                continue;
            }
        };

        if metadata.len() > constants::MAX_SCHEMA_FILE_SIZE {
            errors.push(SchemaError::FileTooLarge {
                path: path.clone(),
                size: metadata.len(),
                max_size: constants::MAX_SCHEMA_FILE_SIZE,
            });
            continue;
        }

        // Read and parse the schema
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                errors.push(SchemaError::Io {
                    path: path.clone(),
                    source: e,
                });
                continue;
            }
        };

        match schema::parse_schema_toml(&content, &path)
            .and_then(|def| schema::validate_and_compile(def, &path, false))
        {
            Ok(s) => schemas.push(s),
            Err(e) => errors.push(e),
        }
    }

    (schemas, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Family;
    use tempfile::TempDir;

    #[test]
    fn test_builtins_load_without_user_dir() {
        let (schemas, errors) = load_all_schemas(None);
        assert!(errors.is_empty());
        assert_eq!(schemas.len(), 4);
    }

    #[test]
    fn test_user_schema_overrides_builtin() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("boards.toml"),
            r#"
[schema]
id = "boards"
name = "Custom boards"
family = "boards"

[resolution]
organization_fields = ["customer"]
organization_sentinel = "Nadie"
model_fields = ["device_model"]
model_sentinel = "Desconocido"
status_fields = ["estado"]

[status_tokens]
connected = ["up"]
enabled = ["up", "armed"]
"#,
        )
        .unwrap();

        let (schemas, errors) = load_all_schemas(Some(dir.path()));
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(schemas.len(), 4, "override must replace, not append");

        let boards = schemas.iter().find(|s| s.family == Family::Boards).unwrap();
        assert_eq!(boards.name, "Custom boards");
        assert!(!boards.is_builtin);
        assert_eq!(boards.organization_sentinel, "Nadie");
    }

    #[test]
    fn test_invalid_user_schema_is_skipped_with_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not = valid {{{").unwrap();

        let (schemas, errors) = load_all_schemas(Some(dir.path()));
        assert_eq!(schemas.len(), 4, "builtins must survive a broken user file");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_non_toml_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("readme.txt"), "hello").unwrap();

        let (schemas, errors) = load_all_schemas(Some(dir.path()));
        assert!(errors.is_empty());
        assert_eq!(schemas.len(), 4);
    }
}
