// FleetSleuth - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation.
// All errors preserve the causal chain for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all FleetSleuth operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum FleetSleuthError {
    /// API request or authentication failed.
    Api(ApiError),

    /// Family schema loading or validation failed.
    Schema(SchemaError),

    /// Filter operation failed.
    Filter(FilterError),

    /// Export operation failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for FleetSleuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e) => write!(f, "API error: {e}"),
            Self::Schema(e) => write!(f, "Schema error: {e}"),
            Self::Filter(e) => write!(f, "Filter error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for FleetSleuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            Self::Schema(e) => Some(e),
            Self::Filter(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// API errors
// ---------------------------------------------------------------------------

/// Errors from the management-API client.
///
/// Every variant is degraded to an empty table plus a non-fatal warning at
/// the fetch boundary; the normaliser never sees one of these. The typed
/// variants exist so callers can distinguish "no data" from "fetch failed"
/// when they care.
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be sent or the response could not be read.
    Transport {
        url: String,
        source: reqwest::Error,
    },

    /// The server answered with a non-success status code.
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Sign-in was rejected (HTTP 200 but `login` false or token missing).
    AuthRejected,

    /// The response body was not valid JSON.
    MalformedJson {
        url: String,
        source: serde_json::Error,
    },

    /// The response JSON was neither a record list nor an object wrapping
    /// exactly one record list.
    UnexpectedShape { url: String, found: &'static str },

    /// The response body exceeded the maximum accepted size.
    ResponseTooLarge { url: String, limit: u64 },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { url, source } => {
                write!(f, "request to '{url}' failed: {source}")
            }
            Self::Status { url, status } => {
                write!(f, "'{url}' answered {status}")
            }
            Self::AuthRejected => {
                write!(f, "sign-in rejected: check username/password")
            }
            Self::MalformedJson { url, source } => {
                write!(f, "'{url}' returned malformed JSON: {source}")
            }
            Self::UnexpectedShape { url, found } => {
                write!(
                    f,
                    "'{url}' returned {found}, expected a record list or an \
                     object wrapping one list"
                )
            }
            Self::ResponseTooLarge { url, limit } => {
                write!(f, "'{url}' response exceeds maximum of {limit} bytes")
            }
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(source),
            Self::MalformedJson { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ApiError> for FleetSleuthError {
    fn from(e: ApiError) -> Self {
        Self::Api(e)
    }
}

// ---------------------------------------------------------------------------
// Schema errors
// ---------------------------------------------------------------------------

/// Errors related to family schema loading and validation.
#[derive(Debug)]
pub enum SchemaError {
    /// TOML file could not be parsed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Schema file exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// A required field is missing from the schema definition.
    MissingField {
        schema_id: String,
        field: &'static str,
    },

    /// A candidate-field list exceeds the maximum allowed length.
    TooManyCandidates {
        schema_id: String,
        field: &'static str,
        count: usize,
        max: usize,
    },

    /// Duplicate schema ID detected (user schema overriding built-in is OK,
    /// but two user schemas with the same ID is an error).
    DuplicateId {
        id: String,
        path1: PathBuf,
        path2: PathBuf,
    },

    /// Maximum number of schemas exceeded.
    TooManySchemas { count: usize, max: usize },

    /// I/O error reading a schema file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Failed to parse TOML '{}': {source}", path.display())
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "Schema '{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::MissingField { schema_id, field } => {
                write!(f, "Schema '{schema_id}': missing required field '{field}'")
            }
            Self::TooManyCandidates {
                schema_id,
                field,
                count,
                max,
            } => write!(
                f,
                "Schema '{schema_id}': '{field}' lists {count} candidate fields, \
                 exceeds maximum of {max}"
            ),
            Self::DuplicateId { id, path1, path2 } => write!(
                f,
                "Duplicate schema ID '{id}' in '{}' and '{}'",
                path1.display(),
                path2.display()
            ),
            Self::TooManySchemas { count, max } => {
                write!(f, "Too many schemas loaded ({count}), maximum is {max}")
            }
            Self::Io { path, source } => {
                write!(f, "I/O error reading schema '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for SchemaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<SchemaError> for FleetSleuthError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

// ---------------------------------------------------------------------------
// Filter errors
// ---------------------------------------------------------------------------

/// Errors related to filter operations.
#[derive(Debug)]
pub enum FilterError {
    /// User-provided regex is invalid.
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegex { pattern, source } => {
                write!(f, "Invalid filter regex '{pattern}': {source}")
            }
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRegex { source, .. } => Some(source),
        }
    }
}

impl From<FilterError> for FleetSleuthError {
    fn from(e: FilterError) -> Self {
        Self::Filter(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Export would exceed maximum record count.
    TooManyRecords { count: usize, max: usize },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
            Self::TooManyRecords { count, max } => write!(
                f,
                "Export of {count} records exceeds maximum of {max}. \
                 Apply filters to reduce the result set."
            ),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ExportError> for FleetSleuthError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for FleetSleuthError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for FleetSleuth results.
pub type Result<T> = std::result::Result<T, FleetSleuthError>;
