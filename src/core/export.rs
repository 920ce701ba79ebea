// FleetSleuth - core/export.rs
//
// CSV and JSON export of filtered device records, plus the raw-resource
// CSV dump used for API debugging.
// Core layer: writes to any Write trait object.

use crate::core::model::{DeviceRecord, RawRecord};
use crate::util::constants;
use crate::util::error::ExportError;
use std::io::Write;
use std::path::PathBuf;

/// Reject export sets above the named bound before any I/O happens.
fn check_export_size(count: usize) -> Result<(), ExportError> {
    if count > constants::MAX_EXPORT_RECORDS {
        return Err(ExportError::TooManyRecords {
            count,
            max: constants::MAX_EXPORT_RECORDS,
        });
    }
    Ok(())
}

/// Export filtered records to CSV format.
///
/// Writes: organization, model, connectivity, operability, then the
/// family-specific derived columns when present.
pub fn export_csv<W: Write>(
    records: &[DeviceRecord],
    writer: W,
    export_path: &PathBuf,
) -> Result<usize, ExportError> {
    check_export_size(records.len())?;

    let mut csv_writer = csv::Writer::from_writer(writer);

    // Header
    csv_writer
        .write_record([
            "family",
            "organization",
            "model",
            "connectivity",
            "operability",
            "sim_id",
            "rate_plan",
            "network_type",
            "cons_daily_mb",
            "cons_month_mb",
            "firmware_version",
            "compilation_date",
            "update_status",
        ])
        .map_err(|e| ExportError::Csv {
            path: export_path.clone(),
            source: e,
        })?;

    let mut count = 0;
    for record in records {
        let m2m = record.m2m.as_ref();
        let fw = record.firmware.as_ref();

        csv_writer
            .write_record([
                record.family.label(),
                &record.organization,
                &record.model,
                record.connectivity.label(),
                record.operability.label(),
                m2m.map(|m| m.sim_id.as_str()).unwrap_or(""),
                m2m.map(|m| m.rate_plan.as_str()).unwrap_or(""),
                m2m.map(|m| m.network_type.as_str()).unwrap_or(""),
                &m2m.and_then(|m| m.cons_daily_mb)
                    .map(|v| format!("{v:.3}"))
                    .unwrap_or_default(),
                &m2m.and_then(|m| m.cons_month_mb)
                    .map(|v| format!("{v:.3}"))
                    .unwrap_or_default(),
                fw.and_then(|f| f.version.as_deref()).unwrap_or(""),
                &fw.and_then(|f| f.compilation_date)
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                fw.map(|f| f.update_status.label()).unwrap_or(""),
            ])
            .map_err(|e| ExportError::Csv {
                path: export_path.clone(),
                source: e,
            })?;
        count += 1;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.clone(),
        source: e,
    })?;

    Ok(count)
}

/// Export filtered records to JSON format (array of objects).
pub fn export_json<W: Write>(
    records: &[DeviceRecord],
    writer: W,
    export_path: &PathBuf,
) -> Result<usize, ExportError> {
    check_export_size(records.len())?;

    serde_json::to_writer_pretty(writer, records).map_err(|e| ExportError::Json {
        path: export_path.clone(),
        source: e,
    })?;
    Ok(records.len())
}

/// Dump raw resource records to CSV, one column per source field.
///
/// Debug side-effect for inspecting what the API actually returned; not
/// part of the normalisation contract. Columns are the union of the
/// fields of every record, in first-appearance order, so heterogeneous
/// rows all land in the same sheet. Composite values are serialised as
/// compact JSON.
pub fn dump_raw_csv<W: Write>(
    records: &[RawRecord],
    writer: W,
    export_path: &PathBuf,
) -> Result<usize, ExportError> {
    // Nothing fetched: write nothing (csv rejects zero-field records).
    if records.is_empty() {
        return Ok(0);
    }

    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    if columns.is_empty() {
        return Ok(0);
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(&columns)
        .map_err(|e| ExportError::Csv {
            path: export_path.clone(),
            source: e,
        })?;

    let mut count = 0;
    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|col| match record.get(col) {
                None | Some(serde_json::Value::Null) => String::new(),
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect();
        csv_writer.write_record(&row).map_err(|e| ExportError::Csv {
            path: export_path.clone(),
            source: e,
        })?;
        count += 1;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.clone(),
        source: e,
    })?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Connectivity, Family, Operability};

    fn make_record(id: u64, model: &str) -> DeviceRecord {
        DeviceRecord {
            id,
            family: Family::Boards,
            organization: "Acme".to_string(),
            model: model.to_string(),
            connectivity: Connectivity::Connected,
            operability: Operability::Enabled,
            m2m: None,
            firmware: None,
            raw: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_csv_export() {
        let records = vec![make_record(1, "RouterX"), make_record(2, "RouterY")];
        let mut buf = Vec::new();
        let count = export_csv(&records, &mut buf, &PathBuf::from("out.csv")).unwrap();
        assert_eq!(count, 2);

        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("organization,model"));
        assert!(output.contains("RouterX"));
        assert!(output.contains("Conectado"));
        assert!(output.contains("Habilitado"));
    }

    #[test]
    fn test_json_export() {
        let records = vec![make_record(1, "RouterX")];
        let mut buf = Vec::new();
        let count = export_json(&records, &mut buf, &PathBuf::from("out.json")).unwrap();
        assert_eq!(count, 1);

        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("RouterX"));
    }

    #[test]
    fn test_raw_dump_unions_heterogeneous_columns() {
        let a: RawRecord =
            serde_json::from_str(r#"{"name": "one", "state": "online"}"#).unwrap();
        let b: RawRecord =
            serde_json::from_str(r#"{"name": "two", "extra": {"k": 1}}"#).unwrap();

        let mut buf = Vec::new();
        let count = dump_raw_csv(&[a, b], &mut buf, &PathBuf::from("raw.csv")).unwrap();
        assert_eq!(count, 2);

        let output = String::from_utf8(buf).unwrap();
        let mut lines = output.lines();
        // Union header in first-appearance order.
        assert_eq!(lines.next(), Some("name,state,extra"));
        assert_eq!(lines.next(), Some("one,online,"));
        // Composite value serialised as compact JSON (quoted by csv).
        assert!(lines.next().unwrap().contains("two"));
    }

    #[test]
    fn test_raw_dump_empty_input() {
        let mut buf = Vec::new();
        let count = dump_raw_csv(&[], &mut buf, &PathBuf::from("raw.csv")).unwrap();
        assert_eq!(count, 0);
    }
}
