use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::calc::{self, StudentRecord};
use crate::config::SchemaConfig;
use crate::db;
use crate::schema;

/// Hard failure of a whole import action, before any row is touched.
#[derive(Debug)]
pub struct ImportFailure {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ImportFailure {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub attempted: usize,
    pub inserted: usize,
    pub failures: Vec<RowFailure>,
}

/// Expected columns not present in the dataset header, compared
/// case-insensitively on the incoming side (canonical names are already
/// lowercase). Non-empty means the import must be rejected wholesale.
pub fn missing_columns(header: &[String], subjects: &[String]) -> BTreeSet<String> {
    let actual: BTreeSet<String> = header.iter().map(|h| h.to_lowercase()).collect();
    schema::expected_columns(subjects)
        .into_iter()
        .filter(|c| !actual.contains(c))
        .collect()
}

/// Reads a CSV file and inserts its rows. The whole file is parsed and the
/// header validated before the first insert; after that each row is its own
/// unit of work, so one bad row is skipped and logged, not fatal.
pub fn import_csv(
    conn: &Connection,
    config: &SchemaConfig,
    path: &Path,
) -> Result<ImportOutcome, ImportFailure> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| {
            ImportFailure::new("csv_open_failed", format!("{}: {}", path.display(), e))
        })?;

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| ImportFailure::new("csv_parse_failed", e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if header.is_empty() || header.iter().all(|h| h.is_empty()) {
        return Err(ImportFailure::new(
            "csv_empty",
            format!("{} has no header row", path.display()),
        ));
    }

    let missing = missing_columns(&header, &config.subjects);
    if !missing.is_empty() {
        let names: Vec<&String> = missing.iter().collect();
        return Err(ImportFailure {
            code: "csv_missing_columns",
            message: format!(
                "CSV is missing required columns: {}",
                names
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            details: Some(json!({ "missingColumns": names })),
        });
    }

    // Parse everything up front; a malformed file aborts with zero rows
    // inserted rather than failing partway through the batch.
    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| ImportFailure::new("csv_parse_failed", e.to_string()))?;
        rows.push(record);
    }

    // Positions of the descriptor columns within this file's header.
    // Extra columns are ignored; file order is irrelevant from here on.
    let columns = schema::expected_columns(&config.subjects);
    let mut positions = Vec::with_capacity(columns.len());
    for c in &columns {
        let pos = header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(c))
            .ok_or_else(|| {
                ImportFailure::new("csv_missing_columns", format!("column {} not found", c))
            })?;
        positions.push(pos);
    }

    let mut outcome = ImportOutcome {
        attempted: rows.len(),
        inserted: 0,
        failures: Vec::new(),
    };

    for row in &rows {
        let fields: Vec<&str> = positions.iter().map(|&p| row.get(p).unwrap_or("")).collect();
        let name = fields[0].to_string();
        match insert_row_fields(conn, config, &fields) {
            Ok(()) => outcome.inserted += 1,
            Err(reason) => {
                warn!(name = %name, %reason, "skipping CSV row");
                outcome.failures.push(RowFailure { name, reason });
            }
        }
    }

    Ok(outcome)
}

/// One row's insert, from fields already reordered to descriptor order.
/// Any failure here is attributed to the row and the batch continues.
fn insert_row_fields(
    conn: &Connection,
    config: &SchemaConfig,
    fields: &[&str],
) -> Result<(), String> {
    let name = fields[0];
    if name.is_empty() {
        return Err("name is empty".to_string());
    }
    let grade: i64 = fields[1]
        .parse()
        .map_err(|_| format!("grade is not an integer: {:?}", fields[1]))?;
    let section = fields[2];

    let mut marks = Vec::with_capacity(fields.len() - 3);
    for (field, column) in fields[3..]
        .iter()
        .zip(schema::expected_columns(&config.subjects).into_iter().skip(3))
    {
        let mark: i64 = field
            .parse()
            .map_err(|_| format!("{} is not an integer: {:?}", column, field))?;
        marks.push(mark);
    }

    db::insert_record(conn, config, name, grade, section, &marks)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Serializes retrieved records to a CSV file: every descriptor column plus
/// the two computed term totals, internal id omitted, retrieval order kept.
pub fn export_csv(
    path: &Path,
    config: &SchemaConfig,
    records: &[StudentRecord],
) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = schema::expected_columns(&config.subjects);
    header.push("term1_total".to_string());
    header.push("term2_total".to_string());
    writer.write_record(&header)?;

    for r in records {
        let mut row = vec![r.name.clone(), r.grade.to_string(), r.section.clone()];
        row.extend(r.marks.iter().map(|(_, m)| m.to_string()));
        row.push(calc::term_total(r, 1).to_string());
        row.push(calc::term_total(r, 2).to_string());
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(records.len())
}
