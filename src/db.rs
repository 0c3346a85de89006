use std::path::Path;

use anyhow::Context;
use rusqlite::{params_from_iter, types::Value, Connection};

use crate::calc::StudentRecord;
use crate::config::SchemaConfig;
use crate::schema;

/// Opens (creating if needed) the workspace database and runs the
/// idempotent DDL for the configured table. Safe to call on every
/// workspace selection.
pub fn open_db(workspace: &Path, config: &SchemaConfig) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("create workspace dir {}", workspace.display()))?;
    let db_path = workspace.join("gradebook.sqlite3");
    let conn = Connection::open(&db_path)
        .with_context(|| format!("open database {}", db_path.display()))?;

    conn.execute(
        &schema::create_table_sql(&config.table_name, &config.subjects),
        [],
    )
    .with_context(|| format!("create table {}", config.table_name))?;

    Ok(conn)
}

/// Inserts one record. `marks` must be in schema descriptor order (term 1
/// in registry order, then term 2), the same order `expected_columns`
/// yields. Values are bound, never interpolated.
pub fn insert_record(
    conn: &Connection,
    config: &SchemaConfig,
    name: &str,
    grade: i64,
    section: &str,
    marks: &[i64],
) -> anyhow::Result<i64> {
    let columns = schema::expected_columns(&config.subjects);
    anyhow::ensure!(
        marks.len() == columns.len() - schema::FIXED_COLUMNS.len(),
        "expected {} marks, got {}",
        columns.len() - schema::FIXED_COLUMNS.len(),
        marks.len()
    );

    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        config.table_name,
        columns.join(", "),
        placeholders
    );

    let mut values: Vec<Value> = Vec::with_capacity(columns.len());
    values.push(Value::Text(name.to_string()));
    values.push(Value::Integer(grade));
    values.push(Value::Text(section.to_string()));
    values.extend(marks.iter().map(|m| Value::Integer(*m)));

    conn.execute(&sql, params_from_iter(values))?;
    Ok(conn.last_insert_rowid())
}

/// Full-table select in insertion order, each mark paired with its
/// (term, subject) column so downstream aggregation never guesses.
pub fn fetch_all(conn: &Connection, config: &SchemaConfig) -> anyhow::Result<Vec<StudentRecord>> {
    let mark_columns = schema::mark_columns(&config.subjects);
    let mark_names: Vec<String> = mark_columns.iter().map(|c| c.name.clone()).collect();
    let sql = format!(
        "SELECT id, name, grade, section, {} FROM {} ORDER BY id",
        mark_names.join(", "),
        config.table_name
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let mut marks = Vec::with_capacity(mark_columns.len());
        for (i, col) in mark_columns.iter().enumerate() {
            marks.push((col.clone(), row.get::<_, i64>(4 + i)?));
        }
        Ok(StudentRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            grade: row.get(2)?,
            section: row.get(3)?,
            marks,
        })
    })?;

    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_subject_config() -> SchemaConfig {
        SchemaConfig {
            table_name: "students".to_string(),
            subjects: vec!["Physics".to_string(), "Chemistry".to_string()],
        }
    }

    fn open_in_memory(config: &SchemaConfig) -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute(
            &schema::create_table_sql(&config.table_name, &config.subjects),
            [],
        )
        .expect("create table");
        conn
    }

    #[test]
    fn insert_then_fetch_round_trips_in_descriptor_order() {
        let config = two_subject_config();
        let conn = open_in_memory(&config);

        let id =
            insert_record(&conn, &config, "Asha", 9, "A", &[80, 90, 70, 60]).expect("insert");
        assert_eq!(id, 1);

        let records = fetch_all(&conn, &config).expect("fetch");
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.name, "Asha");
        assert_eq!(r.grade, 9);
        assert_eq!(r.section, "A");
        let names: Vec<&str> = r.marks.iter().map(|(c, _)| c.name.as_str()).collect();
        assert_eq!(
            names,
            ["t1_physics", "t1_chemistry", "t2_physics", "t2_chemistry"]
        );
        let values: Vec<i64> = r.marks.iter().map(|(_, m)| *m).collect();
        assert_eq!(values, [80, 90, 70, 60]);
    }

    #[test]
    fn insert_rejects_wrong_mark_count() {
        let config = two_subject_config();
        let conn = open_in_memory(&config);
        let err = insert_record(&conn, &config, "Asha", 9, "A", &[80, 90]);
        assert!(err.is_err());
        assert!(fetch_all(&conn, &config).expect("fetch").is_empty());
    }

    #[test]
    fn fetch_preserves_insertion_order() {
        let config = two_subject_config();
        let conn = open_in_memory(&config);
        insert_record(&conn, &config, "Asha", 9, "A", &[1, 2, 3, 4]).expect("insert");
        insert_record(&conn, &config, "Ben", 10, "B", &[5, 6, 7, 8]).expect("insert");
        let names: Vec<String> = fetch_all(&conn, &config)
            .expect("fetch")
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, ["Asha", "Ben"]);
    }

    #[test]
    fn ddl_is_rerunnable() {
        let config = two_subject_config();
        let conn = open_in_memory(&config);
        insert_record(&conn, &config, "Asha", 9, "A", &[1, 2, 3, 4]).expect("insert");
        // Re-running setup must not clobber existing rows.
        conn.execute(
            &schema::create_table_sql(&config.table_name, &config.subjects),
            [],
        )
        .expect("re-run ddl");
        assert_eq!(fetch_all(&conn, &config).expect("fetch").len(), 1);
    }
}
