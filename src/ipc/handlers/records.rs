use serde_json::json;

use crate::calc;
use crate::config::SchemaConfig;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::require_workspace;
use crate::ipc::types::{AppState, Request};
use crate::schema;

struct HandlerErr {
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl HandlerErr {
    fn bad(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

fn validate_name(raw: &str) -> Result<String, HandlerErr> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(HandlerErr::bad("name must be non-empty"));
    }
    Ok(name.to_string())
}

fn validate_grade(grade: i64) -> Result<i64, HandlerErr> {
    if !(1..=12).contains(&grade) {
        return Err(HandlerErr::bad(format!("grade must be 1-12, got {grade}")));
    }
    Ok(grade)
}

/// Manual entry uppercases the section by convention. CSV import does not.
fn validate_section(raw: &str) -> Result<String, HandlerErr> {
    let section = raw.trim();
    if section.is_empty() {
        return Err(HandlerErr::bad("section must be non-empty"));
    }
    Ok(section.to_uppercase())
}

/// Resolves the marks object against the registry's mark columns: every
/// column must be present with a value in 0..=100, and unknown keys are
/// rejected. Output is in schema descriptor order.
fn validate_marks(
    params: &serde_json::Value,
    config: &SchemaConfig,
) -> Result<Vec<i64>, HandlerErr> {
    let Some(given) = params.get("marks").and_then(|v| v.as_object()) else {
        return Err(HandlerErr::bad("missing params.marks object"));
    };

    let columns = schema::mark_columns(&config.subjects);
    for key in given.keys() {
        if !columns.iter().any(|c| &c.name == key) {
            return Err(HandlerErr {
                code: "bad_params",
                message: format!("unknown mark column: {key}"),
                details: Some(json!({ "column": key })),
            });
        }
    }

    let mut marks = Vec::with_capacity(columns.len());
    for col in &columns {
        let Some(value) = given.get(&col.name) else {
            return Err(HandlerErr {
                code: "bad_params",
                message: format!("missing mark for {} ({} term {})", col.name, col.subject, col.term),
                details: Some(json!({ "column": col.name })),
            });
        };
        let Some(mark) = value.as_i64() else {
            return Err(HandlerErr {
                code: "bad_params",
                message: format!("{} must be a whole number", col.name),
                details: Some(json!({ "column": col.name })),
            });
        };
        if !(0..=100).contains(&mark) {
            return Err(HandlerErr {
                code: "bad_params",
                message: format!("{} must be between 0 and 100, got {}", col.name, mark),
                details: Some(json!({ "column": col.name, "value": mark })),
            });
        }
        marks.push(mark);
    }
    Ok(marks)
}

fn handle_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match require_workspace(state) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "no_workspace", msg, None),
    };

    let parsed: Result<(String, i64, String, Vec<i64>), HandlerErr> = (|| {
        let name = req
            .params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| HandlerErr::bad("missing params.name"))?;
        let grade = req
            .params
            .get("grade")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| HandlerErr::bad("grade must be an integer"))?;
        let section = req
            .params
            .get("section")
            .and_then(|v| v.as_str())
            .ok_or_else(|| HandlerErr::bad("missing params.section"))?;

        Ok((
            validate_name(name)?,
            validate_grade(grade)?,
            validate_section(section)?,
            validate_marks(&req.params, config)?,
        ))
    })();

    let (name, grade, section, marks) = match parsed {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    match db::insert_record(conn, config, &name, grade, &section, &marks) {
        Ok(id) => ok(&req.id, json!({ "id": id })),
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match require_workspace(state) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "no_workspace", msg, None),
    };

    let records = match db::fetch_all(conn, config) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let subject_count = config.subjects.len();
    let rows: Vec<serde_json::Value> = records
        .iter()
        .map(|r| {
            let marks: serde_json::Map<String, serde_json::Value> = r
                .marks
                .iter()
                .map(|(c, m)| (c.name.clone(), json!(m)))
                .collect();
            let t1 = calc::term_total(r, 1);
            let t2 = calc::term_total(r, 2);
            json!({
                "id": r.id,
                "name": r.name,
                "grade": r.grade,
                "section": r.section,
                "marks": marks,
                "term1Total": t1,
                "term1AvgPct": calc::term_average_pct(t1, subject_count),
                "term2Total": t2,
                "term2AvgPct": calc::term_average_pct(t2, subject_count),
            })
        })
        .collect();

    ok(&req.id, json!({ "records": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.add" => Some(handle_add(state, req)),
        "students.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
