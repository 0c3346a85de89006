use serde_json::json;

use crate::calc;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::require_workspace;
use crate::ipc::types::{AppState, Request};

fn handle_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match require_workspace(state) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "no_workspace", msg, None),
    };

    let records = match db::fetch_all(conn, config) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let summary = calc::summarize(&records, config.subjects.len());
    match serde_json::to_value(&summary) {
        Ok(rows) => ok(
            &req.id,
            json!({
                "maxScorePerTerm": config.subjects.len() * 100,
                "rows": rows,
            }),
        ),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

fn handle_chart_data(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match require_workspace(state) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "no_workspace", msg, None),
    };

    let records = match db::fetch_all(conn, config) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let data = calc::chart_data(&records, config.subjects.len());
    match serde_json::to_value(&data) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.summary" => Some(handle_summary(state, req)),
        "analytics.chartData" => Some(handle_chart_data(state, req)),
        _ => None,
    }
}
