use std::path::PathBuf;

use serde_json::json;
use tracing::info;

use crate::db;
use crate::import;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::require_workspace;
use crate::ipc::types::{AppState, Request};

fn param_path(req: &Request) -> Option<PathBuf> {
    req.params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
}

fn handle_import_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match require_workspace(state) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "no_workspace", msg, None),
    };
    let Some(path) = param_path(req) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match import::import_csv(conn, config, &path) {
        Ok(outcome) => {
            info!(
                path = %path.display(),
                attempted = outcome.attempted,
                inserted = outcome.inserted,
                "CSV import finished"
            );
            match serde_json::to_value(&outcome) {
                Ok(v) => ok(&req.id, v),
                Err(e) => err(&req.id, "internal", e.to_string(), None),
            }
        }
        Err(failure) => err(&req.id, failure.code, failure.message, failure.details),
    }
}

fn handle_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, config) = match require_workspace(state) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "no_workspace", msg, None),
    };
    let Some(path) = param_path(req) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let records = match db::fetch_all(conn, config) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    match import::export_csv(&path, config, &records) {
        Ok(exported) => ok(
            &req.id,
            json!({
                "exported": exported,
                "path": path.to_string_lossy(),
            }),
        ),
        Err(e) => err(&req.id, "csv_write_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.importCsv" => Some(handle_import_csv(state, req)),
        "records.exportCsv" => Some(handle_export_csv(state, req)),
        _ => None,
    }
}
