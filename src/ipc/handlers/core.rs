use std::path::PathBuf;

use serde_json::json;
use tracing::info;

use crate::config::SchemaConfig;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::schema;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

/// Builds the schema configuration from the request, rejecting registries
/// that would produce colliding columns, then opens the workspace database
/// and runs the idempotent DDL.
fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let mut config = SchemaConfig::default();
    if let Some(v) = req.params.get("tableName") {
        let Some(name) = v.as_str() else {
            return err(&req.id, "bad_params", "tableName must be a string", None);
        };
        config.table_name = name.to_string();
    }
    if let Some(v) = req.params.get("subjects") {
        let Some(items) = v.as_array() else {
            return err(&req.id, "bad_params", "subjects must be an array", None);
        };
        let mut subjects = Vec::with_capacity(items.len());
        for item in items {
            match item.as_str() {
                Some(s) if !s.trim().is_empty() => subjects.push(s.trim().to_string()),
                _ => {
                    return err(
                        &req.id,
                        "bad_params",
                        "subjects must be non-empty strings",
                        None,
                    )
                }
            }
        }
        config.subjects = subjects;
    }

    if config.subjects.is_empty() {
        return err(&req.id, "bad_params", "subject registry is empty", None);
    }
    if !config.table_name_is_valid() {
        return err(
            &req.id,
            "bad_params",
            format!("table name is not a valid identifier: {:?}", config.table_name),
            None,
        );
    }

    let collisions = schema::collision_groups(&config.subjects);
    if !collisions.is_empty() {
        let detail: Vec<serde_json::Value> = collisions
            .iter()
            .map(|(fragment, subjects)| json!({ "column": fragment, "subjects": subjects }))
            .collect();
        return err(
            &req.id,
            "subject_collision",
            "distinct subjects sanitize to the same column",
            Some(json!({ "collisions": detail })),
        );
    }

    match db::open_db(&path, &config) {
        Ok(conn) => {
            info!(path = %path.display(), table = %config.table_name, "workspace opened");
            let columns = schema::expected_columns(&config.subjects);
            state.workspace = Some(path.clone());
            state.db = Some(conn);
            let result = json!({
                "workspacePath": path.to_string_lossy(),
                "table": config.table_name,
                "subjects": config.subjects,
                "columns": columns,
            });
            state.config = Some(config);
            ok(&req.id, result)
        }
        Err(e) => err(
            &req.id,
            "db_open_failed",
            format!("cannot open workspace at {}: {:#}", path.display(), e),
            None,
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
