pub mod analytics;
pub mod core;
pub mod import_export;
pub mod records;

use rusqlite::Connection;

use crate::config::SchemaConfig;
use crate::ipc::types::AppState;

/// Both the connection and the schema configuration, or a reason the
/// caller must select a workspace first.
pub fn require_workspace<'a>(
    state: &'a AppState,
) -> Result<(&'a Connection, &'a SchemaConfig), &'static str> {
    match (&state.db, &state.config) {
        (Some(db), Some(config)) => Ok((db, config)),
        _ => Err("no workspace selected; call workspace.select first"),
    }
}
