use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_students, required_path};
use crate::ipc::types::{AppState, Request};
use crate::records;
use serde_json::json;

fn handle_records_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_path(req, "path") {
        Ok(p) => p,
        Err(e) => return e,
    };
    if let Err(e) = require_students(state, req, "save") {
        return e;
    }
    match records::export_file(&state.store, &path) {
        Ok(count) => ok(
            &req.id,
            json!({ "path": path.to_string_lossy(), "recordCount": count }),
        ),
        Err(e) => err(&req.id, "export_failed", format!("{e:#}"), None),
    }
}

fn handle_records_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_path(req, "path") {
        Ok(p) => p,
        Err(e) => return e,
    };
    match records::import_file(&path, state.store.curriculum()) {
        Ok(store) => {
            state.store = store;
            ok(
                &req.id,
                json!({ "path": path.to_string_lossy(), "recordCount": state.store.len() }),
            )
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "import failed: {e}");
            err(
                &req.id,
                e.code(),
                e.to_string(),
                e.line().map(|line| json!({ "line": line })),
            )
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.export" => Some(handle_records_export(state, req)),
        "records.import" => Some(handle_records_import(state, req)),
        _ => None,
    }
}
