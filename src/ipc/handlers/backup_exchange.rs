use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_path;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_backup_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_path(req, "outPath") {
        Ok(p) => p,
        Err(e) => return e,
    };
    match backup::export_bundle(&state.store, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "path": out_path.to_string_lossy(),
                "bundleFormat": summary.bundle_format,
                "bundleId": summary.bundle_id.to_string(),
                "entryCount": summary.entry_count,
                "recordCount": summary.record_count,
            }),
        ),
        Err(e) => err(&req.id, "bundle_export_failed", format!("{e:#}"), None),
    }
}

fn handle_backup_import_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match required_path(req, "inPath") {
        Ok(p) => p,
        Err(e) => return e,
    };
    let summary = match backup::import_bundle(&in_path, state.store.curriculum()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(path = %in_path.display(), "bundle import failed: {e:#}");
            return err(&req.id, "bundle_import_failed", format!("{e:#}"), None);
        }
    };

    // A bundled curriculum only persists when a workspace is open.
    if let Some(ws) = state.workspace.as_ref() {
        if summary.store.curriculum() != state.store.curriculum() {
            if let Err(e) = summary.store.curriculum().save(ws) {
                return err(&req.id, "config_save_failed", format!("{e:#}"), None);
            }
        }
    }
    state.store = summary.store;
    ok(
        &req.id,
        json!({
            "bundleFormat": summary.bundle_format_detected,
            "recordCount": state.store.len(),
            "curriculum": state.store.curriculum().years,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportBundle" => Some(handle_backup_export_bundle(state, req)),
        "backup.importBundle" => Some(handle_backup_import_bundle(state, req)),
        _ => None,
    }
}
