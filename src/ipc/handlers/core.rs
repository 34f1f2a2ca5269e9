use crate::curriculum::Curriculum;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_path;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "studentCount": state.store.len(),
            "years": state.store.curriculum().year_labels(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_path(req, "path") {
        Ok(p) => p,
        Err(e) => return e,
    };

    if let Err(e) = std::fs::create_dir_all(&path) {
        return err(&req.id, "workspace_open_failed", e.to_string(), None);
    }
    let curriculum = match Curriculum::load_or_init(&path) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "config_invalid", format!("{e:#}"), None),
    };
    if let Err(in_use) = state.store.set_curriculum(curriculum) {
        return err(
            &req.id,
            "curriculum_in_use",
            "workspace curriculum drops years used by loaded students",
            Some(json!({ "years": in_use })),
        );
    }

    tracing::info!(path = %path.display(), "workspace selected");
    state.workspace = Some(path.clone());
    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "curriculum": state.store.curriculum().years,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
