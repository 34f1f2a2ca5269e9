use crate::curriculum::{Curriculum, YearModules};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({ "curriculum": state.store.curriculum().years }),
    )
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("curriculum") else {
        return err(&req.id, "bad_params", "missing curriculum", None);
    };
    let years: Vec<YearModules> = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                format!("curriculum must be a list of {{year, modules}}: {e}"),
                None,
            )
        }
    };
    let curriculum = match Curriculum::new(years) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "config_invalid", format!("{e:#}"), None),
    };
    if let Err(in_use) = state.store.set_curriculum(curriculum) {
        return err(
            &req.id,
            "curriculum_in_use",
            "stored students still have marks for removed years",
            Some(json!({ "years": in_use })),
        );
    }

    let saved = match state.workspace.as_ref() {
        Some(ws) => match state.store.curriculum().save(ws) {
            Ok(()) => true,
            Err(e) => return err(&req.id, "config_save_failed", format!("{e:#}"), None),
        },
        None => false,
    };
    ok(
        &req.id,
        json!({
            "curriculum": state.store.curriculum().years,
            "saved": saved,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
