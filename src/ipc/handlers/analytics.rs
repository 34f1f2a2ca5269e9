use crate::ipc::error::{err, ok};
use crate::ipc::helpers::require_students;
use crate::ipc::types::{AppState, Request};
use crate::report;

fn handle_overview(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_students(state, req, "visualize") {
        return e;
    }
    match serde_json::to_value(report::overview(&state.store)) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.overview" => Some(handle_overview(state, req)),
        _ => None,
    }
}
