use crate::ipc::error::ok;
use crate::ipc::helpers::require_students;
use crate::ipc::types::{AppState, Request};
use crate::report;
use serde_json::json;

fn handle_student_report(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_students(state, req, "report") {
        return e;
    }
    ok(
        &req.id,
        json!({
            "generatedAt": chrono::Local::now().to_rfc3339(),
            "text": report::student_report(&state.store),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.studentReport" => Some(handle_student_report(state, req)),
        _ => None,
    }
}
