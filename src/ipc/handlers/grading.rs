use crate::grading;
use crate::ipc::error::{ok, store_err};
use crate::ipc::helpers::marks_param;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_grade(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let marks = match marks_param(req) {
        Ok(Ok(m)) => m,
        Ok(Err(e)) => return store_err(&req.id, &e),
        Err(e) => return e,
    };
    let g = grading::grade(&marks);
    ok(
        &req.id,
        json!({
            "average": g.average,
            "averageText": format!("{:.2}", g.average),
            "grade": g.grade,
            "remark": g.remark,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grading.grade" => Some(handle_grade(state, req)),
        _ => None,
    }
}
