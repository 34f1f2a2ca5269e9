use crate::ipc::error::{ok, store_err};
use crate::ipc::helpers::{form_str, required_str, student_json, student_row_json, submission_param};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = state
        .store
        .query_all()
        .iter()
        .map(student_row_json)
        .collect();
    ok(&req.id, json!({ "students": rows }))
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match state.store.get(&id) {
        Ok(r) => ok(&req.id, json!({ "student": student_json(r) })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match form_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match form_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    // Identity problems outrank any problem with the year or marks params.
    let outcome = match store::check_identity(&id, &name) {
        Err(e) => Err(e),
        Ok(()) => match submission_param(state, req) {
            Ok(s) => s.and_then(|s| state.store.submit(&id, &name, s)),
            Err(e) => return e,
        },
    };
    match outcome {
        Ok(outcome) => {
            let student = state.store.get(&id).map(student_json).unwrap_or_default();
            ok(
                &req.id,
                json!({ "outcome": outcome.as_str(), "student": student }),
            )
        }
        Err(e) => {
            tracing::warn!(id = %id, code = e.code(), "submission rejected: {e}");
            store_err(&req.id, &e)
        }
    }
}

fn handle_students_update_year(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let year = match required_str(req, "year") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let submission = match submission_param(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };

    let outcome = state
        .store
        .require_year(&id, &year)
        .map(|_| ())
        .and(submission)
        .and_then(|s| state.store.update_year(&id, s));
    match outcome {
        Ok(outcome) => {
            let student = state.store.get(&id).map(student_json).unwrap_or_default();
            ok(
                &req.id,
                json!({ "outcome": outcome.as_str(), "student": student }),
            )
        }
        Err(e) => {
            tracing::warn!(id = %id, code = e.code(), "year update rejected: {e}");
            store_err(&req.id, &e)
        }
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match state.store.delete(&id) {
        Ok(outcome) => ok(&req.id, json!({ "outcome": outcome.as_str(), "id": id })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    let removed = state.store.clear();
    tracing::info!(removed, "store reset");
    ok(&req.id, json!({ "removedCount": removed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.submit" => Some(handle_students_submit(state, req)),
        "students.updateYear" => Some(handle_students_update_year(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.reset" => Some(handle_students_reset(state, req)),
        _ => None,
    }
}
