use serde_json::json;

use crate::store::StoreError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn store_err(id: &str, e: &StoreError) -> serde_json::Value {
    let details = match e {
        StoreError::NameConflict { existing, .. } => Some(json!({ "existingName": existing })),
        StoreError::DuplicateYear { year, .. } => Some(json!({ "year": year })),
        StoreError::UnknownYear(year) | StoreError::ModuleMismatch { year } => {
            Some(json!({ "year": year }))
        }
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}
