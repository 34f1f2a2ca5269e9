use serde_json::{json, Value};
use std::path::PathBuf;

use crate::grading;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::store::{self, StoreError, StudentRecord, Submission};

pub fn required_str(req: &Request, key: &str) -> Result<String, Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Like `required_str` but keeps an empty value so the store can reject it
/// with its own error kind.
pub fn form_str(req: &Request, key: &str) -> Result<String, Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn required_path(req: &Request, key: &str) -> Result<PathBuf, Value> {
    required_str(req, key).map(PathBuf::from)
}

fn mark_value(v: &Value) -> Result<f64, StoreError> {
    match v {
        Value::Number(n) => store::check_mark(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => store::parse_mark(s),
        Value::Null => Err(StoreError::InvalidMark("empty mark".into())),
        other => Err(StoreError::InvalidMark(format!("{other} is not a number"))),
    }
}

/// Reads `params.marks`, accepting numbers or the raw text of form fields.
pub fn marks_param(req: &Request) -> Result<Result<Vec<f64>, StoreError>, Value> {
    let Some(arr) = req.params.get("marks").and_then(|v| v.as_array()) else {
        return Err(err(&req.id, "bad_params", "marks must be an array", None));
    };
    Ok(arr.iter().map(mark_value).collect())
}

/// Builds a submission from `year`, `marks` and optional `modules`. When
/// `modules` is absent the curriculum's list for the year is used.
pub fn submission_param(
    state: &AppState,
    req: &Request,
) -> Result<Result<Submission, StoreError>, Value> {
    let year = required_str(req, "year")?;
    let marks = match marks_param(req)? {
        Ok(m) => m,
        Err(_) if !state.store.curriculum().contains(&year) => {
            return Ok(Err(StoreError::UnknownYear(year)));
        }
        Err(e) => return Ok(Err(e)),
    };
    let modules = match req.params.get("modules") {
        None | Some(Value::Null) => state
            .store
            .curriculum()
            .modules_for(&year)
            .map(|m| m.to_vec())
            .unwrap_or_default(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(|s| s.to_string()))
            .collect::<Option<Vec<String>>>()
            .ok_or_else(|| err(&req.id, "bad_params", "modules must be strings", None))?,
        Some(_) => {
            return Err(err(&req.id, "bad_params", "modules must be an array", None));
        }
    };
    Ok(Ok(Submission {
        year,
        modules,
        marks,
    }))
}

pub fn student_json(r: &StudentRecord) -> Value {
    let s = r.summary();
    let years: Vec<Value> = r
        .years()
        .iter()
        .map(|y| {
            json!({
                "year": y.year,
                "modules": y.modules,
                "marks": y.marks,
                "average": grading::grade(&y.marks).average,
            })
        })
        .collect();
    json!({
        "id": r.id(),
        "name": r.name(),
        "years": years,
        "markCount": r.mark_count(),
        "average": s.average,
        "averageText": format!("{:.2}", s.average),
        "grade": s.grade,
        "remark": s.remark,
        "yearAverageText": grading::year_average_text(r),
    })
}

pub fn student_row_json(r: &StudentRecord) -> Value {
    let s = r.summary();
    let years: Vec<&str> = r.years().iter().map(|y| y.year.as_str()).collect();
    let year_averages: Vec<Value> = grading::weighted_year_averages(r)
        .into_iter()
        .map(|(year, average)| json!({ "year": year, "average": average }))
        .collect();
    json!({
        "id": r.id(),
        "name": r.name(),
        "years": years,
        "markCount": r.mark_count(),
        "average": s.average,
        "averageText": format!("{:.2}", s.average),
        "grade": s.grade,
        "remark": s.remark,
        "yearAverages": year_averages,
        "yearAverageText": grading::year_average_text(r),
    })
}

/// Report, export and chart methods have nothing to show for an empty store.
pub fn require_students(state: &AppState, req: &Request, what: &str) -> Result<(), Value> {
    if state.store.is_empty() {
        return Err(err(&req.id, "no_data", format!("no students to {what}"), None));
    }
    Ok(())
}
