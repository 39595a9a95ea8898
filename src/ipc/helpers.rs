use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::model::Grade;
use serde_json::Value as JsonValue;

pub fn required_str(req: &Request, key: &str) -> Result<String, JsonValue> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Result<Option<String>, JsonValue> {
    match req.params.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Some(_) => Err(err(
            &req.id,
            "bad_params",
            format!("{} must be string or null", key),
            None,
        )),
    }
}

pub fn required_usize(req: &Request, key: &str) -> Result<usize, JsonValue> {
    req.params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be a non-negative integer", key),
                None,
            )
        })
}

pub fn parse_bool(req: &Request, key: &str, default: bool) -> Result<bool, JsonValue> {
    match req.params.get(key) {
        None | Some(JsonValue::Null) => Ok(default),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| err(&req.id, "bad_params", format!("{} must be boolean", key), None)),
    }
}

/// Grade from params (text or number), else the session grade.
pub fn grade_param(state: &AppState, req: &Request) -> Result<Grade, JsonValue> {
    let raw = match req.params.get("grade") {
        None | Some(JsonValue::Null) => return Ok(state.session.grade),
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => n.to_string(),
        Some(_) => return Err(err(&req.id, "bad_params", "grade must be 6, 7, 8 or 9", None)),
    };
    Grade::parse(&raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "grade must be 6, 7, 8 or 9",
            Some(serde_json::json!({ "grade": raw })),
        )
    })
}

/// Subject from params, else the session subject.
pub fn subject_param(state: &AppState, req: &Request) -> Result<String, JsonValue> {
    Ok(optional_str(req, "subject")?.unwrap_or_else(|| state.session.subject.clone()))
}

/// `lessonId` from params, as text or number. Blank text counts as absent.
pub fn optional_lesson_id(req: &Request) -> Option<String> {
    match req.params.get("lessonId") {
        Some(JsonValue::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Lesson id from params, else the session lesson.
pub fn lesson_param(state: &AppState, req: &Request) -> Result<String, JsonValue> {
    optional_lesson_id(req)
        .or_else(|| state.session.lesson_id.clone())
        .ok_or_else(|| err(&req.id, "bad_params", "no lesson selected", None))
}
