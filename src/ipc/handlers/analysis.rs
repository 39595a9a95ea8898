use crate::ipc::error::{err, no_workspace, ok, persist_failed};
use crate::ipc::helpers::{grade_param, optional_lesson_id, required_str, subject_param};
use crate::ipc::types::{AppState, Request};
use crate::matrix;
use crate::model::ANCHOR_SUBJECT;
use crate::registry;
use crate::setup;
use crate::usage;
use serde_json::json;
use tracing::warn;

fn handle_usage_index(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade) = match (subject_param(state, req), grade_param(state, req)) {
        (Ok(s), Ok(g)) => (s, g),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let Some(ws) = state.workspace.as_ref() else {
        return no_workspace(&req.id);
    };
    let requested = optional_lesson_id(req);
    let lesson = requested.as_deref().or_else(|| state.session.lesson());
    let index = usage::build(ws.store.subject(&subject), grade, lesson);
    ok(&req.id, json!({ "subject": subject, "index": index }))
}

fn handle_matrix_analyze(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject = match subject_param(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let Some(ws) = state.workspace.as_ref() else {
        return no_workspace(&req.id);
    };
    let threshold = match req.params.get("threshold") {
        None | Some(serde_json::Value::Null) => setup::matrix_min_coverage(ws.conn()).unwrap_or_else(|e| {
            warn!("matrix setup unreadable: {e:#}");
            1
        }),
        Some(v) => match v.as_u64().and_then(|n| usize::try_from(n).ok()).filter(|n| *n > 0) {
            Some(n) => n,
            None => return err(&req.id, "bad_params", "threshold must be a positive integer", None),
        },
    };
    let grades = matrix::analyze(
        ws.store.subject(&subject),
        ws.store.subject(ANCHOR_SUBJECT),
        threshold,
    );
    ok(
        &req.id,
        json!({
            "subject": subject,
            "anchor": ANCHOR_SUBJECT,
            "threshold": threshold,
            "grades": grades,
        }),
    )
}

fn handle_matrix_add_supplementary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade) = match (subject_param(state, req), grade_param(state, req)) {
        (Ok(s), Ok(g)) => (s, g),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let (title, code) = match (required_str(req, "title"), required_str(req, "code")) {
        (Ok(t), Ok(c)) => (t, c),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    if registry::lookup(grade, &code).is_none() {
        return err(
            &req.id,
            "bad_params",
            format!("{} is not in the {} registry", code, registry::band_name(grade)),
            None,
        );
    }
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    match matrix::add_supplementary_lesson(&mut ws.store, &subject, grade, &title, &code) {
        Ok(id) => {
            state.notifications.success(format!(
                "Đã thêm hoạt động \"{}\" vào Kế hoạch dạy học Lớp {}.",
                title, grade
            ));
            ok(&req.id, json!({ "changed": true, "lessonId": id }))
        }
        Err(e) => persist_failed(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "usage.index" => Some(handle_usage_index(state, req)),
        "matrix.analyze" => Some(handle_matrix_analyze(state, req)),
        "matrix.addSupplementary" => Some(handle_matrix_add_supplementary(state, req)),
        _ => None,
    }
}
