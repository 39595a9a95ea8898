use crate::context;
use crate::export::{self, ExportDocument, ViewMode};
use crate::ipc::error::{err, no_workspace, ok};
use crate::ipc::helpers::{grade_param, optional_lesson_id, optional_str, subject_param};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

const EXPORT_DIR: &str = "exports";

/// Renders the requested view (default: the session's) of the addressed grade.
fn render_document(state: &AppState, req: &Request) -> Result<ExportDocument, serde_json::Value> {
    let subject = subject_param(state, req)?;
    let grade = grade_param(state, req)?;
    let view = match optional_str(req, "view")? {
        None => state.session.view_mode,
        Some(raw) => ViewMode::parse(&raw).ok_or_else(|| {
            err(&req.id, "bad_params", "view must be pl1, pl3 or pl4", None)
        })?,
    };
    let Some(ws) = state.workspace.as_ref() else {
        return Err(no_workspace(&req.id));
    };
    let topics = ws.store.topics(&subject, grade);
    let requested = optional_lesson_id(req);
    let lesson_id = requested.as_deref().or_else(|| state.session.lesson());
    let lesson = context::resolve_opt(topics, lesson_id).map(|c| c.lesson);
    Ok(export::render(view, &subject, grade, topics, lesson))
}

fn handle_preview(state: &mut AppState, req: &Request) -> serde_json::Value {
    match render_document(state, req) {
        Ok(doc) => ok(
            &req.id,
            json!({ "view": doc.view, "fileName": doc.file_name, "html": doc.html }),
        ),
        Err(e) => e,
    }
}

fn handle_word(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_dir = match optional_str(req, "outDir") {
        Ok(d) => d,
        Err(e) => return e,
    };
    let doc = match render_document(state, req) {
        Ok(doc) => doc,
        Err(e) => return e,
    };
    let Some(ws) = state.workspace.as_ref() else {
        return no_workspace(&req.id);
    };
    let dir = out_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| ws.path.join(EXPORT_DIR));
    match doc.write_to(&dir) {
        Ok(path) => {
            info!(path = %path.to_string_lossy(), "document exported");
            state.notifications.success("Đã xuất file Word thành công!");
            ok(
                &req.id,
                json!({
                    "view": doc.view,
                    "fileName": doc.file_name,
                    "path": path.to_string_lossy(),
                }),
            )
        }
        Err(e) => {
            state
                .notifications
                .error(format!("Không thể xuất file Word: {e}"));
            err(
                &req.id,
                "io_failed",
                format!("{e:#}"),
                Some(json!({ "path": dir.to_string_lossy() })),
            )
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "export.preview" => Some(handle_preview(state, req)),
        "export.word" => Some(handle_word(state, req)),
        _ => None,
    }
}
