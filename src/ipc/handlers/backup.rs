use crate::backup::{self, JsonImport};
use crate::context;
use crate::ipc::error::{err, no_workspace, ok, persist_failed};
use crate::ipc::handlers::core::{open_workspace, workspace_summary};
use crate::ipc::helpers::{optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

const BACKUP_DIR: &str = "backups";

/// Drops the session lesson when it no longer exists after a bulk replace.
fn revalidate_session_lesson(state: &mut AppState) {
    let Some(ws) = state.workspace.as_ref() else {
        state.session.lesson_id = None;
        return;
    };
    let topics = ws.store.topics(&state.session.subject, state.session.grade);
    if context::resolve_opt(topics, state.session.lesson()).is_none() {
        state.session.lesson_id = None;
    }
}

fn handle_export_json(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, out_dir) = match (optional_str(req, "subject"), optional_str(req, "outDir")) {
        (Ok(s), Ok(d)) => (s, d),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let Some(ws) = state.workspace.as_ref() else {
        return no_workspace(&req.id);
    };
    if let Some(s) = subject.as_deref() {
        if ws.store.subject(s).is_none() {
            return err(
                &req.id,
                "not_found",
                "subject has no curriculum",
                Some(json!({ "subject": s })),
            );
        }
    }
    let dir = out_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| ws.path.join(BACKUP_DIR));
    match backup::write_json_backup(&dir, ws.store.data(), subject.as_deref()) {
        Ok(path) => ok(
            &req.id,
            json!({
                "path": path.to_string_lossy(),
                "fileName": path.file_name().map(|n| n.to_string_lossy().to_string()),
            }),
        ),
        Err(e) => err(
            &req.id,
            "io_failed",
            format!("{e:#}"),
            Some(json!({ "path": dir.to_string_lossy() })),
        ),
    }
}

fn handle_import_json(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject = match optional_str(req, "subject") {
        Ok(s) => s,
        Err(e) => return e,
    };
    let text = match req.params.get("text").and_then(|v| v.as_str()) {
        Some(t) => t.to_string(),
        None => {
            let in_path = match required_str(req, "inPath") {
                Ok(p) => p,
                Err(_) => return err(&req.id, "bad_params", "missing inPath or text", None),
            };
            match std::fs::read_to_string(&in_path) {
                Ok(t) => t,
                Err(e) => {
                    return err(
                        &req.id,
                        "not_found",
                        e.to_string(),
                        Some(json!({ "path": in_path })),
                    )
                }
            }
        }
    };
    let parsed = match backup::import_json(&text, subject.as_deref()) {
        Ok(p) => p,
        Err(e) => return err(&req.id, "bad_params", format!("{e:#}"), None),
    };
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    let (applied, report) = match parsed {
        JsonImport::Full(data, report) => {
            let subjects: Vec<String> = data.keys().cloned().collect();
            if let Err(e) = ws.store.replace_all(data) {
                return persist_failed(&req.id, &e);
            }
            (subjects, report)
        }
        JsonImport::Subject(name, data, mut report) => {
            let reissued = match ws.store.replace_subject(&name, data) {
                Ok(ids) => ids,
                Err(e) => return persist_failed(&req.id, &e),
            };
            for id in reissued {
                if !report.duplicate_ids.contains(&id) {
                    report.duplicate_ids.push(id);
                }
            }
            (vec![name], report)
        }
    };
    info!(subjects = applied.len(), "backup imported");
    revalidate_session_lesson(state);
    ok(&req.id, json!({ "subjects": applied, "ingest": report }))
}

fn handle_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_str(req, "outPath") {
        Ok(p) => p,
        Err(e) => return e,
    };
    let Some(ws) = state.workspace.as_ref() else {
        return no_workspace(&req.id);
    };
    let out = PathBuf::from(&out_path);
    match backup::export_workspace_bundle(&ws.path, ws.store.data(), &out) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "path": out_path,
                "bundleFormat": summary.bundle_format,
                "entryCount": summary.entry_count,
                "curriculumSha256": summary.curriculum_sha256,
                "dbSha256": summary.db_sha256,
            }),
        ),
        Err(e) => err(
            &req.id,
            "io_failed",
            format!("{e:#}"),
            Some(json!({ "path": out_path })),
        ),
    }
}

fn handle_import_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match required_str(req, "inPath") {
        Ok(p) => p,
        Err(e) => return e,
    };
    let Some(workspace_path) = state.workspace.as_ref().map(|w| w.path.clone()) else {
        return no_workspace(&req.id);
    };
    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }

    // Close the database before its file is replaced.
    state.workspace = None;
    let imported = backup::import_workspace_bundle(&src, &workspace_path);
    let reopened = open_workspace(state, &workspace_path);
    let summary = match imported {
        Ok(s) => s,
        Err(e) => {
            return err(
                &req.id,
                "io_failed",
                format!("{e:#}"),
                Some(json!({ "path": in_path })),
            )
        }
    };
    if let Err(e) = reopened {
        return err(&req.id, "db_open_failed", format!("{e:#}"), None);
    }
    state.session.lesson_id = None;
    match state.workspace.as_ref() {
        Some(ws) => {
            let mut out = workspace_summary(ws);
            out["bundleFormatDetected"] = json!(summary.bundle_format_detected);
            ok(&req.id, out)
        }
        None => err(&req.id, "db_open_failed", "workspace did not reopen", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportJson" => Some(handle_export_json(state, req)),
        "backup.importJson" => Some(handle_import_json(state, req)),
        "backup.exportBundle" => Some(handle_export_bundle(state, req)),
        "backup.importBundle" => Some(handle_import_bundle(state, req)),
        _ => None,
    }
}
