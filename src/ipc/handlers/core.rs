use crate::db::{self, SqliteBlobStore};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::grade_param;
use crate::ipc::types::{AppState, Request, Workspace};
use crate::registry;
use crate::setup;
use crate::store::CurriculumStore;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|w| w.path.to_string_lossy().to_string())
        }),
    )
}

/// Opens the workspace database and loads (or seeds) the curriculum.
pub(crate) fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    let conn = db::open_db(path)?;
    match setup::notification_timeout_ms(&conn) {
        Ok(ms) => state.notifications.set_timeout_ms(ms),
        Err(e) => warn!("notification setup unreadable: {e:#}"),
    }
    let store = CurriculumStore::open(SqliteBlobStore::new(conn));
    info!(workspace = %path.to_string_lossy(), "workspace opened");
    state.workspace = Some(Workspace {
        path: path.to_path_buf(),
        store,
    });
    Ok(())
}

pub(crate) fn workspace_summary(ws: &Workspace) -> serde_json::Value {
    json!({
        "workspacePath": ws.path.to_string_lossy(),
        "loadSource": ws.store.load_source(),
        "ingest": ws.store.ingest_report(),
    })
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    // Release the previous workspace before opening another.
    state.workspace = None;
    if let Err(e) = open_workspace(state, &path) {
        return err(&req.id, "db_open_failed", format!("{e:#}"), None);
    }
    match state.workspace.as_ref() {
        Some(ws) => ok(&req.id, workspace_summary(ws)),
        None => err(&req.id, "db_open_failed", "workspace did not open", None),
    }
}

fn handle_registry_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let grade = match grade_param(state, req) {
        Ok(g) => g,
        Err(e) => return e,
    };
    ok(
        &req.id,
        json!({
            "grade": grade,
            "band": registry::band_name(grade),
            "competencies": registry::for_grade(grade),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "registry.list" => Some(handle_registry_list(state, req)),
        _ => None,
    }
}
