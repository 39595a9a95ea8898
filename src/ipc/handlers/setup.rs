use crate::ipc::error::{err, no_workspace, ok};
use crate::ipc::types::{AppState, Request};
use crate::setup::{self, SetupSection};
use serde_json::{json, Map, Value};

/// The stored API key never leaves the sidecar; callers only learn whether one is set.
fn redacted(section: SetupSection, mut value: Value) -> Value {
    if section == SetupSection::Ai {
        if let Some(obj) = value.as_object_mut() {
            let has_key = obj
                .get("apiKey")
                .and_then(|v| v.as_str())
                .is_some_and(|s| !s.is_empty());
            obj.insert("apiKey".into(), Value::Null);
            obj.insert("hasApiKey".into(), Value::Bool(has_key));
        }
    }
    value
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return no_workspace(&req.id);
    };
    let sections: Vec<SetupSection> = match req.params.get("section").and_then(|v| v.as_str()) {
        None => SetupSection::ALL.to_vec(),
        Some(raw) => match SetupSection::parse(raw) {
            Some(s) => vec![s],
            None => return err(&req.id, "bad_params", "unknown section", None),
        },
    };
    let mut out = Map::new();
    for section in sections {
        match setup::load_section(ws.conn(), section) {
            Ok(v) => {
                out.insert(section.name().to_string(), redacted(section, v));
            }
            Err(e) => return err(&req.id, "io_failed", format!("{e:#}"), None),
        }
    }
    ok(&req.id, Value::Object(out))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return no_workspace(&req.id);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let current = match setup::update_section(ws.conn(), section, patch_obj) {
        Ok(Ok(v)) => v,
        Ok(Err(msg)) => return err(&req.id, "bad_params", msg, None),
        Err(e) => return err(&req.id, "persist_failed", format!("{e:#}"), None),
    };
    if section == SetupSection::Notifications {
        if let Some(ms) = current.get("timeoutMs").and_then(|v| v.as_i64()) {
            state.notifications.set_timeout_ms(ms);
        }
    }
    ok(
        &req.id,
        json!({ "section": section.name(), "value": redacted(section, current) }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
