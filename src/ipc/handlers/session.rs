use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::session::SessionPatch;
use serde_json::json;

fn session_json(state: &AppState) -> serde_json::Value {
    json!({ "session": state.session })
}

fn handle_session_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, session_json(state))
}

fn handle_session_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let params = if req.params.is_null() {
        json!({})
    } else {
        req.params.clone()
    };
    let patch: SessionPatch = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    state.session.apply(patch);
    ok(&req.id, session_json(state))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.get" => Some(handle_session_get(state, req)),
        "session.update" => Some(handle_session_update(state, req)),
        _ => None,
    }
}
