use crate::ipc::error::ok;
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use serde_json::json;

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.notifications.expire(Utc::now());
    ok(&req.id, json!({ "notifications": state.notifications.items() }))
}

fn handle_dismiss(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(id) => id,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "dismissed": state.notifications.dismiss(&id) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "notifications.list" => Some(handle_list(state, req)),
        "notifications.dismiss" => Some(handle_dismiss(state, req)),
        _ => None,
    }
}
