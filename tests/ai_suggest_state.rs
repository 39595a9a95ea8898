use eduplan::ai::{AiError, RewriteRequest, Suggestion, SuggestionEngine, SuggestionRequest};
use eduplan::ipc::{handle_request, AppState, Request};
use serde_json::{json, Value};
use std::cell::Cell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

static SLEPT_MS: AtomicUsize = AtomicUsize::new(0);

fn record_sleep(d: Duration) {
    SLEPT_MS.fetch_add(d.as_millis() as usize, Ordering::SeqCst);
}

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

/// Fails with a quota error `quota_failures` times, then answers.
struct Scripted {
    quota_failures: Cell<u32>,
}

impl SuggestionEngine for Scripted {
    fn suggest(&self, req: &SuggestionRequest) -> Result<Vec<Suggestion>, AiError> {
        if self.quota_failures.get() > 0 {
            self.quota_failures.set(self.quota_failures.get() - 1);
            return Err(AiError::Http {
                status: 429,
                body: "RESOURCE_EXHAUSTED".to_string(),
            });
        }
        assert_eq!(req.lesson_title, "Bài 1. Thông tin và dữ liệu");
        Ok(vec![
            Suggestion { code: "1.3.TC1a".into(), reason: "HS lưu trữ dữ liệu tìm được.".into() },
            Suggestion { code: "1.1.TC1a".into(), reason: "ghi đè".into() },
            Suggestion { code: "9.9.TC9z".into(), reason: "không tồn tại".into() },
        ])
    }

    fn rewrite_reason(&self, req: &RewriteRequest) -> Result<String, AiError> {
        Ok(format!("{} (đã viết lại)", req.current_reason))
    }
}

fn call(state: &mut AppState, id: &str, method: &str, params: Value) -> Value {
    handle_request(
        state,
        Request {
            id: id.to_string(),
            method: method.to_string(),
            params,
        },
    )
}

fn result(v: Value) -> Value {
    assert_eq!(v["ok"].as_bool(), Some(true), "{v}");
    v["result"].clone()
}

#[test]
fn suggestions_retry_on_quota_and_never_override_manual_mappings() {
    let workspace = temp_dir("eduplan-ai-suggest");
    let mut state = AppState {
        ai_engine: Some(Box::new(Scripted { quota_failures: Cell::new(2) })),
        sleep: record_sleep,
        ..AppState::default()
    };
    result(call(
        &mut state,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    ));
    result(call(&mut state, "2", "session.update", json!({ "lessonId": "6001" })));

    let out = result(call(&mut state, "3", "ai.suggest", json!({})));
    assert_eq!(out["accepted"], json!(["1.3.TC1a"]));
    assert_eq!(out["discarded"], json!(["9.9.TC9z"]));
    // Two retries: 2000 ms then 4000 ms.
    assert_eq!(SLEPT_MS.load(Ordering::SeqCst), 6000);

    let ctx = result(call(&mut state, "4", "curriculum.context", json!({})));
    let mappings = &ctx["context"]["lesson"]["mappings"];
    assert_eq!(mappings["1.3.TC1a"]["type"].as_str(), Some("suggested"));
    assert_eq!(mappings["1.1.TC1a"]["type"].as_str(), Some("manual"));
    assert_eq!(
        mappings["1.1.TC1a"]["reason"].as_str(),
        Some("HS tìm kiếm ví dụ về thông tin và dữ liệu trên Internet.")
    );

    let rewritten = result(call(
        &mut state,
        "5",
        "ai.rewriteReason",
        json!({ "code": "1.1.TC1a" }),
    ));
    assert_eq!(
        rewritten["reason"].as_str(),
        Some("HS tìm kiếm ví dụ về thông tin và dữ liệu trên Internet. (đã viết lại)")
    );
    let ctx = result(call(&mut state, "6", "curriculum.context", json!({})));
    assert_eq!(
        ctx["context"]["lesson"]["mappings"]["1.1.TC1a"]["type"].as_str(),
        Some("suggested")
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn exhausted_retries_surface_as_ai_failed_with_an_error_notification() {
    let workspace = temp_dir("eduplan-ai-quota");
    let mut state = AppState {
        ai_engine: Some(Box::new(Scripted { quota_failures: Cell::new(10) })),
        sleep: |_| {},
        ..AppState::default()
    };
    result(call(
        &mut state,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    ));
    let failed = call(&mut state, "2", "ai.suggest", json!({ "lessonId": "6001", "grade": 6 }));
    assert_eq!(failed["ok"].as_bool(), Some(false));
    assert_eq!(failed["error"]["code"].as_str(), Some("ai_failed"));
    assert_eq!(failed["error"]["details"]["quota"].as_bool(), Some(true));

    let toasts = result(call(&mut state, "3", "notifications.list", json!({})));
    assert_eq!(toasts["notifications"][0]["kind"].as_str(), Some("error"));

    let _ = std::fs::remove_dir_all(workspace);
}
