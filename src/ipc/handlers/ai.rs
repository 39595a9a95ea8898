use crate::ai::{
    apply_suggestions, engine_from_setup, AiAdapter, AiError, AppliedSuggestions, RetryPolicy,
    RewriteRequest, SuggestionEngine, SuggestionRequest,
};
use crate::context;
use crate::edit;
use crate::ipc::error::{err, no_workspace, ok, persist_failed};
use crate::ipc::helpers::{grade_param, lesson_param, required_str, subject_param};
use crate::ipc::types::{AppState, Request};
use crate::setup::AiSetup;
use serde_json::json;
use tracing::warn;

fn ai_failed(state: &mut AppState, req: &Request, e: &AiError) -> serde_json::Value {
    warn!(method = %req.method, "AI request failed: {e}");
    let quota = e.is_quota();
    let message = if quota {
        "AI đang quá tải, vui lòng thử lại sau.".to_string()
    } else {
        format!("Không thể lấy gợi ý từ AI: {e}")
    };
    state.notifications.error(message);
    err(&req.id, "ai_failed", e.to_string(), Some(json!({ "quota": quota })))
}

fn handle_suggest(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade, id) = match (
        subject_param(state, req),
        grade_param(state, req),
        lesson_param(state, req),
    ) {
        (Ok(s), Ok(g), Ok(l)) => (s, g, l),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return e,
    };
    let Some(ws) = state.workspace.as_ref() else {
        return no_workspace(&req.id);
    };
    let Some(ctx) = context::resolve(ws.store.topics(&subject, grade), &id) else {
        return err(&req.id, "not_found", "lesson not found", Some(json!({ "lessonId": id })));
    };
    let request = SuggestionRequest::for_lesson(ctx.lesson, &subject, grade);
    let setup = match AiSetup::load(ws.conn()) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "io_failed", format!("{e:#}"), None),
    };

    let built: Box<dyn SuggestionEngine>;
    let engine: &dyn SuggestionEngine = match state.ai_engine.as_deref() {
        Some(e) => e,
        None => {
            built = engine_from_setup(&setup);
            built.as_ref()
        }
    };
    let sleep = state.sleep;
    let result = AiAdapter::new(engine, RetryPolicy::from_setup(&setup), &sleep).suggest(&request);
    let suggestions = match result {
        Ok(s) => s,
        Err(e) => return ai_failed(state, req, &e),
    };

    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    let mut applied = AppliedSuggestions::default();
    let written = ws.store.edit_lesson(&subject, grade, &id, |lesson| {
        let (next, outcome) = apply_suggestions(lesson, grade, &suggestions);
        applied = outcome;
        (!applied.accepted.is_empty()).then_some(next)
    });
    if let Err(e) = written {
        return persist_failed(&req.id, &e);
    }
    if applied.accepted.is_empty() {
        state
            .notifications
            .info("AI không tìm thấy năng lực số phù hợp cho bài học này.");
    } else {
        state.notifications.success(format!(
            "AI đã gợi ý {} năng lực số cho bài học.",
            applied.accepted.len()
        ));
    }
    ok(
        &req.id,
        json!({
            "suggestions": suggestions,
            "accepted": applied.accepted,
            "discarded": applied.discarded,
        }),
    )
}

fn handle_rewrite_reason(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade, id) = match (
        subject_param(state, req),
        grade_param(state, req),
        lesson_param(state, req),
    ) {
        (Ok(s), Ok(g), Ok(l)) => (s, g, l),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return e,
    };
    let code = match required_str(req, "code") {
        Ok(c) => c,
        Err(e) => return e,
    };
    let Some(ws) = state.workspace.as_ref() else {
        return no_workspace(&req.id);
    };
    let Some(ctx) = context::resolve(ws.store.topics(&subject, grade), &id) else {
        return err(&req.id, "not_found", "lesson not found", Some(json!({ "lessonId": id })));
    };
    let Some(mapping) = ctx.lesson.mappings.get(&code) else {
        return err(
            &req.id,
            "not_found",
            "competency is not mapped to this lesson",
            Some(json!({ "code": code })),
        );
    };
    let request = RewriteRequest {
        context: SuggestionRequest::for_lesson(ctx.lesson, &subject, grade),
        code: code.clone(),
        current_reason: mapping.reason_text().to_string(),
    };
    let setup = match AiSetup::load(ws.conn()) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "io_failed", format!("{e:#}"), None),
    };

    let built: Box<dyn SuggestionEngine>;
    let engine: &dyn SuggestionEngine = match state.ai_engine.as_deref() {
        Some(e) => e,
        None => {
            built = engine_from_setup(&setup);
            built.as_ref()
        }
    };
    let sleep = state.sleep;
    let result =
        AiAdapter::new(engine, RetryPolicy::from_setup(&setup), &sleep).rewrite_reason(&request);
    let reason = match result {
        Ok(r) => r,
        Err(e) => return ai_failed(state, req, &e),
    };

    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    match ws
        .store
        .edit_lesson(&subject, grade, &id, |l| edit::set_suggested_reason(l, &code, &reason))
    {
        Ok(changed) => ok(
            &req.id,
            json!({ "changed": changed, "code": code, "reason": reason }),
        ),
        Err(e) => persist_failed(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "ai.suggest" => Some(handle_suggest(state, req)),
        "ai.rewriteReason" => Some(handle_rewrite_reason(state, req)),
        _ => None,
    }
}
