use crate::context;
use crate::edit::{self, BulkField, Direction, LessonPatch};
use crate::ipc::error::{err, no_workspace, ok, persist_failed};
use crate::ipc::helpers::{
    grade_param, lesson_param, optional_str, parse_bool, required_str, required_usize,
    subject_param,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{periods_in_range, Grade, Semester, ANCHOR_SUBJECT, SUBJECTS};
use crate::registry;
use crate::setup::LessonDefaults;
use crate::store::{has_bundled_default, ResetOutcome};
use crate::usage;
use serde_json::json;

fn changed(req: &Request, result: anyhow::Result<bool>) -> serde_json::Value {
    match result {
        Ok(c) => ok(&req.id, json!({ "changed": c })),
        Err(e) => persist_failed(&req.id, &e),
    }
}

fn direction_param(req: &Request) -> Result<Direction, serde_json::Value> {
    req.params
        .get("direction")
        .and_then(|v| v.as_i64())
        .and_then(Direction::from_step)
        .ok_or_else(|| err(&req.id, "bad_params", "direction must be -1 or 1", None))
}

/// Subject, grade and lesson id addressed by a lesson-level request.
fn lesson_target(state: &AppState, req: &Request) -> Result<(String, Grade, String), serde_json::Value> {
    Ok((
        subject_param(state, req)?,
        grade_param(state, req)?,
        lesson_param(state, req)?,
    ))
}

fn handle_subjects(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return no_workspace(&req.id);
    };
    let data = ws.store.data();
    let mut names: Vec<&str> = SUBJECTS.to_vec();
    for extra in data.keys() {
        if !names.contains(&extra.as_str()) {
            names.push(extra.as_str());
        }
    }
    let subjects: Vec<serde_json::Value> = names
        .into_iter()
        .map(|name| {
            let lessons = data
                .get(name)
                .map(|c| c.values().flatten().map(|t| t.lessons.len()).sum::<usize>())
                .unwrap_or(0);
            json!({
                "name": name,
                "lessonCount": lessons,
                "hasDefault": has_bundled_default(name),
            })
        })
        .collect();
    ok(&req.id, json!({ "subjects": subjects }))
}

fn handle_topics(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade) = match (subject_param(state, req), grade_param(state, req)) {
        (Ok(s), Ok(g)) => (s, g),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let Some(ws) = state.workspace.as_ref() else {
        return no_workspace(&req.id);
    };
    ok(
        &req.id,
        json!({
            "subject": subject,
            "grade": grade,
            "topics": ws.store.topics(&subject, grade),
        }),
    )
}

fn handle_context(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return no_workspace(&req.id);
    };
    let session = &state.session;
    let topics = ws.store.topics(&session.subject, session.grade);
    let Some(ctx) = context::resolve_opt(topics, session.lesson()) else {
        return ok(&req.id, json!({ "context": null }));
    };
    let index = usage::build(ws.store.subject(&session.subject), session.grade, session.lesson());
    let competencies: Vec<serde_json::Value> = registry::for_grade(session.grade)
        .iter()
        .map(|c| {
            let mapping = ctx.lesson.mappings.get(c.code);
            json!({
                "code": c.code,
                "text": c.text,
                "mapping": mapping,
                "usedElsewhere": usage::other_uses(&index, c.code),
            })
        })
        .collect();
    let reference = if session.subject != ANCHOR_SUBJECT {
        ws.store.topics(ANCHOR_SUBJECT, session.grade)
    } else {
        &[]
    };
    let id = ctx.lesson.id.as_str();
    ok(
        &req.id,
        json!({
            "context": {
                "topic": ctx.topic.title,
                "topicIndex": ctx.topic_index,
                "lessonIndex": ctx.lesson_index,
                "lesson": ctx.lesson,
                "canMergeNext": edit::can_merge_next(topics, id),
                "canMergePrevious": edit::can_merge_previous(topics, id),
                "competencies": competencies,
                "referenceTopics": reference,
            }
        }),
    )
}

fn handle_lessons_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade) = match (subject_param(state, req), grade_param(state, req)) {
        (Ok(s), Ok(g)) => (s, g),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    let defaults = LessonDefaults::load(ws.conn()).unwrap_or_default();
    match ws.store.add_lesson(&subject, grade, &defaults) {
        Ok(id) => {
            if subject == state.session.subject && grade == state.session.grade {
                state.session.lesson_id = Some(id.to_string());
            }
            ok(&req.id, json!({ "changed": true, "lessonId": id }))
        }
        Err(e) => persist_failed(&req.id, &e),
    }
}

fn handle_lessons_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade, id) = match lesson_target(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    let result = ws.store.delete_lesson(&subject, grade, &id);
    if matches!(result, Ok(true)) && state.session.lesson() == Some(id.as_str()) {
        state.session.lesson_id = None;
    }
    changed(req, result)
}

fn handle_lessons_move(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade, id) = match lesson_target(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let dir = match direction_param(req) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    changed(req, ws.store.move_lesson(&subject, grade, &id, dir))
}

fn handle_lessons_reorder(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade, id) = match lesson_target(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (target_topic, target_lesson) = match (
        required_usize(req, "targetTopicIndex"),
        required_usize(req, "targetLessonIndex"),
    ) {
        (Ok(t), Ok(l)) => (t, l),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    changed(
        req,
        ws.store
            .reorder_lesson(&subject, grade, &id, target_topic, target_lesson),
    )
}

fn handle_lessons_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade, id) = match lesson_target(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let patch: LessonPatch = match req.params.get("patch").cloned().map(serde_json::from_value) {
        Some(Ok(p)) => p,
        Some(Err(e)) => return err(&req.id, "bad_params", format!("invalid patch: {e}"), None),
        None => return err(&req.id, "bad_params", "missing patch", None),
    };
    if let Err(msg) = patch.validate() {
        return err(&req.id, "bad_params", msg, None);
    }
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    changed(req, ws.store.update_lesson(&subject, grade, &id, &patch))
}

fn handle_lessons_split(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade, id) = match lesson_target(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    match ws.store.split_lesson(&subject, grade, &id) {
        Ok(Some(new_id)) => ok(&req.id, json!({ "changed": true, "newLessonId": new_id })),
        Ok(None) => ok(&req.id, json!({ "changed": false })),
        Err(e) => persist_failed(&req.id, &e),
    }
}

fn handle_lessons_merge(state: &mut AppState, req: &Request, next: bool) -> serde_json::Value {
    let (subject, grade, id) = match lesson_target(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    // Merging into the previous lesson keeps that lesson's id.
    let survivor = if next {
        Some(id.clone())
    } else {
        let topics = ws.store.topics(&subject, grade);
        context::locate(topics, &id)
            .and_then(|(ti, li)| li.checked_sub(1).map(|p| topics[ti].lessons[p].id.to_string()))
    };
    let result = if next {
        ws.store.merge_next(&subject, grade, &id)
    } else {
        ws.store.merge_previous(&subject, grade, &id)
    };
    match result {
        Ok(true) => {
            if state.session.lesson() == Some(id.as_str()) {
                state.session.lesson_id = survivor.clone();
            }
            ok(&req.id, json!({ "changed": true, "lessonId": survivor }))
        }
        other => changed(req, other),
    }
}

fn handle_lessons_bulk_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade) = match (subject_param(state, req), grade_param(state, req)) {
        (Ok(s), Ok(g)) => (s, g),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let field = match required_str(req, "field") {
        Ok(f) => f,
        Err(e) => return e,
    };
    let value = req.params.get("value");
    let parsed = match field.as_str() {
        "equipment" => value
            .and_then(|v| v.as_str())
            .map(|s| BulkField::Equipment(s.trim().to_string())),
        "location" => value
            .and_then(|v| v.as_str())
            .map(|s| BulkField::Location(s.trim().to_string())),
        "periods" => value
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| periods_in_range(*n))
            .map(BulkField::Periods),
        _ => {
            return err(
                &req.id,
                "bad_params",
                "field must be one of: equipment, location, periods",
                None,
            )
        }
    };
    let Some(bulk) = parsed else {
        return err(&req.id, "bad_params", "invalid value for field", None);
    };
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    match ws.store.bulk_set(&subject, grade, &bulk) {
        Ok(c) => {
            if c {
                state.notifications.success(format!(
                    "Đã áp dụng \"{}\" cho toàn bộ kế hoạch.",
                    bulk.display_value()
                ));
            }
            ok(&req.id, json!({ "changed": c }))
        }
        Err(e) => persist_failed(&req.id, &e),
    }
}

fn handle_topics_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade) = match (subject_param(state, req), grade_param(state, req)) {
        (Ok(s), Ok(g)) => (s, g),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    match ws.store.add_topic(&subject, grade) {
        Ok(()) => ok(
            &req.id,
            json!({ "changed": true, "topicIndex": ws.store.topics(&subject, grade).len() - 1 }),
        ),
        Err(e) => persist_failed(&req.id, &e),
    }
}

fn handle_topics_move(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade) = match (subject_param(state, req), grade_param(state, req)) {
        (Ok(s), Ok(g)) => (s, g),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let (index, dir) = match (required_usize(req, "index"), direction_param(req)) {
        (Ok(i), Ok(d)) => (i, d),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    changed(req, ws.store.move_topic(&subject, grade, index, dir))
}

fn handle_topics_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade) = match (subject_param(state, req), grade_param(state, req)) {
        (Ok(s), Ok(g)) => (s, g),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let index = match required_usize(req, "index") {
        Ok(i) => i,
        Err(e) => return e,
    };
    let title = match optional_str(req, "title") {
        Ok(t) => t,
        Err(e) => return e,
    };
    let semester = match req.params.get("semester") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => match v.as_u64().and_then(Semester::from_number) {
            Some(s) => Some(s),
            None => return err(&req.id, "bad_params", "semester must be 1 or 2", None),
        },
    };
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    changed(
        req,
        ws.store
            .update_topic(&subject, grade, index, title.as_deref(), semester),
    )
}

fn handle_requirements(state: &mut AppState, req: &Request, op: &str) -> serde_json::Value {
    let (subject, grade, id) = match lesson_target(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let index = match op {
        "add" => 0,
        _ => match required_usize(req, "index") {
            Ok(i) => i,
            Err(e) => return e,
        },
    };
    let text = match op {
        "set" => match req.params.get("text").and_then(|v| v.as_str()) {
            Some(t) => t.to_string(),
            None => return err(&req.id, "bad_params", "missing text", None),
        },
        _ => String::new(),
    };
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    let result = ws.store.edit_lesson(&subject, grade, &id, |lesson| match op {
        "set" => edit::set_requirement(lesson, index, &text),
        "add" => Some(edit::add_requirement(lesson)),
        _ => edit::delete_requirement(lesson, index),
    });
    changed(req, result)
}

fn handle_mappings_toggle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade, id) = match lesson_target(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let code = match required_str(req, "code") {
        Ok(c) => c,
        Err(e) => return e,
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
    let currently = context::resolve(ws.store.topics(&subject, grade), &id)
        .map(|c| c.lesson.mappings.get(&code).is_some_and(|m| m.selected));
    let Some(currently) = currently else {
        return ok(&req.id, json!({ "changed": false }));
    };
    let selected = match parse_bool(req, "selected", !currently) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let result = ws
        .store
        .edit_lesson(&subject, grade, &id, |l| edit::toggle_mapping(l, &code, selected));
    match result {
        Ok(c) => ok(&req.id, json!({ "changed": c, "selected": selected })),
        Err(e) => persist_failed(&req.id, &e),
    }
}

fn handle_mappings_reason(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (subject, grade, id) = match lesson_target(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let code = match required_str(req, "code") {
        Ok(c) => c,
        Err(e) => return e,
    };
    let Some(reason) = req.params.get("reason").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing reason", None);
    };
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    changed(
        req,
        ws.store
            .edit_lesson(&subject, grade, &id, |l| edit::set_reason(l, &code, reason)),
    )
}

fn handle_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject = match subject_param(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let confirmed = match parse_bool(req, "confirm", false) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let Some(ws) = state.workspace.as_mut() else {
        return no_workspace(&req.id);
    };
    match ws.store.reset_subject(&subject, confirmed) {
        Ok(outcome) => {
            match outcome {
                ResetOutcome::NoDefault => {
                    state.notifications.info(format!(
                        "Môn {} chưa có dữ liệu mặc định để khôi phục.",
                        subject
                    ));
                }
                ResetOutcome::Reset => {
                    if state.session.subject == subject {
                        state.session.lesson_id = None;
                    }
                    state
                        .notifications
                        .success(format!("Đã khôi phục dữ liệu mặc định cho môn {}.", subject));
                }
                ResetOutcome::NeedsConfirmation => {}
            }
            ok(
                &req.id,
                json!({ "outcome": outcome, "changed": outcome == ResetOutcome::Reset }),
            )
        }
        Err(e) => persist_failed(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "curriculum.subjects" => Some(handle_subjects(state, req)),
        "curriculum.topics" => Some(handle_topics(state, req)),
        "curriculum.context" => Some(handle_context(state, req)),
        "curriculum.lessons.add" => Some(handle_lessons_add(state, req)),
        "curriculum.lessons.delete" => Some(handle_lessons_delete(state, req)),
        "curriculum.lessons.move" => Some(handle_lessons_move(state, req)),
        "curriculum.lessons.reorder" => Some(handle_lessons_reorder(state, req)),
        "curriculum.lessons.update" => Some(handle_lessons_update(state, req)),
        "curriculum.lessons.split" => Some(handle_lessons_split(state, req)),
        "curriculum.lessons.mergeNext" => Some(handle_lessons_merge(state, req, true)),
        "curriculum.lessons.mergePrevious" => Some(handle_lessons_merge(state, req, false)),
        "curriculum.lessons.bulkSet" => Some(handle_lessons_bulk_set(state, req)),
        "curriculum.topics.add" => Some(handle_topics_add(state, req)),
        "curriculum.topics.move" => Some(handle_topics_move(state, req)),
        "curriculum.topics.update" => Some(handle_topics_update(state, req)),
        "curriculum.requirements.set" => Some(handle_requirements(state, req, "set")),
        "curriculum.requirements.add" => Some(handle_requirements(state, req, "add")),
        "curriculum.requirements.delete" => Some(handle_requirements(state, req, "delete")),
        "curriculum.mappings.toggle" => Some(handle_mappings_toggle(state, req)),
        "curriculum.mappings.reason" => Some(handle_mappings_reason(state, req)),
        "curriculum.reset" => Some(handle_reset(state, req)),
        _ => None,
    }
}
