mod test_support;

use serde_json::json;
use test_support::{lesson_ids, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn structural_edits_keep_every_surviving_lesson() {
    let workspace = temp_dir("eduplan-structural-edits");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let before = request_ok(&mut stdin, &mut reader, "2", "curriculum.topics", json!({ "grade": 6 }));
    let mut original = lesson_ids(&before["topics"]);
    assert_eq!(original.first().map(String::as_str), Some("6001"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "curriculum.lessons.move",
        json!({ "lessonId": "6001", "direction": 1 }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "curriculum.topics.move",
        json!({ "index": 0, "direction": 1 }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "curriculum.lessons.reorder",
        json!({ "lessonId": "6005", "targetTopicIndex": 3, "targetLessonIndex": 0 }),
    );
    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "curriculum.lessons.delete",
        json!({ "lessonId": "6002" }),
    );
    assert_eq!(deleted["changed"].as_bool(), Some(true));

    let after = request_ok(&mut stdin, &mut reader, "7", "curriculum.topics", json!({ "grade": 6 }));
    let mut remaining = lesson_ids(&after["topics"]);
    original.retain(|id| id != "6002");
    original.sort();
    remaining.sort();
    assert_eq!(remaining, original);

    // Content survives the moves untouched.
    let moved = after["topics"]
        .as_array()
        .expect("topics")
        .iter()
        .flat_map(|t| t["lessons"].as_array().cloned().unwrap_or_default())
        .find(|l| l["id"] == "6001")
        .expect("6001 still present");
    assert_eq!(moved["yccd"].as_array().map(|a| a.len()), Some(3));
    assert_eq!(
        moved["mappings"]["1.1.TC1a"]["type"].as_str(),
        Some("manual")
    );

    // Moving the first topic up is a no-op.
    let noop = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "curriculum.topics.move",
        json!({ "index": 0, "direction": -1 }),
    );
    assert_eq!(noop["changed"].as_bool(), Some(false));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn add_split_merge_follow_the_session_lesson() {
    let workspace = temp_dir("eduplan-split-merge");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.update",
        json!({ "grade": "6", "lessonId": "6001" }),
    );

    let split = request_ok(&mut stdin, &mut reader, "3", "curriculum.lessons.split", json!({}));
    let new_id = split["newLessonId"].as_str().expect("newLessonId").to_string();
    assert!(new_id.parse::<i64>().expect("numeric id") > 9004);

    let ctx = request_ok(&mut stdin, &mut reader, "4", "curriculum.context", json!({}));
    let lesson = &ctx["context"]["lesson"];
    assert_eq!(lesson["title"].as_str(), Some("Bài 1. Thông tin và dữ liệu (Phần 1)"));
    assert_eq!(lesson["yccd"].as_array().map(|a| a.len()), Some(2));
    assert_eq!(lesson["periods"].as_u64(), Some(1));
    assert_eq!(ctx["context"]["canMergeNext"].as_bool(), Some(true));
    assert_eq!(ctx["context"]["canMergePrevious"].as_bool(), Some(false));

    let merged = request_ok(&mut stdin, &mut reader, "5", "curriculum.lessons.mergeNext", json!({}));
    assert_eq!(merged["changed"].as_bool(), Some(true));
    let ctx = request_ok(&mut stdin, &mut reader, "6", "curriculum.context", json!({}));
    let lesson = &ctx["context"]["lesson"];
    assert_eq!(lesson["yccd"].as_array().map(|a| a.len()), Some(3));
    assert_eq!(lesson["periods"].as_u64(), Some(2));

    let added = request_ok(&mut stdin, &mut reader, "7", "curriculum.lessons.add", json!({}));
    let added_id = added["lessonId"].as_str().expect("lessonId").to_string();
    let session = request_ok(&mut stdin, &mut reader, "8", "session.get", json!({}));
    assert_eq!(session["session"]["lessonId"].as_str(), Some(added_id.as_str()));
    let ctx = request_ok(&mut stdin, &mut reader, "9", "curriculum.context", json!({}));
    assert_eq!(ctx["context"]["lesson"]["periods"].as_u64(), Some(2));
    assert_eq!(ctx["context"]["lesson"]["location"].as_str(), Some("Phòng Tin học"));

    let _ = request_ok(&mut stdin, &mut reader, "10", "curriculum.lessons.delete", json!({}));
    let session = request_ok(&mut stdin, &mut reader, "11", "session.get", json!({}));
    assert!(session["session"]["lessonId"].is_null());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn requirement_and_mapping_edits_target_the_active_lesson() {
    let workspace = temp_dir("eduplan-lesson-fields");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.update",
        json!({ "grade": 6, "lessonId": "6002" }),
    );

    let _ = request_ok(&mut stdin, &mut reader, "3", "curriculum.requirements.add", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "curriculum.requirements.set",
        json!({ "index": 2, "text": "Sử dụng được công cụ tìm kiếm" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "curriculum.requirements.delete",
        json!({ "index": 0 }),
    );
    let toggled = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "curriculum.mappings.toggle",
        json!({ "code": "1.2.TC1a" }),
    );
    assert_eq!(toggled["selected"].as_bool(), Some(true));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "curriculum.mappings.reason",
        json!({ "code": "1.2.TC1a", "reason": "HS đánh giá nguồn tin." }),
    );

    let outside = request(
        &mut stdin,
        &mut reader,
        "8",
        "curriculum.mappings.toggle",
        json!({ "code": "1.1.TC2a" }),
    );
    assert_eq!(test_support::error_code(&outside), Some("bad_params"));

    let ctx = request_ok(&mut stdin, &mut reader, "9", "curriculum.context", json!({}));
    let lesson = &ctx["context"]["lesson"];
    assert_eq!(
        lesson["yccd"],
        json!([
            "Giải thích được máy tính là công cụ hiệu quả để thu thập, lưu trữ, xử lí và truyền thông tin",
            "Sử dụng được công cụ tìm kiếm"
        ])
    );
    assert_eq!(lesson["mappings"]["1.2.TC1a"]["reason"].as_str(), Some("HS đánh giá nguồn tin."));
    assert_eq!(lesson["mappings"]["1.2.TC1a"]["type"].as_str(), Some("manual"));

    // 1.2.TC1a is also selected by 6008 in the same grade.
    let row = ctx["context"]["competencies"]
        .as_array()
        .expect("competencies")
        .iter()
        .find(|c| c["code"] == "1.2.TC1a")
        .cloned()
        .expect("registry row");
    let elsewhere = row["usedElsewhere"].as_array().expect("usedElsewhere");
    assert!(elsewhere.iter().any(|u| u["lessonId"] == "6008"));

    let off = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "curriculum.mappings.toggle",
        json!({ "code": "1.2.TC1a", "selected": false }),
    );
    assert_eq!(off["changed"].as_bool(), Some(true));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn bulk_set_and_topic_updates_persist_across_restarts() {
    let workspace = temp_dir("eduplan-bulk-set");
    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "curriculum.lessons.bulkSet",
            json!({ "grade": 7, "field": "equipment", "value": "Máy tính bảng" }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "3",
            "curriculum.topics.update",
            json!({ "grade": 7, "index": 2, "title": "Chủ đề 4. Ứng dụng", "semester": 1 }),
        );
        let toasts = request_ok(&mut stdin, &mut reader, "4", "notifications.list", json!({}));
        let items = toasts["notifications"].as_array().expect("notifications");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["kind"].as_str(), Some("success"));
        assert_eq!(
            items[0]["message"].as_str(),
            Some("Đã áp dụng \"Máy tính bảng\" cho toàn bộ kế hoạch.")
        );

        let bad = request(
            &mut stdin,
            &mut reader,
            "5",
            "curriculum.lessons.bulkSet",
            json!({ "field": "periods", "value": 0 }),
        );
        assert_eq!(test_support::error_code(&bad), Some("bad_params"));

        drop(stdin);
        let _ = child.wait();
    }

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(opened["loadSource"]["kind"].as_str(), Some("stored"));
    let topics = request_ok(&mut stdin, &mut reader, "2", "curriculum.topics", json!({ "grade": 7 }));
    let topics = topics["topics"].as_array().expect("topics");
    assert!(topics
        .iter()
        .flat_map(|t| t["lessons"].as_array().cloned().unwrap_or_default())
        .all(|l| l["equipment"] == "Máy tính bảng"));
    assert_eq!(topics[2]["topic"].as_str(), Some("Chủ đề 4. Ứng dụng"));
    assert_eq!(topics[2]["semester"].as_u64(), Some(1));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
