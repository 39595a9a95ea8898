mod test_support;

use serde_json::json;
use test_support::{request_ok, spawn_sidecar, temp_dir};

#[test]
fn reset_without_bundled_default_changes_nothing_and_informs_once() {
    let workspace = temp_dir("eduplan-reset-no-default");
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
        "curriculum.lessons.add",
        json!({ "subject": "Toán", "grade": 6 }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "3", "notifications.list", json!({}));
    let before = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "backup.exportJson",
        json!({ "outDir": workspace.join("before").to_string_lossy() }),
    );

    let reset = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "curriculum.reset",
        json!({ "subject": "Toán", "confirm": true }),
    );
    assert_eq!(reset["outcome"].as_str(), Some("noDefault"));
    assert_eq!(reset["changed"].as_bool(), Some(false));

    let after = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "backup.exportJson",
        json!({ "outDir": workspace.join("after").to_string_lossy() }),
    );
    let read = |v: &serde_json::Value| {
        std::fs::read_to_string(v["path"].as_str().expect("path")).expect("read backup")
    };
    assert_eq!(read(&before), read(&after));

    let toasts = request_ok(&mut stdin, &mut reader, "7", "notifications.list", json!({}));
    let items = toasts["notifications"].as_array().expect("notifications");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["kind"].as_str(), Some("info"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn reset_with_default_needs_confirmation() {
    let workspace = temp_dir("eduplan-reset-default");
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
        "curriculum.lessons.delete",
        json!({ "grade": 9, "lessonId": "9001" }),
    );

    let pending = request_ok(&mut stdin, &mut reader, "3", "curriculum.reset", json!({}));
    assert_eq!(pending["outcome"].as_str(), Some("needsConfirmation"));
    let topics = request_ok(&mut stdin, &mut reader, "4", "curriculum.topics", json!({ "grade": 9 }));
    assert!(!test_support::lesson_ids(&topics["topics"]).contains(&"9001".to_string()));

    let done = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "curriculum.reset",
        json!({ "confirm": true }),
    );
    assert_eq!(done["outcome"].as_str(), Some("reset"));
    let topics = request_ok(&mut stdin, &mut reader, "6", "curriculum.topics", json!({ "grade": 9 }));
    assert!(test_support::lesson_ids(&topics["topics"]).contains(&"9001".to_string()));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
