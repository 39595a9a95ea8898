mod test_support;

use serde_json::json;
use test_support::{error_code, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn json_backup_round_trips_to_a_deep_equal_dataset() {
    let workspace = temp_dir("eduplan-json-backup");
    let other = temp_dir("eduplan-json-restore");
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
        json!({ "subject": "Toán", "grade": 8 }),
    );
    let exported = request_ok(&mut stdin, &mut reader, "3", "backup.exportJson", json!({}));
    assert_eq!(exported["fileName"].as_str(), Some("EduPlan_Backup.json"));
    let path = exported["path"].as_str().expect("path").to_string();
    let original: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "workspace.select",
        json!({ "path": other.to_string_lossy() }),
    );
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "backup.importJson",
        json!({ "inPath": path }),
    );
    assert_eq!(imported["subjects"], json!(["Tin học", "Toán"]));

    let again = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "backup.exportJson",
        json!({ "outDir": other.join("again").to_string_lossy() }),
    );
    let restored: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(again["path"].as_str().expect("path")).expect("read"),
    )
    .expect("json");
    assert_eq!(restored, original);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(other);
}

#[test]
fn per_subject_backup_replaces_only_that_subject() {
    let workspace = temp_dir("eduplan-subject-backup");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let text = json!({
        "6": [{
            "topic": "Chương 1. Số tự nhiên",
            "semester": 1,
            "lessons": [{ "id": 501, "title": "Tập hợp", "yccd": ["Nhận biết tập hợp"], "mappings": {} }]
        }]
    })
    .to_string();
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "backup.importJson",
        json!({ "text": text, "subject": "Toán" }),
    );
    assert_eq!(imported["subjects"], json!(["Toán"]));
    assert_eq!(imported["ingest"]["normalizedIds"].as_u64(), Some(1));

    let toan = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "curriculum.topics",
        json!({ "subject": "Toán", "grade": 6 }),
    );
    assert_eq!(test_support::lesson_ids(&toan["topics"]), vec!["501".to_string()]);
    let tin = request_ok(&mut stdin, &mut reader, "4", "curriculum.topics", json!({ "grade": 6 }));
    assert!(!tin["topics"].as_array().expect("topics").is_empty());

    let missing_subject = request(
        &mut stdin,
        &mut reader,
        "5",
        "backup.importJson",
        json!({ "text": text }),
    );
    assert_eq!(error_code(&missing_subject), Some("bad_params"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn subject_dump_restored_under_another_name_gets_fresh_ids() {
    let workspace = temp_dir("eduplan-subject-rename");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "backup.exportJson",
        json!({ "subject": "Tin học" }),
    );
    let path = exported["path"].as_str().expect("path").to_string();
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "backup.importJson",
        json!({ "inPath": path, "subject": "Toán" }),
    );
    let clashes = imported["ingest"]["duplicateIds"].as_array().expect("duplicate ids");
    assert!(!clashes.is_empty());

    let mut seen = std::collections::HashSet::new();
    let mut total = 0usize;
    for (i, grade) in [6, 7, 8, 9].into_iter().enumerate() {
        for subject in ["Tin học", "Toán"] {
            let topics = request_ok(
                &mut stdin,
                &mut reader,
                &format!("t{i}-{subject}"),
                "curriculum.topics",
                json!({ "subject": subject, "grade": grade }),
            );
            for id in test_support::lesson_ids(&topics["topics"]) {
                total += 1;
                assert!(seen.insert(id.clone()), "lesson id {id} appears twice");
            }
        }
    }
    assert_eq!(total, clashes.len() * 2);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
