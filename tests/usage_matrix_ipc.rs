mod test_support;

use serde_json::json;
use test_support::{request_ok, spawn_sidecar, temp_dir};

#[test]
fn usage_index_marks_only_the_current_lesson() {
    let workspace = temp_dir("eduplan-usage-index");
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
        json!({ "grade": 6, "lessonId": "6008" }),
    );
    let usage = request_ok(&mut stdin, &mut reader, "3", "usage.index", json!({}));
    let entries = usage["index"]["1.1.TC1a"].as_array().expect("1.1.TC1a entries");
    let ids: Vec<&str> = entries
        .iter()
        .map(|e| e["lessonId"].as_str().expect("lessonId"))
        .collect();
    assert_eq!(ids, vec!["6001", "6008"]);
    let current: Vec<bool> = entries
        .iter()
        .map(|e| e["isCurrent"].as_bool().expect("isCurrent"))
        .collect();
    assert_eq!(current, vec![false, true]);
    assert!(entries.iter().all(|e| e["grade"] == "6"));
    assert!(usage["index"].get("9.9.TC1a").is_none());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn supplementary_lessons_close_a_gap_in_one_topic() {
    let workspace = temp_dir("eduplan-matrix");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let matrix = request_ok(&mut stdin, &mut reader, "2", "matrix.analyze", json!({}));
    assert_eq!(matrix["threshold"].as_u64(), Some(1));
    let seven = &matrix["grades"][1];
    assert_eq!(seven["grade"].as_str(), Some("7"));
    let gap = seven["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .find(|r| r["code"] == "5.3.TC1a")
        .cloned()
        .expect("5.3.TC1a row");
    assert_eq!(gap["status"].as_str(), Some("gap"));

    for (id, title) in [("3", "CLB Robot"), ("4", "Dự án STEM")] {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            id,
            "matrix.addSupplementary",
            json!({ "grade": 7, "title": title, "code": "5.3.TC1a" }),
        );
    }

    let topics = request_ok(&mut stdin, &mut reader, "5", "curriculum.topics", json!({ "grade": 7 }));
    let topics = topics["topics"].as_array().expect("topics");
    assert_eq!(topics.len(), 4);
    let extra = &topics[3];
    assert_eq!(extra["semester"].as_u64(), Some(2));
    let titles: Vec<&str> = extra["lessons"]
        .as_array()
        .expect("lessons")
        .iter()
        .map(|l| l["title"].as_str().expect("title"))
        .collect();
    assert_eq!(titles, vec!["CLB Robot", "Dự án STEM"]);

    let matrix = request_ok(&mut stdin, &mut reader, "6", "matrix.analyze", json!({}));
    let row = matrix["grades"][1]["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .find(|r| r["code"] == "5.3.TC1a")
        .cloned()
        .expect("row");
    assert_eq!(row["status"].as_str(), Some("covered"));
    assert_eq!(row["subjectCount"].as_u64(), Some(2));

    let toasts = request_ok(&mut stdin, &mut reader, "7", "notifications.list", json!({}));
    assert_eq!(
        toasts["notifications"][0]["message"].as_str(),
        Some("Đã thêm hoạt động \"CLB Robot\" vào Kế hoạch dạy học Lớp 7.")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
