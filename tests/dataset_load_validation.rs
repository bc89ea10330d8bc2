
use serde_json::json;
use test_support::{error_code, request, request_err, request_ok, spawn_daemon, temp_dir, write_snapshot};

fn minimal_snapshot() -> serde_json::Value {
    json!({
        "label": "smoke",
        "exportedAt": "2025-08-20T07:30:00Z",
        "schools": [{ "id": "SCH1", "name": "Hillside", "activeSubjectIds": ["ENG"] }],
        "classes": [{ "id": "C1", "name": "Form 2" }],
        "subjects": [{ "id": "ENG", "name": "English" }],
        "terms": [{
            "id": "T1", "schoolId": "SCH1", "name": "Term 1", "year": 2025,
            "calculationMode": "SIMPLE_AVERAGE"
        }],
        "examSessions": [{ "id": "X1", "termId": "T1", "name": "Exam" }],
        "students": [{
            "id": "S1", "admissionNumber": "1001", "name": "Amina",
            "classId": "C1", "schoolId": "SCH1"
        }],
        "marks": [
            { "studentId": "S1", "subjectId": "ENG", "examSessionId": "X1", "score": 64 }
        ]
    })
}

#[test]
fn requests_before_load_are_rejected_and_health_tracks_state() {
    let dir = temp_dir("meritd-load-guard");
    let snapshot_path = write_snapshot(&dir, &minimal_snapshot());
    let (_child, mut stdin, mut reader) = spawn_daemon();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(
        health.get("datasetLoaded").and_then(|v| v.as_bool()),
        Some(false)
    );
    assert!(health
        .get("datasetLabel")
        .map(|v| v.is_null())
        .unwrap_or(false));

    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "report.student",
        json!({ "studentId": "S1", "termId": "T1" }),
    );
    assert_eq!(error_code(&error), "no_dataset");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "dataset.load",
        json!({ "path": snapshot_path.to_string_lossy() }),
    );
    let health = request_ok(&mut stdin, &mut reader, "4", "health", json!({}));
    assert_eq!(
        health.get("datasetLoaded").and_then(|v| v.as_bool()),
        Some(true)
    );
    assert_eq!(
        health.get("datasetLabel").and_then(|v| v.as_str()),
        Some("smoke")
    );
}

#[test]
fn load_rejects_missing_and_unreadable_paths() {
    let (_child, mut stdin, mut reader) = spawn_daemon();

    let error = request_err(&mut stdin, &mut reader, "1", "dataset.load", json!({}));
    assert_eq!(error_code(&error), "bad_params");
    assert_eq!(
        error.get("message").and_then(|v| v.as_str()),
        Some("missing params.path")
    );

    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "dataset.load",
        json!({ "path": "/nonexistent/snapshot.json" }),
    );
    assert_eq!(error_code(&error), "load_failed");
}

#[test]
fn load_surfaces_data_quality_warnings() {
    let dir = temp_dir("meritd-load-warnings");
    let snapshot = json!({
        "schools": [{ "id": "SCH1", "name": "Hillside" }],
        "classes": [{ "id": "C1", "name": "Form 2" }],
        "subjects": [{ "id": "ENG", "name": "English" }],
        "terms": [{
            "id": "T1", "schoolId": "SCH1", "name": "Term 1", "year": 2025,
            "calculationMode": "WEIGHTED_AVERAGE"
        }],
        "examSessions": [
            { "id": "X1", "termId": "T1", "name": "CAT", "weight": 40 },
            { "id": "X2", "termId": "T1", "name": "EndTerm", "weight": 40 }
        ],
        "students": [{
            "id": "S1", "admissionNumber": "1001", "name": "Amina",
            "classId": "C1", "schoolId": "SCH1"
        }],
        "marks": [
            { "studentId": "S1", "subjectId": "ENG", "examSessionId": "X1", "score": 50 },
            // Same cell again; the later row must win.
            { "studentId": "S1", "subjectId": "ENG", "examSessionId": "X1", "score": 60 },
            { "studentId": "GHOST", "subjectId": "ENG", "examSessionId": "X1", "score": 70 },
            { "studentId": "S1", "subjectId": "ENG", "examSessionId": "X2", "score": 130 }
        ]
    });
    let snapshot_path = write_snapshot(&dir, &snapshot);
    let (_child, mut stdin, mut reader) = spawn_daemon();

    let loaded = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "dataset.load",
        json!({ "path": snapshot_path.to_string_lossy() }),
    );
    let warnings: Vec<&str> = loaded
        .get("warnings")
        .and_then(|v| v.as_array())
        .expect("warnings")
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(
        warnings.contains(&"weighted term T1 session weights sum to 80 (expected 100)"),
        "missing weight warning in {:?}",
        warnings
    );
    assert!(
        warnings.contains(&"1 duplicate mark entries (latest occurrence kept)"),
        "missing duplicate warning in {:?}",
        warnings
    );
    assert!(
        warnings.contains(&"1 marks reference unknown students, subjects or sessions"),
        "missing dangling warning in {:?}",
        warnings
    );
    assert!(
        warnings.contains(&"1 mark scores outside 0-100 (clamped during aggregation)"),
        "missing clamp warning in {:?}",
        warnings
    );
    // Four rows collapse to three distinct cells once the duplicate folds in.
    assert_eq!(
        loaded
            .get("counts")
            .and_then(|c| c.get("marks"))
            .and_then(|v| v.as_u64()),
        Some(3)
    );

    // The undersized weights are still used exactly as configured:
    // (60*40 + 130->100*40) / 100 = 64.0.
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "report.student",
        json!({ "studentId": "S1", "termId": "T1" }),
    );
    let first = result
        .get("report")
        .and_then(|r| r.get("results"))
        .and_then(|v| v.as_array())
        .and_then(|a| a.first())
        .expect("subject row");
    assert_eq!(first.get("aggregate").and_then(|v| v.as_f64()), Some(64.0));
}

#[test]
fn grading_override_replaces_the_builtin_scales() {
    let dir = temp_dir("meritd-load-grading");
    let snapshot = json!({
        "schools": [{ "id": "SCH1", "name": "Hillside", "activeSubjectIds": ["ENG", "MAT"] }],
        "classes": [{ "id": "C1", "name": "Form 2" }],
        "subjects": [
            { "id": "ENG", "name": "English" },
            { "id": "MAT", "name": "Mathematics" }
        ],
        "terms": [{
            "id": "T1", "schoolId": "SCH1", "name": "Term 1", "year": 2025,
            "calculationMode": "SIMPLE_AVERAGE"
        }],
        "examSessions": [{ "id": "X1", "termId": "T1", "name": "Exam" }],
        "students": [{
            "id": "S1", "admissionNumber": "1001", "name": "Amina",
            "classId": "C1", "schoolId": "SCH1"
        }],
        "marks": [
            { "studentId": "S1", "subjectId": "ENG", "examSessionId": "X1", "score": 38 },
            { "studentId": "S1", "subjectId": "MAT", "examSessionId": "X1", "score": 38 }
        ],
        "grading": {
            "general": [
                { "min": 40, "grade": "PASS", "points": 2 },
                { "min": 0, "grade": "FAIL", "points": 1 }
            ],
            "scienceMath": [
                { "min": 35, "grade": "PASS", "points": 2 },
                { "min": 0, "grade": "FAIL", "points": 1 }
            ],
            "scienceMathSubjectIds": ["MAT"]
        }
    });
    let snapshot_path = write_snapshot(&dir, &snapshot);
    let (_child, mut stdin, mut reader) = spawn_daemon();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "dataset.load",
        json!({ "path": snapshot_path.to_string_lossy() }),
    );

    let scales = request_ok(&mut stdin, &mut reader, "2", "grading.scales", json!({}));
    let policy = scales.get("policy").expect("policy");
    assert_eq!(
        policy
            .get("general")
            .and_then(|s| s.get("bands"))
            .and_then(|b| b.as_array())
            .map(|b| b.len()),
        Some(2)
    );
    assert_eq!(
        policy
            .get("scienceMathSubjectIds")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1)
    );

    // The same raw score lands differently per scale: 38 fails the general
    // pass mark of 40 but clears the science/math mark of 35.
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "report.student",
        json!({ "studentId": "S1", "termId": "T1" }),
    );
    let report = result.get("report").expect("report");
    let results = report
        .get("results")
        .and_then(|v| v.as_array())
        .expect("results");
    let grade_of = |subject: &str| {
        results
            .iter()
            .find(|r| r.get("subjectId").and_then(|v| v.as_str()) == Some(subject))
            .and_then(|r| r.get("grade"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };
    assert_eq!(grade_of("ENG").as_deref(), Some("FAIL"));
    assert_eq!(grade_of("MAT").as_deref(), Some("PASS"));
    assert_eq!(
        report.get("overallGrade").and_then(|v| v.as_str()),
        Some("FAIL")
    );
}

#[test]
fn invalid_grading_override_fails_the_load() {
    let dir = temp_dir("meritd-load-bad-grading");
    let mut snapshot = minimal_snapshot();
    // A scale without a zero floor leaves low scores gradeless.
    snapshot["grading"] = json!({
        "general": [{ "min": 40, "grade": "PASS", "points": 2 }],
        "scienceMath": [{ "min": 0, "grade": "E", "points": 1 }]
    });
    let snapshot_path = write_snapshot(&dir, &snapshot);
    let (_child, mut stdin, mut reader) = spawn_daemon();

    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "dataset.load",
        json!({ "path": snapshot_path.to_string_lossy() }),
    );
    assert_eq!(error_code(&error), "load_failed");
    let message = error.get("message").and_then(|v| v.as_str()).unwrap_or("");
    assert!(
        message.contains("invalid grading section"),
        "unexpected message: {}",
        message
    );

    // The failed load leaves no dataset behind.
    let health = request_ok(&mut stdin, &mut reader, "2", "health", json!({}));
    assert_eq!(
        health.get("datasetLoaded").and_then(|v| v.as_bool()),
        Some(false)
    );
}

#[test]
fn unknown_methods_return_not_implemented() {
    let (_child, mut stdin, mut reader) = spawn_daemon();
    let value = request(&mut stdin, &mut reader, "9", "marks.write", json!({}));
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false));
    let error = value.get("error").expect("error");
    assert_eq!(error_code(error), "not_implemented");
    assert_eq!(
        error.get("message").and_then(|v| v.as_str()),
        Some("unknown method: marks.write")
    );
}
