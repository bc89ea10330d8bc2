
use serde_json::json;
use test_support::{error_code, request_err, request_ok, spawn_daemon, temp_dir, write_snapshot};

fn two_term_snapshot() -> serde_json::Value {
    json!({
        "schools": [{
            "id": "SCH1", "name": "Hillside", "activeSubjectIds": ["ENG"]
        }],
        "classes": [{ "id": "C1", "name": "Form 3" }],
        "subjects": [{ "id": "ENG", "name": "English" }],
        "terms": [
            {
                "id": "T1", "schoolId": "SCH1", "name": "Term 1", "year": 2025,
                "calculationMode": "SIMPLE_AVERAGE"
            },
            {
                "id": "T0", "schoolId": "SCH1", "name": "Term 3", "year": 2024,
                "calculationMode": "SIMPLE_AVERAGE"
            }
        ],
        "examSessions": [
            { "id": "X1", "termId": "T1", "name": "Exam" },
            { "id": "X0", "termId": "T0", "name": "Exam" }
        ],
        "students": [
            { "id": "A", "admissionNumber": "1001", "name": "Amina",
              "classId": "C1", "stream": "North", "schoolId": "SCH1" },
            { "id": "B", "admissionNumber": "1002", "name": "Baraka",
              "classId": "C1", "stream": "South", "schoolId": "SCH1" },
            { "id": "C", "admissionNumber": "1003", "name": "Chebet",
              "classId": "C1", "stream": "North", "schoolId": "SCH1" }
        ],
        "marks": [
            // Current term: A leads, then B, then C.
            { "studentId": "A", "subjectId": "ENG", "examSessionId": "X1", "score": 85 },
            { "studentId": "B", "subjectId": "ENG", "examSessionId": "X1", "score": 70 },
            { "studentId": "C", "subjectId": "ENG", "examSessionId": "X1", "score": 50 },
            // Prior term: B led and C sat nothing.
            { "studentId": "A", "subjectId": "ENG", "examSessionId": "X0", "score": 60 },
            { "studentId": "B", "subjectId": "ENG", "examSessionId": "X0", "score": 80 }
        ]
    })
}

fn entry<'a>(entries: &'a [serde_json::Value], student: &str) -> &'a serde_json::Value {
    entries
        .iter()
        .find(|e| e.get("studentId").and_then(|v| v.as_str()) == Some(student))
        .unwrap_or_else(|| panic!("no entry for {}", student))
}

#[test]
fn comparison_term_attaches_prior_rank_and_signed_delta() {
    let dir = temp_dir("meritd-merit-delta");
    let snapshot_path = write_snapshot(&dir, &two_term_snapshot());
    let (_child, mut stdin, mut reader) = spawn_daemon();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "dataset.load",
        json!({ "path": snapshot_path.to_string_lossy() }),
    );
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "merit.list",
        json!({ "classId": "C1", "termId": "T1", "comparisonTermId": "T0" }),
    );
    assert_eq!(
        result
            .get("comparisonTerm")
            .and_then(|t| t.get("id"))
            .and_then(|v| v.as_str()),
        Some("T0")
    );
    let entries = result
        .get("entries")
        .and_then(|v| v.as_array())
        .expect("entries");

    // A climbed from 2 to 1: positive delta.
    let a = entry(entries, "A");
    assert_eq!(a.get("rank").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(a.get("priorRank").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(a.get("rankDelta").and_then(|v| v.as_i64()), Some(1));

    // B slipped from 1 to 2: negative delta.
    let b = entry(entries, "B");
    assert_eq!(b.get("rank").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(b.get("priorRank").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(b.get("rankDelta").and_then(|v| v.as_i64()), Some(-1));

    // C sat nothing last term but was still ranked (last), so the
    // comparison resolves rather than coming back empty.
    let c = entry(entries, "C");
    assert_eq!(c.get("rank").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(c.get("priorRank").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(c.get("rankDelta").and_then(|v| v.as_i64()), Some(0));
}

#[test]
fn without_comparison_term_the_delta_fields_stay_absent() {
    let dir = temp_dir("meritd-merit-no-delta");
    let snapshot_path = write_snapshot(&dir, &two_term_snapshot());
    let (_child, mut stdin, mut reader) = spawn_daemon();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "dataset.load",
        json!({ "path": snapshot_path.to_string_lossy() }),
    );
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "merit.list",
        json!({ "classId": "C1", "termId": "T1" }),
    );
    assert!(result
        .get("comparisonTerm")
        .map(|v| v.is_null())
        .unwrap_or(false));
    let entries = result
        .get("entries")
        .and_then(|v| v.as_array())
        .expect("entries");
    for e in entries {
        assert!(e.get("priorRank").is_none(), "unexpected priorRank: {}", e);
        assert!(e.get("rankDelta").is_none(), "unexpected rankDelta: {}", e);
    }
}

#[test]
fn unknown_comparison_term_is_rejected() {
    let dir = temp_dir("meritd-merit-bad-comparison");
    let snapshot_path = write_snapshot(&dir, &two_term_snapshot());
    let (_child, mut stdin, mut reader) = spawn_daemon();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "dataset.load",
        json!({ "path": snapshot_path.to_string_lossy() }),
    );
    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "merit.list",
        json!({ "classId": "C1", "termId": "T1", "comparisonTermId": "GHOST" }),
    );
    assert_eq!(error_code(&error), "not_found");
    assert_eq!(
        error.get("message").and_then(|v| v.as_str()),
        Some("comparison term not found")
    );
}
