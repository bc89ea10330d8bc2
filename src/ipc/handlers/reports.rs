use crate::calc::{self, EngineContext, StudentReport};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{dataset, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::merit;
use serde_json::json;

fn handle_report_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let data = match dataset(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let term_id = match required_str(req, "termId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let Some(student) = data.student(&student_id) else {
        return err(&req.id, "not_found", "student not found");
    };
    let Some(term) = data.term(&term_id) else {
        return err(&req.id, "not_found", "term not found");
    };

    let ctx = EngineContext {
        data,
        grading: data.policy(),
    };
    let candidates = data.offered_subjects(&student.school_id);
    let report = calc::build_report(&ctx, student, term, &candidates);
    ok(&req.id, json!({ "report": report }))
}

fn handle_report_class(state: &mut AppState, req: &Request) -> serde_json::Value {
    let data = match dataset(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let term_id = match required_str(req, "termId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let stream = match optional_str(req, "stream") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let Some(class) = data.class(&class_id) else {
        return err(&req.id, "not_found", "class not found");
    };
    let Some(term) = data.term(&term_id) else {
        return err(&req.id, "not_found", "term not found");
    };

    let ctx = EngineContext {
        data,
        grading: data.policy(),
    };
    let mut roster = data.students_in_class(&class_id, stream.as_deref());
    roster.sort_by(|a, b| merit::admission_cmp(a, b));
    let reports: Vec<StudentReport> = roster
        .into_iter()
        .map(|student| {
            let candidates = data.offered_subjects(&student.school_id);
            calc::build_report(&ctx, student, term, &candidates)
        })
        .collect();

    ok(
        &req.id,
        json!({
            "class": class,
            "term": term,
            "stream": stream,
            "reports": reports
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "report.student" => Some(handle_report_student(state, req)),
        "report.class" => Some(handle_report_class(state, req)),
        _ => None,
    }
}
