use crate::calc::EngineContext;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{dataset, required_str};
use crate::ipc::types::{AppState, Request};
use crate::trend;
use serde_json::json;

fn handle_trend_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let data = match dataset(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let Some(student) = data.student(&student_id) else {
        return err(&req.id, "not_found", "student not found");
    };

    let ctx = EngineContext {
        data,
        grading: data.policy(),
    };
    let datapoints = trend::history(&ctx, student);

    ok(
        &req.id,
        json!({
            "student": student,
            "datapoints": datapoints
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "trend.student" => Some(handle_trend_student(state, req)),
        _ => None,
    }
}
