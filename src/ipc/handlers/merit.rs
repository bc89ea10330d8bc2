use crate::calc::EngineContext;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{dataset, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::merit;
use serde_json::json;

fn handle_merit_list(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let comparison_term_id = match optional_str(req, "comparisonTermId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let Some(class) = data.class(&class_id) else {
        return err(&req.id, "not_found", "class not found");
    };
    let Some(term) = data.term(&term_id) else {
        return err(&req.id, "not_found", "term not found");
    };
    let comparison_term = match comparison_term_id.as_deref() {
        Some(id) => match data.term(id) {
            Some(t) => Some(t),
            None => return err(&req.id, "not_found", "comparison term not found"),
        },
        None => None,
    };

    let ctx = EngineContext {
        data,
        grading: data.policy(),
    };
    let mut entries = merit::rank_class(&ctx, term, &class_id, stream.as_deref());
    if let Some(prior_term) = comparison_term {
        let prior = merit::rank_class(&ctx, prior_term, &class_id, stream.as_deref());
        merit::attach_prior_ranks(&mut entries, &prior);
    }

    ok(
        &req.id,
        json!({
            "class": class,
            "term": term,
            "stream": stream,
            "comparisonTerm": comparison_term,
            "entries": entries
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "merit.list" => Some(handle_merit_list(state, req)),
        _ => None,
    }
}
