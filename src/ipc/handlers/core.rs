use crate::dataset::Dataset;
use crate::grading::GradingPolicy;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::dataset;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "datasetLoaded": state.dataset.is_some(),
            "datasetLabel": state.dataset.as_ref().and_then(|d| d.label())
        }),
    )
}

fn load_summary(data: &Dataset) -> serde_json::Value {
    json!({
        "label": data.label(),
        "exportedAt": data.exported_at(),
        "counts": data.counts(),
        "warnings": data.warnings()
    })
}

fn handle_dataset_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path");
    };

    match Dataset::load_file(&path) {
        Ok(data) => {
            let summary = load_summary(&data);
            state.dataset = Some(data);
            ok(&req.id, summary)
        }
        Err(e) => err(&req.id, "load_failed", format!("{e:?}")),
    }
}

fn handle_dataset_sample(state: &mut AppState, req: &Request) -> serde_json::Value {
    let data = crate::dataset::sample();
    let summary = load_summary(&data);
    state.dataset = Some(data);
    ok(&req.id, summary)
}

fn handle_dataset_info(state: &mut AppState, req: &Request) -> serde_json::Value {
    let data = match dataset(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let schools = data
        .schools_sorted()
        .into_iter()
        .map(|school| {
            let terms = data
                .terms_for_school(&school.id)
                .into_iter()
                .map(|t| {
                    json!({
                        "id": t.id,
                        "name": t.name,
                        "year": t.year,
                        "calculationMode": t.calculation_mode,
                        "openingDate": t.opening_date,
                        "closingDate": t.closing_date
                    })
                })
                .collect::<Vec<_>>();
            json!({
                "id": school.id,
                "name": school.name,
                "activeSubjectIds": school.active_subject_ids,
                "terms": terms
            })
        })
        .collect::<Vec<_>>();

    ok(
        &req.id,
        json!({
            "label": data.label(),
            "exportedAt": data.exported_at(),
            "counts": data.counts(),
            "warnings": data.warnings(),
            "schools": schools
        }),
    )
}

fn handle_grading_scales(state: &mut AppState, req: &Request) -> serde_json::Value {
    // Before any dataset is loaded this reports the built-in policy.
    match state.dataset.as_ref() {
        Some(d) => ok(&req.id, json!({ "policy": d.policy() })),
        None => ok(&req.id, json!({ "policy": GradingPolicy::knec() })),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "dataset.load" => Some(handle_dataset_load(state, req)),
        "dataset.sample" => Some(handle_dataset_sample(state, req)),
        "dataset.info" => Some(handle_dataset_info(state, req)),
        "grading.scales" => Some(handle_grading_scales(state, req)),
        _ => None,
    }
}
