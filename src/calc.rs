use crate::dataset::Dataset;
use crate::grading::GradingPolicy;
use crate::model::{CalculationMode, Student, Term};
use serde::Serialize;
use std::collections::HashSet;

/// Everything a computation needs, resolved up front by the caller.
/// The engine itself never fails on legitimate data: gaps come back as
/// None fields, not as errors.
#[derive(Clone, Copy)]
pub struct EngineContext<'a> {
    pub data: &'a Dataset,
    pub grading: &'a GradingPolicy,
}

/// 1-decimal display rounding, half away from zero.
pub(crate) fn round_off_1_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn clamp_score(v: f64) -> f64 {
    if !v.is_finite() {
        return 0.0;
    }
    v.clamp(0.0, 100.0)
}

/// Combine one subject's session scores for a term into a single
/// aggregate. None when the term has no sessions or any session score is
/// missing; a subject only counts once every session has a recorded mark.
pub fn aggregate_subject(
    ctx: &EngineContext<'_>,
    student_id: &str,
    subject_id: &str,
    term: &Term,
) -> Option<f64> {
    let sessions = ctx.data.sessions_for_term(&term.id);
    if sessions.is_empty() {
        return None;
    }

    let mut scored: Vec<(f64, f64)> = Vec::with_capacity(sessions.len());
    for es in sessions {
        let raw = ctx.data.score(student_id, subject_id, &es.id)?;
        scored.push((clamp_score(raw), es.weight));
    }

    // Weighted terms are computed exactly as configured; weight sums that
    // miss 100 are a configuration problem reported at load, never
    // silently renormalized here.
    let value = match term.calculation_mode {
        CalculationMode::WeightedAverage => {
            scored.iter().map(|(score, weight)| score * weight).sum::<f64>() / 100.0
        }
        CalculationMode::SimpleAverage => {
            scored.iter().map(|(score, _)| score).sum::<f64>() / scored.len() as f64
        }
    };
    Some(round_off_1_decimal(value))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSubjectResult {
    pub subject_id: String,
    pub subject_name: String,
    pub aggregate: Option<f64>,
    pub grade: Option<String>,
    pub points: Option<u32>,
    pub complete: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub student: Student,
    pub term: Term,
    pub results: Vec<StudentSubjectResult>,
    pub mean_score: Option<f64>,
    pub mean_points: Option<f64>,
    pub overall_grade: Option<String>,
    pub overall_points: Option<u32>,
    pub complete_subjects: usize,
    pub total_subjects: usize,
}

/// Full subject-by-subject report for one student and term. Candidate
/// subjects keep their given order (repeats dropped); incomplete and
/// unknown subjects stay visible as rows with absent metrics. Means and
/// the overall grade cover complete subjects only, and the overall grade
/// always comes off the general scale since the mean spans mixed
/// subjects.
pub fn build_report(
    ctx: &EngineContext<'_>,
    student: &Student,
    term: &Term,
    candidate_subjects: &[String],
) -> StudentReport {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut results: Vec<StudentSubjectResult> = Vec::new();
    for subject_id in candidate_subjects {
        if !seen.insert(subject_id.as_str()) {
            continue;
        }
        let subject_name = ctx
            .data
            .subject(subject_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| subject_id.clone());
        let aggregate = aggregate_subject(ctx, &student.id, subject_id, term);
        let (grade, points) = match aggregate {
            Some(score) => {
                let band = ctx.grading.grade_for(subject_id, score);
                (Some(band.grade.clone()), Some(band.points))
            }
            None => (None, None),
        };
        results.push(StudentSubjectResult {
            subject_id: subject_id.clone(),
            subject_name,
            aggregate,
            grade,
            points,
            complete: aggregate.is_some(),
        });
    }

    let complete: Vec<&StudentSubjectResult> = results.iter().filter(|r| r.complete).collect();
    let (mean_score, mean_points, overall_grade, overall_points) = if complete.is_empty() {
        (None, None, None, None)
    } else {
        let n = complete.len() as f64;
        let mean_score =
            round_off_1_decimal(complete.iter().filter_map(|r| r.aggregate).sum::<f64>() / n);
        let mean_points = round_off_1_decimal(
            complete
                .iter()
                .filter_map(|r| r.points)
                .map(|p| p as f64)
                .sum::<f64>()
                / n,
        );
        let band = ctx.grading.overall_band(mean_score);
        (
            Some(mean_score),
            Some(mean_points),
            Some(band.grade.clone()),
            Some(band.points),
        )
    };

    StudentReport {
        student: student.clone(),
        term: term.clone(),
        complete_subjects: complete.len(),
        total_subjects: results.len(),
        results,
        mean_score,
        mean_points,
        overall_grade,
        overall_points,
    }
}
