use crate::calc::{self, EngineContext};
use crate::model::Student;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPerformanceDatapoint {
    pub term_id: String,
    pub term_name: String,
    pub year: i32,
    pub mean_score: Option<f64>,
    pub mean_points: Option<f64>,
    pub overall_grade: Option<String>,
}

/// Term-by-term performance history for one student, oldest term first,
/// covering every term the student's school has defined. Terms with no
/// complete subject still yield a datapoint with absent metrics so chart
/// timelines show the gap instead of skipping it.
pub fn history(ctx: &EngineContext<'_>, student: &Student) -> Vec<StudentPerformanceDatapoint> {
    ctx.data
        .terms_for_school(&student.school_id)
        .into_iter()
        .map(|term| {
            let taken = ctx.data.subjects_taken_in_term(student, term);
            let report = calc::build_report(ctx, student, term, &taken);
            StudentPerformanceDatapoint {
                term_id: term.id.clone(),
                term_name: term.name.clone(),
                year: term.year,
                mean_score: report.mean_score,
                mean_points: report.mean_points,
                overall_grade: report.overall_grade,
            }
        })
        .collect()
}
