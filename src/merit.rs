use crate::calc::{self, EngineContext, StudentReport};
use crate::model::{Student, Term};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeritListEntry {
    pub rank: usize,
    pub student_id: String,
    pub admission_number: String,
    pub student_name: String,
    pub stream: String,
    pub mean_score: Option<f64>,
    pub mean_points: Option<f64>,
    pub overall_grade: Option<String>,
    pub complete_subjects: usize,
    pub total_subjects: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_delta: Option<i64>,
}

/// Merit list for one class and term, optionally narrowed to a stream.
/// Order: mean points descending, then mean score descending, then
/// admission number. Students with nothing complete stay on the list and
/// sort last. Ranks are competition-style: tied students share a rank and
/// the next distinct student resumes numbering at their position.
pub fn rank_class(
    ctx: &EngineContext<'_>,
    term: &Term,
    class_id: &str,
    stream: Option<&str>,
) -> Vec<MeritListEntry> {
    let mut reports: Vec<StudentReport> = ctx
        .data
        .students_in_class(class_id, stream)
        .into_iter()
        .map(|student| {
            let candidates = ctx.data.offered_subjects(&student.school_id);
            calc::build_report(ctx, student, term, &candidates)
        })
        .collect();
    reports.sort_by(merit_order);

    let mut entries: Vec<MeritListEntry> = Vec::with_capacity(reports.len());
    let mut rank = 0usize;
    for (idx, report) in reports.iter().enumerate() {
        let tied_with_previous = idx > 0 && shares_rank(report, &reports[idx - 1]);
        if !tied_with_previous {
            rank = idx + 1;
        }
        entries.push(MeritListEntry {
            rank,
            student_id: report.student.id.clone(),
            admission_number: report.student.admission_number.clone(),
            student_name: report.student.name.clone(),
            stream: report.student.stream.clone(),
            mean_score: report.mean_score,
            mean_points: report.mean_points,
            overall_grade: report.overall_grade.clone(),
            complete_subjects: report.complete_subjects,
            total_subjects: report.total_subjects,
            prior_rank: None,
            rank_delta: None,
        });
    }
    entries
}

/// Fills prior rank and signed delta from a second ranking of the same
/// cohort. Delta is prior minus current, so climbing the list reads
/// positive. Students absent from the prior list keep both fields empty.
pub fn attach_prior_ranks(current: &mut [MeritListEntry], prior: &[MeritListEntry]) {
    let prior_by_student: HashMap<&str, usize> = prior
        .iter()
        .map(|e| (e.student_id.as_str(), e.rank))
        .collect();
    for entry in current.iter_mut() {
        if let Some(&prev) = prior_by_student.get(entry.student_id.as_str()) {
            entry.prior_rank = Some(prev);
            entry.rank_delta = Some(prev as i64 - entry.rank as i64);
        }
    }
}

fn merit_order(a: &StudentReport, b: &StudentReport) -> Ordering {
    cmp_desc(a.mean_points, b.mean_points)
        .then_with(|| cmp_desc(a.mean_score, b.mean_score))
        .then_with(|| admission_cmp(&a.student, &b.student))
}

fn shares_rank(a: &StudentReport, b: &StudentReport) -> bool {
    cmp_desc(a.mean_points, b.mean_points) == Ordering::Equal
        && cmp_desc(a.mean_score, b.mean_score) == Ordering::Equal
}

// Descending on value; students without a value sort after everyone
// with one.
fn cmp_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Admission numbers compare naturally: digit runs by numeric value, the
/// rest byte-wise, ties broken by student id.
pub fn admission_cmp(a: &Student, b: &Student) -> Ordering {
    natural_cmp(&a.admission_number, &b.admission_number).then_with(|| a.id.cmp(&b.id))
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut i = 0;
    let mut j = 0;
    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let run_a = digit_run(a, &mut i);
            let run_b = digit_run(b, &mut j);
            let ord = run_a
                .len()
                .cmp(&run_b.len())
                .then_with(|| run_a.cmp(run_b));
            if ord != Ordering::Equal {
                return ord;
            }
        } else {
            let ord = a[i].cmp(&b[j]);
            if ord != Ordering::Equal {
                return ord;
            }
            i += 1;
            j += 1;
        }
    }
    (a.len() - i).cmp(&(b.len() - j))
}

// Advances past the digit run and returns it without leading zeros
// (keeping at least one digit).
fn digit_run<'a>(s: &'a [u8], pos: &mut usize) -> &'a [u8] {
    let start = *pos;
    while *pos < s.len() && s[*pos].is_ascii_digit() {
        *pos += 1;
    }
    let mut k = start;
    while k + 1 < *pos && s[k] == b'0' {
        k += 1;
    }
    &s[k..*pos]
}
