use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How a term combines its session scores into one subject aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationMode {
    WeightedAverage,
    SimpleAverage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: String,
    pub name: String,
    /// Subjects this school offers, in the order report cards list them.
    #[serde(default)]
    pub active_subject_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    /// Curriculum group tag (languages, sciences, humanities, ...).
    #[serde(default)]
    pub group: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub id: String,
    pub school_id: String,
    pub name: String,
    pub year: i32,
    pub calculation_mode: CalculationMode,
    #[serde(default)]
    pub opening_date: Option<NaiveDate>,
    /// Orders terms within a year for trend series.
    #[serde(default)]
    pub closing_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSession {
    pub id: String,
    pub term_id: String,
    pub name: String,
    /// Percentage weight within the term. Meaningful only for
    /// WEIGHTED_AVERAGE terms; informational otherwise.
    #[serde(default)]
    pub weight: f64,
}

/// One recorded score, or an explicit "not yet entered" slot.
/// (studentId, subjectId, examSessionId) is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    pub student_id: String,
    pub subject_id: String,
    pub exam_session_id: String,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub admission_number: String,
    pub name: String,
    pub class_id: String,
    #[serde(default)]
    pub stream: String,
    pub school_id: String,
}
