use crate::grading::{GradingConfig, GradingPolicy};
use crate::model::{
    CalculationMode, ExamSession, Mark, School, SchoolClass, Student, Subject, Term,
};
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

/// Raw on-disk form of a dataset snapshot. Collections may be omitted;
/// referential problems surface as load warnings, not parse errors.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub schools: Vec<School>,
    #[serde(default)]
    pub classes: Vec<SchoolClass>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub terms: Vec<Term>,
    #[serde(default)]
    pub exam_sessions: Vec<ExamSession>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub marks: Vec<Mark>,
    #[serde(default)]
    pub grading: Option<GradingConfig>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetCounts {
    pub schools: usize,
    pub classes: usize,
    pub subjects: usize,
    pub terms: usize,
    pub exam_sessions: usize,
    pub students: usize,
    pub marks: usize,
}

/// Read-only, index-backed view over one loaded snapshot. All engine
/// computation runs against this; nothing here mutates after load.
pub struct Dataset {
    label: Option<String>,
    exported_at: Option<DateTime<Utc>>,
    schools: HashMap<String, School>,
    classes: HashMap<String, SchoolClass>,
    subjects: HashMap<String, Subject>,
    terms: HashMap<String, Term>,
    sessions_by_term: HashMap<String, Vec<ExamSession>>,
    students: HashMap<String, Student>,
    class_rosters: HashMap<String, Vec<String>>,
    scores: HashMap<(String, String, String), Option<f64>>,
    policy: GradingPolicy,
    counts: DatasetCounts,
    warnings: Vec<String>,
}

impl Dataset {
    pub fn load_file(path: &Path) -> anyhow::Result<Dataset> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&text)
            .with_context(|| format!("parse snapshot {}", path.display()))?;
        Dataset::from_snapshot(snapshot)
    }

    pub fn from_snapshot(snapshot: Snapshot) -> anyhow::Result<Dataset> {
        let policy = match snapshot.grading {
            Some(cfg) => GradingPolicy::from_config(cfg).context("invalid grading section")?,
            None => GradingPolicy::knec(),
        };

        let mut warnings: Vec<String> = Vec::new();

        let mut schools: HashMap<String, School> = HashMap::new();
        for s in snapshot.schools {
            if schools.insert(s.id.clone(), s).is_some() {
                warnings.push("duplicate school id in snapshot (latest kept)".to_string());
            }
        }
        let mut classes: HashMap<String, SchoolClass> = HashMap::new();
        for c in snapshot.classes {
            if classes.insert(c.id.clone(), c).is_some() {
                warnings.push("duplicate class id in snapshot (latest kept)".to_string());
            }
        }
        let mut subjects: HashMap<String, Subject> = HashMap::new();
        for s in snapshot.subjects {
            if subjects.insert(s.id.clone(), s).is_some() {
                warnings.push("duplicate subject id in snapshot (latest kept)".to_string());
            }
        }
        let mut terms: HashMap<String, Term> = HashMap::new();
        for t in snapshot.terms {
            if !schools.is_empty() && !schools.contains_key(&t.school_id) {
                warnings.push(format!("term {} references unknown school {}", t.id, t.school_id));
            }
            if terms.insert(t.id.clone(), t).is_some() {
                warnings.push("duplicate term id in snapshot (latest kept)".to_string());
            }
        }

        let session_total = snapshot.exam_sessions.len();
        let mut session_terms: HashMap<String, String> = HashMap::new();
        let mut sessions_by_term: HashMap<String, Vec<ExamSession>> = HashMap::new();
        for es in snapshot.exam_sessions {
            if !terms.contains_key(&es.term_id) {
                warnings.push(format!(
                    "exam session {} references unknown term {}",
                    es.id, es.term_id
                ));
            }
            session_terms.insert(es.id.clone(), es.term_id.clone());
            sessions_by_term.entry(es.term_id.clone()).or_default().push(es);
        }

        let mut term_ids: Vec<&String> = terms.keys().collect();
        term_ids.sort();
        for id in term_ids {
            let t = &terms[id];
            let sessions = sessions_by_term.get(&t.id).map(Vec::as_slice).unwrap_or(&[]);
            if sessions.is_empty() {
                warnings.push(format!("term {} has no exam sessions", t.id));
                continue;
            }
            if t.calculation_mode == CalculationMode::WeightedAverage {
                let sum: f64 = sessions.iter().map(|s| s.weight).sum();
                if (sum - 100.0).abs() > 1e-6 {
                    warnings.push(format!(
                        "weighted term {} session weights sum to {} (expected 100)",
                        t.id, sum
                    ));
                }
            }
        }

        let mut students: HashMap<String, Student> = HashMap::new();
        let mut class_rosters: HashMap<String, Vec<String>> = HashMap::new();
        for s in snapshot.students {
            if !classes.is_empty() && !classes.contains_key(&s.class_id) {
                warnings.push(format!("student {} references unknown class {}", s.id, s.class_id));
            }
            class_rosters.entry(s.class_id.clone()).or_default().push(s.id.clone());
            if students.insert(s.id.clone(), s).is_some() {
                warnings.push("duplicate student id in snapshot (latest kept)".to_string());
            }
        }

        let mark_total = snapshot.marks.len();
        let mut scores: HashMap<(String, String, String), Option<f64>> = HashMap::new();
        let mut dangling_marks = 0usize;
        let mut duplicate_marks = 0usize;
        let mut out_of_range = 0usize;
        for m in snapshot.marks {
            if !students.contains_key(&m.student_id)
                || !subjects.contains_key(&m.subject_id)
                || !session_terms.contains_key(&m.exam_session_id)
            {
                dangling_marks += 1;
            }
            if let Some(v) = m.score {
                if !v.is_finite() || v < 0.0 || v > 100.0 {
                    out_of_range += 1;
                }
            }
            let key = (m.student_id, m.subject_id, m.exam_session_id);
            if scores.insert(key, m.score).is_some() {
                duplicate_marks += 1;
            }
        }
        if dangling_marks > 0 {
            warnings.push(format!(
                "{} marks reference unknown students, subjects or sessions",
                dangling_marks
            ));
        }
        if duplicate_marks > 0 {
            warnings.push(format!(
                "{} duplicate mark entries (latest occurrence kept)",
                duplicate_marks
            ));
        }
        if out_of_range > 0 {
            warnings.push(format!(
                "{} mark scores outside 0-100 (clamped during aggregation)",
                out_of_range
            ));
        }

        let counts = DatasetCounts {
            schools: schools.len(),
            classes: classes.len(),
            subjects: subjects.len(),
            terms: terms.len(),
            exam_sessions: session_total,
            students: students.len(),
            marks: mark_total - duplicate_marks,
        };

        Ok(Dataset {
            label: snapshot.label,
            exported_at: snapshot.exported_at,
            schools,
            classes,
            subjects,
            terms,
            sessions_by_term,
            students,
            class_rosters,
            scores,
            policy,
            counts,
            warnings,
        })
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn exported_at(&self) -> Option<DateTime<Utc>> {
        self.exported_at
    }

    pub fn policy(&self) -> &GradingPolicy {
        &self.policy
    }

    pub fn counts(&self) -> DatasetCounts {
        self.counts
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn school(&self, id: &str) -> Option<&School> {
        self.schools.get(id)
    }

    pub fn class(&self, id: &str) -> Option<&SchoolClass> {
        self.classes.get(id)
    }

    pub fn subject(&self, id: &str) -> Option<&Subject> {
        self.subjects.get(id)
    }

    pub fn term(&self, id: &str) -> Option<&Term> {
        self.terms.get(id)
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.get(id)
    }

    pub fn sessions_for_term(&self, term_id: &str) -> &[ExamSession] {
        self.sessions_by_term.get(term_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Recorded score for one (student, subject, session) triple. Absent
    /// rows and explicit null scores both read as None: not yet entered.
    pub fn score(&self, student_id: &str, subject_id: &str, session_id: &str) -> Option<f64> {
        self.scores
            .get(&(
                student_id.to_string(),
                subject_id.to_string(),
                session_id.to_string(),
            ))
            .copied()
            .flatten()
    }

    /// Roster in snapshot order; callers impose their own sort.
    pub fn students_in_class(&self, class_id: &str, stream: Option<&str>) -> Vec<&Student> {
        let ids = self.class_rosters.get(class_id).map(Vec::as_slice).unwrap_or(&[]);
        ids.iter()
            .filter_map(|id| self.students.get(id))
            .filter(|s| stream.map(|st| s.stream == st).unwrap_or(true))
            .collect()
    }

    pub fn schools_sorted(&self) -> Vec<&School> {
        let mut out: Vec<&School> = self.schools.values().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// A school's terms in chronological order: year, then closing date
    /// (undated terms after dated ones in the same year), then name.
    pub fn terms_for_school(&self, school_id: &str) -> Vec<&Term> {
        let mut out: Vec<&Term> = self
            .terms
            .values()
            .filter(|t| t.school_id == school_id)
            .collect();
        out.sort_by(|a, b| {
            a.year
                .cmp(&b.year)
                .then_with(|| cmp_closing_dates(a.closing_date, b.closing_date))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        out
    }

    /// Subjects the student has at least one recorded score for within the
    /// term's sessions. This is the observable stand-in for per-term
    /// enrollment; per-subject history predating the snapshot is not kept.
    pub fn subjects_taken_in_term(&self, student: &Student, term: &Term) -> Vec<String> {
        let sessions = self.sessions_for_term(&term.id);
        let mut taken: Vec<String> = self
            .subjects
            .keys()
            .filter(|subject_id| {
                sessions
                    .iter()
                    .any(|es| self.score(&student.id, subject_id, &es.id).is_some())
            })
            .cloned()
            .collect();
        taken.sort();
        taken
    }

    /// Candidate subject list for a report card: the school's configured
    /// offering. Falls back to every known subject (sorted) when the
    /// school record is absent or lists nothing.
    pub fn offered_subjects(&self, school_id: &str) -> Vec<String> {
        match self.schools.get(school_id) {
            Some(school) if !school.active_subject_ids.is_empty() => {
                school.active_subject_ids.clone()
            }
            _ => {
                let mut all: Vec<String> = self.subjects.keys().cloned().collect();
                all.sort();
                all
            }
        }
    }
}

fn cmp_closing_dates(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Built-in demonstration dataset: one school, two classes, three terms
/// (two weighted, one simple-average), deterministic marks. Used by the
/// dataset.sample method and as a quick-start fixture.
pub fn sample() -> Dataset {
    let subjects = [
        ("ENG", "English", 1),
        ("KIS", "Kiswahili", 1),
        ("MAT", "Mathematics", 1),
        ("BIO", "Biology", 2),
        ("PHY", "Physics", 2),
        ("CHE", "Chemistry", 2),
        ("HIS", "History and Government", 3),
        ("GEO", "Geography", 3),
    ];

    let mut snapshot = Snapshot {
        label: Some("Lakeview sample".to_string()),
        exported_at: None,
        schools: vec![School {
            id: "SCH1".to_string(),
            name: "Lakeview Secondary School".to_string(),
            active_subject_ids: subjects.iter().map(|(id, _, _)| id.to_string()).collect(),
        }],
        classes: vec![
            SchoolClass {
                id: "C2".to_string(),
                name: "Form 2".to_string(),
            },
            SchoolClass {
                id: "C3".to_string(),
                name: "Form 3".to_string(),
            },
        ],
        subjects: subjects
            .iter()
            .map(|(id, name, group)| Subject {
                id: id.to_string(),
                name: name.to_string(),
                group: *group,
            })
            .collect(),
        terms: vec![
            Term {
                id: "T3-2024".to_string(),
                school_id: "SCH1".to_string(),
                name: "Term 3".to_string(),
                year: 2024,
                calculation_mode: CalculationMode::SimpleAverage,
                opening_date: date(2024, 9, 2),
                closing_date: date(2024, 11, 22),
            },
            Term {
                id: "T1-2025".to_string(),
                school_id: "SCH1".to_string(),
                name: "Term 1".to_string(),
                year: 2025,
                calculation_mode: CalculationMode::WeightedAverage,
                opening_date: date(2025, 1, 6),
                closing_date: date(2025, 4, 11),
            },
            Term {
                id: "T2-2025".to_string(),
                school_id: "SCH1".to_string(),
                name: "Term 2".to_string(),
                year: 2025,
                calculation_mode: CalculationMode::WeightedAverage,
                opening_date: date(2025, 5, 5),
                closing_date: date(2025, 8, 8),
            },
        ],
        exam_sessions: vec![
            session("ES1", "T3-2024", "Mid-Term", 0.0),
            session("ES2", "T3-2024", "Final Exam", 0.0),
            session("ES3", "T1-2025", "Term 1 CAT", 30.0),
            session("ES4", "T1-2025", "Term 1 EndTerm", 70.0),
            session("ES5", "T2-2025", "Term 2 CAT", 30.0),
            session("ES6", "T2-2025", "Term 2 EndTerm", 70.0),
        ],
        students: Vec::new(),
        marks: Vec::new(),
        grading: None,
    };

    let roster = [
        ("S01", "2001", "Achieng Otieno", "C2", "North"),
        ("S02", "2002", "Brian Kiprotich", "C2", "North"),
        ("S03", "2003", "Cynthia Wanjiru", "C2", "South"),
        ("S04", "2004", "David Mwangi", "C2", "South"),
        ("S05", "3001", "Esther Nafula", "C3", "East"),
        ("S06", "3002", "Felix Omondi", "C3", "East"),
    ];
    for (id, adm, name, class_id, stream) in roster {
        snapshot.students.push(Student {
            id: id.to_string(),
            admission_number: adm.to_string(),
            name: name.to_string(),
            class_id: class_id.to_string(),
            stream: stream.to_string(),
            school_id: "SCH1".to_string(),
        });
    }

    // Deterministic fixture scores: a per-student base shifted per subject
    // and session, kept inside 38..=92.
    let session_ids = ["ES1", "ES2", "ES3", "ES4", "ES5", "ES6"];
    for (si, (student_id, ..)) in roster.iter().enumerate() {
        for (gi, (subject_id, ..)) in subjects.iter().enumerate() {
            for (ki, session_id) in session_ids.iter().enumerate() {
                // One visible gap: S04 is still waiting on a Term 2
                // EndTerm chemistry entry.
                let score = if *student_id == "S04" && *subject_id == "CHE" && *session_id == "ES6"
                {
                    None
                } else {
                    let raw = 38 + ((si * 17 + gi * 11 + ki * 7) % 55);
                    Some(raw as f64)
                };
                snapshot.marks.push(Mark {
                    student_id: student_id.to_string(),
                    subject_id: subject_id.to_string(),
                    exam_session_id: session_id.to_string(),
                    score,
                });
            }
        }
    }

    Dataset::from_snapshot(snapshot).expect("builtin sample snapshot is valid")
}

fn session(id: &str, term_id: &str, name: &str, weight: f64) -> ExamSession {
    ExamSession {
        id: id.to_string(),
        term_id: term_id.to_string(),
        name: name.to_string(),
        weight,
    }
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}
